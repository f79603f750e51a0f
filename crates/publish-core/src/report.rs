//! Out-of-band error reporting
//!
//! Reporting is fire-and-forget: implementations must never fail or block
//! the request that produced the error.

use std::error::Error;
use tracing::error;

/// Receives error events together with key/value context
pub trait ErrorReporter: Send + Sync {
    fn report(&self, error: &(dyn Error + 'static), context: &[(&str, String)]);
}

/// Reporter that emits a `tracing` error event per report
#[derive(Debug, Default, Clone)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, err: &(dyn Error + 'static), context: &[(&str, String)]) {
        let mut chain = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            chain.push(cause.to_string());
            source = cause.source();
        }

        let context = context
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join(" ");

        error!(
            error = %err,
            causes = ?chain,
            context = %context,
            "error reported"
        );
    }
}
