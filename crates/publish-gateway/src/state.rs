//! Application state

use crate::auth::{dev_principal, Authenticator, DevAuthenticator, JwtAuthenticator};
use crate::config::GatewayConfig;
use crate::handlers::UploadBridge;
use crate::middleware::{create_rate_limiter, KeyedRateLimiter};
use publish_core::{
    ErrorReporter, HttpRpcClient, MemoryQueryCache, QueryCache, RpcClient, ScratchStore,
    TracingReporter,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, info_span, warn};

/// Application state shared across handlers
pub struct AppState {
    /// Gateway configuration
    pub config: GatewayConfig,
    /// Resolves requests to principals
    pub authenticator: Arc<dyn Authenticator>,
    /// Transport to the SDK
    pub rpc: Arc<dyn RpcClient>,
    /// Out-of-band error reporting
    pub reporter: Arc<dyn ErrorReporter>,
    /// Query cache, when enabled
    pub query_cache: Option<Arc<dyn QueryCache>>,
    /// Per-user request throttling
    pub rate_limiter: Arc<KeyedRateLimiter>,
    /// Upload handler
    pub bridge: UploadBridge,
}

impl AppState {
    /// Create a new application state with the default collaborators
    pub fn new(config: GatewayConfig) -> anyhow::Result<Self> {
        let authenticator: Arc<dyn Authenticator> = if config.auth_enabled {
            if config.jwt_secret.is_none() {
                warn!("Authentication is enabled but no JWT secret is configured");
            }
            Arc::new(JwtAuthenticator::new(config.jwt_secret.clone()))
        } else {
            Arc::new(DevAuthenticator::new(dev_principal(
                config.default_sdk_address.clone(),
            )))
        };

        let rpc = Arc::new(HttpRpcClient::new(Duration::from_secs(config.rpc_timeout_secs))?);

        Ok(Self::with_components(
            config,
            authenticator,
            rpc,
            Arc::new(TracingReporter),
        ))
    }

    /// Create application state from explicit collaborators
    pub fn with_components(
        config: GatewayConfig,
        authenticator: Arc<dyn Authenticator>,
        rpc: Arc<dyn RpcClient>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        let query_cache: Option<Arc<dyn QueryCache>> = if config.query_cache_enabled {
            Some(Arc::new(MemoryQueryCache::new(config.query_cache_capacity)))
        } else {
            None
        };

        info!("Upload path: {}", config.upload_path.display());

        let bridge = UploadBridge::new(
            ScratchStore::new(config.upload_path.clone()),
            Arc::clone(&rpc),
            Arc::clone(&reporter),
        )
        .with_span(info_span!("publish", upload_path = %config.upload_path.display()));

        let rate_limiter = create_rate_limiter(config.rate_limit_rps);

        Self {
            config,
            authenticator,
            rpc,
            reporter,
            query_cache,
            rate_limiter,
            bridge,
        }
    }
}
