//! Gateway configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Gateway server configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Root directory for uploaded scratch files
    pub upload_path: PathBuf,
    /// SDK address handed to the development principal when auth is disabled
    pub default_sdk_address: Option<String>,
    /// JWT secret for authentication
    pub jwt_secret: Option<String>,
    /// Enable authentication
    pub auth_enabled: bool,
    /// Rate limit (requests per second per token)
    pub rate_limit_rps: u32,
    /// Attach the query cache to requests
    pub query_cache_enabled: bool,
    /// Maximum number of cached SDK responses
    pub query_cache_capacity: usize,
    /// Timeout for a single SDK call (seconds)
    pub rpc_timeout_secs: u64,
    /// Enable CORS
    pub cors_enabled: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            upload_path: std::env::temp_dir().join("publish-uploads"),
            default_sdk_address: Some("http://localhost:5279".to_string()),
            jwt_secret: None,
            auth_enabled: true,
            rate_limit_rps: 100,
            query_cache_enabled: true,
            query_cache_capacity: publish_core::cache::DEFAULT_CAPACITY,
            rpc_timeout_secs: 300,
            cors_enabled: true,
        }
    }
}

impl GatewayConfig {
    /// Get the bind address
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
