//! Publish Gateway - upload-to-SDK JSON-RPC bridge

use clap::Parser;
use publish_gateway::{run_server_with_shutdown, GatewayConfig};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "publish-gateway")]
#[command(about = "Bridges multipart uploads into SDK JSON-RPC calls")]
#[command(version)]
struct Args {
    /// Host to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0", env = "PUBLISH_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "PUBLISH_PORT")]
    port: u16,

    /// Directory receiving uploaded files
    #[arg(long, env = "PUBLISH_UPLOAD_PATH")]
    upload_path: Option<PathBuf>,

    /// SDK address used for the development principal when auth is disabled
    #[arg(long, default_value = "http://localhost:5279", env = "PUBLISH_DEFAULT_SDK")]
    default_sdk: String,

    /// JWT secret for token validation
    #[arg(long, env = "JWT_SECRET")]
    jwt_secret: Option<String>,

    /// Disable authentication (for development only!)
    #[arg(long, env = "PUBLISH_NO_AUTH")]
    no_auth: bool,

    /// Requests per second allowed per user
    #[arg(long, default_value = "100", env = "PUBLISH_RATE_LIMIT")]
    rate_limit: u32,

    /// Disable the query cache
    #[arg(long, env = "PUBLISH_NO_CACHE")]
    no_cache: bool,

    /// Maximum number of cached SDK responses
    #[arg(long, default_value = "10000", env = "PUBLISH_CACHE_CAPACITY")]
    cache_capacity: usize,

    /// Timeout for SDK calls in seconds
    #[arg(long, default_value = "300", env = "PUBLISH_RPC_TIMEOUT")]
    rpc_timeout: u64,

    /// Enable debug logging
    #[arg(short, long, env = "PUBLISH_DEBUG")]
    debug: bool,

    /// Emit logs as JSON
    #[arg(long, env = "PUBLISH_LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Setup logging
    let log_level = if args.debug { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "publish_gateway={0},publish_core={0},tower_http=debug",
            log_level
        )
        .into()
    });
    let registry = tracing_subscriber::registry().with(filter);
    if args.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting publish gateway on {}:{}", args.host, args.port);

    if args.no_auth {
        tracing::warn!("Authentication is DISABLED - for development only!");
    }

    let mut config = GatewayConfig {
        host: args.host,
        port: args.port,
        default_sdk_address: Some(args.default_sdk),
        jwt_secret: args.jwt_secret,
        auth_enabled: !args.no_auth,
        rate_limit_rps: args.rate_limit,
        query_cache_enabled: !args.no_cache,
        query_cache_capacity: args.cache_capacity,
        rpc_timeout_secs: args.rpc_timeout,
        ..Default::default()
    };
    if let Some(upload_path) = args.upload_path {
        config.upload_path = upload_path;
    }

    run_server_with_shutdown(config, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
        }
    })
    .await
}
