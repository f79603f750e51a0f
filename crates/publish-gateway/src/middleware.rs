//! HTTP middleware for request ids, logging, rate limiting and caching

use crate::auth::Authenticator;
use crate::ApiError;
use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use governor::{state::keyed::DefaultKeyedStateStore, Quota, RateLimiter};
use publish_core::{QueryCache, RpcError};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Rate limiter type
pub type KeyedRateLimiter =
    RateLimiter<String, DefaultKeyedStateStore<String>, governor::clock::DefaultClock>;

/// Bucket shared by every request without a valid token
pub const ANONYMOUS_KEY: &str = "anonymous";

/// Create a rate limiter. A zero rate is treated as one request per second.
pub fn create_rate_limiter(requests_per_second: u32) -> Arc<KeyedRateLimiter> {
    let quota = Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::keyed(quota))
}

/// Periodically drop limiter keys whose buckets have refilled
pub fn spawn_limiter_pruning(limiter: Arc<KeyedRateLimiter>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            limiter.retain_recent();
            limiter.shrink_to_fit();
            tracing::debug!(keys = limiter.len(), "pruned rate limiter");
        }
    })
}

/// State for [`rate_limit_middleware`]
#[derive(Clone)]
pub struct RateLimit {
    pub limiter: Arc<KeyedRateLimiter>,
    pub authenticator: Arc<dyn Authenticator>,
}

/// Rate limiting middleware, keyed by the authenticated user.
///
/// Missing or invalid credentials all share the anonymous bucket.
pub async fn rate_limit_middleware(
    State(rate_limit): State<RateLimit>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let key = match rate_limit.authenticator.authenticate(request.headers()).await {
        Ok(principal) => format!("user:{}", principal.id),
        Err(_) => ANONYMOUS_KEY.to_string(),
    };

    if rate_limit.limiter.check_key(&key).is_err() {
        return Err(RpcError::invalid_request("Please reduce your request rate").into());
    }

    Ok(next.run(request).await)
}

/// Query cache attached to a request
#[derive(Clone)]
pub struct QueryCacheHandle(pub Arc<dyn QueryCache>);

/// Attach the query cache to every request passing through
pub async fn query_cache_middleware(
    State(cache): State<Arc<dyn QueryCache>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    request.extensions_mut().insert(QueryCacheHandle(cache));
    next.run(request).await
}

/// Request ID middleware - adds x-request-id header
pub async fn request_id_middleware(mut request: Request<Body>, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

/// Request ID extension
#[derive(Clone)]
pub struct RequestId(pub String);

/// Logging middleware
pub async fn logging_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();
    let start = std::time::Instant::now();

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status();

    tracing::info!(
        method = %method,
        uri = %uri,
        request_id = %request_id,
        status = %status.as_u16(),
        duration_ms = %duration.as_millis(),
        "Request completed"
    );

    response
}
