//! HTTP route definitions

use crate::{handlers, middleware, AppState};
use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main router
pub fn create_router(state: Arc<AppState>) -> Router {
    let rate_limit = middleware::RateLimit {
        limiter: Arc::clone(&state.rate_limiter),
        authenticator: Arc::clone(&state.authenticator),
    };

    // Uploads have no size limit.
    let mut proxy = Router::new()
        .route("/api/v1/proxy", post(handlers::proxy))
        .route("/api/proxy", post(handlers::proxy))
        .layer(DefaultBodyLimit::disable());

    if let Some(cache) = state.query_cache.clone() {
        proxy = proxy.layer(axum_middleware::from_fn_with_state(
            cache,
            middleware::query_cache_middleware,
        ));
    }

    let mut router = Router::new()
        .route("/health", get(handlers::health_check))
        .merge(proxy)
        .layer(axum_middleware::from_fn_with_state(
            rate_limit,
            middleware::rate_limit_middleware,
        ))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum_middleware::from_fn(middleware::request_id_middleware))
                .layer(axum_middleware::from_fn(middleware::logging_middleware)),
        );

    if state.config.cors_enabled {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        router = router.layer(cors);
    }

    router.with_state(state)
}
