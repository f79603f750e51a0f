//! Error types rendered as JSON-RPC bodies
//!
//! Every error leaves the gateway as a JSON-RPC error object with HTTP 200.
//! Clients distinguish success from failure by inspecting the body.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use publish_core::RpcError;
use serde_json::Value;
use thiserror::Error;

/// API error type
#[derive(Error, Debug)]
pub enum ApiError {
    /// Raised before a request envelope was parsed
    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// Raised while answering the request with this `id`
    #[error("{source}")]
    Request { id: Value, source: RpcError },
}

impl ApiError {
    pub fn for_request(source: RpcError, id: Value) -> Self {
        Self::Request { id, source }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self {
            Self::Rpc(e) => e.to_json(),
            Self::Request { id, source } => source.to_json_for(id),
        };
        json_rpc_response(body)
    }
}

/// Wrap an already serialized JSON-RPC body
pub fn json_rpc_response(body: Vec<u8>) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response()
}
