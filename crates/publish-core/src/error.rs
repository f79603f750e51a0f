//! Error types and JSON-RPC wire error shapes

use crate::rpc::{RpcErrorObject, RpcResponse};
use serde_json::Value;
use thiserror::Error;

/// Result type alias using `CallError`
pub type Result<T> = std::result::Result<T, CallError>;

/// JSON-RPC error codes returned to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcErrorCode {
    Internal,
    AuthRequired,
    AuthFailed,
    JsonParse,
    InvalidRequest,
    Sdk,
}

impl RpcErrorCode {
    /// Numeric code placed in the `error.code` member
    pub fn code(&self) -> i64 {
        match self {
            Self::Internal => -32080,
            Self::AuthRequired => -32084,
            Self::AuthFailed => -32085,
            Self::JsonParse => -32700,
            Self::InvalidRequest => -32600,
            Self::Sdk => -32603,
        }
    }
}

/// A client-facing error, always rendered as a JSON-RPC error body
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct RpcError {
    pub code: RpcErrorCode,
    pub message: String,
}

impl RpcError {
    pub fn new(code: RpcErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn internal(err: impl std::fmt::Display) -> Self {
        Self::new(RpcErrorCode::Internal, err.to_string())
    }

    pub fn json_parse(err: impl std::fmt::Display) -> Self {
        Self::new(
            RpcErrorCode::JsonParse,
            format!("malformed JSON-RPC request: {}", err),
        )
    }

    pub fn auth_required(message: impl Into<String>) -> Self {
        Self::new(RpcErrorCode::AuthRequired, message)
    }

    pub fn auth_failed(message: impl Into<String>) -> Self {
        Self::new(RpcErrorCode::AuthFailed, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(RpcErrorCode::InvalidRequest, message)
    }

    pub fn sdk(err: impl std::fmt::Display) -> Self {
        Self::new(RpcErrorCode::Sdk, err.to_string())
    }

    /// Wrap into a JSON-RPC response
    pub fn to_response(&self, id: Value) -> RpcResponse {
        RpcResponse::failure(
            id,
            RpcErrorObject {
                code: self.code.code(),
                message: self.message.clone(),
                data: None,
            },
        )
    }

    /// Wire body for an error not tied to a parsed request (`id` is null)
    pub fn to_json(&self) -> Vec<u8> {
        self.to_json_for(Value::Null)
    }

    /// Wire body answering the request identified by `id`
    pub fn to_json_for(&self, id: Value) -> Vec<u8> {
        self.to_response(id).to_json().unwrap_or_else(|_| {
            format!(
                r#"{{"jsonrpc":"2.0","error":{{"code":{},"message":"internal error"}},"id":null}}"#,
                RpcErrorCode::Internal.code()
            )
            .into_bytes()
        })
    }
}

/// Errors raised while calling the SDK
#[derive(Error, Debug)]
pub enum CallError {
    /// The SDK could not be reached
    #[error("could not reach SDK at {endpoint}: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// The SDK answered with a non-success HTTP status
    #[error("SDK at {endpoint} responded with HTTP {status}")]
    Status { endpoint: String, status: u16 },

    /// The SDK answered with something that is not a JSON-RPC response
    #[error("invalid SDK response: {0}")]
    InvalidResponse(String),

    /// A preflight hook refused the call
    #[error("call rejected: {0}")]
    Rejected(String),
}

impl From<&CallError> for RpcError {
    fn from(err: &CallError) -> Self {
        match err {
            CallError::Rejected(_) => RpcError::invalid_request(err.to_string()),
            _ => RpcError::sdk(err),
        }
    }
}
