//! JSON-RPC request and response types exchanged with the SDK

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Protocol version stamped on every request and response
pub const JSONRPC_VERSION: &str = "2.0";

fn default_version() -> String {
    JSONRPC_VERSION.to_string()
}

fn default_id() -> Value {
    Value::from(0)
}

/// A JSON-RPC request
///
/// Clients routinely omit `jsonrpc` and `id`; both are filled in with
/// defaults so the request can be forwarded as-is.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    #[serde(default = "default_version")]
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(default = "default_id")]
    pub id: Value,
}

impl RpcRequest {
    /// Create a request with no params
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            jsonrpc: default_version(),
            method: method.into(),
            params: None,
            id: default_id(),
        }
    }

    /// Set params
    pub fn with_params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }

    /// Parse a request from its JSON text
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Params as a named-parameter map.
    ///
    /// Missing or positional (non-object) params yield an empty map.
    pub fn params_as_map(&self) -> Map<String, Value> {
        match &self.params {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        }
    }
}

/// Error member of a JSON-RPC response
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A JSON-RPC response
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    #[serde(default = "default_version")]
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorObject>,
    #[serde(default = "default_id")]
    pub id: Value,
}

impl RpcResponse {
    /// Successful response carrying `result`
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: default_version(),
            result: Some(result),
            error: None,
            id,
        }
    }

    /// Error response
    pub fn failure(id: Value, error: RpcErrorObject) -> Self {
        Self {
            jsonrpc: default_version(),
            result: None,
            error: Some(error),
            id,
        }
    }

    /// Whether the SDK reported an error
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Serialize into the wire body sent back to clients
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}
