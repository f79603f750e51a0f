//! SDK caller with preflight hooks
//!
//! A [`Caller`] is bound to one SDK endpoint and one principal. Before a
//! request is sent, every registered preflight hook runs in registration
//! order against the [`Query`] being built. A hook either returns `None`,
//! letting dispatch proceed (possibly after mutating the query), or
//! `Some(outcome)`, which is returned to the caller without contacting the
//! SDK.

use crate::cache::QueryCache;
use crate::client::RpcClient;
use crate::error::Result;
use crate::rpc::{RpcRequest, RpcResponse};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

/// A request on its way to the SDK
#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    pub request: RpcRequest,
}

impl Query {
    pub fn new(request: RpcRequest) -> Self {
        Self { request }
    }

    pub fn method(&self) -> &str {
        &self.request.method
    }

    /// Params as a named-parameter map (a copy)
    pub fn params_as_map(&self) -> Map<String, Value> {
        self.request.params_as_map()
    }

    /// Replace the request params
    pub fn set_params(&mut self, params: Map<String, Value>) {
        self.request.params = Some(Value::Object(params));
    }
}

/// Hook run against a query before dispatch
pub type PreflightHook = Box<dyn Fn(&mut Query) -> Option<Result<RpcResponse>> + Send + Sync>;

/// Builds and dispatches SDK calls for a single principal
pub struct Caller {
    endpoint: String,
    user_id: u64,
    cache: Option<Arc<dyn QueryCache>>,
    preflight_hooks: Vec<PreflightHook>,
}

impl Caller {
    pub fn new(endpoint: impl Into<String>, user_id: u64) -> Self {
        Self {
            endpoint: endpoint.into(),
            user_id,
            cache: None,
            preflight_hooks: Vec::new(),
        }
    }

    /// Use `cache` for cacheable methods
    pub fn with_cache(mut self, cache: Option<Arc<dyn QueryCache>>) -> Self {
        self.cache = cache;
        self
    }

    /// Append a hook to the preflight chain
    pub fn add_preflight_hook<F>(&mut self, hook: F)
    where
        F: Fn(&mut Query) -> Option<Result<RpcResponse>> + Send + Sync + 'static,
    {
        self.preflight_hooks.push(Box::new(hook));
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn user_id(&self) -> u64 {
        self.user_id
    }

    pub fn has_cache(&self) -> bool {
        self.cache.is_some()
    }

    pub fn preflight_hook_count(&self) -> usize {
        self.preflight_hooks.len()
    }

    /// Run preflight hooks, then send the query through `client`
    pub async fn call(&self, client: &dyn RpcClient, request: RpcRequest) -> Result<RpcResponse> {
        let mut query = Query::new(request);

        for (index, hook) in self.preflight_hooks.iter().enumerate() {
            if let Some(outcome) = hook(&mut query) {
                debug!(
                    method = %query.method(),
                    hook = index,
                    "preflight hook short-circuited the call"
                );
                return outcome;
            }
        }

        client
            .call(&self.endpoint, self.user_id, self.cache.as_deref(), query)
            .await
    }
}

impl std::fmt::Debug for Caller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Caller")
            .field("endpoint", &self.endpoint)
            .field("user_id", &self.user_id)
            .field("cache", &self.cache.is_some())
            .field("preflight_hooks", &self.preflight_hooks.len())
            .finish()
    }
}
