//! JSON-RPC transport to the SDK

use crate::cache::QueryCache;
use crate::caller::Query;
use crate::error::{CallError, Result};
use crate::rpc::RpcResponse;
use async_trait::async_trait;
use reqwest::{header, Client};
use std::time::Duration;
use tracing::debug;

/// Sends queries to an SDK endpoint
#[async_trait]
pub trait RpcClient: Send + Sync {
    async fn call(
        &self,
        endpoint: &str,
        user_id: u64,
        cache: Option<&dyn QueryCache>,
        query: Query,
    ) -> Result<RpcResponse>;
}

/// `RpcClient` posting JSON-RPC bodies over HTTP
#[derive(Clone, Debug)]
pub struct HttpRpcClient {
    http: Client,
}

impl HttpRpcClient {
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static(concat!("publish-core/", env!("CARGO_PKG_VERSION"))),
        );

        let http = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self { http })
    }
}

#[async_trait]
impl RpcClient for HttpRpcClient {
    async fn call(
        &self,
        endpoint: &str,
        user_id: u64,
        cache: Option<&dyn QueryCache>,
        query: Query,
    ) -> Result<RpcResponse> {
        if let Some(hit) = cache.and_then(|c| c.get(&query)) {
            debug!(method = %query.method(), user_id, "query cache hit");
            return Ok(hit);
        }

        debug!(method = %query.method(), user_id, endpoint, "sending query to SDK");

        let transport = |source| CallError::Transport {
            endpoint: endpoint.to_string(),
            source,
        };

        let response = self
            .http
            .post(endpoint)
            .json(&query.request)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(CallError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(transport)?;
        let rpc: RpcResponse = serde_json::from_slice(&body)
            .map_err(|e| CallError::InvalidResponse(e.to_string()))?;

        if let Some(cache) = cache {
            cache.set(&query, &rpc);
        }

        Ok(rpc)
    }
}
