//! POST /api/v1/proxy - JSON-RPC proxy with upload support
//!
//! Multipart bodies that carry an upload plus a JSON-RPC request go to the
//! [`UploadBridge`](super::publish::UploadBridge). Anything else is treated
//! as a plain JSON-RPC request and forwarded to the principal's SDK.

use crate::auth::authorize;
use crate::error::{json_rpc_response, ApiError};
use crate::form::{UploadForm, FILE_FIELD, JSON_RPC_FIELD};
use crate::middleware::QueryCacheHandle;
use crate::AppState;
use axum::{
    extract::{FromRequest, Multipart, Request, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use publish_core::{Caller, QueryCache, RpcError, RpcRequest};
use std::sync::Arc;
use tracing::error;

/// Whether the request body is `multipart/form-data`
pub fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.trim_start().to_ascii_lowercase().starts_with("multipart/form-data"))
}

/// Route a proxy request to the upload bridge or the plain proxy.
///
/// The principal is resolved before the body is read, so rejected requests
/// never spool an upload.
pub async fn proxy(State(state): State<Arc<AppState>>, request: Request) -> Response {
    let headers = request.headers().clone();
    let cache = request
        .extensions()
        .get::<QueryCacheHandle>()
        .map(|handle| Arc::clone(&handle.0));

    let result = if is_multipart(&headers) {
        upload(&state, &headers, cache, request).await
    } else {
        forward(&state, &headers, cache, request).await
    };

    match result {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

async fn upload(
    state: &Arc<AppState>,
    headers: &HeaderMap,
    cache: Option<Arc<dyn QueryCache>>,
    request: Request,
) -> Result<Response, ApiError> {
    let principal = authorize(state.authenticator.as_ref(), headers).await?;

    let multipart = Multipart::from_request(request, state)
        .await
        .map_err(|rejection| RpcError::invalid_request(rejection.body_text()))?;
    let form = UploadForm::from_multipart(multipart)
        .await
        .map_err(|e| RpcError::invalid_request(e.to_string()))?;

    if !form.can_handle() {
        return Err(RpcError::invalid_request(format!(
            "upload requests need a {:?} file part and a non-empty {:?} field",
            FILE_FIELD, JSON_RPC_FIELD
        ))
        .into());
    }

    Ok(json_rpc_response(
        state.bridge.handle(&principal, cache, &form).await,
    ))
}

/// Forward a plain JSON-RPC request to the principal's SDK
async fn forward(
    state: &Arc<AppState>,
    headers: &HeaderMap,
    cache: Option<Arc<dyn QueryCache>>,
    request: Request,
) -> Result<Response, ApiError> {
    let principal = authorize(state.authenticator.as_ref(), headers).await?;

    let body = Bytes::from_request(request, state)
        .await
        .map_err(|rejection| RpcError::invalid_request(rejection.body_text()))?;
    let request: RpcRequest = serde_json::from_slice(&body).map_err(RpcError::json_parse)?;

    let caller = Caller::new(&principal.sdk_address, principal.id).with_cache(cache);
    let response = match caller.call(state.rpc.as_ref(), request.clone()).await {
        Ok(response) => response,
        Err(e) => {
            state
                .reporter
                .report(&e, &[("request", format!("{:?}", request))]);
            error!("error calling SDK: {}, request: {:?}", e, request);
            return Err(ApiError::for_request(RpcError::from(&e), request.id));
        }
    };

    let body = response
        .to_json()
        .map_err(|e| ApiError::for_request(RpcError::internal(e), request.id))?;
    Ok(json_rpc_response(body))
}
