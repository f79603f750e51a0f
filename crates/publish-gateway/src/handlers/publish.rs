//! Upload bridge: multipart upload + JSON-RPC request to an SDK call
//!
//! The uploaded file is saved under the principal's scratch directory, the
//! accompanying request gets the saved path injected as `file_path`, and the
//! SDK response is relayed back. The scratch file is removed on every exit
//! path once it has been written.

use crate::auth::SdkPrincipal;
use crate::form::{UploadForm, JSON_RPC_FIELD};
use crate::upload::save_upload;
use publish_core::{
    Caller, ErrorReporter, QueryCache, RpcClient, RpcError, RpcRequest, ScratchStore,
};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info_span, Instrument, Span};

/// Request param receiving the saved file path
pub const FILE_PATH_PARAM: &str = "file_path";

/// Build an SDK caller whose single preflight hook points `file_path` at the
/// saved upload, replacing whatever the client sent under that key.
pub fn build_caller(
    sdk_address: &str,
    file_path: &Path,
    user_id: u64,
    cache: Option<Arc<dyn QueryCache>>,
) -> Caller {
    let file_path = file_path.to_string_lossy().into_owned();
    let mut caller = Caller::new(sdk_address, user_id).with_cache(cache);
    caller.add_preflight_hook(move |query| {
        let mut params = query.params_as_map();
        params.insert(FILE_PATH_PARAM.to_string(), Value::String(file_path.clone()));
        query.set_params(params);
        None
    });
    caller
}

/// Handles upload requests from authorized principals whose form passed
/// [`UploadForm::can_handle`]
pub struct UploadBridge {
    store: ScratchStore,
    rpc: Arc<dyn RpcClient>,
    reporter: Arc<dyn ErrorReporter>,
    span: Span,
}

impl UploadBridge {
    pub fn new(
        store: ScratchStore,
        rpc: Arc<dyn RpcClient>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        Self {
            store,
            rpc,
            reporter,
            span: info_span!("publish"),
        }
    }

    /// Log every request under `span` instead of the default `publish` span
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Process an upload and return the JSON-RPC body for the client.
    ///
    /// Never fails: every error is rendered as a JSON-RPC error body.
    pub async fn handle(
        &self,
        principal: &SdkPrincipal,
        cache: Option<Arc<dyn QueryCache>>,
        form: &UploadForm,
    ) -> Vec<u8> {
        self.process(principal, cache, form)
            .instrument(self.span.clone())
            .await
    }

    async fn process(
        &self,
        principal: &SdkPrincipal,
        cache: Option<Arc<dyn QueryCache>>,
        form: &UploadForm,
    ) -> Vec<u8> {
        // Dropping `upload` deletes the file, so every return below cleans up.
        let mut upload = match save_upload(&self.store, form, principal.id).await {
            Ok(upload) => upload,
            Err(e) => {
                error!(user_id = principal.id, error = %e, "failed to save upload");
                self.reporter
                    .report(&e, &[("user_id", principal.id.to_string())]);
                return RpcError::internal(&e).to_json();
            }
        };
        upload.report_to(Arc::clone(&self.reporter));

        let request = match RpcRequest::from_json(form.value(JSON_RPC_FIELD).unwrap_or_default()) {
            Ok(request) => request,
            Err(e) => {
                debug!(user_id = principal.id, error = %e, "malformed json_payload");
                return RpcError::json_parse(&e).to_json();
            }
        };

        let caller = build_caller(&principal.sdk_address, upload.path(), principal.id, cache);
        let response = match caller.call(self.rpc.as_ref(), request.clone()).await {
            Ok(response) => response,
            Err(e) => {
                self.reporter.report(
                    &e,
                    &[
                        ("request", format!("{:?}", request)),
                        ("response", "null".to_string()),
                    ],
                );
                error!("error calling SDK: {}, request: {:?}", e, request);
                return RpcError::from(&e).to_json_for(request.id);
            }
        };

        match response.to_json() {
            Ok(body) => body,
            Err(e) => {
                self.reporter.report(&e, &[]);
                error!("error marshaling response: {}", e);
                RpcError::internal(&e).to_json_for(request.id)
            }
        }
    }
}
