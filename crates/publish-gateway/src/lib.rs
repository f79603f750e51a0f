//! # Publish Gateway
//!
//! HTTP gateway that turns multipart uploads into SDK JSON-RPC calls.
//!
//! This crate provides:
//! - **Upload Bridge**: saves the uploaded file and injects its path into the
//!   accompanying JSON-RPC request
//! - **JSON-RPC Proxy**: forwards plain JSON-RPC requests to the user's SDK
//! - **Authentication**: JWT bearer tokens resolved to principals
//! - **Rate Limiting**: per-user request throttling
//!
//! ## Request flow
//!
//! ```text
//! POST /api/v1/proxy (multipart: file + json_payload)
//!         │
//!         ▼
//!   authorize ──fail──▶ JSON-RPC error
//!         │
//!         ▼
//!   UploadForm::can_handle ──no──▶ JSON-RPC error
//!         │ yes
//!         ▼
//!   save_upload ─▶ parse json_payload
//!         │
//!         ▼
//!   Caller + file_path hook ─▶ SDK ─▶ JSON-RPC response
//!         │
//!         ▼
//!   scratch file removed
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod form;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;
pub mod upload;

pub use config::GatewayConfig;
pub use error::ApiError;
pub use server::{run_server, run_server_with_shutdown};
pub use state::AppState;
