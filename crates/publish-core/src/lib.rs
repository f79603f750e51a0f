//! # Publish Core
//!
//! Building blocks for bridging file uploads into SDK JSON-RPC calls.
//!
//! This crate provides:
//! - **Scratch Storage**: per-principal temporary files with collision-free names
//! - **JSON-RPC Types**: requests, responses and the wire error shapes
//! - **Caller**: SDK call builder with ordered preflight hooks
//! - **Collaborators**: RPC client, query cache and error reporting seams
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            Gateway Handlers             │
//! ├─────────────────────────────────────────┤
//! │   Caller + Preflight Hooks │  Scratch   │
//! ├─────────────────────────────────────────┤
//! │  RpcClient  │  QueryCache  │  Reporter  │
//! ├─────────────────────────────────────────┤
//! │              SDK backend                │
//! └─────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod caller;
pub mod client;
pub mod error;
pub mod principal;
pub mod report;
pub mod rpc;
pub mod scratch;

pub use cache::{MemoryQueryCache, QueryCache};
pub use caller::{Caller, PreflightHook, Query};
pub use client::{HttpRpcClient, RpcClient};
pub use error::{CallError, Result, RpcError, RpcErrorCode};
pub use principal::Principal;
pub use report::{ErrorReporter, TracingReporter};
pub use rpc::{RpcErrorObject, RpcRequest, RpcResponse, JSONRPC_VERSION};
pub use scratch::{ScratchFile, ScratchStore};
