//! HTTP request handlers

pub mod proxy;
pub mod publish;
pub mod service;

pub use proxy::*;
pub use publish::*;
pub use service::*;
