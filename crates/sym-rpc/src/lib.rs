//! # sym-rpc
//!
//! Protocol layer shared by the stdio and HTTP transports.
//!
//! - **Envelope**: `{id, method, params}` in, `{id, success, result | error}` out
//! - **Registry**: method name → [`MethodHandler`], with a dispatch timeout and slow-call logging
//! - **Tools**: `query_conventions`, `validate_code`, category and rule CRUD,
//!   `import_convention`, `convert`, `list_history`, `system.*`
//! - **Context**: injected paths, stores, role source and inference factory

#![deny(unsafe_code)]

pub mod context;
pub mod errors;
pub mod handlers;
pub mod registry;
pub mod types;

pub use context::RpcContext;
pub use errors::RpcError;
pub use handlers::register_all;
pub use registry::{MethodHandler, MethodRegistry};
pub use types::{RpcErrorBody, RpcRequest, RpcResponse};
