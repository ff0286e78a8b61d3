//! # sym-server
//!
//! Transports for the protocol surface.
//!
//! - HTTP: `POST /` takes one request envelope, `GET /health` reports liveness
//! - Stdio: newline-delimited envelopes on stdin/stdout, one call at a time
//! - Host sampling: over stdio, inference can be routed back to the host
//!   with `sampling/createMessage`
//! - Graceful shutdown via `tokio::signal` + `CancellationToken`

#![deny(unsafe_code)]

pub mod dispatch;
pub mod errors;
pub mod health;
pub mod http;
pub mod session;
pub mod shutdown;
pub mod stdio;

pub use errors::ServerError;
pub use http::HttpServer;
pub use session::StdioHostSession;
pub use shutdown::ShutdownCoordinator;
pub use stdio::StdioTransport;
