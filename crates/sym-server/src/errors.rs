//! Transport errors.

use std::net::{Ipv6Addr, SocketAddr};

/// Errors that stop a transport.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Could not bind the HTTP listener.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Requested address.
        addr: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Transport I/O failed.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    pub(crate) fn bind(addr: impl ToString, source: std::io::Error) -> Self {
        Self::Bind {
            addr: addr.to_string(),
            source,
        }
    }
}

/// Format a host/port pair for binding.
pub(crate) fn bind_addr(host: &str, port: u16) -> String {
    match host.parse::<Ipv6Addr>() {
        Ok(ip) => SocketAddr::from((ip, port)).to_string(),
        Err(_) => format!("{host}:{port}"),
    }
}
