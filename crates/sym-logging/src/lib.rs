//! # sym-logging
//!
//! Structured logging with `tracing`.
//!
//! - [`init_subscriber`] installs the global stderr subscriber (compact or JSON)
//! - [`LogLevel`] / [`LogFormat`] parse configuration strings leniently
//! - [`capture_logs`] records events in memory for test assertions
//!
//! Output always goes to stderr. Stdout belongs to the stdio protocol transport.

#![deny(unsafe_code)]

pub mod capture;
pub mod types;

pub use capture::{CapturedEvent, CapturedLogs, capture_logs};
pub use types::{LogFormat, LogLevel};

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `level` is used. Subsequent calls are
/// no-ops.
pub fn init_subscriber(level: LogLevel, format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_filter_str()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    // set_global_default is a no-op if already set
    let _ = match format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_twice_is_noop() {
        init_subscriber(LogLevel::Warn, LogFormat::Compact);
        init_subscriber(LogLevel::Debug, LogFormat::Json);
    }
}
