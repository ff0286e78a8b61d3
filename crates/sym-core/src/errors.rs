//! Error taxonomy for the sym engine.
//!
//! Every crate defines its own `thiserror` enum for local failures and
//! converts into [`SymError`] at the boundary. The variants mirror how a
//! failure is surfaced to the caller:
//!
//! - [`SymError::Config`]: missing or malformed policy/role files, fatal to the call
//! - [`SymError::Permission`]: an access denial, reported as a violation
//! - [`SymError::Inference`]: LLM failure, degraded to a warning during conversion
//! - [`SymError::Engine`]: a validation engine failed to run
//! - [`SymError::Protocol`]: malformed request or unknown method

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse classification of a [`SymError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Policy, role, or settings file problem.
    Config,
    /// Write access denied.
    Permission,
    /// LLM call failed or produced unusable output.
    Inference,
    /// Validation engine could not execute.
    Engine,
    /// Malformed request or unknown method.
    Protocol,
    /// Filesystem failure.
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Config => "config",
            Self::Permission => "permission",
            Self::Inference => "inference",
            Self::Engine => "engine",
            Self::Protocol => "protocol",
            Self::Io => "io",
        };
        f.write_str(s)
    }
}

/// Top-level error type for the sym engine.
#[derive(Debug, Error)]
pub enum SymError {
    /// Missing or malformed configuration.
    #[error("config error: {message}")]
    Config {
        /// Human-readable description.
        message: String,
        /// File that caused the failure, if known.
        path: Option<PathBuf>,
    },

    /// Write access denied for one or more files.
    #[error("role '{role}' may not modify: {}", .denied_files.join(", "))]
    Permission {
        /// Role that was evaluated.
        role: String,
        /// Files the role may not write.
        denied_files: Vec<String>,
    },

    /// LLM inference failure.
    #[error("inference error: {message}")]
    Inference {
        /// Human-readable description.
        message: String,
        /// Rule being classified, if any.
        rule_id: Option<String>,
    },

    /// A validation engine failed to execute.
    #[error("engine '{engine}' failed: {message}")]
    Engine {
        /// Engine identifier.
        engine: String,
        /// Human-readable description.
        message: String,
    },

    /// Malformed request or unknown method.
    #[error("protocol error [{code}]: {message}")]
    Protocol {
        /// Machine-readable code.
        code: String,
        /// Human-readable description.
        message: String,
    },

    /// Filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SymError {
    /// Build a config error without a path.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            path: None,
        }
    }

    /// Build a config error tied to a file.
    pub fn config_at(message: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::Config {
            message: message.into(),
            path: Some(path.into()),
        }
    }

    /// Classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config { .. } | Self::Json(_) => ErrorKind::Config,
            Self::Permission { .. } => ErrorKind::Permission,
            Self::Inference { .. } => ErrorKind::Inference,
            Self::Engine { .. } => ErrorKind::Engine,
            Self::Protocol { .. } => ErrorKind::Protocol,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    /// Whether the error aborts the current operation.
    ///
    /// Permission, inference, and engine failures are folded into results
    /// (violations, warnings, `errors`) and never abort a call on their own.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Config | ErrorKind::Protocol | ErrorKind::Io
        )
    }
}

/// Result alias using [`SymError`].
pub type Result<T> = std::result::Result<T, SymError>;
