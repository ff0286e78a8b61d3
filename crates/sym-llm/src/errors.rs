//! Inference error types.

use sym_core::SymError;

/// Errors from an inference backend or from interpreting its output.
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Backend returned an error response.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error description.
        message: String,
        /// Whether the call may succeed if repeated.
        retryable: bool,
    },

    /// Call exceeded its deadline.
    #[error("inference timed out after {secs}s")]
    Timeout {
        /// Deadline that elapsed.
        secs: u64,
    },

    /// No usable backend.
    #[error("inference backend not configured: {message}")]
    NotConfigured {
        /// What is missing.
        message: String,
    },

    /// Model output could not be interpreted.
    #[error("unparseable model output: {message}")]
    Parse {
        /// Error description.
        message: String,
    },

    /// The host session rejected or dropped the call.
    #[error("host session error: {message}")]
    Session {
        /// Error description.
        message: String,
    },
}

impl InferenceError {
    /// Build a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Whether this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.status().is_some_and(|s| {
                        s == reqwest::StatusCode::TOO_MANY_REQUESTS || s.is_server_error()
                    })
            }
            Self::Api { retryable, .. } => *retryable,
            Self::Timeout { .. } => true,
            Self::Json(_)
            | Self::NotConfigured { .. }
            | Self::Parse { .. }
            | Self::Session { .. } => false,
        }
    }

    /// Error category string for logs and metrics.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Http(_) => "network",
            Self::Json(_) | Self::Parse { .. } => "parse",
            Self::Api { .. } => "api",
            Self::Timeout { .. } => "timeout",
            Self::NotConfigured { .. } => "not_configured",
            Self::Session { .. } => "session",
        }
    }
}

impl From<InferenceError> for SymError {
    fn from(err: InferenceError) -> Self {
        match err {
            InferenceError::NotConfigured { message } => SymError::config(message),
            other => SymError::Inference {
                message: other.to_string(),
                rule_id: None,
            },
        }
    }
}
