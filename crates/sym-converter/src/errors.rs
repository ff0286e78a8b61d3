//! Conversion errors.

use sym_core::SymError;
use sym_llm::InferenceError;

/// Failures that abort a whole conversion.
///
/// Per-rule problems never surface here; they become warnings.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// No inference backend could be built.
    #[error("no inference client: {0}")]
    NoClient(#[source] InferenceError),

    /// The conversion deadline elapsed.
    #[error("conversion exceeded its {secs}s deadline")]
    Deadline {
        /// Deadline in seconds.
        secs: u64,
    },

    /// Writing outputs failed.
    #[error("failed to write {path}: {source}")]
    Write {
        /// Target file.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// An adapter could not render its configuration.
    #[error("{adapter} config: {message}")]
    Adapter {
        /// Adapter name.
        adapter: String,
        /// Failure description.
        message: String,
    },
}

impl From<ConvertError> for SymError {
    fn from(err: ConvertError) -> Self {
        match err {
            ConvertError::NoClient(e) => SymError::config(format!("no inference client: {e}")),
            ConvertError::Write { source, .. } => SymError::Io(source),
            other => SymError::Inference {
                message: other.to_string(),
                rule_id: None,
            },
        }
    }
}
