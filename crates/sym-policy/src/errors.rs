//! Policy store errors.

use sym_core::SymError;
use sym_llm::InferenceError;

/// Errors from loading, editing, saving or importing a policy.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    /// Policy file could not be read or written.
    #[error("policy file {path}: {source}")]
    Io {
        /// Policy file.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The policy would be invalid after the change.
    #[error("policy validation failed: {message}")]
    Invalid {
        /// First problem found.
        message: String,
    },

    /// A required field is missing or malformed.
    #[error("{message}")]
    InvalidInput {
        /// Failure description.
        message: String,
    },

    /// Named category or rule does not exist.
    #[error("{kind} '{name}' not found")]
    NotFound {
        /// `category` or `rule`.
        kind: &'static str,
        /// Missing name or id.
        name: String,
    },

    /// Name or id already taken.
    #[error("{kind} '{name}' already exists")]
    AlreadyExists {
        /// `category` or `rule`.
        kind: &'static str,
        /// Duplicate name or id.
        name: String,
    },

    /// Category still referenced by rules.
    #[error("category '{name}' is used by {count} rule(s)")]
    InUse {
        /// Category name.
        name: String,
        /// Referencing rule count.
        count: usize,
    },

    /// Source document could not be used for import.
    #[error("import failed: {message}")]
    Import {
        /// Failure description.
        message: String,
    },

    /// Inference call failed during import.
    #[error(transparent)]
    Inference(#[from] InferenceError),
}

impl PolicyError {
    /// Missing or malformed input.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Validation failure.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

impl From<PolicyError> for SymError {
    fn from(err: PolicyError) -> Self {
        match err {
            PolicyError::Io { source, .. } => SymError::Io(source),
            PolicyError::Inference(e) => e.into(),
            other => SymError::config(other.to_string()),
        }
    }
}
