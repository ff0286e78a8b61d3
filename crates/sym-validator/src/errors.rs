//! Validation errors.

use sym_core::SymError;
use sym_llm::InferenceError;

/// A single engine failed to run. Recorded in `errors`, never as a pass.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// No engine registered under this id.
    #[error("unknown engine '{engine}'")]
    Unknown {
        /// Engine id.
        engine: String,
    },

    /// External tool missing.
    #[error("{engine} is not available: {message}")]
    Unavailable {
        /// Engine id.
        engine: String,
        /// Failure description.
        message: String,
    },

    /// The engine ran but failed.
    #[error("{engine} failed: {message}")]
    Execution {
        /// Engine id.
        engine: String,
        /// Failure description.
        message: String,
    },

    /// The rule check exceeded its deadline.
    #[error("{engine} timed out after {secs}s")]
    Timeout {
        /// Engine id.
        engine: String,
        /// Deadline in seconds.
        secs: u64,
    },

    /// Rule parameters unusable by the engine.
    #[error("invalid parameters: {message}")]
    InvalidParams {
        /// Failure description.
        message: String,
    },

    /// LLM call failed.
    #[error(transparent)]
    Inference(#[from] InferenceError),
}

impl EngineError {
    /// Execution failure for `engine`.
    pub fn execution(engine: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Execution {
            engine: engine.into(),
            message: message.into(),
        }
    }

    /// Bad parameters.
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::InvalidParams {
            message: message.into(),
        }
    }
}

/// Failures that abort a validation call.
#[derive(Debug, thiserror::Error)]
pub enum ValidatorError {
    /// The change set could not be read.
    #[error("failed to read changes: {message}")]
    Changes {
        /// Failure description.
        message: String,
    },

    /// History file could not be read or written.
    #[error("history {path}: {source}")]
    History {
        /// History file.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl From<ValidatorError> for SymError {
    fn from(err: ValidatorError) -> Self {
        match err {
            ValidatorError::Changes { message } => SymError::config(message),
            ValidatorError::History { source, .. } => SymError::Io(source),
        }
    }
}

impl From<EngineError> for SymError {
    fn from(err: EngineError) -> Self {
        let engine = match &err {
            EngineError::Unknown { engine }
            | EngineError::Unavailable { engine, .. }
            | EngineError::Execution { engine, .. }
            | EngineError::Timeout { engine, .. } => engine.clone(),
            EngineError::InvalidParams { .. } => String::new(),
            EngineError::Inference(_) => sym_core::LLM_VALIDATOR_ENGINE.to_owned(),
        };
        SymError::Engine {
            engine,
            message: err.to_string(),
        }
    }
}
