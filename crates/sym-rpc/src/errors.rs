//! Error codes and the handler error type.

use sym_converter::ConvertError;
use sym_llm::InferenceError;
use sym_policy::PolicyError;
use sym_validator::ValidatorError;

use crate::types::RpcErrorBody;

// ── Error code constants ────────────────────────────────────────────

/// Invalid or missing parameters.
pub const INVALID_PARAMS: &str = "INVALID_PARAMS";
/// Unexpected internal error.
pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
/// Method not found in the registry.
pub const METHOD_NOT_FOUND: &str = "METHOD_NOT_FOUND";
/// Request line was not valid JSON.
pub const PARSE_ERROR: &str = "PARSE_ERROR";
/// Resource or backend not available.
pub const NOT_AVAILABLE: &str = "NOT_AVAILABLE";
/// Category, rule or file does not exist.
pub const NOT_FOUND: &str = "NOT_FOUND";
/// Operation not valid in the current state.
pub const INVALID_OPERATION: &str = "INVALID_OPERATION";
/// Name or id already taken.
pub const ALREADY_EXISTS: &str = "ALREADY_EXISTS";
/// Active role may not perform the operation.
pub const PERMISSION_DENIED: &str = "PERMISSION_DENIED";

/// Error returned by handlers.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// Required parameter missing or wrong type.
    #[error("{message}")]
    InvalidParams {
        /// Description of what is wrong.
        message: String,
    },

    /// Requested resource not found.
    #[error("{message}")]
    NotFound {
        /// Human-readable message.
        message: String,
    },

    /// Internal failure.
    #[error("{message}")]
    Internal {
        /// Description.
        message: String,
    },

    /// Backend or resource not available.
    #[error("{message}")]
    NotAvailable {
        /// Description.
        message: String,
    },

    /// Domain-specific error with an arbitrary code.
    #[error("{message}")]
    Custom {
        /// Machine-readable code.
        code: String,
        /// Human-readable message.
        message: String,
        /// Optional structured details.
        details: Option<serde_json::Value>,
    },
}

impl RpcError {
    /// Machine-readable error code for this variant.
    pub fn code(&self) -> &str {
        match self {
            Self::InvalidParams { .. } => INVALID_PARAMS,
            Self::NotFound { .. } => NOT_FOUND,
            Self::Internal { .. } => INTERNAL_ERROR,
            Self::NotAvailable { .. } => NOT_AVAILABLE,
            Self::Custom { code, .. } => code,
        }
    }

    /// Convert to the wire-format error body.
    pub fn to_error_body(&self) -> RpcErrorBody {
        RpcErrorBody {
            code: self.code().to_owned(),
            message: self.to_string(),
            details: match self {
                Self::Custom { details, .. } => details.clone(),
                _ => None,
            },
        }
    }

    /// Error with a custom code and no details.
    pub fn custom(code: &str, message: impl Into<String>) -> Self {
        Self::Custom {
            code: code.to_owned(),
            message: message.into(),
            details: None,
        }
    }

    /// Missing or malformed parameter.
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::InvalidParams {
            message: message.into(),
        }
    }
}

impl From<PolicyError> for RpcError {
    fn from(err: PolicyError) -> Self {
        let message = err.to_string();
        match err {
            PolicyError::NotFound { .. } => Self::NotFound { message },
            PolicyError::AlreadyExists { .. } => Self::custom(ALREADY_EXISTS, message),
            PolicyError::InUse { .. } | PolicyError::Invalid { .. } => {
                Self::custom(INVALID_OPERATION, message)
            }
            PolicyError::InvalidInput { .. } | PolicyError::Import { .. } => {
                Self::InvalidParams { message }
            }
            PolicyError::Inference(e) => e.into(),
            PolicyError::Io { .. } => Self::Internal { message },
        }
    }
}

impl From<InferenceError> for RpcError {
    fn from(err: InferenceError) -> Self {
        match err {
            InferenceError::NotConfigured { .. } => Self::NotAvailable {
                message: err.to_string(),
            },
            other => Self::Internal {
                message: other.to_string(),
            },
        }
    }
}

impl From<ConvertError> for RpcError {
    fn from(err: ConvertError) -> Self {
        match err {
            ConvertError::NoClient(e) => e.into(),
            other => Self::Internal {
                message: other.to_string(),
            },
        }
    }
}

impl From<ValidatorError> for RpcError {
    fn from(err: ValidatorError) -> Self {
        match err {
            ValidatorError::Changes { .. } => Self::custom(INVALID_OPERATION, err.to_string()),
            ValidatorError::History { .. } => Self::Internal {
                message: err.to_string(),
            },
        }
    }
}
