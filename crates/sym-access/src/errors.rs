//! Access error types.

use std::path::PathBuf;

use sym_core::SymError;
use thiserror::Error;

/// Failures while resolving the active role.
#[derive(Debug, Error)]
pub enum AccessError {
    /// Role store could not be read.
    #[error("failed to read roles file {}: {source}", .path.display())]
    RolesRead {
        /// Role store path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Role store is not a `role → [usernames]` object.
    #[error("invalid roles file {}: {source}", .path.display())]
    RolesParse {
        /// Role store path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
}

impl From<AccessError> for SymError {
    fn from(err: AccessError) -> Self {
        let message = err.to_string();
        match err {
            AccessError::RolesRead { path, .. } | AccessError::RolesParse { path, .. } => {
                SymError::config_at(message, path)
            }
        }
    }
}
