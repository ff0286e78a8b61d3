use std::fmt;

use serde::{Deserialize, Serialize};

/// Violation severity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational only.
    Info,
    /// Visible but not build-breaking.
    Warning,
    /// Build-breaking.
    #[default]
    Error,
}

impl Severity {
    /// Parse leniently, accepting common abbreviations.
    ///
    /// Unknown values map to [`Severity::Warning`].
    pub fn from_str_lossy(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "error" | "err" => Self::Error,
            "info" | "information" => Self::Info,
            _ => Self::Warning,
        }
    }

    /// Resolve a user-authored severity with fallbacks.
    ///
    /// Empty strings fall through to the next candidate; `"error"` when all are empty.
    pub fn resolve(candidates: &[&str]) -> Self {
        candidates
            .iter()
            .find(|s| !s.trim().is_empty())
            .map_or(Self::Error, |s| Self::from_str_lossy(s))
    }

    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
