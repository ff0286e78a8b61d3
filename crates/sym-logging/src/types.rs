//! Logging configuration types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Minimum log level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Detailed entry/exit points.
    Trace,
    /// Intermediate values, decisions.
    Debug,
    /// Outcomes, summaries.
    Info,
    /// Non-fatal issues.
    #[default]
    Warn,
    /// Errors.
    Error,
}

impl LogLevel {
    /// Convert from string (case-insensitive). Unknown values map to `Warn`.
    #[must_use]
    pub fn from_str_lossy(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "trace" => Self::Trace,
            "debug" => Self::Debug,
            "info" => Self::Info,
            "error" => Self::Error,
            _ => Self::Warn,
        }
    }

    /// Directive string for `EnvFilter`.
    #[must_use]
    pub const fn as_filter_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_filter_str())
    }
}

/// Output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable single line.
    #[default]
    Compact,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Convert from string (case-insensitive). Unknown values map to `Compact`.
    #[must_use]
    pub fn from_str_lossy(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Compact
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_parsing() {
        assert_eq!(LogLevel::from_str_lossy("DEBUG"), LogLevel::Debug);
        assert_eq!(LogLevel::from_str_lossy(" info "), LogLevel::Info);
        assert_eq!(LogLevel::from_str_lossy("verbose"), LogLevel::Warn);
    }

    #[test]
    fn level_display_matches_filter() {
        assert_eq!(LogLevel::Error.to_string(), "error");
        assert_eq!(LogLevel::Trace.as_filter_str(), "trace");
    }

    #[test]
    fn level_ordering() {
        assert!(LogLevel::Trace < LogLevel::Warn);
        assert!(LogLevel::Error > LogLevel::Info);
    }

    #[test]
    fn format_parsing() {
        assert_eq!(LogFormat::from_str_lossy("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::from_str_lossy("pretty"), LogFormat::Compact);
    }
}
