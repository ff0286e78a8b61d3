use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Severity;

/// Rule id used for access-control violations.
pub const RBAC_RULE_ID: &str = "rbac-permission-denied";

/// A single rule or permission violation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    /// Violated rule id.
    pub rule_id: String,
    /// Severity.
    pub severity: Severity,
    /// Human-readable message.
    pub message: String,
    /// File path relative to the repository root.
    pub file: String,
    /// 1-based line, 0 when unknown.
    #[serde(default)]
    pub line: usize,
    /// 1-based column, 0 when unknown.
    #[serde(default)]
    pub column: usize,
    /// Category of the violated rule.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub category: String,
}

impl Violation {
    /// Violation without a location inside the file.
    pub fn new(
        rule_id: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
        file: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            severity,
            message: message.into(),
            file: file.into(),
            line: 0,
            column: 0,
            category: String::new(),
        }
    }

    /// Attach a position.
    #[must_use]
    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.line = line;
        self.column = column;
        self
    }

    /// Attach a category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }
}

/// An engine that failed to execute. Never counted as a pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineFailure {
    /// Rule whose check failed.
    pub rule_id: String,
    /// Engine id.
    pub engine: String,
    /// Failure description.
    pub message: String,
}

/// Outcome of one validation call.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    /// Rule × file checks performed.
    pub checked: usize,
    /// Checks without violations.
    pub passed: usize,
    /// Checks with at least one violation.
    pub failed: usize,
    /// Rule and permission violations.
    pub violations: Vec<Violation>,
    /// Engine execution failures.
    pub errors: Vec<EngineFailure>,
}

impl ValidationResult {
    /// Overall status derived from violation severities.
    pub fn status(&self) -> ValidationStatus {
        ValidationStatus::classify(&self.violations)
    }

    /// Whether any violation is build-breaking.
    pub fn has_blocking_violations(&self) -> bool {
        self.status() == ValidationStatus::Failed
    }
}

/// Overall validation status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    /// No violations.
    Passed,
    /// Only non-error violations.
    Warning,
    /// At least one error violation.
    Failed,
}

impl ValidationStatus {
    /// Classify a violation set.
    pub fn classify(violations: &[Violation]) -> Self {
        if violations.iter().any(|v| v.severity == Severity::Error) {
            Self::Failed
        } else if violations.is_empty() {
            Self::Passed
        } else {
            Self::Warning
        }
    }
}

/// One entry of the capped validation history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationHistoryRecord {
    /// Record id (UUID v7, time ordered).
    pub id: String,
    /// When the validation ran.
    pub timestamp: DateTime<Utc>,
    /// Overall status.
    pub status: ValidationStatus,
    /// Checks performed.
    pub checked: usize,
    /// Checks passed.
    pub passed: usize,
    /// Checks failed.
    pub failed: usize,
    /// Violations found.
    pub violations: Vec<Violation>,
    /// Files included in the run.
    pub files_checked: Vec<String>,
}

impl ValidationHistoryRecord {
    /// Build a record from a result, stamped now.
    pub fn from_result(result: &ValidationResult, files_checked: Vec<String>) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            timestamp: Utc::now(),
            status: result.status(),
            checked: result.checked,
            passed: result.passed,
            failed: result.failed,
            violations: result.violations.clone(),
            files_checked,
        }
    }
}
