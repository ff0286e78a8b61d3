//! Access Evaluator: resolves a role's write permissions against file paths.

use serde::Serialize;
use sym_core::{CodePolicy, RBAC_RULE_ID, Severity, UserPolicy, UserRbac, UserRole, Violation};
use tracing::debug;

use crate::pattern::match_pattern;

/// Role that never has write access.
pub const NO_ROLE: &str = "none";

/// Outcome of evaluating a role against a file set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessDecision {
    /// True when no file was denied.
    pub allowed: bool,
    /// Denied files in input order.
    pub denied_files: Vec<String>,
}

impl AccessDecision {
    fn from_denied(denied_files: Vec<String>) -> Self {
        Self {
            allowed: denied_files.is_empty(),
            denied_files,
        }
    }
}

/// Condensed view of a role's permissions, for display to callers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleSummary {
    /// Role name.
    pub role: String,
    /// Whether the policy has a role section at all.
    pub rbac_enabled: bool,
    /// Whether the role is declared.
    pub known: bool,
    /// Allowed write patterns.
    pub allow_write: Vec<String>,
    /// Denied write patterns.
    pub deny_write: Vec<String>,
    /// May edit the policy.
    pub can_edit_policy: bool,
    /// May edit role assignments.
    pub can_edit_roles: bool,
}

/// Evaluates write access against a policy's role map.
#[derive(Clone, Debug, Default)]
pub struct AccessEvaluator {
    rbac: Option<UserRbac>,
}

impl AccessEvaluator {
    /// Evaluator over an explicit role section. `None` disables access control.
    pub fn new(rbac: Option<UserRbac>) -> Self {
        Self { rbac }
    }

    /// Evaluator over a natural-language policy.
    pub fn from_user_policy(policy: &UserPolicy) -> Self {
        Self::new(policy.rbac.clone())
    }

    /// Evaluator over a compiled policy.
    pub fn from_code_policy(policy: &CodePolicy) -> Self {
        Self::new(policy.rbac.clone())
    }

    /// Whether the policy has a role section.
    pub fn is_enabled(&self) -> bool {
        self.rbac.is_some()
    }

    /// Evaluate `role` against `files`.
    ///
    /// Order of checks:
    /// 1. `none` or empty role: every file denied
    /// 2. no role section: every file allowed
    /// 3. undeclared role: every file denied
    /// 4. per file: deny match → denied; empty allow → allowed; else must match an allow
    pub fn evaluate<S: AsRef<str>>(&self, role: &str, files: &[S]) -> AccessDecision {
        let all = || files.iter().map(|f| f.as_ref().to_owned()).collect();

        if role.is_empty() || role == NO_ROLE {
            debug!(role, file_count = files.len(), "no role, denying all files");
            return AccessDecision::from_denied(all());
        }

        let Some(rbac) = &self.rbac else {
            return AccessDecision::from_denied(Vec::new());
        };

        let Some(perms) = rbac.roles.get(role) else {
            debug!(role, "role not declared in policy, denying all files");
            return AccessDecision::from_denied(all());
        };

        let denied = files
            .iter()
            .map(AsRef::as_ref)
            .filter(|file| !can_write(perms, file))
            .map(ToOwned::to_owned)
            .collect();
        AccessDecision::from_denied(denied)
    }

    /// Whether `role` may write a single file.
    pub fn can_write(&self, role: &str, file: &str) -> bool {
        self.evaluate(role, &[file]).allowed
    }

    /// Permission violations for every denied file.
    pub fn violations<S: AsRef<str>>(&self, role: &str, files: &[S]) -> Vec<Violation> {
        self.evaluate(role, files)
            .denied_files
            .into_iter()
            .map(|file| {
                Violation::new(
                    RBAC_RULE_ID,
                    Severity::Error,
                    format!("Role '{role}' does not have permission to modify this file"),
                    file,
                )
                .with_category("rbac")
            })
            .collect()
    }

    /// Summary of a role's permissions.
    pub fn summary(&self, role: &str) -> RoleSummary {
        let perms = self.rbac.as_ref().and_then(|r| r.roles.get(role));
        let empty = UserRole::default();
        let p = perms.unwrap_or(&empty);
        RoleSummary {
            role: role.to_owned(),
            rbac_enabled: self.rbac.is_some(),
            known: perms.is_some(),
            allow_write: p.allow_write.clone(),
            deny_write: p.deny_write.clone(),
            can_edit_policy: p.can_edit_policy,
            can_edit_roles: p.can_edit_roles,
        }
    }

    /// Whether `role` may edit the policy file.
    ///
    /// Without a role section anyone may edit.
    pub fn can_edit_policy(&self, role: &str) -> bool {
        match &self.rbac {
            None => true,
            Some(rbac) => rbac.roles.get(role).is_some_and(|r| r.can_edit_policy),
        }
    }
}

fn can_write(perms: &UserRole, file: &str) -> bool {
    if perms.deny_write.iter().any(|p| match_pattern(p, file)) {
        return false;
    }
    if perms.allow_write.is_empty() {
        return true;
    }
    perms.allow_write.iter().any(|p| match_pattern(p, file))
}
