//! Checks applied before a policy is written.

use std::collections::HashSet;

use sym_core::UserPolicy;

use crate::errors::PolicyError;

/// Reject a policy that is structurally broken or could no longer be edited.
///
/// Returns the first problem found.
pub fn validate_policy(policy: &UserPolicy) -> Result<(), PolicyError> {
    if policy.version.trim().is_empty() {
        return Err(PolicyError::invalid("policy version is required"));
    }

    let mut seen = HashSet::new();
    for (i, rule) in policy.rules.iter().enumerate() {
        let n = i + 1;
        if rule.id.trim().is_empty() {
            return Err(PolicyError::invalid(format!("rule {n}: 'id' field is required")));
        }
        if rule.say.trim().is_empty() {
            return Err(PolicyError::invalid(format!("rule {n}: 'say' field is required")));
        }
        if !seen.insert(rule.id.as_str()) {
            return Err(PolicyError::invalid(format!("duplicate rule id: {}", rule.id)));
        }
    }

    let Some(rbac) = &policy.rbac else {
        return Ok(());
    };
    for (name, role) in &rbac.roles {
        if name.trim().is_empty() {
            return Err(PolicyError::invalid("role name cannot be empty"));
        }
        let has_patterns = !role.allow_write.is_empty() || !role.deny_write.is_empty();
        if !has_patterns && !role.can_edit_policy && !role.can_edit_roles {
            return Err(PolicyError::invalid(format!(
                "role '{name}' must have at least one allowWrite or denyWrite pattern"
            )));
        }
    }
    if !rbac.roles.is_empty() && !rbac.roles.values().any(|r| r.can_edit_policy) {
        return Err(PolicyError::invalid("at least one role must have 'canEditPolicy' permission"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn policy(value: serde_json::Value) -> UserPolicy {
        serde_json::from_value(value).unwrap()
    }

    fn message(p: &UserPolicy) -> String {
        validate_policy(p).unwrap_err().to_string()
    }

    #[test]
    fn valid_policy_passes() {
        let p = policy(json!({
            "version": "1.0.0",
            "rbac": {"roles": {
                "admin": {"allowWrite": ["**/*"], "canEditPolicy": true},
                "viewer": {"denyWrite": ["**/*"]}
            }},
            "rules": [{"id": "A", "say": "a"}, {"id": "B", "say": "b"}]
        }));
        validate_policy(&p).unwrap();
    }

    #[test]
    fn version_is_required() {
        assert!(message(&UserPolicy::default()).contains("version is required"));
    }

    #[test]
    fn rule_problems() {
        let p = policy(json!({"version": "1", "rules": [{"id": "A", "say": ""}]}));
        assert!(message(&p).contains("rule 1: 'say'"));

        let p = policy(json!({"version": "1", "rules": [{"id": " ", "say": "x"}]}));
        assert!(message(&p).contains("rule 1: 'id'"));

        let p = policy(json!({
            "version": "1",
            "rules": [{"id": "A", "say": "x"}, {"id": "A", "say": "y"}]
        }));
        assert!(message(&p).contains("duplicate rule id: A"));
    }

    #[test]
    fn some_role_must_edit_the_policy() {
        let p = policy(json!({
            "version": "1",
            "rbac": {"roles": {"dev": {"allowWrite": ["src/**"]}}}
        }));
        assert!(message(&p).contains("canEditPolicy"));
    }

    #[test]
    fn role_needs_patterns_or_edit_rights() {
        let p = policy(json!({
            "version": "1",
            "rbac": {"roles": {
                "admin": {"canEditPolicy": true},
                "ghost": {}
            }}
        }));
        assert!(message(&p).contains("role 'ghost'"));
    }

    #[test]
    fn empty_role_map_is_fine() {
        let p = policy(json!({"version": "1", "rbac": {"roles": {}}}));
        validate_policy(&p).unwrap();
    }
}
