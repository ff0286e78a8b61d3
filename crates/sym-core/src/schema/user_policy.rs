use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Natural-language policy authored by the team.
///
/// Persisted as `user-policy.json`. This is the source of truth; the compiled
/// [`CodePolicy`](super::CodePolicy) is derived from it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPolicy {
    /// Schema version.
    #[serde(default)]
    pub version: String,
    /// Declared categories, in authoring order.
    #[serde(default, rename = "category", skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<CategoryDef>,
    /// Role-based write access. `None` means no access control.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rbac: Option<UserRbac>,
    /// Values applied to rules that leave a field unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defaults: Option<UserDefaults>,
    /// Rules, in authoring order.
    #[serde(default)]
    pub rules: Vec<UserRule>,
}

impl UserPolicy {
    /// Look up a rule by id.
    pub fn rule(&self, id: &str) -> Option<&UserRule> {
        self.rules.iter().find(|r| r.id == id)
    }

    /// Look up a category by name.
    pub fn category(&self, name: &str) -> Option<&CategoryDef> {
        self.categories.iter().find(|c| c.name == name)
    }

    /// Default languages, or an empty slice.
    pub fn default_languages(&self) -> &[String] {
        self.defaults.as_ref().map_or(&[], |d| d.languages.as_slice())
    }

    /// Default severity, or an empty string.
    pub fn default_severity(&self) -> &str {
        self.defaults.as_ref().map_or("", |d| d.severity.as_str())
    }

    /// Default autofix flag.
    pub fn default_autofix(&self) -> bool {
        self.defaults.as_ref().is_some_and(|d| d.autofix)
    }
}

/// A named grouping of rules.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDef {
    /// Unique category name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
}

/// Role section of a [`UserPolicy`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRbac {
    /// Role name → permissions.
    #[serde(default)]
    pub roles: BTreeMap<String, UserRole>,
}

/// Write permissions of a single role.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRole {
    /// Glob patterns the role may write. Empty means unrestricted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allow_write: Vec<String>,
    /// Glob patterns the role may never write. Takes precedence over allow.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deny_write: Vec<String>,
    /// Glob patterns the role may execute.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allow_exec: Vec<String>,
    /// May edit the policy file.
    #[serde(default)]
    pub can_edit_policy: bool,
    /// May edit role assignments.
    #[serde(default)]
    pub can_edit_roles: bool,
}

/// Policy-wide defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDefaults {
    /// Languages assumed when a rule declares none.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<String>,
    /// Primary language of the repository.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub default_language: String,
    /// Default include globs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
    /// Default exclude globs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
    /// Default severity (`error`, `warning`, `info`).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub severity: String,
    /// Default autofix flag.
    #[serde(default)]
    pub autofix: bool,
}

/// A natural-language rule.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRule {
    /// Unique rule id.
    pub id: String,
    /// What the rule demands, in plain language.
    pub say: String,
    /// Category name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub category: String,
    /// Target languages. Empty means universal.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<String>,
    /// Include globs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
    /// Exclude globs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
    /// Severity as authored; resolved during conversion.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub severity: String,
    /// Whether an automatic fix may be applied.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub autofix: bool,
    /// Hints merged into the inferred intent parameters.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, Value>,
    /// Message shown on violation.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    /// Example of compliant or non-compliant code.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub example: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "version": "1.0.0",
            "category": [
                {"name": "security", "description": "Security rules"}
            ],
            "rbac": {
                "roles": {
                    "admin": {"allowWrite": ["**/*"], "canEditPolicy": true, "canEditRoles": true},
                    "viewer": {"denyWrite": ["**/*"]}
                }
            },
            "defaults": {"languages": ["javascript"], "severity": "warning", "autofix": true},
            "rules": [
                {
                    "id": "SEC-001",
                    "say": "No hardcoded secrets",
                    "category": "security",
                    "languages": ["javascript"]
                }
            ]
        })
    }

    #[test]
    fn parses_full_policy() {
        let policy: UserPolicy = serde_json::from_value(sample()).unwrap();
        assert_eq!(policy.version, "1.0.0");
        assert_eq!(policy.categories.len(), 1);
        assert_eq!(policy.categories[0].name, "security");
        let rbac = policy.rbac.as_ref().unwrap();
        assert!(rbac.roles["admin"].can_edit_policy);
        assert_eq!(rbac.roles["viewer"].deny_write, vec!["**/*"]);
        assert_eq!(policy.default_languages(), ["javascript"]);
        assert_eq!(policy.default_severity(), "warning");
        assert!(policy.default_autofix());
        assert_eq!(policy.rule("SEC-001").unwrap().category, "security");
    }

    #[test]
    fn category_key_is_singular_on_the_wire() {
        let policy: UserPolicy = serde_json::from_value(sample()).unwrap();
        let value = serde_json::to_value(&policy).unwrap();
        assert!(value.get("category").is_some());
        assert!(value.get("categories").is_none());
    }

    #[test]
    fn minimal_policy_has_no_rbac() {
        let policy: UserPolicy = serde_json::from_str(r#"{"version":"1","rules":[]}"#).unwrap();
        assert!(policy.rbac.is_none());
        assert!(policy.default_languages().is_empty());
        assert_eq!(policy.default_severity(), "");
        assert!(!policy.default_autofix());
    }

    #[test]
    fn empty_fields_are_omitted() {
        let rule = UserRule {
            id: "R1".into(),
            say: "Use camelCase".into(),
            ..UserRule::default()
        };
        let value = serde_json::to_value(&rule).unwrap();
        assert_eq!(value, json!({"id": "R1", "say": "Use camelCase"}));
    }

    #[test]
    fn lookup_missing_entries() {
        let policy = UserPolicy::default();
        assert!(policy.rule("nope").is_none());
        assert!(policy.category("nope").is_none());
    }
}
