use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Severity, UserRbac};

/// Engine id for rules that must be judged by an LLM at validation time.
pub const LLM_VALIDATOR_ENGINE: &str = "llm-validator";

/// Compiled, machine-checkable policy. Regenerated by the converter.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodePolicy {
    /// Schema version, copied from the source policy.
    #[serde(default)]
    pub version: String,
    /// Role map carried over from the source policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rbac: Option<UserRbac>,
    /// Compiled rules in source order.
    #[serde(default)]
    pub rules: Vec<PolicyRule>,
    /// Enforcement settings.
    #[serde(default)]
    pub enforce: Enforce,
}

impl CodePolicy {
    /// Look up a compiled rule by id.
    pub fn rule(&self, id: &str) -> Option<&PolicyRule> {
        self.rules.iter().find(|r| r.id == id)
    }

    /// Enabled rules in order.
    pub fn enabled_rules(&self) -> impl Iterator<Item = &PolicyRule> {
        self.rules.iter().filter(|r| r.enabled)
    }
}

/// A compiled rule.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyRule {
    /// Rule id, identical to the source rule id.
    pub id: String,
    /// Disabled rules are kept but skipped during validation.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Category name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub category: String,
    /// Resolved severity.
    #[serde(default)]
    pub severity: Severity,
    /// Natural-language description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub desc: String,
    /// Which files the rule applies to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<Selector>,
    /// Engine assignment and engine parameters.
    pub check: CheckSpec,
    /// Fix hints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remedy: Option<Remedy>,
    /// Message reported on violation.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

fn default_true() -> bool {
    true
}

impl PolicyRule {
    /// Engine id responsible for this rule.
    pub fn engine(&self) -> &str {
        &self.check.engine
    }

    /// String parameter from the check descriptor.
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.check.params.get(key).and_then(Value::as_str)
    }

    /// Integer parameter from the check descriptor.
    pub fn param_u64(&self, key: &str) -> Option<u64> {
        self.check.params.get(key).and_then(Value::as_u64)
    }

    /// String-list parameter from the check descriptor.
    pub fn param_strings(&self, key: &str) -> Vec<String> {
        self.check
            .params
            .get(key)
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(Value::as_str)
                    .map(ToOwned::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// File selector.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selector {
    /// Languages the rule targets. Empty means any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<String>,
    /// Include globs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
    /// Exclude globs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
}

impl Selector {
    /// True when the selector constrains nothing.
    pub fn is_empty(&self) -> bool {
        self.languages.is_empty() && self.include.is_empty() && self.exclude.is_empty()
    }
}

/// Engine assignment plus engine-specific parameters (flattened on the wire).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckSpec {
    /// Engine id (`pattern`, `length`, `style`, `ast`, a linter name, or `llm-validator`).
    pub engine: String,
    /// Engine parameters.
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl CheckSpec {
    /// Check descriptor for an engine with no parameters.
    pub fn engine(engine: impl Into<String>) -> Self {
        Self {
            engine: engine.into(),
            params: Map::new(),
        }
    }
}

/// Fix hints for a rule.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remedy {
    /// Whether an automatic fix may be applied.
    #[serde(default)]
    pub autofix: bool,
    /// Tool that applies the fix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
}

/// Enforcement settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enforce {
    /// Git hook stages at which validation runs.
    #[serde(default)]
    pub stages: Vec<String>,
    /// Severities that fail the build.
    #[serde(default)]
    pub fail_on: Vec<String>,
    /// Access-control enforcement, present when the policy has roles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rbac: Option<EnforceRbac>,
}

impl Default for Enforce {
    fn default() -> Self {
        Self {
            stages: vec!["pre-commit".into(), "pre-push".into()],
            fail_on: vec!["error".into()],
            rbac: None,
        }
    }
}

/// Access-control enforcement settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnforceRbac {
    /// Whether access checks run.
    pub enabled: bool,
    /// Stages at which access checks run.
    #[serde(default)]
    pub stages: Vec<String>,
    /// Action on violation (`block` or `warn`).
    pub on_violation: String,
}

impl Default for EnforceRbac {
    fn default() -> Self {
        Self {
            enabled: true,
            stages: vec!["pre-commit".into()],
            on_violation: "block".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn check_params_flatten() {
        let value = json!({
            "id": "LEN-001",
            "enabled": true,
            "severity": "warning",
            "check": {"engine": "length", "max": 100, "scope": "line"}
        });
        let rule: PolicyRule = serde_json::from_value(value).unwrap();
        assert_eq!(rule.engine(), "length");
        assert_eq!(rule.param_u64("max"), Some(100));
        assert_eq!(rule.param_str("scope"), Some("line"));
        assert_eq!(rule.severity, Severity::Warning);

        let back = serde_json::to_value(&rule).unwrap();
        assert_eq!(back["check"]["max"], 100);
        assert_eq!(back["check"]["engine"], "length");
    }

    #[test]
    fn enabled_defaults_to_true() {
        let rule: PolicyRule =
            serde_json::from_value(json!({"id": "R", "check": {"engine": "style"}})).unwrap();
        assert!(rule.enabled);
        assert_eq!(rule.severity, Severity::Error);
    }

    #[test]
    fn param_strings_ignores_non_strings() {
        let mut rule: PolicyRule =
            serde_json::from_value(json!({"id": "R", "check": {"engine": "pattern"}})).unwrap();
        let _ = rule
            .check
            .params
            .insert("patterns".into(), json!(["a", 1, "b"]));
        assert_eq!(rule.param_strings("patterns"), vec!["a", "b"]);
        assert!(rule.param_strings("missing").is_empty());
    }

    #[test]
    fn enforce_defaults() {
        let enforce = Enforce::default();
        assert_eq!(enforce.stages, vec!["pre-commit", "pre-push"]);
        assert_eq!(enforce.fail_on, vec!["error"]);
        assert!(enforce.rbac.is_none());

        let value = serde_json::to_value(&enforce).unwrap();
        assert!(value.get("failOn").is_some());
    }

    #[test]
    fn enabled_rules_skips_disabled() {
        let policy: CodePolicy = serde_json::from_value(json!({
            "version": "1",
            "rules": [
                {"id": "A", "check": {"engine": "style"}},
                {"id": "B", "enabled": false, "check": {"engine": "style"}}
            ]
        }))
        .unwrap();
        let ids: Vec<&str> = policy.enabled_rules().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["A"]);
        assert!(policy.rule("B").is_some());
    }

    #[test]
    fn selector_is_empty() {
        assert!(Selector::default().is_empty());
        let sel = Selector {
            languages: vec!["go".into()],
            ..Selector::default()
        };
        assert!(!sel.is_empty());
    }
}
