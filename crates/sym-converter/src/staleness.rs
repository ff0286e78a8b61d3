//! Re-conversion heuristic.

use std::collections::HashSet;

use sym_core::{CodePolicy, UserPolicy};

/// Whether `code` must be regenerated from `user`.
///
/// True when there is no compiled policy, when the source has more rules,
/// or when a source rule id is missing from the compiled policy.
///
/// Rule bodies are not compared: editing a rule's text while keeping its id
/// does not mark the compiled policy stale. Callers that need exact
/// freshness must convert explicitly.
pub fn needs_reconversion(user: &UserPolicy, code: Option<&CodePolicy>) -> bool {
    let Some(code) = code else {
        return true;
    };
    if user.rules.len() > code.rules.len() {
        return true;
    }
    let compiled: HashSet<&str> = code.rules.iter().map(|r| r.id.as_str()).collect();
    user.rules.iter().any(|r| !compiled.contains(r.id.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sym_core::{CheckSpec, PolicyRule, Severity, UserRule};

    fn user(ids: &[&str]) -> UserPolicy {
        UserPolicy {
            rules: ids
                .iter()
                .map(|id| UserRule {
                    id: (*id).into(),
                    say: format!("rule {id}"),
                    ..UserRule::default()
                })
                .collect(),
            ..UserPolicy::default()
        }
    }

    fn code(ids: &[&str]) -> CodePolicy {
        CodePolicy {
            rules: ids
                .iter()
                .map(|id| PolicyRule {
                    id: (*id).into(),
                    enabled: true,
                    category: String::new(),
                    severity: Severity::Error,
                    desc: String::new(),
                    when: None,
                    check: CheckSpec::engine("llm-validator"),
                    remedy: None,
                    message: String::new(),
                })
                .collect(),
            ..CodePolicy::default()
        }
    }

    #[test]
    fn missing_code_policy_is_stale() {
        assert!(needs_reconversion(&user(&["A"]), None));
    }

    #[test]
    fn added_or_renamed_rule_is_stale() {
        assert!(needs_reconversion(&user(&["A", "B"]), Some(&code(&["A"]))));
        assert!(needs_reconversion(&user(&["A", "C"]), Some(&code(&["A", "B"]))));
    }

    #[test]
    fn same_ids_are_fresh() {
        assert!(!needs_reconversion(&user(&["A", "B"]), Some(&code(&["B", "A"]))));
        // removal alone does not trigger
        assert!(!needs_reconversion(&user(&["A"]), Some(&code(&["A", "B"]))));
    }

    #[test]
    fn edited_text_with_same_id_is_not_detected() {
        let mut edited = user(&["A"]);
        edited.rules[0].say = "completely different rule".into();
        assert!(!needs_reconversion(&edited, Some(&code(&["A"]))));
    }
}
