//! ESLint adapter: `.eslintrc.json` with native core rules only.

use serde_json::{Map, Value, json};
use sym_core::{Severity, UserRule};
use sym_llm::RuleIntent;

use super::{AdapterRule, LinterAdapter, mentions, merge_entries, render_json};
use crate::errors::ConvertError;

/// Core rules the adapter may emit. Plugin rules are never produced.
pub const ESLINT_RULES: &[&str] = &[
    "camelcase",
    "complexity",
    "eqeqeq",
    "id-match",
    "indent",
    "max-depth",
    "max-len",
    "max-lines",
    "max-lines-per-function",
    "max-nested-callbacks",
    "max-params",
    "new-cap",
    "no-alert",
    "no-console",
    "no-debugger",
    "no-eval",
    "no-implied-eval",
    "no-unused-vars",
    "no-var",
    "prefer-const",
    "quotes",
    "semi",
];

/// ESLint adapter.
#[derive(Clone, Copy, Debug, Default)]
pub struct EslintAdapter;

fn level(rule: &UserRule) -> &'static str {
    let given = if rule.severity.is_empty() { "error" } else { &rule.severity };
    match Severity::from_str_lossy(given) {
        Severity::Error => "error",
        Severity::Warning => "warn",
        Severity::Info => "off",
    }
}

fn has_word(text: &str, word: &str) -> bool {
    text.split(|c: char| !c.is_alphanumeric())
        .any(|w| w.eq_ignore_ascii_case(word))
}

impl EslintAdapter {
    fn entries(rule: &UserRule, intent: &RuleIntent) -> Map<String, Value> {
        let sev = level(rule);
        let mut out = Map::new();
        let mut put = |name: &str, value: Value| {
            let _ = out.insert(name.to_owned(), value);
        };

        // Explicit hint wins when whitelisted.
        if let Some(name) = intent.param_str("eslintRule") {
            if ESLINT_RULES.contains(&name) {
                match intent.params.get("options") {
                    Some(opts) if !opts.is_null() => put(name, json!([sev, opts])),
                    _ => put(name, json!(sev)),
                }
            }
            return out;
        }

        let max = intent.param_u64("max");
        match intent.engine.as_str() {
            "length" => match (intent.target.as_str(), intent.scope.as_str(), max) {
                ("function" | "method", _, Some(max)) | (_, "function" | "method", Some(max)) => {
                    put(
                        "max-lines-per-function",
                        json!([sev, {"max": max, "skipBlankLines": true, "skipComments": true}]),
                    );
                }
                ("file", _, Some(max)) | (_, "file", Some(max)) => {
                    put("max-lines", json!([sev, {"max": max}]));
                }
                (_, _, Some(max)) if mentions(rule, intent, &["param", "argument"]) => {
                    put("max-params", json!([sev, {"max": max}]));
                }
                ("line" | "content" | "", _, Some(max)) => {
                    put("max-len", json!([sev, {"code": max}]));
                }
                _ => {}
            },
            "style" => {
                if let Some(quote) = intent.param_str("quote") {
                    put("quotes", json!([sev, quote]));
                }
                if let Some(semi) = intent.param_bool("semi") {
                    put("semi", json!([sev, if semi { "always" } else { "never" }]));
                }
                if let Some(indent) = intent.param_u64("indent") {
                    put("indent", json!([sev, indent]));
                }
            }
            "pattern" => {
                if intent.param_str("case") == Some("camelCase") {
                    put("camelcase", json!([sev, {"properties": "always"}]));
                }
                if intent.param_str("case") == Some("PascalCase") && intent.target == "class" {
                    put("new-cap", json!(sev));
                }
                for (word, name) in [
                    ("console", "no-console"),
                    ("debugger", "no-debugger"),
                    ("eval", "no-eval"),
                    ("alert", "no-alert"),
                ] {
                    if mentions(rule, intent, &[word]) {
                        put(name, json!(sev));
                    }
                }
                if has_word(&rule.say, "var") {
                    put("no-var", json!(sev));
                }
                if mentions(rule, intent, &["===", "strict equality"]) {
                    put("eqeqeq", json!([sev, "always"]));
                }
                if mentions(rule, intent, &["unused"]) {
                    put("no-unused-vars", json!(sev));
                }
            }
            "ast" => {
                if let Some(max) = intent.param_u64("maxDepth").or(max) {
                    if mentions(rule, intent, &["complexity", "cyclomatic"]) {
                        put("complexity", json!([sev, {"max": max}]));
                    } else if mentions(rule, intent, &["callback"]) {
                        put("max-nested-callbacks", json!([sev, {"max": max}]));
                    } else {
                        put("max-depth", json!([sev, {"max": max}]));
                    }
                }
            }
            _ => {}
        }
        out.retain(|name, _| ESLINT_RULES.contains(&name.as_str()));
        out
    }
}

impl LinterAdapter for EslintAdapter {
    fn name(&self) -> &'static str {
        "eslint"
    }

    fn supported_languages(&self) -> &'static [&'static str] {
        &["javascript", "js", "typescript", "ts", "jsx", "tsx"]
    }

    fn config_file(&self) -> &'static str {
        ".eslintrc.json"
    }

    fn convert(
        &self,
        rule: &UserRule,
        intent: &RuleIntent,
    ) -> Result<Option<AdapterRule>, ConvertError> {
        let entries = Self::entries(rule, intent);
        Ok((!entries.is_empty()).then(|| AdapterRule {
            rule_id: rule.id.clone(),
            entries,
        }))
    }

    fn build_config(&self, rules: &[AdapterRule]) -> Result<String, ConvertError> {
        let config = json!({
            "env": {"es2021": true, "node": true, "browser": true},
            "parserOptions": {"ecmaVersion": "latest", "sourceType": "module"},
            "rules": merge_entries(rules),
        });
        render_json(self.name(), &config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(say: &str, severity: &str) -> UserRule {
        UserRule {
            id: "R".into(),
            say: say.into(),
            severity: severity.into(),
            ..UserRule::default()
        }
    }

    fn intent(json: &str) -> RuleIntent {
        sym_llm::parse_intent(json).unwrap()
    }

    #[test]
    fn line_length_maps_to_max_len() {
        let out = EslintAdapter
            .convert(
                &rule("Lines must not exceed 100 characters", "warning"),
                &intent(r#"{"engine": "length", "target": "line", "params": {"max": 100}}"#),
            )
            .unwrap()
            .unwrap();
        assert_eq!(out.entries["max-len"], json!(["warn", {"code": 100}]));
    }

    #[test]
    fn console_ban_maps_to_no_console() {
        let out = EslintAdapter
            .convert(
                &rule("No console.log in production code", ""),
                &intent(r#"{"engine": "pattern", "patterns": ["console\\.log"]}"#),
            )
            .unwrap()
            .unwrap();
        assert_eq!(out.entries["no-console"], json!("error"));
    }

    #[test]
    fn style_params_map() {
        let out = EslintAdapter
            .convert(
                &rule("Use single quotes and semicolons", "error"),
                &intent(r#"{"engine": "style", "params": {"quote": "single", "semi": true}}"#),
            )
            .unwrap()
            .unwrap();
        assert_eq!(out.entries["quotes"], json!(["error", "single"]));
        assert_eq!(out.entries["semi"], json!(["error", "always"]));
    }

    #[test]
    fn hint_outside_whitelist_is_rejected() {
        let out = EslintAdapter
            .convert(
                &rule("Use the plugin", ""),
                &intent(
                    r#"{"engine": "pattern",
                        "params": {"eslintRule": "@typescript-eslint/no-explicit-any"}}"#,
                ),
            )
            .unwrap();
        assert!(out.is_none());
    }

    #[test]
    fn semantic_rule_yields_nothing() {
        let out = EslintAdapter
            .convert(
                &rule("API handlers must return proper status codes", ""),
                &intent(r#"{"engine": "llm-validator"}"#),
            )
            .unwrap();
        assert!(out.is_none());
    }

    #[test]
    fn var_needs_whole_word() {
        let i = intent(r#"{"engine": "pattern"}"#);
        let out =
            EslintAdapter.convert(&rule("Never use var, prefer let", ""), &i).unwrap().unwrap();
        assert!(out.entries.contains_key("no-var"));
        let vague =
            EslintAdapter.convert(&rule("Variables need descriptive names", ""), &i).unwrap();
        assert!(vague.is_none());
    }

    #[test]
    fn config_layout() {
        let rules = vec![AdapterRule {
            rule_id: "R".into(),
            entries: serde_json::from_value(json!({"no-console": "error"})).unwrap(),
        }];
        let text = EslintAdapter.build_config(&rules).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["env"]["es2021"], true);
        assert_eq!(value["parserOptions"]["sourceType"], "module");
        assert_eq!(value["rules"]["no-console"], "error");
    }
}
