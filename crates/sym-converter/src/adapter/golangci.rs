//! golangci-lint adapter: enabled linters and their settings in `.golangci.yml`.
//!
//! Entries map a linter name to its settings object (possibly empty).

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde_json::{Map, Value, json};
use sym_core::UserRule;
use sym_llm::RuleIntent;

use super::{AdapterRule, LinterAdapter, declares_any, mentions};
use crate::errors::ConvertError;

/// Linters the adapter may enable, with the settings each accepts.
pub const GOLANGCI_LINTERS: &[(&str, &[&str])] = &[
    ("errcheck", &["check-type-assertions", "check-blank"]),
    ("wrapcheck", &[]),
    ("govet", &[]),
    ("staticcheck", &[]),
    ("ineffassign", &[]),
    ("unused", &[]),
    ("gocyclo", &["min-complexity"]),
    ("gocognit", &["min-complexity"]),
    ("nestif", &["min-complexity"]),
    ("funlen", &["lines", "statements"]),
    ("lll", &["line-length", "tab-width"]),
    ("prealloc", &[]),
    ("gosec", &["severity", "confidence"]),
    ("gofmt", &["simplify"]),
    ("goimports", &["local-prefixes"]),
    ("revive", &["severity"]),
    ("goconst", &["min-len", "min-occurrences"]),
    ("misspell", &["locale"]),
    ("unconvert", &[]),
    ("bodyclose", &[]),
    ("dupl", &["threshold"]),
    ("gocritic", &[]),
    ("godot", &[]),
    ("noctx", &[]),
    ("rowserrcheck", &[]),
    ("sqlclosecheck", &[]),
];

/// Keyword groups that select a linter, checked in order.
const KEYWORD_LINTERS: &[(&[&str], &str)] = &[
    (
        &[
            "unchecked error",
            "ignore error",
            "ignored error",
            "check error",
            "errors must be checked",
        ],
        "errcheck",
    ),
    (&["wrap"], "wrapcheck"),
    (&["sql injection", "secret", "credential", "security", "crypto"], "gosec"),
    (&["response body", "body.close", "close the body"], "bodyclose"),
    (&["rows.err"], "rowserrcheck"),
    (&["sql.rows", "close rows", "close statement"], "sqlclosecheck"),
    (&["context"], "noctx"),
    (&["repeated string", "magic string", "string constant"], "goconst"),
    (&["misspell", "spelling"], "misspell"),
    (&["duplicate code", "duplicated code", "clone"], "dupl"),
    (&["prealloc"], "prealloc"),
    (&["unused"], "unused"),
    (&["comment", "period"], "godot"),
];

/// golangci-lint adapter.
#[derive(Clone, Copy, Debug, Default)]
pub struct GolangciAdapter;

fn allowed_settings(linter: &str) -> Option<&'static [&'static str]> {
    GOLANGCI_LINTERS.iter().find(|(name, _)| *name == linter).map(|(_, keys)| *keys)
}

fn with_settings(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs.iter().map(|(k, v)| ((*k).to_owned(), v.clone())).collect()
}

impl GolangciAdapter {
    fn linter(rule: &UserRule, intent: &RuleIntent) -> Option<(String, Map<String, Value>)> {
        if let Some(name) = intent.param_str("golangciLinter") {
            let name = name.to_lowercase();
            let allowed = allowed_settings(&name)?;
            let given = intent
                .params
                .get("settings")
                .and_then(Value::as_object)
                .map(|m| {
                    m.iter()
                        .filter(|(k, v)| {
                            allowed.contains(&k.as_str()) && !v.is_object() && !v.is_array()
                        })
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect()
                })
                .unwrap_or_default();
            return Some((name, given));
        }

        let max = intent.param_u64("max");
        let scope = if intent.scope.is_empty() {
            intent.target.as_str()
        } else {
            intent.scope.as_str()
        };
        let (linter, settings) = match intent.engine.as_str() {
            "length" => {
                let max = max?;
                match scope {
                    "function" | "method" => ("funlen", with_settings(&[("lines", json!(max))])),
                    "line" | "content" | "" => {
                        ("lll", with_settings(&[("line-length", json!(max))]))
                    }
                    _ => return None,
                }
            }
            "ast" => {
                let max = intent.param_u64("maxDepth").or(max)?;
                let linter = if mentions(rule, intent, &["cognitive"]) {
                    "gocognit"
                } else if mentions(rule, intent, &["complexity", "cyclomatic"]) {
                    "gocyclo"
                } else {
                    "nestif"
                };
                (linter, with_settings(&[("min-complexity", json!(max))]))
            }
            "style" if mentions(rule, intent, &["import"]) => ("goimports", Map::new()),
            "style" => ("gofmt", Map::new()),
            "pattern" => {
                let (_, linter) =
                    KEYWORD_LINTERS.iter().find(|(words, _)| mentions(rule, intent, words))?;
                (*linter, Map::new())
            }
            _ => return None,
        };
        Some((linter.to_owned(), settings))
    }
}

/// Scalar rendered as YAML. Strings use JSON quoting, which YAML accepts.
fn yaml_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => serde_json::to_string(s).unwrap_or_else(|_| format!("'{s}'")),
        other => other.to_string(),
    }
}

impl LinterAdapter for GolangciAdapter {
    fn name(&self) -> &'static str {
        "golangci-lint"
    }

    fn supported_languages(&self) -> &'static [&'static str] {
        &["go"]
    }

    fn applies_to(&self, languages: &[String]) -> bool {
        declares_any(languages, &["go", "golang"])
    }

    fn config_file(&self) -> &'static str {
        ".golangci.yml"
    }

    fn convert(
        &self,
        rule: &UserRule,
        intent: &RuleIntent,
    ) -> Result<Option<AdapterRule>, ConvertError> {
        let Some((linter, settings)) = Self::linter(rule, intent) else {
            return Ok(None);
        };
        let mut entries = Map::new();
        let _ = entries.insert(linter, Value::Object(settings));
        Ok(Some(AdapterRule {
            rule_id: rule.id.clone(),
            entries,
        }))
    }

    /// Settings for the same linter are merged key by key, later rules winning.
    /// `gofmt` and `goimports` are formatters in the version 2 layout.
    fn build_config(&self, rules: &[AdapterRule]) -> Result<String, ConvertError> {
        let mut linters: BTreeMap<&str, Map<String, Value>> = BTreeMap::new();
        for rule in rules {
            for (name, value) in &rule.entries {
                let merged = linters.entry(name.as_str()).or_default();
                if let Some(settings) = value.as_object() {
                    for (key, value) in settings {
                        let _ = merged.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        if linters.is_empty() {
            return Err(ConvertError::Adapter {
                adapter: self.name().to_owned(),
                message: "no linters enabled".into(),
            });
        }
        let (formatters, linters): (BTreeMap<_, _>, BTreeMap<_, _>) =
            linters.into_iter().partition(|(name, _)| FORMATTERS.contains(name));

        let mut out = String::from("version: \"2\"\n");
        render_section(&mut out, "linters", &linters, true);
        if !formatters.is_empty() {
            render_section(&mut out, "formatters", &formatters, false);
        }
        Ok(out)
    }
}

/// Tools configured under `formatters` rather than `linters`.
const FORMATTERS: &[&str] = &["gofmt", "goimports"];

fn render_section(
    out: &mut String,
    section: &str,
    tools: &BTreeMap<&str, Map<String, Value>>,
    exclusive: bool,
) {
    let _ = writeln!(out, "{section}:");
    if exclusive {
        out.push_str("  default: none\n");
    }
    if !tools.is_empty() {
        out.push_str("  enable:\n");
        for name in tools.keys() {
            let _ = writeln!(out, "    - {name}");
        }
    }
    let configured: Vec<_> = tools.iter().filter(|(_, s)| !s.is_empty()).collect();
    if !configured.is_empty() {
        out.push_str("  settings:\n");
        for (name, settings) in configured {
            let _ = writeln!(out, "    {name}:");
            for (key, value) in settings {
                let _ = writeln!(out, "      {key}: {}", yaml_scalar(value));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(say: &str) -> UserRule {
        UserRule {
            id: "GO-1".into(),
            say: say.into(),
            languages: vec!["go".into()],
            ..UserRule::default()
        }
    }

    fn intent(json: &str) -> RuleIntent {
        sym_llm::parse_intent(json).unwrap()
    }

    fn convert(say: &str, json: &str) -> Option<AdapterRule> {
        GolangciAdapter.convert(&rule(say), &intent(json)).unwrap()
    }

    #[test]
    fn complexity_threshold() {
        let out = convert(
            "Cyclomatic complexity should not exceed 15",
            r#"{"engine": "ast", "params": {"max": 15}}"#,
        )
        .unwrap();
        assert_eq!(out.entries["gocyclo"]["min-complexity"], 15);
    }

    #[test]
    fn unchecked_errors() {
        let out = convert(
            "Never ignore error returns; unchecked errors are bugs",
            r#"{"engine": "pattern"}"#,
        )
        .unwrap();
        assert!(out.entries.contains_key("errcheck"));
    }

    #[test]
    fn explicit_linter_filters_settings() {
        let out = convert(
            "x",
            r#"{"engine": "pattern", "params": {"golangciLinter": "GoConst",
                "settings": {"min-len": 3, "bogus": true, "min-occurrences": {"nested": 1}}}}"#,
        )
        .unwrap();
        let settings = out.entries["goconst"].as_object().unwrap();
        assert_eq!(settings.len(), 1);
        assert_eq!(settings["min-len"], 3);

        let invented = r#"{"engine": "pattern", "params": {"golangciLinter": "invented"}}"#;
        assert!(convert("x", invented).is_none());
    }

    #[test]
    fn file_names_are_not_checked() {
        let naming = r#"{"engine": "naming", "target": "file"}"#;
        assert!(convert("File names must be snake_case", naming).is_none());
    }

    #[test]
    fn yaml_merges_settings_per_linter() {
        let rules = vec![
            convert(
                "Functions at most 60 lines",
                r#"{"engine": "length", "scope": "function", "params": {"max": 60}}"#,
            )
            .unwrap(),
            convert(
                "x",
                r#"{"engine": "pattern",
                    "params": {"golangciLinter": "funlen", "settings": {"statements": 40}}}"#,
            )
            .unwrap(),
            convert("Check for unchecked errors", r#"{"engine": "pattern"}"#).unwrap(),
        ];
        let yaml = GolangciAdapter.build_config(&rules).unwrap();
        assert_eq!(
            yaml,
            "version: \"2\"\n\
             linters:\n  default: none\n  enable:\n    - errcheck\n    - funlen\n\
             \x20 settings:\n    funlen:\n      lines: 60\n      statements: 40\n"
        );
        assert!(GolangciAdapter.build_config(&[]).is_err());
    }

    #[test]
    fn formatters_get_their_own_section() {
        let rules = vec![
            convert("Code is gofmt formatted", r#"{"engine": "style"}"#).unwrap(),
            convert("Imports are grouped", r#"{"engine": "style"}"#).unwrap(),
        ];
        let yaml = GolangciAdapter.build_config(&rules).unwrap();
        assert!(yaml.contains(
            "linters:\n  default: none\nformatters:\n  enable:\n    - gofmt\n    - goimports\n"
        ));
    }
}
