//! Pylint adapter: INI options in `.pylintrc`.
//!
//! Entries are keyed `SECTION.option` and grouped per section when rendered.

use std::fmt::Write as _;

use serde_json::{Map, Value, json};
use sym_core::UserRule;
use sym_llm::RuleIntent;

use super::{AdapterRule, LinterAdapter, mentions, merge_entries};
use crate::errors::ConvertError;

const SECTIONS: &[&str] = &["MASTER", "FORMAT", "DESIGN", "BASIC"];

/// Pylint adapter.
#[derive(Clone, Copy, Debug, Default)]
pub struct PylintAdapter;

fn naming_style(case: &str) -> Option<&'static str> {
    match case {
        "snake_case" => Some("snake_case"),
        "camelCase" => Some("camelCase"),
        "PascalCase" => Some("PascalCase"),
        "UPPER_CASE" | "SCREAMING_SNAKE_CASE" => Some("UPPER_CASE"),
        _ => None,
    }
}

impl PylintAdapter {
    fn entries(rule: &UserRule, intent: &RuleIntent) -> Map<String, Value> {
        let mut out = Map::new();
        let mut put = |key: &str, value: Value| {
            let _ = out.insert(key.to_owned(), value);
        };
        let max = intent.param_u64("max");

        match (intent.engine.as_str(), max) {
            ("length", Some(max)) => {
                let scope = if intent.scope.is_empty() {
                    intent.target.as_str()
                } else {
                    intent.scope.as_str()
                };
                if mentions(rule, intent, &["argument", "param"]) {
                    put("DESIGN.max-args", json!(max));
                } else if scope == "file" || scope == "module" {
                    put("FORMAT.max-module-lines", json!(max));
                } else if matches!(scope, "line" | "content" | "") {
                    put("FORMAT.max-line-length", json!(max));
                }
            }
            ("ast", _) => {
                if let Some(max) = intent.param_u64("maxDepth").or(max) {
                    if mentions(rule, intent, &["branch", "complexity"]) {
                        put("DESIGN.max-branches", json!(max));
                    } else {
                        put("DESIGN.max-nested-blocks", json!(max));
                    }
                }
            }
            ("pattern", _) => {
                if let Some(style) = intent.param_str("case").and_then(naming_style) {
                    let option = match intent.target.as_str() {
                        "class" => "BASIC.class-naming-style",
                        "function" | "method" => "BASIC.function-naming-style",
                        "variable" => "BASIC.variable-naming-style",
                        _ if style == "UPPER_CASE" => "BASIC.const-naming-style",
                        _ => "BASIC.function-naming-style",
                    };
                    put(option, json!(style));
                }
            }
            ("style", _) => {
                if let Some(indent) = intent.param_u64("indent") {
                    let unit = " ".repeat(usize::try_from(indent).unwrap_or(4).min(16));
                    put("FORMAT.indent-string", json!(format!("'{unit}'")));
                }
            }
            _ => {}
        }
        out
    }
}

fn ini_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(true) => "yes".into(),
        Value::Bool(false) => "no".into(),
        other => other.to_string(),
    }
}

impl LinterAdapter for PylintAdapter {
    fn name(&self) -> &'static str {
        "pylint"
    }

    fn supported_languages(&self) -> &'static [&'static str] {
        &["python", "py"]
    }

    fn config_file(&self) -> &'static str {
        ".pylintrc"
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
        let merged = merge_entries(rules);
        let mut out = String::new();
        for section in SECTIONS {
            let prefix = format!("{section}.");
            let _ = writeln!(out, "[{section}]");
            for (key, value) in &merged {
                if let Some(option) = key.strip_prefix(&prefix) {
                    let _ = writeln!(out, "{option}={}", ini_value(value));
                }
            }
            out.push('\n');
        }
        Ok(out)
    }
}
