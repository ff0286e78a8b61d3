//! Prettier adapter: formatting options in `.prettierrc.json`.

use serde_json::{Map, Value, json};
use sym_core::UserRule;
use sym_llm::RuleIntent;

use super::{AdapterRule, LinterAdapter, mentions, merge_entries, render_json};
use crate::errors::ConvertError;

/// Baseline written before any rule-derived option.
fn base_options() -> Map<String, Value> {
    let mut base = Map::new();
    for (key, value) in [
        ("semi", json!(true)),
        ("singleQuote", json!(false)),
        ("tabWidth", json!(2)),
        ("useTabs", json!(false)),
        ("trailingComma", json!("es5")),
        ("printWidth", json!(80)),
        ("arrowParens", json!("always")),
    ] {
        let _ = base.insert(key.to_owned(), value);
    }
    base
}

/// Prettier adapter.
#[derive(Clone, Copy, Debug, Default)]
pub struct PrettierAdapter;

impl PrettierAdapter {
    fn entries(rule: &UserRule, intent: &RuleIntent) -> Map<String, Value> {
        let mut out = Map::new();
        let mut put = |name: &str, value: Value| {
            let _ = out.insert(name.to_owned(), value);
        };

        match intent.engine.as_str() {
            "style" => {
                if let Some(semi) = intent.param_bool("semi") {
                    put("semi", json!(semi));
                }
                match intent.param_str("quote") {
                    Some("single") => put("singleQuote", json!(true)),
                    Some("double") => put("singleQuote", json!(false)),
                    _ => {}
                }
                if let Some(indent) = intent.param_u64("indent") {
                    put("tabWidth", json!(indent));
                }
                if let Some(tabs) = intent.param_bool("useTabs") {
                    put("useTabs", json!(tabs));
                } else if mentions(rule, intent, &["tabs for indentation", "indent with tabs"]) {
                    put("useTabs", json!(true));
                }
                if let Some(trailing) = intent.param_str("trailingComma") {
                    let mapped = match trailing {
                        "always" | "all" => Some("all"),
                        "never" | "none" => Some("none"),
                        "es5" => Some("es5"),
                        _ => None,
                    };
                    if let Some(mapped) = mapped {
                        put("trailingComma", json!(mapped));
                    }
                }
                if let Some(parens) = intent.param_str("arrowParens") {
                    if matches!(parens, "always" | "avoid") {
                        put("arrowParens", json!(parens));
                    }
                }
                if let Some(spacing) = intent.param_bool("bracketSpacing") {
                    put("bracketSpacing", json!(spacing));
                }
                if let Some(eol) = intent.param_str("endOfLine") {
                    if matches!(eol, "lf" | "crlf" | "cr" | "auto") {
                        put("endOfLine", json!(eol));
                    }
                }
            }
            "length" if matches!(intent.target.as_str(), "line" | "") && intent.scope != "file" => {
                if let Some(max) = intent.param_u64("max") {
                    put("printWidth", json!(max));
                }
            }
            _ => {}
        }
        out
    }
}

impl LinterAdapter for PrettierAdapter {
    fn name(&self) -> &'static str {
        "prettier"
    }

    fn supported_languages(&self) -> &'static [&'static str] {
        &["javascript", "js", "typescript", "ts", "jsx", "tsx"]
    }

    fn config_file(&self) -> &'static str {
        ".prettierrc.json"
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
        let mut options = base_options();
        options.extend(merge_entries(rules));
        render_json(self.name(), &Value::Object(options))
    }
}
