//! TypeScript compiler adapter: strictness flags in `tsconfig.json`.

use serde_json::{Map, Value, json};
use sym_core::UserRule;
use sym_llm::RuleIntent;

use super::{AdapterRule, LinterAdapter, merge_entries, render_json};
use crate::errors::ConvertError;

/// Compiler options the adapter may set, with phrases that request them.
const FLAGS: &[(&str, &[&str])] = &[
    ("strict", &["strict mode", "strict type"]),
    ("noImplicitAny", &["implicit any", "no any", "avoid any", "`any`"]),
    ("strictNullChecks", &["null check", "strict null"]),
    ("noUnusedLocals", &["unused local", "unused variable"]),
    ("noUnusedParameters", &["unused parameter", "unused argument"]),
    ("noImplicitReturns", &["implicit return", "all code paths"]),
    ("noFallthroughCasesInSwitch", &["fallthrough", "fall through"]),
    ("noImplicitThis", &["implicit this"]),
    ("alwaysStrict", &["use strict"]),
];

/// TSC adapter.
#[derive(Clone, Copy, Debug, Default)]
pub struct TscAdapter;

impl TscAdapter {
    fn entries(rule: &UserRule, intent: &RuleIntent) -> Map<String, Value> {
        let say = rule.say.to_lowercase();
        let mut out = Map::new();
        for (flag, phrases) in FLAGS {
            let value = intent
                .param_bool(flag)
                .or_else(|| phrases.iter().any(|p| say.contains(p)).then_some(true));
            if let Some(value) = value {
                let _ = out.insert((*flag).to_owned(), json!(value));
            }
        }
        out
    }
}

impl LinterAdapter for TscAdapter {
    fn name(&self) -> &'static str {
        "tsc"
    }

    fn supported_languages(&self) -> &'static [&'static str] {
        &["typescript", "ts", "tsx"]
    }

    fn config_file(&self) -> &'static str {
        "tsconfig.json"
    }

    fn convert(
        &self,
        rule: &UserRule,
        intent: &RuleIntent,
    ) -> Result<Option<AdapterRule>, ConvertError> {
        if intent.engine == sym_core::LLM_VALIDATOR_ENGINE && intent.params.is_empty() {
            return Ok(None);
        }
        let entries = Self::entries(rule, intent);
        Ok((!entries.is_empty()).then(|| AdapterRule {
            rule_id: rule.id.clone(),
            entries,
        }))
    }

    fn build_config(&self, rules: &[AdapterRule]) -> Result<String, ConvertError> {
        let mut options = Map::new();
        let _ = options.insert("target".into(), json!("ES2020"));
        let _ = options.insert("module".into(), json!("commonjs"));
        let _ = options.insert("noEmit".into(), json!(true));
        options.extend(merge_entries(rules));
        render_json(self.name(), &json!({ "compilerOptions": options }))
    }
}
