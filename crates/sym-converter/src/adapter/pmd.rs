//! PMD adapter: rule references in a `pmd.xml` ruleset.
//!
//! Entries map a rule reference (`category/java/<set>.xml/<Rule>`) to its
//! priority, 1 (high) to 5 (info).

use std::fmt::Write as _;

use serde_json::{Map, Value, json};
use sym_core::{Severity, UserRule};
use sym_llm::RuleIntent;

use super::{AdapterRule, LinterAdapter, declares_any, mentions, merge_entries, xml_escape};
use crate::errors::ConvertError;

/// Rule references the adapter may emit.
pub const PMD_RULES: &[&str] = &[
    "category/java/bestpractices.xml/UnusedPrivateMethod",
    "category/java/bestpractices.xml/UnusedLocalVariable",
    "category/java/bestpractices.xml/UnusedFormalParameter",
    "category/java/bestpractices.xml/AvoidReassigningParameters",
    "category/java/codestyle.xml/ShortVariable",
    "category/java/codestyle.xml/LongVariable",
    "category/java/codestyle.xml/ShortMethodName",
    "category/java/codestyle.xml/UnnecessaryImport",
    "category/java/design.xml/TooManyMethods",
    "category/java/design.xml/ExcessiveParameterList",
    "category/java/design.xml/CyclomaticComplexity",
    "category/java/design.xml/NPathComplexity",
    "category/java/design.xml/GodClass",
    "category/java/errorprone.xml/EmptyCatchBlock",
    "category/java/errorprone.xml/AvoidCatchingNPE",
    "category/java/errorprone.xml/EmptyIfStmt",
    "category/java/security.xml/HardCodedCryptoKey",
];

/// Keyword groups that select a rule, checked in order.
const KEYWORD_RULES: &[(&[&str], &str)] = &[
    (&["empty catch", "swallow"], "EmptyCatchBlock"),
    (&["nullpointerexception", "catch npe", "catching npe"], "AvoidCatchingNPE"),
    (&["empty if"], "EmptyIfStmt"),
    (&["crypto key", "hardcoded key", "hard-coded key", "encryption key"], "HardCodedCryptoKey"),
    (&["unused private method"], "UnusedPrivateMethod"),
    (&["unused parameter"], "UnusedFormalParameter"),
    (&["unused variable", "unused local"], "UnusedLocalVariable"),
    (&["unused import", "unnecessary import"], "UnnecessaryImport"),
    (&["reassign"], "AvoidReassigningParameters"),
    (&["god class"], "GodClass"),
    (&["too many methods"], "TooManyMethods"),
];

/// PMD adapter.
#[derive(Clone, Copy, Debug, Default)]
pub struct PmdAdapter;

/// Full reference for a whitelisted rule, given as a reference or a bare name.
///
/// Old `rulesets/java/` prefixes are rewritten to `category/java/`.
pub fn resolve_rule(name: &str) -> Option<&'static str> {
    let name = name.trim();
    let name = name.strip_prefix("rulesets/java/").map_or_else(
        || name.to_owned(),
        |rest| format!("category/java/{rest}"),
    );
    PMD_RULES
        .iter()
        .find(|r| **r == name || r.rsplit('/').next() == Some(name.as_str()))
        .copied()
}

fn priority(rule: &UserRule) -> u64 {
    let given = if rule.severity.is_empty() { "error" } else { &rule.severity };
    match Severity::from_str_lossy(given) {
        Severity::Error => 1,
        Severity::Warning => 3,
        Severity::Info => 5,
    }
}

impl PmdAdapter {
    fn rule_ref(rule: &UserRule, intent: &RuleIntent) -> Option<&'static str> {
        if let Some(name) = intent.param_str("pmdRule") {
            return resolve_rule(name);
        }
        match intent.engine.as_str() {
            "length" if mentions(rule, intent, &["param", "argument"]) => {
                resolve_rule("ExcessiveParameterList")
            }
            "ast" if mentions(rule, intent, &["npath"]) => resolve_rule("NPathComplexity"),
            "ast" if mentions(rule, intent, &["complexity", "cyclomatic"]) => {
                resolve_rule("CyclomaticComplexity")
            }
            "pattern" | "ast" => KEYWORD_RULES
                .iter()
                .find(|(words, _)| mentions(rule, intent, words))
                .and_then(|(_, name)| resolve_rule(name)),
            _ => None,
        }
    }
}

impl LinterAdapter for PmdAdapter {
    fn name(&self) -> &'static str {
        "pmd"
    }

    fn supported_languages(&self) -> &'static [&'static str] {
        &["java"]
    }

    /// Exact match, so `javascript` is not taken for `java`.
    fn applies_to(&self, languages: &[String]) -> bool {
        declares_any(languages, &["java"])
    }

    fn config_file(&self) -> &'static str {
        "pmd.xml"
    }

    fn convert(
        &self,
        rule: &UserRule,
        intent: &RuleIntent,
    ) -> Result<Option<AdapterRule>, ConvertError> {
        let Some(reference) = Self::rule_ref(rule, intent) else {
            return Ok(None);
        };
        let mut entries = Map::new();
        let _ = entries.insert(reference.to_owned(), json!(priority(rule)));
        Ok(Some(AdapterRule {
            rule_id: rule.id.clone(),
            entries,
        }))
    }

    fn build_config(&self, rules: &[AdapterRule]) -> Result<String, ConvertError> {
        let merged = merge_entries(rules);
        let mut out = String::from(
            "<?xml version=\"1.0\"?>\n\
             <ruleset name=\"Symphony Rules\"\n    \
             xmlns=\"http://pmd.sourceforge.net/ruleset/2.0.0\"\n    \
             xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\"\n    \
             xsi:schemaLocation=\"http://pmd.sourceforge.net/ruleset/2.0.0 \
             https://pmd.sourceforge.io/ruleset_2_0_0.xsd\">\n  \
             <description>Generated from the user policy</description>\n",
        );
        for (reference, value) in &merged {
            let priority = value.as_u64().unwrap_or(3).clamp(1, 5);
            let _ = writeln!(out, "  <rule ref=\"{}\">", xml_escape(reference));
            let _ = writeln!(out, "    <priority>{priority}</priority>");
            out.push_str("  </rule>\n");
        }
        out.push_str("</ruleset>\n");
        Ok(out)
    }
}
