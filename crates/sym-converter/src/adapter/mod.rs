//! Linter adapters.
//!
//! An adapter maps a classified rule onto native options of one linter. It
//! only accepts whitelisted option names; a rule it cannot express yields
//! `None` and is left to the `llm-validator` engine.

mod checkstyle;
mod eslint;
mod golangci;
mod pmd;
mod prettier;
mod pylint;
mod tsc;

use std::sync::Arc;

use serde_json::{Map, Value};
use sym_core::UserRule;
use sym_core::language::normalize_language;
use sym_llm::RuleIntent;

use crate::errors::ConvertError;

pub use checkstyle::{CHECKSTYLE_MODULES, CheckstyleAdapter};
pub use eslint::EslintAdapter;
pub use golangci::{GOLANGCI_LINTERS, GolangciAdapter};
pub use pmd::{PMD_RULES, PmdAdapter};
pub use prettier::PrettierAdapter;
pub use pylint::PylintAdapter;
pub use tsc::TscAdapter;

/// Target name selecting every registered adapter.
pub const ALL_TARGETS: &str = "all";

/// One rule's contribution to a linter configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct AdapterRule {
    /// Source rule id.
    pub rule_id: String,
    /// Option name → value, in the adapter's own vocabulary.
    pub entries: Map<String, Value>,
}

impl AdapterRule {
    /// Whether the rule carries any configuration.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A linter that can enforce some rules natively.
pub trait LinterAdapter: Send + Sync {
    /// Adapter name, also used as the engine id of rules it owns.
    fn name(&self) -> &'static str;

    /// Languages (and aliases) the linter understands.
    fn supported_languages(&self) -> &'static [&'static str];

    /// File name of the generated configuration.
    fn config_file(&self) -> &'static str;

    /// Translate a classified rule. `Ok(None)` means the linter cannot enforce it.
    fn convert(
        &self,
        rule: &UserRule,
        intent: &RuleIntent,
    ) -> Result<Option<AdapterRule>, ConvertError>;

    /// Render the configuration file for the converted rules, in policy order.
    fn build_config(&self, rules: &[AdapterRule]) -> Result<String, ConvertError>;

    /// Whether a rule with these (effective) languages is routed to this adapter.
    ///
    /// No languages means universal. Otherwise any declared language must
    /// match a supported one, case-insensitively, in either substring direction.
    /// Single-letter names (`c`, `r`) only match exactly.
    fn applies_to(&self, languages: &[String]) -> bool {
        if languages.is_empty() {
            return true;
        }
        languages.iter().any(|lang| {
            let lang = lang.trim().to_lowercase();
            !lang.is_empty()
                && self
                    .supported_languages()
                    .iter()
                    .any(|s| lang.contains(s) || (lang.len() > 1 && s.contains(lang.as_str())))
        })
    }

    /// Declared languages this adapter understands, keeping the caller's spelling.
    fn supported_subset(&self, languages: &[String]) -> Vec<String> {
        let supported: Vec<String> = self
            .supported_languages()
            .iter()
            .map(|s| normalize_language(s))
            .collect();
        let mut seen = Vec::new();
        languages
            .iter()
            .filter(|lang| {
                let norm = normalize_language(lang);
                if supported.contains(&norm) && !seen.contains(&norm) {
                    seen.push(norm);
                    true
                } else {
                    false
                }
            })
            .cloned()
            .collect()
    }

    /// Canonical languages, used as the selector when a rule declares none.
    fn default_languages(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for lang in self.supported_languages() {
            let norm = normalize_language(lang);
            if !out.contains(&norm) {
                out.push(norm);
            }
        }
        out
    }
}

/// Ordered set of adapters. Order decides which adapter owns a rule
/// when several can enforce it.
#[derive(Clone)]
pub struct AdapterRegistry {
    adapters: Vec<Arc<dyn LinterAdapter>>,
}

impl AdapterRegistry {
    /// Empty registry.
    pub fn empty() -> Self {
        Self {
            adapters: Vec::new(),
        }
    }

    /// ESLint, Prettier, TSC, Pylint, Checkstyle, PMD, golangci-lint.
    pub fn builtin() -> Self {
        let mut reg = Self::empty();
        reg.register(Arc::new(EslintAdapter));
        reg.register(Arc::new(PrettierAdapter));
        reg.register(Arc::new(TscAdapter));
        reg.register(Arc::new(PylintAdapter));
        reg.register(Arc::new(CheckstyleAdapter));
        reg.register(Arc::new(PmdAdapter));
        reg.register(Arc::new(GolangciAdapter));
        reg
    }

    /// Append an adapter. A second adapter with the same name replaces the first.
    pub fn register(&mut self, adapter: Arc<dyn LinterAdapter>) {
        if let Some(existing) = self.adapters.iter_mut().find(|a| a.name() == adapter.name()) {
            *existing = adapter;
        } else {
            self.adapters.push(adapter);
        }
    }

    /// Adapter by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn LinterAdapter>> {
        self.adapters.iter().find(|a| a.name() == name).cloned()
    }

    /// Registered names in order.
    pub fn names(&self) -> Vec<&'static str> {
        self.adapters.iter().map(|a| a.name()).collect()
    }

    /// Resolve target names. `all` (or an empty list) selects every adapter.
    ///
    /// Returns the adapters in registry order plus the names that matched nothing.
    pub fn resolve_targets(
        &self,
        targets: &[String],
    ) -> (Vec<Arc<dyn LinterAdapter>>, Vec<String>) {
        if targets.is_empty() || targets.iter().any(|t| t.eq_ignore_ascii_case(ALL_TARGETS)) {
            return (self.adapters.clone(), Vec::new());
        }
        let unknown = targets
            .iter()
            .filter(|t| self.get(&t.to_lowercase()).is_none())
            .cloned()
            .collect();
        let selected = self
            .adapters
            .iter()
            .filter(|a| targets.iter().any(|t| t.eq_ignore_ascii_case(a.name())))
            .cloned()
            .collect();
        (selected, unknown)
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Pretty JSON with trailing newline.
pub(crate) fn render_json(adapter: &str, value: &Value) -> Result<String, ConvertError> {
    serde_json::to_string_pretty(value)
        .map(|s| s + "\n")
        .map_err(|e| ConvertError::Adapter {
            adapter: adapter.to_owned(),
            message: e.to_string(),
        })
}

/// Merge rule entries in order; later rules override earlier ones on the same key.
pub(crate) fn merge_entries(rules: &[AdapterRule]) -> Map<String, Value> {
    let mut merged = Map::new();
    for rule in rules {
        for (key, value) in &rule.entries {
            let _ = merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// Whether `languages` is empty or names one of `names` after normalisation.
pub(crate) fn declares_any(languages: &[String], names: &[&str]) -> bool {
    languages.is_empty()
        || languages.iter().any(|l| names.contains(&normalize_language(l).as_str()))
}

/// Escape text for an XML attribute or element.
pub(crate) fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Whether the rule text mentions any of `words` (case-insensitive).
pub(crate) fn mentions(rule: &UserRule, intent: &RuleIntent, words: &[&str]) -> bool {
    let say = rule.say.to_lowercase();
    words.iter().any(|w| {
        say.contains(w) || intent.patterns.iter().any(|p| p.to_lowercase().contains(w))
    })
}
