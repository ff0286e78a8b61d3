//! Validation engines.
//!
//! Every engine implements [`Engine::check`] over one rule and one changed
//! file. The dispatcher looks engines up by the id stored in the rule's
//! `check.engine`; adding an engine never touches the dispatcher.

mod ast;
mod length;
mod linter;
mod llm;
mod pattern;
mod style;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use sym_core::{PolicyRule, Violation};
use sym_llm::InferenceClient;

use crate::changes::FileChange;
use crate::diff::{AddedLine, added_lines};
use crate::errors::EngineError;

pub use ast::AstEngine;
pub use length::LengthEngine;
pub use linter::{LinterEngine, LinterKind};
pub use llm::{LlmEngine, ReviewVerdict, parse_verdict};
pub use pattern::PatternEngine;
pub use style::StyleEngine;

/// One changed file as seen by an engine.
#[derive(Clone, Debug)]
pub struct CheckTarget {
    /// Path relative to the repository root.
    pub path: String,
    /// Raw diff or content.
    pub diff: String,
    /// Lines added by the change.
    pub added: Vec<AddedLine>,
    /// Repository root.
    pub root: PathBuf,
}

impl CheckTarget {
    /// Target for `change` inside `root`.
    pub fn new(change: &FileChange, root: &Path) -> Self {
        Self {
            path: change.path.clone(),
            diff: change.diff.clone(),
            added: added_lines(&change.diff),
            root: root.to_path_buf(),
        }
    }

    /// Absolute path on disk.
    pub fn absolute_path(&self) -> PathBuf {
        self.root.join(&self.path)
    }

    /// Current file content, if readable.
    pub async fn content(&self) -> Option<String> {
        tokio::fs::read_to_string(self.absolute_path()).await.ok()
    }
}

/// A checking strategy.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Engine id as written in `check.engine`.
    fn name(&self) -> &str;

    /// Violations of `rule` in `target`. An empty list means the check passed.
    async fn check(
        &self,
        rule: &PolicyRule,
        target: &CheckTarget,
    ) -> Result<Vec<Violation>, EngineError>;
}

/// Engines by id.
#[derive(Clone, Default)]
pub struct EngineRegistry {
    engines: BTreeMap<String, Arc<dyn Engine>>,
}

impl EngineRegistry {
    /// Empty registry.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Deterministic engines and linter subprocess engines.
    pub fn builtin() -> Self {
        let mut reg = Self::empty();
        reg.register(Arc::new(PatternEngine));
        reg.register(Arc::new(LengthEngine));
        reg.register(Arc::new(StyleEngine));
        reg.register(Arc::new(AstEngine));
        for kind in LinterKind::ALL {
            reg.register(Arc::new(LinterEngine::new(kind)));
        }
        reg
    }

    /// Built-in engines plus `llm-validator` over `client`.
    pub fn with_llm(client: Arc<dyn InferenceClient>, max_code_chars: usize) -> Self {
        let mut reg = Self::builtin();
        reg.register(Arc::new(LlmEngine::new(client, max_code_chars)));
        reg
    }

    /// Add or replace an engine.
    pub fn register(&mut self, engine: Arc<dyn Engine>) {
        let _ = self.engines.insert(engine.name().to_owned(), engine);
    }

    /// Engine by id.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Engine>> {
        self.engines.get(name).cloned()
    }

    /// Registered ids, sorted.
    pub fn names(&self) -> Vec<String> {
        self.engines.keys().cloned().collect()
    }
}

/// Violation of `rule` in `file`, with the rule's severity and category.
pub(crate) fn violation(rule: &PolicyRule, file: &str, message: impl Into<String>) -> Violation {
    Violation::new(&rule.id, rule.severity, message, file).with_category(&rule.category)
}

/// The rule's own message, or `fallback`.
pub(crate) fn message_or(rule: &PolicyRule, fallback: impl FnOnce() -> String) -> String {
    if rule.message.is_empty() {
        fallback()
    } else {
        rule.message.clone()
    }
}

/// Whether a trimmed line is a comment in common languages.
pub(crate) fn is_comment(trimmed: &str) -> bool {
    ["//", "#", "/*", "*"].iter().any(|p| trimmed.starts_with(p))
}
