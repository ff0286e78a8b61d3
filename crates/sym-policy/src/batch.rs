//! Per-item outcomes of batch edits.

use serde::Serialize;

use crate::errors::PolicyError;

/// One failed item of a batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    /// Item name or id, `(empty)` when none was given.
    pub item: String,
    /// Why it failed.
    pub error: String,
}

/// Result of applying a batch: each item either succeeded or failed on its own.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Summary line per successful item.
    pub succeeded: Vec<String>,
    /// Failed items.
    pub failed: Vec<ItemFailure>,
}

impl BatchReport {
    /// Record the outcome for `item`.
    pub fn record(&mut self, item: &str, outcome: Result<String, PolicyError>) {
        match outcome {
            Ok(summary) => self.succeeded.push(summary),
            Err(e) => self.failed.push(ItemFailure {
                item: if item.is_empty() { "(empty)".into() } else { item.to_owned() },
                error: e.to_string(),
            }),
        }
    }

    /// Whether anything changed.
    pub fn any_succeeded(&self) -> bool {
        !self.succeeded.is_empty()
    }

    /// Plain-text rendering for tool output.
    pub fn render(&self, verb: &str) -> String {
        let mut out = String::new();
        if !self.succeeded.is_empty() {
            out.push_str(&format!("{verb} {} item(s):\n", self.succeeded.len()));
            for s in &self.succeeded {
                out.push_str(&format!("  ✓ {s}\n"));
            }
        }
        if !self.failed.is_empty() {
            out.push_str(&format!("Failed {} item(s):\n", self.failed.len()));
            for f in &self.failed {
                out.push_str(&format!("  ✗ {}: {}\n", f.item, f.error));
            }
        }
        if out.is_empty() {
            out.push_str("Nothing to do\n");
        }
        out
    }
}
