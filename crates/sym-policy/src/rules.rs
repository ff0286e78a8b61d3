//! Rule edits.

use serde::Deserialize;
use sym_core::UserRule;
use tracing::debug;

use crate::batch::BatchReport;
use crate::document::PolicyDocument;
use crate::errors::PolicyError;

/// Partial update of one rule. Unset fields keep their value.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleEdit {
    /// Rule to change.
    pub id: String,
    /// New description.
    #[serde(default)]
    pub say: Option<String>,
    /// New category; must exist.
    #[serde(default)]
    pub category: Option<String>,
    /// New language list.
    #[serde(default)]
    pub languages: Option<Vec<String>>,
    /// New severity.
    #[serde(default)]
    pub severity: Option<String>,
    /// New violation message.
    #[serde(default)]
    pub message: Option<String>,
    /// New example.
    #[serde(default)]
    pub example: Option<String>,
    /// New include globs.
    #[serde(default)]
    pub include: Option<Vec<String>>,
    /// New exclude globs.
    #[serde(default)]
    pub exclude: Option<Vec<String>>,
    /// New autofix flag.
    #[serde(default)]
    pub autofix: Option<bool>,
}

impl RuleEdit {
    fn is_empty(&self) -> bool {
        self.say.is_none()
            && self.category.is_none()
            && self.languages.is_none()
            && self.severity.is_none()
            && self.message.is_none()
            && self.example.is_none()
            && self.include.is_none()
            && self.exclude.is_none()
            && self.autofix.is_none()
    }
}

impl PolicyDocument {
    fn require_category(&self, name: &str) -> Result<(), PolicyError> {
        if name.trim().is_empty() {
            return Err(PolicyError::invalid_input("category is required"));
        }
        if !self.has_category(name) {
            return Err(PolicyError::NotFound {
                kind: "category",
                name: name.to_owned(),
            });
        }
        Ok(())
    }

    /// Add one rule. Its category must already exist.
    pub fn add_rule(&mut self, rule: UserRule) -> Result<String, PolicyError> {
        if rule.id.trim().is_empty() {
            return Err(PolicyError::invalid_input("id is required"));
        }
        if rule.say.trim().is_empty() {
            return Err(PolicyError::invalid_input("say is required"));
        }
        if self.has_rule(&rule.id) {
            return Err(PolicyError::AlreadyExists {
                kind: "rule",
                name: rule.id,
            });
        }
        self.require_category(&rule.category)?;

        self.extend_default_languages([&rule]);
        let id = rule.id.clone();
        self.policy_mut().rules.push(rule);
        self.reindex();
        self.mark_dirty();
        debug!(rule_id = %id, "rule added");
        Ok(id)
    }

    /// Apply a partial update to one rule.
    pub fn edit_rule(&mut self, edit: RuleEdit) -> Result<String, PolicyError> {
        if edit.is_empty() {
            return Err(PolicyError::invalid_input("nothing to change"));
        }
        let idx = self.rule_index(&edit.id).ok_or_else(|| PolicyError::NotFound {
            kind: "rule",
            name: edit.id.clone(),
        })?;
        if let Some(category) = &edit.category {
            self.require_category(category)?;
        }
        if edit.say.as_deref().is_some_and(|s| s.trim().is_empty()) {
            return Err(PolicyError::invalid_input("say cannot be empty"));
        }

        let rule = &mut self.policy_mut().rules[idx];
        let RuleEdit {
            id,
            say,
            category,
            languages,
            severity,
            message,
            example,
            include,
            exclude,
            autofix,
        } = edit;
        if let Some(v) = say {
            rule.say = v;
        }
        if let Some(v) = category {
            rule.category = v;
        }
        if let Some(v) = languages {
            rule.languages = v;
        }
        if let Some(v) = severity {
            rule.severity = v;
        }
        if let Some(v) = message {
            rule.message = v;
        }
        if let Some(v) = example {
            rule.example = v;
        }
        if let Some(v) = include {
            rule.include = v;
        }
        if let Some(v) = exclude {
            rule.exclude = v;
        }
        if let Some(v) = autofix {
            rule.autofix = v;
        }

        let updated = rule.clone();
        self.extend_default_languages([&updated]);
        self.mark_dirty();
        debug!(rule_id = %id, "rule edited");
        Ok(id)
    }

    /// Remove one rule.
    pub fn remove_rule(&mut self, id: &str) -> Result<String, PolicyError> {
        let idx = self.rule_index(id).ok_or_else(|| PolicyError::NotFound {
            kind: "rule",
            name: id.to_owned(),
        })?;
        let _ = self.policy_mut().rules.remove(idx);
        self.reindex();
        self.mark_dirty();
        debug!(rule_id = %id, "rule removed");
        Ok(id.to_owned())
    }

    /// Add each rule independently.
    pub fn add_rules(&mut self, rules: Vec<UserRule>) -> BatchReport {
        let mut report = BatchReport::default();
        for rule in rules {
            let id = rule.id.clone();
            report.record(&id, self.add_rule(rule));
        }
        report
    }

    /// Apply each edit independently.
    pub fn edit_rules(&mut self, edits: Vec<RuleEdit>) -> BatchReport {
        let mut report = BatchReport::default();
        for edit in edits {
            let id = edit.id.clone();
            report.record(&id, self.edit_rule(edit));
        }
        report
    }

    /// Remove each rule independently.
    pub fn remove_rules<S: AsRef<str>>(&mut self, ids: &[S]) -> BatchReport {
        let mut report = BatchReport::default();
        for id in ids {
            let id = id.as_ref();
            report.record(id, self.remove_rule(id));
        }
        report
    }
}
