//! Category edits.

use serde::Deserialize;
use sym_core::CategoryDef;
use tracing::debug;

use crate::batch::BatchReport;
use crate::document::PolicyDocument;
use crate::errors::PolicyError;

const DEFAULTS: &[(&str, &str)] = &[
    ("security", "Security rules: secrets, injection, unsafe APIs"),
    ("style", "Code style and formatting conventions"),
    ("documentation", "Comments, docstrings and API documentation"),
    ("error_handling", "How errors are raised, propagated and reported"),
    ("architecture", "Module boundaries, layering and dependencies"),
    ("performance", "Performance and resource usage"),
    ("testing", "Test coverage and test code conventions"),
];

/// Categories a new policy starts with.
pub fn default_categories() -> Vec<CategoryDef> {
    DEFAULTS
        .iter()
        .map(|(name, description)| CategoryDef {
            name: (*name).to_owned(),
            description: (*description).to_owned(),
        })
        .collect()
}

/// Rename and/or redescribe one category.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct CategoryEdit {
    /// Current name.
    pub name: String,
    /// New name. Rules using the old name follow the rename.
    #[serde(default, alias = "newName")]
    pub new_name: Option<String>,
    /// New description.
    #[serde(default)]
    pub description: Option<String>,
}

impl PolicyDocument {
    /// Add one category.
    pub fn add_category(&mut self, def: CategoryDef) -> Result<String, PolicyError> {
        if def.name.trim().is_empty() {
            return Err(PolicyError::invalid_input("name is required"));
        }
        if def.description.trim().is_empty() {
            return Err(PolicyError::invalid_input("description is required"));
        }
        if self.has_category(&def.name) {
            return Err(PolicyError::AlreadyExists {
                kind: "category",
                name: def.name,
            });
        }
        let name = def.name.clone();
        self.policy_mut().categories.push(def);
        self.reindex();
        self.mark_dirty();
        debug!(category = %name, "category added");
        Ok(name)
    }

    /// Apply one category edit. A rename cascades to every rule in the category.
    pub fn edit_category(&mut self, edit: CategoryEdit) -> Result<String, PolicyError> {
        let new_name = edit.new_name.filter(|n| !n.trim().is_empty());
        let description = edit.description.filter(|d| !d.trim().is_empty());
        if new_name.is_none() && description.is_none() {
            return Err(PolicyError::invalid_input("new_name or description is required"));
        }
        let idx = self.category_index(&edit.name).ok_or_else(|| PolicyError::NotFound {
            kind: "category",
            name: edit.name.clone(),
        })?;
        if let Some(new) = &new_name {
            if *new != edit.name && self.has_category(new) {
                return Err(PolicyError::AlreadyExists {
                    kind: "category",
                    name: new.clone(),
                });
            }
        }

        let policy = self.policy_mut();
        if let Some(desc) = description {
            policy.categories[idx].description = desc;
        }
        let summary = match new_name {
            Some(new) if new != edit.name => {
                policy.categories[idx].name.clone_from(&new);
                let mut moved = 0;
                for rule in policy.rules.iter_mut().filter(|r| r.category == edit.name) {
                    rule.category.clone_from(&new);
                    moved += 1;
                }
                debug!(from = %edit.name, to = %new, rules = moved, "category renamed");
                format!("{} → {new} ({moved} rules updated)", edit.name)
            }
            _ => format!("{} (description updated)", edit.name),
        };
        self.reindex();
        self.mark_dirty();
        Ok(summary)
    }

    /// Remove one unused category.
    pub fn remove_category(&mut self, name: &str) -> Result<String, PolicyError> {
        let idx = self.category_index(name).ok_or_else(|| PolicyError::NotFound {
            kind: "category",
            name: name.to_owned(),
        })?;
        let count = self.rules_in(name);
        if count > 0 {
            return Err(PolicyError::InUse {
                name: name.to_owned(),
                count,
            });
        }
        let _ = self.policy_mut().categories.remove(idx);
        self.reindex();
        self.mark_dirty();
        debug!(category = %name, "category removed");
        Ok(name.to_owned())
    }

    /// Add each category independently.
    pub fn add_categories(&mut self, defs: Vec<CategoryDef>) -> BatchReport {
        let mut report = BatchReport::default();
        for def in defs {
            let name = def.name.clone();
            report.record(&name, self.add_category(def));
        }
        report
    }

    /// Apply each edit independently, in order.
    pub fn edit_categories(&mut self, edits: Vec<CategoryEdit>) -> BatchReport {
        let mut report = BatchReport::default();
        for edit in edits {
            let name = edit.name.clone();
            report.record(&name, self.edit_category(edit));
        }
        report
    }

    /// Remove each category independently.
    pub fn remove_categories<S: AsRef<str>>(&mut self, names: &[S]) -> BatchReport {
        let mut report = BatchReport::default();
        for name in names {
            let name = name.as_ref();
            report.record(name, self.remove_category(name));
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use sym_core::{UserPolicy, UserRule};

    fn cat(name: &str) -> CategoryDef {
        CategoryDef {
            name: name.into(),
            description: format!("{name} rules"),
        }
    }

    fn rule(id: &str, category: &str) -> UserRule {
        UserRule {
            id: id.into(),
            say: "x".into(),
            category: category.into(),
            ..UserRule::default()
        }
    }

    fn doc() -> PolicyDocument {
        PolicyDocument::new(UserPolicy {
            version: "1".into(),
            categories: vec![cat("old"), cat("style")],
            rules: vec![rule("A", "old"), rule("B", "style"), rule("C", "old")],
            ..UserPolicy::default()
        })
    }

    #[test]
    fn add_validates_each_item() {
        let mut doc = doc();
        let report = doc.add_categories(vec![
            cat("perf"),
            CategoryDef::default(),
            CategoryDef {
                name: "naming".into(),
                description: String::new(),
            },
            cat("style"),
        ]);
        assert_eq!(report.succeeded, vec!["perf"]);
        let errors: Vec<&str> = report.failed.iter().map(|f| f.error.as_str()).collect();
        assert_eq!(
            errors,
            vec![
                "name is required",
                "description is required",
                "category 'style' already exists"
            ]
        );
        assert!(doc.has_category("perf"));
        assert!(doc.is_dirty());
    }

    #[test]
    fn rename_cascades_to_rules() {
        let mut doc = doc();
        let summary = doc
            .edit_category(CategoryEdit {
                name: "old".into(),
                new_name: Some("new".into()),
                description: None,
            })
            .unwrap();
        assert_eq!(summary, "old → new (2 rules updated)");
        assert!(doc.has_category("new"));
        assert!(!doc.has_category("old"));
        assert_eq!(doc.rules_in("new"), 2);
        assert_eq!(doc.rule("B").unwrap().category, "style");
    }

    #[test]
    fn description_only_edit() {
        let mut doc = doc();
        let summary = doc
            .edit_category(CategoryEdit {
                name: "style".into(),
                new_name: None,
                description: Some("Formatting".into()),
            })
            .unwrap();
        assert_eq!(summary, "style (description updated)");
        assert_eq!(doc.category("style").unwrap().description, "Formatting");
    }

    #[test]
    fn edit_failures() {
        let mut doc = doc();
        let err = doc
            .edit_category(CategoryEdit {
                name: "old".into(),
                ..CategoryEdit::default()
            })
            .unwrap_err();
        assert_matches!(err, PolicyError::InvalidInput { .. });

        let err = doc
            .edit_category(CategoryEdit {
                name: "ghost".into(),
                new_name: Some("x".into()),
                description: None,
            })
            .unwrap_err();
        assert_matches!(err, PolicyError::NotFound { .. });

        let err = doc
            .edit_category(CategoryEdit {
                name: "old".into(),
                new_name: Some("style".into()),
                description: None,
            })
            .unwrap_err();
        assert_eq!(err.to_string(), "category 'style' already exists");
        assert!(!doc.is_dirty());
    }

    #[test]
    fn remove_rejects_referenced_categories() {
        let mut doc = doc();
        doc.policy_mut().categories.push(cat("unused"));
        doc.reindex();

        let report = doc.remove_categories(&["old", "unused", "ghost"]);
        assert_eq!(report.succeeded, vec!["unused"]);
        assert_eq!(report.failed[0].error, "category 'old' is used by 2 rule(s)");
        assert_eq!(report.failed[1].error, "category 'ghost' not found");
        assert!(doc.has_category("old"));
        assert!(!doc.has_category("unused"));
    }

    #[test]
    fn edit_accepts_camel_case_new_name() {
        let edit: CategoryEdit = serde_json::from_str(r#"{"name": "a", "newName": "b"}"#).unwrap();
        assert_eq!(edit.new_name.as_deref(), Some("b"));
        let edit: CategoryEdit = serde_json::from_str(r#"{"name": "a", "new_name": "c"}"#).unwrap();
        assert_eq!(edit.new_name.as_deref(), Some("c"));
    }
}
