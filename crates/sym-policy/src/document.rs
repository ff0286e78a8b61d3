//! In-memory policy with name/id lookup.

use std::collections::HashMap;

use sym_core::{CategoryDef, UserDefaults, UserPolicy, UserRule};

/// Policy version written into freshly created policies.
pub const DEFAULT_VERSION: &str = "1.0.0";

/// A loaded `UserPolicy` plus indexes over its category and rule lists.
///
/// Lists keep authoring order. The indexes are rebuilt after every
/// structural change, so lookups never see stale positions.
#[derive(Clone, Debug, Default)]
pub struct PolicyDocument {
    policy: UserPolicy,
    categories: HashMap<String, usize>,
    rules: HashMap<String, usize>,
    dirty: bool,
}

impl PolicyDocument {
    /// Wrap a policy and build its indexes.
    pub fn new(policy: UserPolicy) -> Self {
        let mut doc = Self {
            policy,
            ..Self::default()
        };
        doc.reindex();
        doc
    }

    /// A new policy holding the default categories.
    pub fn fresh() -> Self {
        Self::new(UserPolicy {
            version: DEFAULT_VERSION.into(),
            categories: crate::categories::default_categories(),
            ..UserPolicy::default()
        })
    }

    pub(crate) fn reindex(&mut self) {
        self.categories = self
            .policy
            .categories
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.clone(), i))
            .collect();
        self.rules = self
            .policy
            .rules
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.clone(), i))
            .collect();
    }

    /// Current policy.
    pub fn policy(&self) -> &UserPolicy {
        &self.policy
    }

    /// Owned copy of the current policy.
    pub fn snapshot(&self) -> UserPolicy {
        self.policy.clone()
    }

    /// Consume into the policy.
    pub fn into_policy(self) -> UserPolicy {
        self.policy
    }

    /// Whether a successful edit has been applied since load.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Category by name.
    pub fn category(&self, name: &str) -> Option<&CategoryDef> {
        self.categories.get(name).map(|&i| &self.policy.categories[i])
    }

    /// Whether a category exists.
    pub fn has_category(&self, name: &str) -> bool {
        self.categories.contains_key(name)
    }

    /// Rule by id.
    pub fn rule(&self, id: &str) -> Option<&UserRule> {
        self.rules.get(id).map(|&i| &self.policy.rules[i])
    }

    /// Whether a rule id exists.
    pub fn has_rule(&self, id: &str) -> bool {
        self.rules.contains_key(id)
    }

    pub(crate) fn category_index(&self, name: &str) -> Option<usize> {
        self.categories.get(name).copied()
    }

    pub(crate) fn rule_index(&self, id: &str) -> Option<usize> {
        self.rules.get(id).copied()
    }

    pub(crate) fn policy_mut(&mut self) -> &mut UserPolicy {
        &mut self.policy
    }

    /// Number of rules in `category`.
    pub fn rules_in(&self, category: &str) -> usize {
        self.policy.rules.iter().filter(|r| r.category == category).count()
    }

    /// Add any languages used by `rules` to `defaults.languages`, keeping order.
    pub(crate) fn extend_default_languages<'a>(
        &mut self,
        rules: impl IntoIterator<Item = &'a UserRule>,
    ) {
        let new: Vec<String> =
            rules.into_iter().flat_map(|r| r.languages.iter().cloned()).collect();
        if new.is_empty() {
            return;
        }
        let defaults = self.policy.defaults.get_or_insert_with(UserDefaults::default);
        for lang in new {
            if !defaults.languages.contains(&lang) {
                defaults.languages.push(lang);
            }
        }
    }
}

impl From<UserPolicy> for PolicyDocument {
    fn from(policy: UserPolicy) -> Self {
        Self::new(policy)
    }
}
