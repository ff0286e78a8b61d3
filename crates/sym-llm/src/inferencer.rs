//! Rule intent inference with a per-instance cache.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use sym_core::UserRule;
use tracing::{debug, instrument};

use crate::client::{InferenceClient, InferenceRequest};
use crate::errors::InferenceError;
use crate::intent::{INTENT_SYSTEM_PROMPT, RuleIntent, parse_intent};

/// Result of classifying one rule.
#[derive(Clone, Debug, PartialEq)]
pub struct InferenceOutcome {
    /// Classified rule.
    pub intent: RuleIntent,
    /// Served from cache without calling the backend.
    pub cached: bool,
}

/// Classifies natural-language rules through an [`InferenceClient`].
///
/// Rules with the same `say` text (trimmed, case-insensitive) are classified
/// once per instance. Hint parameters are merged after caching, so two rules
/// sharing a text can carry different hints.
pub struct Inferencer {
    client: Arc<dyn InferenceClient>,
    cache: Mutex<HashMap<String, RuleIntent>>,
}

impl Inferencer {
    /// Inferencer over `client`.
    pub fn new(client: Arc<dyn InferenceClient>) -> Self {
        Self {
            client,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Backend name.
    pub fn backend(&self) -> &str {
        self.client.name()
    }

    /// Classify a rule.
    #[instrument(skip_all, fields(rule_id = %rule.id))]
    pub async fn infer(&self, rule: &UserRule) -> Result<InferenceOutcome, InferenceError> {
        let key = rule.say.trim().to_lowercase();
        let cached = self.cache.lock().get(&key).cloned();

        let (mut intent, was_cached) = if let Some(intent) = cached {
            debug!("intent served from cache");
            (intent, true)
        } else {
            let mut user = format!("Rule: {}", rule.say);
            if !rule.category.is_empty() {
                user.push_str(&format!("\nCategory: {}", rule.category));
            }
            let request = InferenceRequest::new(INTENT_SYSTEM_PROMPT, user).json();
            let response = self.client.complete(&request).await?;
            let intent = parse_intent(&response)?;
            let _ = self.cache.lock().insert(key, intent.clone());
            (intent, false)
        };

        intent.merge_hints(&rule.params);
        Ok(InferenceOutcome {
            intent,
            cached: was_cached,
        })
    }

    /// Number of cached intents.
    pub fn cache_len(&self) -> usize {
        self.cache.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockInferenceClient;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn rule(id: &str, say: &str) -> UserRule {
        UserRule {
            id: id.into(),
            say: say.into(),
            ..UserRule::default()
        }
    }

    #[tokio::test]
    async fn same_text_hits_cache() {
        let client = Arc::new(MockInferenceClient::new().respond_to(
            "semicolons",
            r#"{"engine": "style", "params": {"semi": true}, "confidence": 0.95}"#,
        ));
        let inferencer = Inferencer::new(client.clone());

        let first = inferencer.infer(&rule("A", "Use semicolons")).await.unwrap();
        let second = inferencer.infer(&rule("B", "  use SEMICOLONS ")).await.unwrap();

        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(first.intent, second.intent);
        assert_eq!(client.call_count(), 1);
        assert_eq!(inferencer.cache_len(), 1);
    }

    #[tokio::test]
    async fn hints_apply_per_rule() {
        let client = Arc::new(
            MockInferenceClient::new()
                .respond_to("length", r#"{"engine": "length", "confidence": 0.9}"#),
        );
        let inferencer = Inferencer::new(client);
        let mut hinted = rule("L1", "Limit line length");
        let _ = hinted.params.insert("max".into(), json!(120));

        let with_hint = inferencer.infer(&hinted).await.unwrap();
        let without = inferencer.infer(&rule("L2", "Limit line length")).await.unwrap();
        assert_eq!(with_hint.intent.param_u64("max"), Some(120));
        assert_eq!(without.intent.param_u64("max"), None);
    }

    #[tokio::test]
    async fn category_included_in_prompt() {
        let client = Arc::new(
            MockInferenceClient::new()
                .respond_to("Category: security", r#"{"engine": "pattern"}"#),
        );
        let inferencer = Inferencer::new(client);
        let mut r = rule("S", "No secrets");
        r.category = "security".into();
        let outcome = inferencer.infer(&r).await.unwrap();
        assert_eq!(outcome.intent.engine, "pattern");
    }

    #[tokio::test]
    async fn backend_errors_are_not_cached() {
        let client = Arc::new(MockInferenceClient::new().fail_on("flaky"));
        let inferencer = Inferencer::new(client);
        assert_matches!(
            inferencer.infer(&rule("F", "flaky rule")).await,
            Err(InferenceError::Api { .. })
        );
        assert_eq!(inferencer.cache_len(), 0);
    }
}
