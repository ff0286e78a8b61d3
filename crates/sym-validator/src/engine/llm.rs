//! Model-backed review of rules that have no deterministic engine.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use sym_core::{LLM_VALIDATOR_ENGINE, PolicyRule, Violation};
use sym_llm::json::{extract_json_object, strip_code_fences};
use sym_llm::{InferenceClient, InferenceRequest};
use tracing::{debug, instrument};

use super::{CheckTarget, Engine, violation};
use crate::errors::EngineError;

const REVIEW_SYSTEM_PROMPT: &str = r#"You are a strict code reviewer.
Your job is to check if code changes violate a specific coding convention.

IMPORTANT INSTRUCTIONS:
1. Be CONSERVATIVE - only report violations when you are CERTAIN the code violates the rule
2. Do NOT report false positives - if unsure, report as NOT violating
3. Consider the context of the code when making your decision
4. Focus ONLY on the specific rule given - do not check other rules

You MUST respond with ONLY a valid JSON object (no markdown, no explanation outside JSON):
{
  "violates": false,
  "confidence": "high",
  "description": "",
  "suggestion": ""
}

JSON Field Definitions:
- violates: boolean - true ONLY if you are certain the code violates the rule
- confidence: "high" | "medium" | "low" - your confidence in the assessment
- description: string - brief explanation if violated (empty string if not violated)
- suggestion: string - how to fix if violated (empty string if not violated)

EXAMPLES:

Rule: "No console.log in production code"
Code: "console.log('debug');"
Response:
{"violates": true, "confidence": "high", "description": "console.log statement found",
 "suggestion": "Remove console.log or use a proper logging library"}

Rule: "Functions must not exceed 50 lines"
Code: (20 lines of code)
Response:
{"violates": false, "confidence": "high", "description": "", "suggestion": ""}"#;

const TRUNCATION_MARKER: &str = "\n... (truncated)";

/// Parsed reviewer answer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReviewVerdict {
    /// Whether the code breaks the rule.
    pub violates: bool,
    /// `high`, `medium` or `low`.
    pub confidence: String,
    /// What is wrong.
    pub description: String,
    /// How to fix it.
    pub suggestion: String,
}

impl ReviewVerdict {
    fn clean() -> Self {
        Self {
            confidence: "low".into(),
            ..Self::default()
        }
    }

    /// Whether the verdict should become a violation. Low confidence never does.
    pub fn is_reportable(&self) -> bool {
        self.violates && !self.confidence.eq_ignore_ascii_case("low")
    }

    /// Violation message: description plus the suggestion when present.
    pub fn message(&self) -> String {
        if self.suggestion.is_empty() {
            self.description.clone()
        } else {
            format!("{} | Suggestion: {}", self.description, self.suggestion)
        }
    }
}

/// Parse a reviewer response. Unparseable answers count as "no violation".
pub fn parse_verdict(response: &str) -> ReviewVerdict {
    let cleaned = strip_code_fences(response);
    let Some(object) = extract_json_object(cleaned) else {
        return ReviewVerdict::clean();
    };
    match serde_json::from_str::<ReviewVerdict>(object) {
        Ok(mut verdict) => {
            if verdict.confidence.is_empty() {
                verdict.confidence = "medium".into();
            }
            if verdict.violates && verdict.description.is_empty() {
                verdict.description = "Rule violation detected".into();
            }
            verdict
        }
        Err(e) => {
            debug!(error = %e, "reviewer answer is not valid JSON, scanning text");
            scan_verdict(cleaned)
        }
    }
}

fn scan_verdict(text: &str) -> ReviewVerdict {
    let lower = text.to_lowercase();
    let says = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));
    if says(&[r#""violates": false"#, r#""violates":false"#, "does not violate"]) {
        return ReviewVerdict::clean();
    }
    if !says(&[r#""violates": true"#, r#""violates":true"#]) {
        return ReviewVerdict::clean();
    }
    let description =
        string_field(text, "description").unwrap_or_else(|| "Rule violation detected".into());
    ReviewVerdict {
        violates: true,
        confidence: "medium".into(),
        description,
        suggestion: string_field(text, "suggestion").unwrap_or_default(),
    }
}

/// Value of `"field": "value"` in loosely formatted text.
fn string_field(text: &str, field: &str) -> Option<String> {
    let key = format!("\"{field}\"");
    let rest = &text[text.find(&key)? + key.len()..];
    let rest = rest.trim_start().strip_prefix(':')?.trim_start().strip_prefix('"')?;
    let value = &rest[..rest.find('"')?];
    (!value.is_empty()).then(|| value.to_owned())
}

fn truncate_chars(code: &str, max: usize) -> String {
    match code.char_indices().nth(max) {
        Some((cut, _)) => format!("{}{TRUNCATION_MARKER}", &code[..cut]),
        None => code.to_owned(),
    }
}

/// Rule text for the prompt: the description plus the message when set.
fn rule_text(rule: &PolicyRule) -> String {
    let message = rule.message.trim();
    if message.is_empty() || message == rule.desc.trim() {
        rule.desc.clone()
    } else {
        format!("{}\n{message}", rule.desc)
    }
}

/// Engine `llm-validator`: asks the model whether added lines break the rule.
pub struct LlmEngine {
    client: Arc<dyn InferenceClient>,
    max_code_chars: usize,
}

impl LlmEngine {
    /// Engine over `client`, sending at most `max_code_chars` of code per call.
    pub fn new(client: Arc<dyn InferenceClient>, max_code_chars: usize) -> Self {
        Self { client, max_code_chars }
    }

    fn code_under_review(&self, target: &CheckTarget) -> Option<String> {
        let code = if target.added.is_empty() {
            // diff with context only: review everything that is there
            if target.diff.trim().is_empty() {
                return None;
            }
            target.diff.clone()
        } else {
            crate::diff::joined(&target.added)
        };
        Some(truncate_chars(&code, self.max_code_chars))
    }
}

#[async_trait]
impl Engine for LlmEngine {
    fn name(&self) -> &str {
        LLM_VALIDATOR_ENGINE
    }

    #[instrument(skip_all, fields(rule_id = %rule.id, file = %target.path))]
    async fn check(
        &self,
        rule: &PolicyRule,
        target: &CheckTarget,
    ) -> Result<Vec<Violation>, EngineError> {
        let Some(code) = self.code_under_review(target) else {
            return Ok(Vec::new());
        };
        let user = format!(
            "File: {}\n\n=== RULE TO CHECK ===\n{}\n\n=== CODE TO REVIEW ===\n{}\n\n\
             Analyze the code and determine if it violates the rule. Respond with JSON only.",
            target.path,
            rule_text(rule),
            code
        );
        let request = InferenceRequest::new(REVIEW_SYSTEM_PROMPT, user).json();
        let response = self.client.complete(&request).await?;

        let verdict = parse_verdict(&response);
        debug!(violates = verdict.violates, confidence = %verdict.confidence, "review verdict");
        if !verdict.is_reportable() {
            return Ok(Vec::new());
        }
        Ok(vec![violation(rule, &target.path, verdict.message())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::{rule, target};
    use assert_matches::assert_matches;
    use serde_json::json;
    use sym_llm::MockInferenceClient;

    fn engine(client: MockInferenceClient) -> (Arc<MockInferenceClient>, LlmEngine) {
        let client = Arc::new(client);
        (client.clone(), LlmEngine::new(client, 3000))
    }

    #[test]
    fn verdict_from_fenced_json() {
        let v = parse_verdict(
            "```json\n{\"violates\": true, \"confidence\": \"high\", \
             \"description\": \"console.log found\", \"suggestion\": \"remove it\"}\n```",
        );
        assert!(v.is_reportable());
        assert_eq!(v.message(), "console.log found | Suggestion: remove it");
    }

    #[test]
    fn verdict_defaults() {
        let v = parse_verdict("{\"violates\": true}");
        assert_eq!(v.confidence, "medium");
        assert_eq!(v.description, "Rule violation detected");
        assert_eq!(v.message(), "Rule violation detected");
    }

    #[test]
    fn low_confidence_is_not_reportable() {
        assert!(!parse_verdict("{\"violates\": true, \"confidence\": \"low\"}").is_reportable());
        assert!(!parse_verdict("{\"violates\": false, \"confidence\": \"high\"}").is_reportable());
    }

    #[test]
    fn unparseable_answers_are_clean() {
        assert!(!parse_verdict("I cannot tell").violates);
        assert!(!parse_verdict("{not json at all}").violates);
    }

    #[test]
    fn text_scan_fallback() {
        let v =
            parse_verdict("{\"violates\": true, \"description\": \"uses var\", trailing garbage}");
        assert!(v.violates);
        assert_eq!(v.confidence, "medium");
        assert_eq!(v.description, "uses var");

        let clean = parse_verdict("{this code does not violate the rule, \"violates\": true,}");
        assert!(!clean.violates);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("abc", 5), "abc");
        assert_eq!(truncate_chars("ééé", 2), "éé\n... (truncated)");
    }

    #[tokio::test]
    async fn reports_violation_with_rule_severity() {
        let (client, engine) = engine(MockInferenceClient::new().with_default(
            r#"{"violates": true, "confidence": "high",
                "description": "console.log found", "suggestion": ""}"#,
        ));
        let r = rule("llm-validator", json!({}));
        let v = engine.check(&r, &target("a.js", "+console.log(1)\n")).await.unwrap();
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].message, "console.log found");
        assert_eq!(v[0].severity, r.severity);

        let sent = &client.requests()[0];
        assert!(sent.json);
        assert!(sent.user.starts_with("File: a.js"));
        assert!(sent.user.contains("=== RULE TO CHECK ===\ntest rule"));
        assert!(sent.user.contains("=== CODE TO REVIEW ===\n+console.log(1)"));
    }

    #[tokio::test]
    async fn prompt_includes_rule_message() {
        let (client, engine) =
            engine(MockInferenceClient::new().with_default("{\"violates\": false}"));
        let mut r = rule("llm-validator", json!({}));
        r.message = "Use the logger instead".into();
        let _ = engine.check(&r, &target("a.js", "+console.log(1)\n")).await.unwrap();
        let expected = "=== RULE TO CHECK ===\ntest rule\nUse the logger instead\n";
        assert!(client.requests()[0].user.contains(expected));
    }

    #[tokio::test]
    async fn empty_change_skips_the_model() {
        let (client, engine) = engine(MockInferenceClient::new().with_default("{}"));
        let v = engine.check(&rule("llm-validator", json!({})), &target("a.js", "")).await.unwrap();
        assert!(v.is_empty());
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn context_only_diff_sends_whole_diff() {
        let (client, engine) =
            engine(MockInferenceClient::new().with_default("{\"violates\": false}"));
        let diff = "@@ -1,2 +1,1 @@\n keep();\n-gone();\n";
        let v =
            engine.check(&rule("llm-validator", json!({})), &target("a.js", diff)).await.unwrap();
        assert!(v.is_empty());
        assert!(client.requests()[0].user.contains("-gone();"));
    }

    #[tokio::test]
    async fn long_code_is_truncated() {
        let client = Arc::new(MockInferenceClient::new().with_default("{\"violates\": false}"));
        let engine = LlmEngine::new(client.clone(), 10);
        let _ = engine
            .check(&rule("llm-validator", json!({})), &target("a.js", "0123456789abcdef\n"))
            .await
            .unwrap();
        assert!(client.requests()[0].user.contains("0123456789\n... (truncated)"));
    }

    #[tokio::test]
    async fn backend_failure_is_an_engine_error() {
        let (_, engine) = engine(MockInferenceClient::new().fail_on("RULE TO CHECK"));
        let err = engine
            .check(&rule("llm-validator", json!({})), &target("a.js", "x\n"))
            .await
            .unwrap_err();
        assert_matches!(err, EngineError::Inference(_));
    }
}
