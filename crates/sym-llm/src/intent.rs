//! Structured interpretation of a natural-language rule.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::InferenceError;
use crate::json::strip_code_fences;

/// Confidence assumed when the model omits one.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Instructions for rule classification.
pub const INTENT_SYSTEM_PROMPT: &str = r#"You are a code linting rule analyzer.
Extract structured information from natural language coding rules.

Extract:
1. engine: pattern|length|style|ast|llm-validator
   - "style" for formatting rules (semicolons, quotes, indentation, spacing)
   - "pattern" for naming conventions or content matching
   - "length" for size or length constraints
   - "ast" for structural complexity rules
   - "llm-validator" for semantic rules that simple patterns cannot express
2. category: naming|formatting|security|error_handling|testing|documentation|dependency|
   commit|performance|architecture|custom
3. target: identifier|content|import|class|method|function|variable|file|line
4. scope: line|file|function|method|class|module|project
5. patterns: array of regex patterns or keywords
6. params: object with rule parameters, e.g. {"semi": true}, {"quote": "single"}, {"indent": 2},
   {"trailingComma": "always"}, {"case": "camelCase"}, {"max": 80}, {"min": 10}
7. confidence: 0.0-1.0

Example:
Input: "Lines should not exceed 80 characters"
Output: {"engine": "length", "category": "formatting", "target": "line", "scope": "line",
 "patterns": [], "params": {"max": 80}, "confidence": 0.95}

Respond with valid JSON only."#;

/// Classified rule.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleIntent {
    /// Suggested engine (`pattern`, `length`, `style`, `ast`, `llm-validator`).
    pub engine: String,
    /// Rule family.
    #[serde(default)]
    pub category: String,
    /// What the rule inspects (`identifier`, `line`, ...).
    #[serde(default)]
    pub target: String,
    /// Granularity (`line`, `file`, ...).
    #[serde(default)]
    pub scope: String,
    /// Regexes or keywords.
    #[serde(default)]
    pub patterns: Vec<String>,
    /// Rule parameters.
    #[serde(default)]
    pub params: BTreeMap<String, Value>,
    /// Model confidence in `0.0..=1.0`.
    #[serde(default)]
    pub confidence: f64,
    /// Free-form explanation.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reasoning: String,
}

impl RuleIntent {
    /// Integer parameter.
    pub fn param_u64(&self, key: &str) -> Option<u64> {
        self.params.get(key).and_then(Value::as_u64)
    }

    /// String parameter.
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Value::as_str)
    }

    /// Boolean parameter.
    pub fn param_bool(&self, key: &str) -> Option<bool> {
        self.params.get(key).and_then(Value::as_bool)
    }

    /// Add hint parameters without overriding inferred ones.
    pub fn merge_hints(&mut self, hints: &BTreeMap<String, Value>) {
        for (key, value) in hints {
            let _ = self.params.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }
}

/// Parse model output into a [`RuleIntent`].
///
/// Code fences are stripped, `engine` is required, a missing or zero
/// confidence becomes [`DEFAULT_CONFIDENCE`] and the result is clamped to `0.0..=1.0`.
pub fn parse_intent(response: &str) -> Result<RuleIntent, InferenceError> {
    let body = strip_code_fences(response);
    let mut intent: RuleIntent = serde_json::from_str(body)
        .map_err(|e| InferenceError::parse(format!("invalid intent JSON: {e}")))?;

    if intent.engine.trim().is_empty() {
        return Err(InferenceError::parse("missing engine field"));
    }
    if intent.confidence.abs() < f64::EPSILON || !intent.confidence.is_finite() {
        intent.confidence = DEFAULT_CONFIDENCE;
    }
    intent.confidence = intent.confidence.clamp(0.0, 1.0);
    Ok(intent)
}
