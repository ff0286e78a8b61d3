//! Formatting heuristics over added lines.

use async_trait::async_trait;
use sym_core::{PolicyRule, Violation};

use super::{CheckTarget, Engine, is_comment, message_or, violation};
use crate::errors::EngineError;

/// Checks `indent` (spaces per level), `useTabs`, `quote` (`single` or
/// `double`) and `semi` (`always` or `never`). At least one is required.
#[derive(Clone, Copy, Debug, Default)]
pub struct StyleEngine;

#[derive(Debug, Default)]
struct StyleParams {
    indent: Option<usize>,
    use_tabs: Option<bool>,
    quote: Option<char>,
    semi: Option<bool>,
}

impl StyleParams {
    fn from_rule(rule: &PolicyRule) -> Result<Self, EngineError> {
        let params = &rule.check.params;
        let quote = match rule.param_str("quote") {
            None => None,
            Some("single") => Some('\''),
            Some("double") => Some('"'),
            Some(other) => {
                return Err(EngineError::invalid_params(format!("unknown quote style '{other}'")));
            }
        };
        let semi = match params.get("semi") {
            None => None,
            Some(v) if v.as_bool().is_some() => v.as_bool(),
            Some(v) => match v.as_str() {
                Some("always") => Some(true),
                Some("never") => Some(false),
                _ => return Err(EngineError::invalid_params(format!("unknown semi setting {v}"))),
            },
        };
        let out = Self {
            indent: rule
                .param_u64("indent")
                .and_then(|n| usize::try_from(n).ok())
                .filter(|n| *n > 0),
            use_tabs: params.get("useTabs").and_then(serde_json::Value::as_bool),
            quote,
            semi,
        };
        if out.indent.is_none()
            && out.use_tabs.is_none()
            && out.quote.is_none()
            && out.semi.is_none()
        {
            return Err(EngineError::invalid_params(format!(
                "rule '{}' has no style settings",
                rule.id
            )));
        }
        Ok(out)
    }
}

fn leading(text: &str) -> &str {
    &text[..text.len() - text.trim_start().len()]
}

fn ends_statement(trimmed: &str) -> bool {
    !trimmed.ends_with(['{', '}', '(', '[', ',', ':', '>', '|', '&', '+', '=', '.'])
}

#[async_trait]
impl Engine for StyleEngine {
    fn name(&self) -> &str {
        "style"
    }

    async fn check(
        &self,
        rule: &PolicyRule,
        target: &CheckTarget,
    ) -> Result<Vec<Violation>, EngineError> {
        let params = StyleParams::from_rule(rule)?;
        let mut out = Vec::new();
        let mut report = |line: usize, fallback: String| {
            let msg = message_or(rule, || fallback);
            out.push(violation(rule, &target.path, msg).at(line, 1));
        };

        for added in &target.added {
            let trimmed = added.text.trim();
            if trimmed.is_empty() || is_comment(trimmed) {
                continue;
            }
            let indent = leading(&added.text);

            match params.use_tabs {
                Some(true) if indent.contains(' ') => {
                    report(added.line, "Indentation should use tabs".into());
                    continue;
                }
                Some(false) if indent.contains('\t') => {
                    report(added.line, "Indentation should use spaces".into());
                    continue;
                }
                _ => {}
            }
            if let Some(width) = params.indent {
                if !indent.contains('\t') && indent.len() % width != 0 {
                    let spaces = indent.len();
                    report(
                        added.line,
                        format!("Indentation of {spaces} spaces is not a multiple of {width}"),
                    );
                    continue;
                }
            }
            if let Some(quote) = params.quote {
                let wrong = if quote == '\'' { '"' } else { '\'' };
                let has_wrong = trimmed.contains(wrong) && !trimmed.contains(quote);
                if has_wrong {
                    let name = if quote == '\'' { "single" } else { "double" };
                    report(added.line, format!("Strings should use {name} quotes"));
                    continue;
                }
            }
            match params.semi {
                Some(true) if ends_statement(trimmed) && !trimmed.ends_with(';') => {
                    report(added.line, "Missing semicolon".into());
                }
                Some(false) if trimmed.ends_with(';') && !trimmed.starts_with("for") => {
                    report(added.line, "Unnecessary semicolon".into());
                }
                _ => {}
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::{rule, target};
    use assert_matches::assert_matches;
    use serde_json::json;

    #[tokio::test]
    async fn indentation_width() {
        let r = rule("style", json!({"indent": 2}));
        let t = target("a.js", "function f() {\n  ok();\n   bad();\n}\n");
        let v = StyleEngine.check(&r, &t).await.unwrap();
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].line, 3);
    }

    #[tokio::test]
    async fn tabs_versus_spaces() {
        let spaces = rule("style", json!({"useTabs": false}));
        let v = StyleEngine.check(&spaces, &target("a.js", "\tx();\n  y();\n")).await.unwrap();
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].message, "Indentation should use spaces");

        let tabs = rule("style", json!({"useTabs": true}));
        let v = StyleEngine.check(&tabs, &target("a.js", "\tx();\n  y();\n")).await.unwrap();
        assert_eq!(v[0].line, 2);
    }

    #[tokio::test]
    async fn quote_style() {
        let r = rule("style", json!({"quote": "single"}));
        let t = target("a.js", "const a = 'x';\nconst b = \"y\";\nconst c = \"it's\";\n");
        let v = StyleEngine.check(&r, &t).await.unwrap();
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].line, 2);
    }

    #[tokio::test]
    async fn semicolons() {
        let always = rule("style", json!({"semi": "always"}));
        let t = target("a.js", "const a = 1\nif (a) {\n  b();\n}\n");
        let v = StyleEngine.check(&always, &t).await.unwrap();
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].message, "Missing semicolon");

        let never = rule("style", json!({"semi": false}));
        let v = StyleEngine.check(&never, &target("a.js", "a();\nb()\n")).await.unwrap();
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].line, 1);
    }

    #[tokio::test]
    async fn comments_and_blank_lines_are_skipped() {
        let r = rule("style", json!({"semi": true}));
        let v = StyleEngine.check(&r, &target("a.js", "// comment\n\n")).await.unwrap();
        assert!(v.is_empty());
    }

    #[tokio::test]
    async fn settings_are_required() {
        let err = StyleEngine
            .check(&rule("style", json!({})), &target("a.js", "x\n"))
            .await
            .unwrap_err();
        assert_matches!(err, EngineError::InvalidParams { .. });
        let err = StyleEngine
            .check(&rule("style", json!({"quote": "backtick"})), &target("a.js", "x\n"))
            .await
            .unwrap_err();
        assert_matches!(err, EngineError::InvalidParams { .. });
    }
}
