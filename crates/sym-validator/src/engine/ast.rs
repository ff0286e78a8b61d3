//! Structural nesting depth.

use std::collections::BTreeSet;

use async_trait::async_trait;
use sym_core::language::language_for_file;
use sym_core::{PolicyRule, Violation};

use super::{CheckTarget, Engine, message_or, violation};
use crate::errors::EngineError;

/// Reports the first added line whose block nesting exceeds `maxDepth`.
///
/// Brace languages count unclosed `{`; Python counts indentation levels.
/// The whole file is measured when it can be read, otherwise only the
/// added lines.
#[derive(Clone, Copy, Debug, Default)]
pub struct AstEngine;

/// Nesting depth at the start of each line (1-based), by brace counting.
fn brace_depths(lines: &[(usize, &str)]) -> Vec<(usize, usize)> {
    let mut depth = 0usize;
    let mut out = Vec::with_capacity(lines.len());
    for (line, text) in lines {
        let code = strip_strings(text);
        let opens = code.matches('{').count();
        let closes = code.matches('}').count();
        // a line that opens a block is reported at the depth it creates
        let leading_closes = code.trim_start().chars().take_while(|c| *c == '}').count();
        let here = depth.saturating_sub(leading_closes) + usize::from(opens > closes);
        out.push((*line, here));
        depth = (depth + opens).saturating_sub(closes);
    }
    out
}

/// Nesting depth by indentation, with the unit taken from the smallest indent.
fn indent_depths(lines: &[(usize, &str)]) -> Vec<(usize, usize)> {
    let width = |t: &str| {
        t.chars()
            .take_while(|c| c.is_whitespace())
            .map(|c| if c == '\t' { 4 } else { 1 })
            .sum::<usize>()
    };
    let unit = lines
        .iter()
        .filter(|(_, t)| !t.trim().is_empty())
        .map(|(_, t)| width(t))
        .filter(|w| *w > 0)
        .min()
        .unwrap_or(4);
    lines
        .iter()
        .filter(|(_, t)| !t.trim().is_empty() && !t.trim_start().starts_with('#'))
        .map(|(line, t)| (*line, width(t) / unit))
        .collect()
}

fn strip_strings(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for c in text.chars() {
        match quote {
            Some(_) if escaped => escaped = false,
            Some(_) if c == '\\' => escaped = true,
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if matches!(c, '"' | '\'' | '`') => quote = Some(c),
            None => out.push(c),
        }
        if quote.is_none() && out.ends_with("//") {
            out.truncate(out.len() - 2);
            break;
        }
    }
    out
}

#[async_trait]
impl Engine for AstEngine {
    fn name(&self) -> &str {
        "ast"
    }

    async fn check(
        &self,
        rule: &PolicyRule,
        target: &CheckTarget,
    ) -> Result<Vec<Violation>, EngineError> {
        let max = rule
            .param_u64("maxDepth")
            .or_else(|| rule.param_u64("max"))
            .ok_or_else(|| {
                EngineError::invalid_params(format!("rule '{}' needs 'maxDepth'", rule.id))
            })?;
        let max = usize::try_from(max).unwrap_or(usize::MAX);
        if target.added.is_empty() {
            return Ok(Vec::new());
        }

        let content = target.content().await;
        let lines: Vec<(usize, &str)> = match &content {
            Some(text) => text.lines().enumerate().map(|(i, l)| (i + 1, l)).collect(),
            None => target.added.iter().map(|a| (a.line, a.text.as_str())).collect(),
        };
        let depths = if language_for_file(&target.path) == Some("python") {
            indent_depths(&lines)
        } else {
            brace_depths(&lines)
        };

        let added: BTreeSet<usize> = target.added.iter().map(|a| a.line).collect();
        let first = depths
            .into_iter()
            .find(|(line, depth)| *depth > max && added.contains(line));
        Ok(first
            .map(|(line, depth)| {
                let msg =
                    message_or(rule, || format!("Nesting depth {depth} exceeds maximum {max}"));
                vec![violation(rule, &target.path, msg).at(line, 1)]
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::{rule, target};
    use assert_matches::assert_matches;
    use serde_json::json;

    const NESTED_JS: &str = "function a() {\n  if (x) {\n    for (;;) {\n      while (y) {\n\
                             \x20       go();\n      }\n    }\n  }\n}\n";

    #[tokio::test]
    async fn deep_braces_reported_once() {
        let r = rule("ast", json!({"maxDepth": 3}));
        let v = AstEngine.check(&r, &target("a.js", NESTED_JS)).await.unwrap();
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].line, 4);
        assert!(v[0].message.contains("depth 4"));
    }

    #[tokio::test]
    async fn shallow_code_passes() {
        let r = rule("ast", json!({"maxDepth": 5}));
        assert!(AstEngine.check(&r, &target("a.js", NESTED_JS)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn braces_in_strings_do_not_count() {
        let r = rule("ast", json!({"maxDepth": 1}));
        let v = AstEngine
            .check(&r, &target("a.js", "const s = \"{{{{\";\nlog('{'); // {\n"))
            .await
            .unwrap();
        assert!(v.is_empty());
    }

    #[tokio::test]
    async fn python_uses_indentation() {
        let r = rule("ast", json!({"max": 2}));
        let src = "def f():\n    if a:\n        for b in c:\n            print(b)\n";
        let v = AstEngine.check(&r, &target("a.py", src)).await.unwrap();
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].line, 4);
    }

    #[tokio::test]
    async fn only_added_lines_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.js"), NESTED_JS).unwrap();
        let change =
            crate::changes::FileChange::modified("a.js", "@@ -1,0 +1,1 @@\n+function a() {\n");
        let t = CheckTarget::new(&change, dir.path());
        let v = AstEngine.check(&rule("ast", json!({"maxDepth": 3})), &t).await.unwrap();
        assert!(v.is_empty());
    }

    #[tokio::test]
    async fn depth_is_required() {
        let err = AstEngine
            .check(&rule("ast", json!({})), &target("a.js", "x\n"))
            .await
            .unwrap_err();
        assert_matches!(err, EngineError::InvalidParams { .. });
    }
}
