//! Forbidden patterns and identifier casing on added lines.

use async_trait::async_trait;
use regex::Regex;
use sym_core::{PolicyRule, Violation};

use super::{CheckTarget, Engine, is_comment, message_or, violation};
use crate::errors::EngineError;

/// Identifier naming conventions understood by the `case` parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Case {
    Camel,
    Pascal,
    Snake,
    ScreamingSnake,
}

impl Case {
    fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "camelcase" | "camel" => Some(Self::Camel),
            "pascalcase" | "pascal" => Some(Self::Pascal),
            "snakecase" | "snake" => Some(Self::Snake),
            "uppercase" | "screamingsnakecase" | "constantcase" => Some(Self::ScreamingSnake),
            _ => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Camel => "camelCase",
            Self::Pascal => "PascalCase",
            Self::Snake => "snake_case",
            Self::ScreamingSnake => "UPPER_CASE",
        }
    }

    fn matches(self, ident: &str) -> bool {
        let ident = ident.trim_start_matches('_');
        let Some(first) = ident.chars().next() else {
            return true;
        };
        let alnum = |c: char| c.is_ascii_alphanumeric();
        match self {
            Self::Camel => first.is_ascii_lowercase() && ident.chars().all(alnum),
            Self::Pascal => first.is_ascii_uppercase() && ident.chars().all(alnum),
            Self::Snake => {
                ident.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
            }
            Self::ScreamingSnake => {
                ident.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
            }
        }
    }
}

fn declaration_regex() -> Result<Regex, EngineError> {
    Regex::new(r"\b(?:let|const|var|function|def|class|fn)\s+(?:mut\s+)?([A-Za-z_][A-Za-z0-9_]*)")
        .map_err(|e| EngineError::invalid_params(e.to_string()))
}

/// Regex and naming checks.
///
/// Parameters: `patterns` (list) or `pattern` (string) of forbidden regexes,
/// and/or `case` naming the required identifier style for declarations.
#[derive(Clone, Copy, Debug, Default)]
pub struct PatternEngine;

#[async_trait]
impl Engine for PatternEngine {
    fn name(&self) -> &str {
        "pattern"
    }

    async fn check(
        &self,
        rule: &PolicyRule,
        target: &CheckTarget,
    ) -> Result<Vec<Violation>, EngineError> {
        let mut sources = rule.param_strings("patterns");
        if let Some(single) = rule.param_str("pattern") {
            sources.push(single.to_owned());
        }
        let case = match rule.param_str("case") {
            Some(name) => Some(Case::parse(name).ok_or_else(|| {
                EngineError::invalid_params(format!("unknown case '{name}'"))
            })?),
            None => None,
        };
        if sources.is_empty() && case.is_none() {
            return Err(EngineError::invalid_params(format!(
                "rule '{}' needs 'patterns' or 'case'",
                rule.id
            )));
        }

        let forbidden = sources
            .iter()
            .map(|src| {
                Regex::new(src).map_err(|e| {
                    EngineError::invalid_params(format!("bad pattern '{src}': {e}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let declarations = case.map(|_| declaration_regex()).transpose()?;

        let mut out = Vec::new();
        for added in &target.added {
            if is_comment(added.text.trim_start()) {
                continue;
            }
            for re in &forbidden {
                if let Some(m) = re.find(&added.text) {
                    let msg =
                        message_or(rule, || format!("Forbidden pattern '{}' found", re.as_str()));
                    out.push(violation(rule, &target.path, msg).at(added.line, m.start() + 1));
                }
            }
            if let (Some(case), Some(decl)) = (case, &declarations) {
                for cap in decl.captures_iter(&added.text) {
                    let Some(ident) = cap.get(1) else { continue };
                    let wanted = if cap[0].starts_with("class") { Case::Pascal } else { case };
                    if !wanted.matches(ident.as_str()) {
                        let msg = message_or(rule, || {
                            format!("Identifier '{}' should be {}", ident.as_str(), wanted.label())
                        });
                        let column = ident.start() + 1;
                        out.push(violation(rule, &target.path, msg).at(added.line, column));
                    }
                }
            }
        }
        Ok(out)
    }
}
