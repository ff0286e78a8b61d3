//! Line and file length limits.

use async_trait::async_trait;
use sym_core::{PolicyRule, Violation};

use super::{CheckTarget, Engine, message_or, violation};
use crate::errors::EngineError;

/// Checks `max` against line width (`scope: line`, the default) or file
/// length (`scope: file`).
#[derive(Clone, Copy, Debug, Default)]
pub struct LengthEngine;

#[async_trait]
impl Engine for LengthEngine {
    fn name(&self) -> &str {
        "length"
    }

    async fn check(
        &self,
        rule: &PolicyRule,
        target: &CheckTarget,
    ) -> Result<Vec<Violation>, EngineError> {
        let max = rule
            .param_u64("max")
            .ok_or_else(|| EngineError::invalid_params(format!("rule '{}' needs 'max'", rule.id)))?;
        let max = usize::try_from(max).unwrap_or(usize::MAX);

        match rule.param_str("scope").unwrap_or("line") {
            "line" => Ok(target
                .added
                .iter()
                .filter_map(|added| {
                    let width = added.text.chars().count();
                    (width > max).then(|| {
                        let msg = message_or(rule, || {
                            format!("Line length {width} exceeds maximum {max}")
                        });
                        violation(rule, &target.path, msg).at(added.line, max + 1)
                    })
                })
                .collect()),
            "file" => {
                let lines = match target.content().await {
                    Some(content) => content.lines().count(),
                    None => target.added.len(),
                };
                if lines > max {
                    let msg =
                        message_or(rule, || format!("File has {lines} lines, maximum is {max}"));
                    Ok(vec![violation(rule, &target.path, msg)])
                } else {
                    Ok(Vec::new())
                }
            }
            other => Err(EngineError::invalid_params(format!("unknown length scope '{other}'"))),
        }
    }
}
