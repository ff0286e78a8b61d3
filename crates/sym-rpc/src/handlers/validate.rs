//! `validate_code` and `list_history`.

use std::fmt::Write as _;

use async_trait::async_trait;
use serde_json::Value;
use sym_access::AccessEvaluator;
use sym_converter::needs_reconversion;
use sym_core::{CodePolicy, ValidationResult, ValidationStatus};
use sym_validator::{EngineRegistry, FileChange, StaticChanges, Validator, ValidatorOptions};
use tracing::{debug, info, instrument, warn};

use crate::context::RpcContext;
use crate::errors::RpcError;
use crate::handlers::convert::run_conversion;
use crate::handlers::{opt_bool_param, string_list_param};
use crate::registry::MethodHandler;

/// Policy state for one validation call.
struct Enforced {
    code: CodePolicy,
    /// Role map from the user policy on disk, or the compiled one when there
    /// is no user policy.
    access: AccessEvaluator,
    converted: bool,
}

/// Compiled policy for a validation call, converting first when stale.
async fn enforced_policy(ctx: &RpcContext) -> Result<Enforced, RpcError> {
    let code = ctx.load_code_policy().await?;
    if !ctx.policy_store.exists() {
        let code = code.ok_or_else(|| RpcError::NotFound {
            message: "policy not loaded".into(),
        })?;
        return Ok(Enforced {
            access: AccessEvaluator::from_code_policy(&code),
            code,
            converted: false,
        });
    }
    let user = ctx.policy_store.load().await?.into_policy();
    let access = AccessEvaluator::from_user_policy(&user);
    match code {
        Some(code) if !needs_reconversion(&user, Some(&code)) => Ok(Enforced {
            code,
            access,
            converted: false,
        }),
        _ => {
            info!(rules = user.rules.len(), "compiled policy is stale, converting");
            let conversion = run_conversion(ctx, &user).await?;
            Ok(Enforced {
                code: conversion.outcome.code_policy,
                access,
                converted: true,
            })
        }
    }
}

fn engines(ctx: &RpcContext) -> EngineRegistry {
    match ctx.clients.create() {
        Ok(client) => EngineRegistry::with_llm(client, ctx.settings.validator.max_code_chars),
        Err(e) => {
            debug!(
                error = %e,
                "no inference backend, llm-validator rules will report engine errors"
            );
            EngineRegistry::builtin()
        }
    }
}

fn render(result: &ValidationResult, files: usize) -> String {
    let mut out = String::new();
    match result.status() {
        ValidationStatus::Passed => {
            let checked = result.checked;
            let _ = writeln!(out, "✓ Validation passed ({files} file(s), {checked} check(s))");
        }
        ValidationStatus::Warning => {
            let warnings = result.violations.len();
            let _ = writeln!(out, "⚠ Validation passed with {warnings} warning(s)");
        }
        ValidationStatus::Failed => {
            let _ = writeln!(out, "✗ Validation failed: {} violation(s)", result.violations.len());
        }
    }
    for v in &result.violations {
        let location = if v.line > 0 {
            format!("{}:{}", v.file, v.line)
        } else {
            v.file.clone()
        };
        let _ = writeln!(out, "  [{}] {} {}: {}", v.severity, v.rule_id, location, v.message);
    }
    if !result.errors.is_empty() {
        let _ = writeln!(out, "Engine errors ({}):", result.errors.len());
        for e in &result.errors {
            let _ = writeln!(out, "  {} ({}): {}", e.rule_id, e.engine, e.message);
        }
    }
    out
}

/// Checks the changed files against the compiled policy and the caller's
/// write access.
pub struct ValidateCodeHandler;

#[async_trait]
impl MethodHandler for ValidateCodeHandler {
    #[instrument(skip_all, fields(method = "validate_code"))]
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let scopes = string_list_param(params.as_ref(), "files")?;
        let staged_only = opt_bool_param(params.as_ref(), "stagedOnly");

        let Enforced {
            code,
            access,
            converted,
        } = enforced_policy(ctx).await?;
        let role = ctx.active_role()?;

        let changes: Vec<FileChange> = ctx
            .changes(staged_only)
            .changes()
            .await?
            .into_iter()
            .filter(|c| c.within(&scopes))
            .collect();
        let file_count = changes.len();
        if file_count == 0 {
            debug!("no changed files in scope");
        }

        let validator = Validator::new(
            code,
            engines(ctx),
            ValidatorOptions::from_settings(&ctx.settings.validator, &ctx.root, &role),
        )
        .with_access(access)
        .with_history(ctx.history.clone());
        let result = validator.validate(&StaticChanges(changes)).await?;
        if result.has_blocking_violations() {
            warn!(role = %role, violations = result.violations.len(), "validation failed");
        }

        Ok(serde_json::json!({
            "valid": !result.has_blocking_violations(),
            "status": result.status(),
            "text": render(&result, file_count),
            "role": role,
            "converted": converted,
            "files": file_count,
            "checked": result.checked,
            "passed": result.passed,
            "failed": result.failed,
            "total": result.violations.len(),
            "violations": result.violations,
            "errors": result.errors,
        }))
    }
}

/// Returns stored validation records, oldest first.
pub struct ListHistoryHandler;

#[async_trait]
impl MethodHandler for ListHistoryHandler {
    #[instrument(skip_all, fields(method = "list_history"))]
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let limit = params
            .as_ref()
            .and_then(|p| p.get("limit"))
            .and_then(Value::as_u64)
            .and_then(|n| usize::try_from(n).ok());
        let mut records = ctx.history.load().await?;
        let total = records.len();
        if let Some(limit) = limit {
            let _ = records.drain(..total.saturating_sub(limit));
        }
        Ok(serde_json::json!({ "records": records, "total": total }))
    }
}
