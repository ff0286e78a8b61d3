//! `convert`: compile the stored policy and write the artefacts.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use sym_converter::{ConvertOutcome, Converter, ConverterOptions, write_outputs};
use sym_core::UserPolicy;
use tracing::{info, instrument};

use crate::context::RpcContext;
use crate::errors::RpcError;
use crate::registry::MethodHandler;

/// Conversion result plus the files written.
pub(crate) struct Conversion {
    pub outcome: ConvertOutcome,
    pub written: Vec<PathBuf>,
}

/// Convert `policy` and persist the compiled policy and linter configs.
pub(crate) async fn run_conversion(
    ctx: &RpcContext,
    policy: &UserPolicy,
) -> Result<Conversion, RpcError> {
    let converter = Converter::from_factory(
        &ctx.clients,
        ctx.adapters.clone(),
        ConverterOptions::from_settings(&ctx.settings.converter),
    )?;
    let outcome = converter.convert(policy).await?;

    let output_dir = ctx.settings.paths.output_dir.clone();
    let code_policy_path = ctx.settings.paths.code_policy_path.clone();
    let (outcome, written) = tokio::task::spawn_blocking(move || {
        let written = write_outputs(&outcome, &output_dir, &code_policy_path);
        (outcome, written)
    })
    .await
    .map_err(|e| RpcError::Internal { message: e.to_string() })?;

    Ok(Conversion {
        outcome,
        written: written?,
    })
}

fn display_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

fn render(conversion: &Conversion, files: &[String]) -> String {
    let outcome = &conversion.outcome;
    let mut out = String::new();
    let _ = writeln!(out, "Converted {} rule(s)", outcome.code_policy.rules.len());
    for file in files {
        let _ = writeln!(out, "  wrote {file}");
    }
    if !outcome.warnings.is_empty() {
        let _ = writeln!(out, "Warnings:");
        for warning in &outcome.warnings {
            let _ = writeln!(out, "  - {warning}");
        }
    }
    if !outcome.errors.is_empty() {
        let _ = writeln!(out, "Errors:");
        for (linter, error) in &outcome.errors {
            let _ = writeln!(out, "  - {linter}: {error}");
        }
    }
    out
}

/// Converts the stored policy.
pub struct ConvertHandler;

#[async_trait]
impl MethodHandler for ConvertHandler {
    #[instrument(skip_all, fields(method = "convert"))]
    async fn handle(&self, _params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        if !ctx.policy_store.exists() {
            return Err(RpcError::NotFound {
                message: format!("policy file not found: {}", ctx.policy_store.path().display()),
            });
        }
        let policy = ctx.policy_store.load().await?.into_policy();
        let conversion = run_conversion(ctx, &policy).await?;
        info!(
            rules = conversion.outcome.code_policy.rules.len(),
            files = conversion.written.len(),
            "conversion complete"
        );

        let files: Vec<String> =
            conversion.written.iter().map(|p| display_path(&ctx.root, p)).collect();
        Ok(serde_json::json!({
            "text": render(&conversion, &files),
            "rules": conversion.outcome.code_policy.rules.len(),
            "files": files,
            "warnings": conversion.outcome.warnings,
            "errors": conversion.outcome.errors,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_helpers::{make_test_context, make_test_context_with, seed_policy};
    use sym_core::CodePolicy;
    use sym_core::fs::read_json_opt;
    use sym_llm::MockInferenceClient;

    const LENGTH_INTENT: &str =
        r#"{"engine": "length", "target": "line", "params": {"max": 100}, "confidence": 0.9}"#;

    #[tokio::test]
    async fn missing_policy_is_not_found() {
        let (_dir, ctx) = make_test_context();
        let err = ConvertHandler.handle(None, &ctx).await.unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn writes_code_policy_in_rule_order() {
        let (_dir, ctx) =
            make_test_context_with(MockInferenceClient::new().with_default(LENGTH_INTENT));
        seed_policy(&ctx).await;

        let result = ConvertHandler.handle(None, &ctx).await.unwrap();
        assert_eq!(result["rules"], 2);
        let files: Vec<String> = serde_json::from_value(result["files"].clone()).unwrap();
        assert_eq!(files[0], ".sym/code-policy.json");

        let code: CodePolicy =
            read_json_opt(&ctx.settings.paths.code_policy_path).unwrap().unwrap();
        let ids: Vec<&str> = code.rules.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["SEC-001", "STY-001"]);
        assert!(code.rbac.is_some());
        assert!(result["text"].as_str().unwrap().starts_with("Converted 2 rule(s)"));
    }

    #[tokio::test]
    async fn inference_failures_are_warnings() {
        let client = MockInferenceClient::new().fail_on("secrets").with_default(LENGTH_INTENT);
        let (_dir, ctx) = make_test_context_with(client);
        seed_policy(&ctx).await;

        let result = ConvertHandler.handle(None, &ctx).await.unwrap();
        let warnings = result["warnings"].as_array().unwrap();
        assert!(warnings.iter().any(|w| w.as_str().unwrap().contains("SEC-001")));
        assert_eq!(result["rules"], 2);
    }
}
