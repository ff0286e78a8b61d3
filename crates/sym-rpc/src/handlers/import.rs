//! `import_convention`: extract conventions from a document into the policy.

use std::fmt::Write as _;

use async_trait::async_trait;
use serde_json::Value;
use sym_policy::{ConventionImporter, ImportMode, ImportReport};
use tracing::instrument;

use crate::context::RpcContext;
use crate::errors::RpcError;
use crate::handlers::{opt_string_param, require_string_param};
use crate::registry::MethodHandler;

fn render(report: &ImportReport) -> String {
    let mut out = format!("Imported from {}\n", report.file);
    if report.categories_removed + report.rules_removed > 0 {
        let _ = writeln!(
            out,
            "  cleared {} categories and {} rules",
            report.categories_removed, report.rules_removed
        );
    }
    let _ = writeln!(out, "  categories added: {}", report.categories_added.len());
    for c in &report.categories_added {
        let _ = writeln!(out, "    - {}", c.name);
    }
    let _ = writeln!(out, "  rules added: {}", report.rules_added.len());
    for r in &report.rules_added {
        let _ = writeln!(out, "    - [{}] {}", r.id, r.say);
    }
    for w in &report.warnings {
        let _ = writeln!(out, "  warning: {w}");
    }
    out
}

/// Reads `path` (relative to the repository root), asks the model for its
/// conventions and merges them in `append` (default) or `clear` mode.
pub struct ImportConventionHandler;

#[async_trait]
impl MethodHandler for ImportConventionHandler {
    #[instrument(skip_all, fields(method = "import_convention"))]
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let path = require_string_param(params.as_ref(), "path")?;
        let mode_param = opt_string_param(params.as_ref(), "mode").unwrap_or_default();
        let mode = ImportMode::parse(&mode_param)
            .ok_or_else(|| {
                RpcError::invalid_params(format!(
                    "mode must be 'append' or 'clear', got '{mode_param}'"
                ))
            })?;

        let current = ctx.policy_store.load().await?;
        ctx.require_policy_editor(&current)?;

        let importer = ConventionImporter::new(ctx.clients.create()?);
        let report = importer.import(&ctx.policy_store, &ctx.root.join(&path), mode).await?;

        let mut value = serde_json::to_value(&report)
            .map_err(|e| RpcError::Internal { message: e.to_string() })?;
        if let Some(obj) = value.as_object_mut() {
            let _ = obj.insert("text".into(), Value::String(render(&report)));
        }
        Ok(value)
    }
}
