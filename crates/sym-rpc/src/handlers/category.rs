//! Category handlers: list, add, edit, remove.

use std::fmt::Write as _;

use async_trait::async_trait;
use serde_json::Value;
use sym_core::CategoryDef;
use sym_policy::CategoryEdit;
use tracing::instrument;

use crate::context::RpcContext;
use crate::errors::RpcError;
use crate::handlers::{apply_batch, batch_items, batch_names};
use crate::registry::MethodHandler;

/// Lists categories with their rule counts.
pub struct ListCategoryHandler;

#[async_trait]
impl MethodHandler for ListCategoryHandler {
    #[instrument(skip_all, fields(method = "list_category"))]
    async fn handle(&self, _params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let doc = ctx.policy_store.load().await?;
        let categories: Vec<Value> = doc
            .policy()
            .categories
            .iter()
            .map(|c| {
                serde_json::json!({
                    "name": c.name,
                    "description": c.description,
                    "rules": doc.rules_in(&c.name),
                })
            })
            .collect();

        let mut text = format!("{} categories:\n", categories.len());
        for c in &doc.policy().categories {
            let count = doc.rules_in(&c.name);
            let _ = writeln!(text, "  - {}: {} ({count} rules)", c.name, c.description);
        }

        Ok(serde_json::json!({
            "text": text,
            "total": categories.len(),
            "categories": categories,
        }))
    }
}

/// Adds one category or a `categories` batch.
pub struct AddCategoryHandler;

#[async_trait]
impl MethodHandler for AddCategoryHandler {
    #[instrument(skip_all, fields(method = "add_category"))]
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let defs: Vec<CategoryDef> = batch_items(params.as_ref(), "categories")?;
        apply_batch(ctx, "Added", move |doc| doc.add_categories(defs)).await
    }
}

/// Edits (renames or re-describes) one category or an `edits` batch.
pub struct EditCategoryHandler;

#[async_trait]
impl MethodHandler for EditCategoryHandler {
    #[instrument(skip_all, fields(method = "edit_category"))]
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let edits: Vec<CategoryEdit> = batch_items(params.as_ref(), "edits")?;
        apply_batch(ctx, "Updated", move |doc| doc.edit_categories(edits)).await
    }
}

/// Removes one category (`name`) or several (`names`). Categories still
/// referenced by rules are refused.
pub struct RemoveCategoryHandler;

#[async_trait]
impl MethodHandler for RemoveCategoryHandler {
    #[instrument(skip_all, fields(method = "remove_category"))]
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let names = batch_names(params.as_ref(), "names", "name")?;
        apply_batch(ctx, "Removed", move |doc| doc.remove_categories(&names)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_helpers::{make_test_context, seed_policy};
    use serde_json::json;
    use std::sync::Arc;
    use sym_access::FixedRole;

    #[tokio::test]
    async fn list_on_fresh_policy_shows_defaults() {
        let (_dir, ctx) = make_test_context();
        let result = ListCategoryHandler.handle(None, &ctx).await.unwrap();
        assert_eq!(result["total"], 7);
        assert!(result["text"].as_str().unwrap().contains("security"));
    }

    #[tokio::test]
    async fn list_counts_rules() {
        let (_dir, ctx) = make_test_context();
        seed_policy(&ctx).await;
        let result = ListCategoryHandler.handle(None, &ctx).await.unwrap();
        assert_eq!(result["categories"][0]["name"], "security");
        assert_eq!(result["categories"][0]["rules"], 1);
    }

    #[tokio::test]
    async fn add_batch_reports_each_item() {
        let (_dir, ctx) = make_test_context();
        seed_policy(&ctx).await;
        let result = AddCategoryHandler
            .handle(
                Some(json!({"categories": [
                    {"name": "naming", "description": "Naming rules"},
                    {"name": "security", "description": "dup"},
                    {"name": "docs"},
                ]})),
                &ctx,
            )
            .await
            .unwrap();
        assert_eq!(result["succeeded"], json!(["naming"]));
        assert_eq!(result["failed"][0]["item"], "security");
        assert_eq!(result["failed"][1]["error"], "description is required");
        assert_eq!(result["saved"], true);
        assert!(ctx.policy_store.load().await.unwrap().has_category("naming"));
    }

    #[tokio::test]
    async fn rename_cascades_to_rules() {
        let (_dir, ctx) = make_test_context();
        seed_policy(&ctx).await;
        let result = EditCategoryHandler
            .handle(Some(json!({"name": "security", "newName": "safety"})), &ctx)
            .await
            .unwrap();
        assert_eq!(result["succeeded"][0], "security → safety (1 rules updated)");

        let doc = ctx.policy_store.load().await.unwrap();
        assert!(!doc.has_category("security"));
        assert_eq!(doc.rule("SEC-001").unwrap().category, "safety");
    }

    #[tokio::test]
    async fn remove_in_use_category_is_refused() {
        let (_dir, ctx) = make_test_context();
        seed_policy(&ctx).await;
        let result = RemoveCategoryHandler
            .handle(Some(json!({"name": "security"})), &ctx)
            .await
            .unwrap();
        assert_eq!(result["saved"], false);
        assert!(result["failed"][0]["error"].as_str().unwrap().contains("used by 1 rule"));
        assert!(result["text"].as_str().unwrap().starts_with("Failed 1 item(s)"));
    }

    #[tokio::test]
    async fn remove_batch_of_unused_categories() {
        let (_dir, ctx) = make_test_context();
        let result = RemoveCategoryHandler
            .handle(Some(json!({"names": ["performance", "testing", "ghost"]})), &ctx)
            .await
            .unwrap();
        assert_eq!(result["succeeded"], json!(["performance", "testing"]));
        assert_eq!(result["failed"][0]["item"], "ghost");
        assert_eq!(ctx.policy_store.load().await.unwrap().policy().categories.len(), 5);
    }

    #[tokio::test]
    async fn non_editor_role_is_denied() {
        let (_dir, ctx) = make_test_context();
        seed_policy(&ctx).await;
        let ctx = ctx.with_role_source(Arc::new(FixedRole("viewer".into())));
        let err = AddCategoryHandler
            .handle(Some(json!({"name": "naming", "description": "d"})), &ctx)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "PERMISSION_DENIED");
        assert!(!ctx.policy_store.load().await.unwrap().has_category("naming"));
    }
}
