//! Rule handlers: add, edit, remove.

use async_trait::async_trait;
use serde_json::Value;
use sym_core::UserRule;
use sym_policy::RuleEdit;
use tracing::instrument;

use crate::context::RpcContext;
use crate::errors::RpcError;
use crate::handlers::{apply_batch, batch_items, batch_names};
use crate::registry::MethodHandler;

/// Adds one rule or a `rules` batch. Each rule's category must exist.
pub struct AddRuleHandler;

#[async_trait]
impl MethodHandler for AddRuleHandler {
    #[instrument(skip_all, fields(method = "add_rule"))]
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let rules: Vec<UserRule> = batch_items(params.as_ref(), "rules")?;
        apply_batch(ctx, "Added", move |doc| doc.add_rules(rules)).await
    }
}

/// Applies one partial rule update or an `edits` batch.
pub struct EditRuleHandler;

#[async_trait]
impl MethodHandler for EditRuleHandler {
    #[instrument(skip_all, fields(method = "edit_rule"))]
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let edits: Vec<RuleEdit> = batch_items(params.as_ref(), "edits")?;
        apply_batch(ctx, "Updated", move |doc| doc.edit_rules(edits)).await
    }
}

/// Removes one rule (`id`) or several (`ids`).
pub struct RemoveRuleHandler;

#[async_trait]
impl MethodHandler for RemoveRuleHandler {
    #[instrument(skip_all, fields(method = "remove_rule"))]
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let ids = batch_names(params.as_ref(), "ids", "id")?;
        apply_batch(ctx, "Removed", move |doc| doc.remove_rules(&ids)).await
    }
}
