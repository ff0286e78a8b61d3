//! Tool handlers and registration.

pub mod category;
pub mod conventions;
pub mod convert;
pub mod import;
pub mod rule;
pub mod system;
pub mod validate;

use serde::de::DeserializeOwned;
use serde_json::Value;
use sym_policy::{BatchReport, PolicyDocument};
use tracing::debug;

use crate::context::RpcContext;
use crate::errors::RpcError;
use crate::registry::MethodRegistry;

/// Register every tool with the registry.
pub fn register_all(registry: &mut MethodRegistry) {
    // Conventions
    registry.register("query_conventions", conventions::QueryConventionsHandler);

    // Validation
    registry.register("validate_code", validate::ValidateCodeHandler);
    registry.register("list_history", validate::ListHistoryHandler);
    registry.register("convert", convert::ConvertHandler);

    // Categories
    registry.register("list_category", category::ListCategoryHandler);
    registry.register("add_category", category::AddCategoryHandler);
    registry.register("edit_category", category::EditCategoryHandler);
    registry.register("remove_category", category::RemoveCategoryHandler);

    // Rules
    registry.register("add_rule", rule::AddRuleHandler);
    registry.register("edit_rule", rule::EditRuleHandler);
    registry.register("remove_rule", rule::RemoveRuleHandler);

    // Import
    registry.register("import_convention", import::ImportConventionHandler);

    // System
    registry.register("system.ping", system::PingHandler);
    let mut methods = registry.methods();
    methods.push("system.methods".into());
    methods.sort();
    registry.register("system.methods", system::MethodsHandler { methods });
}

/// Extract a required parameter from the params object.
pub(crate) fn require_param<'a>(
    params: Option<&'a Value>,
    key: &str,
) -> Result<&'a Value, RpcError> {
    params
        .and_then(|p| p.get(key))
        .ok_or_else(|| RpcError::invalid_params(format!("Missing required parameter: {key}")))
}

/// Extract a required string parameter.
pub(crate) fn require_string_param(params: Option<&Value>, key: &str) -> Result<String, RpcError> {
    require_param(params, key)?
        .as_str()
        .map(ToOwned::to_owned)
        .ok_or_else(|| RpcError::invalid_params(format!("Parameter '{key}' must be a string")))
}

/// Optional string parameter. Empty strings count as absent.
pub(crate) fn opt_string_param(params: Option<&Value>, key: &str) -> Option<String> {
    params
        .and_then(|p| p.get(key))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
}

/// Optional boolean parameter.
pub(crate) fn opt_bool_param(params: Option<&Value>, key: &str) -> bool {
    params.and_then(|p| p.get(key)).and_then(Value::as_bool).unwrap_or(false)
}

/// String list parameter. A bare string is a one-element list.
pub(crate) fn string_list_param(
    params: Option<&Value>,
    key: &str,
) -> Result<Vec<String>, RpcError> {
    match params.and_then(|p| p.get(key)) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(s)) => Ok(vec![s.clone()]),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| {
                v.as_str()
                    .map(ToOwned::to_owned)
                    .ok_or_else(|| {
                        RpcError::invalid_params(format!(
                            "Parameter '{key}' must be a list of strings"
                        ))
                    })
            })
            .collect(),
        Some(_) => Err(RpcError::invalid_params(format!(
            "Parameter '{key}' must be a list of strings"
        ))),
    }
}

/// Items of a batch call.
///
/// `{ "<plural>": [item, ...] }` is the batch form. Anything else is read as a
/// single item.
pub(crate) fn batch_items<T: DeserializeOwned>(
    params: Option<&Value>,
    plural: &str,
) -> Result<Vec<T>, RpcError> {
    let params = params.ok_or_else(|| RpcError::invalid_params("params required"))?;
    let decode = |v: &Value| {
        serde_json::from_value::<T>(v.clone())
            .map_err(|e| RpcError::invalid_params(format!("invalid {plural} item: {e}")))
    };
    match params.get(plural) {
        Some(Value::Array(items)) if items.is_empty() => {
            Err(RpcError::invalid_params(format!("Parameter '{plural}' must not be empty")))
        }
        Some(Value::Array(items)) => items.iter().map(decode).collect(),
        Some(_) => Err(RpcError::invalid_params(format!("Parameter '{plural}' must be an array"))),
        None => Ok(vec![decode(params)?]),
    }
}

/// Apply a batch edit to the stored policy as the active role.
///
/// Per-item failures are reported in the result; only a permission, I/O or
/// validation failure fails the call.
pub(crate) async fn apply_batch<F>(
    ctx: &RpcContext,
    verb: &'static str,
    edit: F,
) -> Result<Value, RpcError>
where
    F: FnOnce(&mut PolicyDocument) -> BatchReport + Send + 'static,
{
    let current = ctx.policy_store.load().await?;
    ctx.require_policy_editor(&current)?;

    let committed = ctx.policy_store.update(edit).await?;
    let report = committed.outcome;
    debug!(
        verb,
        succeeded = report.succeeded.len(),
        failed = report.failed.len(),
        saved = committed.saved,
        "batch applied"
    );
    Ok(serde_json::json!({
        "text": report.render(verb),
        "saved": committed.saved,
        "succeeded": report.succeeded,
        "failed": report.failed,
    }))
}

/// Names for a batch removal: `{ "<plural>": [..] }` or `{ "<single>": ".." }`.
pub(crate) fn batch_names(
    params: Option<&Value>,
    plural: &str,
    single: &str,
) -> Result<Vec<String>, RpcError> {
    let names = string_list_param(params, plural)?;
    if !names.is_empty() {
        return Ok(names);
    }
    Ok(vec![require_string_param(params, single)?])
}

#[cfg(test)]
pub(crate) mod test_helpers {
    use std::sync::Arc;

    use sym_access::FixedRole;
    use sym_core::{CategoryDef, UserPolicy, UserRbac, UserRole, UserRule};
    use sym_llm::{ClientFactory, MockInferenceClient};
    use sym_settings::SymSettings;
    use sym_validator::StaticChanges;

    use crate::context::RpcContext;

    /// Context rooted in a temp dir, running as `admin` with an empty change set
    /// and a mock client that answers nothing.
    pub fn make_test_context() -> (tempfile::TempDir, RpcContext) {
        make_test_context_with(MockInferenceClient::new())
    }

    /// Like [`make_test_context`] with a scripted client.
    pub fn make_test_context_with(client: MockInferenceClient) -> (tempfile::TempDir, RpcContext) {
        let dir = tempfile::tempdir().unwrap();
        let settings = SymSettings::default();
        let clients = ClientFactory::new(settings.llm.clone()).with_client(Arc::new(client));
        let ctx = RpcContext::new(dir.path(), settings)
            .with_clients(clients)
            .with_role_source(Arc::new(FixedRole("admin".into())))
            .with_change_source(Arc::new(StaticChanges::default()));
        (dir, ctx)
    }

    /// Roles `admin` (edits policy), `developer` (src only, no secrets) and
    /// `viewer` (writes nothing); rules `SEC-001` (javascript) and `STY-001` (python).
    pub fn sample_policy() -> UserPolicy {
        let role = |allow: &[&str], deny: &[&str], edit: bool| UserRole {
            allow_write: allow.iter().map(|s| (*s).to_owned()).collect(),
            deny_write: deny.iter().map(|s| (*s).to_owned()).collect(),
            can_edit_policy: edit,
            ..UserRole::default()
        };
        UserPolicy {
            version: "1.0.0".into(),
            categories: vec![
                CategoryDef {
                    name: "security".into(),
                    description: "Security rules".into(),
                },
                CategoryDef {
                    name: "style".into(),
                    description: "Style rules".into(),
                },
            ],
            rbac: Some(UserRbac {
                roles: [
                    ("admin".to_owned(), role(&["**"], &[], true)),
                    ("developer".to_owned(), role(&["src/**"], &["src/secrets/**"], false)),
                    ("viewer".to_owned(), role(&[], &["**/*"], false)),
                ]
                .into(),
            }),
            defaults: None,
            rules: vec![
                UserRule {
                    id: "SEC-001".into(),
                    say: "No hardcoded secrets".into(),
                    category: "security".into(),
                    languages: vec!["javascript".into()],
                    severity: "error".into(),
                    ..UserRule::default()
                },
                UserRule {
                    id: "STY-001".into(),
                    say: "Use snake_case names".into(),
                    category: "style".into(),
                    languages: vec!["python".into()],
                    severity: "warning".into(),
                    include: vec!["src/**".into()],
                    ..UserRule::default()
                },
            ],
        }
    }

    /// Write [`sample_policy`] to the context's policy file.
    pub async fn seed_policy(ctx: &RpcContext) {
        ctx.policy_store.save(sample_policy()).await.unwrap();
    }
}
