//! `query_conventions`: list the rules that apply to a request.

use std::fmt::Write as _;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use sym_access::AccessEvaluator;
use sym_core::language::normalize_language;
use sym_core::{CheckSpec, PolicyRule, Selector, Severity, UserPolicy};
use sym_validator::rule_applies;
use tracing::{debug, instrument};

use crate::context::RpcContext;
use crate::errors::RpcError;
use crate::handlers::{opt_string_param, string_list_param};
use crate::registry::MethodHandler;

/// One rule as shown to the caller.
#[derive(Clone, Debug, Serialize)]
pub struct ConventionItem {
    /// Rule id.
    pub id: String,
    /// Category name.
    pub category: String,
    /// What the rule demands.
    pub description: String,
    /// Message shown on violation.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
    /// Resolved severity.
    pub severity: Severity,
    /// Checking engine, once compiled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
}

/// Filters from the request params.
#[derive(Debug, Default)]
struct Query {
    category: Option<String>,
    files: Vec<String>,
    languages: Vec<String>,
}

impl Query {
    fn matches(&self, rule: &PolicyRule) -> bool {
        if !rule.enabled {
            return false;
        }
        if self.category.as_deref().is_some_and(|c| c != rule.category) {
            return false;
        }
        let selector_languages =
            rule.when.as_ref().map(|w| w.languages.as_slice()).unwrap_or_default();
        if !selector_languages.is_empty()
            && !self.languages.is_empty()
            && !contains_any(selector_languages, &self.languages)
        {
            return false;
        }
        self.files.is_empty() || self.files.iter().any(|f| rule_applies(rule, f))
    }
}

fn contains_any(have: &[String], want: &[String]) -> bool {
    have.iter()
        .any(|h| want.iter().any(|w| normalize_language(h) == normalize_language(w)))
}

/// Rules from a policy that has not been compiled yet.
fn uncompiled_rules(policy: &UserPolicy) -> Vec<PolicyRule> {
    let defaults = policy.defaults.clone().unwrap_or_default();
    policy
        .rules
        .iter()
        .map(|rule| {
            let pick = |own: &[String], fallback: &[String]| {
                if own.is_empty() { fallback.to_vec() } else { own.to_vec() }
            };
            let when = Selector {
                languages: pick(&rule.languages, &defaults.languages),
                include: pick(&rule.include, &defaults.include),
                exclude: pick(&rule.exclude, &defaults.exclude),
            };
            PolicyRule {
                id: rule.id.clone(),
                enabled: true,
                category: rule.category.clone(),
                severity: Severity::resolve(&[rule.severity.as_str(), defaults.severity.as_str()]),
                desc: rule.say.clone(),
                when: (!when.is_empty()).then_some(when),
                check: CheckSpec::default(),
                remedy: None,
                message: rule.message.clone(),
            }
        })
        .collect()
}

fn render(items: &[ConventionItem], access: Option<&sym_access::RoleSummary>) -> String {
    let mut out = String::new();
    if items.is_empty() {
        out.push_str("No conventions match this query.\n");
    } else {
        let _ = writeln!(out, "{} convention(s):", items.len());
        for item in items {
            let _ = writeln!(out, "\n[{}] {} ({})", item.id, item.description, item.severity);
            if !item.category.is_empty() {
                let _ = writeln!(out, "  category: {}", item.category);
            }
            if !item.message.is_empty() {
                let _ = writeln!(out, "  message: {}", item.message);
            }
        }
    }
    if let Some(access) = access {
        let _ = writeln!(out, "\nAccess for role '{}':", access.role);
        if !access.known {
            out.push_str("  role is not declared; every write is denied\n");
        } else {
            if !access.allow_write.is_empty() {
                let _ = writeln!(out, "  allowed: {}", access.allow_write.join(", "));
            }
            if !access.deny_write.is_empty() {
                let _ = writeln!(out, "  denied: {}", access.deny_write.join(", "));
            }
            let _ = writeln!(out, "  can edit policy: {}", access.can_edit_policy);
        }
    }
    out
}

/// Lists enabled rules filtered by category, files and languages, with the
/// caller's access summary.
pub struct QueryConventionsHandler;

#[async_trait]
impl MethodHandler for QueryConventionsHandler {
    #[instrument(skip_all, fields(method = "query_conventions"))]
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let query = Query {
            category: opt_string_param(params.as_ref(), "category"),
            files: string_list_param(params.as_ref(), "files")?,
            languages: string_list_param(params.as_ref(), "languages")?,
        };

        let (rules, rbac, compiled) = match ctx.load_code_policy().await? {
            Some(code) => (code.rules, code.rbac, true),
            None if ctx.policy_store.exists() => {
                let policy = ctx.policy_store.load().await?.into_policy();
                (uncompiled_rules(&policy), policy.rbac, false)
            }
            None => {
                return Ok(serde_json::json!({
                    "conventions": [],
                    "total": 0,
                    "message": "policy not loaded",
                }));
            }
        };

        let items: Vec<ConventionItem> = rules
            .iter()
            .filter(|r| query.matches(r))
            .map(|r| ConventionItem {
                id: r.id.clone(),
                category: r.category.clone(),
                description: r.desc.clone(),
                message: r.message.clone(),
                severity: r.severity,
                engine: compiled.then(|| r.engine().to_owned()),
            })
            .collect();
        debug!(total = items.len(), compiled, "conventions matched");

        let evaluator = AccessEvaluator::new(rbac);
        let access = if evaluator.is_enabled() {
            Some(evaluator.summary(&ctx.active_role()?))
        } else {
            None
        };

        Ok(serde_json::json!({
            "text": render(&items, access.as_ref()),
            "total": items.len(),
            "conventions": items,
            "access": access,
        }))
    }
}
