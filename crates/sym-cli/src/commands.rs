//! One-shot subcommands, each a single in-process tool call.

use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use serde_json::{Value, json};
use sym_rpc::{MethodRegistry, RpcContext, RpcRequest, RpcResponse};

use crate::Command;

/// Method and params for a one-shot subcommand.
pub(crate) fn request_for(command: &Command) -> Result<(String, Option<Value>)> {
    let (method, params) = match command {
        Command::Serve { .. } => bail!("serve is not a one-shot command"),
        Command::Convert => ("convert", None),
        Command::Validate { staged, files } => {
            ("validate_code", Some(json!({"files": files, "stagedOnly": staged})))
        }
        Command::Conventions { category, languages } => (
            "query_conventions",
            Some(json!({"category": category.clone().unwrap_or_default(), "languages": languages})),
        ),
        Command::Categories => ("list_category", None),
        Command::Import { path, mode } => (
            "import_convention",
            Some(json!({"path": path.to_string_lossy(), "mode": mode})),
        ),
        Command::History { limit } => ("list_history", limit.map(|n| json!({"limit": n}))),
        Command::Call { method, params } => {
            let params = params
                .as_deref()
                .map(serde_json::from_str::<Value>)
                .transpose()
                .with_context(|| format!("params for '{method}' are not valid JSON"))?;
            return Ok((method.clone(), params));
        }
    };
    Ok((method.to_owned(), params))
}

/// Dispatch through the same registry the servers use.
pub(crate) async fn run(
    registry: &MethodRegistry,
    ctx: &RpcContext,
    method: &str,
    params: Option<Value>,
) -> RpcResponse {
    registry.dispatch(RpcRequest::new("cli", method, params), ctx).await
}

/// Whether the call succeeded and, for validation, passed.
pub(crate) fn succeeded(response: &RpcResponse) -> bool {
    response.success
        && response
            .result
            .as_ref()
            .and_then(|r| r.get("valid"))
            .is_none_or(|v| v != &Value::Bool(false))
}

/// Print the outcome and pick the exit code.
pub(crate) fn report(response: &RpcResponse) -> ExitCode {
    if let Some(err) = &response.error {
        eprintln!("error [{}]: {}", err.code, err.message);
        if let Some(details) = &err.details {
            eprintln!("{details}");
        }
    } else {
        let result = response.result.as_ref().unwrap_or(&Value::Null);
        match result.get("text").and_then(Value::as_str) {
            Some(text) => print!("{}", ensure_newline(text)),
            None => println!(
                "{}",
                serde_json::to_string_pretty(result).unwrap_or_else(|_| result.to_string())
            ),
        }
    }
    if succeeded(response) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn ensure_newline(text: &str) -> String {
    if text.ends_with('\n') {
        text.to_owned()
    } else {
        format!("{text}\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use sym_rpc::register_all;
    use sym_settings::SymSettings;

    #[test]
    fn validate_maps_to_validate_code() {
        let (method, params) = request_for(&Command::Validate {
            staged: true,
            files: vec!["src".into()],
        })
        .unwrap();
        assert_eq!(method, "validate_code");
        assert_eq!(params.unwrap(), json!({"files": ["src"], "stagedOnly": true}));
    }

    #[test]
    fn import_carries_path_and_mode() {
        let (method, params) = request_for(&Command::Import {
            path: PathBuf::from("docs/GUIDE.md"),
            mode: "clear".into(),
        })
        .unwrap();
        assert_eq!(method, "import_convention");
        assert_eq!(params.unwrap()["mode"], "clear");
    }

    #[test]
    fn call_parses_params() {
        let (method, params) = request_for(&Command::Call {
            method: "remove_rule".into(),
            params: Some(r#"{"id":"X"}"#.into()),
        })
        .unwrap();
        assert_eq!(method, "remove_rule");
        assert_eq!(params.unwrap()["id"], "X");

        assert!(request_for(&Command::Call {
            method: "x".into(),
            params: Some("{".into()),
        })
        .is_err());
    }

    #[test]
    fn history_without_limit_has_no_params() {
        let (_, params) = request_for(&Command::History { limit: None }).unwrap();
        assert!(params.is_none());
    }

    #[test]
    fn failed_validation_is_not_success() {
        assert!(succeeded(&RpcResponse::success("1", json!({"text": "ok"}))));
        assert!(succeeded(&RpcResponse::success("1", json!({"valid": true}))));
        assert!(!succeeded(&RpcResponse::success("1", json!({"valid": false}))));
        assert!(!succeeded(&RpcResponse::error("1", "NOT_FOUND", "gone")));
    }

    #[tokio::test]
    async fn categories_run_in_process() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = RpcContext::new(dir.path(), SymSettings::default());
        let mut registry = MethodRegistry::new();
        register_all(&mut registry);

        let (method, params) = request_for(&Command::Categories).unwrap();
        let response = run(&registry, &ctx, &method, params).await;
        assert!(response.success);
        assert_eq!(response.result.unwrap()["total"], 7);
    }
}
