//! Method registry and async dispatch.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::{counter, histogram};
use serde_json::Value;
use tracing::{error, warn};

use crate::context::RpcContext;
use crate::errors::{self, RpcError};
use crate::types::{RpcRequest, RpcResponse};

/// Default upper bound for a single handler call. Conversions of large
/// policies are the slowest calls.
pub const DEFAULT_HANDLER_TIMEOUT: Duration = Duration::from_secs(600);

const SLOW_REQUEST: Duration = Duration::from_secs(5);

/// Trait implemented by every tool handler.
#[async_trait]
pub trait MethodHandler: Send + Sync {
    /// Execute the handler with the given params and context.
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError>;
}

/// Registry mapping method names to handlers.
pub struct MethodRegistry {
    handlers: HashMap<String, Arc<dyn MethodHandler>>,
    timeout: Duration,
}

impl MethodRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            timeout: DEFAULT_HANDLER_TIMEOUT,
        }
    }

    /// Override the per-call timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Register a handler for a method name.
    pub fn register(&mut self, method: &str, handler: impl MethodHandler + 'static) {
        let _ = self.handlers.insert(method.to_owned(), Arc::new(handler));
    }

    /// Dispatch a request to the appropriate handler.
    pub async fn dispatch(&self, request: RpcRequest, ctx: &RpcContext) -> RpcResponse {
        let method = request.method.clone();
        counter!("rpc_requests_total", "method" => method.clone()).increment(1);

        let Some(handler) = self.handlers.get(&method) else {
            counter!(
                "rpc_errors_total",
                "method" => method.clone(),
                "error_type" => "method_not_found"
            )
            .increment(1);
            return RpcResponse::error(
                request.id,
                errors::METHOD_NOT_FOUND,
                format!("Method '{method}' not found"),
            );
        };

        let start = Instant::now();
        let result = tokio::time::timeout(self.timeout, handler.handle(request.params, ctx)).await;

        let response = match result {
            Ok(Ok(result)) => RpcResponse::success(request.id, result),
            Ok(Err(err)) => {
                counter!(
                    "rpc_errors_total",
                    "method" => method.clone(),
                    "error_type" => err.code().to_owned()
                )
                .increment(1);
                RpcResponse::failure(request.id, err.to_error_body())
            }
            Err(_elapsed) => {
                counter!("rpc_errors_total", "method" => method.clone(), "error_type" => "timeout")
                    .increment(1);
                error!(method, timeout = ?self.timeout, "handler timed out");
                RpcResponse::error(
                    request.id,
                    errors::INTERNAL_ERROR,
                    format!("Handler for '{method}' timed out"),
                )
            }
        };

        let duration = start.elapsed();
        histogram!("rpc_request_duration_seconds", "method" => method.clone())
            .record(duration.as_secs_f64());
        if duration >= SLOW_REQUEST {
            warn!(method, duration_secs = duration.as_secs_f64(), "slow RPC request");
        }

        response
    }

    /// List all registered method names (sorted).
    pub fn methods(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check whether a method is registered.
    pub fn has_method(&self, method: &str) -> bool {
        self.handlers.contains_key(method)
    }
}

impl Default for MethodRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_helpers::make_test_context;
    use serde_json::json;

    struct EchoHandler;

    #[async_trait]
    impl MethodHandler for EchoHandler {
        async fn handle(
            &self,
            params: Option<Value>,
            _ctx: &RpcContext,
        ) -> Result<Value, RpcError> {
            Ok(params.unwrap_or(json!(null)))
        }
    }

    struct FailHandler;

    #[async_trait]
    impl MethodHandler for FailHandler {
        async fn handle(
            &self,
            _params: Option<Value>,
            _ctx: &RpcContext,
        ) -> Result<Value, RpcError> {
            Err(RpcError::Custom {
                code: errors::PERMISSION_DENIED.into(),
                message: "nope".into(),
                details: Some(json!({"role": "viewer"})),
            })
        }
    }

    struct SleepyHandler;

    #[async_trait]
    impl MethodHandler for SleepyHandler {
        async fn handle(
            &self,
            _params: Option<Value>,
            _ctx: &RpcContext,
        ) -> Result<Value, RpcError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(json!({}))
        }
    }

    #[tokio::test]
    async fn register_and_dispatch_success() {
        let (_dir, ctx) = make_test_context();
        let mut reg = MethodRegistry::new();
        reg.register("echo", EchoHandler);

        let resp = reg
            .dispatch(RpcRequest::new("r1", "echo", Some(json!({"x": 1}))), &ctx)
            .await;

        assert!(resp.success);
        assert_eq!(resp.id, "r1");
        assert_eq!(resp.result.unwrap()["x"], 1);
    }

    #[tokio::test]
    async fn dispatch_method_not_found() {
        let (_dir, ctx) = make_test_context();
        let reg = MethodRegistry::new();

        let resp = reg.dispatch(RpcRequest::new("r2", "no.such", None), &ctx).await;

        assert!(!resp.success);
        let err = resp.error.unwrap();
        assert_eq!(err.code, "METHOD_NOT_FOUND");
        assert!(err.message.contains("no.such"));
    }

    #[tokio::test]
    async fn dispatch_handler_error_keeps_details() {
        let (_dir, ctx) = make_test_context();
        let mut reg = MethodRegistry::new();
        reg.register("fail", FailHandler);

        let resp = reg.dispatch(RpcRequest::new("r3", "fail", None), &ctx).await;

        assert!(!resp.success);
        let err = resp.error.unwrap();
        assert_eq!(err.code, "PERMISSION_DENIED");
        assert_eq!(err.details.unwrap()["role"], "viewer");
    }

    #[tokio::test(start_paused = true)]
    async fn dispatch_times_out() {
        let (_dir, ctx) = make_test_context();
        let mut reg = MethodRegistry::new().with_timeout(Duration::from_secs(1));
        reg.register("sleepy", SleepyHandler);

        let resp = reg.dispatch(RpcRequest::new("r4", "sleepy", None), &ctx).await;

        let err = resp.error.unwrap();
        assert_eq!(err.code, "INTERNAL_ERROR");
        assert!(err.message.contains("timed out"));
    }

    #[test]
    fn list_methods_sorted() {
        let mut reg = MethodRegistry::new();
        reg.register("b.method", EchoHandler);
        reg.register("a.method", EchoHandler);

        assert_eq!(reg.methods(), vec!["a.method", "b.method"]);
        assert!(reg.has_method("a.method"));
        assert!(!reg.has_method("c.method"));
    }
}
