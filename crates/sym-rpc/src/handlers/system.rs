//! System handlers: ping, methods.

use async_trait::async_trait;
use serde_json::Value;
use tracing::instrument;

use crate::context::RpcContext;
use crate::errors::RpcError;
use crate::registry::MethodHandler;

/// Returns a pong with the current server timestamp and uptime.
pub struct PingHandler;

#[async_trait]
impl MethodHandler for PingHandler {
    #[instrument(skip(self, ctx), fields(method = "system.ping"))]
    async fn handle(&self, _params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        Ok(serde_json::json!({
            "pong": true,
            "timestamp": chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            "version": env!("CARGO_PKG_VERSION"),
            "uptimeSecs": ctx.server_start_time.elapsed().as_secs(),
        }))
    }
}

/// Lists the registered tool names.
pub struct MethodsHandler {
    /// Sorted method names, captured at registration.
    pub methods: Vec<String>,
}

#[async_trait]
impl MethodHandler for MethodsHandler {
    #[instrument(skip_all, fields(method = "system.methods"))]
    async fn handle(&self, _params: Option<Value>, _ctx: &RpcContext) -> Result<Value, RpcError> {
        Ok(serde_json::json!({ "methods": self.methods }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::register_all;
    use crate::handlers::test_helpers::make_test_context;
    use crate::registry::MethodRegistry;
    use crate::types::RpcRequest;

    #[tokio::test]
    async fn ping_returns_pong() {
        let (_dir, ctx) = make_test_context();
        let result = PingHandler.handle(None, &ctx).await.unwrap();
        assert_eq!(result["pong"], true);
        assert!(result["timestamp"].is_string());
        assert!(result["version"].is_string());
    }

    #[tokio::test]
    async fn methods_lists_everything_including_itself() {
        let (_dir, ctx) = make_test_context();
        let mut reg = MethodRegistry::new();
        register_all(&mut reg);

        let resp = reg.dispatch(RpcRequest::new("1", "system.methods", None), &ctx).await;
        let methods = resp.result.unwrap()["methods"].clone();
        let names: Vec<String> = serde_json::from_value(methods).unwrap();
        assert_eq!(names, reg.methods());
        assert!(names.contains(&"system.methods".to_owned()));
    }
}
