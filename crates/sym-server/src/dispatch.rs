//! Envelope handling shared by both transports: parse, dispatch, serialize.

use sym_rpc::errors::{INTERNAL_ERROR, PARSE_ERROR};
use sym_rpc::{MethodRegistry, RpcContext, RpcRequest, RpcResponse};
use tracing::{debug, error, instrument, warn};

/// Result of handling one message.
pub struct HandleResult {
    /// Serialized response line (no trailing newline).
    pub response_json: String,
    /// The method that was called (empty if parsing failed).
    pub method: String,
    /// Typed response.
    pub response: RpcResponse,
}

/// Serialize a response, falling back to a hand-built error envelope.
pub fn encode(response: &RpcResponse) -> String {
    serde_json::to_string(response).unwrap_or_else(|e| {
        error!(error = %e, "failed to serialize response");
        format!(
            concat!(
                r#"{{"id":{},"success":false,"error":{{"code":"{}","#,
                r#""message":"response serialization failed"}}}}"#
            ),
            serde_json::Value::String(response.id.clone()),
            INTERNAL_ERROR
        )
    })
}

/// Response for input that is not a request envelope. The id is unknown.
pub fn parse_error(detail: &impl std::fmt::Display) -> RpcResponse {
    RpcResponse::error("", PARSE_ERROR, format!("Invalid request: {detail}"))
}

/// Parse `message` as an [`RpcRequest`] and dispatch it.
pub async fn handle_message(
    message: &str,
    registry: &MethodRegistry,
    ctx: &RpcContext,
) -> HandleResult {
    let request: RpcRequest = match serde_json::from_str(message) {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "unparseable request");
            let response = parse_error(&e);
            return HandleResult {
                response_json: encode(&response),
                method: String::new(),
                response,
            };
        }
    };
    handle_request(request, registry, ctx).await
}

/// Dispatch an already-parsed request.
#[instrument(skip_all, fields(method))]
pub async fn handle_request(
    request: RpcRequest,
    registry: &MethodRegistry,
    ctx: &RpcContext,
) -> HandleResult {
    let method = request.method.clone();
    let _ = tracing::Span::current().record("method", method.as_str());
    debug!(method, id = %request.id, "dispatching");

    if !registry.has_method(&method) {
        warn!(method, "unknown method");
    }

    let response = registry.dispatch(request, ctx).await;
    HandleResult {
        response_json: encode(&response),
        method,
        response,
    }
}
