//! Wire-format envelope.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Incoming request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Request identifier. Numeric ids are accepted and kept as text.
    #[serde(default, deserialize_with = "id_as_string")]
    pub id: String,
    /// Method or tool name.
    pub method: String,
    /// Optional parameters object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl RpcRequest {
    /// Request with params.
    pub fn new(id: impl Into<String>, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            id: id.into(),
            method: method.into(),
            params,
        }
    }
}

fn id_as_string<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(de)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Outgoing response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RpcResponse {
    /// Echoed request identifier.
    pub id: String,
    /// Whether the call succeeded.
    pub success: bool,
    /// Result payload (present when `success == true`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error payload (present when `success == false`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorBody>,
}

/// Structured error inside an [`RpcResponse`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RpcErrorBody {
    /// Machine-readable code (e.g. `NOT_FOUND`).
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Optional structured details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl RpcResponse {
    /// Success response.
    pub fn success(id: impl Into<String>, result: Value) -> Self {
        Self {
            id: id.into(),
            success: true,
            result: Some(result),
            error: None,
        }
    }

    /// Error response.
    pub fn error(
        id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::failure(
            id,
            RpcErrorBody {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        )
    }

    /// Error response from a prepared body.
    pub fn failure(id: impl Into<String>, body: RpcErrorBody) -> Self {
        Self {
            id: id.into(),
            success: false,
            result: None,
            error: Some(body),
        }
    }
}
