//! Host sampling over the stdio channel.
//!
//! The server writes a `sampling/createMessage` request to stdout and the
//! host answers on stdin with a response carrying the same id. The stdio
//! reader routes those answers here through [`StdioHostSession::resolve`].

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use metrics::counter;
use parking_lot::Mutex;
use serde_json::{Value, json};
use sym_llm::{HostSession, InferenceError};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// Method name of the host sampling request.
pub const SAMPLING_METHOD: &str = "sampling/createMessage";

/// Prefix of ids the server assigns to its own requests.
const ID_PREFIX: &str = "sampling-";

type Pending = HashMap<String, oneshot::Sender<Result<Value, String>>>;

/// [`HostSession`] that asks the host on the other end of stdio.
pub struct StdioHostSession {
    outgoing: mpsc::Sender<String>,
    pending: Mutex<Pending>,
    next_id: AtomicU64,
}

impl StdioHostSession {
    /// Session writing requests into `outgoing`.
    pub fn new(outgoing: mpsc::Sender<String>) -> Arc<Self> {
        Arc::new(Self {
            outgoing,
            pending: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        })
    }

    /// Deliver a host response. Returns `false` if `message` is not an
    /// answer to one of our requests.
    pub fn resolve(&self, message: &Value) -> bool {
        let Some(id) = message.get("id").and_then(Value::as_str) else {
            return false;
        };
        if !id.starts_with(ID_PREFIX) || message.get("method").is_some() {
            return false;
        }
        let Some(tx) = self.pending.lock().remove(id) else {
            warn!(id, "host answered an unknown sampling request");
            return true;
        };
        let outcome = match message.get("error") {
            Some(err) if !err.is_null() => Err(error_text(err)),
            _ => Ok(message.get("result").cloned().unwrap_or(Value::Null)),
        };
        let _ = tx.send(outcome);
        true
    }

    /// Fail every outstanding request (the host went away).
    pub fn cancel_all(&self) {
        let drained: Vec<_> = self.pending.lock().drain().collect();
        if !drained.is_empty() {
            debug!(count = drained.len(), "dropping pending sampling requests");
        }
    }

    /// Number of requests awaiting an answer.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

fn error_text(err: &Value) -> String {
    err.get("message")
        .and_then(Value::as_str)
        .map_or_else(|| err.to_string(), ToOwned::to_owned)
}

/// Pull the text out of a sampling result: `{content: {type: "text", text}}`
/// or a list of such content blocks.
fn result_text(result: &Value) -> Option<String> {
    let content = result.get("content")?;
    let blocks = match content {
        Value::Array(items) => items.iter().collect::<Vec<_>>(),
        other => vec![other],
    };
    let text: String = blocks
        .into_iter()
        .filter(|b| b.get("type").and_then(Value::as_str).unwrap_or("text") == "text")
        .filter_map(|b| b.get("text").and_then(Value::as_str))
        .collect();
    (!text.is_empty()).then_some(text)
}

#[async_trait]
impl HostSession for StdioHostSession {
    async fn create_message(
        &self,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<String, InferenceError> {
        let session_err = |message: String| InferenceError::Session { message };
        let id = format!("{ID_PREFIX}{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        let request = json!({
            "id": id,
            "method": SAMPLING_METHOD,
            "params": {
                "messages": [{"role": "user", "content": {"type": "text", "text": prompt}}],
                "maxTokens": max_tokens,
            },
        });

        let (tx, rx) = oneshot::channel();
        let _ = self.pending.lock().insert(id.clone(), tx);
        counter!("host_sampling_requests_total").increment(1);

        if self.outgoing.send(request.to_string()).await.is_err() {
            let _ = self.pending.lock().remove(&id);
            return Err(session_err("stdio channel closed".into()));
        }

        let outcome =
            rx.await.map_err(|_| session_err("host disconnected before answering".into()))?;
        let result = outcome.map_err(|m| session_err(format!("host rejected sampling: {m}")))?;
        result_text(&result).ok_or_else(|| session_err("sampling result carried no text".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    async fn sent(rx: &mut mpsc::Receiver<String>) -> Value {
        serde_json::from_str(&rx.recv().await.unwrap()).unwrap()
    }

    #[tokio::test]
    async fn round_trip_through_host() {
        let (tx, mut rx) = mpsc::channel(4);
        let session = StdioHostSession::new(tx);

        let call = tokio::spawn({
            let session = Arc::clone(&session);
            async move { session.create_message("hello", 50).await }
        });

        let request = sent(&mut rx).await;
        assert_eq!(request["method"], SAMPLING_METHOD);
        assert_eq!(request["params"]["maxTokens"], 50);
        assert_eq!(request["params"]["messages"][0]["content"]["text"], "hello");

        let answer = json!({
            "id": request["id"],
            "result": {"role": "assistant", "content": {"type": "text", "text": "hi"}}
        });
        assert!(session.resolve(&answer));
        assert_eq!(call.await.unwrap().unwrap(), "hi");
        assert_eq!(session.pending_count(), 0);
    }

    #[tokio::test]
    async fn host_error_is_session_error() {
        let (tx, mut rx) = mpsc::channel(4);
        let session = StdioHostSession::new(tx);
        let call = tokio::spawn({
            let session = Arc::clone(&session);
            async move { session.create_message("x", 10).await }
        });
        let request = sent(&mut rx).await;
        let declined = json!({"id": request["id"], "error": {"code": -1, "message": "declined"}});
        assert!(session.resolve(&declined));
        let err = call.await.unwrap().unwrap_err();
        assert_matches!(
            err,
            InferenceError::Session { ref message } if message.contains("declined")
        );
    }

    #[tokio::test]
    async fn cancel_all_fails_waiters() {
        let (tx, mut rx) = mpsc::channel(4);
        let session = StdioHostSession::new(tx);
        let call = tokio::spawn({
            let session = Arc::clone(&session);
            async move { session.create_message("x", 10).await }
        });
        let _ = sent(&mut rx).await;
        session.cancel_all();
        assert_matches!(call.await.unwrap(), Err(InferenceError::Session { .. }));
    }

    #[tokio::test]
    async fn closed_channel_fails_fast() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let session = StdioHostSession::new(tx);
        assert_matches!(session.create_message("x", 10).await, Err(InferenceError::Session { .. }));
        assert_eq!(session.pending_count(), 0);
    }

    #[test]
    fn resolve_ignores_requests_and_foreign_ids() {
        let (tx, _rx) = mpsc::channel(1);
        let session = StdioHostSession::new(tx);
        assert!(!session.resolve(&json!({"id": "1", "result": {}})));
        assert!(!session.resolve(&json!({"id": "sampling-1", "method": "x"})));
        assert!(session.resolve(&json!({"id": "sampling-99", "result": {}})));
    }

    #[test]
    fn text_from_block_list() {
        let result = json!({"content": [
            {"type": "text", "text": "a"},
            {"type": "image"},
            {"type": "text", "text": "b"}
        ]});
        assert_eq!(result_text(&result).unwrap(), "ab");
        assert!(result_text(&json!({})).is_none());
    }
}
