//! Inference routed through a session supplied by the hosting process.
//!
//! When the protocol server runs inside an assistant that can sample its
//! own model, calls go back to the host instead of a standalone backend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use tracing::{debug, instrument};

use crate::client::{InferenceClient, InferenceRequest};
use crate::errors::InferenceError;

/// Default completion cap for host sampling.
pub const DEFAULT_SESSION_MAX_TOKENS: u32 = 1000;

/// A host capable of answering a single-message sampling request.
#[async_trait]
pub trait HostSession: Send + Sync {
    /// Ask the host model to answer `prompt`.
    async fn create_message(&self, prompt: &str, max_tokens: u32) -> Result<String, InferenceError>;
}

/// [`InferenceClient`] over a [`HostSession`].
///
/// Hosts take one user message, so system and user prompts are combined.
pub struct HostSessionClient {
    session: Arc<dyn HostSession>,
    timeout: Duration,
}

impl HostSessionClient {
    /// Client over `session`, bounding each call by `timeout`.
    pub fn new(session: Arc<dyn HostSession>, timeout: Duration) -> Self {
        Self { session, timeout }
    }
}

#[async_trait]
impl InferenceClient for HostSessionClient {
    fn name(&self) -> &str {
        "host"
    }

    #[instrument(skip_all, fields(backend = "host"))]
    async fn complete(&self, request: &InferenceRequest) -> Result<String, InferenceError> {
        let prompt = request.combined_prompt();
        let max_tokens = request.max_tokens.unwrap_or(DEFAULT_SESSION_MAX_TOKENS);
        debug!(prompt_chars = prompt.len(), max_tokens, "sampling through host session");
        counter!("inference_requests_total", "backend" => "host").increment(1);

        tokio::time::timeout(self.timeout, self.session.create_message(&prompt, max_tokens))
            .await
            .map_err(|_| InferenceError::Timeout {
                secs: self.timeout.as_secs(),
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use mockall::mock;
    use mockall::predicate::{eq, function};

    mock! {
        Session {}

        #[async_trait]
        impl HostSession for Session {
            async fn create_message(
                &self,
                prompt: &str,
                max_tokens: u32,
            ) -> Result<String, InferenceError>;
        }
    }

    #[tokio::test]
    async fn combines_prompts_and_defaults_tokens() {
        let mut session = MockSession::new();
        let _ = session
            .expect_create_message()
            .with(function(|p: &str| p == "sys\n\nuser"), eq(DEFAULT_SESSION_MAX_TOKENS))
            .times(1)
            .returning(|_, _| Ok("answer".into()));

        let client = HostSessionClient::new(Arc::new(session), Duration::from_secs(5));
        let out = client
            .complete(&InferenceRequest::new("sys", "user"))
            .await
            .unwrap();
        assert_eq!(out, "answer");
        assert_eq!(client.name(), "host");
    }

    #[tokio::test]
    async fn session_errors_propagate() {
        let mut session = MockSession::new();
        let _ = session.expect_create_message().returning(|_, _| {
            Err(InferenceError::Session {
                message: "host declined".into(),
            })
        });
        let client = HostSessionClient::new(Arc::new(session), Duration::from_secs(5));
        let err = client
            .complete(&InferenceRequest::new("", "x"))
            .await
            .unwrap_err();
        assert_matches!(err, InferenceError::Session { .. });
    }

    struct Stalled;

    #[async_trait]
    impl HostSession for Stalled {
        async fn create_message(&self, _: &str, _: u32) -> Result<String, InferenceError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn slow_host_times_out() {
        tokio::time::pause();
        let client = HostSessionClient::new(Arc::new(Stalled), Duration::from_secs(2));
        let err = client
            .complete(&InferenceRequest::new("", "x"))
            .await
            .unwrap_err();
        assert_matches!(err, InferenceError::Timeout { secs: 2 });
    }
}
