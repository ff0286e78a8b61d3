//! Scripted inference client for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::client::{InferenceClient, InferenceRequest};
use crate::errors::InferenceError;

#[derive(Clone, Debug)]
enum Reply {
    Text(String),
    Fail,
}

#[derive(Clone, Debug)]
struct Script {
    needle: String,
    reply: Reply,
    delay: Duration,
}

/// Inference client answering from a script.
///
/// Each entry matches when the request's user prompt contains its needle;
/// the first matching entry wins. Unmatched requests fall back to the
/// default response, or fail with a parse error when there is none.
#[derive(Debug, Default)]
pub struct MockInferenceClient {
    scripts: Vec<Script>,
    fallback: Option<String>,
    calls: AtomicUsize,
    requests: Mutex<Vec<InferenceRequest>>,
}

impl MockInferenceClient {
    /// Client with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer prompts containing `needle` with `response`.
    #[must_use]
    pub fn respond_to(self, needle: impl Into<String>, response: impl Into<String>) -> Self {
        self.respond_after(needle, response, Duration::ZERO)
    }

    /// Answer prompts containing `needle` with `response` after `delay`.
    #[must_use]
    pub fn respond_after(
        mut self,
        needle: impl Into<String>,
        response: impl Into<String>,
        delay: Duration,
    ) -> Self {
        self.scripts.push(Script {
            needle: needle.into(),
            reply: Reply::Text(response.into()),
            delay,
        });
        self
    }

    /// Fail prompts containing `needle` with a server error.
    #[must_use]
    pub fn fail_on(mut self, needle: impl Into<String>) -> Self {
        self.scripts.push(Script {
            needle: needle.into(),
            reply: Reply::Fail,
            delay: Duration::ZERO,
        });
        self
    }

    /// Answer every unmatched prompt with `response`.
    #[must_use]
    pub fn with_default(mut self, response: impl Into<String>) -> Self {
        self.fallback = Some(response.into());
        self
    }

    /// Completions requested so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Requests received, in arrival order.
    pub fn requests(&self) -> Vec<InferenceRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl InferenceClient for MockInferenceClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &InferenceRequest) -> Result<String, InferenceError> {
        let _ = self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());

        let script = self
            .scripts
            .iter()
            .find(|s| request.user.contains(&s.needle))
            .cloned();

        match script {
            Some(script) => {
                if !script.delay.is_zero() {
                    tokio::time::sleep(script.delay).await;
                }
                match script.reply {
                    Reply::Text(text) => Ok(text),
                    Reply::Fail => Err(InferenceError::Api {
                        status: 500,
                        message: format!("scripted failure for '{}'", script.needle),
                        retryable: false,
                    }),
                }
            }
            None => self
                .fallback
                .clone()
                .ok_or_else(|| InferenceError::parse("no scripted response")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn first_match_wins() {
        let client = MockInferenceClient::new()
            .respond_to("alpha", "one")
            .respond_to("alpha beta", "two");
        let out = client
            .complete(&InferenceRequest::new("", "alpha beta"))
            .await
            .unwrap();
        assert_eq!(out, "one");
    }

    #[tokio::test]
    async fn fallback_and_missing() {
        let bare = MockInferenceClient::new();
        assert_matches!(
            bare.complete(&InferenceRequest::new("", "x")).await,
            Err(InferenceError::Parse { .. })
        );
        let with_default = MockInferenceClient::new().with_default("{}");
        assert_eq!(with_default.complete(&InferenceRequest::new("", "x")).await.unwrap(), "{}");
    }

    #[tokio::test]
    async fn records_calls() {
        let client = MockInferenceClient::new().fail_on("bad");
        let _ = client.complete(&InferenceRequest::new("s", "bad input")).await;
        assert_eq!(client.call_count(), 1);
        assert_eq!(client.requests()[0].system, "s");
    }

    #[tokio::test]
    async fn delays_respect_paused_clock() {
        tokio::time::pause();
        let client =
            MockInferenceClient::new().respond_after("slow", "done", Duration::from_secs(60));
        let started = tokio::time::Instant::now();
        let out = client.complete(&InferenceRequest::new("", "slow")).await.unwrap();
        assert_eq!(out, "done");
        assert!(started.elapsed() >= Duration::from_secs(60));
    }
}
