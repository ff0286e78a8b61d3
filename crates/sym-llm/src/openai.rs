//! Standalone backend for OpenAI-compatible chat completions.
//!
//! `POST {base_url}/chat/completions` with Bearer auth. Only the first
//! choice's message content is used.

use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::{Value, json};
use sym_settings::LlmSettings;
use tracing::{debug, error, instrument};

use crate::client::{InferenceClient, InferenceRequest};
use crate::errors::InferenceError;

/// Connection settings for [`OpenAiClient`].
#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    /// API base URL without trailing slash.
    pub base_url: String,
    /// Model id.
    pub model: String,
    /// Bearer token.
    pub api_key: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Default completion token cap.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
}

impl OpenAiConfig {
    /// Config from settings, reading the key from the variable `settings.api_key_env`
    /// through `lookup`.
    pub fn from_settings<F>(settings: &LlmSettings, lookup: F) -> Result<Self, InferenceError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(&settings.api_key_env)
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| InferenceError::NotConfigured {
                message: format!("{} is not set", settings.api_key_env),
            })?;
        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_owned(),
            model: settings.model.clone(),
            api_key,
            timeout: Duration::from_secs(settings.timeout_secs),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
        })
    }
}

/// OpenAI-compatible inference client.
pub struct OpenAiClient {
    config: OpenAiConfig,
    client: reqwest::Client,
}

impl OpenAiClient {
    /// Create a client with its own connection pool.
    pub fn new(config: OpenAiConfig) -> Result<Self, InferenceError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    /// Model id in use.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn build_headers(&self) -> Result<HeaderMap, InferenceError> {
        let mut headers = HeaderMap::new();
        let _ = headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let auth_value = format!("Bearer {}", self.config.api_key);
        let _ = headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth_value).map_err(|e| InferenceError::NotConfigured {
                message: format!("invalid API key header: {e}"),
            })?,
        );
        Ok(headers)
    }

    fn build_body(&self, request: &InferenceRequest) -> Value {
        let mut messages = Vec::with_capacity(2);
        if !request.system.is_empty() {
            messages.push(json!({"role": "system", "content": request.system}));
        }
        messages.push(json!({"role": "user", "content": request.user}));

        let mut body = json!({
            "model": self.config.model,
            "messages": messages,
            "max_tokens": request.max_tokens.unwrap_or(self.config.max_tokens),
            "temperature": self.config.temperature,
        });
        if request.json {
            body["response_format"] = json!({"type": "json_object"});
        }
        body
    }
}

#[async_trait]
impl InferenceClient for OpenAiClient {
    fn name(&self) -> &str {
        "openai"
    }

    #[instrument(skip_all, fields(backend = "openai", model = %self.config.model))]
    async fn complete(&self, request: &InferenceRequest) -> Result<String, InferenceError> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let body = self.build_body(request);
        debug!(
            prompt_chars = request.user.len(),
            json = request.json,
            "sending completion request"
        );
        counter!("inference_requests_total", "backend" => "openai").increment(1);

        let response = self
            .client
            .post(&url)
            .headers(self.build_headers()?)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    InferenceError::Timeout {
                        secs: self.config.timeout.as_secs(),
                    }
                } else {
                    InferenceError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            let message = parse_api_error(&body_text, status.as_u16());
            let retryable = status.as_u16() == 429 || status.is_server_error();
            error!(status = status.as_u16(), retryable, "inference API error");
            counter!("inference_errors_total", "backend" => "openai").increment(1);
            return Err(InferenceError::Api {
                status: status.as_u16(),
                message,
                retryable,
            });
        }

        let payload: Value = response.json().await?;
        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(ToOwned::to_owned)
            .ok_or_else(|| InferenceError::parse("response has no choices[0].message.content"))
    }
}

fn parse_api_error(body: &str, status: u16) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(ToOwned::to_owned))
        .unwrap_or_else(|| format!("HTTP {status}: {body}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: &str) -> OpenAiConfig {
        OpenAiConfig {
            base_url: base_url.into(),
            model: "gpt-test".into(),
            api_key: "test-key".into(),
            timeout: Duration::from_secs(5),
            max_tokens: 1000,
            temperature: 0.3,
        }
    }

    fn completion(content: &str) -> Value {
        json!({"choices": [{"message": {"role": "assistant", "content": content}}]})
    }

    #[tokio::test]
    async fn returns_first_choice_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({"model": "gpt-test"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("{\"ok\":true}")))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenAiClient::new(config(&server.uri())).unwrap();
        let text = client
            .complete(&InferenceRequest::new("sys", "hello"))
            .await
            .unwrap();
        assert_eq!(text, "{\"ok\":true}");
    }

    #[tokio::test]
    async fn json_requests_set_response_format() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "response_format": {"type": "json_object"},
                "max_tokens": 64
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("{}")))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenAiClient::new(config(&server.uri())).unwrap();
        let req = InferenceRequest::new("sys", "u").json().with_max_tokens(64);
        assert_eq!(client.complete(&req).await.unwrap(), "{}");
    }

    #[tokio::test]
    async fn api_error_carries_status_and_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(429)
                    .set_body_json(json!({"error": {"message": "slow down"}})),
            )
            .mount(&server)
            .await;

        let client = OpenAiClient::new(config(&server.uri())).unwrap();
        let err = client
            .complete(&InferenceRequest::new("", "x"))
            .await
            .unwrap_err();
        assert_matches!(
            err,
            InferenceError::Api { status: 429, ref message, retryable: true }
                if message == "slow down"
        );
    }

    #[tokio::test]
    async fn missing_content_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let client = OpenAiClient::new(config(&server.uri())).unwrap();
        let err = client
            .complete(&InferenceRequest::new("", "x"))
            .await
            .unwrap_err();
        assert_matches!(err, InferenceError::Parse { .. });
    }

    #[test]
    fn config_requires_api_key() {
        let settings = LlmSettings::default();
        let err = OpenAiConfig::from_settings(&settings, |_| None).unwrap_err();
        assert_matches!(
            err,
            InferenceError::NotConfigured { ref message } if message.contains("OPENAI_API_KEY")
        );
    }

    #[test]
    fn config_reads_key_and_trims_url() {
        let settings = LlmSettings {
            base_url: "http://localhost:8080/v1/".into(),
            ..LlmSettings::default()
        };
        let cfg = OpenAiConfig::from_settings(&settings, |name| {
            (name == "OPENAI_API_KEY").then(|| "sk-1".to_string())
        })
        .unwrap();
        assert_eq!(cfg.api_key, "sk-1");
        assert_eq!(cfg.base_url, "http://localhost:8080/v1");
        assert_eq!(cfg.timeout, Duration::from_secs(30));
    }

    #[test]
    fn system_message_omitted_when_empty() {
        let client = OpenAiClient::new(config("http://x")).unwrap();
        let body = client.build_body(&InferenceRequest::new("", "u"));
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert!(body.get("response_format").is_none());
    }
}
