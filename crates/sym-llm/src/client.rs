//! Inference port.

use async_trait::async_trait;

use crate::errors::InferenceError;

/// A single-turn completion request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InferenceRequest {
    /// Instructions for the model.
    pub system: String,
    /// The task itself.
    pub user: String,
    /// Completion token cap. `None` uses the backend default.
    pub max_tokens: Option<u32>,
    /// Ask the backend for a JSON object response where supported.
    pub json: bool,
}

impl InferenceRequest {
    /// Request with system and user prompts.
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            max_tokens: None,
            json: false,
        }
    }

    /// Ask for a JSON object response.
    #[must_use]
    pub fn json(mut self) -> Self {
        self.json = true;
        self
    }

    /// Cap completion tokens.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// System and user prompts as a single text, for backends without roles.
    pub fn combined_prompt(&self) -> String {
        if self.system.is_empty() {
            self.user.clone()
        } else {
            format!("{}\n\n{}", self.system, self.user)
        }
    }
}

/// Backend that turns a prompt into text.
///
/// Implementors must be `Send + Sync`; one client is shared by every worker
/// of a conversion and every rule of a validation run.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Backend identifier for logs (`openai`, `host`, `mock`).
    fn name(&self) -> &str;

    /// Run one completion.
    async fn complete(&self, request: &InferenceRequest) -> Result<String, InferenceError>;
}
