//! Backend selection.

use std::sync::Arc;
use std::time::Duration;

use sym_settings::LlmSettings;
use tracing::debug;

use crate::client::InferenceClient;
use crate::errors::InferenceError;
use crate::openai::{OpenAiClient, OpenAiConfig};
use crate::session::{HostSession, HostSessionClient};

/// Chooses the inference backend for a call.
///
/// A host session, when supplied, always wins. Otherwise the standalone
/// backend is built from settings and needs an API key in the environment.
#[derive(Clone)]
pub struct ClientFactory {
    settings: LlmSettings,
    session: Option<Arc<dyn HostSession>>,
    override_client: Option<Arc<dyn InferenceClient>>,
}

impl ClientFactory {
    /// Factory over standalone settings.
    pub fn new(settings: LlmSettings) -> Self {
        Self {
            settings,
            session: None,
            override_client: None,
        }
    }

    /// Route calls through `session`.
    #[must_use]
    pub fn with_session(mut self, session: Arc<dyn HostSession>) -> Self {
        self.session = Some(session);
        self
    }

    /// Always hand out `client` (embedding and tests).
    #[must_use]
    pub fn with_client(mut self, client: Arc<dyn InferenceClient>) -> Self {
        self.override_client = Some(client);
        self
    }

    /// Whether a host session was supplied.
    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Build a client, reading the API key from the process environment.
    pub fn create(&self) -> Result<Arc<dyn InferenceClient>, InferenceError> {
        self.create_with(|name| std::env::var(name).ok())
    }

    /// Build a client, reading the API key through `lookup`.
    pub fn create_with<F>(&self, lookup: F) -> Result<Arc<dyn InferenceClient>, InferenceError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(client) = &self.override_client {
            return Ok(Arc::clone(client));
        }
        if let Some(session) = &self.session {
            debug!("using host session for inference");
            let timeout = Duration::from_secs(self.settings.timeout_secs);
            return Ok(Arc::new(HostSessionClient::new(Arc::clone(session), timeout)));
        }
        let config = OpenAiConfig::from_settings(&self.settings, lookup)?;
        debug!(model = %config.model, "using standalone inference backend");
        Ok(Arc::new(OpenAiClient::new(config)?))
    }
}
