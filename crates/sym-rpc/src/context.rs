//! Dependency-injection context shared by every handler.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use sym_access::{AccessEvaluator, RoleSource, role_source_from_settings};
use sym_converter::AdapterRegistry;
use sym_core::CodePolicy;
use sym_core::fs::read_json_opt;
use sym_llm::ClientFactory;
use sym_policy::{PolicyDocument, PolicyStore};
use sym_settings::SymSettings;
use sym_validator::{ChangeSource, GitChangeReader, HistoryStore};

use crate::errors::{self, RpcError};

/// Shared context passed to every handler.
pub struct RpcContext {
    /// Repository root.
    pub root: PathBuf,
    /// Settings with every path resolved against `root`.
    pub settings: SymSettings,
    /// Natural-language policy file.
    pub policy_store: PolicyStore,
    /// Capped validation history.
    pub history: HistoryStore,
    /// Resolves the active role for permission checks and RBAC.
    pub role_source: Arc<dyn RoleSource>,
    /// Produces the inference client for conversion, import and LLM checks.
    pub clients: ClientFactory,
    /// Linter adapters available for conversion and validation.
    pub adapters: AdapterRegistry,
    /// Fixed change set (None = read the git working tree).
    pub change_source: Option<Arc<dyn ChangeSource>>,
    /// When the server started (for uptime calculation).
    pub server_start_time: Instant,
}

impl RpcContext {
    /// Build a context for `root`, resolving the configured paths.
    pub fn new(root: impl Into<PathBuf>, mut settings: SymSettings) -> Self {
        let root = root.into();
        settings.paths = settings.paths.resolve(&root);
        let paths = &settings.paths;
        Self {
            policy_store: PolicyStore::new(&paths.policy_path),
            history: HistoryStore::new(&paths.history_path, settings.validator.history_limit),
            role_source: Arc::from(role_source_from_settings(&settings.access, &paths.roles_path)),
            clients: ClientFactory::new(settings.llm.clone()),
            adapters: AdapterRegistry::builtin(),
            change_source: None,
            server_start_time: Instant::now(),
            root,
            settings,
        }
    }

    /// Replace the inference factory.
    #[must_use]
    pub fn with_clients(mut self, clients: ClientFactory) -> Self {
        self.clients = clients;
        self
    }

    /// Replace the role source.
    #[must_use]
    pub fn with_role_source(mut self, source: Arc<dyn RoleSource>) -> Self {
        self.role_source = source;
        self
    }

    /// Validate a fixed change set instead of the git working tree.
    #[must_use]
    pub fn with_change_source(mut self, source: Arc<dyn ChangeSource>) -> Self {
        self.change_source = Some(source);
        self
    }

    /// Change source for a validation call.
    pub fn changes(&self, staged_only: bool) -> Arc<dyn ChangeSource> {
        match &self.change_source {
            Some(source) => Arc::clone(source),
            None => Arc::new(GitChangeReader::new(&self.root).staged_only(staged_only)),
        }
    }

    /// Active role name.
    pub fn active_role(&self) -> Result<String, RpcError> {
        self.role_source
            .active_role()
            .map_err(|e| RpcError::custom(errors::INVALID_OPERATION, e.to_string()))
    }

    /// Compiled policy, if one has been written.
    pub async fn load_code_policy(&self) -> Result<Option<CodePolicy>, RpcError> {
        let path = self.settings.paths.code_policy_path.clone();
        tokio::task::spawn_blocking(move || read_json_opt::<CodePolicy>(&path))
            .await
            .map_err(|e| RpcError::Internal { message: e.to_string() })?
            .map_err(|e| RpcError::Internal {
                message: format!("failed to read code policy: {e}"),
            })
    }

    /// Reject policy edits when RBAC is configured and the active role
    /// lacks `canEditPolicy`.
    pub fn require_policy_editor(&self, doc: &PolicyDocument) -> Result<(), RpcError> {
        let evaluator = AccessEvaluator::from_user_policy(doc.policy());
        if !evaluator.is_enabled() {
            return Ok(());
        }
        let role = self.active_role()?;
        if evaluator.can_edit_policy(&role) {
            Ok(())
        } else {
            Err(RpcError::Custom {
                code: errors::PERMISSION_DENIED.into(),
                message: format!("role '{role}' cannot edit the policy"),
                details: Some(serde_json::json!({ "role": role })),
            })
        }
    }
}
