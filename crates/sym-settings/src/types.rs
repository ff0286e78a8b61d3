//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]` so partial JSON
//! files are accepted and missing fields take their compiled default.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Root settings type.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SymSettings {
    /// File locations, relative to the repository root unless absolute.
    pub paths: PathSettings,
    /// Active role resolution.
    pub access: AccessSettings,
    /// Rule conversion.
    pub converter: ConverterSettings,
    /// Change validation.
    pub validator: ValidatorSettings,
    /// Standalone LLM backend.
    pub llm: LlmSettings,
    /// Protocol server.
    pub server: ServerSettings,
    /// Logging.
    pub logging: LoggingSettings,
}

/// File locations.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PathSettings {
    /// Natural-language policy.
    pub policy_path: PathBuf,
    /// Compiled policy.
    pub code_policy_path: PathBuf,
    /// Role → usernames map.
    pub roles_path: PathBuf,
    /// Capped validation history.
    pub history_path: PathBuf,
    /// Directory receiving generated linter configs.
    pub output_dir: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            policy_path: PathBuf::from(".sym/user-policy.json"),
            code_policy_path: PathBuf::from(".sym/code-policy.json"),
            roles_path: PathBuf::from(".sym/roles.json"),
            history_path: PathBuf::from(".sym/validation-history.json"),
            output_dir: PathBuf::from(".sym"),
        }
    }
}

impl PathSettings {
    /// Resolve every relative path against `root`.
    #[must_use]
    pub fn resolve(&self, root: &Path) -> Self {
        let join = |p: &PathBuf| {
            if p.is_absolute() {
                p.clone()
            } else {
                root.join(p)
            }
        };
        Self {
            policy_path: join(&self.policy_path),
            code_policy_path: join(&self.code_policy_path),
            roles_path: join(&self.roles_path),
            history_path: join(&self.history_path),
            output_dir: join(&self.output_dir),
        }
    }
}

/// Active role resolution.
///
/// A non-empty `role` pins the role directly. Otherwise `user` (or `$USER`)
/// is looked up in the role store.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccessSettings {
    /// Pinned role name.
    pub role: String,
    /// Username for role lookup.
    pub user: String,
}

/// Rule conversion settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConverterSettings {
    /// Inference worker pool size.
    pub max_workers: usize,
    /// Confidence below which a converted rule is flagged.
    pub confidence_threshold: f64,
    /// Budget per rule used to scale the conversion deadline.
    pub per_rule_timeout_secs: u64,
    /// Linter targets (`all` or adapter names).
    pub targets: Vec<String>,
}

impl Default for ConverterSettings {
    fn default() -> Self {
        Self {
            max_workers: 5,
            confidence_threshold: 0.7,
            per_rule_timeout_secs: 30,
            targets: vec!["all".into()],
        }
    }
}

/// Change validation settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidatorSettings {
    /// Deadline for a single rule check.
    pub rule_timeout_secs: u64,
    /// Maximum records kept in the history file.
    pub history_limit: usize,
    /// Maximum diff characters sent to the LLM engine.
    pub max_code_chars: usize,
}

impl Default for ValidatorSettings {
    fn default() -> Self {
        Self {
            rule_timeout_secs: 30,
            history_limit: 50,
            max_code_chars: 3000,
        }
    }
}

/// Standalone LLM backend settings (OpenAI-compatible chat completions).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LlmSettings {
    /// API base URL.
    pub base_url: String,
    /// Model id.
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Request timeout.
    pub timeout_secs: u64,
    /// Completion token cap.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            model: "gpt-4o-mini".into(),
            api_key_env: "OPENAI_API_KEY".into(),
            timeout_secs: 30,
            max_tokens: 1000,
            temperature: 0.3,
        }
    }
}

/// Protocol transport.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// Newline-delimited requests on stdin/stdout.
    #[default]
    Stdio,
    /// HTTP POST on a single endpoint.
    Http,
}

/// Protocol server settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind host for HTTP.
    pub host: String,
    /// Bind port for HTTP.
    pub port: u16,
    /// Transport.
    pub transport: Transport,
    /// Per-call dispatch timeout.
    pub handler_timeout_secs: u64,
    /// Route inference through the connected host (stdio only) instead of the standalone backend.
    pub host_sampling: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 4000,
            transport: Transport::Stdio,
            handler_timeout_secs: 600,
            host_sampling: false,
        }
    }
}

/// Logging settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Minimum level when `RUST_LOG` is unset.
    pub level: String,
    /// `compact` or `json`.
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".into(),
            format: "compact".into(),
        }
    }
}
