//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`SymSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over the defaults
//! 3. Apply `SYM_*` environment overrides (highest priority)
//! 4. Validate ranges
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::{SymSettings, Transport};

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<SymSettings> {
    let defaults = serde_json::to_value(SymSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: SymSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    validate(&settings)?;
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply overrides from the process environment.
pub fn apply_env_overrides(settings: &mut SymSettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Apply overrides from an arbitrary lookup (testable without touching the environment).
///
/// Invalid values are logged and ignored.
pub fn apply_overrides<F>(settings: &mut SymSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let read = |name: &str| lookup(name).filter(|v| !v.is_empty());

    // ── Server ──────────────────────────────────────────────────────
    if let Some(v) = read("SYM_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = read("SYM_PORT") {
        match parse_u64_range(&v, 1, 65_535).and_then(|n| u16::try_from(n).ok()) {
            Some(port) => settings.server.port = port,
            None => invalid("SYM_PORT", &v),
        }
    }
    if let Some(v) = read("SYM_TRANSPORT") {
        match v.to_lowercase().as_str() {
            "stdio" => settings.server.transport = Transport::Stdio,
            "http" => settings.server.transport = Transport::Http,
            _ => invalid("SYM_TRANSPORT", &v),
        }
    }
    if let Some(v) = read("SYM_HOST_SAMPLING") {
        match v.to_lowercase().as_str() {
            "1" | "true" | "yes" => settings.server.host_sampling = true,
            "0" | "false" | "no" => settings.server.host_sampling = false,
            _ => invalid("SYM_HOST_SAMPLING", &v),
        }
    }

    // ── Converter ───────────────────────────────────────────────────
    if let Some(v) = read("SYM_MAX_WORKERS") {
        match parse_u64_range(&v, 1, 64).and_then(|n| usize::try_from(n).ok()) {
            Some(n) => settings.converter.max_workers = n,
            None => invalid("SYM_MAX_WORKERS", &v),
        }
    }
    if let Some(v) = read("SYM_CONFIDENCE_THRESHOLD") {
        match parse_unit_f64(&v) {
            Some(t) => settings.converter.confidence_threshold = t,
            None => invalid("SYM_CONFIDENCE_THRESHOLD", &v),
        }
    }

    // ── Validator ───────────────────────────────────────────────────
    if let Some(v) = read("SYM_RULE_TIMEOUT_SECS") {
        match parse_u64_range(&v, 1, 3600) {
            Some(n) => settings.validator.rule_timeout_secs = n,
            None => invalid("SYM_RULE_TIMEOUT_SECS", &v),
        }
    }

    // ── LLM ─────────────────────────────────────────────────────────
    if let Some(v) = read("SYM_LLM_MODEL") {
        settings.llm.model = v;
    }
    if let Some(v) = read("SYM_LLM_BASE_URL") {
        settings.llm.base_url = v;
    }

    // ── Access ──────────────────────────────────────────────────────
    if let Some(v) = read("SYM_ROLE") {
        settings.access.role = v;
    }
    if let Some(v) = read("SYM_USER") {
        settings.access.user = v;
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = read("SYM_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read("SYM_LOG_FORMAT") {
        settings.logging.format = v;
    }
}

/// Reject settings that no component can work with.
pub fn validate(settings: &SymSettings) -> Result<()> {
    if settings.converter.max_workers == 0 {
        return Err(SettingsError::InvalidValue(
            "converter.maxWorkers must be at least 1".into(),
        ));
    }
    if !(0.0..=1.0).contains(&settings.converter.confidence_threshold) {
        return Err(SettingsError::InvalidValue(format!(
            "converter.confidenceThreshold must be within 0..=1, got {}",
            settings.converter.confidence_threshold
        )));
    }
    if settings.validator.history_limit == 0 {
        return Err(SettingsError::InvalidValue(
            "validator.historyLimit must be at least 1".into(),
        ));
    }
    Ok(())
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as an `f64` within `0.0..=1.0`.
pub fn parse_unit_f64(val: &str) -> Option<f64> {
    let n: f64 = val.trim().parse().ok()?;
    (0.0..=1.0).contains(&n).then_some(n)
}

fn invalid(key: &str, value: &str) {
    warn!(key, value, "invalid env var, ignoring");
}
