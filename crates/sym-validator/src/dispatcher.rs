//! Validation dispatcher.
//!
//! Runs every enabled rule against the changed files its selector matches,
//! merges access-control denials into the same result, and records the run
//! in the history store.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use futures::future::join_all;
use metrics::counter;
use sym_access::AccessEvaluator;
use sym_core::{
    CodePolicy, EngineFailure, PolicyRule, ValidationHistoryRecord, ValidationResult, Violation,
};
use sym_settings::ValidatorSettings;
use tracing::{debug, info, instrument, warn};

use crate::changes::{ChangeSource, FileChange};
use crate::engine::{CheckTarget, EngineRegistry};
use crate::errors::{EngineError, ValidatorError};
use crate::history::HistoryStore;
use crate::selector::rule_applies;

/// Per-run knobs.
#[derive(Clone, Debug)]
pub struct ValidatorOptions {
    /// Deadline for one rule on one file.
    pub rule_timeout: Duration,
    /// Repository root; engines resolve paths against it.
    pub root: PathBuf,
    /// Active role for access checks.
    pub role: String,
}

impl ValidatorOptions {
    /// Options from settings for `root` and `role`.
    pub fn from_settings(
        settings: &ValidatorSettings,
        root: impl Into<PathBuf>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            rule_timeout: Duration::from_secs(settings.rule_timeout_secs.max(1)),
            root: root.into(),
            role: role.into(),
        }
    }
}

/// Outcome of one rule on one file.
enum Outcome {
    Passed,
    Failed(Vec<Violation>),
    Error(EngineFailure),
}

/// Checks change sets against a compiled policy.
pub struct Validator {
    policy: CodePolicy,
    engines: EngineRegistry,
    access: AccessEvaluator,
    options: ValidatorOptions,
    history: Option<HistoryStore>,
}

impl Validator {
    /// Validator for `policy` using `engines`.
    pub fn new(policy: CodePolicy, engines: EngineRegistry, options: ValidatorOptions) -> Self {
        let access = AccessEvaluator::from_code_policy(&policy);
        Self {
            policy,
            engines,
            access,
            options,
            history: None,
        }
    }

    /// Check write access against `access` instead of the role section
    /// compiled into the policy.
    #[must_use]
    pub fn with_access(mut self, access: AccessEvaluator) -> Self {
        self.access = access;
        self
    }

    /// Record every run in `store`.
    #[must_use]
    pub fn with_history(mut self, store: HistoryStore) -> Self {
        self.history = Some(store);
        self
    }

    /// Policy being enforced.
    pub fn policy(&self) -> &CodePolicy {
        &self.policy
    }

    /// Whether access control applies to this policy.
    fn access_enforced(&self) -> bool {
        self.access.is_enabled() && self.policy.enforce.rbac.as_ref().is_none_or(|r| r.enabled)
    }

    /// Validate the changes reported by `source`.
    ///
    /// Failing to read the change set aborts the call. Engine failures are
    /// collected in `errors` and never count as passes.
    #[instrument(skip_all, fields(role = %self.options.role))]
    pub async fn validate(
        &self,
        source: &dyn ChangeSource,
    ) -> Result<ValidationResult, ValidatorError> {
        let started = Instant::now();
        let changes: Vec<FileChange> = source
            .changes()
            .await?
            .into_iter()
            .filter(|c| !c.is_deleted())
            .collect();
        let mut result = ValidationResult::default();

        if self.access_enforced() {
            let paths: Vec<&str> = changes.iter().map(|c| c.path.as_str()).collect();
            let denied = self.access.violations(&self.options.role, &paths);
            if !denied.is_empty() {
                warn!(count = denied.len(), "write access denied");
                counter!("validator_permission_denied_total").increment(denied.len() as u64);
            }
            result.failed += denied.len();
            result.violations.extend(denied);
        }

        let targets: Vec<CheckTarget> =
            changes.iter().map(|c| CheckTarget::new(c, &self.options.root)).collect();
        for rule in self.policy.enabled_rules() {
            let relevant: Vec<&CheckTarget> =
                targets.iter().filter(|t| rule_applies(rule, &t.path)).collect();
            if relevant.is_empty() {
                continue;
            }
            debug!(
                rule_id = %rule.id,
                engine = rule.engine(),
                files = relevant.len(),
                "checking rule"
            );
            let outcomes = join_all(relevant.iter().map(|t| self.check_one(rule, t))).await;
            for outcome in outcomes {
                result.checked += 1;
                match outcome {
                    Outcome::Passed => result.passed += 1,
                    Outcome::Failed(violations) => {
                        result.failed += 1;
                        result.violations.extend(violations);
                    }
                    Outcome::Error(failure) => result.errors.push(failure),
                }
            }
        }

        info!(
            files = changes.len(),
            checked = result.checked,
            passed = result.passed,
            failed = result.failed,
            errors = result.errors.len(),
            duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "validation finished"
        );

        if let Some(store) = &self.history {
            let files = changes.iter().map(|c| c.path.clone()).collect();
            let record = ValidationHistoryRecord::from_result(&result, files);
            if let Err(e) = store.append(record).await {
                warn!(error = %e, "failed to record validation history");
            }
        }
        Ok(result)
    }

    async fn check_one(&self, rule: &PolicyRule, target: &CheckTarget) -> Outcome {
        let engine_id = rule.engine();
        let failure = |err: EngineError| {
            warn!(
                rule_id = %rule.id,
                engine = engine_id,
                file = %target.path,
                error = %err,
                "engine failed"
            );
            counter!("validator_engine_errors_total", "engine" => engine_id.to_owned())
                .increment(1);
            Outcome::Error(EngineFailure {
                rule_id: rule.id.clone(),
                engine: engine_id.to_owned(),
                message: err.to_string(),
            })
        };

        let Some(engine) = self.engines.get(engine_id) else {
            return failure(EngineError::Unknown {
                engine: engine_id.to_owned(),
            });
        };
        match tokio::time::timeout(self.options.rule_timeout, engine.check(rule, target)).await {
            Err(_) => failure(EngineError::Timeout {
                engine: engine_id.to_owned(),
                secs: self.options.rule_timeout.as_secs(),
            }),
            Ok(Err(err)) => failure(err),
            Ok(Ok(violations)) if violations.is_empty() => Outcome::Passed,
            Ok(Ok(violations)) => Outcome::Failed(violations),
        }
    }
}
