//! `UserPolicy` → `CodePolicy` compilation.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use serde::Serialize;
use serde_json::{Map, Value};
use sym_core::{
    CheckSpec, CodePolicy, Enforce, EnforceRbac, LLM_VALIDATOR_ENGINE, PolicyRule, Remedy,
    Selector, Severity, UserPolicy, UserRule,
};
use sym_llm::{ClientFactory, InferenceClient, InferenceError, InferenceOutcome, Inferencer};
use sym_settings::ConverterSettings;
use tracing::{debug, info, instrument, warn};

use crate::adapter::{AdapterRegistry, AdapterRule, LinterAdapter};
use crate::errors::ConvertError;
use crate::pool::run_indexed;

/// Languages assumed for `llm-validator` rules that declare none.
const FALLBACK_LANGUAGES: &[&str] = &["javascript", "typescript"];

/// Description used when a rule has no text.
const FALLBACK_DESC: &str = "Code quality check";

/// Lower bound of the conversion deadline.
const MIN_DEADLINE: Duration = Duration::from_secs(60);

/// Converter tuning.
#[derive(Clone, Debug)]
pub struct ConverterOptions {
    /// Concurrent inference calls per adapter.
    pub max_workers: usize,
    /// Confidence below which a rule is flagged.
    pub confidence_threshold: f64,
    /// Budget per rule, scaled by rule count into the overall deadline.
    pub per_rule_timeout: Duration,
    /// Adapter names, or `all`.
    pub targets: Vec<String>,
}

impl ConverterOptions {
    /// Options from settings.
    pub fn from_settings(settings: &ConverterSettings) -> Self {
        Self {
            max_workers: settings.max_workers.max(1),
            confidence_threshold: settings.confidence_threshold,
            per_rule_timeout: Duration::from_secs(settings.per_rule_timeout_secs),
            targets: settings.targets.clone(),
        }
    }

    /// Whole-conversion deadline for `rule_count` rules.
    pub fn deadline(&self, rule_count: usize) -> Duration {
        let count = u32::try_from(rule_count).unwrap_or(u32::MAX);
        self.per_rule_timeout.saturating_mul(count).max(MIN_DEADLINE)
    }
}

impl Default for ConverterOptions {
    fn default() -> Self {
        Self::from_settings(&ConverterSettings::default())
    }
}

/// A rendered linter configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedFile {
    /// Adapter that produced it.
    pub adapter: String,
    /// File name relative to the output directory.
    pub file_name: String,
    /// File content.
    pub content: String,
}

/// Result of a conversion.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertOutcome {
    /// Compiled policy, rules in source order.
    pub code_policy: CodePolicy,
    /// One file per adapter that received at least one rule.
    pub generated_files: Vec<GeneratedFile>,
    /// Per-target failures (unknown adapter, render failure).
    pub errors: BTreeMap<String, String>,
    /// Per-rule degradations, at most one per rule and kind.
    pub warnings: Vec<String>,
}

/// Rule that an adapter claimed.
#[derive(Clone)]
struct Ownership {
    adapter: Arc<dyn LinterAdapter>,
    entries: Map<String, Value>,
}

#[derive(Default)]
struct Warnings {
    seen: BTreeSet<(String, &'static str)>,
    messages: Vec<String>,
}

impl Warnings {
    fn push(&mut self, rule_id: &str, kind: &'static str, message: String) {
        if self.seen.insert((rule_id.to_owned(), kind)) {
            warn!(rule_id, kind, "{message}");
            self.messages.push(message);
        }
    }
}

/// Compiles natural-language policies.
pub struct Converter {
    inferencer: Arc<Inferencer>,
    registry: AdapterRegistry,
    options: ConverterOptions,
}

impl Converter {
    /// Converter classifying rules through `client`.
    pub fn new(
        client: Arc<dyn InferenceClient>,
        registry: AdapterRegistry,
        options: ConverterOptions,
    ) -> Self {
        Self {
            inferencer: Arc::new(Inferencer::new(client)),
            registry,
            options,
        }
    }

    /// Converter over the factory's backend. Fails when no backend is available.
    pub fn from_factory(
        factory: &ClientFactory,
        registry: AdapterRegistry,
        options: ConverterOptions,
    ) -> Result<Self, ConvertError> {
        let client = factory.create().map_err(ConvertError::NoClient)?;
        Ok(Self::new(client, registry, options))
    }

    /// Adapter registry in use.
    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    /// Compile `policy` under the scaled deadline.
    ///
    /// Dropping the returned future, or hitting the deadline, aborts every
    /// in-flight inference call.
    #[instrument(
        skip_all,
        fields(rules = policy.rules.len(), backend = %self.inferencer.backend())
    )]
    pub async fn convert(&self, policy: &UserPolicy) -> Result<ConvertOutcome, ConvertError> {
        let deadline = self.options.deadline(policy.rules.len());
        match tokio::time::timeout(deadline, self.convert_inner(policy)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(secs = deadline.as_secs(), "conversion deadline elapsed");
                Err(ConvertError::Deadline {
                    secs: deadline.as_secs(),
                })
            }
        }
    }

    async fn convert_inner(&self, policy: &UserPolicy) -> Result<ConvertOutcome, ConvertError> {
        let (adapters, unknown) = self.registry.resolve_targets(&self.options.targets);
        let mut errors = BTreeMap::new();
        for name in unknown {
            warn!(linter = %name, "unsupported linter target");
            let _ = errors.insert(name, "unsupported linter".to_owned());
        }

        let effective: Vec<UserRule> =
            policy.rules.iter().map(|r| effective_rule(policy, r)).collect();
        let mut owners: HashMap<String, Ownership> = HashMap::new();
        let mut warnings = Warnings::default();
        let mut generated_files = Vec::new();

        for adapter in adapters {
            let applicable: Vec<UserRule> = effective
                .iter()
                .filter(|r| adapter.applies_to(&r.languages))
                .cloned()
                .collect();
            debug!(adapter = adapter.name(), rules = applicable.len(), "routing rules");
            if applicable.is_empty() {
                continue;
            }

            let ids: Vec<String> = applicable.iter().map(|r| r.id.clone()).collect();
            let outcomes = self.classify(applicable.clone()).await;

            let mut converted: Vec<AdapterRule> = Vec::new();
            for ((id, rule), outcome) in ids.iter().zip(&applicable).zip(outcomes) {
                let outcome = match outcome {
                    Some(Ok(outcome)) => outcome,
                    Some(Err(e)) => {
                        counter!("converter_inference_failures_total").increment(1);
                        let text = format!("rule {id}: inference failed, skipped ({e})");
                        warnings.push(id, "inference", text);
                        continue;
                    }
                    None => {
                        let text = format!("rule {id}: inference task aborted, skipped");
                        warnings.push(id, "inference", text);
                        continue;
                    }
                };

                let confidence = outcome.intent.confidence;
                if confidence < self.options.confidence_threshold {
                    counter!("converter_low_confidence_total").increment(1);
                    warnings.push(
                        id,
                        "confidence",
                        format!(
                            "rule {id}: low confidence {confidence:.2} (threshold {:.2}), \
                             review the generated check",
                            self.options.confidence_threshold
                        ),
                    );
                }

                match adapter.convert(rule, &outcome.intent) {
                    Ok(Some(adapter_rule)) if !adapter_rule.is_empty() => {
                        let _ = owners.entry(id.clone()).or_insert_with(|| Ownership {
                            adapter: Arc::clone(&adapter),
                            entries: adapter_rule.entries.clone(),
                        });
                        converted.push(adapter_rule);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        let text = format!("rule {id}: {} conversion failed ({e})", adapter.name());
                        warnings.push(id, adapter.name(), text);
                    }
                }
            }

            if converted.is_empty() {
                continue;
            }
            match adapter.build_config(&converted) {
                Ok(content) => generated_files.push(GeneratedFile {
                    adapter: adapter.name().to_owned(),
                    file_name: adapter.config_file().to_owned(),
                    content,
                }),
                Err(e) => {
                    let _ = errors.insert(adapter.name().to_owned(), e.to_string());
                }
            }
        }

        let rules: Vec<PolicyRule> = effective
            .iter()
            .map(|rule| compile_rule(rule, owners.get(&rule.id)))
            .collect();
        counter!("converter_rules_total").increment(rules.len() as u64);
        info!(
            rules = rules.len(),
            linter_rules = owners.len(),
            files = generated_files.len(),
            warnings = warnings.messages.len(),
            "conversion complete"
        );

        let code_policy = CodePolicy {
            version: if policy.version.is_empty() {
                "1.0".to_owned()
            } else {
                policy.version.clone()
            },
            rbac: policy.rbac.clone(),
            rules,
            enforce: Enforce {
                rbac: policy.rbac.is_some().then(EnforceRbac::default),
                ..Enforce::default()
            },
        };

        Ok(ConvertOutcome {
            code_policy,
            generated_files,
            errors,
            warnings: warnings.messages,
        })
    }

    async fn classify(
        &self,
        rules: Vec<UserRule>,
    ) -> Vec<Option<Result<InferenceOutcome, InferenceError>>> {
        let inferencer = Arc::clone(&self.inferencer);
        run_indexed(rules, self.options.max_workers, move |rule| {
            let inferencer = Arc::clone(&inferencer);
            async move { inferencer.infer(&rule).await }
        })
        .await
    }
}

/// Rule with languages, globs and severity defaulted from the policy.
fn effective_rule(policy: &UserPolicy, rule: &UserRule) -> UserRule {
    let defaults = policy.defaults.clone().unwrap_or_default();
    let mut out = rule.clone();
    if out.languages.is_empty() {
        out.languages.clone_from(&defaults.languages);
    }
    if out.include.is_empty() {
        out.include.clone_from(&defaults.include);
    }
    if out.exclude.is_empty() {
        out.exclude.clone_from(&defaults.exclude);
    }
    out.severity = Severity::resolve(&[rule.severity.as_str(), defaults.severity.as_str()])
        .as_str()
        .to_owned();
    out.autofix = rule.autofix || defaults.autofix;
    out
}

fn compile_rule(rule: &UserRule, owner: Option<&Ownership>) -> PolicyRule {
    let (check, languages, tool) = match owner {
        Some(owner) => {
            let mut languages = owner.adapter.supported_subset(&rule.languages);
            if languages.is_empty() {
                languages = owner.adapter.default_languages();
            }
            let mut check = CheckSpec::engine(owner.adapter.name());
            let _ = check.params.insert("config".into(), Value::Object(owner.entries.clone()));
            (check, languages, Some(owner.adapter.name().to_owned()))
        }
        None => {
            let languages = if rule.languages.is_empty() {
                FALLBACK_LANGUAGES.iter().map(|s| (*s).to_owned()).collect()
            } else {
                rule.languages.clone()
            };
            (CheckSpec::engine(LLM_VALIDATOR_ENGINE), languages, None)
        }
    };

    let when = Selector {
        languages,
        include: rule.include.clone(),
        exclude: rule.exclude.clone(),
    };

    PolicyRule {
        id: rule.id.clone(),
        enabled: true,
        category: rule.category.clone(),
        severity: Severity::from_str_lossy(&rule.severity),
        desc: if rule.say.trim().is_empty() {
            FALLBACK_DESC.to_owned()
        } else {
            rule.say.clone()
        },
        when: (!when.is_empty()).then_some(when),
        check,
        remedy: rule.autofix.then(|| Remedy { autofix: true, tool }),
        message: rule.message.clone(),
    }
}
