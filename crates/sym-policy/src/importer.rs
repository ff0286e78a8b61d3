//! Convention import from free-form documents.
//!
//! A document is sent to the inference port, which answers with categories
//! and rules as JSON. The answer is normalized, merged into the stored
//! policy (appending or replacing) and saved under the policy lock.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sym_core::{CategoryDef, UserRule};
use sym_llm::json::{extract_json_object, strip_code_fences};
use sym_llm::{InferenceClient, InferenceRequest};
use tracing::{info, instrument, warn};

use crate::document::PolicyDocument;
use crate::errors::PolicyError;
use crate::store::PolicyStore;

/// Characters of document text sent to the model.
pub const MAX_DOCUMENT_CHARS: usize = 40_000;

/// Largest accepted source file.
pub const MAX_FILE_BYTES: u64 = 50 * 1024;

const SUPPORTED_EXTENSIONS: &[&str] = &[
    "txt", "md", "markdown", "rst", "adoc", "go", "js", "ts", "jsx", "tsx", "py", "java", "rs",
    "rb", "php", "c", "cpp", "h", "hpp", "cs", "swift", "kt", "scala", "yaml", "yml", "json",
    "toml", "xml", "html", "htm", "css", "scss", "less",
];

const EXTRACTION_PROMPT: &str = r#"You are a coding standards expert.
Extract every coding convention, rule and guideline from the document below.

OUTPUT FORMAT: Return ONLY valid JSON (no markdown fencing, no preamble text):
{
  "categories": [
    {"name": "category_name", "description": "1-2 sentence description of the category"}
  ],
  "rules": [
    {
      "id": "CATEGORY-001",
      "say": "Natural language description of what the rule enforces",
      "category": "category_name",
      "languages": ["javascript", "typescript"],
      "severity": "error",
      "message": "Short message shown when rule is violated",
      "example": "Optional example of correct/incorrect code"
    }
  ]
}

RULES FOR EXTRACTION:
1. Category names MUST be lowercase with underscores (e.g. "error_handling", "code_style")
2. Prefer standard categories: security, style, documentation, error_handling, architecture,
   performance, testing, naming, formatting
3. Rule ids MUST be unique and look like SEC-001, STYLE-001, DOC-001
4. "say" MUST be a clear, actionable statement
5. Languages are lowercase (e.g. "javascript", "python", "go")
6. Severity is one of "error", "warning", "info"
7. If the document has no coding conventions, return {"categories": [], "rules": []}
8. Extract only enforceable conventions, not general explanations"#;

/// How imported conventions combine with the existing policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Keep existing categories and rules.
    #[default]
    Append,
    /// Drop existing categories, rules and default languages first.
    Clear,
}

impl ImportMode {
    /// Parse `append` / `clear`, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "append" | "" => Some(Self::Append),
            "clear" => Some(Self::Clear),
            _ => None,
        }
    }
}

/// What an import changed.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    /// Source file.
    pub file: String,
    /// Categories added.
    pub categories_added: Vec<CategoryDef>,
    /// Rules added, with final ids.
    pub rules_added: Vec<UserRule>,
    /// Categories dropped in clear mode.
    pub categories_removed: usize,
    /// Rules dropped in clear mode.
    pub rules_removed: usize,
    /// Skipped or renamed items.
    pub warnings: Vec<String>,
}

/// Conventions extracted from one document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Extracted {
    /// Normalized categories.
    pub categories: Vec<CategoryDef>,
    /// Normalized rules.
    pub rules: Vec<UserRule>,
}

impl Extracted {
    fn is_empty(&self) -> bool {
        self.categories.is_empty() && self.rules.is_empty()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawExtraction {
    categories: Vec<RawCategory>,
    rules: Vec<RawRule>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawCategory {
    name: String,
    description: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawRule {
    id: String,
    say: String,
    category: String,
    languages: Vec<String>,
    severity: String,
    message: String,
    example: String,
}

/// Lowercase, with spaces and hyphens turned into underscores. Empty becomes `general`.
pub fn normalize_category(name: &str) -> String {
    let name = name.trim();
    if name.is_empty() {
        return "general".into();
    }
    name.to_lowercase().replace([' ', '-'], "_")
}

/// Map loose severity spellings onto `error` / `warning` / `info`.
pub fn normalize_severity(severity: &str) -> &'static str {
    match severity.trim().to_lowercase().as_str() {
        "error" | "err" => "error",
        "info" | "information" => "info",
        _ => "warning",
    }
}

/// Parse a model answer into normalized conventions.
///
/// Categories without a name and rules without an id or text are dropped.
pub fn parse_extraction(response: &str) -> Result<Extracted, PolicyError> {
    let cleaned = strip_code_fences(response);
    let object = extract_json_object(cleaned).unwrap_or(cleaned);
    let raw: RawExtraction = serde_json::from_str(object).map_err(|e| PolicyError::Import {
        message: format!("invalid JSON response: {e}"),
    })?;

    let categories = raw
        .categories
        .into_iter()
        .filter(|c| !c.name.trim().is_empty())
        .map(|c| CategoryDef {
            name: normalize_category(&c.name),
            description: c.description,
        })
        .collect();
    let rules = raw
        .rules
        .into_iter()
        .filter(|r| !r.id.trim().is_empty() && !r.say.trim().is_empty())
        .map(|r| UserRule {
            id: r.id.trim().to_owned(),
            say: r.say,
            category: normalize_category(&r.category),
            languages: r.languages.iter().map(|l| l.trim().to_lowercase()).collect(),
            severity: normalize_severity(&r.severity).to_owned(),
            message: r.message,
            example: r.example,
            ..UserRule::default()
        })
        .collect();
    Ok(Extracted { categories, rules })
}

fn unique_id(base: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_owned();
    }
    (1..)
        .map(|n| format!("{base}-{n}"))
        .find(|id| !taken.contains(id))
        .unwrap_or_else(|| base.to_owned())
}

fn truncate_document(content: &str) -> String {
    match content.char_indices().nth(MAX_DOCUMENT_CHARS) {
        Some((cut, _)) => format!("{}\n\n... (content truncated)", &content[..cut]),
        None => content.to_owned(),
    }
}

impl PolicyDocument {
    /// Merge extracted conventions.
    ///
    /// Existing category names win over imported ones; colliding rule ids are
    /// renamed `ID-1`, `ID-2`, … Rules naming an undeclared category get that
    /// category created.
    pub fn merge_imported(
        &mut self,
        extracted: Extracted,
        mode: ImportMode,
        report: &mut ImportReport,
    ) {
        if mode == ImportMode::Clear {
            let policy = self.policy_mut();
            report.categories_removed = policy.categories.len();
            report.rules_removed = policy.rules.len();
            policy.categories.clear();
            policy.rules.clear();
            if let Some(defaults) = policy.defaults.as_mut() {
                defaults.languages.clear();
            }
            self.reindex();
            self.mark_dirty();
        }

        let mut names: HashSet<String> =
            self.policy().categories.iter().map(|c| c.name.clone()).collect();
        for category in extracted.categories {
            if !names.insert(category.name.clone()) {
                report
                    .warnings
                    .push(format!("Category '{}' already exists, skipped", category.name));
                continue;
            }
            report.categories_added.push(category);
        }
        for rule in &extracted.rules {
            if names.insert(rule.category.clone()) {
                report
                    .warnings
                    .push(format!("Category '{}' was not declared, created", rule.category));
                report.categories_added.push(CategoryDef {
                    name: rule.category.clone(),
                    description: format!(
                        "Imported conventions for {}",
                        rule.category.replace('_', " ")
                    ),
                });
            }
        }

        let mut ids: HashSet<String> = self.policy().rules.iter().map(|r| r.id.clone()).collect();
        for mut rule in extracted.rules {
            let id = unique_id(&rule.id, &ids);
            if id != rule.id {
                report
                    .warnings
                    .push(format!("Rule ID '{}' already exists, renamed to '{id}'", rule.id));
                rule.id = id;
            }
            let _ = ids.insert(rule.id.clone());
            report.rules_added.push(rule);
        }

        if report.categories_added.is_empty() && report.rules_added.is_empty() {
            return;
        }
        let policy = self.policy_mut();
        policy.categories.extend(report.categories_added.iter().cloned());
        policy.rules.extend(report.rules_added.iter().cloned());
        let added = report.rules_added.clone();
        self.extend_default_languages(&added);
        self.reindex();
        self.mark_dirty();
    }
}

/// Imports conventions from documents into a [`PolicyStore`].
pub struct ConventionImporter {
    client: Arc<dyn InferenceClient>,
}

impl ConventionImporter {
    /// Importer using `client` for extraction.
    pub fn new(client: Arc<dyn InferenceClient>) -> Self {
        Self { client }
    }

    /// Read `path`, extract conventions and merge them into `store`.
    #[instrument(skip_all, fields(file = %path.display(), ?mode))]
    pub async fn import(
        &self,
        store: &PolicyStore,
        path: &Path,
        mode: ImportMode,
    ) -> Result<ImportReport, PolicyError> {
        let content = read_document(path).await?;
        let extracted = self.extract(&content, path).await?;

        let mut report = ImportReport {
            file: path.display().to_string(),
            ..ImportReport::default()
        };
        if extracted.is_empty() {
            report.warnings.push("No conventions found in the document".into());
            return Ok(report);
        }

        let committed = store
            .update(move |doc| {
                doc.merge_imported(extracted, mode, &mut report);
                report
            })
            .await?;
        let report = committed.outcome;
        info!(
            categories = report.categories_added.len(),
            rules = report.rules_added.len(),
            warnings = report.warnings.len(),
            "conventions imported"
        );
        Ok(report)
    }

    /// Ask the model for the conventions in `content`.
    pub async fn extract(&self, content: &str, path: &Path) -> Result<Extracted, PolicyError> {
        let file_name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        let user = format!(
            "SOURCE DOCUMENT: {file_name}\n\nDOCUMENT CONTENT:\n---\n{}\n---",
            truncate_document(content)
        );
        let request = InferenceRequest::new(EXTRACTION_PROMPT, user).json().with_max_tokens(4000);
        let response = self.client.complete(&request).await?;
        parse_extraction(&response).inspect_err(|e| warn!(error = %e, "unusable extraction answer"))
    }
}

async fn read_document(path: &Path) -> Result<String, PolicyError> {
    let import_err = |message: String| PolicyError::Import { message };
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(import_err(format!("unsupported format: .{ext}")));
    }
    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|e| import_err(format!("file not found: {e}")))?;
    if meta.is_dir() {
        return Err(import_err(format!("{} is a directory", path.display())));
    }
    if meta.len() == 0 {
        return Err(import_err("empty file".into()));
    }
    if meta.len() > MAX_FILE_BYTES {
        return Err(import_err(format!(
            "file too large ({} bytes, max {MAX_FILE_BYTES} bytes)",
            meta.len()
        )));
    }
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| import_err(format!("failed to read file: {e}")))
}
