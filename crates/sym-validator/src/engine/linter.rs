//! External linters run as subprocesses.
//!
//! Each rule owned by a linter carries its native options under
//! `check.config`. The engine renders them with the same adapter that
//! produced them, writes the file into a scratch directory and runs the
//! tool on the one changed file.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};
use sym_converter::adapter::{
    CheckstyleAdapter, EslintAdapter, GolangciAdapter, PmdAdapter, PrettierAdapter, PylintAdapter,
    TscAdapter,
};
use sym_converter::{AdapterRule, LinterAdapter};
use sym_core::{PolicyRule, Violation};
use tokio::process::Command;
use tracing::{debug, instrument};

use super::{CheckTarget, Engine, message_or, violation};
use crate::errors::EngineError;

/// Supported linters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinterKind {
    /// `eslint`
    Eslint,
    /// `prettier --check`
    Prettier,
    /// `tsc --noEmit`
    Tsc,
    /// `pylint`
    Pylint,
    /// `checkstyle -f xml`
    Checkstyle,
    /// `pmd check -f json`
    Pmd,
    /// `golangci-lint run` with JSON output
    Golangci,
}

impl LinterKind {
    /// Every linter, in registration order.
    pub const ALL: [Self; 7] = [
        Self::Eslint,
        Self::Prettier,
        Self::Tsc,
        Self::Pylint,
        Self::Checkstyle,
        Self::Pmd,
        Self::Golangci,
    ];

    /// Engine id, equal to the adapter name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Eslint => "eslint",
            Self::Prettier => "prettier",
            Self::Tsc => "tsc",
            Self::Pylint => "pylint",
            Self::Checkstyle => "checkstyle",
            Self::Pmd => "pmd",
            Self::Golangci => "golangci-lint",
        }
    }

    fn adapter(self) -> Arc<dyn LinterAdapter> {
        match self {
            Self::Eslint => Arc::new(EslintAdapter),
            Self::Prettier => Arc::new(PrettierAdapter),
            Self::Tsc => Arc::new(TscAdapter),
            Self::Pylint => Arc::new(PylintAdapter),
            Self::Checkstyle => Arc::new(CheckstyleAdapter),
            Self::Pmd => Arc::new(PmdAdapter),
            Self::Golangci => Arc::new(GolangciAdapter),
        }
    }
}

/// One diagnostic reported by a tool.
#[derive(Clone, Debug, PartialEq, Eq)]
struct ToolMessage {
    line: usize,
    column: usize,
    message: String,
    code: Option<String>,
}

#[derive(Debug)]
struct ToolOutput {
    code: Option<i32>,
    stdout: String,
    stderr: String,
}

impl ToolOutput {
    fn failure(&self) -> String {
        let text = if self.stderr.trim().is_empty() { &self.stdout } else { &self.stderr };
        format!("exit code {:?}: {}", self.code, text.trim())
    }
}

/// Engine running one linter.
pub struct LinterEngine {
    kind: LinterKind,
    adapter: Arc<dyn LinterAdapter>,
    program: String,
}

impl LinterEngine {
    /// Engine for `kind`, invoking the tool by its usual executable name.
    pub fn new(kind: LinterKind) -> Self {
        Self {
            kind,
            adapter: kind.adapter(),
            program: kind.name().to_owned(),
        }
    }

    /// Use a different executable.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    async fn run(&self, args: Vec<OsString>, root: &Path) -> Result<ToolOutput, EngineError> {
        let mut cmd = Command::new(&self.program);
        let _ = cmd
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .env("ESLINT_USE_FLAT_CONFIG", "false");
        if root.is_dir() {
            let _ = cmd.current_dir(root);
        }
        let output = cmd.output().await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                EngineError::Unavailable {
                    engine: self.kind.name().into(),
                    message: format!("'{}' not found on PATH", self.program),
                }
            } else {
                EngineError::execution(self.kind.name(), e.to_string())
            }
        })?;
        Ok(ToolOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn render_config(
        &self,
        rule: &PolicyRule,
        entries: &Map<String, Value>,
        file: &Path,
    ) -> Result<String, EngineError> {
        let rendered = self
            .adapter
            .build_config(&[AdapterRule {
                rule_id: rule.id.clone(),
                entries: entries.clone(),
            }])
            .map_err(|e| EngineError::execution(self.kind.name(), e.to_string()))?;
        if self.kind != LinterKind::Tsc {
            return Ok(rendered);
        }
        let mut project: Value = serde_json::from_str(&rendered)
            .map_err(|e| EngineError::execution("tsc", e.to_string()))?;
        if let Some(obj) = project.as_object_mut() {
            let files = vec![Value::String(file.display().to_string())];
            let _ = obj.insert("files".into(), Value::Array(files));
        }
        Ok(project.to_string())
    }

    fn interpret(
        &self,
        output: &ToolOutput,
        target: &CheckTarget,
        entries: &Map<String, Value>,
    ) -> Result<Vec<ToolMessage>, EngineError> {
        let fail = || EngineError::execution(self.kind.name(), output.failure());
        match self.kind {
            LinterKind::Eslint => match output.code {
                Some(0 | 1) => {
                    parse_eslint(&output.stdout).map_err(|e| EngineError::execution("eslint", e))
                }
                _ => Err(fail()),
            },
            LinterKind::Prettier => match output.code {
                Some(0) => Ok(Vec::new()),
                Some(1) => Ok(vec![ToolMessage {
                    line: 0,
                    column: 0,
                    message: "File is not formatted according to the configured style".into(),
                    code: None,
                }]),
                _ => Err(fail()),
            },
            LinterKind::Tsc => {
                if output.code == Some(0) {
                    return Ok(Vec::new());
                }
                let messages = parse_tsc(&output.stdout, &target.path);
                if messages.is_empty() { Err(fail()) } else { Ok(messages) }
            }
            LinterKind::Pylint => match output.code {
                Some(code) if code & (1 | 32) == 0 => {
                    let symbols = pylint_symbols(entries);
                    parse_pylint(&output.stdout)
                        .map(|all| {
                            all.into_iter()
                                .filter(|m| m.code.as_deref().is_none_or(|c| symbols.contains(&c)))
                                .collect()
                        })
                        .map_err(|e| EngineError::execution("pylint", e))
                }
                _ => Err(fail()),
            },
            LinterKind::Checkstyle => {
                if output.stdout.contains("<checkstyle") {
                    Ok(parse_checkstyle(&output.stdout))
                } else if output.code == Some(0) {
                    Ok(Vec::new())
                } else {
                    Err(fail())
                }
            }
            LinterKind::Pmd => match output.code {
                Some(0 | 4) => {
                    parse_pmd(&output.stdout).map_err(|e| EngineError::execution("pmd", e))
                }
                _ => Err(fail()),
            },
            LinterKind::Golangci => match output.code {
                Some(0 | 1) => parse_golangci(&output.stdout)
                    .map_err(|e| EngineError::execution("golangci-lint", e)),
                _ => Err(fail()),
            },
        }
    }

    fn args(
        &self,
        config: &Path,
        file: &Path,
        entries: &Map<String, Value>,
    ) -> Result<Vec<OsString>, EngineError> {
        let mut args: Vec<OsString> = Vec::new();
        match self.kind {
            LinterKind::Eslint => {
                args.extend(["--no-eslintrc", "--format", "json", "--config"].map(OsString::from));
                args.push(config.into());
            }
            LinterKind::Prettier => {
                args.extend(["--check", "--config"].map(OsString::from));
                args.push(config.into());
            }
            LinterKind::Tsc => {
                args.push("--project".into());
                args.push(config.into());
                args.extend(["--noEmit", "--pretty", "false"].map(OsString::from));
                return Ok(args);
            }
            LinterKind::Pylint => {
                let symbols = pylint_symbols(entries);
                if symbols.is_empty() {
                    return Err(EngineError::invalid_params(
                        "no pylint checks map to this rule's options",
                    ));
                }
                args.push("--output-format=json".into());
                let mut rcfile = OsString::from("--rcfile=");
                rcfile.push(config);
                args.push(rcfile);
                args.push("--disable=all".into());
                args.push(format!("--enable={}", symbols.join(",")).into());
            }
            LinterKind::Checkstyle => {
                args.push("-c".into());
                args.push(config.into());
                args.extend(["-f", "xml"].map(OsString::from));
            }
            LinterKind::Pmd => {
                args.extend(["check", "--no-cache", "-f", "json", "-R"].map(OsString::from));
                args.push(config.into());
                args.push("-d".into());
            }
            LinterKind::Golangci => {
                args.extend(
                    ["run", "--output.json.path=stdout", "--show-stats=false", "--config"]
                        .map(OsString::from),
                );
                args.push(config.into());
            }
        }
        args.push(file.into());
        Ok(args)
    }
}

#[async_trait]
impl Engine for LinterEngine {
    fn name(&self) -> &str {
        self.kind.name()
    }

    #[instrument(
        skip_all,
        fields(engine = self.kind.name(), rule_id = %rule.id, file = %target.path)
    )]
    async fn check(
        &self,
        rule: &PolicyRule,
        target: &CheckTarget,
    ) -> Result<Vec<Violation>, EngineError> {
        let entries = rule
            .check
            .params
            .get("config")
            .and_then(Value::as_object)
            .filter(|m| !m.is_empty())
            .ok_or_else(|| {
                EngineError::invalid_params(format!(
                    "rule '{}' has no {} config",
                    rule.id,
                    self.kind.name()
                ))
            })?;

        let file = target.absolute_path();
        if !file.is_file() {
            return Err(EngineError::execution(
                self.kind.name(),
                format!("{} is not on disk", target.path),
            ));
        }

        let scratch = tempfile::tempdir()
            .map_err(|e| EngineError::execution(self.kind.name(), e.to_string()))?;
        let config_path = scratch.path().join(self.adapter.config_file());
        let config = self.render_config(rule, entries, &file)?;
        tokio::fs::write(&config_path, config)
            .await
            .map_err(|e| EngineError::execution(self.kind.name(), e.to_string()))?;

        let args = self.args(&config_path, &file, entries)?;
        let output = self.run(args, &target.root).await?;
        debug!(code = ?output.code, "linter finished");

        let messages = self.interpret(&output, target, entries)?;
        Ok(messages
            .into_iter()
            .map(|m| {
                let text = message_or(rule, || match &m.code {
                    Some(code) => format!("{} [{code}]", m.message),
                    None => m.message.clone(),
                });
                violation(rule, &target.path, text).at(m.line, m.column)
            })
            .collect())
    }
}

// ── Output parsers ─────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EslintFile {
    #[serde(default)]
    messages: Vec<EslintMessage>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EslintMessage {
    #[serde(default)]
    rule_id: Option<String>,
    message: String,
    #[serde(default)]
    line: usize,
    #[serde(default)]
    column: usize,
}

fn parse_eslint(stdout: &str) -> Result<Vec<ToolMessage>, String> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    let files: Vec<EslintFile> =
        serde_json::from_str(trimmed).map_err(|e| format!("unreadable eslint output: {e}"))?;
    Ok(files
        .into_iter()
        .flat_map(|f| f.messages)
        .map(|m| ToolMessage {
            line: m.line,
            column: m.column,
            message: m.message,
            code: m.rule_id,
        })
        .collect())
}

fn parse_tsc(stdout: &str, path: &str) -> Vec<ToolMessage> {
    let Ok(re) = Regex::new(r"^(.+?)\((\d+),(\d+)\): error (TS\d+): (.*)$") else {
        return Vec::new();
    };
    stdout
        .lines()
        .filter_map(|line| re.captures(line.trim_end()))
        .filter(|cap| cap[1].ends_with(path))
        .map(|cap| ToolMessage {
            line: cap[2].parse().unwrap_or(0),
            column: cap[3].parse().unwrap_or(0),
            message: cap[5].to_owned(),
            code: Some(cap[4].to_owned()),
        })
        .collect()
}

#[derive(Deserialize)]
struct PylintMessage {
    #[serde(default)]
    symbol: Option<String>,
    message: String,
    #[serde(default)]
    line: usize,
    #[serde(default)]
    column: usize,
}

fn parse_pylint(stdout: &str) -> Result<Vec<ToolMessage>, String> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    let messages: Vec<PylintMessage> =
        serde_json::from_str(trimmed).map_err(|e| format!("unreadable pylint output: {e}"))?;
    Ok(messages
        .into_iter()
        .map(|m| ToolMessage {
            line: m.line,
            // pylint columns are 0-based
            column: m.column + 1,
            message: m.message,
            code: m.symbol,
        })
        .collect())
}

/// Value of `name="..."` inside one XML tag, entities decoded.
fn xml_attr(tag: &str, name: &str) -> Option<String> {
    let start = tag.find(&format!(" {name}=\""))? + name.len() + 3;
    let end = tag[start..].find('"')? + start;
    Some(
        tag[start..end]
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&apos;", "'")
            .replace("&amp;", "&"),
    )
}

/// `<error .../>` elements of a Checkstyle XML report. The code is the
/// check's module name (`MethodNameCheck` → `MethodName`).
fn parse_checkstyle(stdout: &str) -> Vec<ToolMessage> {
    stdout
        .split("<error ")
        .skip(1)
        .filter_map(|rest| rest.split_once("/>").map(|(tag, _)| format!(" {tag}")))
        .filter_map(|tag| {
            let message = xml_attr(&tag, "message")?;
            let code = xml_attr(&tag, "source").map(|source| {
                let last = source.rsplit('.').next().unwrap_or(&source);
                last.strip_suffix("Check").unwrap_or(last).to_owned()
            });
            Some(ToolMessage {
                line: xml_attr(&tag, "line").and_then(|v| v.parse().ok()).unwrap_or(0),
                column: xml_attr(&tag, "column").and_then(|v| v.parse().ok()).unwrap_or(0),
                message,
                code,
            })
        })
        .collect()
}

#[derive(Deserialize)]
struct PmdReport {
    #[serde(default)]
    files: Vec<PmdFile>,
    #[serde(default, rename = "processingErrors")]
    processing_errors: Vec<PmdProcessingError>,
}

#[derive(Deserialize)]
struct PmdFile {
    #[serde(default)]
    violations: Vec<PmdViolation>,
}

#[derive(Deserialize)]
struct PmdViolation {
    #[serde(default, alias = "beginLine")]
    beginline: usize,
    #[serde(default, alias = "beginColumn")]
    begincolumn: usize,
    description: String,
    #[serde(default)]
    rule: Option<String>,
}

#[derive(Deserialize)]
struct PmdProcessingError {
    #[serde(default)]
    message: String,
}

fn parse_pmd(stdout: &str) -> Result<Vec<ToolMessage>, String> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    let report: PmdReport =
        serde_json::from_str(trimmed).map_err(|e| format!("unreadable pmd output: {e}"))?;
    if let Some(error) = report.processing_errors.first() {
        return Err(format!("pmd processing error: {}", error.message));
    }
    Ok(report
        .files
        .into_iter()
        .flat_map(|f| f.violations)
        .map(|v| ToolMessage {
            line: v.beginline,
            column: v.begincolumn,
            message: v.description.trim().to_owned(),
            code: v.rule,
        })
        .collect())
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GolangciReport {
    #[serde(default)]
    issues: Option<Vec<GolangciIssue>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GolangciIssue {
    from_linter: String,
    text: String,
    pos: GolangciPos,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GolangciPos {
    #[serde(default)]
    line: usize,
    #[serde(default)]
    column: usize,
}

fn parse_golangci(stdout: &str) -> Result<Vec<ToolMessage>, String> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    // the JSON report is the first line; anything after is human summary
    let json = trimmed.lines().next().unwrap_or(trimmed);
    let report: GolangciReport =
        serde_json::from_str(json).map_err(|e| format!("unreadable golangci-lint output: {e}"))?;
    Ok(report
        .issues
        .unwrap_or_default()
        .into_iter()
        .map(|i| ToolMessage {
            line: i.pos.line,
            column: i.pos.column,
            message: i.text,
            code: Some(i.from_linter),
        })
        .collect())
}

/// Pylint checks governed by the configured options.
fn pylint_symbols(entries: &Map<String, Value>) -> Vec<&'static str> {
    let mut out = Vec::new();
    for key in entries.keys() {
        let symbol = match key.as_str() {
            "FORMAT.max-line-length" => "line-too-long",
            "FORMAT.max-module-lines" => "too-many-lines",
            "FORMAT.indent-string" => "bad-indentation",
            "DESIGN.max-args" => "too-many-arguments",
            "DESIGN.max-branches" => "too-many-branches",
            "DESIGN.max-nested-blocks" => "too-many-nested-blocks",
            k if k.starts_with("BASIC.") && k.ends_with("-naming-style") => "invalid-name",
            _ => continue,
        };
        if !out.contains(&symbol) {
            out.push(symbol);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::rule;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn eslint_output() {
        let out = r#"[{"filePath":"/r/a.js","messages":[
            {"ruleId":"no-console","severity":2,"message":"Unexpected console statement.",
             "line":3,"column":5},
            {"ruleId":null,"severity":2,"message":"Parsing error","line":1,"column":1}
        ]}]"#;
        let msgs = parse_eslint(out).unwrap();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].code.as_deref(), Some("no-console"));
        assert_eq!((msgs[0].line, msgs[0].column), (3, 5));
        assert_eq!(msgs[1].code, None);
        assert!(parse_eslint("").unwrap().is_empty());
        assert!(parse_eslint("Oops").is_err());
    }

    #[test]
    fn tsc_output_filtered_to_target() {
        let out = "src/a.ts(4,7): error TS7006: Parameter 'x' implicitly has an 'any' type.\n\
                   lib/other.ts(1,1): error TS2304: Cannot find name 'y'.\n";
        let msgs = parse_tsc(out, "src/a.ts");
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].code.as_deref(), Some("TS7006"));
        assert_eq!((msgs[0].line, msgs[0].column), (4, 7));
    }

    #[test]
    fn pylint_output() {
        let out = r#"[{"type":"convention","line":2,"column":0,"symbol":"line-too-long",
            "message":"Line too long (120/100)","message-id":"C0301"}]"#;
        let msgs = parse_pylint(out).unwrap();
        assert_eq!(msgs[0].column, 1);
        assert_eq!(msgs[0].code.as_deref(), Some("line-too-long"));
    }

    #[test]
    fn pylint_symbols_follow_options() {
        let entries = json!({
            "FORMAT.max-line-length": 100,
            "BASIC.function-naming-style": "snake_case",
            "BASIC.class-naming-style": "PascalCase",
            "MASTER.jobs": 1
        });
        let mut symbols = pylint_symbols(entries.as_object().unwrap());
        symbols.sort_unstable();
        assert_eq!(symbols, vec!["invalid-name", "line-too-long"]);
    }

    #[test]
    fn checkstyle_report() {
        let out = r#"<?xml version="1.0" encoding="UTF-8"?>
<checkstyle version="10.12.0">
<file name="/repo/src/App.java">
<error line="3" column="17" severity="warning"
 message="Name &apos;Do_Thing&apos; must match pattern &apos;^[a-z][a-zA-Z0-9]*$&apos;."
 source="com.puppycrawl.tools.checkstyle.checks.naming.MethodNameCheck"/>
<error line="9" severity="error"
 message="Line is longer than 100 characters (found 120)."
 source="com.puppycrawl.tools.checkstyle.checks.sizes.LineLengthCheck"/>
</file>
</checkstyle>"#;
        let msgs = parse_checkstyle(out);
        assert_eq!(msgs.len(), 2);
        assert_eq!((msgs[0].line, msgs[0].column), (3, 17));
        assert_eq!(msgs[0].code.as_deref(), Some("MethodName"));
        assert!(msgs[0].message.starts_with("Name 'Do_Thing' must match"));
        assert_eq!((msgs[1].line, msgs[1].column), (9, 0));
        assert_eq!(msgs[1].code.as_deref(), Some("LineLength"));
    }

    #[test]
    fn checkstyle_without_report_is_a_failure() {
        let engine = LinterEngine::new(LinterKind::Checkstyle);
        let t = crate::engine::test_support::target("App.java", "x\n");
        let entries = Map::new();
        let crashed = ToolOutput {
            code: Some(254),
            stdout: String::new(),
            stderr: "cannot initialize module".into(),
        };
        assert_matches!(
            engine.interpret(&crashed, &t, &entries),
            Err(EngineError::Execution { .. })
        );
    }

    #[test]
    fn pmd_report() {
        let out = r#"{"formatVersion":0,"pmdVersion":"7.0.0",
            "files":[{"filename":"/r/A.java","violations":[
            {"beginline":12,"begincolumn":5,"endline":14,"endcolumn":6,
             "description":"Avoid empty catch blocks",
             "rule":"EmptyCatchBlock","ruleset":"Error Prone","priority":3}]}],
            "processingErrors":[]}"#;
        let msgs = parse_pmd(out).unwrap();
        assert_eq!(msgs.len(), 1);
        assert_eq!((msgs[0].line, msgs[0].column), (12, 5));
        assert_eq!(msgs[0].code.as_deref(), Some("EmptyCatchBlock"));

        let broken =
            r#"{"files":[],"processingErrors":[{"filename":"A.java","message":"ParseException"}]}"#;
        assert!(parse_pmd(broken).unwrap_err().contains("ParseException"));
    }

    #[test]
    fn golangci_report() {
        let out = "{\"Issues\":[{\"FromLinter\":\"errcheck\",\
                   \"Text\":\"Error return value is not checked\",\
                   \"Pos\":{\"Filename\":\"main.go\",\"Line\":7,\"Column\":9}}],\"Report\":{}}\n\
                   1 issues:\n* errcheck: 1\n";
        let msgs = parse_golangci(out).unwrap();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].code.as_deref(), Some("errcheck"));
        assert_eq!((msgs[0].line, msgs[0].column), (7, 9));
        assert!(parse_golangci("{\"Issues\":null}").unwrap().is_empty());
    }

    #[test]
    fn pmd_args_point_at_ruleset_and_file() {
        let engine = LinterEngine::new(LinterKind::Pmd);
        let args = engine
            .args(Path::new("/tmp/pmd.xml"), Path::new("/repo/A.java"), &Map::new())
            .unwrap();
        let args: Vec<_> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            vec!["check", "--no-cache", "-f", "json", "-R", "/tmp/pmd.xml", "-d", "/repo/A.java"]
        );
    }

    #[test]
    fn prettier_exit_codes() {
        let engine = LinterEngine::new(LinterKind::Prettier);
        let t = crate::engine::test_support::target("a.js", "x\n");
        let entries = Map::new();
        let ok = ToolOutput { code: Some(0), stdout: String::new(), stderr: String::new() };
        assert!(engine.interpret(&ok, &t, &entries).unwrap().is_empty());
        let unformatted =
            ToolOutput { code: Some(1), stdout: String::new(), stderr: "[warn] a.js".into() };
        assert_eq!(engine.interpret(&unformatted, &t, &entries).unwrap().len(), 1);
        let broken =
            ToolOutput { code: Some(2), stdout: String::new(), stderr: "SyntaxError".into() };
        assert_matches!(
            engine.interpret(&broken, &t, &entries),
            Err(EngineError::Execution { message, .. }) if message.contains("SyntaxError")
        );
    }

    #[test]
    fn tsc_config_lists_the_file() {
        let engine = LinterEngine::new(LinterKind::Tsc);
        let r = rule("tsc", json!({}));
        let entries = json!({"strict": true});
        let text = engine
            .render_config(&r, entries.as_object().unwrap(), Path::new("/repo/src/a.ts"))
            .unwrap();
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["files"], json!(["/repo/src/a.ts"]));
        assert_eq!(parsed["compilerOptions"]["strict"], true);
    }

    #[tokio::test]
    async fn missing_config_is_invalid() {
        let engine = LinterEngine::new(LinterKind::Eslint);
        let t = crate::engine::test_support::target("a.js", "x\n");
        let err = engine.check(&rule("eslint", json!({})), &t).await.unwrap_err();
        assert_matches!(err, EngineError::InvalidParams { .. });
    }

    #[tokio::test]
    async fn missing_tool_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.js"), "var x = 1;\n").unwrap();
        let change = crate::changes::FileChange::modified("a.js", "var x = 1;\n");
        let t = CheckTarget::new(&change, dir.path());
        let r = rule("eslint", json!({"config": {"no-var": "error"}}));
        let engine =
            LinterEngine::new(LinterKind::Eslint).with_program("definitely-not-eslint-xyz");
        let err = engine.check(&r, &t).await.unwrap_err();
        assert_matches!(err, EngineError::Unavailable { engine, .. } if engine == "eslint");
    }
}
