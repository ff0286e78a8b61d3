//! Checkstyle adapter: Java modules in `checkstyle.xml`.
//!
//! Entries are keyed by module name; the value holds the module's
//! properties. File-level modules sit under `Checker`, the rest under
//! `TreeWalker`.

use std::fmt::Write as _;

use serde_json::{Map, Value, json};
use sym_core::{Severity, UserRule};
use sym_llm::RuleIntent;

use super::{AdapterRule, LinterAdapter, declares_any, mentions, merge_entries, xml_escape};
use crate::errors::ConvertError;

/// Modules the adapter may emit, with the properties each accepts.
pub const CHECKSTYLE_MODULES: &[(&str, &[&str])] = &[
    ("TypeName", &["format", "tokens"]),
    (
        "MethodName",
        &[
            "format",
            "allowClassName",
            "applyToPublic",
            "applyToProtected",
            "applyToPackage",
            "applyToPrivate",
        ],
    ),
    (
        "MemberName",
        &["format", "applyToPublic", "applyToProtected", "applyToPackage", "applyToPrivate"],
    ),
    ("ParameterName", &["format", "ignoreOverridden", "accessModifiers"]),
    ("LocalVariableName", &["format", "allowOneCharVarInForLoop"]),
    ("StaticVariableName", &["format"]),
    (
        "ConstantName",
        &["format", "applyToPublic", "applyToProtected", "applyToPackage", "applyToPrivate"],
    ),
    ("LineLength", &["max", "ignorePattern", "fileExtensions"]),
    ("MethodLength", &["max", "countEmpty", "tokens"]),
    ("ParameterNumber", &["max", "ignoreOverriddenMethods", "tokens"]),
    ("FileLength", &["max", "fileExtensions"]),
    ("Indentation", &["basicOffset", "braceAdjustment", "caseIndent", "lineWrappingIndentation"]),
    ("NeedBraces", &["allowSingleLineStatement", "allowEmptyLoopBody", "tokens"]),
    ("AvoidStarImport", &["excludes", "allowClassImports", "allowStaticMemberImports"]),
    ("IllegalImport", &["illegalPkgs", "illegalClasses", "regexp"]),
    ("UnusedImports", &["processJavadoc"]),
    ("CyclomaticComplexity", &["max", "switchBlockAsSingleDecisionPoint", "tokens"]),
    ("NPathComplexity", &["max"]),
    ("NestedIfDepth", &["max"]),
    ("EmptyBlock", &["option", "tokens"]),
    (
        "MagicNumber",
        &["ignoreNumbers", "ignoreHashCodeMethod", "ignoreAnnotation", "ignoreFieldDeclaration"],
    ),
    ("MissingJavadocMethod", &["minLineCount", "scope", "excludeScope"]),
];

/// Modules that must be children of `Checker` rather than `TreeWalker`.
const CHECKER_LEVEL: &[&str] =
    &["LineLength", "FileLength", "FileTabCharacter", "NewlineAtEndOfFile"];

/// Checkstyle adapter.
#[derive(Clone, Copy, Debug, Default)]
pub struct CheckstyleAdapter;

fn allowed_properties(module: &str) -> Option<&'static [&'static str]> {
    CHECKSTYLE_MODULES.iter().find(|(name, _)| *name == module).map(|(_, props)| *props)
}

fn level(rule: &UserRule) -> &'static str {
    let given = if rule.severity.is_empty() { "error" } else { &rule.severity };
    match Severity::from_str_lossy(given) {
        Severity::Error => "error",
        Severity::Warning => "warning",
        Severity::Info => "info",
    }
}

/// Identifier regex for a naming convention.
fn case_format(case: &str) -> Option<&'static str> {
    match case {
        "camelCase" => Some("^[a-z][a-zA-Z0-9]*$"),
        "PascalCase" => Some("^[A-Z][a-zA-Z0-9]*$"),
        "snake_case" => Some("^[a-z][a-z0-9_]*$"),
        "UPPER_CASE" | "SCREAMING_SNAKE_CASE" => Some("^[A-Z][A-Z0-9]*(_[A-Z0-9]+)*$"),
        _ => None,
    }
}

fn prop_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl CheckstyleAdapter {
    fn module(rule: &UserRule, intent: &RuleIntent) -> Option<(String, Map<String, Value>)> {
        let mut props = Map::new();
        let mut set = |key: &str, value: String| {
            let _ = props.insert(key.to_owned(), Value::String(value));
        };

        if let Some(name) = intent.param_str("checkstyleModule") {
            let allowed = allowed_properties(name)?;
            if let Some(given) = intent.params.get("properties").and_then(Value::as_object) {
                let permitted = given.iter().filter(|(key, _)| allowed.contains(&key.as_str()));
                for (key, value) in permitted {
                    if let Some(value) = prop_string(value) {
                        set(key, value);
                    }
                }
            }
            return Some((name.to_owned(), props));
        }

        let max = intent.param_u64("max");
        let scope = if intent.scope.is_empty() {
            intent.target.as_str()
        } else {
            intent.scope.as_str()
        };
        let module = match intent.engine.as_str() {
            "length" => {
                let max = max?;
                set("max", max.to_string());
                if mentions(rule, intent, &["param", "argument"]) {
                    "ParameterNumber"
                } else if matches!(scope, "function" | "method") {
                    "MethodLength"
                } else if scope == "file" {
                    "FileLength"
                } else if matches!(scope, "line" | "content" | "") {
                    "LineLength"
                } else {
                    return None;
                }
            }
            "pattern" => {
                if let Some(format) = intent.param_str("case").and_then(case_format) {
                    set("format", format.to_owned());
                    match intent.target.as_str() {
                        "class" | "type" | "interface" => "TypeName",
                        "function" | "method" => "MethodName",
                        "parameter" => "ParameterName",
                        "constant" => "ConstantName",
                        "field" | "member" => "MemberName",
                        _ if mentions(rule, intent, &["field", "member"]) => "MemberName",
                        _ if intent.param_str("case") == Some("UPPER_CASE") => "ConstantName",
                        _ => "LocalVariableName",
                    }
                } else if mentions(
                    rule,
                    intent,
                    &["star import", "wildcard import", "import *", ".*;"],
                ) {
                    "AvoidStarImport"
                } else if mentions(rule, intent, &["unused import"]) {
                    "UnusedImports"
                } else if mentions(rule, intent, &["magic number"]) {
                    "MagicNumber"
                } else if mentions(rule, intent, &["brace"]) {
                    "NeedBraces"
                } else if mentions(rule, intent, &["empty block"]) {
                    "EmptyBlock"
                } else {
                    return None;
                }
            }
            "style" => {
                let indent = intent.param_u64("indent")?;
                set("basicOffset", indent.to_string());
                "Indentation"
            }
            "ast" => {
                let max = intent.param_u64("maxDepth").or(max)?;
                set("max", max.to_string());
                if mentions(rule, intent, &["complexity", "cyclomatic"]) {
                    "CyclomaticComplexity"
                } else if mentions(rule, intent, &["npath"]) {
                    "NPathComplexity"
                } else {
                    "NestedIfDepth"
                }
            }
            _ => return None,
        };
        Some((module.to_owned(), props))
    }
}

fn render_module(out: &mut String, indent: &str, name: &str, props: &Map<String, Value>) {
    if props.is_empty() {
        let _ = writeln!(out, "{indent}<module name=\"{}\"/>", xml_escape(name));
        return;
    }
    let _ = writeln!(out, "{indent}<module name=\"{}\">", xml_escape(name));
    for (key, value) in props {
        let value = prop_string(value).unwrap_or_default();
        let _ = writeln!(
            out,
            "{indent}  <property name=\"{}\" value=\"{}\"/>",
            xml_escape(key),
            xml_escape(&value)
        );
    }
    let _ = writeln!(out, "{indent}</module>");
}

impl LinterAdapter for CheckstyleAdapter {
    fn name(&self) -> &'static str {
        "checkstyle"
    }

    fn supported_languages(&self) -> &'static [&'static str] {
        &["java"]
    }

    /// Exact match, so `javascript` is not taken for `java`.
    fn applies_to(&self, languages: &[String]) -> bool {
        declares_any(languages, &["java"])
    }

    fn config_file(&self) -> &'static str {
        "checkstyle.xml"
    }

    fn convert(
        &self,
        rule: &UserRule,
        intent: &RuleIntent,
    ) -> Result<Option<AdapterRule>, ConvertError> {
        let Some((module, mut props)) = Self::module(rule, intent) else {
            return Ok(None);
        };
        let _ = props.insert("severity".into(), json!(level(rule)));
        let mut entries = Map::new();
        let _ = entries.insert(module, Value::Object(props));
        Ok(Some(AdapterRule {
            rule_id: rule.id.clone(),
            entries,
        }))
    }

    fn build_config(&self, rules: &[AdapterRule]) -> Result<String, ConvertError> {
        let merged = merge_entries(rules);
        let empty = Map::new();
        let props = |value: &Value| value.as_object().cloned().unwrap_or_else(|| empty.clone());

        let mut out = String::from(
            "<?xml version=\"1.0\"?>\n\
             <!DOCTYPE module PUBLIC\n    \
             \"-//Checkstyle//DTD Checkstyle Configuration 1.3//EN\"\n    \
             \"https://checkstyle.org/dtds/configuration_1_3.dtd\">\n\
             <module name=\"Checker\">\n",
        );
        let (checker, walker): (Vec<_>, Vec<_>) =
            merged.iter().partition(|(name, _)| CHECKER_LEVEL.contains(&name.as_str()));
        for (name, value) in checker {
            render_module(&mut out, "  ", name, &props(value));
        }
        out.push_str("  <module name=\"TreeWalker\">\n");
        for (name, value) in walker {
            render_module(&mut out, "    ", name, &props(value));
        }
        out.push_str("  </module>\n</module>\n");
        Ok(out)
    }
}
