//! Rule selectors against changed paths.

use globset::{GlobBuilder, GlobMatcher};
use sym_core::PolicyRule;
use sym_core::language::file_matches_languages;
use tracing::debug;

/// Whether `rule` applies to `path`.
///
/// Languages are matched by extension. Include globs, when present, must
/// match; exclude globs must not. Patterns without `/` match the file name
/// as well as the full path.
pub fn rule_applies(rule: &PolicyRule, path: &str) -> bool {
    let Some(when) = &rule.when else {
        return true;
    };
    if !file_matches_languages(path, &when.languages) {
        return false;
    }
    if !when.include.is_empty() && !any_glob(&when.include, path) {
        return false;
    }
    !any_glob(&when.exclude, path)
}

fn any_glob(patterns: &[String], path: &str) -> bool {
    let name = path.rsplit('/').next().unwrap_or(path);
    patterns.iter().any(|pattern| {
        compile(pattern).is_some_and(|glob| {
            glob.is_match(path) || (!pattern.contains('/') && glob.is_match(name))
        })
    })
}

fn compile(pattern: &str) -> Option<GlobMatcher> {
    match GlobBuilder::new(pattern).literal_separator(true).build() {
        Ok(glob) => Some(glob.compile_matcher()),
        Err(e) => {
            debug!(pattern, error = %e, "ignoring invalid glob");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sym_core::{CheckSpec, Selector, Severity};

    fn rule(languages: &[&str], include: &[&str], exclude: &[&str]) -> PolicyRule {
        let strings = |v: &[&str]| v.iter().map(ToString::to_string).collect::<Vec<_>>();
        PolicyRule {
            id: "R".into(),
            enabled: true,
            category: String::new(),
            severity: Severity::Error,
            desc: String::new(),
            when: Some(Selector {
                languages: strings(languages),
                include: strings(include),
                exclude: strings(exclude),
            }),
            check: CheckSpec::engine("pattern"),
            remedy: None,
            message: String::new(),
        }
    }

    #[test]
    fn no_selector_matches_everything() {
        let mut r = rule(&[], &[], &[]);
        r.when = None;
        assert!(rule_applies(&r, "anything/at/all.txt"));
    }

    #[test]
    fn language_filter() {
        let r = rule(&["javascript"], &[], &[]);
        assert!(rule_applies(&r, "src/app.js"));
        assert!(!rule_applies(&r, "src/app.py"));
    }

    #[test]
    fn include_and_exclude() {
        let r = rule(&[], &["src/**/*.ts"], &["*.test.ts"]);
        assert!(rule_applies(&r, "src/a/b.ts"));
        assert!(!rule_applies(&r, "lib/b.ts"));
        assert!(!rule_applies(&r, "src/a/b.test.ts"));
    }

    #[test]
    fn invalid_glob_is_ignored() {
        let r = rule(&[], &[], &["[unclosed"]);
        assert!(rule_applies(&r, "a.js"));
    }
}
