//! Unified diff parsing.

/// A line added by a change, numbered in the new file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddedLine {
    /// 1-based line number in the new file.
    pub line: usize,
    /// Line text without the leading `+`.
    pub text: String,
}

/// Added lines of a unified diff.
///
/// `+++` headers are skipped. Line numbers follow the `@@ -a,b +c,d @@`
/// hunk headers. Text without any hunk header is treated as new file
/// content and every line is returned.
pub fn added_lines(diff: &str) -> Vec<AddedLine> {
    if diff.trim().is_empty() {
        return Vec::new();
    }
    if !diff.lines().any(|l| l.starts_with("@@")) {
        return diff
            .lines()
            .enumerate()
            .map(|(i, text)| AddedLine {
                line: i + 1,
                text: text.to_owned(),
            })
            .collect();
    }

    let mut out = Vec::new();
    let mut next_line = 0usize;
    let mut in_hunk = false;
    for raw in diff.lines() {
        if raw.starts_with("@@") {
            next_line = hunk_start(raw).unwrap_or(1);
            in_hunk = true;
            continue;
        }
        if !in_hunk {
            continue;
        }
        if raw.starts_with("+++") {
            continue;
        }
        if let Some(text) = raw.strip_prefix('+') {
            out.push(AddedLine {
                line: next_line,
                text: text.to_owned(),
            });
            next_line += 1;
        } else if !raw.starts_with('-') && !raw.starts_with('\\') {
            // context line; removals and "\ No newline" markers do not advance
            next_line += 1;
        }
    }
    out
}

/// New-file start line of a hunk header (`@@ -1,4 +10,6 @@` → 10).
fn hunk_start(header: &str) -> Option<usize> {
    let plus = header.split_whitespace().find(|part| part.starts_with('+'))?;
    plus[1..].split(',').next()?.parse().ok()
}

/// Concatenated text of added lines.
pub fn joined(lines: &[AddedLine]) -> String {
    lines.iter().map(|l| l.text.as_str()).collect::<Vec<_>>().join("\n")
}
