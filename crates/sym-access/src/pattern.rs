//! Path pattern matching for write permissions.
//!
//! Rules, in order:
//! 1. Patterns containing a single `**` split into prefix and suffix. The
//!    path must start with the prefix; the remainder must contain or end
//!    with the suffix (`*` suffix matches anything, `dir/*` suffix requires
//!    the directory somewhere in the remainder, a suffix with wildcards is
//!    matched segment-wise against any run of trailing segments).
//! 2. Other patterns with `*`, `?` or `[` match segment-wise (wildcards do not cross `/`).
//! 3. Patterns ending in `/` match as a directory prefix.
//! 4. Anything else matches exactly or as the root of a subtree.

use globset::GlobBuilder;

/// Whether `path` matches `pattern`. Backslashes are treated as `/`.
pub fn match_pattern(pattern: &str, path: &str) -> bool {
    let pattern = pattern.replace('\\', "/");
    let path = path.replace('\\', "/");
    let path = path.trim_start_matches("./");

    if pattern.contains("**") {
        let parts: Vec<&str> = pattern.split("**").collect();
        if let [head, tail] = parts.as_slice() {
            return match_double_star(head, tail, path);
        }
    }

    if has_wildcard(&pattern) {
        return match_segment_glob(&pattern, path);
    }

    if pattern.ends_with('/') {
        return path.starts_with(pattern.as_str());
    }

    path == pattern || path.starts_with(&format!("{pattern}/"))
}

fn match_double_star(head: &str, tail: &str, path: &str) -> bool {
    let prefix = head.strip_suffix('/').unwrap_or(head);
    let suffix = tail.strip_prefix('/').unwrap_or(tail);

    if !prefix.is_empty() && !path.starts_with(prefix) {
        return false;
    }
    if suffix.is_empty() {
        return true;
    }

    let remaining = if prefix.is_empty() {
        path
    } else {
        path.strip_prefix(&format!("{prefix}/")).unwrap_or(path)
    };

    if suffix == "*" {
        return true;
    }
    if let Some(dir) = suffix.strip_suffix("/*") {
        if !has_wildcard(dir) {
            let needle = format!("{dir}/");
            return remaining.contains(&needle);
        }
    }
    if has_wildcard(suffix) {
        return match_trailing_segments(suffix, remaining);
    }
    remaining.contains(suffix)
}

/// Match a wildcard suffix against any contiguous run of segments that ends the path.
fn match_trailing_segments(suffix: &str, remaining: &str) -> bool {
    let wanted = suffix.split('/').count();
    let segments: Vec<&str> = remaining.split('/').collect();
    if segments.len() < wanted {
        return false;
    }
    let tail = segments[segments.len() - wanted..].join("/");
    match_segment_glob(suffix, &tail)
}

fn match_segment_glob(pattern: &str, path: &str) -> bool {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map(|g| g.compile_matcher().is_match(path))
        .unwrap_or(false)
}

fn has_wildcard(s: &str) -> bool {
    s.contains(['*', '?', '['])
}
