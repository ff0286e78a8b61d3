//! Change set sources.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::errors::ValidatorError;

/// How a file changed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStatus {
    /// New tracked file.
    Added,
    /// Modified file.
    Modified,
    /// Removed file; skipped by every check.
    Deleted,
    /// Renamed or copied file.
    Renamed,
    /// Not yet tracked.
    Untracked,
}

impl ChangeStatus {
    /// Parse a `--name-status` letter (`A`, `M`, `D`, `R100`, `C75`, `T`).
    pub fn from_letter(code: &str) -> Self {
        match code.chars().next() {
            Some('A') => Self::Added,
            Some('D') => Self::Deleted,
            Some('R' | 'C') => Self::Renamed,
            Some('?') => Self::Untracked,
            _ => Self::Modified,
        }
    }
}

/// One changed file with its diff (or full content for untracked files).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FileChange {
    /// Path relative to the repository root.
    pub path: String,
    /// Change kind.
    pub status: ChangeStatus,
    /// Unified diff, or plain content when there is no diff.
    pub diff: String,
}

impl FileChange {
    /// Modified file with a diff.
    pub fn modified(path: impl Into<String>, diff: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            status: ChangeStatus::Modified,
            diff: diff.into(),
        }
    }

    /// Whether checks should skip this file.
    pub fn is_deleted(&self) -> bool {
        self.status == ChangeStatus::Deleted
    }

    /// Whether the path falls under any of `scopes` (`.` or empty selects everything).
    pub fn within<S: AsRef<str>>(&self, scopes: &[S]) -> bool {
        if scopes.is_empty() {
            return true;
        }
        scopes.iter().any(|scope| {
            let scope = scope.as_ref().trim_start_matches("./").trim_end_matches('/');
            scope.is_empty()
                || scope == "."
                || self.path == scope
                || self.path.starts_with(&format!("{scope}/"))
        })
    }
}

/// Provides the change set for a validation call.
#[async_trait]
pub trait ChangeSource: Send + Sync {
    /// Changed files. Failure is fatal for the call.
    async fn changes(&self) -> Result<Vec<FileChange>, ValidatorError>;
}

/// Fixed change set.
#[derive(Clone, Debug, Default)]
pub struct StaticChanges(pub Vec<FileChange>);

#[async_trait]
impl ChangeSource for StaticChanges {
    async fn changes(&self) -> Result<Vec<FileChange>, ValidatorError> {
        Ok(self.0.clone())
    }
}

/// Reads changes from a git working tree.
///
/// Default mode compares the working tree with `HEAD` and adds untracked
/// files; staged-only mode compares the index with `HEAD`.
#[derive(Clone, Debug)]
pub struct GitChangeReader {
    root: PathBuf,
    staged_only: bool,
    program: String,
}

impl GitChangeReader {
    /// Reader for the repository at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            staged_only: false,
            program: "git".into(),
        }
    }

    /// Only consider staged changes.
    #[must_use]
    pub fn staged_only(mut self, staged_only: bool) -> Self {
        self.staged_only = staged_only;
        self
    }

    /// Use a different git executable.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Repository root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn git(&self, args: &[&str]) -> Result<String, ValidatorError> {
        let output = Command::new(&self.program)
            .args(args)
            .current_dir(&self.root)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ValidatorError::Changes {
                message: format!("failed to run {}: {e}", self.program),
            })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ValidatorError::Changes {
                message: format!("git {} failed: {}", args.join(" "), stderr.trim()),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn untracked(&self) -> Result<Vec<FileChange>, ValidatorError> {
        let listing = self.git(&["ls-files", "--others", "--exclude-standard"]).await?;
        let mut out = Vec::new();
        for path in listing.lines().map(str::trim).filter(|l| !l.is_empty()) {
            match tokio::fs::read_to_string(self.root.join(path)).await {
                Ok(content) => out.push(FileChange {
                    path: path.to_owned(),
                    status: ChangeStatus::Untracked,
                    diff: content,
                }),
                Err(e) => debug!(path, error = %e, "skipping unreadable untracked file"),
            }
        }
        Ok(out)
    }
}

/// Parse `git diff --name-status` output into `(status, path)` pairs.
///
/// Renames and copies report the destination path.
pub fn parse_name_status(output: &str) -> Vec<(ChangeStatus, String)> {
    output
        .lines()
        .filter_map(|line| {
            let mut parts = line.split('\t').filter(|p| !p.is_empty());
            let code = parts.next()?.trim();
            let path = parts.last()?.trim();
            (!path.is_empty()).then(|| (ChangeStatus::from_letter(code), path.to_owned()))
        })
        .collect()
}

#[async_trait]
impl ChangeSource for GitChangeReader {
    async fn changes(&self) -> Result<Vec<FileChange>, ValidatorError> {
        let listing = if self.staged_only {
            self.git(&["diff", "--cached", "--name-status"]).await?
        } else {
            self.git(&["diff", "--name-status", "HEAD"]).await?
        };

        let mut changes = Vec::new();
        for (status, path) in parse_name_status(&listing) {
            let diff = if self.staged_only {
                self.git(&["diff", "--cached", "--", &path]).await
            } else {
                self.git(&["diff", "HEAD", "--", &path]).await
            };
            match diff {
                Ok(diff) => changes.push(FileChange { path, status, diff }),
                Err(e) => warn!(path = %path, error = %e, "skipping file without diff"),
            }
        }

        if !self.staged_only {
            changes.extend(self.untracked().await?);
        }
        debug!(count = changes.len(), staged_only = self.staged_only, "collected changes");
        Ok(changes)
    }
}
