//! Persisting conversion results.

use std::path::{Path, PathBuf};

use sym_core::fs::{DEFAULT_LOCK_TIMEOUT, FileLock, atomic_write, write_json_atomic};
use tracing::info;

use crate::converter::ConvertOutcome;
use crate::errors::ConvertError;

fn write_err(path: &Path) -> impl FnOnce(std::io::Error) -> ConvertError + '_ {
    move |source| ConvertError::Write {
        path: path.display().to_string(),
        source,
    }
}

/// Write the compiled policy and every generated linter config.
///
/// The code policy is written under its lock; each file is replaced
/// atomically. Returns the written paths, code policy first.
pub fn write_outputs(
    outcome: &ConvertOutcome,
    output_dir: &Path,
    code_policy_path: &Path,
) -> Result<Vec<PathBuf>, ConvertError> {
    let mut written = Vec::with_capacity(outcome.generated_files.len() + 1);

    {
        let _lock = FileLock::acquire(code_policy_path, DEFAULT_LOCK_TIMEOUT)
            .map_err(write_err(code_policy_path))?;
        write_json_atomic(code_policy_path, &outcome.code_policy)
            .map_err(write_err(code_policy_path))?;
    }
    written.push(code_policy_path.to_path_buf());

    for file in &outcome.generated_files {
        let path = output_dir.join(&file.file_name);
        atomic_write(&path, file.content.as_bytes()).map_err(write_err(&path))?;
        written.push(path);
    }

    info!(files = written.len(), dir = %output_dir.display(), "conversion outputs written");
    Ok(written)
}
