//! Policy file persistence.

use std::io;
use std::path::{Path, PathBuf};

use metrics::counter;
use sym_core::UserPolicy;
use sym_core::fs::{DEFAULT_LOCK_TIMEOUT, FileLock, read_json_opt, write_json_atomic};
use tracing::{debug, info};

use crate::document::PolicyDocument;
use crate::errors::PolicyError;
use crate::validate::validate_policy;

/// Outcome of [`PolicyStore::update`].
#[derive(Clone, Debug)]
pub struct Committed<T> {
    /// Value returned by the edit closure.
    pub outcome: T,
    /// Policy after the edit.
    pub policy: UserPolicy,
    /// Whether the file was rewritten.
    pub saved: bool,
}

/// The `user-policy.json` file.
///
/// Every edit runs load → mutate → validate → atomic write while holding the
/// sibling lock file, so two processes editing at once serialize instead of
/// overwriting each other.
#[derive(Clone, Debug)]
pub struct PolicyStore {
    path: PathBuf,
}

impl PolicyStore {
    /// Store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Policy file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the policy file exists.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Load the policy. A missing file yields a fresh policy with the default categories.
    pub async fn load(&self) -> Result<PolicyDocument, PolicyError> {
        let path = self.path.clone();
        self.blocking(move || read_document(&path)).await
    }

    /// Apply `edit` under the file lock and save if it changed anything.
    ///
    /// The document is validated before writing; a failing policy is not saved.
    pub async fn update<T, F>(&self, edit: F) -> Result<Committed<T>, PolicyError>
    where
        T: Send + 'static,
        F: FnOnce(&mut PolicyDocument) -> T + Send + 'static,
    {
        let path = self.path.clone();
        let committed = self
            .blocking(move || {
                let _lock = FileLock::acquire(&path, DEFAULT_LOCK_TIMEOUT)
                    .map_err(|e| io_error(&path, e))?;
                let mut doc = read_document(&path)?;
                let outcome = edit(&mut doc);
                let saved = doc.is_dirty();
                let policy = doc.into_policy();
                if saved {
                    validate_policy(&policy)?;
                    write_json_atomic(&path, &policy).map_err(|e| io_error(&path, e))?;
                }
                Ok(Committed { outcome, policy, saved })
            })
            .await?;

        if committed.saved {
            counter!("policy_saves_total").increment(1);
            info!(
                path = %self.path.display(),
                rules = committed.policy.rules.len(),
                "policy saved"
            );
        }
        Ok(committed)
    }

    /// Replace the stored policy after validating it.
    pub async fn save(&self, policy: UserPolicy) -> Result<(), PolicyError> {
        validate_policy(&policy)?;
        let _ = self
            .update(move |doc| {
                *doc = PolicyDocument::new(policy);
                doc.mark_dirty();
            })
            .await?;
        Ok(())
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, PolicyError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, PolicyError> + Send + 'static,
    {
        tokio::task::spawn_blocking(f)
            .await
            .map_err(|e| io_error(&self.path, io::Error::other(e)))?
    }
}

fn io_error(path: &Path, source: io::Error) -> PolicyError {
    PolicyError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn read_document(path: &Path) -> Result<PolicyDocument, PolicyError> {
    match read_json_opt::<UserPolicy>(path).map_err(|e| io_error(path, e))? {
        Some(policy) => Ok(PolicyDocument::new(policy)),
        None => {
            debug!(path = %path.display(), "no policy file, starting fresh");
            Ok(PolicyDocument::fresh())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use sym_core::{CategoryDef, UserRbac, UserRole};

    fn store() -> (tempfile::TempDir, PolicyStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = PolicyStore::new(dir.path().join(".sym/user-policy.json"));
        (dir, store)
    }

    #[tokio::test]
    async fn missing_file_loads_fresh() {
        let (_dir, store) = store();
        assert!(!store.exists());
        let doc = store.load().await.unwrap();
        assert!(doc.has_category("testing"));
    }

    #[tokio::test]
    async fn successful_edit_is_saved() {
        let (_dir, store) = store();
        let committed = store
            .update(|doc| {
                doc.add_categories(vec![CategoryDef {
                    name: "naming".into(),
                    description: "Naming rules".into(),
                }])
            })
            .await
            .unwrap();
        assert!(committed.saved);
        assert_eq!(committed.outcome.succeeded, vec!["naming"]);
        assert!(store.exists());
        assert!(!store.path().with_file_name("user-policy.json.lock").exists());

        let reloaded = store.load().await.unwrap();
        assert!(reloaded.has_category("naming"));
    }

    #[tokio::test]
    async fn failed_edit_is_not_saved() {
        let (_dir, store) = store();
        let committed = store.update(|doc| doc.remove_categories(&["ghost"])).await.unwrap();
        assert!(!committed.saved);
        assert!(!store.exists());
    }

    #[tokio::test]
    async fn invalid_result_is_rejected() {
        let (_dir, store) = store();
        let locked_out = UserPolicy {
            version: "1".into(),
            rbac: Some(UserRbac {
                roles: [(
                    "dev".to_owned(),
                    UserRole {
                        allow_write: vec!["**".into()],
                        ..UserRole::default()
                    },
                )]
                .into(),
            }),
            ..UserPolicy::default()
        };
        let err = store.save(locked_out).await.unwrap_err();
        assert_matches!(err, PolicyError::Invalid { .. });
        assert!(!store.exists());
    }

    #[tokio::test]
    async fn validation_inside_update_surfaces_as_invalid() {
        let (_dir, store) = store();
        let err = store
            .update(|doc| {
                doc.policy_mut().version.clear();
                doc.mark_dirty();
            })
            .await
            .unwrap_err();
        assert_matches!(err, PolicyError::Invalid { message } if message.contains("version"));
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let (dir, store) = store();
        std::fs::create_dir_all(dir.path().join(".sym")).unwrap();
        std::fs::write(store.path(), "{broken").unwrap();
        assert_matches!(store.load().await, Err(PolicyError::Io { .. }));
    }

    #[tokio::test]
    async fn concurrent_edits_serialize() {
        let (_dir, store) = store();
        let tasks: Vec<_> = (0..6)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .update(move |doc| {
                            doc.add_category(CategoryDef {
                                name: format!("c{i}"),
                                description: "d".into(),
                            })
                        })
                        .await
                })
            })
            .collect();
        for task in tasks {
            let _ = task.await.unwrap().unwrap();
        }
        let doc = store.load().await.unwrap();
        assert!((0..6).all(|i| doc.has_category(&format!("c{i}"))));
    }
}
