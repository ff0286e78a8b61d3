//! Active role resolution.
//!
//! The role store (`roles.json`) maps each role to the usernames holding it:
//!
//! ```json
//! { "admin": ["alice"], "developer": ["bob", "carol"] }
//! ```
//!
//! A user listed under no role resolves to `none`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use sym_settings::AccessSettings;
use tracing::debug;

use crate::errors::AccessError;
use crate::evaluator::NO_ROLE;

/// Source of the caller's current role.
pub trait RoleSource: Send + Sync {
    /// Resolve the active role name.
    fn active_role(&self) -> Result<String, AccessError>;
}

/// A role pinned by configuration.
#[derive(Clone, Debug)]
pub struct FixedRole(pub String);

impl RoleSource for FixedRole {
    fn active_role(&self) -> Result<String, AccessError> {
        Ok(self.0.clone())
    }
}

/// Looks a username up in the role store on every call, so edits to the
/// store take effect without a restart.
#[derive(Clone, Debug)]
pub struct UserRoleLookup {
    roles_path: PathBuf,
    user: String,
}

impl UserRoleLookup {
    /// Lookup of `user` in the store at `roles_path`.
    pub fn new(roles_path: impl Into<PathBuf>, user: impl Into<String>) -> Self {
        Self {
            roles_path: roles_path.into(),
            user: user.into(),
        }
    }

    /// Username being resolved.
    pub fn user(&self) -> &str {
        &self.user
    }
}

impl RoleSource for UserRoleLookup {
    fn active_role(&self) -> Result<String, AccessError> {
        let Some(store) = load_role_store(&self.roles_path)? else {
            debug!(path = %self.roles_path.display(), "no role store, role is none");
            return Ok(NO_ROLE.to_owned());
        };
        Ok(role_for_user(&store, &self.user).unwrap_or(NO_ROLE).to_owned())
    }
}

/// Read the role store. `None` when the file does not exist.
pub fn load_role_store(path: &Path) -> Result<Option<BTreeMap<String, Vec<String>>>, AccessError> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(AccessError::RolesRead {
                path: path.to_owned(),
                source,
            });
        }
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|source| AccessError::RolesParse {
            path: path.to_owned(),
            source,
        })
}

/// First role (in name order) listing `user`.
pub fn role_for_user<'a>(store: &'a BTreeMap<String, Vec<String>>, user: &str) -> Option<&'a str> {
    store
        .iter()
        .find(|(_, users)| users.iter().any(|u| u == user))
        .map(|(role, _)| role.as_str())
}

/// Role source for the given settings.
///
/// A pinned role wins. Otherwise the configured user, falling back to `$USER`,
/// is looked up in the store at `roles_path`.
pub fn role_source_from_settings(
    settings: &AccessSettings,
    roles_path: &Path,
) -> Box<dyn RoleSource> {
    if !settings.role.is_empty() {
        return Box::new(FixedRole(settings.role.clone()));
    }
    let user = if settings.user.is_empty() {
        std::env::var("USER").unwrap_or_default()
    } else {
        settings.user.clone()
    };
    Box::new(UserRoleLookup::new(roles_path, user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn write_store(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("roles.json");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn fixed_role_returns_itself() {
        assert_eq!(FixedRole("admin".into()).active_role().unwrap(), "admin");
    }

    #[test]
    fn lookup_finds_user() {
        let dir = tempfile::tempdir().unwrap();
        let path =
            write_store(dir.path(), r#"{"admin": ["alice"], "developer": ["bob", "carol"]}"#);
        assert_eq!(UserRoleLookup::new(&path, "carol").active_role().unwrap(), "developer");
        assert_eq!(UserRoleLookup::new(&path, "alice").active_role().unwrap(), "admin");
    }

    #[test]
    fn unknown_user_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_store(dir.path(), r#"{"admin": ["alice"]}"#);
        assert_eq!(UserRoleLookup::new(&path, "mallory").active_role().unwrap(), NO_ROLE);
    }

    #[test]
    fn missing_store_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let lookup = UserRoleLookup::new(dir.path().join("roles.json"), "alice");
        assert_eq!(lookup.active_role().unwrap(), NO_ROLE);
    }

    #[test]
    fn malformed_store_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_store(dir.path(), r#"{"admin": "alice"}"#);
        assert_matches!(
            UserRoleLookup::new(&path, "alice").active_role(),
            Err(AccessError::RolesParse { .. })
        );
    }

    #[test]
    fn store_edits_apply_without_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_store(dir.path(), r#"{"viewer": ["dave"]}"#);
        let lookup = UserRoleLookup::new(&path, "dave");
        assert_eq!(lookup.active_role().unwrap(), "viewer");
        let _ = write_store(dir.path(), r#"{"developer": ["dave"]}"#);
        assert_eq!(lookup.active_role().unwrap(), "developer");
    }

    #[test]
    fn settings_pin_role() {
        let settings = AccessSettings {
            role: "reviewer".into(),
            user: "alice".into(),
        };
        let source = role_source_from_settings(&settings, Path::new("/nonexistent/roles.json"));
        assert_eq!(source.active_role().unwrap(), "reviewer");
    }

    #[test]
    fn settings_user_is_looked_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_store(dir.path(), r#"{"admin": ["alice"]}"#);
        let settings = AccessSettings {
            role: String::new(),
            user: "alice".into(),
        };
        assert_eq!(role_source_from_settings(&settings, &path).active_role().unwrap(), "admin");
    }
}
