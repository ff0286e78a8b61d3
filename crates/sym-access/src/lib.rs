//! # sym-access
//!
//! Role-based write-access evaluation.
//!
//! - Glob semantics: `**` spans segments, `*` stays within one segment,
//!   trailing `/` is a directory prefix, plain patterns match a path or its subtree
//! - Deny always wins; an empty allow list means unrestricted
//! - Role `none` or empty denies everything; an unknown role denies everything;
//!   a policy without a role section allows everything
//! - Role store: `roles.json` (role → usernames) or a pinned role

#![deny(unsafe_code)]

pub mod errors;
pub mod evaluator;
pub mod pattern;
pub mod roles;

pub use errors::AccessError;
pub use evaluator::{AccessDecision, AccessEvaluator, NO_ROLE, RoleSummary};
pub use pattern::match_pattern;
pub use roles::{
    FixedRole, RoleSource, UserRoleLookup, load_role_store, role_for_user,
    role_source_from_settings,
};
