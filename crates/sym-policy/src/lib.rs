//! # sym-policy
//!
//! Owns the natural-language `UserPolicy` file.
//!
//! - **Document**: ordered category and rule lists with an index rebuilt on load
//! - **Edits**: category and rule add/edit/remove in batch form, one outcome per item
//! - **Validation**: every save is checked; a policy nobody can edit is rejected
//! - **Store**: lock-guarded load → mutate → validate → atomic write
//! - **Import**: conventions extracted from a text document by the inference port

#![deny(unsafe_code)]

pub mod batch;
pub mod categories;
pub mod document;
pub mod errors;
pub mod importer;
pub mod rules;
pub mod store;
pub mod validate;

pub use batch::{BatchReport, ItemFailure};
pub use categories::{CategoryEdit, default_categories};
pub use document::PolicyDocument;
pub use errors::PolicyError;
pub use importer::{ConventionImporter, ImportMode, ImportReport};
pub use rules::RuleEdit;
pub use store::PolicyStore;
pub use validate::validate_policy;
