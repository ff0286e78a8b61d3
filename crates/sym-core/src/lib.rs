//! # sym-core
//!
//! Foundation types shared by every sym crate.
//!
//! - **Schema**: `UserPolicy` (natural-language rules, categories, roles) and
//!   the compiled `CodePolicy`, plus violations and validation history records
//! - **Languages**: language ↔ file extension table used by selectors
//! - **Errors**: `SymError` taxonomy (config, permission, inference, engine, protocol)
//! - **Files**: atomic temp-file-then-rename writes and advisory lock files

#![deny(unsafe_code)]

pub mod errors;
pub mod fs;
pub mod language;
pub mod schema;

pub use errors::{ErrorKind, SymError};
pub use schema::*;
