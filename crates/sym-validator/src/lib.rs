//! # sym-validator
//!
//! Validates a change set against a compiled `CodePolicy`.
//!
//! - **Changes**: `git diff` against `HEAD` (or the index) plus untracked files
//! - **Engines**: pattern, length, style, ast, `llm-validator` and linter
//!   subprocesses behind one [`Engine`] trait, looked up by id
//! - **Access**: denied files from the active role become violations in the same result
//! - **History**: each run is appended to a capped, lock-guarded history file

#![deny(unsafe_code)]

pub mod changes;
pub mod diff;
pub mod dispatcher;
pub mod engine;
pub mod errors;
pub mod history;
pub mod selector;

pub use changes::{ChangeSource, ChangeStatus, FileChange, GitChangeReader, StaticChanges};
pub use diff::{AddedLine, added_lines};
pub use dispatcher::{Validator, ValidatorOptions};
pub use engine::{CheckTarget, Engine, EngineRegistry};
pub use errors::{EngineError, ValidatorError};
pub use history::HistoryStore;
pub use selector::rule_applies;
