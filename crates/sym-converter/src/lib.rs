//! # sym-converter
//!
//! Compiles a natural-language `UserPolicy` into a `CodePolicy` plus
//! per-linter configuration files.
//!
//! - **Routing**: each adapter sees only the rules whose languages it supports
//! - **Classification**: rules are classified through a fixed-size worker pool;
//!   results are replayed in policy order whatever the completion order
//! - **Adapters**: ESLint, Prettier, TSC and Pylint map rule intents onto
//!   whitelisted native options
//! - **Engine assignment**: the first adapter producing config for a rule owns
//!   it; everything else falls back to `llm-validator`
//! - **Staleness**: [`needs_reconversion`] decides when a stored `CodePolicy` is out of date

#![deny(unsafe_code)]

pub mod adapter;
pub mod converter;
pub mod errors;
pub mod output;
pub mod pool;
pub mod staleness;

pub use adapter::{AdapterRegistry, AdapterRule, LinterAdapter};
pub use converter::{ConvertOutcome, Converter, ConverterOptions, GeneratedFile};
pub use errors::ConvertError;
pub use output::write_outputs;
pub use pool::run_indexed;
pub use staleness::needs_reconversion;
