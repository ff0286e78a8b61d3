//! # sym-settings
//!
//! Engine configuration for every sym component.
//!
//! - Compiled defaults ([`SymSettings::default`])
//! - Optional JSON file deep-merged over the defaults
//! - `SYM_*` environment variable overrides (highest priority)
//!
//! Settings are loaded once by the binary and handed to each component
//! constructor. There is no global instance.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::SettingsError;
pub use loader::{deep_merge, load_settings_from_path};
pub use types::*;
