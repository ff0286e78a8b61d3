//! Policy schema.
//!
//! JSON field names follow the on-disk format (`camelCase`, with the
//! historical `category` key holding the category list). Optional sections
//! are omitted when empty so that round-tripping a hand-written policy does
//! not introduce noise.

mod code_policy;
mod severity;
mod user_policy;
mod violation;

pub use code_policy::*;
pub use severity::*;
pub use user_policy::*;
pub use violation::*;
