//! Static policy table: `(role, resource pattern, action)` allow rules.
//!
//! Pattern matching lives in [`pattern`] and is independent of how rules are
//! loaded, so it can be tested on its own.

mod pattern;
mod rule;
mod table;

pub use pattern::{ActionPattern, ResourcePattern};
pub use rule::PolicyRule;
pub use table::PolicyTable;
