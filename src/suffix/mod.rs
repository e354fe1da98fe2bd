//! Suffixes: the rule table and the engine that applies it to a group's
//! fragment.

mod table;
pub use table::*;

mod apply;
pub use apply::*;
