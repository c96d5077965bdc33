//! Type system utilities and aliases.
//!
//! - [`aliases`]: shared-state aliases over `parking_lot` locks used by the bus internals.

pub mod aliases;

pub use aliases::*;
