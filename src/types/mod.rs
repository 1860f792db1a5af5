//! Data carried through one distribution cycle.
//!
//! Holder snapshots come in, allocation entries are derived from them,
//! and each entry ends the cycle as exactly one order outcome.

mod allocation;
mod cycle;
mod holder;
mod outcome;

pub use allocation::*;
pub use cycle::*;
pub use holder::*;
pub use outcome::*;
