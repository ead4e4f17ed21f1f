//! Small internal data structures.
//!
//! - [`Slab`]: token-indexed storage for reactor registrations, with
//!   reuse of freed tokens.

mod slab;

pub(crate) use slab::Slab;
