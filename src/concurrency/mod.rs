//! Lock-free cells and the structures built from them.
//!
//! Layering, leaves first:
//! - [`atomic`]: single-word cells (integers, booleans, pointers, tagged pointers);
//! - [`reference`]: the reference-counted object slot, built on a tagged pointer;
//! - [`worklist`]: data structures composed from reference slots.

pub mod atomic;
pub mod reference;
pub mod worklist;
