//! Lock-free worklists composed from reference slots.

pub mod treiber_stack;

pub use treiber_stack::AtomicStack;
