//! Single-word lock-free cells.
//!
//! Every operation takes an explicit ordering from [`crate::order`]; the
//! read-modify-write operations return the value held before the update.

/// Boolean cell.
pub mod bool;
/// Integer cells of every width.
pub mod int;
/// Plain pointer cells.
pub mod ptr;
/// Pointer-plus-tag cells.
pub mod tagged;

pub use bool::AtomicBoolean;
pub use int::{
    AtomicI16, AtomicI32, AtomicI64, AtomicI8, AtomicInt, AtomicIsize, AtomicPrimitive, AtomicU16,
    AtomicU32, AtomicU64, AtomicU8, AtomicUsize,
};
pub use ptr::{
    AtomicNonNull, AtomicOpaquePtr, AtomicOptionOpaquePtr, AtomicOptionPtr, AtomicOptionRawPtr,
    AtomicRawPtr,
};
pub use tagged::{AtomicTaggedPtr, TaggedPtr, MAX_TAG, TAG_BITS};
