//! # `halo-atomics` - Lock-free Atomic Cells
//!
//! Lock-free storage cells for building concurrent data structures without
//! locks: integers of every width, booleans, plain and tagged pointers, and an
//! atomic slot that owns a reference-counted object.
//!
//! ## Safety Guarantees
//!
//! ### Memory Safety
//! - **Reference slots never free under a reader**: [`AtomicReference::load`]
//!   returns a retained handle even while other threads swap the slot and drop
//!   the last outside reference.
//! - **Exact ownership accounting**: a slot owns exactly one unit of its object's
//!   count; swaps move it out, loads mint new ones, drops release it.
//! - **Invalid orderings are unrepresentable**: loads take [`LoadOrder`], stores
//!   [`StoreOrder`], read-modify-writes [`MemoryOrder`].
//!
//! ### Concurrency Safety
//! - **Lock-free algorithms**: every retry is caused by another thread's
//!   progress (or by the spurious failure a [`CasKind::Weak`] CAS is allowed).
//! - **ABA prevention**: tagged words and identity CAS on retained objects.
//!
//! ## Architecture
//!
//! 1. **Orderings** ([`order`]): `LoadOrder`, `StoreOrder`, `MemoryOrder`,
//!    `CasKind`, all defaulting to the strongest choice.
//! 2. **Word cells** ([`concurrency::atomic`]): `AtomicInt<T>` over every
//!    integer width, `AtomicBoolean`, `AtomicNonNull`, `AtomicOptionPtr`.
//! 3. **Tagged word** ([`AtomicTaggedPtr`]): pointer and tag in one double-width word.
//! 4. **Reference slot** ([`AtomicReference`]): a split reference count in the
//!    tagged word's tag.
//! 5. **Worklists** ([`AtomicStack`]): a Treiber stack over reference slots.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use halo_atomics::{AtomicReference, CasKind, LoadOrder, MemoryOrder};
//!
//! let config = AtomicReference::new(Some(Arc::new(String::from("v1"))));
//!
//! // Readers get their own strong reference.
//! let current = config.load(LoadOrder::Acquire).unwrap();
//!
//! // Writers replace by identity.
//! let next = Arc::new(String::from("v2"));
//! assert!(config.compare_and_swap(
//!     Arc::as_ptr(&current),
//!     Some(&next),
//!     CasKind::Strong,
//!     MemoryOrder::AcqRel,
//! ));
//! assert_eq!(*current, "v1");
//! assert_eq!(*config.load(LoadOrder::Acquire).unwrap(), "v2");
//! ```

#![warn(missing_docs, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

macro_rules! trace_event {
    ($($arg:tt)*) => {{
        #[cfg(feature = "tracing")]
        {
            tracing::trace!($($arg)*);
        }
    }};
}

macro_rules! debug_event {
    ($($arg:tt)*) => {{
        #[cfg(feature = "tracing")]
        {
            tracing::debug!($($arg)*);
        }
    }};
}

pub mod concurrency;
pub mod order;

pub use concurrency::atomic::{
    AtomicBoolean, AtomicI16, AtomicI32, AtomicI64, AtomicI8, AtomicInt, AtomicIsize,
    AtomicNonNull, AtomicOptionPtr, AtomicTaggedPtr, AtomicU16, AtomicU32, AtomicU64, AtomicU8,
    AtomicUsize, TaggedPtr,
};
pub use concurrency::reference::{AtomicReference, RefCounted};
pub use concurrency::worklist::AtomicStack;
pub use order::{fence, thread_fence, CasKind, LoadOrder, MemoryOrder, StoreOrder};

// Compile-time assertions for memory layout
const _: () = {
    use core::mem;
    use std::sync::Arc;

    // Every cell is exactly its hardware word.
    assert!(mem::size_of::<AtomicInt<u8>>() == 1);
    assert!(mem::size_of::<AtomicInt<u64>>() == 8);
    assert!(mem::size_of::<AtomicBoolean>() == 1);
    assert!(mem::size_of::<AtomicOptionPtr<u8>>() == mem::size_of::<usize>());

    // Pointer and tag share one 128-bit word, and the reference slot adds nothing.
    assert!(mem::size_of::<AtomicTaggedPtr<u8>>() == 16);
    assert!(mem::size_of::<AtomicReference<Arc<u64>>>() == 16);
};
