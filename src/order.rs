//! Memory-ordering vocabulary shared by every cell in the crate.
//!
//! `core::sync::atomic::Ordering` accepts combinations that panic at runtime
//! (a `Release` load, an `Acquire` store). The cells here take one of three
//! narrower enumerations instead, so an invalid ordering is a type error:
//!
//! - [`LoadOrder`] for pure reads,
//! - [`StoreOrder`] for pure writes,
//! - [`MemoryOrder`] for read-modify-write operations.
//!
//! Every enumeration defaults to sequential consistency.

use core::sync::atomic::{self, Ordering};

/// Ordering for an atomic read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LoadOrder {
    /// No cross-thread ordering beyond atomicity.
    Relaxed,
    /// Pairs with a `Release` (or stronger) write.
    Acquire,
    /// Sequentially consistent.
    #[default]
    SeqCst,
}

/// Ordering for an atomic write.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum StoreOrder {
    /// No cross-thread ordering beyond atomicity.
    Relaxed,
    /// Publishes prior writes to an `Acquire` reader.
    Release,
    /// Sequentially consistent.
    #[default]
    SeqCst,
}

/// Ordering for a read-modify-write operation (swap, fetch-op, CAS success).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MemoryOrder {
    /// No cross-thread ordering beyond atomicity.
    Relaxed,
    /// The read half acquires.
    Acquire,
    /// The write half releases.
    Release,
    /// Both halves synchronize.
    AcqRel,
    /// Sequentially consistent.
    #[default]
    SeqCst,
}

/// Strength of a compare-and-swap.
///
/// A `Weak` CAS may report failure even though the cell held the expected
/// value; callers are expected to retry in a loop. A `Strong` CAS fails only
/// on a genuine mismatch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CasKind {
    /// Never fails spuriously.
    #[default]
    Strong,
    /// May fail spuriously; cheaper inside retry loops on LL/SC targets.
    Weak,
}

impl From<LoadOrder> for Ordering {
    #[inline(always)]
    fn from(order: LoadOrder) -> Self {
        match order {
            LoadOrder::Relaxed => Ordering::Relaxed,
            LoadOrder::Acquire => Ordering::Acquire,
            LoadOrder::SeqCst => Ordering::SeqCst,
        }
    }
}

impl From<StoreOrder> for Ordering {
    #[inline(always)]
    fn from(order: StoreOrder) -> Self {
        match order {
            StoreOrder::Relaxed => Ordering::Relaxed,
            StoreOrder::Release => Ordering::Release,
            StoreOrder::SeqCst => Ordering::SeqCst,
        }
    }
}

impl From<MemoryOrder> for Ordering {
    #[inline(always)]
    fn from(order: MemoryOrder) -> Self {
        match order {
            MemoryOrder::Relaxed => Ordering::Relaxed,
            MemoryOrder::Acquire => Ordering::Acquire,
            MemoryOrder::Release => Ordering::Release,
            MemoryOrder::AcqRel => Ordering::AcqRel,
            MemoryOrder::SeqCst => Ordering::SeqCst,
        }
    }
}

impl From<LoadOrder> for MemoryOrder {
    #[inline(always)]
    fn from(order: LoadOrder) -> Self {
        match order {
            LoadOrder::Relaxed => MemoryOrder::Relaxed,
            LoadOrder::Acquire => MemoryOrder::Acquire,
            LoadOrder::SeqCst => MemoryOrder::SeqCst,
        }
    }
}

impl From<StoreOrder> for MemoryOrder {
    #[inline(always)]
    fn from(order: StoreOrder) -> Self {
        match order {
            StoreOrder::Relaxed => MemoryOrder::Relaxed,
            StoreOrder::Release => MemoryOrder::Release,
            StoreOrder::SeqCst => MemoryOrder::SeqCst,
        }
    }
}

impl MemoryOrder {
    /// The read half of this ordering, usable as a CAS failure ordering.
    #[inline(always)]
    pub const fn load_part(self) -> LoadOrder {
        match self {
            MemoryOrder::Relaxed | MemoryOrder::Release => LoadOrder::Relaxed,
            MemoryOrder::Acquire | MemoryOrder::AcqRel => LoadOrder::Acquire,
            MemoryOrder::SeqCst => LoadOrder::SeqCst,
        }
    }
}

/// An atomic thread fence with the given ordering.
///
/// A `Relaxed` fence is a no-op; `core::sync::atomic::fence` would panic on it.
#[inline]
pub fn fence(order: MemoryOrder) {
    if order != MemoryOrder::Relaxed {
        atomic::fence(order.into());
    }
}

/// A sequentially consistent thread fence.
#[inline]
pub fn thread_fence() {
    fence(MemoryOrder::SeqCst);
}

/// Runs a compare-exchange on a `core` atomic with the requested strength.
///
/// Shared by every cell so the weak/strong dispatch lives in one place.
macro_rules! dispatch_cas {
    ($atomic:expr, $current:expr, $new:expr, $kind:expr, $success:expr, $failure:expr) => {{
        let success: ::core::sync::atomic::Ordering = $success.into();
        let failure: ::core::sync::atomic::Ordering = $failure.into();
        match $kind {
            $crate::order::CasKind::Strong => {
                $atomic.compare_exchange($current, $new, success, failure)
            }
            $crate::order::CasKind::Weak => {
                $atomic.compare_exchange_weak($current, $new, success, failure)
            }
        }
    }};
}
pub(crate) use dispatch_cas;

#[cfg(feature = "proptest")]
mod arbitrary {
    use super::{CasKind, LoadOrder, MemoryOrder, StoreOrder};
    use proptest::prelude::*;

    impl Arbitrary for LoadOrder {
        type Parameters = ();
        type Strategy = BoxedStrategy<Self>;

        fn arbitrary_with((): ()) -> Self::Strategy {
            prop_oneof![
                Just(LoadOrder::Relaxed),
                Just(LoadOrder::Acquire),
                Just(LoadOrder::SeqCst),
            ]
            .boxed()
        }
    }

    impl Arbitrary for StoreOrder {
        type Parameters = ();
        type Strategy = BoxedStrategy<Self>;

        fn arbitrary_with((): ()) -> Self::Strategy {
            prop_oneof![
                Just(StoreOrder::Relaxed),
                Just(StoreOrder::Release),
                Just(StoreOrder::SeqCst),
            ]
            .boxed()
        }
    }

    impl Arbitrary for MemoryOrder {
        type Parameters = ();
        type Strategy = BoxedStrategy<Self>;

        fn arbitrary_with((): ()) -> Self::Strategy {
            prop_oneof![
                Just(MemoryOrder::Relaxed),
                Just(MemoryOrder::Acquire),
                Just(MemoryOrder::Release),
                Just(MemoryOrder::AcqRel),
                Just(MemoryOrder::SeqCst),
            ]
            .boxed()
        }
    }

    impl Arbitrary for CasKind {
        type Parameters = ();
        type Strategy = BoxedStrategy<Self>;

        fn arbitrary_with((): ()) -> Self::Strategy {
            prop_oneof![Just(CasKind::Strong), Just(CasKind::Weak)].boxed()
        }
    }
}
