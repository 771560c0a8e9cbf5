use core::{fmt, sync::atomic::AtomicBool};

use crate::order::{dispatch_cas, CasKind, LoadOrder, MemoryOrder, StoreOrder};

/// A lock-free boolean cell.
#[repr(transparent)]
#[derive(Default)]
pub struct AtomicBoolean {
    inner: AtomicBool,
}

impl AtomicBoolean {
    /// Creates a new cell.
    #[inline(always)]
    pub const fn new(value: bool) -> Self {
        Self {
            inner: AtomicBool::new(value),
        }
    }

    /// Mutable access through an exclusive borrow; no synchronization needed.
    #[inline(always)]
    pub fn get_mut(&mut self) -> &mut bool {
        self.inner.get_mut()
    }

    /// Consumes the cell, returning its value.
    #[inline(always)]
    pub fn into_inner(self) -> bool {
        self.inner.into_inner()
    }

    /// Relaxed read of the current value.
    #[inline(always)]
    pub fn value(&self) -> bool {
        self.load(LoadOrder::Relaxed)
    }

    /// Loads the current value.
    #[inline(always)]
    pub fn load(&self, order: LoadOrder) -> bool {
        self.inner.load(order.into())
    }

    /// Stores a new value.
    #[inline(always)]
    pub fn store(&self, value: bool, order: StoreOrder) {
        self.inner.store(value, order.into());
    }

    /// Swaps the current value, returning the previous value.
    #[inline(always)]
    pub fn swap(&self, value: bool, order: MemoryOrder) -> bool {
        self.inner.swap(value, order.into())
    }

    /// Logical OR with the current value, returning the previous value.
    #[inline(always)]
    pub fn or(&self, value: bool, order: MemoryOrder) -> bool {
        self.inner.fetch_or(value, order.into())
    }

    /// Logical XOR with the current value, returning the previous value.
    #[inline(always)]
    pub fn xor(&self, value: bool, order: MemoryOrder) -> bool {
        self.inner.fetch_xor(value, order.into())
    }

    /// Logical AND with the current value, returning the previous value.
    #[inline(always)]
    pub fn and(&self, value: bool, order: MemoryOrder) -> bool {
        self.inner.fetch_and(value, order.into())
    }

    /// Stores `future` if the cell holds `current`.
    #[inline(always)]
    pub fn compare_exchange(
        &self,
        current: bool,
        future: bool,
        kind: CasKind,
        success: MemoryOrder,
        failure: LoadOrder,
    ) -> Result<bool, bool> {
        dispatch_cas!(self.inner, current, future, kind, success, failure)
    }

    /// Stores `future` if the cell holds `current`; returns whether it did.
    #[inline(always)]
    pub fn compare_and_swap(
        &self,
        current: bool,
        future: bool,
        kind: CasKind,
        order: MemoryOrder,
    ) -> bool {
        self.compare_exchange(current, future, kind, order, order.load_part())
            .is_ok()
    }

    /// Compare-and-swap that refreshes `current` with the observed value on failure.
    #[inline]
    pub fn load_compare_and_swap(
        &self,
        current: &mut bool,
        future: bool,
        kind: CasKind,
        order_swap: MemoryOrder,
        order_load: LoadOrder,
    ) -> bool {
        match self.compare_exchange(*current, future, kind, order_swap, order_load) {
            Ok(_) => true,
            Err(observed) => {
                *current = observed;
                false
            }
        }
    }

    /// Sets the flag if it is clear.
    ///
    /// Returns `true` if this call flipped it, `false` if it was already set.
    #[inline]
    pub fn test_and_set(&self, order: MemoryOrder) -> bool {
        self.compare_and_swap(false, true, CasKind::Strong, order)
    }
}

impl From<bool> for AtomicBoolean {
    fn from(value: bool) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for AtomicBoolean {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.value(), f)
    }
}
