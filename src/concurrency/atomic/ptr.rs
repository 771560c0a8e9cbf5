//! Plain pointer cells.
//!
//! Neither cell owns its pointee; they only publish addresses. Use
//! [`AtomicReference`](crate::concurrency::reference::AtomicReference) when the
//! cell must keep the object alive.

use core::{
    ffi::c_void,
    fmt,
    ptr::{self, NonNull},
    sync::atomic::AtomicPtr,
};

use crate::order::{dispatch_cas, CasKind, LoadOrder, MemoryOrder, StoreOrder};

/// A pointer cell that never holds null.
#[repr(transparent)]
pub struct AtomicNonNull<T> {
    inner: AtomicPtr<T>,
}

/// Non-null untyped pointer cell.
pub type AtomicRawPtr = AtomicNonNull<u8>;
/// Non-null opaque (foreign) pointer cell.
pub type AtomicOpaquePtr = AtomicNonNull<c_void>;

impl<T> AtomicNonNull<T> {
    /// Creates a cell from a raw pointer.
    ///
    /// # Panics
    ///
    /// Panics if `ptr` is null; use [`AtomicOptionPtr`] for a nullable cell.
    #[inline]
    pub fn new(ptr: *mut T) -> Self {
        match NonNull::new(ptr) {
            Some(ptr) => Self::from_non_null(ptr),
            None => panic!("AtomicNonNull::new called with a null pointer"),
        }
    }

    /// Creates a cell from a pointer already known to be non-null.
    #[inline(always)]
    pub const fn from_non_null(ptr: NonNull<T>) -> Self {
        Self {
            inner: AtomicPtr::new(ptr.as_ptr()),
        }
    }

    /// Mutable access through an exclusive borrow; no synchronization needed.
    #[inline(always)]
    pub fn get_mut(&mut self) -> &mut NonNull<T> {
        // SAFETY: `NonNull<T>` has the layout of `*mut T`, and the cell only
        // ever holds non-null pointers, so both views agree.
        unsafe { &mut *(self.inner.get_mut() as *mut *mut T).cast::<NonNull<T>>() }
    }

    /// Consumes the cell, returning its pointer.
    #[inline(always)]
    pub fn into_inner(self) -> NonNull<T> {
        // SAFETY: every write path stores a `NonNull`.
        unsafe { NonNull::new_unchecked(self.inner.into_inner()) }
    }

    /// Relaxed read of the current pointer.
    #[inline(always)]
    pub fn pointer(&self) -> NonNull<T> {
        self.load(LoadOrder::Relaxed)
    }

    /// Loads the current pointer.
    #[inline(always)]
    pub fn load(&self, order: LoadOrder) -> NonNull<T> {
        // SAFETY: every write path stores a `NonNull`.
        unsafe { NonNull::new_unchecked(self.inner.load(order.into())) }
    }

    /// Stores a new pointer.
    #[inline(always)]
    pub fn store(&self, ptr: NonNull<T>, order: StoreOrder) {
        self.inner.store(ptr.as_ptr(), order.into());
    }

    /// Swaps the current pointer, returning the previous one.
    #[inline(always)]
    pub fn swap(&self, ptr: NonNull<T>, order: MemoryOrder) -> NonNull<T> {
        // SAFETY: the previous value was written through a `NonNull`.
        unsafe { NonNull::new_unchecked(self.inner.swap(ptr.as_ptr(), order.into())) }
    }

    /// Stores `future` if the cell holds `current`.
    #[inline]
    pub fn compare_exchange(
        &self,
        current: NonNull<T>,
        future: NonNull<T>,
        kind: CasKind,
        success: MemoryOrder,
        failure: LoadOrder,
    ) -> Result<NonNull<T>, NonNull<T>> {
        // SAFETY: every write path stores a `NonNull`.
        let wrap = |p: *mut T| unsafe { NonNull::new_unchecked(p) };
        dispatch_cas!(self.inner, current.as_ptr(), future.as_ptr(), kind, success, failure)
            .map(wrap)
            .map_err(wrap)
    }

    /// Stores `future` if the cell holds `current`; returns whether it did.
    #[inline]
    pub fn compare_and_swap(
        &self,
        current: NonNull<T>,
        future: NonNull<T>,
        kind: CasKind,
        order: MemoryOrder,
    ) -> bool {
        self.compare_exchange(current, future, kind, order, order.load_part())
            .is_ok()
    }

    /// Compare-and-swap that refreshes `current` with the observed pointer on failure.
    #[inline]
    pub fn load_compare_and_swap(
        &self,
        current: &mut NonNull<T>,
        future: NonNull<T>,
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
}

impl<T> From<NonNull<T>> for AtomicNonNull<T> {
    fn from(ptr: NonNull<T>) -> Self {
        Self::from_non_null(ptr)
    }
}

impl<T> fmt::Debug for AtomicNonNull<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Pointer::fmt(&self.pointer(), f)
    }
}

/// A pointer cell that may hold null.
#[repr(transparent)]
pub struct AtomicOptionPtr<T> {
    inner: AtomicPtr<T>,
}

/// Nullable untyped pointer cell.
pub type AtomicOptionRawPtr = AtomicOptionPtr<u8>;
/// Nullable opaque (foreign) pointer cell.
pub type AtomicOptionOpaquePtr = AtomicOptionPtr<c_void>;

#[inline(always)]
fn raw<T>(ptr: Option<NonNull<T>>) -> *mut T {
    ptr.map_or(ptr::null_mut(), NonNull::as_ptr)
}

impl<T> AtomicOptionPtr<T> {
    /// Creates a cell holding `ptr` (which may be null).
    #[inline(always)]
    pub const fn new(ptr: *mut T) -> Self {
        Self {
            inner: AtomicPtr::new(ptr),
        }
    }

    /// Creates a cell holding null.
    #[inline(always)]
    pub const fn null() -> Self {
        Self::new(ptr::null_mut())
    }

    /// Mutable access through an exclusive borrow; no synchronization needed.
    #[inline(always)]
    pub fn get_mut(&mut self) -> &mut Option<NonNull<T>> {
        // SAFETY: `Option<NonNull<T>>` has the layout of `*mut T`, with `None`
        // as null.
        unsafe { &mut *(self.inner.get_mut() as *mut *mut T).cast::<Option<NonNull<T>>>() }
    }

    /// Consumes the cell, returning its pointer.
    #[inline(always)]
    pub fn into_inner(self) -> Option<NonNull<T>> {
        NonNull::new(self.inner.into_inner())
    }

    /// Relaxed read of the current pointer.
    #[inline(always)]
    pub fn pointer(&self) -> Option<NonNull<T>> {
        self.load(LoadOrder::Relaxed)
    }

    /// Loads the current pointer.
    #[inline(always)]
    pub fn load(&self, order: LoadOrder) -> Option<NonNull<T>> {
        NonNull::new(self.inner.load(order.into()))
    }

    /// Stores a new pointer.
    #[inline(always)]
    pub fn store(&self, ptr: Option<NonNull<T>>, order: StoreOrder) {
        self.inner.store(raw(ptr), order.into());
    }

    /// Swaps the current pointer, returning the previous one.
    #[inline(always)]
    pub fn swap(&self, ptr: Option<NonNull<T>>, order: MemoryOrder) -> Option<NonNull<T>> {
        NonNull::new(self.inner.swap(raw(ptr), order.into()))
    }

    /// Stores `future` if the cell holds `current`.
    #[inline]
    pub fn compare_exchange(
        &self,
        current: Option<NonNull<T>>,
        future: Option<NonNull<T>>,
        kind: CasKind,
        success: MemoryOrder,
        failure: LoadOrder,
    ) -> Result<Option<NonNull<T>>, Option<NonNull<T>>> {
        dispatch_cas!(self.inner, raw(current), raw(future), kind, success, failure)
            .map(NonNull::new)
            .map_err(NonNull::new)
    }

    /// Stores `future` if the cell holds `current`; returns whether it did.
    #[inline]
    pub fn compare_and_swap(
        &self,
        current: Option<NonNull<T>>,
        future: Option<NonNull<T>>,
        kind: CasKind,
        order: MemoryOrder,
    ) -> bool {
        self.compare_exchange(current, future, kind, order, order.load_part())
            .is_ok()
    }

    /// Compare-and-swap that refreshes `current` with the observed pointer on failure.
    #[inline]
    pub fn load_compare_and_swap(
        &self,
        current: &mut Option<NonNull<T>>,
        future: Option<NonNull<T>>,
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
}

impl<T> Default for AtomicOptionPtr<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T> From<Option<NonNull<T>>> for AtomicOptionPtr<T> {
    fn from(ptr: Option<NonNull<T>>) -> Self {
        Self::new(raw(ptr))
    }
}

impl<T> fmt::Debug for AtomicOptionPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Pointer::fmt(&raw(self.pointer()), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "null pointer")]
    fn non_null_cell_rejects_null() {
        let _ = AtomicNonNull::<u64>::new(ptr::null_mut());
    }

    #[test]
    fn get_mut_writes_through() {
        let mut a = 1u32;
        let mut b = 2u32;
        let mut cell = AtomicNonNull::from_non_null(NonNull::from(&mut a));
        *cell.get_mut() = NonNull::from(&mut b);
        assert_eq!(cell.into_inner(), NonNull::from(&mut b));

        let mut optional = AtomicOptionPtr::<u32>::null();
        *optional.get_mut() = Some(NonNull::from(&mut a));
        assert_eq!(optional.load(LoadOrder::Acquire), Some(NonNull::from(&mut a)));
        *optional.get_mut() = None;
        assert!(optional.into_inner().is_none());
    }

    #[test]
    fn option_cell_starts_null() {
        let cell = AtomicOptionOpaquePtr::default();
        assert_eq!(cell.pointer(), None);
    }
}
