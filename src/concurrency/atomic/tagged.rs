//! A pointer and a tag updated as one atomic unit.
//!
//! Both halves live in a single double-width word, the pointer in the low 64
//! bits and the tag in the high 64 bits of an `AtomicU128`. Every address the
//! platform can produce round-trips unchanged, including the top-byte-tagged
//! heap pointers of some AArch64 allocators.
//!
//! The tag is a full `usize` and its arithmetic wraps modulo `2^TAG_BITS`.
//! [`MAX_TAG`] is therefore the largest count a tag can hold without becoming
//! ambiguous; the reference cell uses it as its ceiling on concurrently
//! borrowing loads.

use core::{fmt, marker::PhantomData, ptr};

use portable_atomic::AtomicU128;

use crate::order::{dispatch_cas, CasKind, LoadOrder, MemoryOrder, StoreOrder};

/// Number of tag bits in a packed word.
pub const TAG_BITS: u32 = usize::BITS;

/// Largest representable tag.
pub const MAX_TAG: usize = usize::MAX;

const HALF: u32 = u64::BITS;

/// A `(pointer, tag)` pair as read from or written to an [`AtomicTaggedPtr`].
pub struct TaggedPtr<T> {
    ptr: *mut T,
    tag: usize,
}

impl<T> Clone for TaggedPtr<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for TaggedPtr<T> {}

impl<T> PartialEq for TaggedPtr<T> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.ptr, other.ptr) && self.tag == other.tag
    }
}

impl<T> Eq for TaggedPtr<T> {}

impl<T> fmt::Debug for TaggedPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaggedPtr")
            .field("ptr", &self.ptr)
            .field("tag", &self.tag)
            .finish()
    }
}

impl<T> Default for TaggedPtr<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T> TaggedPtr<T> {
    /// Pairs `ptr` with `tag`.
    #[inline(always)]
    pub fn new(ptr: *mut T, tag: usize) -> Self {
        Self { ptr, tag }
    }

    /// A null pointer with tag 0.
    #[inline(always)]
    pub const fn null() -> Self {
        Self {
            ptr: ptr::null_mut(),
            tag: 0,
        }
    }

    /// The pointer half.
    #[inline(always)]
    pub fn pointer(self) -> *mut T {
        self.ptr
    }

    /// The tag half.
    #[inline(always)]
    pub fn tag(self) -> usize {
        self.tag
    }

    /// Whether the pointer half is null.
    #[inline(always)]
    pub fn is_null(self) -> bool {
        self.ptr.is_null()
    }

    /// Same pointer, different tag.
    #[inline(always)]
    #[must_use]
    pub fn with_tag(self, tag: usize) -> Self {
        Self::new(self.ptr, tag)
    }

    /// Same pointer, tag plus one (wrapping).
    #[inline(always)]
    #[must_use]
    pub fn incremented(self) -> Self {
        self.with_tag(self.tag.wrapping_add(1))
    }

    /// Same pointer, tag minus one (wrapping).
    #[inline(always)]
    #[must_use]
    pub fn decremented(self) -> Self {
        self.with_tag(self.tag.wrapping_sub(1))
    }

    #[inline(always)]
    fn pack(self) -> u128 {
        ((self.tag as u128) << HALF) | (self.ptr as usize as u128)
    }

    #[inline(always)]
    #[allow(clippy::cast_possible_truncation)]
    fn unpack(word: u128) -> Self {
        Self {
            ptr: (word as u64) as usize as *mut T,
            tag: (word >> HALF) as u64 as usize,
        }
    }
}

/// A `(pointer, tag)` pair behind a single lock-free atomic word.
///
/// A reader never observes the pointer from one update paired with the tag
/// from another.
pub struct AtomicTaggedPtr<T> {
    inner: AtomicU128,
    _marker: PhantomData<*mut T>,
}

impl<T> AtomicTaggedPtr<T> {
    /// Creates a new cell.
    #[inline]
    pub fn new(value: TaggedPtr<T>) -> Self {
        Self {
            inner: AtomicU128::new(value.pack()),
            _marker: PhantomData,
        }
    }

    /// A cell holding a null pointer and tag 0.
    #[inline(always)]
    pub const fn null() -> Self {
        Self {
            inner: AtomicU128::new(0),
            _marker: PhantomData,
        }
    }

    /// Replaces the value through an exclusive borrow; no synchronization needed.
    #[inline]
    pub fn initialize(&mut self, value: TaggedPtr<T>) {
        *self.inner.get_mut() = value.pack();
    }

    /// Reads the value through an exclusive borrow.
    #[inline]
    pub fn get(&mut self) -> TaggedPtr<T> {
        TaggedPtr::unpack(*self.inner.get_mut())
    }

    /// Consumes the cell, returning its value.
    #[inline]
    pub fn into_inner(self) -> TaggedPtr<T> {
        TaggedPtr::unpack(self.inner.into_inner())
    }

    /// Relaxed read of the pointer half.
    #[inline]
    pub fn pointer(&self) -> *mut T {
        self.load(LoadOrder::Relaxed).pointer()
    }

    /// Relaxed read of the tag half.
    #[inline]
    pub fn tag(&self) -> usize {
        self.load(LoadOrder::Relaxed).tag()
    }

    /// Loads both halves.
    #[inline(always)]
    pub fn load(&self, order: LoadOrder) -> TaggedPtr<T> {
        TaggedPtr::unpack(self.inner.load(order.into()))
    }

    /// Stores both halves.
    #[inline(always)]
    pub fn store(&self, value: TaggedPtr<T>, order: StoreOrder) {
        self.inner.store(value.pack(), order.into());
    }

    /// Exchanges both halves, returning the previous pair.
    #[inline(always)]
    pub fn swap(&self, value: TaggedPtr<T>, order: MemoryOrder) -> TaggedPtr<T> {
        TaggedPtr::unpack(self.inner.swap(value.pack(), order.into()))
    }

    /// Stores `future` if the cell holds exactly `current` (pointer and tag).
    ///
    /// `Ok` carries the previous pair, `Err` the pair actually observed.
    #[inline]
    pub fn compare_exchange(
        &self,
        current: TaggedPtr<T>,
        future: TaggedPtr<T>,
        kind: CasKind,
        success: MemoryOrder,
        failure: LoadOrder,
    ) -> Result<TaggedPtr<T>, TaggedPtr<T>> {
        dispatch_cas!(self.inner, current.pack(), future.pack(), kind, success, failure)
            .map(TaggedPtr::unpack)
            .map_err(TaggedPtr::unpack)
    }

    /// Stores `future` if the cell holds `current`; returns whether it did.
    #[inline]
    pub fn compare_and_swap(
        &self,
        current: TaggedPtr<T>,
        future: TaggedPtr<T>,
        kind: CasKind,
        order: MemoryOrder,
    ) -> bool {
        self.compare_exchange(current, future, kind, order, order.load_part())
            .is_ok()
    }

    /// Compare-and-swap that refreshes `current` with the observed pair on failure.
    #[inline]
    pub fn load_compare_and_swap(
        &self,
        current: &mut TaggedPtr<T>,
        future: TaggedPtr<T>,
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

impl<T> Default for AtomicTaggedPtr<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T> fmt::Debug for AtomicTaggedPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.load(LoadOrder::Relaxed), f)
    }
}

// SAFETY: the cell only stores an address; it never dereferences it.
unsafe impl<T> Send for AtomicTaggedPtr<T> {}
unsafe impl<T> Sync for AtomicTaggedPtr<T> {}
