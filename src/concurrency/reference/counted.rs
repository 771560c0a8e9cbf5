use std::sync::Arc;

/// A reference-counted handle whose ownership units can be moved through a raw pointer.
///
/// This is the retain/release interface [`AtomicReference`] is built on. A handle
/// is one unit of the object's strong count; `into_raw` turns that unit into a
/// bare pointer and `from_raw` turns it back.
///
/// # Safety
///
/// Implementors must guarantee that:
/// - `into_raw` never returns null, and returns the same address as `as_ptr`;
/// - `retain` adds exactly one unit and `release` removes exactly one unit, and
///   both may run concurrently from any number of threads;
/// - the object stays valid while at least one unit is outstanding.
///
/// [`AtomicReference`]: super::AtomicReference
pub unsafe trait RefCounted: Sized {
    /// The pointee type; its address is the handle's identity.
    type Target;

    /// Gives up this handle's unit, returning the object's address.
    fn into_raw(this: Self) -> *const Self::Target;

    /// Reclaims a unit previously produced by `into_raw` or `retain`.
    ///
    /// # Safety
    ///
    /// `ptr` must carry an outstanding unit that the caller owns.
    unsafe fn from_raw(ptr: *const Self::Target) -> Self;

    /// The object's address, without touching the count.
    fn as_ptr(this: &Self) -> *const Self::Target;

    /// Mints one new unit.
    ///
    /// # Safety
    ///
    /// The object must be kept alive by some other unit for the duration of the call.
    unsafe fn retain(ptr: *const Self::Target);

    /// Gives up one unit, destroying the object if it was the last.
    ///
    /// # Safety
    ///
    /// The caller must own the unit being released.
    unsafe fn release(ptr: *const Self::Target) {
        drop(Self::from_raw(ptr));
    }
}

// SAFETY: `Arc` upholds every requirement: its count is atomic and
// `into_raw`/`from_raw` round-trip one strong unit.
unsafe impl<T> RefCounted for Arc<T> {
    type Target = T;

    #[inline(always)]
    fn into_raw(this: Self) -> *const T {
        Arc::into_raw(this)
    }

    #[inline(always)]
    unsafe fn from_raw(ptr: *const T) -> Self {
        Arc::from_raw(ptr)
    }

    #[inline(always)]
    fn as_ptr(this: &Self) -> *const T {
        Arc::as_ptr(this)
    }

    #[inline(always)]
    unsafe fn retain(ptr: *const T) {
        Arc::increment_strong_count(ptr);
    }

    #[inline(always)]
    unsafe fn release(ptr: *const T) {
        Arc::decrement_strong_count(ptr);
    }
}
