//! An atomic slot owning at most one reference-counted object.
//!
//! # Reclamation
//!
//! The slot is a single [`AtomicTaggedPtr`]: the pointer half is the owned
//! object, the tag half counts *borrowers*, threads that have announced
//! interest in the current object and have not finished with it yet.
//!
//! A `load` borrows by bumping the tag with a CAS, retains the object (the
//! slot's own unit keeps it alive meanwhile), and then gives the borrow back:
//! if the slot still holds the same object with a non-zero tag it decrements
//! the tag, otherwise it releases one *prepaid* unit.
//!
//! Anything that removes an object from the slot (`swap`, CAS) first borrows it
//! itself, retains it once for every borrower the tag records, and only then
//! replaces the word; if the tag moved in between it pays the difference and
//! tries again. Once the object is out of the slot, every borrower that will
//! later find it gone already has a unit waiting for it, so the count can never
//! reach zero under a `load` that is still retaining.
//!
//! Borrowers of one object are interchangeable, which keeps the accounting exact
//! even when the same object is reinstalled: at every instant the number of
//! outstanding borrowers equals the slot's tag (while the slot holds the object)
//! plus the prepaid units not yet released.
//!
//! The tag is a full `usize` and saturates at [`MAX_TAG`]; a borrower that
//! finds it saturated backs off until someone leaves.
//!
//! # Orderings
//!
//! Every operation takes an ordering, defaulting to `SeqCst`. Weaker requests
//! are strengthened to what keeps reclamation sound: loads acquire at least,
//! installs and removals are at least `AcqRel`.

mod counted;

pub use counted::RefCounted;

use core::{fmt, marker::PhantomData, ptr};

use crossbeam_utils::Backoff;

use crate::concurrency::atomic::tagged::{AtomicTaggedPtr, TaggedPtr, MAX_TAG};
use crate::order::{CasKind, LoadOrder, MemoryOrder};

/// A lock-free slot holding zero or one strong reference.
///
/// `P` is the owning handle, usually `Arc<T>`. The slot owns exactly one unit
/// of its object's count while occupied; [`load`](Self::load) hands out new
/// units, [`swap`](Self::swap) and [`take`](Self::take) hand the slot's unit
/// over.
///
/// ```
/// use std::sync::Arc;
/// use halo_atomics::{AtomicReference, LoadOrder, MemoryOrder};
///
/// let slot = AtomicReference::new(Some(Arc::new(1)));
/// let seen = slot.load(LoadOrder::Acquire).unwrap();
/// let old = slot.swap(Some(Arc::new(2)), MemoryOrder::AcqRel).unwrap();
/// assert!(Arc::ptr_eq(&seen, &old));
/// assert_eq!(*slot.take(MemoryOrder::AcqRel).unwrap(), 2);
/// ```
pub struct AtomicReference<P: RefCounted> {
    word: AtomicTaggedPtr<P::Target>,
    _owns: PhantomData<P>,
}

#[inline(always)]
fn acquiring(order: LoadOrder) -> LoadOrder {
    match order {
        LoadOrder::Relaxed => LoadOrder::Acquire,
        order => order,
    }
}

#[inline(always)]
fn acq_rel(order: MemoryOrder) -> MemoryOrder {
    match order {
        MemoryOrder::SeqCst => MemoryOrder::SeqCst,
        _ => MemoryOrder::AcqRel,
    }
}

impl<P: RefCounted> AtomicReference<P> {
    /// Creates a slot, taking over `value`'s unit if there is one.
    #[inline]
    pub fn new(value: Option<P>) -> Self {
        let raw = value.map_or(ptr::null(), P::into_raw);
        Self {
            word: AtomicTaggedPtr::new(TaggedPtr::new(raw.cast_mut(), 0)),
            _owns: PhantomData,
        }
    }

    /// Creates an empty slot.
    #[inline]
    pub const fn empty() -> Self {
        Self {
            word: AtomicTaggedPtr::null(),
            _owns: PhantomData,
        }
    }

    /// Whether the slot is currently empty.
    #[inline]
    pub fn is_empty(&self, order: LoadOrder) -> bool {
        self.word.load(order).is_null()
    }

    /// Consumes the slot, returning its object.
    #[inline]
    pub fn into_inner(self) -> Option<P> {
        self.take(MemoryOrder::AcqRel)
    }

    /// Returns a new strong reference to the current object, if any.
    ///
    /// The returned handle is independent of the slot: it stays valid whatever
    /// happens to the slot afterwards.
    pub fn load(&self, order: LoadOrder) -> Option<P> {
        let ptr = self.borrow(acquiring(order))?;
        // SAFETY: the borrow keeps `ptr` alive (see module docs).
        let loaded = unsafe {
            P::retain(ptr);
            P::from_raw(ptr)
        };
        self.give_back(ptr);
        Some(loaded)
    }

    /// Installs `value`, returning the previous object with its unit.
    pub fn swap(&self, value: Option<P>, order: MemoryOrder) -> Option<P> {
        let future = value.map_or(ptr::null(), P::into_raw);
        match self.replace(None, future, CasKind::Strong, order) {
            Ok(displaced) => Self::reclaim(displaced),
            Err(_) => unreachable!("an unconditional swap cannot fail"),
        }
    }

    /// Empties the slot, returning its object.
    #[inline]
    pub fn take(&self, order: MemoryOrder) -> Option<P> {
        self.swap(None, order)
    }

    /// Installs a new reference to `value` if the slot is empty.
    ///
    /// The caller keeps its own reference either way; on success the slot owns
    /// a freshly retained one.
    pub fn store_if_nil(&self, value: &P, order: MemoryOrder) -> bool {
        let raw = P::as_ptr(value);
        // SAFETY: `value` keeps the object alive.
        unsafe { P::retain(raw) };
        if self.install_if_empty(raw, order) {
            true
        } else {
            // SAFETY: we own the unit minted above.
            unsafe { P::release(raw) };
            false
        }
    }

    /// Installs `value` if the slot is empty, consuming it either way.
    ///
    /// When the slot is occupied `value` is dropped.
    pub fn swap_if_nil(&self, value: P, order: MemoryOrder) -> bool {
        let raw = P::into_raw(value);
        if self.install_if_empty(raw, order) {
            true
        } else {
            // SAFETY: the unit from `into_raw` was not installed.
            unsafe { P::release(raw) };
            false
        }
    }

    /// Replaces the object whose address is `current` (null for "empty") with
    /// a new reference to `future`.
    ///
    /// Identity is pointer equality. On success the displaced object's unit is
    /// released by the slot; use [`compare_exchange`](Self::compare_exchange)
    /// to receive it instead.
    pub fn compare_and_swap(
        &self,
        current: *const P::Target,
        future: Option<&P>,
        kind: CasKind,
        order: MemoryOrder,
    ) -> bool {
        let mut current = current;
        self.load_compare_and_swap(&mut current, future, kind, order, order.load_part())
    }

    /// Like [`compare_and_swap`](Self::compare_and_swap), but on failure stores
    /// the address actually held (not retained) into `current`, ready for a retry.
    pub fn load_compare_and_swap(
        &self,
        current: &mut *const P::Target,
        future: Option<&P>,
        kind: CasKind,
        order_swap: MemoryOrder,
        order_load: LoadOrder,
    ) -> bool {
        let raw = future.map_or(ptr::null(), |p| {
            let raw = P::as_ptr(p);
            // SAFETY: `p` keeps the object alive.
            unsafe { P::retain(raw) };
            raw
        });
        match self.replace_with_failure(Some(*current), raw, kind, order_swap, order_load) {
            Ok(displaced) => {
                drop(Self::reclaim(displaced));
                true
            }
            Err(observed) => {
                drop(Self::reclaim(raw));
                *current = observed;
                false
            }
        }
    }

    /// Replaces the object whose address is `current` with `future`.
    ///
    /// `Ok` hands the displaced object (and its unit) to the caller; `Err`
    /// hands `future` back untouched.
    pub fn compare_exchange(
        &self,
        current: *const P::Target,
        future: Option<P>,
        kind: CasKind,
        success: MemoryOrder,
        failure: LoadOrder,
    ) -> Result<Option<P>, Option<P>> {
        let raw = future.map_or(ptr::null(), P::into_raw);
        match self.replace_with_failure(Some(current), raw, kind, success, failure) {
            Ok(displaced) => Ok(Self::reclaim(displaced)),
            Err(_) => Err(Self::reclaim(raw)),
        }
    }

    #[inline(always)]
    fn reclaim(raw: *const P::Target) -> Option<P> {
        // SAFETY: callers pass pointers that carry a unit they own.
        (!raw.is_null()).then(|| unsafe { P::from_raw(raw) })
    }

    fn install_if_empty(&self, raw: *const P::Target, order: MemoryOrder) -> bool {
        let order = acq_rel(order);
        self.word
            .compare_exchange(
                TaggedPtr::null(),
                TaggedPtr::new(raw.cast_mut(), 0),
                CasKind::Strong,
                order,
                order.load_part(),
            )
            .is_ok()
    }

    /// Registers as a borrower of the current object; `None` if empty.
    fn borrow(&self, order: LoadOrder) -> Option<*const P::Target> {
        let backoff = Backoff::new();
        let mut current = self.word.load(order);
        loop {
            if current.is_null() {
                return None;
            }
            if current.tag() == MAX_TAG {
                debug_event!(borrowers = MAX_TAG, "borrower count saturated, backing off");
                backoff.snooze();
                current = self.word.load(order);
                continue;
            }
            match self.word.compare_exchange(
                current,
                current.incremented(),
                CasKind::Strong,
                order.into(),
                order,
            ) {
                Ok(_) => return Some(current.pointer().cast_const()),
                Err(observed) => current = observed,
            }
        }
    }

    /// Ends a borrow of `ptr` started by [`borrow`](Self::borrow).
    fn give_back(&self, ptr: *const P::Target) {
        let mut current = self.word.load(LoadOrder::Relaxed);
        loop {
            if !ptr::eq(current.pointer(), ptr) || current.tag() == 0 {
                // The object left the slot and a unit was prepaid for us.
                // SAFETY: that unit is ours to release.
                unsafe { P::release(ptr) };
                return;
            }
            match self.word.compare_exchange(
                current,
                current.decremented(),
                CasKind::Strong,
                MemoryOrder::Release,
                LoadOrder::Relaxed,
            ) {
                Ok(_) => return,
                Err(observed) => current = observed,
            }
        }
    }

    fn replace(
        &self,
        expected: Option<*const P::Target>,
        future: *const P::Target,
        kind: CasKind,
        order: MemoryOrder,
    ) -> Result<*const P::Target, *const P::Target> {
        self.replace_with_failure(expected, future, kind, order, order.load_part())
    }

    /// Core of every removal: swaps `future` in when the slot holds `expected`
    /// (or unconditionally when `expected` is `None`).
    ///
    /// `Ok` carries the displaced address with the slot's unit, `Err` the
    /// address observed instead. `future`'s unit moves into the slot only on
    /// success.
    fn replace_with_failure(
        &self,
        expected: Option<*const P::Target>,
        future: *const P::Target,
        kind: CasKind,
        order: MemoryOrder,
        failure: LoadOrder,
    ) -> Result<*const P::Target, *const P::Target> {
        let order = acq_rel(order);
        let failure = acquiring(failure);
        let installed = TaggedPtr::new(future.cast_mut(), 0);
        let backoff = Backoff::new();
        let mut current = self.word.load(failure);

        loop {
            if let Some(expected) = expected {
                if !ptr::eq(current.pointer(), expected) {
                    return Err(current.pointer().cast_const());
                }
            }

            if current.is_null() {
                match self
                    .word
                    .compare_exchange(current, installed, kind, order, failure)
                {
                    Ok(_) => return Ok(ptr::null()),
                    Err(observed) if observed == current => return Err(ptr::null()),
                    Err(observed) => {
                        current = observed;
                        continue;
                    }
                }
            }

            if current.tag() == MAX_TAG {
                backoff.snooze();
                current = self.word.load(failure);
                continue;
            }

            // Borrow the object ourselves so it outlives the prepayment below.
            let mut borrowed = current.incremented();
            if let Err(observed) = self.word.compare_exchange(
                current,
                borrowed,
                CasKind::Strong,
                MemoryOrder::Acquire,
                failure,
            ) {
                current = observed;
                continue;
            }

            let object = current.pointer().cast_const();
            let mut paid = 0usize;
            loop {
                while paid < borrowed.tag() {
                    // SAFETY: our borrow keeps `object` alive.
                    unsafe { P::retain(object) };
                    paid += 1;
                }
                match self
                    .word
                    .compare_exchange(borrowed, installed, kind, order, failure)
                {
                    Ok(_) => {
                        // Every other borrower keeps one prepaid unit; ours
                        // and any surplus go back. The slot's unit keeps the
                        // object alive through this.
                        let others = borrowed.tag() - 1;
                        if others > 0 {
                            trace_event!(borrowers = others, "prepaid outstanding borrowers");
                        }
                        for _ in others..paid {
                            // SAFETY: these units were minted above.
                            unsafe { P::release(object) };
                        }
                        return Ok(object);
                    }
                    Err(observed) if observed == borrowed => {
                        // Spurious weak failure: unwind and report it.
                        self.refund(object, paid);
                        return Err(object);
                    }
                    Err(observed) if ptr::eq(observed.pointer(), object) && observed.tag() != 0 => {
                        borrowed = observed;
                    }
                    Err(observed) => {
                        // Someone else removed the object; they prepaid our borrow.
                        self.refund(object, paid);
                        current = observed;
                        break;
                    }
                }
            }
        }
    }

    /// Drops `paid` prepaid units and ends our own borrow of `object`.
    fn refund(&self, object: *const P::Target, paid: usize) {
        for _ in 0..paid {
            // SAFETY: minted by the caller; the borrow still protects `object`.
            unsafe { P::release(object) };
        }
        self.give_back(object);
    }
}

impl<P: RefCounted> Drop for AtomicReference<P> {
    fn drop(&mut self) {
        let current = self.word.load(LoadOrder::Relaxed);
        debug_assert_eq!(current.tag(), 0, "slot dropped with borrowers outstanding");
        if !current.is_null() {
            // SAFETY: `&mut self` means no borrowers; the slot owns this unit.
            unsafe { P::release(current.pointer().cast_const()) };
        }
    }
}

impl<P: RefCounted> Default for AtomicReference<P> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<P: RefCounted> From<P> for AtomicReference<P> {
    fn from(value: P) -> Self {
        Self::new(Some(value))
    }
}

impl<P: RefCounted> From<Option<P>> for AtomicReference<P> {
    fn from(value: Option<P>) -> Self {
        Self::new(value)
    }
}

impl<P: RefCounted> fmt::Debug for AtomicReference<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let current = self.word.load(LoadOrder::Relaxed);
        f.debug_struct("AtomicReference")
            .field("ptr", &current.pointer())
            .field("borrowers", &current.tag())
            .finish()
    }
}

// SAFETY: the slot moves `P` values between threads (`Send`) and lets every
// thread with `&self` obtain or remove one (`Send + Sync`).
unsafe impl<P: RefCounted + Send> Send for AtomicReference<P> {}
unsafe impl<P: RefCounted + Send + Sync> Sync for AtomicReference<P> {}
