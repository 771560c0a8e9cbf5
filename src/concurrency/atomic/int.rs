use core::{fmt, sync::atomic};

use num_traits::PrimInt;

use crate::order::{dispatch_cas, CasKind, LoadOrder, MemoryOrder, StoreOrder};

mod sealed {
    pub trait Sealed {}
}

/// A primitive integer with a matching lock-free `core::sync::atomic` type.
///
/// This is the seam that lets [`AtomicInt`] cover every width with one
/// implementation. It is sealed: the set of widths is fixed by the platform.
pub trait AtomicPrimitive:
    sealed::Sealed + PrimInt + fmt::Debug + Send + Sync + 'static
{
    /// The `core` atomic storing this width.
    type Atomic: Send + Sync;

    #[doc(hidden)]
    fn new_atomic(value: Self) -> Self::Atomic;
    #[doc(hidden)]
    fn atomic_get_mut(atomic: &mut Self::Atomic) -> &mut Self;
    #[doc(hidden)]
    fn atomic_into_inner(atomic: Self::Atomic) -> Self;
    #[doc(hidden)]
    fn atomic_load(atomic: &Self::Atomic, order: LoadOrder) -> Self;
    #[doc(hidden)]
    fn atomic_store(atomic: &Self::Atomic, value: Self, order: StoreOrder);
    #[doc(hidden)]
    fn atomic_swap(atomic: &Self::Atomic, value: Self, order: MemoryOrder) -> Self;
    #[doc(hidden)]
    fn atomic_fetch_add(atomic: &Self::Atomic, value: Self, order: MemoryOrder) -> Self;
    #[doc(hidden)]
    fn atomic_fetch_sub(atomic: &Self::Atomic, value: Self, order: MemoryOrder) -> Self;
    #[doc(hidden)]
    fn atomic_fetch_or(atomic: &Self::Atomic, value: Self, order: MemoryOrder) -> Self;
    #[doc(hidden)]
    fn atomic_fetch_xor(atomic: &Self::Atomic, value: Self, order: MemoryOrder) -> Self;
    #[doc(hidden)]
    fn atomic_fetch_and(atomic: &Self::Atomic, value: Self, order: MemoryOrder) -> Self;
    #[doc(hidden)]
    fn atomic_compare_exchange(
        atomic: &Self::Atomic,
        current: Self,
        new: Self,
        kind: CasKind,
        success: MemoryOrder,
        failure: LoadOrder,
    ) -> Result<Self, Self>;
}

macro_rules! impl_atomic_primitive {
    ($($value:ty => $atomic:ty),* $(,)?) => {
        $(
            impl sealed::Sealed for $value {}

            impl AtomicPrimitive for $value {
                type Atomic = $atomic;

                #[inline(always)]
                fn new_atomic(value: Self) -> Self::Atomic {
                    <$atomic>::new(value)
                }

                #[inline(always)]
                fn atomic_get_mut(atomic: &mut Self::Atomic) -> &mut Self {
                    atomic.get_mut()
                }

                #[inline(always)]
                fn atomic_into_inner(atomic: Self::Atomic) -> Self {
                    atomic.into_inner()
                }

                #[inline(always)]
                fn atomic_load(atomic: &Self::Atomic, order: LoadOrder) -> Self {
                    atomic.load(order.into())
                }

                #[inline(always)]
                fn atomic_store(atomic: &Self::Atomic, value: Self, order: StoreOrder) {
                    atomic.store(value, order.into());
                }

                #[inline(always)]
                fn atomic_swap(atomic: &Self::Atomic, value: Self, order: MemoryOrder) -> Self {
                    atomic.swap(value, order.into())
                }

                #[inline(always)]
                fn atomic_fetch_add(atomic: &Self::Atomic, value: Self, order: MemoryOrder) -> Self {
                    atomic.fetch_add(value, order.into())
                }

                #[inline(always)]
                fn atomic_fetch_sub(atomic: &Self::Atomic, value: Self, order: MemoryOrder) -> Self {
                    atomic.fetch_sub(value, order.into())
                }

                #[inline(always)]
                fn atomic_fetch_or(atomic: &Self::Atomic, value: Self, order: MemoryOrder) -> Self {
                    atomic.fetch_or(value, order.into())
                }

                #[inline(always)]
                fn atomic_fetch_xor(atomic: &Self::Atomic, value: Self, order: MemoryOrder) -> Self {
                    atomic.fetch_xor(value, order.into())
                }

                #[inline(always)]
                fn atomic_fetch_and(atomic: &Self::Atomic, value: Self, order: MemoryOrder) -> Self {
                    atomic.fetch_and(value, order.into())
                }

                #[inline(always)]
                fn atomic_compare_exchange(
                    atomic: &Self::Atomic,
                    current: Self,
                    new: Self,
                    kind: CasKind,
                    success: MemoryOrder,
                    failure: LoadOrder,
                ) -> Result<Self, Self> {
                    dispatch_cas!(atomic, current, new, kind, success, failure)
                }
            }
        )*
    };
}

impl_atomic_primitive! {
    i8 => atomic::AtomicI8,
    i16 => atomic::AtomicI16,
    i32 => atomic::AtomicI32,
    i64 => atomic::AtomicI64,
    isize => atomic::AtomicIsize,
    u8 => atomic::AtomicU8,
    u16 => atomic::AtomicU16,
    u32 => atomic::AtomicU32,
    u64 => atomic::AtomicU64,
    usize => atomic::AtomicUsize,
}

/// A lock-free integer cell of any primitive width.
///
/// Arithmetic wraps around on overflow (`add(1)` on `i8::MAX` leaves
/// `i8::MIN`); every read-modify-write returns the value held before the
/// operation.
#[repr(transparent)]
pub struct AtomicInt<T: AtomicPrimitive> {
    inner: T::Atomic,
}

/// Signed 8-bit cell.
pub type AtomicI8 = AtomicInt<i8>;
/// Signed 16-bit cell.
pub type AtomicI16 = AtomicInt<i16>;
/// Signed 32-bit cell.
pub type AtomicI32 = AtomicInt<i32>;
/// Signed 64-bit cell.
pub type AtomicI64 = AtomicInt<i64>;
/// Signed word-sized cell.
pub type AtomicIsize = AtomicInt<isize>;
/// Unsigned 8-bit cell.
pub type AtomicU8 = AtomicInt<u8>;
/// Unsigned 16-bit cell.
pub type AtomicU16 = AtomicInt<u16>;
/// Unsigned 32-bit cell.
pub type AtomicU32 = AtomicInt<u32>;
/// Unsigned 64-bit cell.
pub type AtomicU64 = AtomicInt<u64>;
/// Unsigned word-sized cell.
pub type AtomicUsize = AtomicInt<usize>;

impl<T: AtomicPrimitive> AtomicInt<T> {
    /// Creates a new cell holding `value`.
    #[inline(always)]
    pub fn new(value: T) -> Self {
        Self {
            inner: T::new_atomic(value),
        }
    }

    /// Mutable access through an exclusive borrow; no synchronization needed.
    #[inline(always)]
    pub fn get_mut(&mut self) -> &mut T {
        T::atomic_get_mut(&mut self.inner)
    }

    /// Consumes the cell, returning its value.
    #[inline(always)]
    pub fn into_inner(self) -> T {
        T::atomic_into_inner(self.inner)
    }

    /// Relaxed read of the current value.
    #[inline(always)]
    pub fn value(&self) -> T {
        self.load(LoadOrder::Relaxed)
    }

    /// Loads the current value.
    #[inline(always)]
    pub fn load(&self, order: LoadOrder) -> T {
        T::atomic_load(&self.inner, order)
    }

    /// Stores a new value.
    #[inline(always)]
    pub fn store(&self, value: T, order: StoreOrder) {
        T::atomic_store(&self.inner, value, order);
    }

    /// Swaps the current value, returning the previous value.
    #[inline(always)]
    pub fn swap(&self, value: T, order: MemoryOrder) -> T {
        T::atomic_swap(&self.inner, value, order)
    }

    /// Wrapping add, returning the previous value.
    #[inline(always)]
    pub fn add(&self, delta: T, order: MemoryOrder) -> T {
        T::atomic_fetch_add(&self.inner, delta, order)
    }

    /// Wrapping subtract, returning the previous value.
    #[inline(always)]
    pub fn subtract(&self, delta: T, order: MemoryOrder) -> T {
        T::atomic_fetch_sub(&self.inner, delta, order)
    }

    /// Wrapping `+ 1`, returning the previous value.
    #[inline(always)]
    pub fn increment(&self, order: MemoryOrder) -> T {
        self.add(T::one(), order)
    }

    /// Wrapping `- 1`, returning the previous value.
    #[inline(always)]
    pub fn decrement(&self, order: MemoryOrder) -> T {
        self.subtract(T::one(), order)
    }

    /// Bitwise OR with the current value, returning the previous value.
    #[inline(always)]
    pub fn bitwise_or(&self, bits: T, order: MemoryOrder) -> T {
        T::atomic_fetch_or(&self.inner, bits, order)
    }

    /// Bitwise XOR with the current value, returning the previous value.
    #[inline(always)]
    pub fn bitwise_xor(&self, bits: T, order: MemoryOrder) -> T {
        T::atomic_fetch_xor(&self.inner, bits, order)
    }

    /// Bitwise AND with the current value, returning the previous value.
    #[inline(always)]
    pub fn bitwise_and(&self, bits: T, order: MemoryOrder) -> T {
        T::atomic_fetch_and(&self.inner, bits, order)
    }

    /// Stores `future` if the cell holds `current`.
    ///
    /// `Ok` carries the previous value, `Err` the value actually observed.
    #[inline(always)]
    pub fn compare_exchange(
        &self,
        current: T,
        future: T,
        kind: CasKind,
        success: MemoryOrder,
        failure: LoadOrder,
    ) -> Result<T, T> {
        T::atomic_compare_exchange(&self.inner, current, future, kind, success, failure)
    }

    /// Stores `future` if the cell holds `current`; returns whether it did.
    #[inline(always)]
    pub fn compare_and_swap(&self, current: T, future: T, kind: CasKind, order: MemoryOrder) -> bool {
        self.compare_exchange(current, future, kind, order, order.load_part())
            .is_ok()
    }

    /// Like [`compare_and_swap`](Self::compare_and_swap), but on failure
    /// writes the observed value back into `current` so the caller can retry.
    #[inline]
    pub fn load_compare_and_swap(
        &self,
        current: &mut T,
        future: T,
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

impl<T: AtomicPrimitive> Default for AtomicInt<T> {
    fn default() -> Self {
        Self::new(T::zero())
    }
}

impl<T: AtomicPrimitive> From<T> for AtomicInt<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: AtomicPrimitive> fmt::Debug for AtomicInt<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.load(LoadOrder::Relaxed), f)
    }
}
