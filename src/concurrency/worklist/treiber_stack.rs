//! A lock-free Treiber stack built on [`AtomicReference`].
//!
//! `head` owns the top node and every node owns its successor. A popper holds
//! a retained copy of the head it is trying to unlink, so the node cannot be
//! freed and its address cannot be reused while the CAS is in flight; identity
//! CAS is therefore ABA-free without tags or epochs.

use std::sync::Arc;

use crossbeam_utils::{Backoff, CachePadded};

use crate::concurrency::atomic::AtomicUsize;
use crate::concurrency::reference::AtomicReference;
use crate::order::{CasKind, LoadOrder, MemoryOrder};

struct Node<T> {
    value: Arc<T>,
    next: AtomicReference<Arc<Node<T>>>,
}

/// A multi-producer, multi-consumer LIFO stack of shared values.
pub struct AtomicStack<T> {
    head: CachePadded<AtomicReference<Arc<Node<T>>>>,
    len: AtomicUsize,
}

impl<T> AtomicStack<T> {
    /// Creates an empty stack.
    pub fn new() -> Self {
        Self {
            head: CachePadded::new(AtomicReference::empty()),
            len: AtomicUsize::new(0),
        }
    }

    /// Whether the stack was empty at the time of the call.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head.is_empty(LoadOrder::Acquire)
    }

    /// Approximate number of values; exact when no push or pop is in flight.
    ///
    /// May count a value whose push is still in flight, never one already popped.
    #[inline]
    pub fn len(&self) -> usize {
        self.len.load(LoadOrder::Relaxed)
    }

    /// Pushes a value.
    pub fn push(&self, value: T) {
        self.push_shared(Arc::new(value));
    }

    /// Pushes an already shared value.
    pub fn push_shared(&self, value: Arc<T>) {
        let backoff = Backoff::new();
        let node = Arc::new(Node {
            value,
            next: AtomicReference::empty(),
        });
        // Counted before publishing, so a pop never decrements ahead of it.
        self.len.increment(MemoryOrder::Relaxed);
        let mut top = self.head.load(LoadOrder::Acquire);
        loop {
            let expected = top.as_ref().map_or(core::ptr::null(), Arc::as_ptr);
            // `node` is unpublished, so nobody else can observe this link.
            drop(node.next.swap(top, MemoryOrder::Relaxed));
            if self
                .head
                .compare_and_swap(expected, Some(&node), CasKind::Weak, MemoryOrder::AcqRel)
            {
                return;
            }
            backoff.spin();
            top = self.head.load(LoadOrder::Acquire);
        }
    }

    /// Pops the most recently pushed value.
    pub fn pop(&self) -> Option<Arc<T>> {
        let backoff = Backoff::new();
        loop {
            let top = self.head.load(LoadOrder::Acquire)?;
            let next = top.next.load(LoadOrder::Acquire);
            if self.head.compare_and_swap(
                Arc::as_ptr(&top),
                next.as_ref(),
                CasKind::Weak,
                MemoryOrder::AcqRel,
            ) {
                self.len.decrement(MemoryOrder::Relaxed);
                return Some(Arc::clone(&top.value));
            }
            backoff.spin();
        }
    }

    /// Returns the top value without removing it.
    pub fn peek(&self) -> Option<Arc<T>> {
        self.head
            .load(LoadOrder::Acquire)
            .map(|top| Arc::clone(&top.value))
    }
}

impl<T> Default for AtomicStack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for AtomicStack<T> {
    fn drop(&mut self) {
        // Unlink iteratively; dropping a long chain recursively would overflow.
        let mut cursor = self.head.take(MemoryOrder::Relaxed);
        while let Some(node) = cursor {
            cursor = node.next.take(MemoryOrder::Relaxed);
        }
    }
}
