//! Multi-threaded stress for `AtomicReference`.
//!
//! `Probe` is a reference-counted handle whose storage is never returned to the
//! allocator: a freed object becomes a tombstone, so a retain or release that
//! arrives after the count hit zero is caught by an assertion instead of being
//! undefined behaviour.
//!
//! `HALO_STRESS_ITERS` and `HALO_STRESS_THREADS` scale the runs.

use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, AtomicIsize, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use halo_atomics::{AtomicReference, CasKind, LoadOrder, MemoryOrder, RefCounted};

fn env_or(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn iterations() -> usize {
    env_or("HALO_STRESS_ITERS", 10_000)
}

fn threads() -> usize {
    env_or("HALO_STRESS_THREADS", 4).max(2)
}

struct ProbeInner {
    count: AtomicIsize,
    freed: AtomicBool,
    value: usize,
}

struct Probe(NonNull<ProbeInner>);

// SAFETY: the pointee is only touched through atomics and is never deallocated.
unsafe impl Send for Probe {}
unsafe impl Sync for Probe {}

impl Probe {
    fn new(value: usize) -> (Self, &'static ProbeInner) {
        let inner: &'static ProbeInner = Box::leak(Box::new(ProbeInner {
            count: AtomicIsize::new(1),
            freed: AtomicBool::new(false),
            value,
        }));
        (Probe(NonNull::from(inner)), inner)
    }

    fn value(&self) -> usize {
        let inner = unsafe { self.0.as_ref() };
        assert!(!inner.freed.load(Ordering::Acquire), "use after free");
        inner.value
    }
}

unsafe impl RefCounted for Probe {
    type Target = ProbeInner;

    fn into_raw(this: Self) -> *const ProbeInner {
        let ptr = this.0.as_ptr().cast_const();
        std::mem::forget(this);
        ptr
    }

    unsafe fn from_raw(ptr: *const ProbeInner) -> Self {
        Probe(NonNull::new_unchecked(ptr.cast_mut()))
    }

    fn as_ptr(this: &Self) -> *const ProbeInner {
        this.0.as_ptr().cast_const()
    }

    unsafe fn retain(ptr: *const ProbeInner) {
        let prev = (*ptr).count.fetch_add(1, Ordering::Relaxed);
        assert!(prev > 0, "retain after free");
    }

    unsafe fn release(ptr: *const ProbeInner) {
        let inner = &*ptr;
        let prev = inner.count.fetch_sub(1, Ordering::AcqRel);
        assert!(prev > 0, "double release");
        if prev == 1 {
            assert!(!inner.freed.swap(true, Ordering::AcqRel), "freed twice");
        }
    }
}

impl Clone for Probe {
    fn clone(&self) -> Self {
        unsafe { <Probe as RefCounted>::retain(self.0.as_ptr()) };
        Probe(self.0)
    }
}

impl Drop for Probe {
    fn drop(&mut self) {
        unsafe { <Probe as RefCounted>::release(self.0.as_ptr()) };
    }
}

fn assert_all_freed(probes: &[&'static ProbeInner]) {
    for probe in probes {
        assert_eq!(probe.count.load(Ordering::Acquire), 0, "probe {} leaked", probe.value);
        assert!(probe.freed.load(Ordering::Acquire));
    }
}

#[test]
fn loads_race_with_swaps() {
    let iters = iterations();
    let readers = threads() - 1;
    let (first, first_inner) = Probe::new(0);
    let slot = AtomicReference::new(Some(first));
    let done = AtomicBool::new(false);

    let created = thread::scope(|s| {
        for _ in 0..readers {
            s.spawn(|| {
                let mut last = 0;
                while !done.load(Ordering::Acquire) {
                    let seen = slot.load(LoadOrder::Acquire).unwrap();
                    // Writers install strictly increasing values.
                    let value = seen.value();
                    assert!(value >= last);
                    last = value;
                }
            });
        }

        let writer = s.spawn(|| {
            let mut created = vec![first_inner];
            for i in 1..=iters {
                let (probe, inner) = Probe::new(i);
                created.push(inner);
                let old = slot.swap(Some(probe), MemoryOrder::AcqRel).unwrap();
                assert_eq!(old.value(), i - 1);
            }
            done.store(true, Ordering::Release);
            created
        });
        writer.join().unwrap()
    });

    drop(slot);
    assert_all_freed(&created);
}

#[test]
fn loads_race_with_the_final_take() {
    let rounds = iterations() / 10;
    let n = threads();
    let slot = AtomicReference::<Probe>::empty();
    let barrier = Barrier::new(n + 1);

    thread::scope(|s| {
        for t in 0..n {
            let (slot, barrier) = (&slot, &barrier);
            s.spawn(move || {
                for _ in 0..rounds {
                    barrier.wait();
                    if t == 0 {
                        drop(slot.swap(None, MemoryOrder::AcqRel));
                    } else {
                        while let Some(seen) = slot.load(LoadOrder::Acquire) {
                            let _ = seen.value();
                        }
                    }
                    barrier.wait();
                }
            });
        }

        for round in 0..rounds {
            let (probe, inner) = Probe::new(round);
            assert!(slot.swap_if_nil(probe, MemoryOrder::AcqRel));
            barrier.wait();
            barrier.wait();
            assert!(slot.is_empty(LoadOrder::Acquire));
            assert_all_freed(&[inner]);
        }
    });
}

#[test]
fn racing_takes_release_the_object_once() {
    let rounds = iterations() / 10;
    let n = threads();
    let slot = AtomicReference::<Probe>::empty();
    let barrier = Barrier::new(n + 1);
    let taken = AtomicUsize::new(0);

    thread::scope(|s| {
        for _ in 0..n {
            s.spawn(|| {
                for _ in 0..rounds {
                    barrier.wait();
                    while let Some(probe) = slot.take(MemoryOrder::AcqRel) {
                        let _ = probe.value();
                        taken.fetch_add(1, Ordering::Relaxed);
                    }
                    barrier.wait();
                }
            });
        }

        for round in 0..rounds {
            let (probe, inner) = Probe::new(round);
            assert!(slot.swap_if_nil(probe, MemoryOrder::AcqRel));
            barrier.wait();
            barrier.wait();
            assert_all_freed(&[inner]);
        }
    });

    assert_eq!(taken.into_inner(), rounds);
}

#[test]
fn reinstalling_shared_objects_keeps_counts_exact() {
    const POOL: usize = 4;
    let per_thread = iterations() / 2;
    let n = threads();
    let (pool, created): (Vec<Probe>, Vec<&'static ProbeInner>) = (0..POOL).map(Probe::new).unzip();
    let slot = AtomicReference::new(Some(pool[0].clone()));

    thread::scope(|s| {
        for t in 0..n {
            let (slot, pool) = (&slot, &pool);
            s.spawn(move || {
                for i in 0..per_thread {
                    let pick = &pool[(i + t) % POOL];
                    match (i * 7 + t) % 5 {
                        0 | 1 => {
                            if let Some(seen) = slot.load(LoadOrder::Acquire) {
                                assert!(seen.value() < POOL);
                            }
                        }
                        2 => drop(slot.take(MemoryOrder::AcqRel)),
                        3 => drop(slot.swap(Some(pick.clone()), MemoryOrder::AcqRel)),
                        _ => match slot.load(LoadOrder::Acquire) {
                            Some(seen) => {
                                slot.compare_and_swap(
                                    RefCounted::as_ptr(&seen),
                                    Some(pick),
                                    CasKind::Weak,
                                    MemoryOrder::AcqRel,
                                );
                            }
                            None => {
                                slot.store_if_nil(pick, MemoryOrder::AcqRel);
                            }
                        },
                    }
                }
            });
        }
    });

    drop(slot);
    for inner in &created {
        assert_eq!(inner.count.load(Ordering::Acquire), 1, "probe {} miscounted", inner.value);
    }
    drop(pool);
    assert_all_freed(&created);
}

#[test]
fn concurrent_takes_hand_out_each_object_once() {
    let rounds = iterations() / 10;
    let n = threads();
    let slot = AtomicReference::<Arc<usize>>::empty();
    let barrier = Barrier::new(n + 1);
    let winners = AtomicUsize::new(0);

    thread::scope(|s| {
        for _ in 0..n {
            s.spawn(|| {
                for _ in 0..rounds {
                    barrier.wait();
                    // Half the work is loading, to keep borrowers in the tag.
                    for _ in 0..4 {
                        drop(slot.load(LoadOrder::Acquire));
                    }
                    if let Some(value) = slot.take(MemoryOrder::AcqRel) {
                        winners.fetch_add(1, Ordering::Relaxed);
                        assert!(Arc::strong_count(&value) >= 2);
                    }
                    barrier.wait();
                }
            });
        }

        for round in 0..rounds {
            let value = Arc::new(round);
            assert!(slot.swap_if_nil(Arc::clone(&value), MemoryOrder::AcqRel));
            barrier.wait();
            barrier.wait();
            assert!(slot.is_empty(LoadOrder::Acquire));
            assert_eq!(Arc::strong_count(&value), 1);
        }
    });

    assert_eq!(winners.into_inner(), rounds);
}

#[test]
fn cas_increments_are_not_lost() {
    let per_thread = iterations() / 4;
    let n = threads();
    let slot = AtomicReference::new(Some(Arc::new(0usize)));

    thread::scope(|s| {
        for _ in 0..n {
            s.spawn(|| {
                for _ in 0..per_thread {
                    let mut seen = slot.load(LoadOrder::Acquire).unwrap();
                    loop {
                        let next = Arc::new(*seen + 1);
                        // `seen` stays retained, so its address cannot be reused.
                        if slot.compare_and_swap(
                            Arc::as_ptr(&seen),
                            Some(&next),
                            CasKind::Weak,
                            MemoryOrder::AcqRel,
                        ) {
                            break;
                        }
                        seen = slot.load(LoadOrder::Acquire).unwrap();
                    }
                }
            });
        }
    });

    let last = slot.take(MemoryOrder::SeqCst).unwrap();
    assert_eq!(*last, n * per_thread);
    assert_eq!(Arc::strong_count(&last), 1);
}

#[test]
fn probe_cas_race_releases_everything() {
    let per_thread = iterations() / 4;
    let n = threads();
    let (first, first_inner) = Probe::new(0);
    let slot = AtomicReference::new(Some(first));

    let mut created = vec![first_inner];
    thread::scope(|s| {
        let handles: Vec<_> = (0..n)
            .map(|_| {
                s.spawn(|| {
                    let mut mine = Vec::with_capacity(per_thread);
                    for i in 0..per_thread {
                        let seen = slot.load(LoadOrder::Acquire).unwrap();
                        let (next, inner) = Probe::new(i);
                        mine.push(inner);
                        let _ = seen.value();
                        let mut current = RefCounted::as_ptr(&seen);
                        slot.load_compare_and_swap(
                            &mut current,
                            Some(&next),
                            CasKind::Strong,
                            MemoryOrder::AcqRel,
                            LoadOrder::Acquire,
                        );
                    }
                    mine
                })
            })
            .collect();
        for handle in handles {
            created.extend(handle.join().unwrap());
        }
    });

    drop(slot);
    assert_all_freed(&created);
}

#[test]
fn only_one_store_if_nil_wins() {
    let n = threads();
    for _ in 0..iterations() / 100 {
        let slot = AtomicReference::<Arc<usize>>::empty();
        let candidates: Vec<_> = (0..n).map(Arc::new).collect();
        let wins = AtomicUsize::new(0);
        thread::scope(|s| {
            for candidate in &candidates {
                let (slot, wins) = (&slot, &wins);
                s.spawn(move || {
                    if slot.store_if_nil(candidate, MemoryOrder::AcqRel) {
                        wins.fetch_add(1, Ordering::Relaxed);
                    }
                });
            }
        });
        assert_eq!(wins.into_inner(), 1);
        let winner = slot.load(LoadOrder::Acquire).unwrap();
        assert_eq!(Arc::strong_count(&candidates[*winner]), 3);
        drop(winner);
        drop(slot);
        assert!(candidates.iter().all(|c| Arc::strong_count(c) == 1));
    }
}
