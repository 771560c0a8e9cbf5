use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use halo_atomics::{AtomicReference, AtomicStack, LoadOrder, MemoryOrder};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread;

const OPS: usize = 1000;

fn bench_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("reference_load");
    group.throughput(Throughput::Elements(OPS as u64));

    group.bench_function("atomic_reference", |b| {
        let slot = AtomicReference::new(Some(Arc::new(42u64)));
        b.iter(|| {
            for _ in 0..OPS {
                black_box(slot.load(LoadOrder::Acquire));
            }
        })
    });

    group.bench_function("std_mutex_option_arc", |b| {
        let slot = Mutex::new(Some(Arc::new(42u64)));
        b.iter(|| {
            for _ in 0..OPS {
                black_box(slot.lock().unwrap().clone());
            }
        })
    });

    group.bench_function("std_rwlock_option_arc", |b| {
        let slot = RwLock::new(Some(Arc::new(42u64)));
        b.iter(|| {
            for _ in 0..OPS {
                black_box(slot.read().unwrap().clone());
            }
        })
    });

    group.finish();
}

fn bench_read_mostly(c: &mut Criterion) {
    let mut group = c.benchmark_group("reference_read_mostly");
    group.throughput(Throughput::Elements((OPS * 3) as u64));

    group.bench_function("atomic_reference", |b| {
        let slot = AtomicReference::new(Some(Arc::new(0usize)));
        b.iter(|| {
            let stop = AtomicBool::new(false);
            thread::scope(|s| {
                s.spawn(|| {
                    let mut i = 0;
                    while !stop.load(Ordering::Relaxed) {
                        drop(slot.swap(Some(Arc::new(i)), MemoryOrder::AcqRel));
                        i += 1;
                    }
                });
                let readers: Vec<_> = (0..3)
                    .map(|_| {
                        s.spawn(|| {
                            for _ in 0..OPS {
                                black_box(slot.load(LoadOrder::Acquire));
                            }
                        })
                    })
                    .collect();
                for r in readers {
                    r.join().unwrap();
                }
                stop.store(true, Ordering::Relaxed);
            });
        })
    });

    group.bench_function("std_rwlock_option_arc", |b| {
        let slot = RwLock::new(Some(Arc::new(0usize)));
        b.iter(|| {
            let stop = AtomicBool::new(false);
            thread::scope(|s| {
                s.spawn(|| {
                    let mut i = 0;
                    while !stop.load(Ordering::Relaxed) {
                        drop(slot.write().unwrap().replace(Arc::new(i)));
                        i += 1;
                    }
                });
                let readers: Vec<_> = (0..3)
                    .map(|_| {
                        s.spawn(|| {
                            for _ in 0..OPS {
                                black_box(slot.read().unwrap().clone());
                            }
                        })
                    })
                    .collect();
                for r in readers {
                    r.join().unwrap();
                }
                stop.store(true, Ordering::Relaxed);
            });
        })
    });

    group.finish();
}

fn bench_stack(c: &mut Criterion) {
    let mut group = c.benchmark_group("stack_push_pop");
    group.throughput(Throughput::Elements(OPS as u64));

    group.bench_function("atomic_stack", |b| {
        let stack = AtomicStack::new();
        b.iter(|| {
            for i in 0..OPS {
                stack.push(i);
            }
            while let Some(v) = stack.pop() {
                black_box(v);
            }
        })
    });

    group.bench_function("std_mutex_vec", |b| {
        let stack = Mutex::new(Vec::new());
        b.iter(|| {
            for i in 0..OPS {
                stack.lock().unwrap().push(Arc::new(i));
            }
            while let Some(v) = stack.lock().unwrap().pop() {
                black_box(v);
            }
        })
    });

    group.finish();
}

criterion_group!(benches, bench_load, bench_read_mostly, bench_stack);
criterion_main!(benches);
