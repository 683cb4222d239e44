//! Benchmarks for spark-observe
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use spark_observe::{
    arr, del, obj, observe, set, with_subscriber, ComponentInstance, InjectDescriptor,
    Obj, ProvideSpec, Subscriber, Value,
};
use std::any::Any;
use std::rc::Rc;

struct NullWatcher;

impl Subscriber for NullWatcher {
    fn update(&self) {}

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn flat_map(keys: usize) -> Value {
    let map = Obj::with_capacity(keys);
    for i in 0..keys {
        map.set(&format!("key_{i}"), i as i64);
    }
    Value::Obj(map)
}

fn nested_map(depth: usize) -> Value {
    let mut current = obj! { "leaf" => 0 };
    for _ in 0..depth {
        current = obj! { "child" => current };
    }
    current
}

// =============================================================================
// WRAP BENCHMARKS
// =============================================================================

fn bench_observe_fresh(c: &mut Criterion) {
    c.bench_function("observe_fresh_map", |b| {
        b.iter(|| {
            let state = obj! { "a" => 1, "b" => 2.0, "c" => "three" };
            black_box(observe(&state, false))
        })
    });
}

fn bench_observe_memoized(c: &mut Criterion) {
    let state = obj! { "a" => 1 };
    observe(&state, false);
    c.bench_function("observe_memoized", |b| {
        b.iter(|| black_box(observe(&state, false)))
    });
}

fn bench_observe_width(c: &mut Criterion) {
    let mut group = c.benchmark_group("observe_width");

    for keys in [10, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("keys", keys), &keys, |b, &keys| {
            b.iter(|| {
                let state = flat_map(keys);
                black_box(observe(&state, false))
            })
        });
    }

    group.finish();
}

fn bench_observe_depth(c: &mut Criterion) {
    let mut group = c.benchmark_group("observe_depth");

    for depth in [1, 5, 10, 20] {
        group.bench_with_input(BenchmarkId::new("depth", depth), &depth, |b, &depth| {
            b.iter(|| {
                let state = nested_map(depth);
                black_box(observe(&state, false))
            })
        });
    }

    group.finish();
}

fn bench_observe_sequence(c: &mut Criterion) {
    c.bench_function("observe_sequence_100", |b| {
        b.iter(|| {
            let items: Vec<Value> = (0..100i64).map(Value::Int).collect();
            let state = Value::Arr(spark_observe::Arr::from_values(items));
            black_box(observe(&state, false))
        })
    });
}

// =============================================================================
// READ / WRITE BENCHMARKS
// =============================================================================

fn bench_untracked_read(c: &mut Criterion) {
    let state = obj! { "n" => 42 };
    observe(&state, false);
    let map = state.as_obj().unwrap().clone();
    c.bench_function("read_untracked", |b| b.iter(|| black_box(map.get("n"))));
}

fn bench_tracked_read(c: &mut Criterion) {
    let state = obj! { "n" => 42 };
    observe(&state, false);
    let map = state.as_obj().unwrap().clone();
    let watcher = Rc::new(NullWatcher);
    c.bench_function("read_tracked", |b| {
        b.iter(|| with_subscriber(watcher.clone(), || black_box(map.get("n"))))
    });
}

fn bench_write_new_value(c: &mut Criterion) {
    let state = obj! { "n" => 0 };
    observe(&state, false);
    let map = state.as_obj().unwrap().clone();

    let mut i = 0i64;
    c.bench_function("write_new_value", |b| {
        b.iter(|| {
            map.set("n", black_box(i));
            i += 1;
        })
    });
}

fn bench_write_same_value(c: &mut Criterion) {
    let state = obj! { "n" => 42 };
    observe(&state, false);
    let map = state.as_obj().unwrap().clone();
    c.bench_function("write_same_value", |b| {
        b.iter(|| map.set("n", black_box(42)))
    });
}

fn bench_write_container_refresh(c: &mut Criterion) {
    let state = obj! { "node" => obj! { "x" => 0 } };
    observe(&state, false);
    let map = state.as_obj().unwrap().clone();

    c.bench_function("write_container_refresh", |b| {
        b.iter(|| map.set("node", obj! { "x" => black_box(1) }))
    });
}

fn bench_write_with_watchers(c: &mut Criterion) {
    let mut group = c.benchmark_group("write_with_watchers");

    for count in [1, 10, 100] {
        group.bench_with_input(BenchmarkId::new("watchers", count), &count, |b, &count| {
            let state = obj! { "n" => 0 };
            observe(&state, false);
            let map = state.as_obj().unwrap().clone();

            let watchers: Vec<Rc<NullWatcher>> =
                (0..count).map(|_| Rc::new(NullWatcher)).collect();
            for watcher in &watchers {
                with_subscriber(watcher.clone(), || {
                    map.get("n");
                });
            }

            let mut i = 0i64;
            b.iter(|| {
                map.set("n", i);
                i += 1;
            });

            drop(watchers);
        });
    }

    group.finish();
}

// =============================================================================
// SEQUENCE BENCHMARKS
// =============================================================================

fn bench_sequence_push(c: &mut Criterion) {
    let state = arr![0];
    observe(&state, false);
    let seq = state.as_arr().unwrap().clone();

    let mut i = 0i64;
    c.bench_function("sequence_push", |b| {
        b.iter(|| {
            seq.push(black_box(i));
            i += 1;
        })
    });
}

fn bench_sequence_splice(c: &mut Criterion) {
    let state = arr![1, 2, 3, 4, 5, 6, 7, 8];
    observe(&state, false);
    let seq = state.as_arr().unwrap().clone();

    c.bench_function("sequence_splice", |b| {
        b.iter(|| {
            black_box(seq.splice(3, 1, vec![Value::Int(9)]));
        })
    });
}

fn bench_sequence_sort(c: &mut Criterion) {
    c.bench_function("sequence_sort_100", |b| {
        b.iter(|| {
            let items: Vec<Value> = (0..100i64).rev().map(Value::Int).collect();
            let seq = spark_observe::Arr::from_values(items);
            seq.sort();
            black_box(seq.len())
        })
    });
}

// =============================================================================
// STRUCTURAL BENCHMARKS
// =============================================================================

fn bench_set_then_del(c: &mut Criterion) {
    let state = obj! {};
    observe(&state, false);

    c.bench_function("set_then_del", |b| {
        b.iter(|| {
            set(&state, "transient", black_box(1));
            del(&state, "transient");
        })
    });
}

fn bench_set_existing(c: &mut Criterion) {
    let state = obj! { "n" => 0 };
    observe(&state, false);

    let mut i = 0i64;
    c.bench_function("set_existing_key", |b| {
        b.iter(|| {
            black_box(set(&state, "n", i));
            i += 1;
        })
    });
}

// =============================================================================
// INJECTION BENCHMARKS
// =============================================================================

fn bench_inject_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("inject_chain");

    for depth in [1, 5, 10, 20] {
        group.bench_with_input(BenchmarkId::new("depth", depth), &depth, |b, &depth| {
            let root = ComponentInstance::new("Root", None);
            root.set_provide(ProvideSpec::Map(
                obj! { "theme" => "dark" }.as_obj().unwrap().clone(),
            ));
            spark_observe::init_provide(&root);

            let mut leaf = root;
            for i in 0..depth {
                leaf = ComponentInstance::new(&format!("Level{i}"), Some(leaf));
            }
            leaf.add_injection(InjectDescriptor::new("theme"));

            b.iter(|| black_box(spark_observe::resolve_inject(&leaf)))
        });
    }

    group.finish();
}

// =============================================================================
// CRITERION SETUP
// =============================================================================

criterion_group!(
    wrap_benches,
    bench_observe_fresh,
    bench_observe_memoized,
    bench_observe_width,
    bench_observe_depth,
    bench_observe_sequence,
);

criterion_group!(
    read_write_benches,
    bench_untracked_read,
    bench_tracked_read,
    bench_write_new_value,
    bench_write_same_value,
    bench_write_container_refresh,
    bench_write_with_watchers,
);

criterion_group!(
    sequence_benches,
    bench_sequence_push,
    bench_sequence_splice,
    bench_sequence_sort,
);

criterion_group!(
    structural_benches,
    bench_set_then_del,
    bench_set_existing,
);

criterion_group!(inject_benches, bench_inject_chain);

criterion_main!(
    wrap_benches,
    read_write_benches,
    sequence_benches,
    structural_benches,
    inject_benches
);
