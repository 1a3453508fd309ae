// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Benchmarks for `understory_observe`.

use criterion::{BatchSize, BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use std::rc::Rc;
use std::sync::Once;

use understory_observe::{
    AnyValue, Attribute, ObservableObject, ObservationRegistry, ObservingOptions, Schema,
};

struct Fixture {
    schema: Rc<Schema>,
    width: Attribute<f64>,
    paths: Vec<String>,
}

fn fixture(extra_paths: usize) -> Fixture {
    let mut schema = Schema::new("Bench");
    let width = schema.declare_with_default("frame.width", 0.0_f64);
    let mut paths = vec![String::from("frame.width")];
    for i in 0..extra_paths {
        let path = format!("extra.p{i}");
        schema.declare_with_default(&path, 0_u32);
        paths.push(path);
    }
    Fixture {
        schema: Rc::new(schema),
        width,
        paths,
    }
}

fn bench_observe(c: &mut Criterion) {
    static PRINT_SIZES: Once = Once::new();
    PRINT_SIZES.call_once(|| {
        eprintln!(
            "sizes: ObservableObject={} ObservationRegistry={} AnyValue={}",
            size_of::<ObservableObject>(),
            size_of::<ObservationRegistry>(),
            size_of::<AnyValue>(),
        );
    });

    let f = fixture(15);

    let mut group = c.benchmark_group("observe/set");

    group.bench_function("no_observer", |b| {
        let object = Rc::new(ObservableObject::new(Rc::clone(&f.schema)));
        let mut x = 0.0;
        b.iter(|| {
            x += 1.0;
            object.set(f.width, black_box(x));
        });
    });

    group.bench_function("registry_observer", |b| {
        let object = Rc::new(ObservableObject::new(Rc::clone(&f.schema)));
        let registry = ObservationRegistry::new();
        registry
            .observe(&object, "frame.width", |_, old, new| {
                black_box((old, new));
            })
            .unwrap();
        let mut x = 0.0;
        b.iter(|| {
            x += 1.0;
            object.set(f.width, black_box(x));
        });
    });

    group.bench_function("registry_observer/prior", |b| {
        let object = Rc::new(ObservableObject::new(Rc::clone(&f.schema)));
        let registry = ObservationRegistry::new();
        registry
            .observe_with_options(
                &object,
                "frame.width",
                ObservingOptions::PRIOR,
                |_, old, new| {
                    black_box((old, new));
                },
            )
            .unwrap();
        let mut x = 0.0;
        b.iter(|| {
            x += 1.0;
            object.set(f.width, black_box(x));
        });
    });

    group.finish();

    let mut group = c.benchmark_group("observe/register");

    group.bench_function("observe_remove", |b| {
        let object = Rc::new(ObservableObject::new(Rc::clone(&f.schema)));
        let registry = ObservationRegistry::new();
        b.iter(|| {
            registry
                .observe(&object, "frame.width", |_, _, _| {})
                .unwrap();
            registry.remove_observer(&object, "frame.width");
        });
    });

    group.bench_function("replace", |b| {
        let object = Rc::new(ObservableObject::new(Rc::clone(&f.schema)));
        let registry = ObservationRegistry::new();
        b.iter(|| {
            registry
                .observe(&object, "frame.width", |_, _, _| {})
                .unwrap();
        });
    });

    group.bench_function("remove_missing", |b| {
        let object = Rc::new(ObservableObject::new(Rc::clone(&f.schema)));
        let registry = ObservationRegistry::new();
        b.iter(|| registry.remove_observer(black_box(&object), "frame.width"));
    });

    for paths in [1_usize, 16] {
        group.bench_function(BenchmarkId::new("observe_all_then_drop_target", paths), |b| {
            let registry = ObservationRegistry::new();
            b.iter_batched(
                || Rc::new(ObservableObject::new(Rc::clone(&f.schema))),
                |object| {
                    for path in &f.paths[..paths] {
                        registry.observe(&object, path, |_, _, _| {}).unwrap();
                    }
                    drop(object);
                    black_box(registry.is_empty());
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_observe);
criterion_main!(benches);
