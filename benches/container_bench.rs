//! Benchmarks for registration, resolution and scopes

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;
use tiny_ioc::{Component, Container, Key, Module, Result, create_key};

#[allow(dead_code)]
struct Config {
    url: String,
}

struct Repo;

impl Component for Repo {
    type Deps = ();
    fn construct(_: ()) -> Result<Self> {
        Ok(Repo)
    }
}

#[allow(dead_code)]
struct Service {
    repo: Arc<Repo>,
    config: Arc<Config>,
}

impl Component for Service {
    type Deps = (Arc<Repo>, Arc<Config>);
    fn construct((repo, config): Self::Deps) -> Result<Self> {
        Ok(Service { repo, config })
    }
}

fn config() -> Config {
    Config {
        url: "postgres://localhost".into(),
    }
}

fn populated() -> Container {
    let container = Container::new();
    container.add_instance(&Key::<Config>::of(), config());
    container.add_class::<Repo>().singleton();
    container
        .add_class::<Service>()
        .args((Key::of(), Key::of()));
    container
}

fn bench_registration(c: &mut Criterion) {
    let mut group = c.benchmark_group("registration");

    group.bench_function("add_instance", |b| {
        b.iter(|| {
            let container = Container::new();
            container.add_instance(&Key::<Config>::of(), config());
            black_box(container)
        })
    });

    group.bench_function("add_class_and_compile", |b| {
        b.iter(|| {
            let container = populated();
            black_box(container.has(&Key::<Service>::of()))
        })
    });

    group.bench_function("add_module", |b| {
        let module = Module::new();
        module.add_instance(&Key::<Config>::of(), config());
        module.add_class::<Repo>().singleton();

        b.iter(|| {
            let container = Container::new();
            container.add_module(&module);
            black_box(container.has(&Key::<Repo>::of()))
        })
    });

    group.finish();
}

fn bench_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolution");
    group.throughput(Throughput::Elements(1));

    let container = populated();
    let missing = create_key::<Config>("missing");

    group.bench_function("get_instance", |b| {
        b.iter(|| black_box(container.get(&Key::<Config>::of()).unwrap()))
    });

    group.bench_function("get_singleton_class", |b| {
        b.iter(|| black_box(container.get(&Key::<Repo>::of()).unwrap()))
    });

    group.bench_function("get_transient_with_deps", |b| {
        b.iter(|| black_box(container.get(&Key::<Service>::of()).unwrap()))
    });

    group.bench_function("has", |b| {
        b.iter(|| black_box(container.has(&Key::<Repo>::of())))
    });

    group.bench_function("safe_get_missing", |b| {
        b.iter(|| black_box(container.safe_get(&missing).unwrap()))
    });

    group.finish();
}

fn bench_scoped(c: &mut Criterion) {
    let mut group = c.benchmark_group("scoped");

    group.bench_function("create_scope", |b| {
        let root = populated();
        b.iter(|| black_box(root.create_scope()))
    });

    group.bench_function("resolve_from_parent", |b| {
        let root = populated();
        let child = root.create_scope().create_scope();

        b.iter(|| black_box(child.get(&Key::<Repo>::of()).unwrap()))
    });

    group.bench_function("resolve_scoped", |b| {
        let root = Container::new();
        root.add_class::<Repo>().scoped();
        let child = root.create_scope();

        b.iter(|| black_box(child.get(&Key::<Repo>::of()).unwrap()))
    });

    group.bench_function("request_scope_lifecycle", |b| {
        let root = populated();
        let request = create_key::<String>("request");

        b.iter(|| {
            let scope = root.create_scope();
            scope.add_instance(&request, "req-1".to_string());
            let _ = scope.get(&request).unwrap();
            black_box(scope.get(&Key::<Service>::of()).unwrap())
        })
    });

    group.finish();
}

fn bench_concurrent(c: &mut Criterion) {
    use std::thread;

    let mut group = c.benchmark_group("concurrent");

    group.bench_function("concurrent_reads_4", |b| {
        let container = populated();

        b.iter(|| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let c = container.clone();
                    thread::spawn(move || {
                        for _ in 0..100 {
                            let _ = c.get(&Key::<Repo>::of()).unwrap();
                        }
                    })
                })
                .collect();

            for h in handles {
                h.join().unwrap();
            }
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_registration,
    bench_resolution,
    bench_scoped,
    bench_concurrent,
);
criterion_main!(benches);
