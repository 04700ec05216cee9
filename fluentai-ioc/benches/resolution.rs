use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fluentai_ioc::prelude::*;
use std::sync::Arc;

trait Handler: Send + Sync {
    fn id(&self) -> usize;
}

struct Leaf(usize);

impl Handler for Leaf {
    fn id(&self) -> usize {
        self.0
    }
}

struct Pipeline {
    handler: Arc<dyn Handler>,
    leaf: Arc<Leaf>,
}

impl Autowire for Pipeline {
    fn constructors() -> Vec<Constructor<Self>> {
        vec![Constructor::builder("Pipeline::new")
            .param::<dyn Handler>()
            .param::<Leaf>()
            .build(|args| {
                Ok(Pipeline {
                    handler: args.next()?,
                    leaf: args.next()?,
                })
            })]
    }
}

fn container_with(extra: usize) -> Container {
    let mut builder = ContainerBuilder::new();
    builder.implements::<Leaf, dyn Handler>(|leaf| leaf).unwrap();
    builder.register(|_: &Session| Ok(Arc::new(Leaf(0)))).unwrap();
    builder.register_type::<Pipeline>().unwrap();
    builder
        .register_instance(|_: &Session| Ok(Arc::new(String::from("shared"))))
        .unwrap();
    for i in 0..extra {
        builder
            .for_key(i)
            .unwrap()
            .register(move |_: &Session| Ok(Arc::new(i)))
            .unwrap();
    }
    builder.build().unwrap()
}

fn resolution_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolution");
    let container = container_with(0);

    group.bench_function("exact", |b| {
        b.iter(|| black_box(container.resolve::<Leaf>().unwrap()));
    });

    group.bench_function("singleton", |b| {
        b.iter(|| black_box(container.resolve::<String>().unwrap()));
    });

    group.bench_function("autowired", |b| {
        b.iter(|| {
            let pipeline = container.resolve::<Pipeline>().unwrap();
            black_box(pipeline.handler.id() + pipeline.leaf.id())
        });
    });

    group.finish();
}

fn polymorphic_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("polymorphic_lookup");

    // Polymorphic lookups scan every registration
    for size in [0usize, 10, 100, 1000] {
        let container = container_with(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &container, |b, container| {
            b.iter(|| black_box(container.resolve::<dyn Handler>().unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, resolution_benchmarks, polymorphic_benchmarks);
criterion_main!(benches);
