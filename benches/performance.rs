use criterion::{black_box, criterion_group, criterion_main, Criterion};
use trellis_core::prelude::{Ref, TagMap};
use trellis_exec::Chain;
use trellis_operators::materialize::Materialize;
use trellis_operators::tag::Tag;
use trellis_operators::{morphism, Base, Cursor, Morphism, Shape};

fn range(from: u64, to: u64) -> Shape {
    Shape::fixed((from..to).map(Ref::node))
}

/// Successor graph: n -> n + 1 up to `len`. Each output carries the input's
/// bindings, as a store-backed hop would.
fn successor(len: u64) -> Morphism {
    morphism(move |from: Shape| {
        let mut hops = Vec::new();
        let mut c = from.cursor();
        while c.next() {
            let Some(Ref::Node(id)) = c.result().cloned() else {
                continue;
            };
            if id.get() + 1 >= len {
                continue;
            }
            let mut tags = TagMap::new();
            c.tag_results(&mut tags);
            let hop = tags.into_iter().fold(
                Tag::new(Shape::fixed([Ref::node(id.get() + 1)]), Vec::new()),
                |t, (name, value)| t.with_fixed(name, value),
            );
            hops.push(Shape::Tag(hop));
        }
        c.close().expect("successor input closes cleanly");
        Shape::or(hops)
    })
}

fn bench_and(c: &mut Criterion) {
    let shape = Shape::and(vec![range(0, 10_000), range(5_000, 6_000), range(5_500, 20_000)]);
    c.bench_function("and_3way_optimized", |b| {
        b.iter(|| black_box(Chain::new(shape.clone()).count().unwrap()))
    });
    c.bench_function("and_3way_raw", |b| {
        b.iter(|| black_box(Chain::new(shape.clone()).unoptimized().count().unwrap()))
    });
}

fn bench_materialize(c: &mut Criterion) {
    let universe = range(0, 5_000);
    let excluded = range(0, 2_500);
    let cached = Shape::not(
        Shape::Materialize(Materialize::with_limit(excluded.clone(), 10_000)),
        universe.clone(),
    );
    let fallback = Shape::not(
        Shape::Materialize(Materialize::with_limit(excluded, 100)),
        universe,
    );
    c.bench_function("not_materialized_primary", |b| {
        b.iter(|| black_box(Chain::new(cached.clone()).unoptimized().all().unwrap().len()))
    });
    c.bench_function("not_materialize_fallback", |b| {
        b.iter(|| black_box(Chain::new(fallback.clone()).unoptimized().all().unwrap().len()))
    });
}

fn bench_recursive(c: &mut Criterion) {
    let closure = range(0, 1).recursive(successor(2_000), 5_000);
    c.bench_function("recursive_chain_2000", |b| {
        b.iter(|| black_box(Chain::new(closure.clone()).all().unwrap().len()))
    });
}

criterion_group!(benches, bench_and, bench_materialize, bench_recursive);
criterion_main!(benches);
