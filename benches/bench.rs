use criterion::{criterion_group, criterion_main, Criterion};
use flakeid::Registry;
use std::hint::black_box;

fn bench_new(c: &mut Criterion) {
    c.bench_function("bench_registry_new", |b| {
        b.iter(Registry::new);
    });
}

fn bench_next_id(c: &mut Criterion) {
    let registry = Registry::new().expect("Could not create Registry");
    c.bench_function("bench_next_id", |b| {
        b.iter(|| registry.next_id_for(black_box(1)));
    });
}

fn bench_codec_roundtrip(c: &mut Criterion) {
    let registry = Registry::new().expect("Could not create Registry");
    let id = registry.next_id().expect("Could not generate id");
    c.bench_function("bench_codec_roundtrip", |b| {
        b.iter(|| flakeid::from_alpha(&flakeid::to_alpha(black_box(id))));
    });
}

criterion_group!(flakeid_perf, bench_new, bench_next_id, bench_codec_roundtrip);
criterion_main!(flakeid_perf);
