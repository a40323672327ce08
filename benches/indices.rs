use bezier_simplex::{MultiIndex, indices, polynom};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

fn indices_deg10_dim4(c: &mut Criterion) {
    c.bench_function("indices_deg10_dim4", |b| {
        b.iter(|| indices(black_box(4), black_box(10)).unwrap().count())
    });
}

fn indices_deg100_dim3(c: &mut Criterion) {
    c.bench_function("indices_deg100_dim3", |b| {
        b.iter(|| indices(black_box(3), black_box(100)).unwrap().count())
    });
}

fn polynom_cached(c: &mut Criterion) {
    let all: Vec<MultiIndex> = indices(3, 7).unwrap().collect();
    c.bench_function("polynom_cached", |b| {
        b.iter(|| {
            for index in &all {
                black_box(polynom(7, black_box(index)));
            }
        })
    });
}

criterion_group!(benches, indices_deg10_dim4, indices_deg100_dim3, polynom_cached);
criterion_main!(benches);
