// benches/cpu_baseline.rs — CPU reference costs.
//
// The transpose runs once per engine construction and the CPU apply is the
// validation oracle for the GPU kernels; this tracks both so a regression
// in either shows up before it hides inside GPU parity tests.

use criterion::{criterion_group, criterion_main, Criterion};
use eigenlens::matrix::{Sample3, SampleMatrix};
use eigenlens::power_iter::normalize_channels;

/// 64 synthetic 32x32 images: rows=64, cols=1024.
fn synthetic_matrix() -> SampleMatrix {
    let rows = 64;
    let cols = 32 * 32;
    let entries = (0..rows * cols)
        .map(|i| {
            let v = ((i * 31 + 7) % 251) as f32;
            Sample3::new(v, 255.0 - v, v * 0.5)
        })
        .collect();
    SampleMatrix::from_entries(rows, cols, entries)
}

fn bench_transpose(c: &mut Criterion) {
    let matrix = synthetic_matrix();
    c.bench_function("transpose 64x1024", |b| {
        b.iter(|| std::hint::black_box(matrix.transpose()))
    });
}

fn bench_apply_pair(c: &mut Criterion) {
    let matrix = synthetic_matrix();
    let transposed = matrix.transpose();
    let v: Vec<Sample3> = (0..matrix.cols())
        .map(|i| Sample3::new(i as f32, -(i as f32), 1.0))
        .collect();

    c.bench_function("apply pair + normalize 64x1024", |b| {
        b.iter(|| {
            let mut out = transposed.apply(&matrix.apply(std::hint::black_box(&v)));
            normalize_channels(&mut out);
            std::hint::black_box(out)
        })
    });
}

criterion_group!(benches, bench_transpose, bench_apply_pair);
criterion_main!(benches);
