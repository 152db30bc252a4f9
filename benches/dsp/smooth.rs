//! Benchmarks for the smoothing primitives.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use modgrid::smooth::{BlockRamp, OnePoleLag};

pub fn bench_smooth(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/smooth");

    for &size in &[16usize, 64, 256] {
        let mut ramp = BlockRamp::new(size);
        ramp.new_value(0.0);
        let mut flip = 0.0;
        group.bench_with_input(BenchmarkId::new("block_ramp", size), &size, |b, _| {
            b.iter(|| {
                flip = 1.0 - flip;
                ramp.new_value(black_box(flip));
                for _ in 0..size {
                    black_box(ramp.process());
                }
            })
        });
    }

    let mut lag = OnePoleLag::new(20.0, 3000.0);
    lag.set_target(1.0);
    group.bench_function("one_pole", |b| {
        b.iter(|| {
            black_box(lag.process());
        })
    });

    group.finish();
}
