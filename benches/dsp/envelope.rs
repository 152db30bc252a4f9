//! Benchmarks for the envelope stage machines.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use modgrid::envelope::{AdsrEnvelope, AdsrParams};

const SR: f32 = 48_000.0;

fn bench_blocks<const BLOCK: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/envelope");

    // Attack phase (ramping up)
    let params = AdsrParams::default();
    let mut env: AdsrEnvelope<BLOCK> = AdsrEnvelope::new(SR);
    env.attack();
    group.bench_with_input(BenchmarkId::new("attack", BLOCK), &BLOCK, |b, _| {
        b.iter(|| {
            env.process_block(black_box(&params), true);
            black_box(env.output());
        })
    });

    // Sustain phase (holding steady)
    let mut env: AdsrEnvelope<BLOCK> = AdsrEnvelope::new(SR);
    env.attack();
    for _ in 0..4000 {
        env.process_block(&params, true);
    }
    group.bench_with_input(BenchmarkId::new("sustain", BLOCK), &BLOCK, |b, _| {
        b.iter(|| {
            env.process_block(black_box(&params), true);
            black_box(env.output());
        })
    });

    // Analog mode (RC update dominates)
    let analog = AdsrParams {
        analog: true,
        ..Default::default()
    };
    let mut env: AdsrEnvelope<BLOCK> = AdsrEnvelope::new(SR);
    env.attack();
    group.bench_with_input(BenchmarkId::new("analog", BLOCK), &BLOCK, |b, _| {
        b.iter(|| {
            env.process_block(black_box(&analog), true);
            black_box(env.output());
        })
    });

    group.finish();
}

pub fn bench_envelope(c: &mut Criterion) {
    bench_blocks::<16>(c);
    bench_blocks::<64>(c);
    bench_blocks::<256>(c);
}
