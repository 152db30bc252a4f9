//! Benchmarks for the modulation primitives and a full voice-style patch.
//!
//! Run with: cargo bench
//!
//! These measure the per-block cost of the hot paths to keep them well
//! inside real-time audio deadlines.
//!
//! Reference timing at 48kHz sample rate:
//!   - 16 samples  = 0.33ms deadline
//!   - 64 samples  = 1.33ms deadline
//!   - 256 samples = 5.33ms deadline
//!
//! Benchmark groups:
//!   - dsp/*        Envelope, matrix and smoother primitives
//!   - scenarios/*  A bank + matrix + envelopes patch processed whole

use criterion::{criterion_group, criterion_main};

mod dsp;
mod scenarios;

criterion_group!(
    benches,
    dsp::bench_envelope,
    dsp::bench_matrix,
    dsp::bench_smooth,
    scenarios::bench_patch,
);
criterion_main!(benches);
