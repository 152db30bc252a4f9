//! Benchmarks for realistic whole-patch scenarios.

mod patch;

pub use patch::bench_patch;
