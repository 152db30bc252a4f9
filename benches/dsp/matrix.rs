//! Benchmarks for the routing matrix evaluation loop.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use modgrid::bank::ValueBank;
use modgrid::matrix::{MatrixConfig, ModMatrix, Routing, RoutingTable};

struct BenchCfg;
impl MatrixConfig for BenchCfg {
    type SourceId = u32;
    type TargetId = u32;
    type CurveId = u32;
    type Extra = ();
}

/// Build a patch with `routes` routings spread over `routes / 4` targets.
fn build(routes: usize) -> (ValueBank, ModMatrix<BenchCfg>, RoutingTable<BenchCfg>) {
    let mut bank = ValueBank::new();
    let mut matrix: ModMatrix<BenchCfg> = ModMatrix::new();
    let mut table: RoutingTable<BenchCfg> = RoutingTable::new();

    let targets = (routes / 4).max(1);
    for t in 0..targets as u32 {
        let base = bank.alloc(0.5);
        matrix.bind_target_base_value(t, base);
    }
    for r in 0..routes as u32 {
        let src = bank.alloc((r as f32 * 0.37).sin());
        matrix.bind_source_value(r, src);
        table.push(Routing::new(r, r % targets as u32, 0.25));
    }

    matrix.prepare(&table, &bank, 48_000.0, 16);
    (bank, matrix, table)
}

pub fn bench_matrix(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/matrix");

    for &routes in &[4usize, 16, 64, 256] {
        let (bank, mut matrix, table) = build(routes);
        group.bench_with_input(BenchmarkId::new("process", routes), &routes, |b, _| {
            b.iter(|| {
                matrix.process(black_box(&table), black_box(&bank));
                black_box(matrix.output(0));
            })
        });
    }

    // prepare is the control-path cost: how fast can a patch re-compile
    let (bank, mut matrix, table) = build(64);
    group.bench_function("prepare/64", |b| {
        b.iter(|| {
            matrix.prepare(black_box(&table), black_box(&bank), 48_000.0, 16);
        })
    });

    group.finish();
}
