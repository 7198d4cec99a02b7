//! Parameter Pipeline Benchmarks
//!
//! Every edit runs the full loop: snapshot, query encoding, history push and a
//! re-sync from the pushed query. These benchmarks check that this loop stays
//! well inside a frame budget for sketches with many parameters.
//!
//! ```text
//! frame_budget = 1 / 60 s = 16.7 ms
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use sketch_params::prelude::*;
use std::time::Duration;
use web_time::Instant;

// ============================================================================
// Constants
// ============================================================================

const PARAM_COUNTS: [usize; 4] = [4, 16, 64, 256];

// ============================================================================
// Helper Functions
// ============================================================================

/// A mix of int, color and select params, `count` in total
fn create_definitions(count: usize) -> Definitions {
    let mut definitions = Definitions::new();
    for i in 0..count {
        let definition = match i % 3 {
            0 => ParamDefinition::int(),
            1 => ParamDefinition::color(),
            _ => ParamDefinition::select(["Black & White", "Ice", "Fire", "Moss"]),
        };
        definitions.insert(format!("param{}", i), definition.with_label(format!("Param {}", i)));
    }
    definitions
}

fn create_params(count: usize) -> Params {
    define_all(&mut Rng::from_seed(42), &create_definitions(count)).unwrap()
}

fn create_host(count: usize) -> SketchHost<Rng, InMemoryStorage, MemoryHistory> {
    SketchHost::new(
        Rng::from_seed(42),
        &create_definitions(count),
        InMemoryStorage::new(),
        MemoryHistory::default(),
        PanelConfig::default().with_throttle_ms(0),
    )
    .unwrap()
}

// ============================================================================
// Engine Benchmarks
// ============================================================================

fn bench_define_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine/define_all");

    for count in PARAM_COUNTS {
        let definitions = create_definitions(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &definitions, |b, defs| {
            let mut random = Rng::from_seed(7);
            b.iter(|| define_all(&mut random, black_box(defs)).unwrap());
        });
    }

    group.finish();
}

fn bench_reset_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine/reset_all");

    for count in PARAM_COUNTS {
        let params = create_params(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &params, |b, params| {
            let mut random = Rng::from_seed(7);
            b.iter(|| reset_all(&mut random, black_box(params), None, true).unwrap());
        });
    }

    group.finish();
}

// ============================================================================
// URL Benchmarks
// ============================================================================

fn bench_query_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("url");

    for count in PARAM_COUNTS {
        let params = create_params(count);
        let query = to_query(&params, FormSnapshot::new());

        group.throughput(Throughput::Bytes(query.len() as u64));
        group.bench_with_input(BenchmarkId::new("to_query", count), &params, |b, params| {
            b.iter(|| to_query(black_box(params), FormSnapshot::new()));
        });
        group.bench_with_input(BenchmarkId::new("parse_query", count), &query, |b, query| {
            b.iter(|| parse_query(black_box(query), 64));
        });
        group.bench_with_input(BenchmarkId::new("sync_from_query", count), &query, |b, query| {
            let mut random = Rng::from_seed(7);
            b.iter(|| sync_from_query(&mut random, &params, black_box(query), 64));
        });
    }

    group.finish();
}

// ============================================================================
// Host Benchmarks
// ============================================================================

/// One throttled edit through the whole host loop
fn bench_edit_loop(c: &mut Criterion) {
    let mut group = c.benchmark_group("host/edit");

    for count in PARAM_COUNTS {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let mut host = create_host(count);
            let mut now = Instant::now();
            let mut flip = false;

            b.iter(|| {
                flip = !flip;
                now += Duration::from_millis(1);
                let raw = if flip { "0.25" } else { "0.75" };
                host.edit("param0", black_box(raw), now).unwrap()
            });
        });
    }

    group.finish();
}

fn bench_space_regenerate(c: &mut Criterion) {
    let mut group = c.benchmark_group("host/space");
    let space = KeyInput::new(" ", "Space");

    for count in PARAM_COUNTS {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let mut host = create_host(count);
            b.iter(|| host.handle_key(black_box(&space)).unwrap());
        });
    }

    group.finish();
}

// ============================================================================
// Criterion Groups
// ============================================================================

criterion_group!(engine_benches, bench_define_all, bench_reset_all,);

criterion_group!(url_benches, bench_query_round_trip,);

criterion_group!(host_benches, bench_edit_loop, bench_space_regenerate,);

criterion_main!(engine_benches, url_benches, host_benches,);
