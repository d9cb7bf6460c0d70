//! Criterion benchmarks for the verifier and calibration hot paths.
//!
//! Cumulative replay re-verifies the whole history every window, so
//! `prepare_train_data` over a long prefix dominates a simulated run.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use jf_common::{ChangeRecord, CommitId, FixLinkage, Prediction, PredictionStream};
use jf_core::calibrate::analyze_results;
use jf_core::prequential::calculate_prequential_mean_and_std;
use jf_core::verify::{self, VerifierMode, VerifierState};

const DAY: i64 = 86_400;

/// One change every few hours, one in seven buggy and fixed a month later.
fn synthetic_stream(n: usize) -> Vec<ChangeRecord> {
    (0..n)
        .map(|i| {
            let ts = i as i64 * 6 * 3_600;
            let id = format!("c{i:06}");
            if i % 7 == 3 {
                ChangeRecord::new(id, ts, Some(true)).with_fix(FixLinkage {
                    first_fix_date: Some(ts + 30 * DAY),
                    fixes: Vec::new(),
                })
            } else if i % 11 == 0 && i > 7 {
                ChangeRecord::new(id, ts, Some(false)).with_fix(FixLinkage {
                    first_fix_date: None,
                    fixes: vec![CommitId::from(format!("c{:06}", i - 5))],
                })
            } else {
                ChangeRecord::new(id, ts, Some(false))
            }
        })
        .collect()
}

fn bench_prepare_train_data(c: &mut Criterion) {
    let mut group = c.benchmark_group("verify/prepare_train_data");

    for &n in &[500usize, 2_000, 10_000] {
        let stream = synthetic_stream(n);
        for mode in [VerifierMode::Simple, VerifierMode::RealLatency] {
            group.bench_with_input(BenchmarkId::new(mode.to_string(), n), &stream, |b, s| {
                b.iter(|| {
                    let mut state = VerifierState::new(mode, 90 * DAY);
                    verify::prepare_train_data(black_box(s), &mut state).unwrap();
                    black_box(state.pool_len());
                })
            });
        }
    }

    group.finish();
}

fn bench_cumulative_replay(c: &mut Criterion) {
    let stream = synthetic_stream(2_000);
    c.bench_function("verify/cumulative_replay_2000_step_100", |b| {
        b.iter(|| {
            let mut state = VerifierState::new(VerifierMode::RealLatency, 90 * DAY);
            let mut end = 0;
            while end < stream.len() {
                end = (end + 100).min(stream.len());
                state.reset_for_replay();
                verify::prepare_train_data(&stream[..end], &mut state).unwrap();
                state.consume_pool();
            }
            black_box(state.ledger());
        })
    });
}

fn predictions(n: usize) -> PredictionStream {
    (0..n)
        .map(|i| {
            let label = i % 7 == 3;
            let prob = ((i * 37) % 100) as f64 / 100.0;
            let prob = if label { (prob + 0.3).min(1.0) } else { prob * 0.8 };
            Prediction::new(label, prob > 0.5, prob)
        })
        .collect()
}

fn bench_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate");

    for &n in &[1_000usize, 10_000] {
        let stream = predictions(n);
        group.bench_with_input(BenchmarkId::new("operating_point", n), &stream, |b, s| {
            b.iter(|| black_box(analyze_results(black_box(s)).unwrap().threshold))
        });
        group.bench_with_input(BenchmarkId::new("prequential", n), &stream, |b, s| {
            b.iter(|| {
                black_box(
                    calculate_prequential_mean_and_std(black_box(s), 0.99)
                        .unwrap()
                        .g_mean
                        .mean,
                )
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_prepare_train_data,
    bench_cumulative_replay,
    bench_evaluation
);
criterion_main!(benches);
