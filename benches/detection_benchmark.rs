//! Verifies the pipeline stays comfortably inside its soft wall-clock
//! budget at realistic batch sizes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fraud_ring_detector::{run_detection, DetectionConfig, RawRow};

fn row(id: String, from: String, to: String, amount: f64, hour_offset: i64) -> RawRow {
    RawRow::from([
        ("transaction_id".to_string(), id),
        ("sender_id".to_string(), from),
        ("receiver_id".to_string(), to),
        ("amount".to_string(), amount.to_string()),
        (
            "timestamp".to_string(),
            format!(
                "2024-{:02}-{:02} {:02}:00:00",
                1 + (hour_offset / (24 * 28)) % 12,
                1 + (hour_offset / 24) % 28,
                hour_offset % 24
            ),
        ),
    ])
}

/// Synthesizes `n` transactions over `n / 20` accounts arranged in short
/// chains, so the graph has realistic density without being dominated by
/// one pathological structure.
fn synthesize_batch(n: usize) -> Vec<RawRow> {
    let accounts = (n / 20).max(10);
    (0..n)
        .map(|i| {
            let from = format!("ACC{}", i % accounts);
            let to = format!("ACC{}", (i + 1) % accounts);
            row(format!("T{i}"), from, to, 100.0 + (i % 500) as f64, i as i64)
        })
        .collect()
}

fn bench_pipeline_scale(c: &mut Criterion) {
    let mut group = c.benchmark_group("run_detection");
    for &size in &[1_000usize, 5_000, 10_000] {
        let rows = synthesize_batch(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &rows, |b, rows| {
            b.iter_with_setup(
                || rows.clone(),
                |rows| {
                    let report = run_detection(rows, &DetectionConfig::default()).unwrap();
                    black_box(report)
                },
            );
        });
    }
    group.finish();
}

fn bench_pagerank_only(c: &mut Criterion) {
    use fraud_ring_detector::scoring::pagerank;
    use fraud_ring_detector::{Graph, Transaction};
    use chrono::{TimeZone, Utc};

    let txns: Vec<Transaction> = (0..2_000)
        .map(|i| Transaction {
            transaction_id: format!("T{i}"),
            sender_id: format!("ACC{}", i % 200),
            receiver_id: format!("ACC{}", (i + 1) % 200),
            amount: 100.0,
            timestamp: Utc.timestamp_opt(1_700_000_000 + i, 0).unwrap(),
        })
        .collect();
    let graph = Graph::build(&txns);

    c.bench_function("pagerank_2k_txn_200_accounts", |b| {
        b.iter(|| black_box(pagerank(&graph, 0.85, 100, 1e-6)));
    });
}

criterion_group!(benches, bench_pipeline_scale, bench_pagerank_only);
criterion_main!(benches);
