//! Runs the pipeline and prints the full JSON report, for piping into
//! downstream tooling.

use fraud_ring_detector::{run_detection, DetectionConfig, RawRow};

fn row(id: &str, from: &str, to: &str, amount: &str, ts: &str) -> RawRow {
    RawRow::from([
        ("transaction_id".to_string(), id.to_string()),
        ("sender_id".to_string(), from.to_string()),
        ("receiver_id".to_string(), to.to_string()),
        ("amount".to_string(), amount.to_string()),
        ("timestamp".to_string(), ts.to_string()),
    ])
}

fn main() {
    tracing_subscriber::fmt::init();

    let rows = vec![
        row("T1", "A", "B", "2000", "2024-05-01 00:00:00"),
        row("T2", "B", "C", "2000", "2024-05-01 01:00:00"),
        row("T3", "C", "A", "2000", "2024-05-01 02:00:00"),
    ];

    let report = run_detection(rows, &DetectionConfig::default()).expect("detection batch is valid");
    let json = serde_json::to_string_pretty(&report).expect("report serializes");
    println!("{json}");
}
