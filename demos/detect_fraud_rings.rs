//! Runs the detection pipeline over a small synthetic batch containing a
//! kickback cycle, a structuring fan-out, and a shell layering chain.

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

    let mut rows = vec![
        row("T1", "ALICE", "BOB", "5000", "2024-03-01 09:00:00"),
        row("T2", "BOB", "CARL", "5000", "2024-03-01 10:00:00"),
        row("T3", "CARL", "ALICE", "5000", "2024-03-01 11:00:00"),
    ];

    for i in 0..10 {
        rows.push(row(
            &format!("F{i}"),
            "HUB",
            &format!("MULE{i}"),
            "900",
            &format!("2024-03-02 {:02}:00:00", i),
        ));
    }

    rows.push(row("C1", "SOURCE", "SHELL1", "1200", "2024-03-03 00:00:00"));
    rows.push(row("C2", "SHELL1", "SHELL2", "1200", "2024-03-03 01:00:00"));
    rows.push(row("C3", "SHELL2", "SHELL3", "1200", "2024-03-03 02:00:00"));
    rows.push(row("C4", "SHELL3", "SINK", "1200", "2024-03-03 03:00:00"));

    let report = run_detection(rows, &DetectionConfig::default()).expect("detection batch is valid");

    println!("=== Fraud Ring Detection ===\n");
    println!(
        "{} transactions, {} accounts, {} fraud rings found in {:.3}s",
        report.summary.total_transactions,
        report.summary.total_accounts_analyzed,
        report.summary.fraud_rings_detected,
        report.summary.processing_time_seconds
    );

    for ring in &report.fraud_rings {
        println!(
            "\n{} [{}] risk={:.1}",
            ring.ring_id, ring.pattern_type, ring.risk_score
        );
        println!("  members: {}", ring.member_accounts.join(", "));
    }

    println!("\n=== Top Suspicious Accounts ===");
    for account in report.suspicious_accounts.iter().take(5) {
        println!(
            "{:<10} score={:.1} level={} ring={:?} patterns={:?}",
            account.account_id,
            account.suspicion_score,
            account.risk_level,
            account.ring_id,
            account.detected_patterns
        );
    }
}
