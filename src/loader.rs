//! Normalizes a tabular input into a validated, timestamp-sorted
//! transaction sequence.
//!
//! Recognizes the canonical fields `transaction_id`, `sender_id`,
//! `receiver_id`, `amount`, `timestamp`, plus the documented
//! case-insensitive variant names for each. Rows that fail coercion on any
//! required field are dropped and counted rather than failing the batch;
//! only a batch with zero surviving rows (or missing columns entirely)
//! fails with [`DetectionError::InvalidInput`].

use crate::error::DetectionError;
use crate::model::{RawRow, Transaction};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use tracing::warn;

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
];

struct FieldCandidates {
    name: &'static str,
    variants: &'static [&'static str],
}

const FIELD_CANDIDATES: &[FieldCandidates] = &[
    FieldCandidates {
        name: "transaction_id",
        variants: &[
            "transaction_id",
            "transactionid",
            "tx_id",
            "txid",
            "tx",
            "id",
            "transaction",
        ],
    },
    FieldCandidates {
        name: "sender_id",
        variants: &[
            "sender_id",
            "sender",
            "from",
            "source",
            "payer",
            "from_account",
            "sender_account",
        ],
    },
    FieldCandidates {
        name: "receiver_id",
        variants: &[
            "receiver_id",
            "receiver",
            "to",
            "target",
            "recipient",
            "to_account",
            "receiver_account",
        ],
    },
    FieldCandidates {
        name: "amount",
        variants: &["amount", "amt", "value", "transaction_amount", "volume", "sum"],
    },
    FieldCandidates {
        name: "timestamp",
        variants: &[
            "timestamp",
            "time",
            "datetime",
            "date",
            "transaction_date",
            "transaction_time",
        ],
    },
];

/// Result of a successful load: the surviving transactions plus the
/// warning counts a caller (and the pipeline summary) may want to surface.
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub transactions: Vec<Transaction>,
    pub dropped_rows: usize,
    pub non_positive_amounts: usize,
}

/// Finds, for each canonical field, the actual column name present in
/// `rows`' first record (case-insensitive, first-match-wins over the
/// documented variant list).
fn resolve_columns(rows: &[RawRow]) -> Result<Vec<(&'static str, String)>, DetectionError> {
    let first = rows.first().ok_or_else(|| {
        DetectionError::InvalidInput("no input rows supplied".to_string())
    })?;
    let lower_to_actual: std::collections::HashMap<String, &String> = first
        .keys()
        .map(|k| (k.trim().to_lowercase(), k))
        .collect();

    let mut resolved = Vec::with_capacity(FIELD_CANDIDATES.len());
    let mut missing = Vec::new();
    for field in FIELD_CANDIDATES {
        let found = field
            .variants
            .iter()
            .find_map(|variant| lower_to_actual.get(*variant).map(|actual| (*actual).clone()));
        match found {
            Some(actual) => resolved.push((field.name, actual)),
            None => missing.push(field.name),
        }
    }

    if !missing.is_empty() {
        return Err(DetectionError::InvalidInput(format!(
            "missing required columns {:?}; found columns {:?}",
            missing,
            first.keys().collect::<Vec<_>>()
        )));
    }
    Ok(resolved)
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in TIMESTAMP_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }
    None
}

/// Loads and validates a batch of raw rows into timestamp-sorted
/// transactions.
pub fn load_transactions(rows: Vec<RawRow>) -> Result<LoadOutcome, DetectionError> {
    if rows.is_empty() {
        return Err(DetectionError::InvalidInput("no input rows supplied".to_string()));
    }

    let columns = resolve_columns(&rows)?;
    let col = |name: &str| columns.iter().find(|(n, _)| *n == name).map(|(_, c)| c.as_str()).unwrap();

    let mut transactions = Vec::with_capacity(rows.len());
    let mut dropped_rows = 0usize;
    let mut non_positive_amounts = 0usize;

    for row in &rows {
        let transaction_id = row.get(col("transaction_id")).map(|s| s.trim());
        let sender_id = row.get(col("sender_id")).map(|s| s.trim());
        let receiver_id = row.get(col("receiver_id")).map(|s| s.trim());
        let amount_raw = row.get(col("amount")).map(|s| s.trim());
        let timestamp_raw = row.get(col("timestamp")).map(|s| s.trim());

        let (transaction_id, sender_id, receiver_id, amount_raw, timestamp_raw) =
            match (transaction_id, sender_id, receiver_id, amount_raw, timestamp_raw) {
                (Some(a), Some(b), Some(c), Some(d), Some(e))
                    if !a.is_empty() && !b.is_empty() && !c.is_empty() && !d.is_empty() && !e.is_empty() =>
                {
                    (a, b, c, d, e)
                }
                _ => {
                    dropped_rows += 1;
                    continue;
                }
            };

        let amount: f64 = match amount_raw.parse() {
            Ok(v) if v.is_finite() => v,
            _ => {
                dropped_rows += 1;
                continue;
            }
        };

        let timestamp = match parse_timestamp(timestamp_raw) {
            Some(ts) => ts,
            None => {
                dropped_rows += 1;
                continue;
            }
        };

        if amount <= 0.0 {
            non_positive_amounts += 1;
        }

        transactions.push(Transaction {
            transaction_id: transaction_id.to_string(),
            sender_id: sender_id.to_string(),
            receiver_id: receiver_id.to_string(),
            amount,
            timestamp,
        });
    }

    if dropped_rows > 0 {
        warn!(dropped_rows, "rows dropped during load due to coercion failures");
    }
    if non_positive_amounts > 0 {
        warn!(non_positive_amounts, "transactions with non-positive amounts retained");
    }

    if transactions.is_empty() {
        return Err(DetectionError::InvalidInput(
            "no valid transactions remained after coercion".to_string(),
        ));
    }

    transactions.sort_by_key(|t| t.timestamp);

    Ok(LoadOutcome {
        transactions,
        dropped_rows,
        non_positive_amounts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, from: &str, to: &str, amount: &str, ts: &str) -> RawRow {
        RawRow::from([
            ("transaction_id".to_string(), id.to_string()),
            ("sender_id".to_string(), from.to_string()),
            ("receiver_id".to_string(), to.to_string()),
            ("amount".to_string(), amount.to_string()),
            ("timestamp".to_string(), ts.to_string()),
        ])
    }

    #[test]
    fn empty_input_is_invalid() {
        let err = load_transactions(vec![]).unwrap_err();
        assert!(matches!(err, DetectionError::InvalidInput(_)));
    }

    #[test]
    fn missing_required_column_is_invalid() {
        let rows = vec![RawRow::from([("amount".to_string(), "10".to_string())])];
        let err = load_transactions(rows).unwrap_err();
        assert!(matches!(err, DetectionError::InvalidInput(_)));
    }

    #[test]
    fn accepts_documented_column_variants() {
        let rows = vec![RawRow::from([
            ("tx_id".to_string(), "T1".to_string()),
            ("from".to_string(), "A".to_string()),
            ("to".to_string(), "B".to_string()),
            ("amt".to_string(), "500".to_string()),
            ("datetime".to_string(), "2024-01-01 10:00:00".to_string()),
        ])];
        let outcome = load_transactions(rows).unwrap();
        assert_eq!(outcome.transactions.len(), 1);
        assert_eq!(outcome.transactions[0].sender_id, "A");
    }

    #[test]
    fn drops_unparseable_rows_but_keeps_others() {
        let rows = vec![
            row("T1", "A", "B", "100", "2024-01-01 10:00:00"),
            row("T2", "A", "B", "not-a-number", "2024-01-01 11:00:00"),
        ];
        let outcome = load_transactions(rows).unwrap();
        assert_eq!(outcome.transactions.len(), 1);
        assert_eq!(outcome.dropped_rows, 1);
    }

    #[test]
    fn non_positive_amounts_are_warned_not_dropped() {
        let rows = vec![row("T1", "A", "B", "-50", "2024-01-01 10:00:00")];
        let outcome = load_transactions(rows).unwrap();
        assert_eq!(outcome.transactions.len(), 1);
        assert_eq!(outcome.non_positive_amounts, 1);
    }

    #[test]
    fn all_rows_failing_coercion_is_invalid() {
        let rows = vec![row("T1", "A", "B", "nope", "2024-01-01 10:00:00")];
        let err = load_transactions(rows).unwrap_err();
        assert!(matches!(err, DetectionError::InvalidInput(_)));
    }

    #[test]
    fn sorts_by_timestamp_ascending() {
        let rows = vec![
            row("T2", "A", "B", "100", "2024-01-02 10:00:00"),
            row("T1", "A", "B", "100", "2024-01-01 10:00:00"),
        ];
        let outcome = load_transactions(rows).unwrap();
        assert_eq!(outcome.transactions[0].transaction_id, "T1");
        assert_eq!(outcome.transactions[1].transaction_id, "T2");
    }
}
