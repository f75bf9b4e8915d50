//! Core data types shared across the detection pipeline: interned account
//! ids, raw transactions, and aggregated edges.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A dense index standing in for an account id throughout the hot paths of
/// the pipeline. Interning strings once at ingest lets every downstream
/// stage work with `Copy` integers instead of cloning `String`s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Maps account id strings to dense `NodeId`s, preserving first-seen order.
#[derive(Debug, Default)]
pub struct IdInterner {
    ids: Vec<String>,
    index: HashMap<String, NodeId>,
}

impl IdInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `account_id`, assigning it the next dense index on first sight.
    pub fn intern(&mut self, account_id: &str) -> NodeId {
        if let Some(&id) = self.index.get(account_id) {
            return id;
        }
        let id = NodeId(self.ids.len() as u32);
        self.ids.push(account_id.to_string());
        self.index.insert(account_id.to_string(), id);
        id
    }

    pub fn get(&self, account_id: &str) -> Option<NodeId> {
        self.index.get(account_id).copied()
    }

    pub fn account_id(&self, id: NodeId) -> &str {
        &self.ids[id.index()]
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// A single validated transaction row, post-loader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub amount: f64,
    pub timestamp: DateTime<Utc>,
}

/// A raw, not-yet-validated input row. Field names are matched
/// case-insensitively against the documented column variants (see
/// `crate::loader`), so this is intentionally just a bag of strings.
pub type RawRow = HashMap<String, String>;

/// One aggregated (sender, receiver) edge, summarizing every raw
/// transaction between the pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub amount: f64,
    pub txn_count: u64,
    pub avg_amount: f64,
    pub first_txn: DateTime<Utc>,
    pub last_txn: DateTime<Utc>,
    pub duration_days: f64,
}
