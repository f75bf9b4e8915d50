//! Collapses a transaction sequence into a directed multigraph aggregated
//! per (sender, receiver) pair.
//!
//! Built once per analysis and read-only thereafter: every downstream
//! detector borrows the same `Graph` without locking. Node and adjacency
//! iteration order is the order accounts and edges were first encountered
//! in the (already timestamp-sorted) transaction sequence, which keeps
//! every detector's output deterministic under input row permutation.

use crate::model::{Edge, IdInterner, NodeId, Transaction};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// The aggregated transaction graph plus the per-account raw-transaction
/// activity log detectors need for merchant/shell/velocity checks.
pub struct Graph {
    interner: IdInterner,
    successors: Vec<Vec<NodeId>>,
    predecessors: Vec<Vec<NodeId>>,
    edges: HashMap<(NodeId, NodeId), Edge>,
    edge_order: Vec<(NodeId, NodeId)>,
    /// Per-node chronological log of (timestamp, counterparty) for every
    /// raw transaction touching that node, as sender or receiver.
    activity: Vec<Vec<(DateTime<Utc>, NodeId)>>,
}

impl Graph {
    /// Builds the aggregated graph from a timestamp-sorted transaction
    /// sequence (see [`crate::loader::load_transactions`]).
    pub fn build(transactions: &[Transaction]) -> Graph {
        let mut interner = IdInterner::new();
        for txn in transactions {
            interner.intern(&txn.sender_id);
            interner.intern(&txn.receiver_id);
        }
        let node_count = interner.len();

        struct Agg {
            amount: f64,
            txn_count: u64,
            first_txn: DateTime<Utc>,
            last_txn: DateTime<Utc>,
        }

        let mut aggregates: HashMap<(NodeId, NodeId), Agg> = HashMap::new();
        let mut edge_order = Vec::new();
        let mut activity: Vec<Vec<(DateTime<Utc>, NodeId)>> = vec![Vec::new(); node_count];

        for txn in transactions {
            let sender = interner.get(&txn.sender_id).unwrap();
            let receiver = interner.get(&txn.receiver_id).unwrap();
            let key = (sender, receiver);

            match aggregates.get_mut(&key) {
                Some(agg) => {
                    agg.amount += txn.amount;
                    agg.txn_count += 1;
                    if txn.timestamp < agg.first_txn {
                        agg.first_txn = txn.timestamp;
                    }
                    if txn.timestamp > agg.last_txn {
                        agg.last_txn = txn.timestamp;
                    }
                }
                None => {
                    edge_order.push(key);
                    aggregates.insert(
                        key,
                        Agg {
                            amount: txn.amount,
                            txn_count: 1,
                            first_txn: txn.timestamp,
                            last_txn: txn.timestamp,
                        },
                    );
                }
            }

            activity[sender.index()].push((txn.timestamp, receiver));
            activity[receiver.index()].push((txn.timestamp, sender));
        }

        let mut successors: Vec<Vec<NodeId>> = vec![Vec::new(); node_count];
        let mut predecessors: Vec<Vec<NodeId>> = vec![Vec::new(); node_count];
        let mut edges = HashMap::with_capacity(edge_order.len());

        for &(sender, receiver) in &edge_order {
            let agg = aggregates.remove(&(sender, receiver)).unwrap();
            let duration_days = (agg.last_txn - agg.first_txn).num_seconds() as f64 / 86_400.0;
            edges.insert(
                (sender, receiver),
                Edge {
                    amount: agg.amount,
                    txn_count: agg.txn_count,
                    avg_amount: agg.amount / agg.txn_count as f64,
                    first_txn: agg.first_txn,
                    last_txn: agg.last_txn,
                    duration_days: duration_days.max(0.0),
                },
            );
            successors[sender.index()].push(receiver);
            predecessors[receiver.index()].push(sender);
        }

        Graph {
            interner,
            successors,
            predecessors,
            edges,
            edge_order,
            activity,
        }
    }

    pub fn node_count(&self) -> usize {
        self.interner.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Nodes in first-seen (deterministic) order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.interner.len() as u32).map(NodeId)
    }

    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId, &Edge)> + '_ {
        self.edge_order
            .iter()
            .map(move |&(s, r)| (s, r, &self.edges[&(s, r)]))
    }

    pub fn edge(&self, sender: NodeId, receiver: NodeId) -> Option<&Edge> {
        self.edges.get(&(sender, receiver))
    }

    pub fn successors(&self, node: NodeId) -> &[NodeId] {
        &self.successors[node.index()]
    }

    pub fn predecessors(&self, node: NodeId) -> &[NodeId] {
        &self.predecessors[node.index()]
    }

    pub fn in_degree(&self, node: NodeId) -> usize {
        self.predecessors[node.index()].len()
    }

    pub fn out_degree(&self, node: NodeId) -> usize {
        self.successors[node.index()].len()
    }

    pub fn account_id(&self, node: NodeId) -> &str {
        self.interner.account_id(node)
    }

    pub fn node_id(&self, account_id: &str) -> Option<NodeId> {
        self.interner.get(account_id)
    }

    /// Chronological (timestamp, counterparty) log for every raw
    /// transaction touching `node`.
    pub fn activity(&self, node: NodeId) -> &[(DateTime<Utc>, NodeId)] {
        &self.activity[node.index()]
    }

    /// Total raw transaction count for `node` (sender or receiver side).
    pub fn total_txn_count(&self, node: NodeId) -> usize {
        self.activity[node.index()].len()
    }
}
