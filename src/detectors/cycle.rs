//! Enumerates simple cycles of length 3–5 on the aggregated graph.
//!
//! Each start node is explored independently, recursing only into
//! successors whose index is greater than the start (the standard trick
//! for reporting every elementary circuit exactly once, from its
//! minimum-index member, without an explicit post-hoc dedup pass). The
//! length bound lets this stay a plain depth-bounded DFS rather than a
//! general Johnson's-algorithm implementation with strongly-connected
//! component restriction: at depth 5 there is nothing left to prune.

use crate::config::DetectionConfig;
use crate::graph::Graph;
use crate::model::NodeId;
use std::collections::HashSet;
use tracing::warn;

/// Output of the cycle detector: the accepted cycles (after false-positive
/// guards) plus whether the search was cut short.
#[derive(Debug, Default, Clone)]
pub struct CycleOutcome {
    pub cycles: Vec<Vec<NodeId>>,
    pub overflowed: bool,
    pub timed_out: bool,
}

impl CycleOutcome {
    /// Union of every node appearing in an accepted cycle.
    pub fn flagged_accounts(&self) -> HashSet<NodeId> {
        self.cycles.iter().flatten().copied().collect()
    }
}

fn is_legit_hub(graph: &Graph, node: NodeId, config: &DetectionConfig) -> bool {
    graph.in_degree(node) > config.legit_high_degree && graph.out_degree(node) > config.legit_high_degree
}

fn cycle_amount(graph: &Graph, cycle: &[NodeId]) -> Option<f64> {
    let mut total = 0.0;
    for i in 0..cycle.len() {
        let from = cycle[i];
        let to = cycle[(i + 1) % cycle.len()];
        let edge = graph.edge(from, to)?;
        total += edge.amount;
    }
    Some(total)
}

fn is_suspicious(graph: &Graph, cycle: &[NodeId], config: &DetectionConfig) -> bool {
    if !(config.min_cycle_len..=config.max_cycle_len).contains(&cycle.len()) {
        return false;
    }
    if cycle.iter().any(|&n| is_legit_hub(graph, n, config)) {
        return false;
    }
    match cycle_amount(graph, cycle) {
        Some(total) => total >= config.min_cycle_amount,
        None => false,
    }
}

#[allow(clippy::too_many_arguments)]
fn dfs(
    graph: &Graph,
    start: NodeId,
    path: &mut Vec<NodeId>,
    on_path: &mut HashSet<NodeId>,
    config: &DetectionConfig,
    frames: &mut usize,
    raw_cycles: &mut Vec<Vec<NodeId>>,
) -> bool {
    *frames += 1;
    if *frames > config.max_cycle_dfs_frames {
        return false;
    }

    let current = *path.last().unwrap();
    for &next in graph.successors(current) {
        if next == start && path.len() >= config.min_cycle_len {
            raw_cycles.push(path.clone());
            continue;
        }
        if next.0 <= start.0 || on_path.contains(&next) {
            continue;
        }
        if path.len() >= config.max_cycle_len {
            continue;
        }
        path.push(next);
        on_path.insert(next);
        if !dfs(graph, start, path, on_path, config, frames, raw_cycles) {
            return false;
        }
        on_path.remove(&next);
        path.pop();
    }
    true
}

/// Enumerates and guard-filters simple cycles of length 3–5.
pub fn detect_cycles(graph: &Graph, config: &DetectionConfig) -> CycleOutcome {
    let mut raw_cycles = Vec::new();
    let mut frames = 0usize;
    let mut overflowed = false;
    let mut timed_out = false;

    'outer: for start in graph.nodes() {
        if config.deadline_exceeded() {
            timed_out = true;
            break 'outer;
        }
        let mut path = vec![start];
        let mut on_path = HashSet::new();
        on_path.insert(start);
        if !dfs(graph, start, &mut path, &mut on_path, config, &mut frames, &mut raw_cycles) {
            overflowed = true;
            break 'outer;
        }
    }

    if overflowed {
        warn!("cycle enumeration exceeded its resource budget; returning no cycles");
        return CycleOutcome {
            cycles: Vec::new(),
            overflowed: true,
            timed_out,
        };
    }

    let cycles: Vec<Vec<NodeId>> = raw_cycles
        .into_iter()
        .filter(|c| is_suspicious(graph, c, config))
        .collect();

    CycleOutcome {
        cycles,
        overflowed: false,
        timed_out,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Transaction;
    use chrono::{DateTime, TimeZone, Utc};

    fn ts(h: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + h * 3600, 0).unwrap()
    }

    fn txn(id: &str, from: &str, to: &str, amount: f64, h: i64) -> Transaction {
        Transaction {
            transaction_id: id.to_string(),
            sender_id: from.to_string(),
            receiver_id: to.to_string(),
            amount,
            timestamp: ts(h),
        }
    }

    #[test]
    fn detects_triangle_cycle() {
        let txns = vec![
            txn("T1", "A", "B", 500.0, 0),
            txn("T2", "B", "C", 500.0, 1),
            txn("T3", "C", "A", 500.0, 2),
        ];
        let graph = Graph::build(&txns);
        let outcome = detect_cycles(&graph, &DetectionConfig::default());
        assert_eq!(outcome.cycles.len(), 1);
        assert_eq!(outcome.cycles[0].len(), 3);
    }

    #[test]
    fn rejects_cycle_below_min_amount() {
        let txns = vec![
            txn("T1", "A", "B", 333.33, 0),
            txn("T2", "B", "C", 333.33, 1),
            txn("T3", "C", "A", 333.33, 2),
        ];
        let graph = Graph::build(&txns);
        let outcome = detect_cycles(&graph, &DetectionConfig::default());
        assert!(outcome.cycles.is_empty());
    }

    #[test]
    fn rejects_cycle_longer_than_five() {
        let txns = vec![
            txn("T1", "A", "B", 1000.0, 0),
            txn("T2", "B", "C", 1000.0, 1),
            txn("T3", "C", "D", 1000.0, 2),
            txn("T4", "D", "E", 1000.0, 3),
            txn("T5", "E", "F", 1000.0, 4),
            txn("T6", "F", "A", 1000.0, 5),
        ];
        let graph = Graph::build(&txns);
        let outcome = detect_cycles(&graph, &DetectionConfig::default());
        assert!(outcome.cycles.is_empty());
    }

    #[test]
    fn rejects_cycle_through_legit_hub() {
        let mut txns = vec![
            txn("T1", "A", "H", 5000.0, 0),
            txn("T2", "H", "B", 5000.0, 1),
            txn("T3", "B", "A", 5000.0, 2),
        ];
        // Give H in/out degree > 10 via unrelated counterparties.
        for i in 0..15 {
            txns.push(txn(&format!("IN{i}"), &format!("X{i}"), "H", 10.0, 3));
            txns.push(txn(&format!("OUT{i}"), "H", &format!("Y{i}"), 10.0, 3));
        }
        let graph = Graph::build(&txns);
        let outcome = detect_cycles(&graph, &DetectionConfig::default());
        assert!(outcome.cycles.is_empty());
    }
}
