//! Bounded DFS for shell-account layering chains.
//!
//! A "shell" is an account with at most [`DetectionConfig::shell_max_txn`]
//! total raw transactions. Search starts only from non-shell accounts with
//! at least one outgoing edge (starting from a shell would just rediscover
//! a suffix of a chain some non-shell source already reaches), and keeps
//! extending past every emission, since a longer chain can still be valid
//! even after a shorter prefix already qualified.

use crate::config::DetectionConfig;
use crate::graph::Graph;
use crate::model::NodeId;
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct ChainRecord {
    pub path: Vec<NodeId>,
    pub length: usize,
    pub total_amount: f64,
    pub shell_intermediaries: Vec<NodeId>,
    pub hop_count: usize,
}

impl ChainRecord {
    pub fn pattern_label(&self) -> String {
        format!("shell_chain_{}hop", self.hop_count)
    }
}

fn is_shell(graph: &Graph, node: NodeId, config: &DetectionConfig) -> bool {
    graph.total_txn_count(node) <= config.shell_max_txn
}

fn chain_amount(graph: &Graph, path: &[NodeId]) -> f64 {
    path.windows(2)
        .filter_map(|w| graph.edge(w[0], w[1]))
        .map(|e| e.amount)
        .sum()
}

#[allow(clippy::too_many_arguments)]
fn dfs(
    graph: &Graph,
    path: &mut Vec<NodeId>,
    depth: usize,
    config: &DetectionConfig,
    visited: &mut HashSet<Vec<NodeId>>,
    out: &mut Vec<ChainRecord>,
) {
    if out.len() >= config.max_chain_results {
        return;
    }
    if depth > config.max_chain_depth {
        return;
    }

    let current = *path.last().unwrap();
    let successors = graph.successors(current).to_vec();
    for next in successors {
        if path.contains(&next) {
            continue;
        }
        path.push(next);

        if path.len() >= config.chain_min_len {
            let intermediaries = &path[1..path.len() - 1];
            if !intermediaries.is_empty()
                && intermediaries.iter().all(|&n| is_shell(graph, n, config))
                && out.len() < config.max_chain_results
                && visited.insert(path.clone())
            {
                let total_amount = chain_amount(graph, path);
                out.push(ChainRecord {
                    path: path.clone(),
                    length: path.len(),
                    total_amount,
                    shell_intermediaries: intermediaries.to_vec(),
                    hop_count: path.len() - 1,
                });
            }
        }

        if out.len() < config.max_chain_results {
            dfs(graph, path, depth + 1, config, visited, out);
        }
        path.pop();
    }
}

/// Enumerates shell-chain records up to `max_chain_results`, sorted by
/// length descending.
pub fn detect_chains(graph: &Graph, config: &DetectionConfig) -> Vec<ChainRecord> {
    let mut out = Vec::new();
    let mut visited = HashSet::new();

    for source in graph.nodes() {
        if out.len() >= config.max_chain_results {
            break;
        }
        if config.deadline_exceeded() {
            break;
        }
        if is_shell(graph, source, config) || graph.out_degree(source) == 0 {
            continue;
        }
        let mut path = vec![source];
        dfs(graph, &mut path, 1, config, &mut visited, &mut out);
    }

    out.sort_by_key(|c| std::cmp::Reverse(c.length));
    out
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
    fn detects_four_hop_shell_chain() {
        let mut txns = vec![
            txn("T1", "S", "H1", 1000.0, 0),
            txn("T2", "H1", "H2", 1000.0, 1),
            txn("T3", "H2", "H3", 1000.0, 2),
            txn("T4", "H3", "D", 1000.0, 3),
        ];
        // Give S and D extra activity so they aren't shells themselves.
        for i in 0..5 {
            txns.push(txn(&format!("SX{i}"), "S", &format!("Z{i}"), 1.0, 10 + i));
            txns.push(txn(&format!("DX{i}"), &format!("Y{i}"), "D", 1.0, 10 + i));
        }
        let graph = Graph::build(&txns);
        let chains = detect_chains(&graph, &DetectionConfig::default());
        let four_hop = chains.iter().find(|c| c.hop_count == 4);
        assert!(four_hop.is_some(), "expected a 4-hop shell chain");
    }

    #[test]
    fn rejects_chain_with_non_shell_intermediary() {
        let mut txns = vec![
            txn("T1", "S", "H1", 1000.0, 0),
            txn("T2", "H1", "D", 1000.0, 1),
        ];
        // H1 gets a 4th transaction, pushing it over the shell threshold.
        txns.push(txn("T3", "H1", "Other", 1.0, 2));
        txns.push(txn("T4", "H1", "Other2", 1.0, 3));
        for i in 0..5 {
            txns.push(txn(&format!("SX{i}"), "S", &format!("Z{i}"), 1.0, 10 + i));
        }
        let graph = Graph::build(&txns);
        let chains = detect_chains(&graph, &DetectionConfig::default());
        assert!(chains.iter().all(|c| c.hop_count != 2 || c.path.len() != 3));
    }
}
