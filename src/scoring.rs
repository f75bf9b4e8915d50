//! Composes per-account risk from detector memberships, velocity, and
//! PageRank centrality into a capped 0–100 score.

use crate::config::DetectionConfig;
use crate::detectors::chain::ChainRecord;
use crate::detectors::cycle::CycleOutcome;
use crate::detectors::fan::FanOutcome;
use crate::graph::Graph;
use crate::model::NodeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Critical,
    High,
    Medium,
    Low,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Critical => "critical",
            RiskLevel::High => "high",
            RiskLevel::Medium => "medium",
            RiskLevel::Low => "low",
        }
    }

    fn from_score(score: f64, thresholds: &crate::config::RiskThresholds) -> Self {
        if score >= thresholds.critical {
            RiskLevel::Critical
        } else if score >= thresholds.high {
            RiskLevel::High
        } else if score >= thresholds.medium {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScoredAccount {
    pub account: NodeId,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub risk_factors: Vec<String>,
    pub component_scores: HashMap<String, f64>,
}

/// Power-iteration PageRank over the aggregated graph. Dangling nodes
/// (out-degree zero) redistribute their rank mass uniformly, matching the
/// standard treatment used by general-purpose graph libraries.
pub fn pagerank(graph: &Graph, damping: f64, max_iters: usize, tolerance: f64) -> Vec<f64> {
    let n = graph.node_count();
    if n == 0 {
        return Vec::new();
    }
    let base = (1.0 - damping) / n as f64;
    let mut rank = vec![1.0 / n as f64; n];

    for _ in 0..max_iters {
        let dangling_mass: f64 = graph
            .nodes()
            .filter(|&node| graph.out_degree(node) == 0)
            .map(|node| rank[node.index()])
            .sum();
        let mut next_rank = vec![base + damping * dangling_mass / n as f64; n];

        for node in graph.nodes() {
            let out_deg = graph.out_degree(node);
            if out_deg == 0 {
                continue;
            }
            let share = damping * rank[node.index()] / out_deg as f64;
            for &successor in graph.successors(node) {
                next_rank[successor.index()] += share;
            }
        }

        let delta: f64 = next_rank
            .iter()
            .zip(rank.iter())
            .map(|(a, b)| (a - b).abs())
            .sum();
        rank = next_rank;
        if delta < tolerance {
            break;
        }
    }

    rank
}

/// Per-account raw transaction velocity: transaction count divided by the
/// whole-batch span in whole days (minimum 1).
fn compute_velocity(graph: &Graph, min_ts: DateTime<Utc>, max_ts: DateTime<Utc>) -> Vec<f64> {
    let total_days = ((max_ts - min_ts).num_days()).max(1) as f64;
    graph
        .nodes()
        .map(|node| graph.total_txn_count(node) as f64 / total_days)
        .collect()
}

pub struct ScoringInputs<'a> {
    pub graph: &'a Graph,
    pub cycles: &'a CycleOutcome,
    pub fans: &'a FanOutcome,
    pub chains: &'a [ChainRecord],
    pub min_ts: DateTime<Utc>,
    pub max_ts: DateTime<Utc>,
}

/// Scores every node, in the graph's stable iteration order, and returns
/// only the accounts with a nonzero score, sorted by score descending
/// (ties broken by ascending account id for determinism).
pub fn score_all_accounts(inputs: &ScoringInputs, config: &DetectionConfig) -> Vec<ScoredAccount> {
    let graph = inputs.graph;
    let weights = &config.risk_weights;

    let pr = pagerank(graph, config.pagerank_damping, config.pagerank_max_iters, config.pagerank_tolerance);
    let pr_max = pr.iter().cloned().fold(0.0_f64, f64::max).max(1.0);
    let velocity = compute_velocity(graph, inputs.min_ts, inputs.max_ts);

    let cycle_accounts = inputs.cycles.flagged_accounts();
    let fan_out_accounts: HashSet<NodeId> = inputs.fans.fan_out.iter().map(|r| r.account).collect();
    let fan_in_accounts: HashSet<NodeId> = inputs.fans.fan_in.iter().map(|r| r.account).collect();
    let smurf_accounts: HashSet<NodeId> = inputs.fans.temporal_smurfing.iter().map(|r| r.account).collect();
    let chain_accounts: HashSet<NodeId> = inputs.chains.iter().flat_map(|c| c.path.iter().copied()).collect();

    let mut results = Vec::new();
    for node in graph.nodes() {
        let mut components: HashMap<String, f64> = HashMap::new();
        let mut factors = Vec::new();

        if cycle_accounts.contains(&node) {
            components.insert("cycle".to_string(), weights.cycle);
            factors.push("cycle_participant".to_string());
        }

        if fan_out_accounts.contains(&node) {
            let out_deg = graph.out_degree(node);
            let score = (weights.fan_out * (out_deg as f64 / 20.0)).min(weights.fan_out);
            components.insert("fan_out".to_string(), score);
            factors.push("fan_out_structuring".to_string());
        }

        if fan_in_accounts.contains(&node) {
            let in_deg = graph.in_degree(node);
            let score = (weights.fan_in * (in_deg as f64 / 20.0)).min(weights.fan_in);
            components.insert("fan_in".to_string(), score);
            factors.push("fan_in_aggregation".to_string());
        }

        if smurf_accounts.contains(&node) {
            components.insert("temporal_smurfing".to_string(), weights.temporal_smurfing);
            factors.push("temporal_smurfing".to_string());
        }

        if chain_accounts.contains(&node) {
            components.insert("shell_chain".to_string(), weights.shell_chain);
            factors.push("shell_chain_participant".to_string());
        }

        let vel = velocity[node.index()];
        if vel > 5.0 {
            let score = (weights.high_velocity * (vel / 20.0)).min(weights.high_velocity);
            components.insert("high_velocity".to_string(), score);
            factors.push(format!("high_velocity_{vel:.1}_txn_per_day"));
        }

        let node_pr = pr.get(node.index()).copied().unwrap_or(0.0);
        if node_pr > 0.0 {
            let pr_score = weights.pagerank_centrality * (node_pr / pr_max);
            if pr_score >= 2.0 {
                components.insert("pagerank_centrality".to_string(), pr_score);
                factors.push("high_network_centrality".to_string());
            }
        }

        let total: f64 = components.values().sum::<f64>().min(100.0);
        let rounded = (total * 100.0).round() / 100.0;
        if rounded > 0.0 {
            results.push(ScoredAccount {
                account: node,
                risk_score: rounded,
                risk_level: RiskLevel::from_score(rounded, &config.risk_thresholds),
                risk_factors: factors,
                component_scores: components
                    .into_iter()
                    .map(|(k, v)| (k, (v * 100.0).round() / 100.0))
                    .collect(),
            });
        }
    }

    results.sort_by(|a, b| {
        b.risk_score
            .partial_cmp(&a.risk_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| graph.account_id(a.account).cmp(graph.account_id(b.account)))
    });
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Transaction;
    use chrono::TimeZone;

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
    fn pagerank_sums_close_to_one() {
        let txns = vec![
            txn("T1", "A", "B", 1.0, 0),
            txn("T2", "B", "C", 1.0, 1),
            txn("T3", "C", "A", 1.0, 2),
        ];
        let graph = Graph::build(&txns);
        let ranks = pagerank(&graph, 0.85, 100, 1e-9);
        let sum: f64 = ranks.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn zero_score_accounts_are_omitted() {
        let txns = vec![txn("T1", "A", "B", 10.0, 0)];
        let graph = Graph::build(&txns);
        let cycles = CycleOutcome::default();
        let fans = crate::detectors::fan::FanOutcome::default();
        let chains: Vec<ChainRecord> = Vec::new();
        let inputs = ScoringInputs {
            graph: &graph,
            cycles: &cycles,
            fans: &fans,
            chains: &chains,
            min_ts: ts(0),
            max_ts: ts(1),
        };
        let scored = score_all_accounts(&inputs, &DetectionConfig::default());
        assert!(scored.is_empty());
    }

    #[test]
    fn risk_level_thresholds_are_consistent() {
        let thresholds = crate::config::RiskThresholds::default();
        assert_eq!(RiskLevel::from_score(70.0, &thresholds), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_score(50.0, &thresholds), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(30.0, &thresholds), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(0.1, &thresholds), RiskLevel::Low);
    }
}
