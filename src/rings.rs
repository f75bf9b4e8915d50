//! Assembles detector output into named fraud rings via union-find, and
//! computes whole-graph network statistics.

use crate::detectors::chain::ChainRecord;
use crate::detectors::cycle::CycleOutcome;
use crate::detectors::fan::FanOutcome;
use crate::graph::Graph;
use crate::model::NodeId;
use crate::scoring::ScoredAccount;
use std::collections::{HashMap, HashSet};

/// Union-find over dense node ids, path compression + union by rank.
struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            self.parent[x] = self.find(self.parent[x]);
        }
        self.parent[x]
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct FraudRing {
    pub ring_id: usize,
    pub members: Vec<NodeId>,
    pub dominant_pattern: String,
    pub ring_risk: f64,
}

/// Fixed scan order for dominant-pattern tie-breaking: the first pattern in
/// this list whose tally equals the max wins, which is deterministically
/// equivalent to "first encountered" under the source's literal tally order.
const PATTERN_PRIORITY: [&str; 4] = ["cycle", "smurfing", "shell_chain", "fan"];

/// Classifies one risk factor label into exactly one bucket, matching the
/// source's if/elif chain: a factor naming both "cycle" and another keyword
/// is counted only once, under "cycle".
fn classify_factor(factor: &str) -> Option<&'static str> {
    if factor.contains("cycle") {
        Some("cycle")
    } else if factor.contains("smurfing") {
        Some("smurfing")
    } else if factor.contains("shell") {
        Some("shell_chain")
    } else if factor.contains("fan") {
        Some("fan")
    } else {
        None
    }
}

fn dominant_pattern(members: &[NodeId], scored: &HashMap<NodeId, &ScoredAccount>) -> String {
    let mut tally: HashMap<&'static str, usize> = HashMap::new();
    for member in members {
        if let Some(account) = scored.get(member) {
            for factor in &account.risk_factors {
                if let Some(bucket) = classify_factor(factor) {
                    *tally.entry(bucket).or_insert(0) += 1;
                }
            }
        }
    }

    let max = tally.values().copied().max().unwrap_or(0);
    if max == 0 {
        return "unknown".to_string();
    }
    PATTERN_PRIORITY
        .iter()
        .find(|p| tally.get(*p).copied().unwrap_or(0) == max)
        .copied()
        .unwrap_or("unknown")
        .to_string()
}

/// Unions cycle and chain participants (the patterns with real multi-hop
/// structure), registers fan/smurf accounts as their own singleton
/// components, then keeps only components with at least two scored
/// members. Rings are renumbered in descending max-member-score order,
/// ties broken by the lexicographically smallest member account id.
pub fn assemble_rings(
    graph: &Graph,
    cycles: &CycleOutcome,
    fans: &FanOutcome,
    chains: &[ChainRecord],
    scored: &[ScoredAccount],
) -> Vec<FraudRing> {
    let n = graph.node_count();
    let mut uf = UnionFind::new(n);
    // fan-out/fan-in/temporal-smurf accounts need no explicit union: every
    // scored node already starts as its own singleton component.
    let _ = fans;

    for cycle in &cycles.cycles {
        for window in cycle.windows(2) {
            uf.union(window[0].index(), window[1].index());
        }
        if cycle.len() > 1 {
            uf.union(cycle[0].index(), cycle[cycle.len() - 1].index());
        }
    }
    for chain in chains {
        for window in chain.path.windows(2) {
            uf.union(window[0].index(), window[1].index());
        }
    }

    let score_by_node: HashMap<NodeId, f64> = scored.iter().map(|s| (s.account, s.risk_score)).collect();
    let account_by_node: HashMap<NodeId, &ScoredAccount> = scored.iter().map(|s| (s.account, s)).collect();

    let mut components: HashMap<usize, Vec<NodeId>> = HashMap::new();
    for node in graph.nodes() {
        if !score_by_node.contains_key(&node) {
            continue;
        }
        let root = uf.find(node.index());
        components.entry(root).or_default().push(node);
    }

    let mut rings: Vec<FraudRing> = Vec::new();
    for members in components.into_values() {
        if members.len() < 2 {
            continue;
        }
        let dominant = dominant_pattern(&members, &account_by_node);

        let scores: Vec<f64> = members.iter().map(|m| score_by_node[m]).collect();
        let max_score = scores.iter().copied().fold(0.0_f64, f64::max);
        let mean_score = scores.iter().copied().sum::<f64>() / scores.len() as f64;
        let ring_risk = 0.6 * max_score + 0.4 * mean_score;

        let mut sorted_members = members.clone();
        sorted_members.sort_by_key(|m| graph.account_id(*m).to_string());

        rings.push(FraudRing {
            ring_id: 0,
            members: sorted_members,
            dominant_pattern: dominant,
            ring_risk: (ring_risk * 100.0).round() / 100.0,
        });
    }

    rings.sort_by(|a, b| {
        let a_max = a.members.iter().map(|m| score_by_node[m]).fold(0.0_f64, f64::max);
        let b_max = b.members.iter().map(|m| score_by_node[m]).fold(0.0_f64, f64::max);
        b_max
            .partial_cmp(&a_max)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                graph.account_id(a.members[0]).cmp(graph.account_id(b.members[0]))
            })
    });

    for (i, ring) in rings.iter_mut().enumerate() {
        ring.ring_id = i + 1;
    }
    rings
}

/// Whole-graph structural statistics computed once per pipeline run.
#[derive(Debug, Clone)]
pub struct NetworkStats {
    pub density: f64,
    pub avg_clustering: f64,
    pub num_weakly_connected_components: usize,
    pub avg_in_degree: f64,
    pub avg_out_degree: f64,
}

/// Triangle counting on the undirected projection of the graph (an edge
/// exists in either direction), then the usual closed-triplet ratio.
fn average_clustering(graph: &Graph) -> f64 {
    let n = graph.node_count();
    if n == 0 {
        return 0.0;
    }

    let mut neighbors: Vec<HashSet<NodeId>> = vec![HashSet::new(); n];
    for node in graph.nodes() {
        for &succ in graph.successors(node) {
            neighbors[node.index()].insert(succ);
            neighbors[succ.index()].insert(node);
        }
    }

    let mut total = 0.0;
    let mut counted = 0usize;
    for node in graph.nodes() {
        let neigh = &neighbors[node.index()];
        let degree = neigh.len();
        if degree < 2 {
            continue;
        }
        let mut links = 0usize;
        let neigh_vec: Vec<NodeId> = neigh.iter().copied().collect();
        for i in 0..neigh_vec.len() {
            for j in (i + 1)..neigh_vec.len() {
                if neighbors[neigh_vec[i].index()].contains(&neigh_vec[j]) {
                    links += 1;
                }
            }
        }
        let possible = degree * (degree - 1) / 2;
        total += links as f64 / possible as f64;
        counted += 1;
    }

    if counted == 0 {
        0.0
    } else {
        total / counted as f64
    }
}

fn weakly_connected_components(graph: &Graph) -> usize {
    let n = graph.node_count();
    if n == 0 {
        return 0;
    }
    let mut uf = UnionFind::new(n);
    for node in graph.nodes() {
        for &succ in graph.successors(node) {
            uf.union(node.index(), succ.index());
        }
    }
    let roots: HashSet<usize> = (0..n).map(|i| uf.find(i)).collect();
    roots.len()
}

pub fn compute_network_stats(graph: &Graph) -> NetworkStats {
    let n = graph.node_count();
    if n == 0 {
        return NetworkStats {
            density: 0.0,
            avg_clustering: 0.0,
            num_weakly_connected_components: 0,
            avg_in_degree: 0.0,
            avg_out_degree: 0.0,
        };
    }

    let max_edges = (n * (n - 1)) as f64;
    let density = if max_edges > 0.0 {
        graph.edge_count() as f64 / max_edges
    } else {
        0.0
    };

    let total_in: usize = graph.nodes().map(|node| graph.in_degree(node)).sum();
    let total_out: usize = graph.nodes().map(|node| graph.out_degree(node)).sum();

    NetworkStats {
        density,
        avg_clustering: average_clustering(graph),
        num_weakly_connected_components: weakly_connected_components(graph),
        avg_in_degree: total_in as f64 / n as f64,
        avg_out_degree: total_out as f64 / n as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DetectionConfig;
    use crate::detectors::{chain::detect_chains, cycle::detect_cycles, fan::detect_fan_patterns};
    use crate::model::Transaction;
    use crate::scoring::{score_all_accounts, ScoringInputs};
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
    fn union_find_merges_cycle_into_one_ring() {
        let txns = vec![
            txn("T1", "A", "B", 500.0, 0),
            txn("T2", "B", "C", 500.0, 1),
            txn("T3", "C", "A", 500.0, 2),
        ];
        let graph = Graph::build(&txns);
        let config = DetectionConfig::default();
        let cycles = detect_cycles(&graph, &config);
        let fans = detect_fan_patterns(&graph, &config);
        let chains = detect_chains(&graph, &config);
        let inputs = ScoringInputs {
            graph: &graph,
            cycles: &cycles,
            fans: &fans,
            chains: &chains,
            min_ts: ts(0),
            max_ts: ts(3),
        };
        let scored = score_all_accounts(&inputs, &config);
        let rings = assemble_rings(&graph, &cycles, &fans, &chains, &scored);
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].members.len(), 3);
        assert_eq!(rings[0].dominant_pattern, "cycle");
        assert_eq!(rings[0].ring_id, 1);
    }

    #[test]
    fn single_unscored_node_never_forms_a_ring() {
        let txns = vec![txn("T1", "A", "B", 10.0, 0)];
        let graph = Graph::build(&txns);
        let config = DetectionConfig::default();
        let cycles = CycleOutcome::default();
        let fans = FanOutcome::default();
        let chains: Vec<ChainRecord> = Vec::new();
        let scored: Vec<ScoredAccount> = Vec::new();
        let _ = config;
        let rings = assemble_rings(&graph, &cycles, &fans, &chains, &scored);
        assert!(rings.is_empty());
    }

    #[test]
    fn network_stats_counts_disjoint_components() {
        let txns = vec![
            txn("T1", "A", "B", 10.0, 0),
            txn("T2", "C", "D", 10.0, 1),
        ];
        let graph = Graph::build(&txns);
        let stats = compute_network_stats(&graph);
        assert_eq!(stats.num_weakly_connected_components, 2);
        assert_eq!(stats.avg_in_degree, 0.5);
        assert_eq!(stats.avg_out_degree, 0.5);
    }

    #[test]
    fn clustering_is_one_for_a_closed_triangle() {
        let txns = vec![
            txn("T1", "A", "B", 10.0, 0),
            txn("T2", "B", "C", 10.0, 1),
            txn("T3", "C", "A", 10.0, 2),
        ];
        let graph = Graph::build(&txns);
        let stats = compute_network_stats(&graph);
        assert!((stats.avg_clustering - 1.0).abs() < 1e-9);
    }
}
