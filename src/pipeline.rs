//! Orchestrates the full detection pipeline: Loader → Graph Builder →
//! {Cycle, Fan, Chain} → Scoring → Rings → Report assembly.

use crate::config::DetectionConfig;
use crate::detectors::chain::{self, ChainRecord};
use crate::detectors::cycle::{self, CycleOutcome};
use crate::detectors::fan::{self, FanOutcome};
use crate::error::DetectionError;
use crate::graph::Graph;
use crate::loader::{load_transactions, LoadOutcome};
use crate::model::{NodeId, RawRow};
use crate::rings::{self, FraudRing, NetworkStats};
use crate::scoring::{score_all_accounts, RiskLevel, ScoredAccount, ScoringInputs};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;
use tracing::info;

/// The source returns `cycles` and `fan_patterns` in full, but caps
/// `chains` and `risk_scores` at these sizes.
const MAX_AUX_CHAINS: usize = 20;
const MAX_AUX_RISK_SCORES: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuspiciousAccount {
    pub account_id: String,
    pub suspicion_score: f64,
    pub risk_level: String,
    pub detected_patterns: Vec<String>,
    pub ring_id: Option<String>,
    /// Additive detail beyond the stable contract: per-signal contribution,
    /// useful for a downstream explanation surface but not itself required.
    pub component_scores: HashMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudRingReport {
    pub ring_id: String,
    pub member_accounts: Vec<String>,
    pub pattern_type: String,
    pub risk_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub suspicious: bool,
    pub ring_id: Option<String>,
    pub in_degree: usize,
    pub out_degree: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphLink {
    pub source: String,
    pub target: String,
    pub amount: f64,
    pub txn_count: u64,
    pub suspicious: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphData {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkStatsReport {
    pub density: f64,
    pub avg_clustering: f64,
    pub num_components: usize,
    pub avg_in_degree: f64,
    pub avg_out_degree: f64,
}

impl From<NetworkStats> for NetworkStatsReport {
    fn from(s: NetworkStats) -> Self {
        Self {
            density: s.density,
            avg_clustering: s.avg_clustering,
            num_components: s.num_weakly_connected_components,
            avg_in_degree: s.avg_in_degree,
            avg_out_degree: s.avg_out_degree,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleReport {
    pub accounts: Vec<String>,
    pub length: usize,
    pub total_amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanPatternReport {
    pub account: String,
    pub pattern: String,
    pub counterparty_count: Option<usize>,
    pub total_amount: Option<f64>,
    pub window_start: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainReport {
    pub path: Vec<String>,
    pub length: usize,
    pub total_amount: f64,
    pub shell_intermediaries: Vec<String>,
    pub hop_count: usize,
    pub pattern: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskScoreReport {
    pub account_id: String,
    pub risk_score: f64,
    pub component_scores: HashMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub total_accounts_analyzed: usize,
    pub total_transactions: usize,
    pub total_amount: f64,
    pub suspicious_accounts_flagged: usize,
    pub fraud_rings_detected: usize,
    pub cycles_found: usize,
    pub fan_out_accounts: usize,
    pub fan_in_accounts: usize,
    pub temporal_smurfs: usize,
    pub shell_chains: usize,
    pub critical_risk: usize,
    pub high_risk: usize,
    pub medium_risk: usize,
    pub low_risk: usize,
    pub processing_time_seconds: f64,
    pub timeout: bool,
    /// Additive loader diagnostics, not part of the stable contract.
    pub dropped_rows: usize,
    pub non_positive_amounts: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub suspicious_accounts: Vec<SuspiciousAccount>,
    pub fraud_rings: Vec<FraudRingReport>,
    pub summary: Summary,
    pub graph_data: GraphData,
    pub network_stats: NetworkStatsReport,
    pub cycles: Vec<CycleReport>,
    pub fan_patterns: Vec<FanPatternReport>,
    pub chains: Vec<ChainReport>,
    pub risk_scores: Vec<RiskScoreReport>,
}

fn to_suspicious_account(
    graph: &Graph,
    scored: &ScoredAccount,
    ring_id_by_node: &HashMap<NodeId, String>,
) -> SuspiciousAccount {
    SuspiciousAccount {
        account_id: graph.account_id(scored.account).to_string(),
        suspicion_score: scored.risk_score,
        risk_level: scored.risk_level.as_str().to_string(),
        detected_patterns: scored.risk_factors.clone(),
        ring_id: ring_id_by_node.get(&scored.account).cloned(),
        component_scores: scored.component_scores.clone(),
    }
}

fn to_ring_report(graph: &Graph, ring: &FraudRing) -> FraudRingReport {
    FraudRingReport {
        ring_id: format!("RING_{:03}", ring.ring_id),
        member_accounts: ring.members.iter().map(|m| graph.account_id(*m).to_string()).collect(),
        pattern_type: ring.dominant_pattern.clone(),
        risk_score: ring.ring_risk,
    }
}

fn build_graph_data(
    graph: &Graph,
    score_lookup: &HashMap<NodeId, f64>,
    ring_id_by_node: &HashMap<NodeId, String>,
) -> GraphData {
    let nodes = graph
        .nodes()
        .map(|node| GraphNode {
            id: graph.account_id(node).to_string(),
            suspicious: score_lookup.contains_key(&node),
            ring_id: ring_id_by_node.get(&node).cloned(),
            in_degree: graph.in_degree(node),
            out_degree: graph.out_degree(node),
        })
        .collect();

    let links = graph
        .edges()
        .map(|(sender, receiver, edge)| GraphLink {
            source: graph.account_id(sender).to_string(),
            target: graph.account_id(receiver).to_string(),
            amount: edge.amount,
            txn_count: edge.txn_count,
            suspicious: score_lookup.contains_key(&sender) || score_lookup.contains_key(&receiver),
        })
        .collect();

    GraphData { nodes, links }
}

fn cycle_reports(graph: &Graph, cycles: &CycleOutcome) -> Vec<CycleReport> {
    cycles
        .cycles
        .iter()
        .map(|cycle| {
            let mut total = 0.0;
            for i in 0..cycle.len() {
                let from = cycle[i];
                let to = cycle[(i + 1) % cycle.len()];
                if let Some(edge) = graph.edge(from, to) {
                    total += edge.amount;
                }
            }
            CycleReport {
                accounts: cycle.iter().map(|&n| graph.account_id(n).to_string()).collect(),
                length: cycle.len(),
                total_amount: total,
            }
        })
        .collect()
}

fn fan_pattern_reports(graph: &Graph, fans: &FanOutcome) -> Vec<FanPatternReport> {
    let mut out = Vec::new();
    for r in &fans.fan_out {
        out.push(FanPatternReport {
            account: graph.account_id(r.account).to_string(),
            pattern: "fan_out".to_string(),
            counterparty_count: Some(r.recipient_count),
            total_amount: Some(r.total_amount),
            window_start: None,
        });
    }
    for r in &fans.fan_in {
        out.push(FanPatternReport {
            account: graph.account_id(r.account).to_string(),
            pattern: "fan_in".to_string(),
            counterparty_count: Some(r.sender_count),
            total_amount: Some(r.total_amount),
            window_start: None,
        });
    }
    for r in &fans.temporal_smurfing {
        out.push(FanPatternReport {
            account: graph.account_id(r.account).to_string(),
            pattern: "temporal_smurfing".to_string(),
            counterparty_count: Some(r.max_counterparties),
            total_amount: None,
            window_start: Some(r.window_start),
        });
    }
    out
}

fn chain_reports(graph: &Graph, chains: &[ChainRecord]) -> Vec<ChainReport> {
    chains
        .iter()
        .take(MAX_AUX_CHAINS)
        .map(|c| ChainReport {
            path: c.path.iter().map(|&n| graph.account_id(n).to_string()).collect(),
            length: c.length,
            total_amount: c.total_amount,
            shell_intermediaries: c.shell_intermediaries.iter().map(|&n| graph.account_id(n).to_string()).collect(),
            hop_count: c.hop_count,
            pattern: c.pattern_label(),
        })
        .collect()
}

fn risk_score_reports(graph: &Graph, scored: &[ScoredAccount]) -> Vec<RiskScoreReport> {
    scored
        .iter()
        .take(MAX_AUX_RISK_SCORES)
        .map(|s| RiskScoreReport {
            account_id: graph.account_id(s.account).to_string(),
            risk_score: s.risk_score,
            component_scores: s.component_scores.clone(),
        })
        .collect()
}

struct DetectorResults {
    cycles: CycleOutcome,
    fans: FanOutcome,
    chains: Vec<ChainRecord>,
}

#[cfg(feature = "parallel-detectors")]
fn run_detectors(graph: &Graph, config: &DetectionConfig) -> DetectorResults {
    let (cycles, (fans, chains)) = std::thread::scope(|s| {
        let fan_chain_handle = s.spawn(|| {
            let fans = fan::detect_fan_patterns(graph, config);
            let chains = chain::detect_chains(graph, config);
            (fans, chains)
        });
        let cycles = cycle::detect_cycles(graph, config);
        (cycles, fan_chain_handle.join().expect("fan/chain detector thread panicked"))
    });
    DetectorResults { cycles, fans, chains }
}

#[cfg(not(feature = "parallel-detectors"))]
fn run_detectors(graph: &Graph, config: &DetectionConfig) -> DetectorResults {
    let cycles = cycle::detect_cycles(graph, config);
    let fans = fan::detect_fan_patterns(graph, config);
    let chains = chain::detect_chains(graph, config);
    DetectorResults { cycles, fans, chains }
}

/// Runs the full detection pipeline over an already-parsed row table.
/// Returns `Err(DetectionError::InvalidInput)` only when the loader cannot
/// produce a single valid transaction; every other fault degrades the
/// report (empty findings, `summary.timeout = true`) rather than failing
/// the call.
pub fn run_detection(rows: Vec<RawRow>, config: &DetectionConfig) -> Result<Report, DetectionError> {
    let start = Instant::now();

    let LoadOutcome {
        transactions,
        dropped_rows,
        non_positive_amounts,
    } = load_transactions(rows)?;

    info!(transactions = transactions.len(), dropped_rows, "loaded transaction batch");

    let graph = Graph::build(&transactions);
    info!(nodes = graph.node_count(), edges = graph.edge_count(), "graph built");

    let total_amount: f64 = transactions.iter().map(|t| t.amount).sum();
    let min_ts = transactions.first().map(|t| t.timestamp).unwrap();
    let max_ts = transactions.last().map(|t| t.timestamp).unwrap();

    let DetectorResults { cycles, fans, chains } = run_detectors(&graph, config);
    info!(
        cycles = cycles.cycles.len(),
        fan_out = fans.fan_out.len(),
        fan_in = fans.fan_in.len(),
        smurfing = fans.temporal_smurfing.len(),
        chains = chains.len(),
        "detectors complete"
    );

    let scoring_inputs = ScoringInputs {
        graph: &graph,
        cycles: &cycles,
        fans: &fans,
        chains: &chains,
        min_ts,
        max_ts,
    };
    let scored = score_all_accounts(&scoring_inputs, config);
    info!(suspicious_accounts = scored.len(), "scoring complete");

    let assembled_rings = rings::assemble_rings(&graph, &cycles, &fans, &chains, &scored);
    let network_stats = rings::compute_network_stats(&graph);
    info!(fraud_rings = assembled_rings.len(), "ring assembly complete");

    let mut ring_id_by_node: HashMap<NodeId, String> = HashMap::new();
    for ring in &assembled_rings {
        let label = format!("RING_{:03}", ring.ring_id);
        for &member in &ring.members {
            ring_id_by_node.insert(member, label.clone());
        }
    }

    let score_lookup: HashMap<NodeId, f64> = scored.iter().map(|s| (s.account, s.risk_score)).collect();

    let critical_risk = scored.iter().filter(|s| s.risk_level == RiskLevel::Critical).count();
    let high_risk = scored.iter().filter(|s| s.risk_level == RiskLevel::High).count();
    let medium_risk = scored.iter().filter(|s| s.risk_level == RiskLevel::Medium).count();
    let low_risk = scored.iter().filter(|s| s.risk_level == RiskLevel::Low).count();

    let timeout = cycles.timed_out || config.deadline_exceeded();

    let summary = Summary {
        total_accounts_analyzed: graph.node_count(),
        total_transactions: transactions.len(),
        total_amount,
        suspicious_accounts_flagged: scored.len(),
        fraud_rings_detected: assembled_rings.len(),
        cycles_found: cycles.cycles.len(),
        fan_out_accounts: fans.fan_out.len(),
        fan_in_accounts: fans.fan_in.len(),
        temporal_smurfs: fans.temporal_smurfing.len(),
        shell_chains: chains.len(),
        critical_risk,
        high_risk,
        medium_risk,
        low_risk,
        processing_time_seconds: start.elapsed().as_secs_f64(),
        timeout,
        dropped_rows,
        non_positive_amounts,
    };

    Ok(Report {
        suspicious_accounts: scored.iter().map(|s| to_suspicious_account(&graph, s, &ring_id_by_node)).collect(),
        fraud_rings: assembled_rings.iter().map(|r| to_ring_report(&graph, r)).collect(),
        summary,
        graph_data: build_graph_data(&graph, &score_lookup, &ring_id_by_node),
        network_stats: network_stats.into(),
        cycles: cycle_reports(&graph, &cycles),
        fan_patterns: fan_pattern_reports(&graph, &fans),
        chains: chain_reports(&graph, &chains),
        risk_scores: risk_score_reports(&graph, &scored),
    })
}
