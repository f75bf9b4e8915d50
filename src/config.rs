//! Tunable detection parameters. All defaults mirror the fixed constants
//! documented for the detection engine; fields exist so callers can
//! override any of them without forking the pipeline.

use std::time::{Duration, Instant};

/// Per-signal weights for the scoring engine. The weights intentionally
/// sum to more than 100 (the final composed score is capped at 100).
#[derive(Debug, Clone, Copy)]
pub struct RiskWeights {
    pub cycle: f64,
    pub fan_out: f64,
    pub fan_in: f64,
    pub temporal_smurfing: f64,
    pub shell_chain: f64,
    pub high_velocity: f64,
    pub pagerank_centrality: f64,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            cycle: 30.0,
            fan_out: 15.0,
            fan_in: 15.0,
            temporal_smurfing: 20.0,
            shell_chain: 10.0,
            high_velocity: 5.0,
            pagerank_centrality: 5.0,
        }
    }
}

/// Risk-level classification thresholds (inclusive lower bounds).
#[derive(Debug, Clone, Copy)]
pub struct RiskThresholds {
    pub critical: f64,
    pub high: f64,
    pub medium: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            critical: 70.0,
            high: 50.0,
            medium: 30.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DetectionConfig {
    pub min_cycle_len: usize,
    pub max_cycle_len: usize,
    pub min_cycle_amount: f64,
    pub legit_high_degree: usize,
    pub max_cycle_dfs_frames: usize,

    pub fan_threshold: usize,
    pub temporal_window_hours: i64,
    pub legit_long_window_days: i64,

    pub chain_min_len: usize,
    pub shell_max_txn: usize,
    pub max_chain_depth: usize,
    pub max_chain_results: usize,

    pub risk_weights: RiskWeights,
    pub risk_thresholds: RiskThresholds,

    pub pagerank_damping: f64,
    pub pagerank_max_iters: usize,
    pub pagerank_tolerance: f64,

    /// Soft wall-clock budget for the whole pipeline. Stages poll this
    /// between top-level iterations and return partial results, flagging
    /// `timeout` in the summary, if it is exceeded.
    pub deadline: Option<Instant>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_cycle_len: 3,
            max_cycle_len: 5,
            min_cycle_amount: 1000.0,
            legit_high_degree: 10,
            max_cycle_dfs_frames: 2_000_000,

            fan_threshold: 10,
            temporal_window_hours: 72,
            legit_long_window_days: 30,

            chain_min_len: 3,
            shell_max_txn: 3,
            max_chain_depth: 5,
            max_chain_results: 200,

            risk_weights: RiskWeights::default(),
            risk_thresholds: RiskThresholds::default(),

            pagerank_damping: 0.85,
            pagerank_max_iters: 100,
            pagerank_tolerance: 1e-6,

            deadline: None,
        }
    }
}

impl DetectionConfig {
    /// Returns a config with the soft budget set to `soft_budget` from now.
    pub fn with_soft_budget(soft_budget: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + soft_budget),
            ..Default::default()
        }
    }

    pub fn deadline_exceeded(&self) -> bool {
        matches!(self.deadline, Some(d) if Instant::now() > d)
    }
}
