//! # Fraud Ring Detector
//!
//! Graph-based fraud ring detection over financial transaction batches:
//! builds an aggregated transaction graph, runs three independent pattern
//! detectors (cycles, fan-out/fan-in/temporal smurfing, shell chains),
//! scores every account with a multi-signal weighted risk model, and
//! assembles flagged accounts into named fraud rings via union-find.
//!
//! ## Pipeline
//!
//! Loader → Graph Builder → {Cycle, Fan, Chain} detectors → Scoring →
//! Ring assembly → [`Report`]. [`run_detection`] drives the whole thing.

pub mod config;
pub mod detectors;
pub mod error;
pub mod graph;
pub mod loader;
pub mod model;
pub mod pipeline;
pub mod rings;
pub mod scoring;

pub use config::{DetectionConfig, RiskThresholds, RiskWeights};
pub use error::DetectionError;
pub use graph::Graph;
pub use loader::{load_transactions, LoadOutcome};
pub use model::{Edge, IdInterner, NodeId, RawRow, Transaction};
pub use pipeline::{run_detection, Report, Summary, SuspiciousAccount};
pub use rings::{FraudRing, NetworkStats};
pub use scoring::{RiskLevel, ScoredAccount};
