//! Error taxonomy for the detection pipeline.
//!
//! Only [`DetectionError::InvalidInput`] is ever surfaced as a hard failure
//! to the caller. Empty-graph, timeout, and internal-fault conditions are
//! soft: a stage that hits one logs the fact and returns its neutral
//! element so the pipeline can keep going and still produce a `Report`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum DetectionError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}
