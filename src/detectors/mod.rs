//! The three independent pattern detectors: cycles, fan/smurfing, and
//! shell chains. Each reads the immutable [`crate::graph::Graph`] and
//! produces its own accumulator with no shared mutable state, so they may
//! run concurrently (see `crate::pipeline`).

pub mod chain;
pub mod cycle;
pub mod fan;
