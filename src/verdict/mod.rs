//! Verdicts
//!
//! Output comparison and the closed set of per-test-point statuses.

pub mod outcome;
pub mod verifier;
