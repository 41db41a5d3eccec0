//! Judging
//!
//! The dependency ledger, the orchestration loop over groups and test points,
//! and the run-level report that decides the exit code.

pub mod ledger;
pub mod report;
pub mod runner;
