//! Configuration
//!
//! Harness settings, the error taxonomy, and the decoded test manifest.

pub mod manifest;
pub mod types;
