//! ojtest: a judging harness for programs under test
//!
//! Runs a compiled program against a corpus of test points organized into
//! named groups. Each test point carries its own resource limits and may
//! depend on an earlier one; each group gets an isolated working directory.
//!
//! # Architecture
//!
//! ## Configuration ([`config`])
//! - [`config::types`]: Harness settings and the error taxonomy
//! - [`config::manifest`]: Decoded test manifest (groups and per-point limits)
//!
//! ## Execution Control ([`exec`])
//! - [`exec::policy`]: Limit translation into seconds, KiB, 512-byte blocks, descriptors
//! - [`exec::preexec`]: `setrlimit` in the forked child
//! - [`exec::executor`]: Spawn with redirected stdio, optional deadline supervisor
//!
//! ## Verdicts ([`verdict`])
//! - [`verdict::verifier`]: Byte-for-byte comparison and diff artifacts
//! - [`verdict::outcome`]: Per-test-point status taxonomy
//!
//! ## Safety ([`safety`])
//! - [`safety::playground`]: Per-group working directories and resets
//! - [`safety::integrity`]: SHA-256 checksum validation of the test data
//!
//! ## Judging ([`judge`])
//! - [`judge::ledger`]: Dependency pass/fail ledger
//! - [`judge::runner`]: Orchestration loop and run context
//! - [`judge::report`]: Run-level aggregation and exit code
//!
//! ## Observability ([`observability`])
//! - [`observability::events`]: Structured judge events
//!
//! # Execution model
//!
//! Strictly sequential. A test point runs only after its dependency's outcome
//! is recorded, and the harness blocks on each child until it exits. Limits are
//! enforced by the kernel; the optional supervisor is the only harness-side kill.

// Configuration
pub mod config;

// Execution Control
pub mod exec;

// Verdicts
pub mod verdict;

// Safety
pub mod safety;

// Judging
pub mod judge;

// Observability
pub mod observability;

// CLI entrypoint wiring
pub mod cli;

pub use config::manifest::{Manifest, TestGroup, TestPointDescriptor};
pub use config::types::{HarnessConfig, HarnessError, Result, TestPointId};
pub use judge::runner::{GroupSelection, Judge, RunContext, RunOptions};
