//! Observability
//!
//! Structured judge events keyed by a per-run correlation ID.

pub mod events;
