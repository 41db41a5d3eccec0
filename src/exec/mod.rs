//! Execution control
//!
//! Limit translation, the pre-exec rlimit hook, and the executor that runs
//! the program under test with redirected standard streams.

pub mod executor;
pub mod policy;
pub mod preexec;
