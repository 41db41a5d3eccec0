//! Safety
//!
//! Playground lifecycle for each group and integrity checks on the test data.

pub mod integrity;
pub mod playground;
