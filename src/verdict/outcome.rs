/// Per-test-point verdicts
///
/// Every status collapses to the single boolean kept in the dependency
/// ledger; the categories exist so operators can tell failures apart.
use crate::config::types::TestPointId;
use crate::exec::executor::ExitReport;
use serde::{Deserialize, Serialize};

/// Status of one test point - closed set
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum TestPointStatus {
    /// Zero exit and output identical to the expected answer
    #[serde(rename = "AC")]
    Accepted,
    /// Zero exit, output differs
    #[serde(rename = "WA")]
    WrongAnswer,
    /// Non-zero exit or fatal signal, no comparison attempted
    #[serde(rename = "RE")]
    RuntimeError,
    /// Killed by the optional supervisor deadline
    #[serde(rename = "TLE")]
    TimeLimit,
    /// Dependency unmet, never executed
    #[serde(rename = "SKIP")]
    Skipped,
    /// Harness could not run or judge the point (missing data, spawn failure)
    #[serde(rename = "IE")]
    InternalError,
}

impl TestPointStatus {
    pub fn passed(self) -> bool {
        self == TestPointStatus::Accepted
    }

    pub fn code(self) -> &'static str {
        match self {
            TestPointStatus::Accepted => "AC",
            TestPointStatus::WrongAnswer => "WA",
            TestPointStatus::RuntimeError => "RE",
            TestPointStatus::TimeLimit => "TLE",
            TestPointStatus::Skipped => "SKIP",
            TestPointStatus::InternalError => "IE",
        }
    }

    /// Status for a run that did not exit cleanly
    pub fn from_failed_exit(exit: &ExitReport) -> Self {
        if exit.killed_by_supervisor {
            TestPointStatus::TimeLimit
        } else {
            TestPointStatus::RuntimeError
        }
    }
}

impl std::fmt::Display for TestPointStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.code())
    }
}

/// Recorded outcome of one test point
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TestPointResult {
    pub group: String,
    pub id: TestPointId,
    pub status: TestPointStatus,
    /// Absent when the point was never executed
    pub exit: Option<ExitReport>,
    /// `Some` only when a comparison was attempted
    pub output_matched: Option<bool>,
    /// Explanation for skips and internal errors
    pub detail: Option<String>,
}

impl TestPointResult {
    pub fn skipped(group: &str, id: TestPointId, dependency: TestPointId) -> Self {
        Self {
            group: group.to_string(),
            id,
            status: TestPointStatus::Skipped,
            exit: None,
            output_matched: None,
            detail: Some(format!("dependency {} not satisfied", dependency)),
        }
    }

    pub fn internal_error(group: &str, id: TestPointId, detail: String) -> Self {
        Self {
            group: group.to_string(),
            id,
            status: TestPointStatus::InternalError,
            exit: None,
            output_matched: None,
            detail: Some(detail),
        }
    }

    /// Outcome after the child ran; `output_matched` is `None` when the exit
    /// status short-circuited the comparison
    pub fn executed(
        group: &str,
        id: TestPointId,
        exit: ExitReport,
        output_matched: Option<bool>,
    ) -> Self {
        let status = match output_matched {
            _ if !exit.success() => TestPointStatus::from_failed_exit(&exit),
            Some(true) => TestPointStatus::Accepted,
            Some(false) => TestPointStatus::WrongAnswer,
            None => TestPointStatus::InternalError,
        };
        Self {
            group: group.to_string(),
            id,
            status,
            exit: Some(exit),
            output_matched,
            detail: None,
        }
    }

    pub fn passed(&self) -> bool {
        self.status.passed()
    }
}
