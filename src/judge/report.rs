/// Result aggregation for a whole run
use crate::config::types::{HarnessError, Result};
use crate::verdict::outcome::{TestPointResult, TestPointStatus};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    /// In execution order
    pub results: Vec<TestPointResult>,
    any_failure: bool,
}

impl RunReport {
    pub fn new(run_id: String) -> Self {
        Self {
            run_id,
            results: Vec::new(),
            any_failure: false,
        }
    }

    pub fn record(&mut self, result: TestPointResult) {
        if !result.passed() {
            self.any_failure = true;
        }
        self.results.push(result);
    }

    /// True once any test point, executed or skipped, was recorded failed
    pub fn any_failure(&self) -> bool {
        self.any_failure
    }

    /// Process exit code for the run
    pub fn exit_code(&self) -> i32 {
        if self.any_failure {
            1
        } else {
            0
        }
    }

    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.passed()
    }

    pub fn count(&self, status: TestPointStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    pub fn summary(&self) -> String {
        let mut parts = vec![format!("{} passed", self.passed())];
        for status in [
            TestPointStatus::WrongAnswer,
            TestPointStatus::RuntimeError,
            TestPointStatus::TimeLimit,
            TestPointStatus::Skipped,
            TestPointStatus::InternalError,
        ] {
            let n = self.count(status);
            if n > 0 {
                parts.push(format!("{} {}", n, status));
            }
        }
        format!("{} test point(s): {}", self.results.len(), parts.join(", "))
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| HarnessError::Config(format!("Failed to serialize report: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            HarnessError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to write report {}: {}", path.display(), e),
            ))
        })
    }
}
