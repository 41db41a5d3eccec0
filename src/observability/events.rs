/// Structured judge events
///
/// One JSON object per event, emitted through the `log` facade under the
/// `ojtest::events` target so they can be filtered independently with
/// `RUST_LOG=ojtest::events=info`. Every event carries the run correlation ID.
use crate::config::types::TestPointId;
use crate::safety::integrity::IntegrityReport;
use crate::verdict::outcome::{TestPointResult, TestPointStatus};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

const EVENT_TARGET: &str = "ojtest::events";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JudgeEventType {
    RunStart,
    RunEnd,
    GroupStart,
    GroupMissing,
    PlaygroundReset,
    TestPointSkipped,
    TestPointFinished,
    IntegrityChecked,
    IntegrityFailed,
}

impl JudgeEventType {
    fn level(self) -> log::Level {
        match self {
            JudgeEventType::GroupMissing | JudgeEventType::IntegrityFailed => log::Level::Warn,
            JudgeEventType::PlaygroundReset | JudgeEventType::TestPointSkipped => {
                log::Level::Debug
            }
            _ => log::Level::Info,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeEvent {
    pub timestamp_ms: u64,
    pub run_id: String,
    pub event_type: JudgeEventType,
    pub details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_point: Option<TestPointId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl JudgeEvent {
    pub fn new(run_id: &str, event_type: JudgeEventType, details: String) -> Self {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            timestamp_ms,
            run_id: run_id.to_string(),
            event_type,
            details,
            group: None,
            test_point: None,
            payload: None,
        }
    }

    pub fn with_group(mut self, group: &str) -> Self {
        self.group = Some(group.to_string());
        self
    }

    pub fn with_test_point(mut self, id: TestPointId) -> Self {
        self.test_point = Some(id);
        self
    }

    pub fn with_payload<T: Serialize>(mut self, payload: &T) -> Self {
        self.payload = serde_json::to_value(payload).ok();
        self
    }
}

pub fn log_event(event: &JudgeEvent) {
    let level = event.event_type.level();
    if !log::log_enabled!(target: EVENT_TARGET, level) {
        return;
    }
    match serde_json::to_string(event) {
        Ok(line) => log::log!(target: EVENT_TARGET, level, "{}", line),
        Err(e) => log::error!("failed to serialize judge event: {}", e),
    }
}

pub fn run_start(run_id: &str, groups: &[String]) {
    log_event(
        &JudgeEvent::new(
            run_id,
            JudgeEventType::RunStart,
            format!("running {} group(s)", groups.len()),
        )
        .with_payload(&groups),
    );
}

pub fn run_end(run_id: &str, passed: usize, failed: usize) {
    log_event(
        &JudgeEvent::new(
            run_id,
            JudgeEventType::RunEnd,
            format!("{} passed, {} failed", passed, failed),
        )
        .with_payload(&serde_json::json!({ "passed": passed, "failed": failed })),
    );
}

pub fn group_start(run_id: &str, group: &str, test_points: usize) {
    log_event(
        &JudgeEvent::new(
            run_id,
            JudgeEventType::GroupStart,
            format!("{} test point(s)", test_points),
        )
        .with_group(group),
    );
}

pub fn group_missing(run_id: &str, group: &str) {
    log_event(
        &JudgeEvent::new(
            run_id,
            JudgeEventType::GroupMissing,
            "group not present in manifest, nothing to run".to_string(),
        )
        .with_group(group),
    );
}

pub fn playground_reset(run_id: &str, group: &str, id: TestPointId) {
    log_event(
        &JudgeEvent::new(
            run_id,
            JudgeEventType::PlaygroundReset,
            "negative disk limit, playground recreated".to_string(),
        )
        .with_group(group)
        .with_test_point(id),
    );
}

pub fn test_point_recorded(run_id: &str, result: &TestPointResult) {
    let event_type = if result.status == TestPointStatus::Skipped {
        JudgeEventType::TestPointSkipped
    } else {
        JudgeEventType::TestPointFinished
    };
    log_event(
        &JudgeEvent::new(run_id, event_type, result.status.to_string())
            .with_group(&result.group)
            .with_test_point(result.id)
            .with_payload(result),
    );
}

pub fn integrity_checked(run_id: &str, report: &IntegrityReport) {
    let event_type = if report.is_clean() {
        JudgeEventType::IntegrityChecked
    } else {
        JudgeEventType::IntegrityFailed
    };
    log_event(
        &JudgeEvent::new(
            run_id,
            event_type,
            format!("{} file(s) verified", report.verified),
        )
        .with_payload(report),
    );
}
