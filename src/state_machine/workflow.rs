use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::phase::{Phase, PhaseResult};

/// The persisted record that carries workflow progress between invocations.
///
/// Nothing else survives from one invocation to the next, so every decision
/// the orchestrator makes is derived from this record. Field names match the
/// flat JSON document in the state blob; older field names are accepted on
/// read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredRecord")]
pub struct WorkflowState {
    /// Phase most recently attempted. `None` before the first run.
    pub current_phase: Option<Phase>,

    pub last_result: PhaseResult,

    /// RFC 3339 time of the most recent attempt that actually ran. Kept as
    /// text so a damaged value still loads; see [`WorkflowState::last_attempt`].
    pub last_attempt_time: String,

    /// Remote export job handle reported by the most recent attempt.
    pub last_task_handle: Option<String>,

    /// Diagnostic text of the last failure. Empty after a success.
    pub error_detail: String,
}

/// Action name older deployments wrote after starting only the tracker
/// export; the wiki export was started by a separate later step.
const LEGACY_TRACKER_ONLY_INIT: &str = "init-backup";

/// The record as read from storage, before names are resolved.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct StoredRecord {
    #[serde(alias = "lastAction", deserialize_with = "non_empty")]
    current_phase: Option<String>,

    #[serde(deserialize_with = "lenient_result")]
    last_result: PhaseResult,

    #[serde(alias = "lastExecution")]
    last_attempt_time: String,

    #[serde(alias = "lastJiraTaskID", deserialize_with = "non_empty")]
    last_task_handle: Option<String>,

    #[serde(alias = "errData")]
    error_detail: String,
}

impl From<StoredRecord> for WorkflowState {
    // Unknown phase names load as "no phase" so the cycle restarts instead of
    // the record becoming unreadable. A finished tracker-only initiation
    // loads as pending so initiation runs again and starts the wiki export.
    fn from(raw: StoredRecord) -> Self {
        let current_phase = raw
            .current_phase
            .as_deref()
            .and_then(|name| Phase::from_str(name).ok());
        let last_result = match (raw.current_phase.as_deref(), raw.last_result) {
            (Some(LEGACY_TRACKER_ONLY_INIT), PhaseResult::Succeeded) => PhaseResult::Pending,
            (_, result) => result,
        };

        Self {
            current_phase,
            last_result,
            last_attempt_time: raw.last_attempt_time,
            last_task_handle: raw.last_task_handle,
            error_detail: raw.error_detail,
        }
    }
}

impl WorkflowState {
    /// A record that makes the next invocation retry `phase`.
    pub fn pending(phase: Phase) -> Self {
        Self {
            current_phase: Some(phase),
            last_result: PhaseResult::Pending,
            ..Self::default()
        }
    }

    /// Phase the next invocation should execute.
    ///
    /// A success advances around the cycle; a failure or pending result
    /// retries the same phase. A record with no phase starts the cycle.
    pub fn next_phase(&self) -> Phase {
        match (self.current_phase, self.last_result) {
            (None, _) => Phase::FIRST,
            (Some(phase), PhaseResult::Succeeded) => phase.next(),
            (Some(phase), PhaseResult::Failed | PhaseResult::Pending) => phase,
        }
    }

    /// Parsed `last_attempt_time`, or `None` if it is missing or unreadable.
    pub fn last_attempt(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(self.last_attempt_time.trim())
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    /// Record a successful attempt of `phase` made at `at`.
    pub fn record_success(&mut self, phase: Phase, at: DateTime<Utc>, task_handle: Option<String>) {
        self.current_phase = Some(phase);
        self.last_result = PhaseResult::Succeeded;
        self.last_attempt_time = stamp(at);
        self.last_task_handle = task_handle;
        self.error_detail.clear();
    }

    /// Record a failed attempt of `phase` made at `at`.
    pub fn record_failure(
        &mut self,
        phase: Phase,
        at: DateTime<Utc>,
        detail: String,
        task_handle: Option<String>,
    ) {
        self.current_phase = Some(phase);
        self.last_result = PhaseResult::Failed;
        self.last_attempt_time = stamp(at);
        self.last_task_handle = task_handle;
        self.error_detail = detail;
    }
}

fn stamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn lenient_result<'de, D>(deserializer: D) -> Result<PhaseResult, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .and_then(|s| PhaseResult::from_str(&s).ok())
        .unwrap_or_default())
}

fn non_empty<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}
