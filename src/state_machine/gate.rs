use chrono::{DateTime, TimeDelta, Utc};

use super::phase::Phase;

/// Minimum interval between attempts, per phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cooldowns {
    pub initiate: TimeDelta,
    pub save_tracker: TimeDelta,
    pub save_wiki: TimeDelta,
}

impl Default for Cooldowns {
    fn default() -> Self {
        Self {
            initiate: TimeDelta::hours(48),
            save_tracker: TimeDelta::hours(3),
            save_wiki: TimeDelta::hours(3),
        }
    }
}

impl Cooldowns {
    pub fn for_phase(&self, phase: Phase) -> TimeDelta {
        match phase {
            Phase::InitiateBackups => self.initiate,
            Phase::SaveTrackerArtifact => self.save_tracker,
            Phase::SaveWikiArtifact => self.save_wiki,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Open,
    Closed { ready_at: DateTime<Utc> },
}

impl GateDecision {
    pub fn is_open(&self) -> bool {
        matches!(self, GateDecision::Open)
    }
}

/// Decide whether a phase may run at `now`.
///
/// Opens iff `now >= last_attempt + cooldown`. A missing last attempt opens
/// the gate, so lost history never blocks the workflow.
pub fn check(last_attempt: Option<DateTime<Utc>>, cooldown: TimeDelta, now: DateTime<Utc>) -> GateDecision {
    let Some(last) = last_attempt else {
        return GateDecision::Open;
    };
    let ready_at = last
        .checked_add_signed(cooldown)
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    if now >= ready_at {
        GateDecision::Open
    } else {
        GateDecision::Closed { ready_at }
    }
}
