use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The three steps of the backup cycle.
///
/// Phases loop forever: INITIATE_BACKUPS → SAVE_TRACKER_ARTIFACT →
/// SAVE_WIKI_ARTIFACT → INITIATE_BACKUPS → …
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    InitiateBackups,
    SaveTrackerArtifact,
    SaveWikiArtifact,
}

impl Phase {
    /// The phase a never-run workflow starts with.
    pub const FIRST: Phase = Phase::InitiateBackups;

    pub const ALL: [Phase; 3] = [
        Phase::InitiateBackups,
        Phase::SaveTrackerArtifact,
        Phase::SaveWikiArtifact,
    ];

    /// The phase that follows `self` once it has succeeded.
    pub fn next(self) -> Phase {
        match self {
            Phase::InitiateBackups => Phase::SaveTrackerArtifact,
            Phase::SaveTrackerArtifact => Phase::SaveWikiArtifact,
            Phase::SaveWikiArtifact => Phase::InitiateBackups,
        }
    }

    /// Name used in the persisted record.
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::InitiateBackups => "initiate-backups",
            Phase::SaveTrackerArtifact => "save-tracker-artifact",
            Phase::SaveWikiArtifact => "save-wiki-artifact",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::InitiateBackups => write!(f, "INITIATE_BACKUPS"),
            Phase::SaveTrackerArtifact => write!(f, "SAVE_TRACKER_ARTIFACT"),
            Phase::SaveWikiArtifact => write!(f, "SAVE_WIKI_ARTIFACT"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPhase(pub String);

impl fmt::Display for UnknownPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown phase `{}`", self.0)
    }
}

impl std::error::Error for UnknownPhase {}

impl FromStr for Phase {
    type Err = UnknownPhase;

    /// Accepts the current names plus the action names written by older
    /// deployments, which ran the two initiations as separate steps.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "initiate-backups" | "init-backup" | "init-confluence-backup" => {
                Ok(Phase::InitiateBackups)
            }
            "save-tracker-artifact" | "save-jira-backup" => Ok(Phase::SaveTrackerArtifact),
            "save-wiki-artifact" | "save-confluence-backup" => Ok(Phase::SaveWikiArtifact),
            other => Err(UnknownPhase(other.to_string())),
        }
    }
}

/// Outcome of the most recent attempt of the current phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseResult {
    Succeeded,
    Failed,
    #[default]
    Pending,
}

impl fmt::Display for PhaseResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhaseResult::Succeeded => write!(f, "SUCCEEDED"),
            PhaseResult::Failed => write!(f, "FAILED"),
            PhaseResult::Pending => write!(f, "PENDING"),
        }
    }
}

impl FromStr for PhaseResult {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "succeeded" | "ok" => Ok(PhaseResult::Succeeded),
            "failed" => Ok(PhaseResult::Failed),
            "pending" | "" => Ok(PhaseResult::Pending),
            other => Err(format!("unknown phase result `{other}`")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_wraps_around() {
        assert_eq!(Phase::InitiateBackups.next(), Phase::SaveTrackerArtifact);
        assert_eq!(Phase::SaveTrackerArtifact.next(), Phase::SaveWikiArtifact);
        assert_eq!(Phase::SaveWikiArtifact.next(), Phase::InitiateBackups);
    }

    #[test]
    fn three_steps_return_to_start() {
        for phase in Phase::ALL {
            assert_eq!(phase.next().next().next(), phase);
        }
    }

    #[test]
    fn parses_current_and_legacy_names() {
        for phase in Phase::ALL {
            assert_eq!(phase.as_str().parse::<Phase>().unwrap(), phase);
        }
        assert_eq!("init-backup".parse::<Phase>().unwrap(), Phase::InitiateBackups);
        assert_eq!(
            "init-confluence-backup".parse::<Phase>().unwrap(),
            Phase::InitiateBackups
        );
        assert_eq!(
            "save-jira-backup".parse::<Phase>().unwrap(),
            Phase::SaveTrackerArtifact
        );
        assert_eq!(
            "save-confluence-backup".parse::<Phase>().unwrap(),
            Phase::SaveWikiArtifact
        );
    }

    #[test]
    fn rejects_unknown_phase() {
        let err = "push-state".parse::<Phase>().unwrap_err();
        assert_eq!(err.to_string(), "unknown phase `push-state`");
        assert!("".parse::<Phase>().is_err());
    }

    #[test]
    fn serde_uses_record_names() {
        let json = serde_json::to_string(&Phase::SaveWikiArtifact).unwrap();
        assert_eq!(json, r#""save-wiki-artifact""#);
    }

    #[test]
    fn result_parses_legacy_values() {
        assert_eq!("OK".parse::<PhaseResult>().unwrap(), PhaseResult::Succeeded);
        assert_eq!("failed".parse::<PhaseResult>().unwrap(), PhaseResult::Failed);
        assert_eq!("".parse::<PhaseResult>().unwrap(), PhaseResult::Pending);
        assert!("waiting".parse::<PhaseResult>().is_err());
    }

    #[test]
    fn phase_display() {
        assert_eq!(Phase::InitiateBackups.to_string(), "INITIATE_BACKUPS");
        assert_eq!(Phase::SaveTrackerArtifact.to_string(), "SAVE_TRACKER_ARTIFACT");
        assert_eq!(Phase::SaveWikiArtifact.to_string(), "SAVE_WIKI_ARTIFACT");
        assert_eq!(PhaseResult::Failed.to_string(), "FAILED");
    }
}
