use std::fmt;

use thiserror::Error;

use crate::remote::{ApiError, System};
use crate::state_machine::Phase;

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("Config error: {0}")]
    Config(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    /// Every failed start-export request of one initiation attempt.
    #[error("backup initiation failed: {}", join(.0))]
    Initiation(Vec<ApiError>),

    #[error("{system} export not ready: {detail}")]
    NotReady {
        system: System,
        detail: String,
        task_handle: Option<String>,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] object_store::Error),

    #[error("state record at {key} is corrupt: {source}")]
    CorruptState {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no free artifact key left for {0}")]
    KeyExhausted(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

fn join(errors: &[ApiError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl BackupError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BackupError::Config(_) | BackupError::Toml(_) => ErrorKind::Config,
            BackupError::Api(e) if e.is_transport() => ErrorKind::Transport,
            BackupError::Api(_) => ErrorKind::Protocol,
            BackupError::Initiation(errors) if errors.iter().any(ApiError::is_transport) => {
                ErrorKind::Transport
            }
            BackupError::Initiation(_) => ErrorKind::Protocol,
            BackupError::NotReady { .. } => ErrorKind::NotReady,
            BackupError::Storage(_)
            | BackupError::CorruptState { .. }
            | BackupError::KeyExhausted(_)
            | BackupError::Io(_)
            | BackupError::Json(_) => ErrorKind::Storage,
        }
    }

    /// Task handle the failing attempt was working with, if any.
    pub fn task_handle(&self) -> Option<&str> {
        match self {
            BackupError::NotReady { task_handle, .. } => task_handle.as_deref(),
            _ => None,
        }
    }
}

/// Coarse classification of a failure, used for log severity and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network failure or timeout.
    Transport,
    /// Non-2xx status, vendor-reported error, or undecodable payload.
    Protocol,
    /// The export is still running; the next invocation retries.
    NotReady,
    /// Reading or writing the blob store.
    Storage,
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Transport => write!(f, "Transport"),
            ErrorKind::Protocol => write!(f, "Protocol"),
            ErrorKind::NotReady => write!(f, "NotReady"),
            ErrorKind::Storage => write!(f, "Storage"),
            ErrorKind::Config => write!(f, "Config"),
        }
    }
}

/// Failure of one invocation, as seen by whoever triggered it.
#[derive(Debug, Error)]
pub enum InvocationError {
    #[error("could not load workflow state: {0}")]
    StateLoad(#[source] BackupError),

    /// The phase failed and the failure was recorded.
    #[error("phase {phase} failed: {source}")]
    PhaseFailed {
        phase: Phase,
        #[source]
        source: BackupError,
    },

    /// The record could not be written. `phase_error` is the failure the
    /// record was meant to capture, if the phase itself failed.
    #[error("could not persist workflow state: {source}{}", phase_note(.phase_error))]
    Persistence {
        #[source]
        source: BackupError,
        phase_error: Option<BackupError>,
    },
}

fn phase_note(phase_error: &Option<BackupError>) -> String {
    match phase_error {
        Some(e) => format!(" (phase error: {e})"),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vendor(system: System) -> ApiError {
        ApiError::Vendor {
            system,
            body: "nope".into(),
        }
    }

    #[test]
    fn initiation_lists_every_failure() {
        let err = BackupError::Initiation(vec![vendor(System::Tracker), vendor(System::Wiki)]);
        assert_eq!(
            err.to_string(),
            "backup initiation failed: tracker reported an error: nope; wiki reported an error: nope"
        );
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[test]
    fn not_ready_carries_task_handle() {
        let err = BackupError::NotReady {
            system: System::Tracker,
            detail: "progress 40%".into(),
            task_handle: Some("10401".into()),
        };
        assert_eq!(err.to_string(), "tracker export not ready: progress 40%");
        assert_eq!(err.kind(), ErrorKind::NotReady);
        assert_eq!(err.task_handle(), Some("10401"));
    }

    #[test]
    fn api_errors_pass_through_unchanged() {
        let err = BackupError::from(ApiError::Status {
            system: System::Wiki,
            status: 500,
            message: "oops".into(),
        });
        assert_eq!(err.to_string(), "wiki returned status 500: oops");
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert_eq!(err.task_handle(), None);
    }

    #[test]
    fn phase_failure_display() {
        let err = InvocationError::PhaseFailed {
            phase: Phase::SaveWikiArtifact,
            source: BackupError::Config("x".into()),
        };
        assert_eq!(err.to_string(), "phase SAVE_WIKI_ARTIFACT failed: Config error: x");
    }

    #[test]
    fn persistence_failure_mentions_phase_error() {
        let err = InvocationError::Persistence {
            source: BackupError::Config("bucket gone".into()),
            phase_error: Some(BackupError::Config("boom".into())),
        };
        assert_eq!(
            err.to_string(),
            "could not persist workflow state: Config error: bucket gone (phase error: Config error: boom)"
        );

        let err = InvocationError::Persistence {
            source: BackupError::Config("bucket gone".into()),
            phase_error: None,
        };
        assert_eq!(err.to_string(), "could not persist workflow state: Config error: bucket gone");
    }

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::NotReady.to_string(), "NotReady");
        assert_eq!(ErrorKind::Transport.to_string(), "Transport");
    }
}
