//! Progress polling: ask a vendor how far its export has got and decide
//! whether it can be downloaded yet.

use reqwest::Response;
use tracing::{debug, warn};

use crate::remote::{ApiError, System, TrackerClient, TrackerProgress, WikiClient, WikiProgress};

/// Whether an export can be downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    /// Finished; `locator` identifies the artifact for the download call.
    Ready { locator: String },
    NotReady { detail: String },
}

/// Result of one progress check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressCheck {
    /// Handle of the job that was polled, for systems that have one.
    pub task_handle: Option<String>,
    pub readiness: Readiness,
}

/// A vendor system that produces a downloadable export.
#[allow(async_fn_in_trait)]
pub trait ProgressSource {
    fn system(&self) -> System;

    /// Check the export's progress. `known_handle` is a task handle recorded
    /// by an earlier invocation; sources that need one fetch it otherwise.
    async fn check(&self, known_handle: Option<&str>) -> Result<ProgressCheck, ApiError>;

    async fn download(&self, locator: &str) -> Result<Response, ApiError>;
}

/// The tracker is done when progress reaches exactly 100.
pub fn tracker_readiness(progress: &TrackerProgress) -> Result<Readiness, ApiError> {
    if progress.progress != 100 {
        return Ok(Readiness::NotReady {
            detail: format!("progress {}% ({})", progress.progress, progress.status),
        });
    }
    match progress.result.as_deref().map(str::trim) {
        Some(path) if !path.is_empty() => Ok(Readiness::Ready {
            locator: path.to_string(),
        }),
        _ => Err(ApiError::Malformed {
            system: System::Tracker,
            detail: "export reported complete without a download path".into(),
        }),
    }
}

/// The wiki is done when its percentage text is exactly `100%`.
pub fn wiki_readiness(progress: &WikiProgress) -> Result<Readiness, ApiError> {
    if progress.alternative_percentage.trim() != "100%" {
        return Ok(Readiness::NotReady {
            detail: format!(
                "progress {} ({})",
                display_or(&progress.alternative_percentage, "unknown"),
                display_or(&progress.current_status, "no status")
            ),
        });
    }
    if progress.is_outdated {
        warn!(file = %progress.file_name, "wiki reports the finished export as outdated");
    }
    let file_name = progress.file_name.trim();
    if file_name.is_empty() {
        return Err(ApiError::Malformed {
            system: System::Wiki,
            detail: "export reported complete without a file name".into(),
        });
    }
    Ok(Readiness::Ready {
        locator: file_name.to_string(),
    })
}

fn display_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() { fallback } else { value }
}

impl ProgressSource for TrackerClient {
    fn system(&self) -> System {
        System::Tracker
    }

    async fn check(&self, known_handle: Option<&str>) -> Result<ProgressCheck, ApiError> {
        let handle = match known_handle {
            Some(handle) => handle.to_string(),
            None => self.latest_task_id().await?,
        };
        let progress = self.progress(&handle).await?;
        debug!(task = %handle, progress = progress.progress, "tracker export progress");

        Ok(ProgressCheck {
            readiness: tracker_readiness(&progress)?,
            task_handle: Some(handle),
        })
    }

    async fn download(&self, locator: &str) -> Result<Response, ApiError> {
        TrackerClient::download(self, locator).await
    }
}

impl ProgressSource for WikiClient {
    fn system(&self) -> System {
        System::Wiki
    }

    async fn check(&self, _known_handle: Option<&str>) -> Result<ProgressCheck, ApiError> {
        let progress = self.progress().await?;
        debug!(progress = %progress.alternative_percentage, "wiki export progress");

        Ok(ProgressCheck {
            readiness: wiki_readiness(&progress)?,
            task_handle: None,
        })
    }

    async fn download(&self, locator: &str) -> Result<Response, ApiError> {
        WikiClient::download(self, locator).await
    }
}
