use tracing::{info, warn};

use super::PhaseReport;
use crate::config::ExportOptions;
use crate::error::BackupError;
use crate::remote::{TrackerClient, WikiClient};

/// Start background exports on both systems.
///
/// The two requests run concurrently and both outcomes are collected before
/// anything is decided, so a double failure produces one error listing both
/// causes.
pub async fn initiate_backups(
    tracker: &TrackerClient,
    wiki: &WikiClient,
    options: &ExportOptions,
) -> Result<PhaseReport, BackupError> {
    let (tracker_result, wiki_result) =
        tokio::join!(tracker.start_export(options), wiki.start_export(options));

    let mut failures = Vec::new();
    let mut task_handle = None;

    match tracker_result {
        Ok(started) => {
            info!(task = ?started.task_handle, "tracker export initiated");
            task_handle = started.task_handle;
        }
        Err(e) => {
            warn!(error = %e, "tracker export could not be initiated");
            failures.push(e);
        }
    }
    match wiki_result {
        Ok(()) => info!("wiki export initiated"),
        Err(e) => {
            warn!(error = %e, "wiki export could not be initiated");
            failures.push(e);
        }
    }

    if !failures.is_empty() {
        return Err(BackupError::Initiation(failures));
    }
    Ok(PhaseReport {
        task_handle,
        artifact_key: None,
    })
}
