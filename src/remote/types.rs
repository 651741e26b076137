//! Wire types for the tracker and wiki backup endpoints.
//!
//! Progress payloads are decoded leniently: every field defaults, because
//! the vendors omit fields freely depending on the job's stage.

use serde::{Deserialize, Serialize};

/// Body of the tracker's start-export request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerExportRequest {
    pub cb_attachments: bool,
    pub export_to_cloud: bool,
}

/// Body of the wiki's start-export request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WikiExportRequest {
    pub cb_attachments: bool,
}

/// Progress of a tracker export job, polled by task id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackerProgress {
    pub status: String,
    pub description: String,
    pub message: String,
    /// Relative download path, present once the export has finished.
    pub result: Option<String>,
    /// Completion, 0 to 100.
    pub progress: i64,
    pub export_type: String,
}

/// Progress of the wiki's most recent export.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WikiProgress {
    pub file_name: String,
    pub size: i64,
    pub current_status: String,
    /// Completion as text, e.g. `"100%"`.
    pub alternative_percentage: String,
    pub concurrent_backup_in_progress: bool,
    pub time: i64,
    /// Set when the export on offer predates the latest backup request.
    pub is_outdated: bool,
}
