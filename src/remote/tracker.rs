use reqwest::{Method, Response};
use serde_json::Value;
use tracing::debug;

use super::client::ApiClient;
use super::error::ApiError;
use super::types::{TrackerExportRequest, TrackerProgress};
use crate::config::ExportOptions;

const START_EXPORT: &str = "/rest/backup/1/export/runbackup";
const LATEST_TASK: &str = "/rest/backup/1/export/lastTaskId";
const PROGRESS: &str = "/rest/backup/1/export/getProgress";
const DOWNLOAD: &str = "/plugins/servlet/";

/// Marker the tracker puts in a 2xx body when it refuses to start an export.
const ERROR_MARKER: &str = "\"error\"";

/// Export job accepted by the tracker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartedExport {
    /// Task id of the new job, when the tracker reports one.
    pub task_handle: Option<String>,
}

/// Client for the issue tracker's backup endpoints.
#[derive(Debug, Clone)]
pub struct TrackerClient {
    api: ApiClient,
}

impl TrackerClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Ask the tracker to begin a background export.
    pub async fn start_export(&self, options: &ExportOptions) -> Result<StartedExport, ApiError> {
        let body = TrackerExportRequest {
            cb_attachments: options.include_attachments,
            export_to_cloud: options.export_to_cloud,
        };
        let request = self.api.request(Method::POST, START_EXPORT).json(&body);
        let text = self.api.send_text(request).await?;

        if text.contains(ERROR_MARKER) {
            return Err(ApiError::Vendor {
                system: self.api.system(),
                body: text,
            });
        }

        let task_handle = serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|v| v.get("taskId").cloned())
            .and_then(|id| match id {
                Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            });
        debug!(?task_handle, "tracker export started");

        Ok(StartedExport { task_handle })
    }

    /// Id of the most recent export job.
    pub async fn latest_task_id(&self) -> Result<String, ApiError> {
        let text = self
            .api
            .send_text(self.api.request(Method::GET, LATEST_TASK))
            .await?;
        let id = text.trim().trim_matches('"').to_string();
        if id.is_empty() {
            return Err(self.api.malformed("empty task id"));
        }
        Ok(id)
    }

    pub async fn progress(&self, task_id: &str) -> Result<TrackerProgress, ApiError> {
        let request = self
            .api
            .request(Method::GET, PROGRESS)
            .query(&[("taskId", task_id)]);
        self.api.send_json(request).await
    }

    /// Open a download of a finished export, given its relative result path.
    pub async fn download(&self, result_path: &str) -> Result<Response, ApiError> {
        let path = format!("{DOWNLOAD}{}", result_path.trim_start_matches('/'));
        self.api.send(self.api.request(Method::GET, &path)).await
    }
}
