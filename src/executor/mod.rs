//! Phase executors: the work behind each step of the backup cycle.

pub mod initiate;
pub mod poller;
pub mod save;
pub mod transfer;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use object_store::ObjectStore;

use crate::config::{BackupConfig, ExportOptions};
use crate::error::BackupError;
use crate::remote::client::http_client;
use crate::remote::{ApiClient, System, TrackerClient, WikiClient};
use crate::state_machine::Phase;

pub use poller::{ProgressCheck, ProgressSource, Readiness};
pub use transfer::{ArtifactTransfer, artifact_key};

/// Inputs an executor gets from the orchestrator.
#[derive(Debug, Clone, Copy)]
pub struct PhaseContext<'a> {
    /// Invocation time; artifact keys are stamped with it.
    pub now: DateTime<Utc>,
    /// Task handle recorded by the previous attempt.
    pub task_handle: Option<&'a str>,
}

/// What a successful phase produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhaseReport {
    pub task_handle: Option<String>,
    pub artifact_key: Option<String>,
}

/// Runs one phase of the cycle.
#[allow(async_fn_in_trait)]
pub trait PhaseExecutor {
    async fn execute(&self, phase: Phase, ctx: &PhaseContext<'_>) -> Result<PhaseReport, BackupError>;
}

/// Executor backed by the real vendor APIs and blob store.
#[derive(Debug, Clone)]
pub struct BackupExecutor {
    tracker: TrackerClient,
    wiki: WikiClient,
    transfer: ArtifactTransfer,
    export: ExportOptions,
    tracker_prefix: String,
    wiki_prefix: String,
}

impl BackupExecutor {
    pub fn from_config(config: &BackupConfig, store: Arc<dyn ObjectStore>) -> Result<Self, BackupError> {
        let base_url = config.api_base_url()?;
        let http = http_client().map_err(|e| BackupError::Config(format!("HTTP client: {e}")))?;
        let api = |system| ApiClient::new(system, http.clone(), &base_url, &config.email, &config.api_token);

        Ok(Self {
            tracker: TrackerClient::new(api(System::Tracker)),
            wiki: WikiClient::new(api(System::Wiki)),
            transfer: ArtifactTransfer::new(store),
            export: config.export.clone(),
            tracker_prefix: config.storage.tracker_prefix.clone(),
            wiki_prefix: config.storage.wiki_prefix.clone(),
        })
    }
}

impl PhaseExecutor for BackupExecutor {
    async fn execute(&self, phase: Phase, ctx: &PhaseContext<'_>) -> Result<PhaseReport, BackupError> {
        match phase {
            Phase::InitiateBackups => {
                initiate::initiate_backups(&self.tracker, &self.wiki, &self.export).await
            }
            Phase::SaveTrackerArtifact => {
                save::save_artifact(&self.tracker, &self.transfer, &self.tracker_prefix, ctx).await
            }
            Phase::SaveWikiArtifact => {
                save::save_artifact(&self.wiki, &self.transfer, &self.wiki_prefix, ctx).await
            }
        }
    }
}
