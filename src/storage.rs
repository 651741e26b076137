//! Blob storage for the workflow record and uploaded artifacts.
//!
//! Every backend goes through `object_store`, so the orchestrator and the
//! artifact transfer never branch on where bytes actually land.

use std::sync::Arc;

use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use tracing::debug;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::BackupError;
use crate::state_machine::WorkflowState;

const STATE_FILE_NAME: &str = "state.json";

/// Build the object store described by `config`.
///
/// S3 credentials come from the usual AWS environment variables.
pub fn build_object_store(config: &StorageConfig) -> Result<Arc<dyn ObjectStore>, BackupError> {
    match config.backend {
        StorageBackend::S3 => {
            let store = AmazonS3Builder::from_env()
                .with_bucket_name(config.bucket.trim())
                .with_region(config.region.trim())
                .build()
                .map_err(|e| BackupError::Config(format!("S3: {e}")))?;
            Ok(Arc::new(store))
        }
        StorageBackend::Local => {
            let root = config.local_root.as_ref().ok_or_else(|| {
                BackupError::Config("local storage needs a root directory".into())
            })?;
            std::fs::create_dir_all(root)?;
            let root = root.canonicalize()?;
            let store = LocalFileSystem::new_with_prefix(&root)
                .map_err(|e| BackupError::Config(format!("LocalFileSystem: {e}")))?;
            Ok(Arc::new(store))
        }
    }
}

/// Join a configured prefix and a name into an object key, ignoring stray
/// slashes on either side.
pub fn object_key(prefix: &str, name: &str) -> String {
    let prefix = prefix.trim().trim_matches('/');
    let name = name.trim_start_matches('/');
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}

/// Reads and writes the single workflow record.
#[derive(Debug, Clone)]
pub struct StateStore {
    store: Arc<dyn ObjectStore>,
    key: String,
}

impl StateStore {
    pub fn new(store: Arc<dyn ObjectStore>, prefix: &str) -> Self {
        Self {
            store,
            key: object_key(prefix, STATE_FILE_NAME),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Load the record. A record that was never written loads as the default.
    pub async fn load(&self) -> Result<WorkflowState, BackupError> {
        let location = ObjectPath::from(self.key.as_str());
        let bytes = match self.store.get(&location).await {
            Ok(result) => result.bytes().await?,
            Err(object_store::Error::NotFound { .. }) => {
                debug!(key = %self.key, "no workflow state yet, starting fresh");
                return Ok(WorkflowState::default());
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&bytes).map_err(|source| BackupError::CorruptState {
            key: self.key.clone(),
            source,
        })
    }

    pub async fn save(&self, state: &WorkflowState) -> Result<(), BackupError> {
        let body = serde_json::to_vec(state)?;
        self.store
            .put(&ObjectPath::from(self.key.as_str()), PutPayload::from(body))
            .await?;
        debug!(key = %self.key, "workflow state saved");
        Ok(())
    }
}
