//! Streams a finished export into the blob store.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, WriteMultipart};
use reqwest::Response;
use tracing::{info, warn};

use crate::error::BackupError;
use crate::remote::{ApiError, System};
use crate::storage::object_key;

/// Upload parts kept in flight before the download is paused.
const MAX_IN_FLIGHT_PARTS: usize = 4;

/// Multipart part size; S3 rejects non-final parts below 5 MiB.
const DEFAULT_PART_SIZE: usize = 5 * 1024 * 1024;

/// Numbered variants tried when the timestamped key is already taken.
const MAX_KEY_ATTEMPTS: u32 = 100;

/// Storage key for an artifact of `system` taken at `at`:
/// `<prefix>/<type>-backup-<RFC 3339>.zip`.
pub fn artifact_key(prefix: &str, system: System, at: DateTime<Utc>) -> String {
    let stamp = at.to_rfc3339_opts(SecondsFormat::Secs, true);
    object_key(prefix, &format!("{}-backup-{stamp}.zip", system.artifact_type()))
}

#[derive(Debug, Clone)]
pub struct ArtifactTransfer {
    store: Arc<dyn ObjectStore>,
    part_size: usize,
}

impl ArtifactTransfer {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            part_size: DEFAULT_PART_SIZE,
        }
    }

    /// Upload in parts of `part_size` bytes instead of the default.
    pub fn with_part_size(mut self, part_size: usize) -> Self {
        self.part_size = part_size.max(1);
        self
    }

    /// Stream `response`'s body into storage and return the key it was
    /// written under.
    ///
    /// Two saves of the same type within one second get distinct keys: the
    /// second one carries a `-2` suffix, and so on.
    pub async fn store(
        &self,
        prefix: &str,
        system: System,
        at: DateTime<Utc>,
        mut response: Response,
    ) -> Result<String, BackupError> {
        let location = self.unused_location(&artifact_key(prefix, system, at)).await?;

        let upload = self.store.put_multipart(&location).await?;
        let mut writer = WriteMultipart::new_with_chunk_size(upload, self.part_size);
        let mut written: u64 = 0;

        // A failed read or a rejected part aborts the open upload.
        loop {
            let chunk = match response.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(source) => {
                    abort_upload(&location, writer).await;
                    return Err(ApiError::Network { system, source }.into());
                }
            };
            writer.write(&chunk);
            written += chunk.len() as u64;
            if let Err(e) = writer.wait_for_capacity(MAX_IN_FLIGHT_PARTS).await {
                abort_upload(&location, writer).await;
                return Err(e.into());
            }
        }
        writer.finish().await?;

        info!(%system, key = %location, bytes = written, "artifact stored");
        Ok(location.to_string())
    }

    async fn unused_location(&self, key: &str) -> Result<ObjectPath, BackupError> {
        let stem = key.strip_suffix(".zip").unwrap_or(key);
        for attempt in 1..=MAX_KEY_ATTEMPTS {
            let candidate = if attempt == 1 {
                key.to_string()
            } else {
                format!("{stem}-{attempt}.zip")
            };
            let location = ObjectPath::from(candidate.as_str());
            match self.store.head(&location).await {
                Err(object_store::Error::NotFound { .. }) => return Ok(location),
                Ok(_) => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(BackupError::KeyExhausted(key.to_string()))
    }
}

async fn abort_upload(location: &ObjectPath, writer: WriteMultipart) {
    if let Err(e) = writer.abort().await {
        warn!(key = %location, error = %e, "could not abort partial upload");
    }
}
