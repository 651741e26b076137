use tracing::info;

use super::poller::{ProgressSource, Readiness};
use super::transfer::ArtifactTransfer;
use super::{PhaseContext, PhaseReport};
use crate::error::BackupError;

/// Locate a finished export on `source` and copy it into storage under
/// `prefix`.
///
/// An export that is still running fails the phase with
/// [`BackupError::NotReady`]; a later invocation tries again.
pub async fn save_artifact<S: ProgressSource>(
    source: &S,
    transfer: &ArtifactTransfer,
    prefix: &str,
    ctx: &PhaseContext<'_>,
) -> Result<PhaseReport, BackupError> {
    let system = source.system();
    let check = source.check(ctx.task_handle).await?;

    let locator = match check.readiness {
        Readiness::Ready { locator } => locator,
        Readiness::NotReady { detail } => {
            return Err(BackupError::NotReady {
                system,
                detail,
                task_handle: check.task_handle,
            });
        }
    };

    info!(%system, %locator, "export finished, downloading");
    let response = source.download(&locator).await?;
    let key = transfer.store(prefix, system, ctx.now, response).await?;

    Ok(PhaseReport {
        task_handle: check.task_handle,
        artifact_key: Some(key),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::client::http_client;
    use crate::remote::{ApiClient, ApiError, System, TrackerClient, WikiClient};
    use chrono::{DateTime, TimeZone, Utc};
    use object_store::ObjectStore;
    use object_store::memory::InMemory;
    use object_store::path::Path as ObjectPath;
    use std::sync::Arc;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 9, 30, 0).unwrap()
    }

    fn api(system: System, server: &MockServer) -> ApiClient {
        ApiClient::new(system, http_client().unwrap(), &server.uri(), "e", "t")
    }

    async fn mount_get(server: &MockServer, route: &str, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(response)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn tracker_fetches_handle_then_saves() {
        let server = MockServer::start().await;
        mount_get(
            &server,
            "/rest/backup/1/export/lastTaskId",
            ResponseTemplate::new(200).set_body_string("10401"),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/rest/backup/1/export/getProgress"))
            .and(query_param("taskId", "10401"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "Success",
                "progress": 100,
                "result": "export/download/?fileId=abc"
            })))
            .mount(&server)
            .await;
        mount_get(
            &server,
            "/plugins/servlet/export/download/",
            ResponseTemplate::new(200).set_body_bytes(b"tracker-zip".to_vec()),
        )
        .await;

        let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());
        let transfer = ArtifactTransfer::new(store.clone());
        let tracker = TrackerClient::new(api(System::Tracker, &server));
        let ctx = PhaseContext { now: now(), task_handle: None };

        let report = save_artifact(&tracker, &transfer, "tracker", &ctx).await.unwrap();
        assert_eq!(report.task_handle.as_deref(), Some("10401"));
        let key = report.artifact_key.unwrap();
        assert_eq!(key, "tracker/tracker-backup-2026-06-01T09:30:00Z.zip");

        let stored = store.get(&ObjectPath::from(key.as_str())).await.unwrap().bytes().await.unwrap();
        assert_eq!(&stored[..], b"tracker-zip");
    }

    #[tokio::test]
    async fn tracker_resumes_recorded_handle() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/backup/1/export/lastTaskId"))
            .respond_with(ResponseTemplate::new(200).set_body_string("other"))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/backup/1/export/getProgress"))
            .and(query_param("taskId", "555"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "InProgress",
                "progress": 70
            })))
            .expect(1)
            .mount(&server)
            .await;

        let transfer = ArtifactTransfer::new(Arc::new(InMemory::new()));
        let tracker = TrackerClient::new(api(System::Tracker, &server));
        let ctx = PhaseContext { now: now(), task_handle: Some("555") };

        let err = save_artifact(&tracker, &transfer, "tracker", &ctx).await.unwrap_err();
        match err {
            BackupError::NotReady { system, task_handle, .. } => {
                assert_eq!(system, System::Tracker);
                assert_eq!(task_handle.as_deref(), Some("555"));
            }
            other => panic!("expected NotReady, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn wiki_not_ready_stores_nothing() {
        let server = MockServer::start().await;
        mount_get(
            &server,
            "/wiki/rest/obm/1.0/getprogress.json",
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "alternativePercentage": "85%",
                "currentStatus": "Exporting pages",
                "fileName": ""
            })),
        )
        .await;

        let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());
        let transfer = ArtifactTransfer::new(store.clone());
        let wiki = WikiClient::new(api(System::Wiki, &server));
        let ctx = PhaseContext { now: now(), task_handle: None };

        let err = save_artifact(&wiki, &transfer, "wiki", &ctx).await.unwrap_err();
        assert_eq!(err.to_string(), "wiki export not ready: progress 85% (Exporting pages)");
        let key = ObjectPath::from("wiki/wiki-backup-2026-06-01T09:30:00Z.zip");
        assert!(store.head(&key).await.is_err());
    }

    #[tokio::test]
    async fn failed_download_fails_the_phase() {
        let server = MockServer::start().await;
        mount_get(
            &server,
            "/wiki/rest/obm/1.0/getprogress.json",
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "alternativePercentage": "100%",
                "fileName": "backup.zip"
            })),
        )
        .await;
        mount_get(&server, "/wiki/download/backup.zip", ResponseTemplate::new(403)).await;

        let transfer = ArtifactTransfer::new(Arc::new(InMemory::new()));
        let wiki = WikiClient::new(api(System::Wiki, &server));
        let ctx = PhaseContext { now: now(), task_handle: None };

        let err = save_artifact(&wiki, &transfer, "wiki", &ctx).await.unwrap_err();
        assert!(matches!(
            err,
            BackupError::Api(ApiError::Status { system: System::Wiki, status: 403, .. })
        ));
    }
}
