use reqwest::{Method, Response};

use super::client::ApiClient;
use super::error::ApiError;
use super::types::{WikiExportRequest, WikiProgress};
use crate::config::ExportOptions;

const START_EXPORT: &str = "/wiki/rest/obm/1.0/runbackup";
const PROGRESS: &str = "/wiki/rest/obm/1.0/getprogress.json";
const DOWNLOAD: &str = "/wiki/download/";

/// The wiki answers a refused start-export with a message about the backup;
/// a started export has an empty body.
const ERROR_MARKER: &str = "backup";

/// Client for the wiki's backup endpoints.
#[derive(Debug, Clone)]
pub struct WikiClient {
    api: ApiClient,
}

impl WikiClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Ask the wiki to begin a background export.
    pub async fn start_export(&self, options: &ExportOptions) -> Result<(), ApiError> {
        let body = WikiExportRequest {
            cb_attachments: options.include_attachments,
        };
        let request = self
            .api
            .request(Method::POST, START_EXPORT)
            .header("X-Atlassian-Token", "no-check")
            .header("X-Requested-With", "XMLHttpRequest")
            .json(&body);
        let text = self.api.send_text(request).await?;

        if text.contains(ERROR_MARKER) {
            return Err(ApiError::Vendor {
                system: self.api.system(),
                body: text,
            });
        }
        Ok(())
    }

    /// Progress of the most recent export. The wiki tracks a single export
    /// at a time, so there is no task handle.
    pub async fn progress(&self) -> Result<WikiProgress, ApiError> {
        self.api
            .send_json(self.api.request(Method::GET, PROGRESS))
            .await
    }

    pub async fn download(&self, file_name: &str) -> Result<Response, ApiError> {
        let path = format!("{DOWNLOAD}{}", file_name.trim_start_matches('/'));
        self.api.send(self.api.request(Method::GET, &path)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::System;
    use crate::remote::client::http_client;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn wiki(server: &MockServer) -> WikiClient {
        WikiClient::new(ApiClient::new(
            System::Wiki,
            http_client().unwrap(),
            &server.uri(),
            "ops@example.com",
            "token",
        ))
    }

    #[tokio::test]
    async fn start_export_sends_csrf_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(START_EXPORT))
            .and(header("X-Atlassian-Token", "no-check"))
            .and(header("X-Requested-With", "XMLHttpRequest"))
            .and(body_json(serde_json::json!({"cbAttachments": true})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let options = ExportOptions {
            include_attachments: true,
            export_to_cloud: true,
        };
        wiki(&server).start_export(&options).await.unwrap();
    }

    #[tokio::test]
    async fn refused_export_is_vendor_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(START_EXPORT))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("Cannot start a new backup, one is already in progress"),
            )
            .mount(&server)
            .await;

        let err = wiki(&server)
            .start_export(&ExportOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Vendor { system: System::Wiki, .. }));
    }

    #[tokio::test]
    async fn progress_decodes_percentage() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(PROGRESS))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "fileName": "temp/backup.zip",
                "alternativePercentage": "45%",
                "isOutdated": false
            })))
            .mount(&server)
            .await;

        let progress = wiki(&server).progress().await.unwrap();
        assert_eq!(progress.alternative_percentage, "45%");
        assert_eq!(progress.file_name, "temp/backup.zip");
    }

    #[tokio::test]
    async fn download_by_file_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wiki/download/temp/backup.zip"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"zipdata".to_vec()))
            .mount(&server)
            .await;

        let response = wiki(&server).download("temp/backup.zip").await.unwrap();
        assert_eq!(response.text().await.unwrap(), "zipdata");
    }

    #[tokio::test]
    async fn missing_download_is_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wiki/download/gone.zip"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = wiki(&server).download("gone.zip").await.unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 404, .. }));
    }
}
