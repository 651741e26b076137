use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response};

use super::System;
use super::error::ApiError;

/// Authenticated HTTP access to one vendor system on the shared site.
#[derive(Debug, Clone)]
pub struct ApiClient {
    system: System,
    client: Client,
    base_url: String,
    email: String,
    api_token: String,
}

/// Builds the underlying HTTP client shared by both vendor systems.
///
/// Only the connect phase is bounded: export downloads can run for a long
/// time and are left to the scheduler's own timeout.
pub fn http_client() -> reqwest::Result<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()
}

impl ApiClient {
    pub fn new(system: System, client: Client, base_url: &str, email: &str, api_token: &str) -> Self {
        Self {
            system,
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            email: email.to_string(),
            api_token: api_token.to_string(),
        }
    }

    pub fn system(&self) -> System {
        self.system
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Start a request with basic auth and a JSON content type applied.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, self.url(path))
            .basic_auth(&self.email, Some(&self.api_token))
            .header("content-type", "application/json")
    }

    /// Send a request, turning transport failures and non-2xx statuses into
    /// [`ApiError`]s.
    pub async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await.map_err(|source| self.network(source))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(ApiError::Status {
                system: self.system,
                status: status.as_u16(),
                message: message.trim().to_string(),
            });
        }

        Ok(response)
    }

    /// Send a request and read the whole body as text.
    pub async fn send_text(&self, request: RequestBuilder) -> Result<String, ApiError> {
        let response = self.send(request).await?;
        response.text().await.map_err(|source| self.network(source))
    }

    /// Send a request and decode the body as JSON.
    pub async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        let body = self.send_text(request).await?;
        serde_json::from_str(&body).map_err(|e| self.malformed(format!("{e}: {body}")))
    }

    pub fn network(&self, source: reqwest::Error) -> ApiError {
        ApiError::Network {
            system: self.system,
            source,
        }
    }

    pub fn malformed(&self, detail: impl Into<String>) -> ApiError {
        ApiError::Malformed {
            system: self.system,
            detail: detail.into(),
        }
    }
}
