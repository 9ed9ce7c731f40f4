//! reqwest-based client for the remote conversion API

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

use super::{ConversionClient, RemoteError, RemoteTask};
use crate::config::ConversionConfig;

#[derive(Deserialize)]
struct AuthResponse {
    token: String,
}

#[derive(Deserialize)]
struct StartResponse {
    server: String,
    task: String,
}

#[derive(Deserialize)]
struct UploadResponse {
    server_filename: String,
}

/// HTTP implementation of [`ConversionClient`]
pub struct HttpConversionClient {
    client: Client,
    base_url: String,
    tool: String,
    public_key: Option<String>,
    max_download_bytes: u64,
}

impl HttpConversionClient {
    pub fn new(config: &ConversionConfig) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("lessonpdf/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RemoteError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            tool: config.tool.clone(),
            public_key: config.public_key.clone(),
            max_download_bytes: config.max_download_bytes.as_u64(),
        })
    }

    /// Task servers are returned as bare hosts; tests and proxies may pass a full URL
    fn server_url(server: &str, path: &str) -> String {
        let server = server.trim_end_matches('/');
        if server.contains("://") {
            format!("{server}{path}")
        } else {
            format!("https://{server}{path}")
        }
    }

    async fn send(request: RequestBuilder) -> Result<Response, RemoteError> {
        let response = request.send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Conversion service returned an error");
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body: truncate(&body, 512),
            });
        }

        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, RemoteError> {
        Self::send(request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl ConversionClient for HttpConversionClient {
    async fn get_token(&self) -> Result<String, RemoteError> {
        let public_key = self
            .public_key
            .as_deref()
            .ok_or_else(|| RemoteError::MissingCredentials("CONVERSION_PUBLIC_KEY".into()))?;

        let url = format!("{}/v1/auth", self.base_url);
        let auth: AuthResponse =
            Self::send_json(self.client.post(&url).json(&json!({ "public_key": public_key })))
                .await?;

        debug!("Conversion token acquired");
        Ok(auth.token)
    }

    async fn create_task(&self, token: &str) -> Result<RemoteTask, RemoteError> {
        let url = format!("{}/v1/start/{}", self.base_url, self.tool);
        let start: StartResponse = Self::send_json(self.client.get(&url).bearer_auth(token)).await?;

        Ok(RemoteTask {
            task_id: start.task,
            server: start.server,
        })
    }

    async fn add_file(
        &self,
        token: &str,
        task_id: &str,
        pdf_url: &str,
        server: &str,
    ) -> Result<String, RemoteError> {
        let url = Self::server_url(server, "/v1/upload");
        let body = json!({ "task": task_id, "cloud_file": pdf_url });
        let upload: UploadResponse =
            Self::send_json(self.client.post(&url).bearer_auth(token).json(&body)).await?;

        debug!(task_id, server_filename = %upload.server_filename, "PDF registered");
        Ok(upload.server_filename)
    }

    async fn process_task(
        &self,
        token: &str,
        task_id: &str,
        server_filename: &str,
        server: &str,
    ) -> Result<(), RemoteError> {
        let url = Self::server_url(server, "/v1/process");
        let body = json!({
            "task": task_id,
            "tool": self.tool,
            "pdfjpg_mode": "pages",
            "files": [{ "server_filename": server_filename, "filename": "lesson.pdf" }],
        });
        Self::send(self.client.post(&url).bearer_auth(token).json(&body)).await?;

        debug!(task_id, "Conversion task processed");
        Ok(())
    }

    fn max_extracted_bytes(&self) -> u64 {
        self.max_download_bytes
    }

    async fn download_task(
        &self,
        token: &str,
        task_id: &str,
        server: &str,
    ) -> Result<Bytes, RemoteError> {
        let url = Self::server_url(server, &format!("/v1/download/{task_id}"));
        let mut response = Self::send(self.client.get(&url).bearer_auth(token)).await?;

        if let Some(size) = response.content_length() {
            if size > self.max_download_bytes {
                return Err(RemoteError::TooLarge {
                    size,
                    limit: self.max_download_bytes,
                });
            }
        }

        // Content-Length is optional; enforce the limit while streaming too.
        let mut body = BytesMut::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| RemoteError::RequestFailed(format!("Failed to read body: {}", e)))?
        {
            let size = (body.len() + chunk.len()) as u64;
            if size > self.max_download_bytes {
                warn!(task_id, size, limit = self.max_download_bytes, "Download aborted at size limit");
                return Err(RemoteError::TooLarge {
                    size,
                    limit: self.max_download_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(body.freeze())
    }
}

fn map_reqwest_error(e: reqwest::Error) -> RemoteError {
    if e.is_timeout() {
        RemoteError::Timeout
    } else {
        RemoteError::RequestFailed(e.to_string())
    }
}

fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
