//! Remote PDF-to-images conversion
//!
//! The remote service works in five steps, each a separate request:
//! token -> task -> upload (by URL) -> process -> download. The download is a
//! zip of JPEG pages which [`archive::extract_images`] turns into data URIs.
//! [`convert_pdf_to_images`] runs the whole sequence and tags any failure
//! with the step that produced it.

pub mod archive;
pub mod http;

pub use archive::{JPEG_DATA_URI_PREFIX, decode_image, encode_image};
pub use http::HttpConversionClient;

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Unpacked-size cap for clients that do not configure one (200 MiB)
pub const DEFAULT_MAX_EXTRACTED_BYTES: u64 = 200 * 1024 * 1024;

/// Failure of a single request against the conversion service
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Connection timeout")]
    Timeout,

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Download of {size} bytes exceeds limit of {limit} bytes")]
    TooLarge { size: u64, limit: u64 },

    #[error("Invalid archive: {0}")]
    Archive(String),

    #[error("Archive contains no page images")]
    NoImages,

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),
}

/// Step of the conversion protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionStep {
    GetToken,
    CreateTask,
    AddFile,
    ProcessTask,
    DownloadTask,
    ExtractImages,
}

impl ConversionStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversionStep::GetToken => "get_token",
            ConversionStep::CreateTask => "create_task",
            ConversionStep::AddFile => "add_file",
            ConversionStep::ProcessTask => "process_task",
            ConversionStep::DownloadTask => "download_task",
            ConversionStep::ExtractImages => "extract_images",
        }
    }

    fn wrap(self) -> impl FnOnce(RemoteError) -> ConversionError {
        move |source| ConversionError { step: self, source }
    }
}

impl fmt::Display for ConversionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("{step} failed: {source}")]
pub struct ConversionError {
    pub step: ConversionStep,
    #[source]
    pub source: RemoteError,
}

pub type Result<T> = std::result::Result<T, ConversionError>;

/// Remote task handle returned by [`ConversionClient::create_task`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTask {
    pub task_id: String,
    /// Host assigned to this task; later steps must target it
    pub server: String,
}

/// Client for the external conversion service.
///
/// Calls are not cancellation-aware; once issued they run to completion or
/// to the client's own timeout.
#[async_trait]
pub trait ConversionClient: Send + Sync {
    async fn get_token(&self) -> std::result::Result<String, RemoteError>;

    async fn create_task(&self, token: &str) -> std::result::Result<RemoteTask, RemoteError>;

    /// Registers the PDF by URL; returns the server-side filename
    async fn add_file(
        &self,
        token: &str,
        task_id: &str,
        pdf_url: &str,
        server: &str,
    ) -> std::result::Result<String, RemoteError>;

    async fn process_task(
        &self,
        token: &str,
        task_id: &str,
        server_filename: &str,
        server: &str,
    ) -> std::result::Result<(), RemoteError>;

    async fn download_task(
        &self,
        token: &str,
        task_id: &str,
        server: &str,
    ) -> std::result::Result<Bytes, RemoteError>;

    /// Upper bound on the unpacked size of all pages of one document
    fn max_extracted_bytes(&self) -> u64 {
        DEFAULT_MAX_EXTRACTED_BYTES
    }

    fn extract_images_from_zip(&self, zip: &[u8]) -> std::result::Result<Vec<String>, RemoteError> {
        archive::extract_images(zip, self.max_extracted_bytes())
    }
}

/// Run the full conversion protocol for one PDF.
///
/// Returns one encoded image per rendered page; page number is position + 1.
pub async fn convert_pdf_to_images(
    client: &dyn ConversionClient,
    pdf_url: &str,
) -> Result<Vec<String>> {
    let token = client
        .get_token()
        .await
        .map_err(ConversionStep::GetToken.wrap())?;

    let task = client
        .create_task(&token)
        .await
        .map_err(ConversionStep::CreateTask.wrap())?;
    debug!(task_id = %task.task_id, server = %task.server, "Conversion task created");

    let server_filename = client
        .add_file(&token, &task.task_id, pdf_url, &task.server)
        .await
        .map_err(ConversionStep::AddFile.wrap())?;

    client
        .process_task(&token, &task.task_id, &server_filename, &task.server)
        .await
        .map_err(ConversionStep::ProcessTask.wrap())?;

    let archive = client
        .download_task(&token, &task.task_id, &task.server)
        .await
        .map_err(ConversionStep::DownloadTask.wrap())?;
    debug!(task_id = %task.task_id, size = archive.len(), "Conversion result downloaded");

    client
        .extract_images_from_zip(&archive)
        .map_err(ConversionStep::ExtractImages.wrap())
}
