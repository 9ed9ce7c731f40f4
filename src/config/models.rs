use crate::humanize::ByteSize;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub conversion: ConversionConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    /// Fjall keyspace holding lessons, assets and pages
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            data_path: default_data_path(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_data_path() -> PathBuf {
    PathBuf::from("data/lessonpdf")
}

/// Storage provider type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageProvider {
    #[default]
    Memory,
    Local,
    S3,
}

/// Object storage configuration for rendered pages
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub provider: StorageProvider,
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// Root directory for the local provider
    pub root: Option<PathBuf>,
    pub endpoint: Option<String>,
    pub region: Option<String>,
    /// Prefix for returned page URLs; `s3://{bucket}` when unset
    pub public_base_url: Option<String>,
    /// S3 access key (loaded from environment, not from config file)
    #[serde(skip)]
    pub access_key: Option<String>,
    /// S3 secret key (loaded from environment, not from config file)
    #[serde(skip)]
    pub secret_key: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: StorageProvider::default(),
            bucket: default_bucket(),
            root: None,
            endpoint: None,
            region: None,
            public_base_url: None,
            access_key: None,
            secret_key: None,
        }
    }
}

fn default_bucket() -> String {
    "lessonpdf-pages".to_string()
}

/// Remote PDF conversion service
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConversionConfig {
    #[serde(default = "default_conversion_base_url")]
    pub base_url: String,
    /// Remote tool that renders PDF pages to JPEG
    #[serde(default = "default_tool")]
    pub tool: String,
    /// Project public key (loaded from environment, not from config file)
    #[serde(skip)]
    pub public_key: Option<String>,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_download_bytes")]
    pub max_download_bytes: ByteSize,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            base_url: default_conversion_base_url(),
            tool: default_tool(),
            public_key: None,
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            max_download_bytes: default_max_download_bytes(),
        }
    }
}

fn default_conversion_base_url() -> String {
    "https://api.ilovepdf.com".to_string()
}

fn default_tool() -> String {
    "pdfjpg".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_max_download_bytes() -> ByteSize {
    ByteSize(200 * 1024 * 1024) // 200 MB
}

/// Worker counts for each fan-out of the pipeline
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    #[serde(default = "default_batch_workers")]
    pub batch_workers: usize,
    #[serde(default = "default_retry_workers")]
    pub retry_workers: usize,
    #[serde(default = "default_cleanup_workers")]
    pub cleanup_workers: usize,
    #[serde(default = "default_page_delete_workers")]
    pub page_delete_workers: usize,
    #[serde(default = "default_page_save_workers")]
    pub page_save_workers: usize,
    /// Default batch size for pending-lesson processing
    #[serde(default = "default_pending_limit")]
    pub pending_limit: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_workers: default_batch_workers(),
            retry_workers: default_retry_workers(),
            cleanup_workers: default_cleanup_workers(),
            page_delete_workers: default_page_delete_workers(),
            page_save_workers: default_page_save_workers(),
            pending_limit: default_pending_limit(),
        }
    }
}

fn default_batch_workers() -> usize {
    5
}

fn default_retry_workers() -> usize {
    3
}

fn default_cleanup_workers() -> usize {
    3
}

fn default_page_delete_workers() -> usize {
    5
}

fn default_page_save_workers() -> usize {
    5
}

fn default_pending_limit() -> usize {
    10
}
