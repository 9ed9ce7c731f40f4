//! Object storage for rendered page images
//! Uses Apache Arrow object_store crate

use async_trait::async_trait;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::{Attribute, Attributes, ObjectStore, PutOptions, path::Path as StoragePath};
use std::sync::Arc;
use thiserror::Error;

use crate::config::{StorageConfig, StorageProvider};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Invalid storage configuration: {0}")]
    InvalidConfig(String),

    #[error("Object store error: {0}")]
    ObjectStoreError(#[from] object_store::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Storage result type
pub type Result<T> = std::result::Result<T, StorageError>;

/// Durable blob store as seen by the conversion pipeline
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `data` under `filename` and return the URL that references it
    async fn upload(&self, data: Vec<u8>, filename: &str, content_type: &str) -> Result<String>;
}

/// Storage client wrapping object_store
#[derive(Clone)]
pub struct StorageClient {
    store: Arc<dyn ObjectStore>,
    pub bucket: String,
    public_base_url: Option<String>,
    // LocalFileSystem rejects object attributes
    content_type_attributes: bool,
}

impl StorageClient {
    /// Create new storage client with any object_store backend
    pub fn new(store: Arc<dyn ObjectStore>, bucket: String) -> Self {
        Self {
            store,
            bucket,
            public_base_url: None,
            content_type_attributes: true,
        }
    }

    /// Create in-memory storage for testing/development
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemory::new()), "lessonpdf-local".to_string())
    }

    /// Build the backend selected by `config.provider`
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        let mut client = match config.provider {
            StorageProvider::Memory => {
                Self::new(Arc::new(InMemory::new()), config.bucket.clone())
            }
            StorageProvider::Local => {
                let root = config.root.as_ref().ok_or_else(|| {
                    StorageError::InvalidConfig("storage.root is required for local".into())
                })?;
                std::fs::create_dir_all(root)?;
                let store = LocalFileSystem::new_with_prefix(root)?;
                let mut client = Self::new(Arc::new(store), config.bucket.clone());
                client.content_type_attributes = false;
                client
            }
            StorageProvider::S3 => {
                let mut builder = AmazonS3Builder::new().with_bucket_name(&config.bucket);
                if let Some(region) = &config.region {
                    builder = builder.with_region(region);
                }
                if let Some(endpoint) = &config.endpoint {
                    builder = builder.with_endpoint(endpoint).with_allow_http(true);
                }
                if let Some(access_key) = &config.access_key {
                    builder = builder.with_access_key_id(access_key);
                }
                if let Some(secret_key) = &config.secret_key {
                    builder = builder.with_secret_access_key(secret_key);
                }
                Self::new(Arc::new(builder.build()?), config.bucket.clone())
            }
        };

        client.public_base_url = config
            .public_base_url
            .as_ref()
            .map(|url| url.trim_end_matches('/').to_string());

        tracing::info!(
            provider = ?config.provider,
            bucket = %client.bucket,
            "Storage client initialized"
        );
        Ok(client)
    }

    /// URL under which `key` is served
    pub fn object_url(&self, key: &str) -> String {
        match &self.public_base_url {
            Some(base) => format!("{}/{}", base, key),
            None => format!("s3://{}/{}", self.bucket, key),
        }
    }
}

#[async_trait]
impl ObjectStorage for StorageClient {
    async fn upload(&self, data: Vec<u8>, filename: &str, content_type: &str) -> Result<String> {
        if filename.is_empty() {
            return Err(StorageError::UploadFailed("empty object key".into()));
        }

        let path = StoragePath::from(filename);
        let size = data.len();

        let mut options = PutOptions::default();
        if self.content_type_attributes {
            let mut attributes = Attributes::new();
            attributes.insert(Attribute::ContentType, content_type.to_string().into());
            options.attributes = attributes;
        }

        self.store.put_opts(&path, data.into(), options).await?;

        tracing::debug!(key = filename, size, content_type, "Uploaded to storage");
        Ok(self.object_url(filename))
    }
}
