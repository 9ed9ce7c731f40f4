use super::models::{Config, StorageProvider};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Worker count must be positive: pipeline.{field} = 0")]
    ZeroWorkers { field: &'static str },

    #[error("pipeline.pending_limit must be positive")]
    ZeroPendingLimit,

    #[error("Invalid conversion base_url '{url}': {reason}")]
    InvalidConversionUrl { url: String, reason: String },

    #[error("conversion.max_download_bytes must be positive")]
    ZeroDownloadLimit,

    #[error("Storage provider is S3 but missing credentials (access_key or secret_key)")]
    MissingS3Credentials,

    #[error("Storage provider is local but storage.root is not set")]
    MissingLocalRoot,
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_pipeline(config)?;
    validate_conversion(config)?;
    validate_storage(config)?;
    Ok(())
}

fn validate_pipeline(config: &Config) -> Result<(), ValidationError> {
    let pipeline = &config.pipeline;
    let counts = [
        ("batch_workers", pipeline.batch_workers),
        ("retry_workers", pipeline.retry_workers),
        ("cleanup_workers", pipeline.cleanup_workers),
        ("page_delete_workers", pipeline.page_delete_workers),
        ("page_save_workers", pipeline.page_save_workers),
    ];

    if let Some((field, _)) = counts.iter().find(|(_, count)| *count == 0) {
        return Err(ValidationError::ZeroWorkers { field: *field });
    }

    if pipeline.pending_limit == 0 {
        return Err(ValidationError::ZeroPendingLimit);
    }

    Ok(())
}

fn validate_conversion(config: &Config) -> Result<(), ValidationError> {
    let url = &config.conversion.base_url;
    let parsed = reqwest::Url::parse(url).map_err(|e| ValidationError::InvalidConversionUrl {
        url: url.clone(),
        reason: e.to_string(),
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ValidationError::InvalidConversionUrl {
            url: url.clone(),
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }

    if config.conversion.max_download_bytes.as_u64() == 0 {
        return Err(ValidationError::ZeroDownloadLimit);
    }

    Ok(())
}

fn validate_storage(config: &Config) -> Result<(), ValidationError> {
    match config.storage.provider {
        StorageProvider::S3 => {
            if config.storage.access_key.is_none() || config.storage.secret_key.is_none() {
                return Err(ValidationError::MissingS3Credentials);
            }
        }
        StorageProvider::Local => {
            if config.storage.root.is_none() {
                return Err(ValidationError::MissingLocalRoot);
            }
        }
        StorageProvider::Memory => {}
    }
    Ok(())
}
