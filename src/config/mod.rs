//! Configuration management for lessonpdf
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use lessonpdf::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Batch workers: {}", config.pipeline.batch_workers);
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `LESSONPDF__<section>__<key>`
//!
//! Examples:
//! - `LESSONPDF__SERVER__BIND_ADDR=0.0.0.0:9000`
//! - `LESSONPDF__STORAGE__PROVIDER=s3`
//! - `LESSONPDF__CONVERSION__MAX_DOWNLOAD_BYTES=50MB`
//!
//! Secrets (`CONVERSION_PUBLIC_KEY`, S3 credentials) are only read from the
//! environment.
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/lessonpdf.toml`.
//! This can be overridden using the `LESSONPDF_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use crate::humanize::ByteSize;
pub use models::{
    Config, ConversionConfig, PipelineConfig, ServerConfig, StorageConfig, StorageProvider,
};
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file is malformed or
    /// validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load(None)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Like [`Config::load`], reading the file at `path` instead
    pub fn load_with_file(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load(Some(path))?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    ///
    /// Secrets are not read; useful for testing with custom configuration files.
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}
