use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WheelFetchError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Package index unavailable at {url}: {reason}")]
    MetadataUnavailable { url: String, reason: String },

    #[error("No wheel files found for {package}=={version}")]
    NoArtifacts { package: String, version: String },

    #[error("Invalid catalog: {details}")]
    InvalidCatalog { details: String },

    #[error("Failed to download {artifact} from {url}: {reason}")]
    Transfer {
        artifact: String,
        url: String,
        reason: String,
    },

    #[error("Checksum mismatch for {artifact}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        artifact: String,
        expected: String,
        actual: String,
    },

    #[error("Download directory creation failed at {path}: {reason}")]
    DownloadDirectoryCreation { path: PathBuf, reason: String },

    #[error("{failed} of {total} downloads failed")]
    DownloadsFailed { failed: usize, total: usize },

    #[error("Invalid command line arguments: {details}")]
    CliArgumentValidation { details: String },

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected error: {0}")]
    Unexpected(#[from] eyre::Report),
}

impl WheelFetchError {
    pub(crate) fn transfer(
        artifact: impl Into<String>,
        url: impl Into<String>,
        reason: impl std::fmt::Display,
    ) -> Self {
        Self::Transfer {
            artifact: artifact.into(),
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn metadata_unavailable(
        url: impl Into<String>,
        reason: impl std::fmt::Display,
    ) -> Self {
        Self::MetadataUnavailable {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}
