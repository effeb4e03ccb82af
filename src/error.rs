//! Error handling for the storefront client

use std::fmt;
use thiserror::Error;

use quickprintz_storage::StorageError;
use quickprintz_uploader::UploadError;

/// Result type used across the storefront crate
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the storefront client
#[derive(Error, Debug)]
pub enum Error {
    /// Object storage errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Image CDN upload errors
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    /// HTTP client construction errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// A storage entry that cannot be normalized into a record
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// General errors
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Create a new configuration error
    pub fn config<T: fmt::Display>(msg: T) -> Self {
        Error::Config(msg.to_string())
    }

    /// Create a new malformed record error
    pub fn malformed<T: fmt::Display>(msg: T) -> Self {
        Error::MalformedRecord(msg.to_string())
    }

    /// Create a new general error
    pub fn general<T: fmt::Display>(msg: T) -> Self {
        Error::General(msg.to_string())
    }
}
