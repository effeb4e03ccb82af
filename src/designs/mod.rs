//! Premade design assets: listing, normalization and projection

mod mapper;
mod types;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::error::Error;
use quickprintz_storage::{StorageClient, StorageError, DEFAULT_PAGE_SIZE};

pub use mapper::*;
pub use types::*;

/// Category of a failed listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// Transport failure
    Network,
    /// The key was rejected or the bucket is not readable
    Auth,
    /// The response could not be decoded or normalized
    Malformed,
    /// Any other backend rejection
    Api,
}

/// The single failure type of an asset listing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Network, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Malformed, message)
    }
}

impl From<StorageError> for FetchError {
    fn from(err: StorageError) -> Self {
        let kind = match &err {
            _ if err.is_auth() => FetchErrorKind::Auth,
            StorageError::ApiError { .. } => FetchErrorKind::Api,
            StorageError::NetworkError(e) if e.is_decode() => FetchErrorKind::Malformed,
            StorageError::NetworkError(_) | StorageError::UrlParseError(_) => FetchErrorKind::Network,
            StorageError::SerializationError(_) | StorageError::MalformedResponse(_) => {
                FetchErrorKind::Malformed
            }
        };
        let message = match err {
            StorageError::ApiError { message, .. } => message,
            other => other.to_string(),
        };
        Self { kind, message }
    }
}

impl From<Error> for FetchError {
    fn from(err: Error) -> Self {
        match err {
            Error::Storage(e) => e.into(),
            Error::MalformedRecord(msg) => Self::malformed(msg),
            other => Self::network(other.to_string()),
        }
    }
}

/// Lists raw design records under a prefix
///
/// Order of the returned records is unspecified. Every call queries the
/// backend again.
#[async_trait]
pub trait AssetLister: Send + Sync {
    async fn list_assets(&self, prefix: Option<&str>) -> Result<Vec<RemoteObjectRecord>, FetchError>;
}

#[async_trait]
impl<T: AssetLister + ?Sized> AssetLister for Arc<T> {
    async fn list_assets(&self, prefix: Option<&str>) -> Result<Vec<RemoteObjectRecord>, FetchError> {
        (**self).list_assets(prefix).await
    }
}

/// Lists records from a storage bucket
#[derive(Debug, Clone)]
pub struct BucketAssetLister {
    storage: StorageClient,
    bucket: String,
    page_size: u32,
}

impl BucketAssetLister {
    pub fn new(storage: StorageClient, bucket: &str) -> Self {
        Self {
            storage,
            bucket: bucket.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }
}

#[async_trait]
impl AssetLister for BucketAssetLister {
    async fn list_assets(&self, prefix: Option<&str>) -> Result<Vec<RemoteObjectRecord>, FetchError> {
        let prefix = prefix.unwrap_or("").trim_matches('/');
        debug!(bucket = %self.bucket, prefix, "listing design assets");

        let objects = self
            .storage
            .from(&self.bucket)
            .list_all(prefix, self.page_size, None)
            .await?;

        objects
            .into_iter()
            .map(|object| RemoteObjectRecord::from_file_object(prefix, object))
            .collect::<Result<Vec<_>, Error>>()
            .map_err(FetchError::from)
    }
}
