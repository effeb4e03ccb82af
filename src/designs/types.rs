//! Types for design assets

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use quickprintz_storage::FileObject;

/// One object in the design bucket, normalized at the storage boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteObjectRecord {
    /// Full key of the object within the bucket. Folders end with `/`.
    pub name: String,

    /// Size in bytes
    pub size: Option<u64>,

    /// Creation timestamp
    pub created_at: Option<DateTime<Utc>>,

    /// Update timestamp
    pub updated_at: Option<DateTime<Utc>>,

    /// MIME type hint
    pub content_type: Option<String>,
}

impl RemoteObjectRecord {
    /// Create a record for the given key. The key cannot be empty.
    pub fn new(name: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(Error::malformed("object name cannot be empty"));
        }
        Ok(Self {
            name: name.to_string(),
            size: None,
            created_at: None,
            updated_at: None,
            content_type: None,
        })
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = Some(updated_at);
        self
    }

    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.to_string());
        self
    }

    /// Pseudo-directory entries end with a path separator
    pub fn is_directory(&self) -> bool {
        self.name.ends_with('/')
    }

    /// Last path segment of the key
    pub fn file_name(&self) -> &str {
        self.name
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(&self.name)
    }

    /// Lowercased extension of the file name, if it has one
    pub fn extension(&self) -> Option<String> {
        let file_name = self.file_name();
        let (stem, ext) = file_name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }

    /// `updated_at`, falling back to `created_at`
    pub fn latest_timestamp(&self) -> Option<DateTime<Utc>> {
        self.updated_at.or(self.created_at)
    }

    /// Normalizes one listing entry.
    ///
    /// Storage names entries relative to the listed prefix, so the prefix is
    /// joined back on. Folder placeholders get a trailing `/`.
    pub fn from_file_object(prefix: &str, object: FileObject) -> Result<Self> {
        if object.name.is_empty() {
            return Err(Error::malformed(format!(
                "listing under {:?} returned an entry without a name",
                prefix
            )));
        }

        let prefix = prefix.trim_matches('/');
        let mut name = if prefix.is_empty() {
            object.name.clone()
        } else {
            format!("{}/{}", prefix, object.name)
        };
        if object.is_folder() && !name.ends_with('/') {
            name.push('/');
        }

        let created_at = parse_timestamp(&name, "created_at", object.created_at.as_deref())?;
        let updated_at = parse_timestamp(&name, "updated_at", object.updated_at.as_deref())?;

        Ok(Self {
            size: object.size(),
            content_type: object.mime_type().map(str::to_string),
            name,
            created_at,
            updated_at,
        })
    }
}

fn parse_timestamp(name: &str, field: &str, value: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    match value {
        None => Ok(None),
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|ts| Some(ts.with_timezone(&Utc)))
            .map_err(|e| Error::malformed(format!("{}: invalid {} {:?}: {}", name, field, raw, e))),
    }
}

/// Render-ready projection of an image record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayAsset {
    /// The record key, used as the stable list key
    pub path: String,

    /// Human-facing label
    pub display_name: String,

    /// Full-resolution URL, if the object resolves publicly
    pub public_url: Option<String>,

    /// Preview URL; equals `public_url` when no transform is configured
    pub thumbnail_url: Option<String>,

    /// Human-readable size
    pub size_label: String,

    /// Whether the extension is in the accepted image set
    pub is_image: bool,
}
