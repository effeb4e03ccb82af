//! Bulk image uploader: selection, fan-out upload and status line

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{info, warn};

use crate::error::Result;
use quickprintz_uploader::{UploadFile, UploadSummary, UploaderClient};

pub const EMPTY_SELECTION_MESSAGE: &str = "Please select files to upload.";

#[derive(Debug, Default)]
struct UploadState {
    selection: Vec<UploadFile>,
    uploading: bool,
    status: String,
}

/// Uploads a user selection of images in one batch.
///
/// Clones share the same selection and status, so one handle can drive an
/// upload while another observes its progress.
#[derive(Debug, Clone)]
pub struct BulkImageUploader {
    client: UploaderClient,
    state: Arc<Mutex<UploadState>>,
}

impl BulkImageUploader {
    pub fn new(client: UploaderClient) -> Self {
        Self {
            client,
            state: Arc::new(Mutex::new(UploadState::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, UploadState> {
        // Never held across an await; every write leaves the state whole.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replaces the current selection
    pub fn select(&self, files: Vec<UploadFile>) {
        self.lock().selection = files;
    }

    /// Replaces the current selection with files read from disk
    pub async fn select_paths<P: AsRef<Path>>(&self, paths: &[P]) -> Result<()> {
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            files.push(UploadFile::from_path(path).await?);
        }
        self.select(files);
        Ok(())
    }

    pub fn selection(&self) -> Vec<UploadFile> {
        self.lock().selection.clone()
    }

    pub fn selected_names(&self) -> Vec<String> {
        self.lock().selection.iter().map(|f| f.name.clone()).collect()
    }

    pub fn is_uploading(&self) -> bool {
        self.lock().uploading
    }

    /// Whether the upload button is enabled
    pub fn can_upload(&self) -> bool {
        let state = self.lock();
        !state.uploading && !state.selection.is_empty()
    }

    /// Last status line, empty before the first attempt
    pub fn status(&self) -> String {
        self.lock().status.clone()
    }

    /// Uploads every selected file concurrently and clears the selection.
    ///
    /// Individual failures only lower the success count. Returns `None`
    /// when nothing was selected or a batch is already running.
    pub async fn upload(&self) -> Option<UploadSummary> {
        let files = {
            let mut state = self.lock();
            if state.uploading {
                warn!("upload already in progress");
                return None;
            }
            if state.selection.is_empty() {
                state.status = EMPTY_SELECTION_MESSAGE.to_string();
                return None;
            }
            state.uploading = true;
            state.status = format!("Uploading {} file(s)...", state.selection.len());
            state.selection.clone()
        };
        info!(files = files.len(), endpoint = self.client.upload_url(), "starting bulk upload");

        let summary = self.client.upload_all(&files).await;

        {
            let mut state = self.lock();
            state.uploading = false;
            state.status = format!("Finished. {}.", summary);
            state.selection.clear();
        }
        info!(succeeded = summary.succeeded(), total = summary.total(), "bulk upload finished");

        Some(summary)
    }
}
