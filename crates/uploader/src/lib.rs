//! Image CDN upload client for the Quick Printz storefront
//!
//! Uploads images to a Cloudinary-compatible endpoint using an unsigned
//! upload preset. No API secret is sent from the client.

use bytes::Bytes;
use futures_util::future::join_all;
use log::{debug, error};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;
use url::Url;

/// Base of the public Cloudinary upload API.
pub const CLOUDINARY_API_BASE: &str = "https://api.cloudinary.com/v1_1";

/// 結果型
pub type Result<T> = std::result::Result<T, UploadError>;

/// エラー型
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Upload rejected ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("Invalid file: {0}")]
    InvalidFile(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// アップロード対象のファイル
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub data: Bytes,
    pub content_type: Option<String>,
}

impl UploadFile {
    pub fn new(name: &str, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.to_string(),
            data: data.into(),
            content_type: None,
        }
    }

    /// コンテンツタイプを設定
    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.to_string());
        self
    }

    /// ファイルを読み込む
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| UploadError::InvalidFile(format!("{} has no file name", path.display())))?;

        let data = tokio::fs::read(path).await?;

        Ok(Self::new(&name, data))
    }
}

/// アップロード結果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadedImage {
    #[serde(default)]
    pub public_id: Option<String>,
    #[serde(default)]
    pub secure_url: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub bytes: Option<u64>,
}

/// Per-file result of a batch upload.
#[derive(Debug)]
pub struct FileOutcome {
    pub name: String,
    pub result: Result<UploadedImage>,
}

impl FileOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Summary of a batch upload, in the order the files were given.
#[derive(Debug, Default)]
pub struct UploadSummary {
    pub outcomes: Vec<FileOutcome>,
}

impl UploadSummary {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn failed(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }
}

impl fmt::Display for UploadSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} files uploaded successfully",
            self.succeeded(),
            self.total()
        )
    }
}

/// 画像アップロードクライアント
#[derive(Debug, Clone)]
pub struct UploaderClient {
    upload_url: Url,
    upload_preset: String,
    http_client: Client,
}

impl UploaderClient {
    /// Cloudinary のクラウド名からクライアントを作成
    pub fn new(cloud_name: &str, upload_preset: &str, http_client: Client) -> Result<Self> {
        if cloud_name.trim().is_empty() {
            return Err(UploadError::ConfigError("cloud name cannot be empty".to_string()));
        }
        let endpoint = format!("{}/{}/image/upload", CLOUDINARY_API_BASE, cloud_name);
        Self::with_endpoint(&endpoint, upload_preset, http_client)
    }

    /// 任意のエンドポイントを指定してクライアントを作成
    pub fn with_endpoint(endpoint: &str, upload_preset: &str, http_client: Client) -> Result<Self> {
        Ok(Self {
            upload_url: Url::parse(endpoint)?,
            upload_preset: upload_preset.to_string(),
            http_client,
        })
    }

    pub fn upload_url(&self) -> &str {
        self.upload_url.as_str()
    }

    /// ファイルをアップロード
    pub async fn upload(&self, file: &UploadFile) -> Result<UploadedImage> {
        let mut part = Part::bytes(file.data.to_vec()).file_name(file.name.clone());
        if let Some(content_type) = &file.content_type {
            part = part.mime_str(content_type)?;
        }

        let form = Form::new()
            .part("file", part)
            .text("upload_preset", self.upload_preset.clone());

        debug!("uploading {} ({} bytes)", file.name, file.data.len());

        let response = self
            .http_client
            .post(self.upload_url.clone())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        // The endpoint reports rejections as `{ "error": { "message": .. } }`.
        let body: serde_json::Value = match serde_json::from_str(&text) {
            Ok(body) => body,
            Err(err) if status.is_success() => return Err(err.into()),
            Err(_) => {
                return Err(UploadError::ApiError {
                    status: status.as_u16(),
                    message: text,
                })
            }
        };

        if let Some(err) = body.get("error") {
            let message = err
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| err.to_string());
            return Err(UploadError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        if !status.is_success() {
            return Err(UploadError::ApiError {
                status: status.as_u16(),
                message: text,
            });
        }

        Ok(serde_json::from_value(body)?)
    }

    /// 複数ファイルを並行してアップロード
    ///
    /// Every file is submitted independently. A failure is logged and
    /// recorded in its outcome; it never cancels the other uploads.
    pub async fn upload_all(&self, files: &[UploadFile]) -> UploadSummary {
        let uploads = files.iter().map(|file| async move {
            let result = self.upload(file).await;
            if let Err(err) = &result {
                error!("Error uploading {}: {}", file.name, err);
            }
            FileOutcome {
                name: file.name.clone(),
                result,
            }
        });

        UploadSummary {
            outcomes: join_all(uploads).await,
        }
    }
}
