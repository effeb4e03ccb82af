//! Object storage client for the Quick Printz storefront
//!
//! This crate lists the design assets kept in a Supabase Storage bucket
//! and resolves the public and thumbnail URLs used to display them.

use log::debug;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// 結果型
pub type Result<T> = std::result::Result<T, StorageError>;

/// Default number of objects requested per listing page.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// エラー型
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl StorageError {
    /// HTTP status reported by the backend, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ApiError { status, .. } => Some(*status),
            Self::NetworkError(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// 認証エラーかどうか
    pub fn is_auth(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }

    /// Builds an `ApiError` from a failed response.
    ///
    /// Storage wraps some failures in a 400 whose body carries the real
    /// `statusCode`, so the body wins over the transport status when present.
    async fn from_response(response: Response) -> Self {
        let status = response.status().as_u16();
        let text = match response.text().await {
            Ok(text) => text,
            Err(err) => return Self::NetworkError(err),
        };

        #[derive(Deserialize)]
        struct ErrorBody {
            #[serde(rename = "statusCode")]
            status_code: Option<serde_json::Value>,
            message: Option<String>,
            error: Option<String>,
        }

        match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => {
                let status = body
                    .status_code
                    .and_then(|code| match code {
                        serde_json::Value::String(s) => s.parse().ok(),
                        serde_json::Value::Number(n) => n.as_u64().map(|n| n as u16),
                        _ => None,
                    })
                    .unwrap_or(status);
                let message = body.message.or(body.error).unwrap_or(text);
                Self::ApiError { status, message }
            }
            Err(_) => Self::ApiError {
                status,
                message: text,
            },
        }
    }
}

/// ソート設定
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SortBy {
    pub column: String,
    pub order: SortOrder,
}

/// ソート順
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// ファイル一覧取得オプション
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub sort_by: Option<SortBy>,
    pub search: Option<String>,
}

impl ListOptions {
    /// 新しい一覧オプションを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// 取得上限を設定
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// オフセットを設定
    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// ソート順を設定
    pub fn sort_by(mut self, column: &str, order: SortOrder) -> Self {
        self.sort_by = Some(SortBy {
            column: column.to_string(),
            order,
        });
        self
    }

    /// 検索キーワードを設定
    pub fn search(mut self, search: &str) -> Self {
        self.search = Some(search.to_string());
        self
    }
}

#[derive(Debug, Serialize)]
struct ListRequest<'a> {
    prefix: &'a str,
    limit: u32,
    offset: u32,
    #[serde(rename = "sortBy", skip_serializing_if = "Option::is_none")]
    sort_by: Option<&'a SortBy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    search: Option<&'a str>,
}

/// 画像変換オプション
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageTransformOptions {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub resize: Option<String>,
    pub quality: Option<u32>,
}

impl ImageTransformOptions {
    /// 新しい画像変換オプションを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// 幅を設定
    pub fn with_width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    /// 高さを設定
    pub fn with_height(mut self, height: u32) -> Self {
        self.height = Some(height);
        self
    }

    /// リサイズモードを設定 (cover, contain, fill)
    pub fn with_resize(mut self, resize: &str) -> Self {
        self.resize = Some(resize.to_string());
        self
    }

    /// 画質を設定 (1-100)
    pub fn with_quality(mut self, quality: u32) -> Self {
        self.quality = Some(quality.clamp(1, 100));
        self
    }

    /// 変換が何も指定されていないか
    pub fn is_empty(&self) -> bool {
        self.width.is_none() && self.height.is_none() && self.resize.is_none() && self.quality.is_none()
    }

    fn apply(&self, url: &mut Url) {
        if self.is_empty() {
            return;
        }
        let mut pairs = url.query_pairs_mut();
        if let Some(width) = self.width {
            pairs.append_pair("width", &width.to_string());
        }
        if let Some(height) = self.height {
            pairs.append_pair("height", &height.to_string());
        }
        if let Some(resize) = &self.resize {
            pairs.append_pair("resize", resize);
        }
        if let Some(quality) = self.quality {
            pairs.append_pair("quality", &quality.to_string());
        }
    }
}

/// ファイル情報
///
/// Listing entries name objects relative to the requested prefix. Folder
/// placeholders come back with a null `id` and no metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileObject {
    pub name: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub last_accessed_at: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl FileObject {
    /// フォルダかどうか
    pub fn is_folder(&self) -> bool {
        self.id.is_none()
    }

    /// Object size in bytes, read from `metadata.size`
    pub fn size(&self) -> Option<u64> {
        self.metadata.as_ref()?.get("size")?.as_u64()
    }

    /// MIME type, read from `metadata.mimetype`
    pub fn mime_type(&self) -> Option<&str> {
        self.metadata.as_ref()?.get("mimetype")?.as_str()
    }
}

/// ストレージクライアント
#[derive(Debug, Clone)]
pub struct StorageClient {
    base_url: String,
    api_key: String,
    http_client: Client,
}

/// ストレージバケットクライアント
pub struct StorageBucketClient<'a> {
    parent: &'a StorageClient,
    bucket_id: String,
}

impl StorageClient {
    /// 新しいストレージクライアントを作成
    pub fn new(base_url: &str, api_key: &str, http_client: Client) -> Self {
        Self {
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            http_client,
        }
    }

    /// バケットを指定
    pub fn from<'a>(&'a self, bucket_id: &str) -> StorageBucketClient<'a> {
        StorageBucketClient {
            parent: self,
            bucket_id: bucket_id.to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Joins `/storage/v1/<route...>/<object path>` onto the base URL,
    /// percent-encoding each path segment.
    fn endpoint(&self, route: &[&str], object_path: Option<&str>) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| StorageError::UrlParseError(url::ParseError::RelativeUrlWithCannotBeABaseBase))?;
            segments.pop_if_empty().extend(["storage", "v1"]).extend(route);
            if let Some(path) = object_path {
                segments.extend(path.split('/').filter(|s| !s.is_empty()));
            }
        }
        Ok(url)
    }
}

impl<'a> StorageBucketClient<'a> {
    pub fn bucket_id(&self) -> &str {
        &self.bucket_id
    }

    /// ファイル一覧を取得
    pub async fn list(&self, prefix: &str, options: Option<ListOptions>) -> Result<Vec<FileObject>> {
        let url = self.parent.endpoint(&["object", "list", &self.bucket_id], None)?;
        let options = options.unwrap_or_default();

        let payload = ListRequest {
            prefix,
            limit: options.limit.unwrap_or(DEFAULT_PAGE_SIZE),
            offset: options.offset.unwrap_or(0),
            sort_by: options.sort_by.as_ref(),
            search: options.search.as_deref(),
        };

        debug!(
            "listing bucket {} prefix {:?} offset {}",
            self.bucket_id, prefix, payload.offset
        );

        let response = self
            .parent
            .http_client
            .post(url)
            .header("apikey", &self.parent.api_key)
            .header("Authorization", format!("Bearer {}", &self.parent.api_key))
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StorageError::from_response(response).await);
        }

        let body = response.text().await?;
        let files = serde_json::from_str::<Vec<FileObject>>(&body)?;

        Ok(files)
    }

    /// 全ページを取得
    ///
    /// Requests pages of `page_size` entries until the backend returns a
    /// short page.
    pub async fn list_all(
        &self,
        prefix: &str,
        page_size: u32,
        sort_by: Option<SortBy>,
    ) -> Result<Vec<FileObject>> {
        let page_size = if page_size == 0 { DEFAULT_PAGE_SIZE } else { page_size };
        let mut offset = 0;
        let mut files = Vec::new();

        loop {
            let mut options = ListOptions::new().limit(page_size).offset(offset);
            options.sort_by = sort_by.clone();

            let page = self.list(prefix, Some(options)).await?;
            let fetched = page.len() as u32;
            files.extend(page);

            if fetched < page_size {
                break;
            }
            offset += fetched;
        }

        Ok(files)
    }

    /// 公開URLを取得
    pub fn get_public_url(&self, path: &str) -> Result<String> {
        let url = self
            .parent
            .endpoint(&["object", "public", &self.bucket_id], Some(path))?;
        Ok(url.to_string())
    }

    /// 変換済み画像の公開URLを取得
    pub fn get_public_transform_url(
        &self,
        path: &str,
        options: &ImageTransformOptions,
    ) -> Result<String> {
        let mut url = self
            .parent
            .endpoint(&["render", "image", "public", &self.bucket_id], Some(path))?;
        options.apply(&mut url);
        Ok(url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn file_entry(name: &str, size: u64) -> serde_json::Value {
        json!({
            "name": name,
            "id": format!("id-{}", name),
            "updated_at": "2024-03-01T10:00:00.000Z",
            "created_at": "2024-02-01T10:00:00.000Z",
            "last_accessed_at": "2024-03-02T10:00:00.000Z",
            "metadata": { "size": size, "mimetype": "image/png" }
        })
    }

    #[tokio::test]
    async fn test_list_files() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/storage/v1/object/list/designs"))
            .and(header("apikey", "fake-key"))
            .and(header("Authorization", "Bearer fake-key"))
            .and(body_json(json!({ "prefix": "labels", "limit": 100, "offset": 0 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                file_entry("gelato.png", 2048),
                { "name": "archive", "id": null, "metadata": null }
            ])))
            .mount(&mock_server)
            .await;

        let client = StorageClient::new(&mock_server.uri(), "fake-key", Client::new());
        let files = client.from("designs").list("labels", None).await.unwrap();

        assert_eq!(files.len(), 2);
        assert_eq!(files[0].name, "gelato.png");
        assert_eq!(files[0].size(), Some(2048));
        assert_eq!(files[0].mime_type(), Some("image/png"));
        assert!(!files[0].is_folder());
        assert!(files[1].is_folder());
        assert_eq!(files[1].size(), None);
    }

    #[tokio::test]
    async fn test_list_sends_sort_and_search() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/storage/v1/object/list/designs"))
            .and(body_json(json!({
                "prefix": "",
                "limit": 10,
                "offset": 20,
                "sortBy": { "column": "name", "order": "asc" },
                "search": "runtz"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&mock_server)
            .await;

        let client = StorageClient::new(&mock_server.uri(), "fake-key", Client::new());
        let options = ListOptions::new()
            .limit(10)
            .offset(20)
            .sort_by("name", SortOrder::Asc)
            .search("runtz");
        let files = client.from("designs").list("", Some(options)).await.unwrap();

        assert!(files.is_empty());
    }

    #[tokio::test]
    async fn test_list_all_pages_until_short_page() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/storage/v1/object/list/designs"))
            .and(body_json(json!({ "prefix": "", "limit": 2, "offset": 0 })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([file_entry("a.png", 1), file_entry("b.png", 2)])),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/storage/v1/object/list/designs"))
            .and(body_json(json!({ "prefix": "", "limit": 2, "offset": 2 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([file_entry("c.png", 3)])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = StorageClient::new(&mock_server.uri(), "fake-key", Client::new());
        let files = client.from("designs").list_all("", 2, None).await.unwrap();

        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.png", "b.png", "c.png"]);
    }

    #[tokio::test]
    async fn test_list_unauthorized() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/storage/v1/object/list/private"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "statusCode": "403",
                "error": "Unauthorized",
                "message": "new row violates row-level security policy"
            })))
            .mount(&mock_server)
            .await;

        let client = StorageClient::new(&mock_server.uri(), "fake-key", Client::new());
        let result = client.from("private").list("", None).await;

        match result {
            Err(err @ StorageError::ApiError { .. }) => {
                assert!(err.is_auth());
                assert!(err.to_string().contains("row-level security"));
            }
            other => panic!("Expected ApiError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_list_plain_text_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/storage/v1/object/list/designs"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&mock_server)
            .await;

        let client = StorageClient::new(&mock_server.uri(), "fake-key", Client::new());
        let err = client.from("designs").list("", None).await.unwrap_err();

        assert_eq!(err.status(), Some(502));
        assert!(!err.is_auth());
        assert!(err.to_string().contains("Bad Gateway"));
    }

    #[tokio::test]
    async fn test_list_malformed_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/storage/v1/object/list/designs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "unexpected": true })))
            .mount(&mock_server)
            .await;

        let client = StorageClient::new(&mock_server.uri(), "fake-key", Client::new());
        let result = client.from("designs").list("", None).await;

        assert!(matches!(result, Err(StorageError::SerializationError(_))));
    }

    #[test]
    fn test_get_public_url() {
        let client = StorageClient::new("https://example.supabase.co", "fake-key", Client::new());
        let url = client
            .from("designs")
            .get_public_url("labels/Blue Dream.png")
            .unwrap();

        assert_eq!(
            url,
            "https://example.supabase.co/storage/v1/object/public/designs/labels/Blue%20Dream.png"
        );
    }

    #[test]
    fn test_get_public_url_trailing_slash_base() {
        let client = StorageClient::new("https://example.supabase.co/", "fake-key", Client::new());
        let url = client.from("designs").get_public_url("a.png").unwrap();

        assert_eq!(
            url,
            "https://example.supabase.co/storage/v1/object/public/designs/a.png"
        );
    }

    #[test]
    fn test_get_public_transform_url() {
        let client = StorageClient::new("https://example.supabase.co", "fake-key", Client::new());
        let options = ImageTransformOptions::new()
            .with_width(400)
            .with_resize("cover")
            .with_quality(150);
        let url = client
            .from("designs")
            .get_public_transform_url("a.png", &options)
            .unwrap();

        assert_eq!(
            url,
            "https://example.supabase.co/storage/v1/render/image/public/designs/a.png?width=400&resize=cover&quality=100"
        );
    }

    #[test]
    fn test_get_public_transform_url_without_options() {
        let client = StorageClient::new("https://example.supabase.co", "fake-key", Client::new());
        let options = ImageTransformOptions::new();
        let url = client
            .from("designs")
            .get_public_transform_url("a.png", &options)
            .unwrap();

        assert!(options.is_empty());
        assert_eq!(url, "https://example.supabase.co/storage/v1/render/image/public/designs/a.png");
    }

    #[test]
    fn test_invalid_base_url() {
        let client = StorageClient::new("not a url", "fake-key", Client::new());
        let result = client.from("designs").get_public_url("a.png");

        assert!(matches!(result, Err(StorageError::UrlParseError(_))));
    }
}
