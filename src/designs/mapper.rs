//! Filtering and projection of raw records into display assets

use std::cmp::Ordering;

use quickprintz_storage::{ImageTransformOptions, StorageClient};
use tracing::debug;

use super::types::{DisplayAsset, RemoteObjectRecord};

const STRICT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];
const LOOSE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif", "svg"];

/// Accepted image extension set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImagePolicy {
    /// jpg, jpeg, png, webp
    #[default]
    Strict,
    /// Strict plus gif and svg
    Loose,
}

impl ImagePolicy {
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            ImagePolicy::Strict => STRICT_EXTENSIONS,
            ImagePolicy::Loose => LOOSE_EXTENSIONS,
        }
    }

    pub fn accepts(&self, record: &RemoteObjectRecord) -> bool {
        if record.is_directory() {
            return false;
        }
        record
            .extension()
            .map(|ext| self.extensions().contains(&ext.as_str()))
            .unwrap_or(false)
    }
}

/// How a display name is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayNaming {
    /// The last segment of the object key
    #[default]
    FileName,
    /// "Design #N", numbered by position in the sorted list
    Numbered,
}

/// Resolves object keys into fetchable URLs
pub trait UrlResolver: Send + Sync {
    /// Full-resolution URL, or `None` when the object is not publicly reachable
    fn public_url(&self, path: &str) -> Option<String>;

    /// Preview URL
    fn thumbnail_url(&self, path: &str) -> Option<String> {
        self.public_url(path)
    }
}

/// Resolves URLs against a storage bucket
#[derive(Debug, Clone)]
pub struct BucketUrlResolver {
    storage: StorageClient,
    bucket: String,
    public: bool,
    thumbnail: Option<ImageTransformOptions>,
}

impl BucketUrlResolver {
    pub fn new(storage: StorageClient, bucket: &str) -> Self {
        Self {
            storage,
            bucket: bucket.to_string(),
            public: true,
            thumbnail: None,
        }
    }

    /// Private buckets never resolve public URLs
    pub fn with_public(mut self, public: bool) -> Self {
        self.public = public;
        self
    }

    pub fn with_thumbnail(mut self, thumbnail: Option<ImageTransformOptions>) -> Self {
        self.thumbnail = thumbnail;
        self
    }
}

impl UrlResolver for BucketUrlResolver {
    fn public_url(&self, path: &str) -> Option<String> {
        if !self.public {
            return None;
        }
        match self.storage.from(&self.bucket).get_public_url(path) {
            Ok(url) => Some(url),
            Err(err) => {
                debug!(path, error = %err, "cannot resolve public url");
                None
            }
        }
    }

    fn thumbnail_url(&self, path: &str) -> Option<String> {
        match &self.thumbnail {
            Some(options) if self.public && !options.is_empty() => self
                .storage
                .from(&self.bucket)
                .get_public_transform_url(path, options)
                .ok(),
            _ => self.public_url(path),
        }
    }
}

/// Formats a byte count into a human-readable label
pub fn format_file_size(size: Option<u64>) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

    let bytes = match size {
        None => return "Unknown size".to_string(),
        Some(bytes) => bytes,
    };
    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    // Compare the rounded value so 1048575 bytes reads "1.0 MB", not "1024.0 KB"
    while (value * 10.0).round() / 10.0 >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// Gallery ordering: newest first by `updated_at` (else `created_at`).
/// Records with a timestamp come before records without one; remaining
/// ties fall back to the key in ascending order.
pub fn compare_records(a: &RemoteObjectRecord, b: &RemoteObjectRecord) -> Ordering {
    match (a.latest_timestamp(), b.latest_timestamp()) {
        (Some(left), Some(right)) => right.cmp(&left).then_with(|| a.name.cmp(&b.name)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.name.cmp(&b.name),
    }
}

/// Turns raw listings into display assets. Pure apart from URL resolution.
#[derive(Debug, Clone)]
pub struct AssetMapper<R> {
    resolver: R,
    policy: ImagePolicy,
    naming: DisplayNaming,
}

impl<R: UrlResolver> AssetMapper<R> {
    pub fn new(resolver: R) -> Self {
        Self {
            resolver,
            policy: ImagePolicy::default(),
            naming: DisplayNaming::default(),
        }
    }

    pub fn with_policy(mut self, policy: ImagePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_naming(mut self, naming: DisplayNaming) -> Self {
        self.naming = naming;
        self
    }

    pub fn policy(&self) -> ImagePolicy {
        self.policy
    }

    /// Projects one record. `position` is its 1-based place in the list.
    pub fn display_asset(&self, record: &RemoteObjectRecord, position: usize) -> DisplayAsset {
        let display_name = match self.naming {
            DisplayNaming::FileName => record.file_name().to_string(),
            DisplayNaming::Numbered => format!("Design #{}", position),
        };

        DisplayAsset {
            path: record.name.clone(),
            display_name,
            public_url: self.resolver.public_url(&record.name),
            thumbnail_url: self.resolver.thumbnail_url(&record.name),
            size_label: format_file_size(record.size),
            is_image: self.policy.accepts(record),
        }
    }

    /// Drops folders and non-images, sorts, and projects the survivors.
    pub fn to_display_assets(&self, records: &[RemoteObjectRecord]) -> Vec<DisplayAsset> {
        let mut images: Vec<&RemoteObjectRecord> =
            records.iter().filter(|r| self.policy.accepts(r)).collect();
        images.sort_by(|a, b| compare_records(a, b));

        images
            .into_iter()
            .enumerate()
            .map(|(index, record)| self.display_asset(record, index + 1))
            .collect()
    }
}

/// Projects records with the default policy and naming
pub fn to_display_assets<R: UrlResolver>(records: &[RemoteObjectRecord], resolver: R) -> Vec<DisplayAsset> {
    AssetMapper::new(resolver).to_display_assets(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    struct TestResolver;

    impl UrlResolver for TestResolver {
        fn public_url(&self, path: &str) -> Option<String> {
            Some(format!("https://cdn.test/{}", path))
        }
    }

    struct PrivateResolver;

    impl UrlResolver for PrivateResolver {
        fn public_url(&self, _path: &str) -> Option<String> {
            None
        }
    }

    fn record(name: &str) -> RemoteObjectRecord {
        RemoteObjectRecord::new(name).unwrap()
    }

    #[test]
    fn test_listing_scenario() {
        let records = vec![
            record("a.png").with_size(1024),
            record("b/").with_size(0),
            record("c.txt").with_size(50),
        ];

        let assets = to_display_assets(&records, TestResolver);

        assert_eq!(
            assets,
            vec![DisplayAsset {
                path: "a.png".to_string(),
                display_name: "a.png".to_string(),
                public_url: Some("https://cdn.test/a.png".to_string()),
                thumbnail_url: Some("https://cdn.test/a.png".to_string()),
                size_label: "1.0 KB".to_string(),
                is_image: true,
            }]
        );
    }

    #[test]
    fn test_filter_counts() {
        let mut records = Vec::new();
        for i in 0..7 {
            records.push(record(&format!("design-{}.jpeg", i)));
        }
        for i in 0..4 {
            records.push(record(&format!("notes-{}.pdf", i)));
        }
        records.push(record("folder/"));
        records.push(record("noext"));

        let assets = to_display_assets(&records, TestResolver);
        assert_eq!(assets.len(), 7);
        assert!(assets.iter().all(|a| a.is_image));
    }

    #[test]
    fn test_empty_input() {
        assert!(to_display_assets(&[], TestResolver).is_empty());
    }

    #[test]
    fn test_policy_extensions() {
        let records = vec![record("a.GIF"), record("b.svg"), record("c.JPG")];

        let strict = AssetMapper::new(TestResolver).to_display_assets(&records);
        let loose = AssetMapper::new(TestResolver)
            .with_policy(ImagePolicy::Loose)
            .to_display_assets(&records);

        assert_eq!(strict.len(), 1);
        assert_eq!(strict[0].path, "c.JPG");
        assert_eq!(loose.len(), 3);
    }

    #[test]
    fn test_sort_by_timestamp_then_name() {
        let jan = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let feb = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let mar = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();

        let records = vec![
            record("zeta.png"),
            record("old.png").with_created_at(jan),
            record("alpha.png"),
            record("edited.png").with_created_at(jan).with_updated_at(mar),
            record("mid.png").with_updated_at(feb),
            record("also-mid.png").with_updated_at(feb),
        ];

        let paths: Vec<_> = to_display_assets(&records, TestResolver)
            .into_iter()
            .map(|a| a.path)
            .collect();

        assert_eq!(
            paths,
            vec!["edited.png", "also-mid.png", "mid.png", "old.png", "alpha.png", "zeta.png"]
        );
    }

    #[test]
    fn test_missing_timestamps_fall_back_to_name() {
        let records = vec![record("gamma.webp"), record("beta.webp"), record("alpha.webp")];
        let paths: Vec<_> = to_display_assets(&records, TestResolver)
            .into_iter()
            .map(|a| a.path)
            .collect();
        assert_eq!(paths, vec!["alpha.webp", "beta.webp", "gamma.webp"]);
    }

    #[test]
    fn test_idempotent() {
        let records = vec![
            record("b.png").with_size(10),
            record("a.png").with_size(2_500_000),
            record("c.txt"),
        ];
        let mapper = AssetMapper::new(TestResolver).with_naming(DisplayNaming::Numbered);

        assert_eq!(mapper.to_display_assets(&records), mapper.to_display_assets(&records));
    }

    #[test]
    fn test_numbered_naming() {
        let records = vec![record("b.png"), record("a.png")];
        let assets = AssetMapper::new(TestResolver)
            .with_naming(DisplayNaming::Numbered)
            .to_display_assets(&records);

        assert_eq!(assets[0].display_name, "Design #1");
        assert_eq!(assets[0].path, "a.png");
        assert_eq!(assets[1].display_name, "Design #2");
    }

    #[test]
    fn test_unresolvable_urls() {
        let assets = to_display_assets(&[record("a.png")], PrivateResolver);
        assert_eq!(assets[0].public_url, None);
        assert_eq!(assets[0].thumbnail_url, None);
    }

    #[test]
    fn test_empty_thumbnail_transform_uses_public_url() {
        let storage = StorageClient::new("https://example.supabase.co", "key", reqwest::Client::new());
        let resolver =
            BucketUrlResolver::new(storage, "designs").with_thumbnail(Some(ImageTransformOptions::new()));

        assert_eq!(
            resolver.thumbnail_url("a.png").as_deref(),
            Some("https://example.supabase.co/storage/v1/object/public/designs/a.png")
        );
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(None), "Unknown size");
        assert_eq!(format_file_size(Some(0)), "0 B");
        assert_eq!(format_file_size(Some(1023)), "1023 B");
        assert_eq!(format_file_size(Some(1024)), "1.0 KB");
        assert_eq!(format_file_size(Some(131_072)), "128.0 KB");
        assert_eq!(format_file_size(Some(5 * 1024 * 1024 + 512 * 1024)), "5.5 MB");
        assert_eq!(format_file_size(Some(3 * 1024 * 1024 * 1024)), "3.0 GB");
    }

    #[test]
    fn test_format_file_size_rounds_up_into_next_unit() {
        assert_eq!(format_file_size(Some(1_048_524)), "1023.9 KB");
        assert_eq!(format_file_size(Some(1_048_575)), "1.0 MB");
        assert_eq!(format_file_size(Some(1024 * 1024 * 1024 - 1)), "1.0 GB");
        assert_eq!(format_file_size(Some(1024u64.pow(4) - 1)), "1.0 TB");
        assert_eq!(format_file_size(Some(1024u64.pow(5))), "1024.0 TB");
    }

    #[test]
    fn test_bucket_url_resolver() {
        let storage = StorageClient::new("https://example.supabase.co", "key", reqwest::Client::new());
        let resolver = BucketUrlResolver::new(storage.clone(), "designs")
            .with_thumbnail(Some(ImageTransformOptions::new().with_width(400)));

        assert_eq!(
            resolver.public_url("a.png").as_deref(),
            Some("https://example.supabase.co/storage/v1/object/public/designs/a.png")
        );
        assert_eq!(
            resolver.thumbnail_url("a.png").as_deref(),
            Some("https://example.supabase.co/storage/v1/render/image/public/designs/a.png?width=400")
        );

        let private = BucketUrlResolver::new(storage, "designs").with_public(false);
        assert_eq!(private.public_url("a.png"), None);
        assert_eq!(private.thumbnail_url("a.png"), None);
    }
}
