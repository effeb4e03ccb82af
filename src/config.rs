//! Configuration options for the storefront client

use std::time::Duration;
use url::Url;

use crate::designs::{DisplayNaming, ImagePolicy};
use crate::error::{Error, Result};
use quickprintz_storage::ImageTransformOptions;

/// Build environment the storefront runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    /// Parse an `APP_ENV` style value. Anything other than a development
    /// spelling counts as production.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" | "local" => Environment::Development,
            _ => Environment::Production,
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

/// Image CDN upload settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSettings {
    /// Cloud name used to build the upload endpoint
    pub cloud_name: String,

    /// Unsigned upload preset identifier
    pub upload_preset: String,
}

/// Configuration options for the storefront client
#[derive(Debug, Clone)]
pub struct StorefrontOptions {
    /// Bucket holding the premade design images
    pub bucket: String,

    /// Folder inside the bucket to list; empty lists the root
    pub prefix: String,

    /// Whether the bucket serves public URLs
    pub public_bucket: bool,

    /// Which file extensions count as displayable images
    pub image_policy: ImagePolicy,

    /// How tile titles are generated
    pub naming: DisplayNaming,

    /// Image transform used for thumbnails; full-size URLs when `None`
    pub thumbnail: Option<ImageTransformOptions>,

    /// Number of skeleton tiles shown while loading
    pub placeholder_count: usize,

    /// Price of one premade design, in cents
    pub unit_price_cents: u32,

    /// Logo drawn over every preview
    pub logo_watermark: String,

    /// Image shown when a preview fails to load
    pub placeholder_image: String,

    /// Listing page size
    pub page_size: u32,

    /// The request timeout
    pub request_timeout: Option<Duration>,

    /// The build environment
    pub environment: Environment,

    /// Image CDN settings for the bulk uploader
    pub upload: Option<UploadSettings>,
}

impl Default for StorefrontOptions {
    fn default() -> Self {
        Self {
            bucket: "designs".to_string(),
            prefix: String::new(),
            public_bucket: true,
            image_policy: ImagePolicy::Strict,
            naming: DisplayNaming::FileName,
            thumbnail: None,
            placeholder_count: 8,
            unit_price_cents: 2500,
            logo_watermark: "/quickprintz_assets/quickprintz-512.png".to_string(),
            placeholder_image: "/placeholder.svg".to_string(),
            page_size: quickprintz_storage::DEFAULT_PAGE_SIZE,
            request_timeout: Some(Duration::from_secs(30)),
            environment: Environment::Production,
            upload: None,
        }
    }
}

impl StorefrontOptions {
    /// Set the design bucket
    pub fn with_bucket(mut self, value: &str) -> Self {
        self.bucket = value.to_string();
        self
    }

    /// Set the listing prefix
    pub fn with_prefix(mut self, value: &str) -> Self {
        self.prefix = value.trim_matches('/').to_string();
        self
    }

    /// Set whether the bucket is public
    pub fn with_public_bucket(mut self, value: bool) -> Self {
        self.public_bucket = value;
        self
    }

    pub fn with_image_policy(mut self, value: ImagePolicy) -> Self {
        self.image_policy = value;
        self
    }

    pub fn with_naming(mut self, value: DisplayNaming) -> Self {
        self.naming = value;
        self
    }

    /// Set the thumbnail transform
    pub fn with_thumbnail(mut self, value: Option<ImageTransformOptions>) -> Self {
        self.thumbnail = value;
        self
    }

    pub fn with_placeholder_count(mut self, value: usize) -> Self {
        self.placeholder_count = value;
        self
    }

    /// Set the unit price in cents
    pub fn with_unit_price_cents(mut self, value: u32) -> Self {
        self.unit_price_cents = value;
        self
    }

    pub fn with_logo_watermark(mut self, value: &str) -> Self {
        self.logo_watermark = value.to_string();
        self
    }

    pub fn with_placeholder_image(mut self, value: &str) -> Self {
        self.placeholder_image = value.to_string();
        self
    }

    pub fn with_page_size(mut self, value: u32) -> Self {
        self.page_size = value;
        self
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    pub fn with_environment(mut self, value: Environment) -> Self {
        self.environment = value;
        self
    }

    /// Set the image CDN upload settings
    pub fn with_upload(mut self, cloud_name: &str, upload_preset: &str) -> Self {
        self.upload = Some(UploadSettings {
            cloud_name: cloud_name.to_string(),
            upload_preset: upload_preset.to_string(),
        });
        self
    }
}

/// Connection settings for the storefront.
/// Load these from environment variables rather than hard-coding keys.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    pub url: Url,
    pub anon_key: String,
    pub options: StorefrontOptions,
}

impl StorefrontConfig {
    /// Creates a new configuration, validating the URL.
    pub fn new(url_str: &str, anon_key: &str) -> Result<Self> {
        let url = Url::parse(url_str)?;
        if anon_key.trim().is_empty() {
            return Err(Error::config("anon_key cannot be empty"));
        }
        Ok(Self {
            url,
            anon_key: anon_key.to_string(),
            options: StorefrontOptions::default(),
        })
    }

    pub fn with_options(mut self, options: StorefrontOptions) -> Self {
        self.options = options;
        self
    }

    /// Reads the configuration from environment variables.
    ///
    /// `SUPABASE_URL` and `SUPABASE_ANON_KEY` are required. `DESIGNS_BUCKET`,
    /// `DESIGNS_PREFIX`, `APP_ENV`, and the `CLOUDINARY_CLOUD_NAME` /
    /// `CLOUDINARY_UPLOAD_PRESET` pair are optional.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup("SUPABASE_URL")
            .ok_or_else(|| Error::config("SUPABASE_URL environment variable not found"))?;
        let anon_key = lookup("SUPABASE_ANON_KEY")
            .ok_or_else(|| Error::config("SUPABASE_ANON_KEY environment variable not found"))?;

        let mut options = StorefrontOptions::default();
        if let Some(bucket) = lookup("DESIGNS_BUCKET").filter(|v| !v.trim().is_empty()) {
            options = options.with_bucket(bucket.trim());
        }
        if let Some(prefix) = lookup("DESIGNS_PREFIX") {
            options = options.with_prefix(&prefix);
        }
        if let Some(env) = lookup("APP_ENV") {
            options = options.with_environment(Environment::parse(&env));
        }
        match (lookup("CLOUDINARY_CLOUD_NAME"), lookup("CLOUDINARY_UPLOAD_PRESET")) {
            (Some(cloud), Some(preset)) => options = options.with_upload(&cloud, &preset),
            (None, None) => {}
            _ => {
                return Err(Error::config(
                    "CLOUDINARY_CLOUD_NAME and CLOUDINARY_UPLOAD_PRESET must be set together",
                ))
            }
        }

        Ok(Self::new(&url, &anon_key)?.with_options(options))
    }
}
