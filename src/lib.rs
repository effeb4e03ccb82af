//! Quick Printz storefront client library
//!
//! The client side of the premade design gallery: it lists design images
//! from object storage, projects them into watermarked gallery tiles, keeps
//! a shared cart, and bulk-uploads new images to the image CDN.

pub mod cart;
pub mod config;
pub mod designs;
pub mod error;
pub mod fallback;
pub mod gallery;
pub mod uploads;

use std::sync::Arc;

use reqwest::Client;

use crate::cart::CartStore;
use crate::config::{StorefrontConfig, StorefrontOptions};
use crate::designs::{AssetMapper, BucketAssetLister, BucketUrlResolver};
use crate::error::{Error, Result};
use crate::fallback::{ErrorReporter, FallbackScreen, TracingReporter};
use crate::gallery::{Gallery, GallerySettings};
use crate::uploads::BulkImageUploader;
use quickprintz_storage::StorageClient;
use quickprintz_uploader::{UploadError, UploaderClient};

/// Gallery backed by the configured storage bucket
pub type DesignGallery = Gallery<BucketAssetLister, BucketUrlResolver>;

/// The main entry point for the storefront client
pub struct Storefront {
    /// Connection settings and options
    pub config: StorefrontConfig,
    /// HTTP client shared by every sub-client
    pub http_client: Client,
    storage: StorageClient,
    cart: CartStore,
    reporter: Arc<dyn ErrorReporter>,
}

impl Storefront {
    /// Create a new storefront client with default options
    ///
    /// # Example
    ///
    /// ```
    /// use quickprintz_storefront::Storefront;
    ///
    /// let storefront = Storefront::new("https://your-project-url.supabase.co", "your-anon-key").unwrap();
    /// let gallery = storefront.gallery();
    /// ```
    pub fn new(url: &str, anon_key: &str) -> Result<Self> {
        Self::from_config(StorefrontConfig::new(url, anon_key)?)
    }

    /// Create a storefront client from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_config(StorefrontConfig::from_env()?)
    }

    /// Create a storefront client from an explicit configuration
    ///
    /// # Example
    ///
    /// ```
    /// use quickprintz_storefront::config::{StorefrontConfig, StorefrontOptions};
    /// use quickprintz_storefront::Storefront;
    ///
    /// let config = StorefrontConfig::new("https://your-project-url.supabase.co", "your-anon-key")
    ///     .unwrap()
    ///     .with_options(StorefrontOptions::default().with_prefix("4x5").with_unit_price_cents(2000));
    /// let storefront = Storefront::from_config(config).unwrap();
    /// assert_eq!(storefront.options().prefix, "4x5");
    /// ```
    pub fn from_config(config: StorefrontConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.options.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build()?;

        let storage = StorageClient::new(config.url.as_str(), &config.anon_key, http_client.clone());

        Ok(Self {
            config,
            http_client,
            storage,
            cart: CartStore::new(),
            reporter: Arc::new(TracingReporter),
        })
    }

    /// Replace the reporter that receives unexpected errors in production
    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn options(&self) -> &StorefrontOptions {
        &self.config.options
    }

    /// Get a reference to the storage client
    pub fn storage(&self) -> &StorageClient {
        &self.storage
    }

    /// Lister for the configured design bucket
    pub fn designs(&self) -> BucketAssetLister {
        BucketAssetLister::new(self.storage.clone(), &self.options().bucket)
            .with_page_size(self.options().page_size)
    }

    /// URL resolver for the configured design bucket
    pub fn url_resolver(&self) -> BucketUrlResolver {
        BucketUrlResolver::new(self.storage.clone(), &self.options().bucket)
            .with_public(self.options().public_bucket)
            .with_thumbnail(self.options().thumbnail.clone())
    }

    /// Mapper using the configured image policy and naming
    pub fn mapper(&self) -> AssetMapper<BucketUrlResolver> {
        AssetMapper::new(self.url_resolver())
            .with_policy(self.options().image_policy)
            .with_naming(self.options().naming)
    }

    /// A fresh gallery. Call [`Gallery::mount`] to start loading.
    pub fn gallery(&self) -> DesignGallery {
        Gallery::new(
            self.designs(),
            self.mapper(),
            GallerySettings::from(self.options()),
        )
    }

    /// Handle to the shared cart
    pub fn cart(&self) -> CartStore {
        self.cart.clone()
    }

    /// Bulk uploader for the configured image CDN
    pub fn uploader(&self) -> Result<BulkImageUploader> {
        let settings = self
            .options()
            .upload
            .as_ref()
            .ok_or_else(|| Error::config("image upload is not configured"))?;
        let client = UploaderClient::new(
            &settings.cloud_name,
            &settings.upload_preset,
            self.http_client.clone(),
        )
        .map_err(|err| match err {
            UploadError::ConfigError(message) => Error::Config(message),
            other => other.into(),
        })?;
        Ok(BulkImageUploader::new(client))
    }

    /// Handle an unexpected error and build the fallback screen
    pub fn catch_unexpected(&self, err: &(dyn std::error::Error + 'static)) -> FallbackScreen {
        fallback::catch_unexpected(err, self.options().environment, self.reporter.as_ref())
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::cart::{CartItem, CartStore};
    pub use crate::config::{Environment, StorefrontConfig, StorefrontOptions};
    pub use crate::designs::{AssetLister, DisplayAsset, FetchError, RemoteObjectRecord};
    pub use crate::error::Error;
    pub use crate::gallery::{GalleryState, GalleryView};
    pub use crate::{DesignGallery, Storefront};
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;

    #[test]
    fn test_uploader_requires_settings() {
        let storefront = Storefront::new("https://example.supabase.co", "anon").unwrap();
        assert!(matches!(storefront.uploader(), Err(Error::Config(_))));
    }

    #[test]
    fn test_uploader_from_settings() {
        let config = StorefrontConfig::new("https://example.supabase.co", "anon")
            .unwrap()
            .with_options(StorefrontOptions::default().with_upload("quickprintz", "unsigned"));
        let storefront = Storefront::from_config(config).unwrap();

        assert!(storefront.uploader().is_ok());
    }

    #[test]
    fn test_uploader_rejects_blank_cloud_name() {
        let config = StorefrontConfig::new("https://example.supabase.co", "anon")
            .unwrap()
            .with_options(StorefrontOptions::default().with_upload(" ", "unsigned"));
        let storefront = Storefront::from_config(config).unwrap();

        match storefront.uploader() {
            Err(Error::Config(message)) => assert_eq!(message, "cloud name cannot be empty"),
            other => panic!("Expected config error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_cart_is_shared() {
        let storefront = Storefront::new("https://example.supabase.co", "anon").unwrap();
        storefront.cart().add(cart::CartItem::new("premade-a.png", "a.png", 2500));

        assert_eq!(storefront.cart().total_quantity(), 1);
    }

    #[test]
    fn test_catch_unexpected_uses_environment() {
        let config = StorefrontConfig::new("https://example.supabase.co", "anon")
            .unwrap()
            .with_options(StorefrontOptions::default().with_environment(Environment::Development));
        let storefront = Storefront::from_config(config).unwrap();

        let screen = storefront.catch_unexpected(&Error::general("boom"));
        assert_eq!(screen.details.as_deref(), Some("boom"));
    }
}
