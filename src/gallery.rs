//! Premade design gallery: fetch lifecycle and render model
//!
//! The gallery owns an explicit [`GalleryState`]. A fetch moves it to
//! `Loading` and then to `Loaded` or `Failed`; a manual refresh re-enters
//! `Loading` from either terminal state. [`Gallery::view`] turns the current
//! state into a [`GalleryView`] that a renderer can draw without further
//! decisions.

use std::collections::HashSet;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cart::{format_price, CartItem, CartStore};
use crate::config::StorefrontOptions;
use crate::designs::{AssetLister, AssetMapper, DisplayAsset, FetchError, UrlResolver};

pub const LOADING_LABEL: &str = "Loading designs…";
pub const EMPTY_LABEL: &str = "No designs found";
pub const EMPTY_STATE_MESSAGE: &str =
    "No designs available yet. Upload assets to the design bucket to populate this view.";
pub const FETCHING_MESSAGE: &str = "Fetching latest designs…";
pub const ERROR_TITLE: &str = "Unable to load designs";
pub const ERROR_HINT: &str = "Double-check your storage credentials and bucket permissions.";
pub const PREVIEW_UNAVAILABLE: &str = "Preview unavailable";

/// Fetch lifecycle of the gallery
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GalleryState {
    #[default]
    Idle,
    Loading,
    Loaded(Vec<DisplayAsset>),
    Failed(FetchError),
}

impl GalleryState {
    pub fn is_loading(&self) -> bool {
        matches!(self, GalleryState::Loading)
    }

    /// Loaded assets; empty in every other state
    pub fn assets(&self) -> &[DisplayAsset] {
        match self {
            GalleryState::Loaded(assets) => assets,
            _ => &[],
        }
    }

    pub fn error(&self) -> Option<&FetchError> {
        match self {
            GalleryState::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Settings the gallery needs from the storefront options
#[derive(Debug, Clone)]
pub struct GallerySettings {
    pub prefix: Option<String>,
    pub placeholder_count: usize,
    pub unit_price_cents: u32,
    pub logo_watermark: String,
    pub placeholder_image: String,
}

impl Default for GallerySettings {
    fn default() -> Self {
        Self::from(&StorefrontOptions::default())
    }
}

impl From<&StorefrontOptions> for GallerySettings {
    fn from(options: &StorefrontOptions) -> Self {
        Self {
            prefix: Some(options.prefix.clone()).filter(|p| !p.is_empty()),
            placeholder_count: options.placeholder_count,
            unit_price_cents: options.unit_price_cents,
            logo_watermark: options.logo_watermark.clone(),
            placeholder_image: options.placeholder_image.clone(),
        }
    }
}

/// Refresh button
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshControl {
    pub label: &'static str,
    pub enabled: bool,
}

/// Dismissible error banner
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBanner {
    pub title: &'static str,
    pub message: String,
    pub hint: &'static str,
}

/// Overlays drawn on every preview
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Watermark {
    /// Diagonal pattern across the whole image
    pub diagonal_overlay: bool,
    /// Logo centered on the image
    pub logo_src: String,
}

/// Preview image of a tile
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TileImage {
    pub src: String,
    pub alt: String,
    pub lazy: bool,
    pub draggable: bool,
    pub context_menu: bool,
    pub watermark: Watermark,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Preview {
    Image(TileImage),
    Unavailable(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TileAction {
    AddToCart { label: String, price_cents: u32 },
}

/// One card in the grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tile {
    pub key: String,
    pub title: String,
    pub size_label: String,
    pub price_label: String,
    pub preview: Preview,
    /// Opens the full-size image in a new tab
    pub full_size_url: Option<String>,
    pub action: TileAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum GalleryBody {
    Placeholders(usize),
    Empty(&'static str),
    Tiles(Vec<Tile>),
}

/// Everything a renderer needs to draw the gallery
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GalleryView {
    pub count_label: String,
    pub refresh: RefreshControl,
    pub banner: Option<ErrorBanner>,
    pub body: GalleryBody,
    pub loading_message: Option<&'static str>,
}

impl GalleryView {
    pub fn tiles(&self) -> &[Tile] {
        match &self.body {
            GalleryBody::Tiles(tiles) => tiles,
            _ => &[],
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    state: GalleryState,
    generation: u64,
    mounted: bool,
    banner_dismissed: bool,
    failed_images: HashSet<String>,
}

/// Design gallery over an asset lister and a mapper
pub struct Gallery<L, R> {
    lister: L,
    mapper: AssetMapper<R>,
    settings: GallerySettings,
    inner: Mutex<Inner>,
}

impl<L: AssetLister, R: UrlResolver> Gallery<L, R> {
    pub fn new(lister: L, mapper: AssetMapper<R>, settings: GallerySettings) -> Self {
        Self {
            lister,
            mapper,
            settings,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Marks the gallery as shown and starts the first fetch
    pub async fn mount(&self) -> bool {
        self.inner.lock().await.mounted = true;
        self.refresh().await
    }

    /// Marks the gallery as gone. A fetch still in flight is discarded when
    /// it completes.
    pub async fn unmount(&self) {
        let mut inner = self.inner.lock().await;
        inner.mounted = false;
        inner.generation += 1;
        inner.state = GalleryState::Idle;
    }

    /// Re-runs the listing.
    ///
    /// Returns `false` without fetching while unmounted or while a fetch is
    /// already running, and `false` when the result arrived too late to be
    /// applied.
    pub async fn refresh(&self) -> bool {
        let generation = {
            let mut inner = self.inner.lock().await;
            if !inner.mounted || inner.state.is_loading() {
                return false;
            }
            inner.generation += 1;
            inner.state = GalleryState::Loading;
            inner.banner_dismissed = false;
            inner.failed_images.clear();
            inner.generation
        };

        debug!(generation, "fetching designs");
        let result = self.lister.list_assets(self.settings.prefix.as_deref()).await;

        let mut inner = self.inner.lock().await;
        if !inner.mounted || inner.generation != generation {
            debug!(generation, "discarding stale design listing");
            return false;
        }

        inner.state = match result {
            Ok(records) => {
                let assets = self.mapper.to_display_assets(&records);
                info!(records = records.len(), designs = assets.len(), "designs loaded");
                GalleryState::Loaded(assets)
            }
            Err(err) => {
                warn!(kind = ?err.kind, error = %err, "failed to load designs");
                GalleryState::Failed(err)
            }
        };
        true
    }

    /// Hides the error banner until the next fetch
    pub async fn dismiss_error(&self) {
        self.inner.lock().await.banner_dismissed = true;
    }

    /// Records that a preview failed to load; its tile falls back to the
    /// placeholder image.
    pub async fn report_image_error(&self, path: &str) {
        let mut inner = self.inner.lock().await;
        if inner.state.assets().iter().any(|a| a.path == path) {
            debug!(path, "preview failed, using placeholder");
            inner.failed_images.insert(path.to_string());
        }
    }

    pub async fn state(&self) -> GalleryState {
        self.inner.lock().await.state.clone()
    }

    /// Adds the design at `path` to the cart. Returns `false` if no loaded
    /// design has that path.
    pub async fn add_to_cart(&self, path: &str, cart: &CartStore) -> bool {
        let inner = self.inner.lock().await;
        match inner.state.assets().iter().find(|a| a.path == path) {
            Some(asset) => {
                cart.add(CartItem::premade(asset, self.settings.unit_price_cents));
                true
            }
            None => false,
        }
    }

    pub async fn view(&self) -> GalleryView {
        let inner = self.inner.lock().await;
        let loading = inner.state.is_loading();

        let count_label = match &inner.state {
            GalleryState::Idle | GalleryState::Loading => LOADING_LABEL.to_string(),
            GalleryState::Loaded(assets) if assets.len() == 1 => "1 design available".to_string(),
            GalleryState::Loaded(assets) if !assets.is_empty() => {
                format!("{} designs available", assets.len())
            }
            _ => EMPTY_LABEL.to_string(),
        };

        let banner = match inner.state.error() {
            Some(err) if !inner.banner_dismissed => Some(ErrorBanner {
                title: ERROR_TITLE,
                message: err.message.clone(),
                hint: ERROR_HINT,
            }),
            _ => None,
        };

        let body = match &inner.state {
            GalleryState::Idle | GalleryState::Loading => {
                GalleryBody::Placeholders(self.settings.placeholder_count)
            }
            GalleryState::Loaded(assets) if !assets.is_empty() => GalleryBody::Tiles(
                assets
                    .iter()
                    .map(|asset| self.tile(asset, inner.failed_images.contains(&asset.path)))
                    .collect(),
            ),
            _ => GalleryBody::Empty(EMPTY_STATE_MESSAGE),
        };

        GalleryView {
            count_label,
            refresh: RefreshControl {
                label: if loading { "Refreshing" } else { "Refresh" },
                enabled: !loading,
            },
            banner,
            body,
            loading_message: loading.then_some(FETCHING_MESSAGE),
        }
    }

    fn tile(&self, asset: &DisplayAsset, image_failed: bool) -> Tile {
        let price_label = format_price(self.settings.unit_price_cents);

        let source = asset.thumbnail_url.as_ref().or(asset.public_url.as_ref());
        let preview = match source {
            Some(src) if asset.is_image => Preview::Image(TileImage {
                src: if image_failed {
                    self.settings.placeholder_image.clone()
                } else {
                    src.clone()
                },
                alt: asset.display_name.clone(),
                lazy: true,
                draggable: false,
                context_menu: false,
                watermark: Watermark {
                    diagonal_overlay: true,
                    logo_src: self.settings.logo_watermark.clone(),
                },
            }),
            _ => Preview::Unavailable(PREVIEW_UNAVAILABLE),
        };

        Tile {
            key: asset.path.clone(),
            title: asset.display_name.clone(),
            size_label: asset.size_label.clone(),
            action: TileAction::AddToCart {
                label: format!("Add to Cart - {}", price_label),
                price_cents: self.settings.unit_price_cents,
            },
            price_label,
            preview,
            full_size_url: asset.public_url.clone(),
        }
    }
}
