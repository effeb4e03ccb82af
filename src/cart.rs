//! Client-side cart shared by every view that sells designs

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tracing::debug;

use crate::designs::DisplayAsset;

/// Formats a price in cents: "$25" for whole dollars, "$25.50" otherwise
pub fn format_price(cents: u32) -> String {
    let (dollars, rest) = (cents / 100, cents % 100);
    if rest == 0 {
        format!("${}", dollars)
    } else {
        format!("${}.{:02}", dollars, rest)
    }
}

/// One line of the cart
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartItem {
    /// Merge key; adding an item with an existing id bumps its quantity
    pub id: String,
    pub name: String,
    /// Unit price in cents
    pub price_cents: u32,
    pub quantity: u32,
    pub image: Option<String>,
    /// Free-form labels shown with the line
    pub metadata: BTreeMap<String, String>,
}

impl CartItem {
    pub fn new(id: &str, name: &str, price_cents: u32) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            price_cents,
            quantity: 1,
            image: None,
            metadata: BTreeMap::new(),
        }
    }

    /// A premade design line, keyed by `premade-<path>`
    pub fn premade(asset: &DisplayAsset, price_cents: u32) -> Self {
        let mut item = Self::new(&format!("premade-{}", asset.path), &asset.display_name, price_cents);
        item.image = asset.thumbnail_url.clone().or_else(|| asset.public_url.clone());
        item.metadata
            .insert("Type".to_string(), "Premade Design".to_string());
        item
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn line_total_cents(&self) -> u64 {
        u64::from(self.price_cents) * u64::from(self.quantity)
    }
}

/// Shared cart handle. Clones see the same lines.
///
/// `add` is the only mutation; it merges by id under the lock so concurrent
/// adds never lose an update.
#[derive(Debug, Clone, Default)]
pub struct CartStore {
    lines: Arc<Mutex<Vec<CartItem>>>,
}

impl CartStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<CartItem>> {
        // A panic elsewhere cannot leave a half-merged line behind, so a
        // poisoned lock still holds consistent data.
        self.lines.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Inserts the item, or adds its quantity to the line with the same id.
    /// A zero quantity counts as one.
    pub fn add(&self, item: CartItem) {
        let quantity = item.quantity.max(1);
        let mut lines = self.lock();

        match lines.iter_mut().find(|line| line.id == item.id) {
            Some(line) => {
                line.quantity = line.quantity.saturating_add(quantity);
                debug!(id = %line.id, quantity = line.quantity, "merged cart line");
            }
            None => {
                debug!(id = %item.id, "added cart line");
                lines.push(CartItem { quantity, ..item });
            }
        }
    }

    /// Snapshot of the lines in insertion order
    pub fn items(&self) -> Vec<CartItem> {
        self.lock().clone()
    }

    pub fn line_count(&self) -> usize {
        self.lock().len()
    }

    pub fn total_quantity(&self) -> u64 {
        self.lock().iter().map(|line| u64::from(line.quantity)).sum()
    }

    pub fn subtotal_cents(&self) -> u64 {
        self.lock().iter().map(CartItem::line_total_cents).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
