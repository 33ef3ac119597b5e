//! Catalog synchronization with the POS system.
//!
//! A sync pulls the nomenclature and the selected price list, merges them
//! into a priced [`Catalog`], and replaces the stored menu wholesale. Any
//! upstream failure leaves the stored menu untouched; callers that need a
//! menu regardless use [`CatalogSync::sync_or_fallback`].

use std::collections::HashMap;

use tracing::instrument;

use miniapp_core::{
    Catalog, Category, CategoryId, DEFAULT_CATEGORY_ID, DEFAULT_CATEGORY_NAME, Price, Product,
    ProductId,
};

use crate::db::Store;
use crate::pos::{Nomenclature, PosClient, PosError, PriceListItem, PriceListSummary};

/// Number of products listed individually in the sync log.
const LOGGED_PRODUCTS: usize = 40;

/// Which of the organization's price lists prices the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PriceListPolicy {
    /// The first list the POS system returns.
    #[default]
    First,
    /// The first list whose name matches, ignoring case; the first list if none does.
    Named(String),
}

impl PriceListPolicy {
    /// Pick a price list, or `None` if there are none.
    #[must_use]
    pub fn select<'a>(&self, lists: &'a [PriceListSummary]) -> Option<&'a PriceListSummary> {
        match self {
            Self::First => lists.first(),
            Self::Named(name) => lists
                .iter()
                .find(|l| l.name.to_lowercase() == name.to_lowercase())
                .or_else(|| lists.first()),
        }
    }
}

/// Collect `productId → price` from price-list items, skipping incomplete entries.
#[must_use]
pub fn price_map(items: &[PriceListItem]) -> HashMap<String, f64> {
    items
        .iter()
        .filter_map(|item| Some((item.product_id.clone()?, item.price?)))
        .collect()
}

/// Merge a nomenclature with a price map into a catalog.
///
/// Deleted products are dropped; menu-inclusion flags are ignored. A product
/// is priced from the price map, then from its first positive size price,
/// and dropped if the result is not positive. Categories are the distinct
/// category ids of the surviving products, in first-appearance order.
#[must_use]
pub fn build_catalog(nomenclature: &Nomenclature, prices: &HashMap<String, f64>) -> Catalog {
    let mut category_names: HashMap<&str, &str> = HashMap::new();
    for group in &nomenclature.groups {
        category_names.insert(&group.id, &group.name);
    }
    // Product categories take precedence over groups.
    for category in &nomenclature.product_categories {
        category_names.insert(&category.id, &category.name);
    }

    let category_name = |id: &str| {
        category_names
            .get(id)
            .filter(|name| !name.is_empty())
            .map_or(DEFAULT_CATEGORY_NAME, |name| *name)
            .to_string()
    };

    let mut categories: Vec<Category> = Vec::new();
    let mut products = Vec::new();

    for item in nomenclature.products.iter().filter(|p| !p.is_deleted) {
        let raw_price = prices
            .get(&item.id)
            .copied()
            .or_else(|| item.first_positive_size_price())
            .unwrap_or(0.0);
        let Some(price) = Price::from_f64(raw_price).map(Price::round2) else {
            continue;
        };
        if !price.is_positive() {
            continue;
        }

        let category_id = item
            .parent_group
            .as_deref()
            .filter(|id| !id.is_empty())
            .unwrap_or(DEFAULT_CATEGORY_ID);
        let name = category_name(category_id);

        if !categories.iter().any(|c| c.id.as_str() == category_id) {
            categories.push(Category {
                id: CategoryId::new(category_id),
                name: name.clone(),
            });
        }

        products.push(Product {
            id: ProductId::new(item.id.as_str()),
            name: item.name.clone(),
            price,
            category_id: CategoryId::new(category_id),
            category_name: name,
        });
    }

    Catalog {
        categories,
        products,
    }
}

/// Pulls the catalog from the POS system into the store.
#[derive(Clone)]
pub struct CatalogSync {
    pos: PosClient,
    store: Store,
}

impl CatalogSync {
    /// Create a synchronizer over a POS client and a store.
    #[must_use]
    pub const fn new(pos: PosClient, store: Store) -> Self {
        Self { pos, store }
    }

    /// Fetch, merge, and store the catalog.
    ///
    /// Returns `None` if the POS system could not be reached or answered
    /// with something unusable; the stored catalog is then left as it was.
    #[instrument(skip(self))]
    pub async fn sync(&self) -> Option<Catalog> {
        let catalog = match self.fetch().await {
            Ok(catalog) => catalog,
            Err(PosError::NotConfigured) => {
                tracing::debug!("POS not configured, skipping catalog sync");
                return None;
            }
            Err(e) => {
                tracing::error!(error = %e, "Catalog sync failed");
                return None;
            }
        };

        for (i, product) in catalog.products.iter().take(LOGGED_PRODUCTS).enumerate() {
            tracing::debug!(
                index = i,
                name = %product.name,
                price = %product.price,
                category = %product.category_name,
                "Synced product"
            );
        }
        tracing::info!(
            categories = catalog.categories.len(),
            products = catalog.products.len(),
            "Catalog synced"
        );

        let stored = catalog.clone();
        if let Err(e) = self.store.with_catalog(|menu| *menu = stored).await {
            tracing::error!(error = %e, "Failed to store synced catalog");
            return None;
        }

        Some(catalog)
    }

    /// Sync, or store and return the static fallback catalog if the sync fails.
    ///
    /// The flag is `true` when the catalog came from the POS system.
    #[instrument(skip(self))]
    pub async fn sync_or_fallback(&self) -> (bool, Catalog) {
        if let Some(catalog) = self.sync().await {
            return (true, catalog);
        }

        tracing::warn!("Using fallback catalog");
        let fallback = Catalog::fallback();
        let stored = fallback.clone();
        if let Err(e) = self.store.with_catalog(|menu| *menu = stored).await {
            tracing::error!(error = %e, "Failed to store fallback catalog");
        }
        (false, fallback)
    }

    async fn fetch(&self) -> Result<Catalog, PosError> {
        let nomenclature = self.pos.nomenclature().await?;
        tracing::debug!(
            products = nomenclature.products.len(),
            categories = nomenclature.product_categories.len(),
            groups = nomenclature.groups.len(),
            "Nomenclature loaded"
        );

        let prices = self.fetch_prices().await;
        Ok(build_catalog(&nomenclature, &prices))
    }

    /// Prices from the selected price list.
    ///
    /// A failed price-list request yields an empty map so products fall back
    /// to their size prices.
    async fn fetch_prices(&self) -> HashMap<String, f64> {
        let lists = match self.pos.price_lists().await {
            Ok(lists) => lists,
            Err(e) => {
                tracing::warn!(error = %e, "Price lists unavailable, pricing from size prices");
                return HashMap::new();
            }
        };

        let Some(list) = self.pos.price_list_policy().select(&lists) else {
            tracing::debug!("No price lists, pricing from size prices");
            return HashMap::new();
        };
        tracing::debug!(id = %list.id, name = %list.name, "Using price list");

        match self.pos.price_list_items(&list.id).await {
            Ok(items) => price_map(&items),
            Err(e) => {
                tracing::warn!(
                    id = %list.id,
                    error = %e,
                    "Price list items unavailable, pricing from size prices"
                );
                HashMap::new()
            }
        }
    }
}
