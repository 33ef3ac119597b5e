//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::StorefrontConfig;
use crate::db::Store;
use crate::pos::PosClient;
use crate::services::{CatalogSync, OrderPipeline, PosRelay};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// document store, the POS client, and the services built on them.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    store: Store,
    pos: PosClient,
    catalog: CatalogSync,
    orders: OrderPipeline,
    relay: PosRelay,
}

impl AppState {
    /// Create a new application state and start the POS relay worker.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn new(config: StorefrontConfig, store: Store) -> Self {
        let pos = PosClient::new(config.pos.clone());
        let relay = PosRelay::spawn(pos.clone(), store.clone(), config.relay_queue_capacity);
        let catalog = CatalogSync::new(pos.clone(), store.clone());
        let orders = OrderPipeline::new(config.bot_token.clone(), store.clone(), relay.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                pos,
                catalog,
                orders,
                relay,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the document store.
    #[must_use]
    pub fn store(&self) -> &Store {
        &self.inner.store
    }

    /// Get a reference to the POS API client.
    #[must_use]
    pub fn pos(&self) -> &PosClient {
        &self.inner.pos
    }

    /// Get a reference to the catalog synchronizer.
    #[must_use]
    pub fn catalog(&self) -> &CatalogSync {
        &self.inner.catalog
    }

    /// Get a reference to the checkout pipeline.
    #[must_use]
    pub fn orders(&self) -> &OrderPipeline {
        &self.inner.orders
    }

    /// Get a reference to the POS relay.
    #[must_use]
    pub fn relay(&self) -> &PosRelay {
        &self.inner.relay
    }
}
