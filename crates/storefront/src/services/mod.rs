//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Launch payload (`initData`) verification
//! - `catalog` - Catalog synchronization with the POS system
//! - `orders` - Checkout validation, pricing, and persistence
//! - `relay` - Background hand-off of placed orders to the POS system

pub mod auth;
pub mod catalog;
pub mod orders;
pub mod relay;

pub use catalog::{CatalogSync, PriceListPolicy};
pub use orders::{CheckoutRequest, OrderError, OrderPipeline, PlacedOrder};
pub use relay::{PosRelay, RelayJob, RelayOutcome};
