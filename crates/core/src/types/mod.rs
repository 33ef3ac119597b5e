//! Core types for the mini-app storefront.
//!
//! This module provides type-safe wrappers for the domain concepts shared by
//! the backend and its tests.

pub mod catalog;
pub mod id;
pub mod order;
pub mod price;
pub mod session;
pub mod status;

pub use catalog::{Catalog, Category, DEFAULT_CATEGORY_ID, DEFAULT_CATEGORY_NAME, Product};
pub use id::*;
pub use order::{COURIER_METHOD, Delivery, OrderDelivery, OrderLine, OrderRecord};
pub use price::Price;
pub use session::{SessionClaims, UserRecord};
pub use status::*;
