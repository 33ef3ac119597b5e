//! Mini-app storefront core - shared domain types.
//!
//! This crate provides the types used across the storefront workspace:
//! - `storefront` - HTTP backend serving the chat mini-app
//! - `integration-tests` - end-to-end tests against a fake POS server
//!
//! # Architecture
//!
//! The core crate contains only types and pure helpers - no I/O, no HTTP
//! clients, no persistence. Everything here can be unit tested in isolation.
//!
//! # Modules
//!
//! - [`types`] - Identifiers, money, catalog, orders, delivery and session claims

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
