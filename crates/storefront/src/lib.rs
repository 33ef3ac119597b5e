//! Mini-app storefront library.
//!
//! Serves a chat-platform mini-app: verifies signed launch payloads, keeps
//! the menu in sync with the restaurant's POS system, accepts checkouts, and
//! relays placed orders to the POS system in the background. Built as a
//! library so the HTTP surface can be tested in-process.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod pos;
pub mod routes;
pub mod services;
pub mod state;
