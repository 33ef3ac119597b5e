//! POS cloud API client.
//!
//! The storefront talks to the restaurant's POS system for two things: pulling
//! the nomenclature and price lists the menu is built from, and pushing placed
//! orders as deliveries.
//!
//! # Architecture
//!
//! - API login → 10-minute bearer token, cached in memory for 9 minutes
//! - Plain JSON over HTTPS via `reqwest`
//! - Optional: without configuration every call fails with
//!   [`PosError::NotConfigured`] and the storefront serves its fallback menu

pub mod auth;
pub mod client;
pub mod types;

pub use client::PosClient;
pub use types::*;

use thiserror::Error;

/// Errors that can occur when interacting with the POS API.
#[derive(Debug, Error)]
pub enum PosError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The API answered with a non-success status.
    #[error("POS API returned {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Truncated response body.
        message: String,
    },

    /// An endpoint URL could not be built from the configured base.
    #[error("Invalid POS URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Token exchange was rejected.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// No POS integration configured.
    #[error("POS integration not configured")]
    NotConfigured,
}
