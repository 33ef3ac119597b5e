//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required for authenticated requests
//! - `BOT_TOKEN` - Chat bot token; the key launch payloads are signed with
//!
//! ## POS integration (all optional; absence means offline mode)
//! - `POS_API_BASE` - Base URL of the POS cloud API
//! - `POS_API_LOGIN` - API login exchanged for short-lived access tokens
//! - `POS_ORG_ID` - POS organization id
//! - `POS_PRICE_LIST` - Name of the price list to price the catalog with
//!   (default: the first one the POS system returns)
//!
//! ## Optional
//! - `HOST` - Bind address (default: 0.0.0.0)
//! - `PORT` - Listen port (default: 3000)
//! - `DB_PATH` - JSON document store path (default: .db.json)
//! - `STATIC_DIR` - Mini-app static files (default: public)
//! - `RELAY_QUEUE_CAPACITY` - Pending POS relay jobs (default: 64)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

use crate::services::catalog::PriceListPolicy;

/// Key used when `BOT_TOKEN` is not set; no genuine payload verifies against it.
pub const MISSING_BOT_TOKEN: &str = "MISSING_BOT_TOKEN";

const DEFAULT_RELAY_QUEUE_CAPACITY: usize = 64;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Bot token used to verify launch payload signatures
    pub bot_token: SecretString,
    /// POS integration; `None` runs the storefront on the fallback catalog
    pub pos: Option<PosConfig>,
    /// Path of the JSON document store
    pub store_path: PathBuf,
    /// Directory with the mini-app's static files
    pub static_dir: PathBuf,
    /// Capacity of the POS relay job queue
    pub relay_queue_capacity: usize,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// POS cloud API configuration.
///
/// Implements `Debug` manually to redact the API login.
#[derive(Clone)]
pub struct PosConfig {
    /// Base URL, e.g. `https://api-ru.iiko.services`
    pub api_base: Url,
    /// API login exchanged for access tokens
    pub api_login: SecretString,
    /// Organization the catalog and deliveries belong to
    pub organization_id: Option<String>,
    /// Which price list is authoritative
    pub price_list: PriceListPolicy,
}

impl std::fmt::Debug for PosConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PosConfig")
            .field("api_base", &self.api_base.as_str())
            .field("api_login", &"[REDACTED]")
            .field("organization_id", &self.organization_id)
            .field("price_list", &self.price_list)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = parse_or_default(&get, "HOST", IpAddr::from([0, 0, 0, 0]))?;
        let port = parse_or_default(&get, "PORT", 3000_u16)?;
        let relay_queue_capacity =
            parse_or_default(&get, "RELAY_QUEUE_CAPACITY", DEFAULT_RELAY_QUEUE_CAPACITY)?;
        if relay_queue_capacity == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "RELAY_QUEUE_CAPACITY".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let bot_token = SecretString::from(
            get("BOT_TOKEN").unwrap_or_else(|| MISSING_BOT_TOKEN.to_string()),
        );

        Ok(Self {
            host,
            port,
            bot_token,
            pos: PosConfig::from_lookup(&get)?,
            store_path: get("DB_PATH").map_or_else(|| PathBuf::from(".db.json"), PathBuf::from),
            static_dir: get("STATIC_DIR").map_or_else(|| PathBuf::from("public"), PathBuf::from),
            relay_queue_capacity,
            sentry_dsn: get("SENTRY_DSN"),
            sentry_environment: get("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Log a masked summary of the loaded configuration.
    pub fn log_summary(&self) {
        tracing::info!(
            bot_token = ?mask(self.bot_token.expose_secret()),
            pos_api_base = ?self.pos.as_ref().map(|p| p.api_base.as_str()),
            pos_api_login = ?self.pos.as_ref().and_then(|p| mask(p.api_login.expose_secret())),
            pos_org_id = ?self.pos.as_ref().and_then(|p| p.organization_id.as_deref()),
            store_path = %self.store_path.display(),
            "Configuration loaded"
        );
        if self.pos.is_none() {
            tracing::warn!("POS integration not configured, serving the fallback catalog");
        }
    }
}

impl PosConfig {
    fn from_lookup(get: &impl Fn(&str) -> Option<String>) -> Result<Option<Self>, ConfigError> {
        let (Some(base), Some(login)) = (get("POS_API_BASE"), get("POS_API_LOGIN")) else {
            return Ok(None);
        };

        let api_base = Url::parse(base.trim_end_matches('/'))
            .map_err(|e| ConfigError::InvalidEnvVar("POS_API_BASE".to_string(), e.to_string()))?;

        let price_list = get("POS_PRICE_LIST").map_or(PriceListPolicy::First, PriceListPolicy::Named);

        Ok(Some(Self {
            api_base,
            api_login: SecretString::from(login),
            organization_id: get("POS_ORG_ID"),
            price_list,
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse an optional variable, falling back to `default` when unset.
fn parse_or_default<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Mask a secret for logging: first and last four characters only.
#[must_use]
pub fn mask(secret: &str) -> Option<String> {
    if secret.is_empty() {
        return None;
    }
    let chars: Vec<char> = secret.chars().collect();
    let head: String = chars.iter().take(4).collect();
    let tail: String = chars.iter().skip(chars.len().saturating_sub(4)).collect();
    Some(format!("{head}...{tail}"))
}
