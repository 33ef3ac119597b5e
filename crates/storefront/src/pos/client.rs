//! POS cloud API client.
//!
//! Wraps the handful of REST endpoints the storefront needs and owns the
//! access token cache.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::RwLock;
use tracing::instrument;
use url::{ParseError, Url};

use super::auth::{PosToken, request_access_token};
use super::PosError;
use super::types::{
    DeliveryCreateRequest, DeliveryCreateResponse, Nomenclature, OrganizationRequest,
    PriceListItem, PriceListItemsResponse, PriceListSummary, PriceListsResponse,
};
use crate::config::PosConfig;
use crate::services::catalog::PriceListPolicy;

/// POS cloud API client.
///
/// Cheap to clone; all clones share one HTTP client and one token cache.
/// Built without configuration it runs in offline mode: no network calls are
/// made and every request fails with [`PosError::NotConfigured`].
#[derive(Clone)]
pub struct PosClient {
    inner: Arc<PosClientInner>,
}

struct PosClientInner {
    client: reqwest::Client,
    config: Option<PosConfig>,
    /// In-memory token cache
    token: RwLock<Option<PosToken>>,
}

impl PosClient {
    /// Create a client for the given configuration.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created. This should never happen
    /// under normal circumstances as we use standard TLS configuration.
    #[must_use]
    pub fn new(config: Option<PosConfig>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            inner: Arc::new(PosClientInner {
                client,
                config,
                token: RwLock::new(None),
            }),
        }
    }

    /// Whether POS credentials are configured.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.inner.config.is_some()
    }

    /// Configured organization id, if any.
    #[must_use]
    pub fn organization_id(&self) -> Option<&str> {
        self.inner
            .config
            .as_ref()
            .and_then(|c| c.organization_id.as_deref())
    }

    /// Which price list prices the catalog.
    #[must_use]
    pub fn price_list_policy(&self) -> PriceListPolicy {
        self.inner
            .config
            .as_ref()
            .map_or(PriceListPolicy::First, |c| c.price_list.clone())
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// A usable access token, from cache or freshly issued.
    ///
    /// Never fails: offline mode and token exchange errors are logged and
    /// reported as `None`.
    #[instrument(skip(self))]
    pub async fn access_token(&self) -> Option<SecretString> {
        if let Some(token) = self.inner.token.read().await.as_ref()
            && !token.is_expired()
        {
            return Some(token.access_token.clone());
        }

        let Some(config) = self.inner.config.as_ref() else {
            tracing::debug!("POS not configured, no access token");
            return None;
        };

        let endpoint = endpoint(&config.api_base, "access_token");
        match request_access_token(&self.inner.client, &endpoint, &config.api_login).await {
            Ok(token) => {
                let access_token = token.access_token.clone();
                *self.inner.token.write().await = Some(token);
                tracing::debug!("POS access token refreshed");
                Some(access_token)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to obtain POS access token");
                None
            }
        }
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// Fetch the organization's nomenclature.
    ///
    /// # Errors
    ///
    /// Returns `PosError` on missing configuration or token, transport
    /// failures, non-success statuses, and malformed bodies.
    #[instrument(skip(self))]
    pub async fn nomenclature(&self) -> Result<Nomenclature, PosError> {
        let body = OrganizationRequest {
            organization_id: self.organization_id(),
        };
        self.post("nomenclature", &body).await
    }

    /// List the organization's price lists.
    ///
    /// # Errors
    ///
    /// Same as [`Self::nomenclature`].
    #[instrument(skip(self))]
    pub async fn price_lists(&self) -> Result<Vec<PriceListSummary>, PosError> {
        let config = self.config()?;
        let mut url = Url::parse(&endpoint(&config.api_base, "pricelists"))?;
        if let Some(org) = self.organization_id() {
            url.query_pairs_mut().append_pair("organizationId", org);
        }

        let response: PriceListsResponse = self.get(url.as_str()).await?;
        Ok(response.pricelists)
    }

    /// Fetch the items of one price list.
    ///
    /// # Errors
    ///
    /// Same as [`Self::nomenclature`].
    #[instrument(skip(self))]
    pub async fn price_list_items(
        &self,
        price_list_id: &str,
    ) -> Result<Vec<PriceListItem>, PosError> {
        let config = self.config()?;
        let mut url = Url::parse(&endpoint(&config.api_base, "pricelists"))?;
        url.path_segments_mut()
            .map_err(|()| PosError::InvalidUrl(ParseError::RelativeUrlWithCannotBeABaseBase))?
            .push(price_list_id);

        let response: PriceListItemsResponse = self.get(url.as_str()).await?;
        Ok(response.items)
    }

    // =========================================================================
    // Deliveries
    // =========================================================================

    /// Create a delivery order.
    ///
    /// # Errors
    ///
    /// Same as [`Self::nomenclature`].
    #[instrument(skip(self, request))]
    pub async fn create_delivery(
        &self,
        request: &DeliveryCreateRequest,
    ) -> Result<DeliveryCreateResponse, PosError> {
        self.post("deliveries/create", request).await
    }

    // =========================================================================
    // Transport
    // =========================================================================

    fn config(&self) -> Result<&PosConfig, PosError> {
        self.inner.config.as_ref().ok_or(PosError::NotConfigured)
    }

    async fn bearer(&self) -> Result<SecretString, PosError> {
        self.config()?;
        self.access_token().await.ok_or_else(|| {
            PosError::AuthenticationFailed("no access token available".to_string())
        })
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, PosError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = endpoint(&self.config()?.api_base, path);
        let token = self.bearer().await?;

        let response = self
            .inner
            .client
            .post(&url)
            .bearer_auth(token.expose_secret())
            .json(body)
            .send()
            .await?;

        decode(response).await
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T, PosError> {
        let token = self.bearer().await?;

        let response = self
            .inner
            .client
            .get(url)
            .bearer_auth(token.expose_secret())
            .send()
            .await?;

        decode(response).await
    }
}

/// `{base}/api/1/{path}`, tolerant of a trailing slash on the base.
fn endpoint(base: &Url, path: &str) -> String {
    format!("{}/api/1/{path}", base.as_str().trim_end_matches('/'))
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, PosError> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        return Err(PosError::Api {
            status: status.as_u16(),
            message: text.chars().take(200).collect(),
        });
    }

    Ok(serde_json::from_str(&text)?)
}
