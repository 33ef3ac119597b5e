//! POS access token exchange.
//!
//! The POS cloud API trades a long-lived API login for a bearer token that
//! the server expires after ten minutes. Tokens are cached for nine.

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use tracing::instrument;

use super::PosError;
use super::types::{AccessTokenRequest, AccessTokenResponse};

/// How long a freshly issued token is trusted, under the server's 10 minutes.
pub const TOKEN_LIFETIME: Duration = Duration::minutes(9);

/// Bearer token obtained from the POS system.
#[derive(Debug, Clone)]
pub struct PosToken {
    /// Bearer token for API requests.
    pub access_token: SecretString,
    /// When the cached token stops being used.
    pub expires_at: DateTime<Utc>,
}

impl PosToken {
    /// Wrap a token issued at `issued_at`.
    #[must_use]
    pub fn issued(access_token: SecretString, issued_at: DateTime<Utc>) -> Self {
        Self {
            access_token,
            expires_at: issued_at + TOKEN_LIFETIME,
        }
    }

    /// Whether the token has reached its cache expiry.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Whether the token is expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Exchange the API login for a fresh token.
///
/// # Errors
///
/// Returns `PosError::AuthenticationFailed` on a non-success status and
/// `PosError::Http` on transport or decoding failures.
#[instrument(skip(client, api_login))]
pub async fn request_access_token(
    client: &reqwest::Client,
    endpoint: &str,
    api_login: &SecretString,
) -> Result<PosToken, PosError> {
    let now = Utc::now();

    let response = client
        .post(endpoint)
        .json(&AccessTokenRequest {
            api_login: api_login.expose_secret(),
        })
        .send()
        .await?;

    let status = response.status();

    if status.is_success() {
        let body: AccessTokenResponse = response.json().await?;
        Ok(PosToken::issued(SecretString::from(body.token), now))
    } else {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        Err(PosError::AuthenticationFailed(format!(
            "HTTP {status}: {}",
            error_text.chars().take(200).collect::<String>()
        )))
    }
}
