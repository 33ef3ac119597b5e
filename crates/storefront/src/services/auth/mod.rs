//! Launch payload (`initData`) verification.
//!
//! The chat platform signs the query string it hands to the mini-app. The
//! signature scheme is:
//!
//! 1. Drop the `hash` pair and sort the remaining `key=value` strings.
//! 2. Join them with `\n` into the check string.
//! 3. `secret = HMAC-SHA256(key = "WebAppData", msg = bot_token)`.
//! 4. `hash = hex(HMAC-SHA256(key = secret, msg = check_string))`.
//!
//! Verification is pure: it touches neither the store nor the network.
//! Consuming the embedded `user` document is up to the caller, via
//! [`VerifiedPayload::user_claims`].

mod error;

pub use error::AuthError;

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use sha2::Sha256;

use miniapp_core::SessionClaims;

type HmacSha256 = Hmac<Sha256>;

/// Key of the first HMAC round, fixed by the platform.
const WEB_APP_DATA_KEY: &[u8] = b"WebAppData";

/// A launch payload whose signature has been checked.
#[derive(Debug, Clone)]
pub struct VerifiedPayload {
    pairs: Vec<(String, String)>,
}

impl VerifiedPayload {
    /// First value for `key`, percent-decoded.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Identity claims from the embedded `user` document.
    ///
    /// Returns `Ok(None)` if the payload carries no `user` field.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::ParseError` if the field is not valid identity JSON.
    pub fn user_claims(&self) -> Result<Option<SessionClaims>, AuthError> {
        self.get("user")
            .map(|raw| serde_json::from_str(raw).map_err(|_| AuthError::ParseError))
            .transpose()
    }
}

/// Verify a raw launch payload against the bot token.
///
/// # Errors
///
/// Returns `AuthError::Empty` for empty input and `AuthError::HashMismatch`
/// when the supplied hash is missing or wrong.
pub fn validate(raw: &str, bot_token: &SecretString) -> Result<VerifiedPayload, AuthError> {
    if raw.is_empty() {
        return Err(AuthError::Empty);
    }

    let pairs: Vec<(String, String)> = url::form_urlencoded::parse(raw.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let supplied = pairs
        .iter()
        .find(|(k, _)| k == "hash")
        .map(|(_, v)| v.as_str());

    let computed = sign_pairs(&pairs, bot_token);

    // Plain comparison: both sides are public hex digests of the same length.
    if supplied == Some(computed.as_str()) {
        Ok(VerifiedPayload { pairs })
    } else {
        Err(AuthError::HashMismatch)
    }
}

/// Compute the hex signature of a set of decoded pairs, ignoring any `hash` pair.
#[must_use]
pub fn sign_pairs(pairs: &[(String, String)], bot_token: &SecretString) -> String {
    let mut lines: Vec<String> = pairs
        .iter()
        .filter(|(k, _)| k != "hash")
        .map(|(k, v)| format!("{k}={v}"))
        .collect();
    lines.sort();
    let check_string = lines.join("\n");

    let secret_key = hmac_sha256(WEB_APP_DATA_KEY, bot_token.expose_secret().as_bytes());
    hex::encode(hmac_sha256(&secret_key, check_string.as_bytes()))
}

fn hmac_sha256(key: &[u8], message: &[u8]) -> Vec<u8> {
    // HMAC accepts keys of any length; `new_from_slice` cannot fail here.
    let mut mac = HmacSha256::new_from_slice(key)
        .unwrap_or_else(|_| unreachable!("HMAC-SHA256 accepts any key length"));
    mac.update(message);
    mac.finalize().into_bytes().to_vec()
}

/// Deserialize an `initData` request field, treating anything but a string
/// as absent.
///
/// # Errors
///
/// Only fails if the surrounding document is not valid JSON.
pub fn deserialize_init_data<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(raw)) => Some(raw),
        _ => None,
    })
}

/// Build a signed, URL-encoded launch payload.
///
/// Used by tests and local tooling to produce payloads the way the platform does.
#[must_use]
pub fn sign_payload(fields: &[(&str, &str)], bot_token: &SecretString) -> String {
    let pairs: Vec<(String, String)> = fields
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    let hash = sign_pairs(&pairs, bot_token);

    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (k, v) in &pairs {
        serializer.append_pair(k, v);
    }
    serializer.append_pair("hash", &hash);
    serializer.finish()
}
