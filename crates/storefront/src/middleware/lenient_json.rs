//! Forgiving JSON body extractor.
//!
//! The mini-app posts whatever the webview produced. A missing body, a wrong
//! content type, or unparseable JSON all read as the default request, so the
//! handler answers in its own terms instead of axum's plain-text rejections.

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;

/// JSON body that falls back to `T::default()` instead of rejecting.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(LenientJson(body): LenientJson<InitDataRequest>) {
///     // body.init_data is None for an empty POST
/// }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LenientJson<T>(pub T);

impl<T, S> FromRequest<S> for LenientJson<T>
where
    T: DeserializeOwned + Default,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = match Bytes::from_request(req, state).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!(error = %e, "Unreadable request body");
                return Ok(Self(T::default()));
            }
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self(T::default()));
        }

        match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(Self(value)),
            Err(e) => {
                tracing::debug!(error = %e, "Malformed JSON body, using defaults");
                Ok(Self(T::default()))
            }
        }
    }
}
