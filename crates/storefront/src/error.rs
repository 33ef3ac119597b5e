//! Unified error handling with Sentry integration.
//!
//! Route handlers return `Result<T, AppError>`. Server-side failures are
//! captured to Sentry before the client gets a generic JSON error body.
//! Checkout validation failures are not errors at this level: they are
//! answered with `200 {ok:false, error}` by the order route itself.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::db::StoreError;
use crate::services::auth::AuthError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Document store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Launch payload failed verification.
    #[error("initData invalid: {0}")]
    Unauthorized(#[source] AuthError),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(self, Self::Store(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Store(_) => "Internal server error".to_string(),
            Self::Unauthorized(reason) => format!("initData invalid: {}", reason.code()),
            Self::BadRequest(msg) => msg.clone(),
        };

        (
            status,
            Json(serde_json::json!({ "ok": false, "error": message })),
        )
            .into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a verified platform user.
pub fn set_sentry_user(user_id: &impl ToString, username: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            username: username.map(String::from),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn disk_failure() -> AppError {
        AppError::Store(StoreError::Io {
            path: std::path::PathBuf::from("/var/lib/miniapp/.db.json"),
            source: std::io::Error::other("disk on fire"),
        })
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");

        let err = AppError::Unauthorized(AuthError::HashMismatch);
        assert_eq!(err.to_string(), "initData invalid: hash mismatch");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(AppError::Unauthorized(AuthError::Empty)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(disk_failure()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_unauthorized_body_carries_reason_code() {
        let body = body_json(AppError::Unauthorized(AuthError::HashMismatch).into_response()).await;
        assert_eq!(body["ok"], false);
        assert_eq!(body["error"], "initData invalid: hash_mismatch");
    }

    #[tokio::test]
    async fn test_internal_details_hidden() {
        let body = body_json(disk_failure().into_response()).await;
        assert_eq!(body["error"], "Internal server error");
    }
}
