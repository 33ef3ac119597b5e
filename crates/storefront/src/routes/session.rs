//! Session routes: bootstrap and identity.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use serde_json::json;

use miniapp_core::{Category, OrderRecord, Product, SessionClaims, UserRecord};

use crate::error::{AppError, Result, set_sentry_user};
use crate::middleware::LenientJson;
use crate::services::auth::{self, AuthError};
use crate::state::AppState;

/// Body of requests that carry only a launch payload.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitDataRequest {
    #[serde(default, deserialize_with = "auth::deserialize_init_data")]
    pub init_data: Option<String>,
}

/// Everything the mini-app needs to render its first screen.
#[derive(Debug, Serialize)]
pub struct BootstrapResponse {
    pub user: Option<SessionClaims>,
    pub categories: Vec<Category>,
    pub products: Vec<Product>,
    pub orders: Vec<OrderRecord>,
}

/// Bootstrap a mini-app session.
///
/// POST /api/bootstrap
///
/// Without a launch payload the session is anonymous. A verified user is
/// recorded on first sight; a malformed user document is logged and the
/// session continues anonymously.
///
/// # Errors
///
/// Returns 401 if a payload is present but does not verify.
pub async fn bootstrap(
    State(state): State<AppState>,
    LenientJson(body): LenientJson<InitDataRequest>,
) -> Result<Json<BootstrapResponse>> {
    let mut user = None;

    if let Some(raw) = body.init_data.as_deref().filter(|raw| !raw.is_empty()) {
        let payload = auth::validate(raw, &state.config().bot_token).map_err(|e| {
            tracing::warn!(reason = e.code(), "Rejected bootstrap launch payload");
            AppError::Unauthorized(e)
        })?;

        match payload.user_claims() {
            Ok(Some(claims)) => {
                state.store().upsert_user(UserRecord::from(&claims)).await?;
                set_sentry_user(&claims.id, claims.username.as_deref());
                user = Some(claims);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Ignoring malformed user in launch payload"),
        }
    }

    let menu = state.store().catalog().await.or_fallback();
    let orders = match &user {
        Some(claims) => state.store().orders_for_user(claims.id).await,
        None => Vec::new(),
    };

    Ok(Json(BootstrapResponse {
        user,
        categories: menu.categories,
        products: menu.products,
        orders,
    }))
}

/// Echo the verified identity.
///
/// POST /api/whoami
///
/// # Errors
///
/// Returns 401 if the payload is missing or does not verify, and 400 if its
/// user document is malformed.
pub async fn whoami(
    State(state): State<AppState>,
    LenientJson(body): LenientJson<InitDataRequest>,
) -> Result<Json<serde_json::Value>> {
    let raw = body.init_data.as_deref().unwrap_or_default();
    let payload = auth::validate(raw, &state.config().bot_token).map_err(AppError::Unauthorized)?;

    let user = payload.user_claims().map_err(|e| match e {
        AuthError::ParseError => AppError::BadRequest(format!("initData invalid: {}", e.code())),
        other => AppError::Unauthorized(other),
    })?;

    Ok(Json(json!({ "ok": true, "user": user })))
}
