//! Order routes.

use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::{AppError, Result};
use crate::middleware::LenientJson;
use crate::services::{CheckoutRequest, OrderError};
use crate::state::AppState;

/// Orders returned by [`recent`].
const RECENT_ORDERS: usize = 20;

/// List the most recent orders, newest first.
///
/// GET /api/orders
pub async fn recent(State(state): State<AppState>) -> Json<serde_json::Value> {
    let orders = state.store().recent_orders(RECENT_ORDERS).await;
    Json(json!({ "orders": orders }))
}

/// Place an order.
///
/// POST /api/orders
///
/// Cart problems are answered with `200 {ok:false, error}` so the client
/// can show the message as is.
///
/// # Errors
///
/// Returns 401 if the launch payload does not verify and 500 if the order
/// cannot be stored.
pub async fn create(
    State(state): State<AppState>,
    LenientJson(request): LenientJson<CheckoutRequest>,
) -> Result<Response> {
    match state.orders().place_order(request).await {
        Ok(placed) => Ok(Json(json!({
            "ok": true,
            "orderNumber": placed.number(),
            "total": placed.total(),
        }))
        .into_response()),
        Err(OrderError::AuthInvalid(e)) => Err(AppError::Unauthorized(e)),
        Err(OrderError::Store(e)) => Err(AppError::Store(e)),
        Err(e) => {
            tracing::info!(error = %e, "Checkout refused");
            Ok(Json(json!({ "ok": false, "error": e.to_string() })).into_response())
        }
    }
}
