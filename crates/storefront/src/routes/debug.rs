//! Diagnostics routes for operators.

use axum::{Json, extract::State};
use serde_json::json;

use crate::state::AppState;

/// Summarize the raw nomenclature as the POS system returns it.
///
/// GET /api/debug/pos-raw
///
/// Upstream failures are reported in the body as `{error}`.
pub async fn pos_raw(State(state): State<AppState>) -> Json<serde_json::Value> {
    let nomenclature = match state.pos().nomenclature().await {
        Ok(nomenclature) => nomenclature,
        Err(e) => {
            tracing::warn!(error = %e, "POS nomenclature unavailable");
            return Json(json!({ "error": e.to_string() }));
        }
    };

    for group in &nomenclature.groups {
        tracing::debug!(id = %group.id, name = %group.name, parent = ?group.parent_group, "Group");
    }
    for category in &nomenclature.product_categories {
        tracing::debug!(id = %category.id, name = %category.name, "Product category");
    }

    let products: Vec<serde_json::Value> = nomenclature
        .products
        .iter()
        .map(|p| {
            json!({
                "id": p.id,
                "name": p.name,
                "parentGroup": p.parent_group,
                "isDeleted": p.is_deleted,
            })
        })
        .collect();

    Json(json!({
        "groupsCount": nomenclature.groups.len(),
        "categoriesCount": nomenclature.product_categories.len(),
        "productsCount": nomenclature.products.len(),
        "products": products,
    }))
}

/// Run a catalog sync now, falling back to the static catalog on failure.
///
/// POST /api/debug/menu-sync
pub async fn menu_sync(State(state): State<AppState>) -> Json<serde_json::Value> {
    let (synced, catalog) = state.catalog().sync_or_fallback().await;
    Json(json!({
        "synced": synced,
        "categories": catalog.categories.len(),
        "products": catalog.products.len(),
    }))
}

/// Recent POS relay failures, oldest first.
///
/// GET /api/debug/relay-failures
pub async fn relay_failures(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({ "failures": state.relay().recent_failures() }))
}
