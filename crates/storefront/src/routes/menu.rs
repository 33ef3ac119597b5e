//! Menu route.

use axum::{Json, extract::State};

use miniapp_core::Catalog;

use crate::error::Result;
use crate::state::AppState;

/// Return the stored catalog as last written to disk.
///
/// GET /api/menu
///
/// Unlike bootstrap, an empty stored catalog is returned as is rather than
/// replaced by the fallback.
///
/// # Errors
///
/// Returns 500 if the store file cannot be read.
pub async fn show(State(state): State<AppState>) -> Result<Json<Catalog>> {
    state.store().reload().await?;
    Ok(Json(state.store().catalog().await))
}
