//! `GET /content` and `POST /content`

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use folio_core::models::{WriteRequest, WriteResponse};
use folio_core::ContentSnapshot;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::AppState;

/// The whole store, every known key present (`null` when unset)
pub async fn get_content(State(state): State<AppState>) -> Result<Json<ContentSnapshot>, ApiError> {
    let snapshot = state.store.snapshot()?;
    debug!("Serving snapshot (lastUpdated={})", snapshot.last_updated());
    Ok(Json(snapshot))
}

/// Replace one field
///
/// The body is decoded by hand so a malformed request gets the same
/// `{success: false, message}` shape as a validation failure.
pub async fn post_content(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<WriteResponse>, ApiError> {
    let request: WriteRequest =
        serde_json::from_slice(&body).map_err(|e| ApiError::Body(e.to_string()))?;

    let kind = request.kind.clone();
    let last_updated = state.store.write(request.kind.as_deref(), request.content)?;

    info!(
        "Updated '{}' (lastUpdated={})",
        kind.as_deref().unwrap_or_default(),
        last_updated
    );
    Ok(Json(WriteResponse::ok(last_updated)))
}
