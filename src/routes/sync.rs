//! Batch sync route

use axum::{extract::State, http::HeaderMap, Extension, Json};
use serde_json::Value;

use super::advertisements::parse_watermark;
use super::{register_device, ApiJson};
use crate::auth::AuthenticatedOwner;
use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::sync::{SyncRequest, SyncResponse};

/// Merge a client batch and return what changed on the server
///
/// Per-entry failures are reported in the body; the call itself only fails
/// on a malformed envelope or an unreachable store.
pub async fn sync_listings(
    State(state): State<AppState>,
    Extension(owner): Extension<AuthenticatedOwner>,
    headers: HeaderMap,
    ApiJson(request): ApiJson<SyncRequest>,
) -> Result<Json<SyncResponse>> {
    let batch = match request.advertisements {
        Some(Value::Array(items)) => items,
        _ => return Err(AppError::invalid_input("advertisements must be an array")),
    };
    let watermark = parse_watermark(request.last_sync.as_deref())?;

    let device_id = register_device(
        &state,
        &owner,
        &headers,
        request.device_id.as_deref(),
        request.platform.as_deref(),
    )
    .await?;

    tracing::info!(
        owner = %owner.owner_id,
        device = %device_id,
        entries = batch.len(),
        "Sync requested"
    );

    let result = state
        .sync_engine()
        .reconcile(&owner.owner_id, &device_id, &batch, watermark)
        .await?;

    Ok(Json(SyncResponse::from(result)))
}
