//! Listing API routes

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{register_device, ApiJson, ApiPath, ApiQuery};
use crate::auth::AuthenticatedOwner;
use crate::clock;
use crate::error::{AppError, Result};
use crate::listings::{Listing, ListingFields, ListingStats};
use crate::state::AppState;

/// Create the listing router
///
/// Every route expects an `AuthenticatedOwner` extension.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_listings).post(create_listing))
        .route("/stats", get(listing_stats))
        .route("/sync", post(super::sync::sync_listings))
        .route("/:id", put(update_listing).delete(delete_listing))
}

/// Parse an optional `lastSync` value
pub(crate) fn parse_watermark(raw: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        Some(value) => clock::parse(value)
            .map(Some)
            .map_err(|_| AppError::invalid_input(format!("Invalid lastSync timestamp: {value}"))),
        None => Ok(None),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListQuery {
    last_sync: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    success: bool,
    data: Vec<Listing>,
    count: usize,
    sync_time: DateTime<Utc>,
}

/// List active listings, optionally only those changed after `lastSync`
async fn list_listings(
    State(state): State<AppState>,
    Extension(owner): Extension<AuthenticatedOwner>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<ListResponse>> {
    let since = parse_watermark(query.last_sync.as_deref())?;
    let data = state.listings().list(&owner.owner_id, since).await?;

    Ok(Json(ListResponse {
        success: true,
        count: data.len(),
        data,
        sync_time: state.clock().now(),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WriteRequest {
    id: Option<String>,
    #[serde(flatten)]
    fields: ListingFields,
    device_id: Option<String>,
    platform: Option<String>,
}

#[derive(Serialize)]
struct ListingResponse<T> {
    success: bool,
    data: T,
}

/// Create a listing
async fn create_listing(
    State(state): State<AppState>,
    Extension(owner): Extension<AuthenticatedOwner>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<WriteRequest>,
) -> Result<(StatusCode, Json<ListingResponse<Listing>>)> {
    let device_id = register_device(
        &state,
        &owner,
        &headers,
        body.device_id.as_deref(),
        body.platform.as_deref(),
    )
    .await?;

    let listing = state
        .listings()
        .create(&owner.owner_id, &device_id, body.id, body.fields)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ListingResponse {
            success: true,
            data: listing,
        }),
    ))
}

/// Patch a listing
async fn update_listing(
    State(state): State<AppState>,
    Extension(owner): Extension<AuthenticatedOwner>,
    ApiPath(id): ApiPath<String>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<WriteRequest>,
) -> Result<Json<ListingResponse<Listing>>> {
    register_device(
        &state,
        &owner,
        &headers,
        body.device_id.as_deref(),
        body.platform.as_deref(),
    )
    .await?;

    let listing = state
        .listings()
        .update(&owner.owner_id, &id, body.fields)
        .await?;

    Ok(Json(ListingResponse {
        success: true,
        data: listing,
    }))
}

#[derive(Serialize)]
struct DeleteResponse {
    success: bool,
    message: &'static str,
}

/// Soft-delete a listing
async fn delete_listing(
    State(state): State<AppState>,
    Extension(owner): Extension<AuthenticatedOwner>,
    ApiPath(id): ApiPath<String>,
    headers: HeaderMap,
) -> Result<Json<DeleteResponse>> {
    register_device(&state, &owner, &headers, None, None).await?;
    state.listings().delete(&owner.owner_id, &id).await?;

    Ok(Json(DeleteResponse {
        success: true,
        message: "Advertisement removed successfully",
    }))
}

/// Counts of the owner's active listings
async fn listing_stats(
    State(state): State<AppState>,
    Extension(owner): Extension<AuthenticatedOwner>,
) -> Result<Json<ListingResponse<ListingStats>>> {
    let stats = state.listings().stats(&owner.owner_id).await?;
    Ok(Json(ListingResponse {
        success: true,
        data: stats,
    }))
}
