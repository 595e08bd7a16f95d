//! Route modules for the classifieds sync server

pub mod advertisements;
pub mod health;
pub mod sync;

use axum::{extract::FromRequest, extract::FromRequestParts, http::HeaderMap};

use crate::auth::AuthenticatedOwner;
use crate::db::{DeviceRepository, Platform};
use crate::error::{AppError, Result};
use crate::state::AppState;

const DEVICE_ID_HEADER: &str = "x-device-id";
const DEVICE_PLATFORM_HEADER: &str = "x-device-platform";

/// JSON body extractor whose rejections use the `{error}` body
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Query string extractor whose rejections use the `{error}` body
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// Path parameter extractor whose rejections use the `{error}` body
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Resolve the calling device and record that it was seen
///
/// The body value wins over the header. Every mutating request goes through
/// here, so the device registry tracks the last write of each device.
pub(crate) async fn register_device(
    state: &AppState,
    owner: &AuthenticatedOwner,
    headers: &HeaderMap,
    body_device_id: Option<&str>,
    body_platform: Option<&str>,
) -> Result<String> {
    let device_id = body_device_id
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| header_value(headers, DEVICE_ID_HEADER))
        .ok_or_else(|| AppError::invalid_input("deviceId is required"))?
        .to_string();

    let platform = match body_platform
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| header_value(headers, DEVICE_PLATFORM_HEADER))
    {
        Some(raw) => raw.parse::<Platform>()?,
        None => Platform::default(),
    };

    DeviceRepository::new(state.db())
        .upsert(&device_id, &owner.owner_id, platform, state.clock().now())
        .await?;

    Ok(device_id)
}
