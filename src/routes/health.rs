//! Health check and index endpoints

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    /// Seconds since startup
    pub uptime: f64,
    pub database: &'static str,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = if state.listings().store_reachable().await {
        "connected"
    } else {
        "disconnected"
    };

    Json(HealthResponse {
        status: "OK",
        timestamp: state.clock().now(),
        uptime: state.uptime_secs(),
        database,
    })
}

/// Service banner with the available endpoints
pub async fn index() -> Json<Value> {
    Json(json!({
        "message": "Classifieds sync API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "GET /health",
            "list": "GET /api/advertisements?lastSync=<ISO8601>",
            "create": "POST /api/advertisements",
            "update": "PUT /api/advertisements/:id",
            "delete": "DELETE /api/advertisements/:id",
            "sync": "POST /api/advertisements/sync",
            "stats": "GET /api/advertisements/stats"
        }
    }))
}
