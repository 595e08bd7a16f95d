//! Database schema initialization

use sqlx::SqlitePool;

use crate::error::Result;

/// Initialize the database schema
pub async fn initialize_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(SCHEMA_SQL).execute(pool).await?;

    Ok(())
}

const SCHEMA_SQL: &str = r#"
-- Listings, keyed by owner and client-chosen id
CREATE TABLE IF NOT EXISTS listings (
    owner_id TEXT NOT NULL,
    id TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    price TEXT NOT NULL,
    category TEXT NOT NULL,
    contact TEXT NOT NULL,
    -- JSON array of image URLs
    images_json TEXT NOT NULL DEFAULT '[]',
    device_id TEXT NOT NULL,
    -- RFC 3339 UTC, millisecond precision; text order is time order
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    is_deleted INTEGER NOT NULL DEFAULT 0,

    PRIMARY KEY (owner_id, id)
);

CREATE INDEX IF NOT EXISTS idx_listings_owner_created ON listings(owner_id, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_listings_owner_updated ON listings(owner_id, updated_at DESC);
CREATE INDEX IF NOT EXISTS idx_listings_device_updated ON listings(device_id, updated_at DESC);
CREATE INDEX IF NOT EXISTS idx_listings_category ON listings(category, created_at DESC);

-- Devices that have written on behalf of a user
CREATE TABLE IF NOT EXISTS devices (
    device_id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    device_name TEXT NOT NULL DEFAULT 'Dispositivo Móvel',
    platform TEXT NOT NULL DEFAULT 'android',
    last_sync TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_devices_user_last_sync ON devices(user_id, last_sync DESC);
"#;
