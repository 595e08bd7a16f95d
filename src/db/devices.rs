//! Device registration database operations

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::clock;
use crate::error::{AppError, Result};

/// Client platform tag
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    #[default]
    Android,
    Web,
}

impl Platform {
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Ios => "ios",
            Platform::Android => "android",
            Platform::Web => "web",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ios" => Ok(Platform::Ios),
            "android" => Ok(Platform::Android),
            "web" => Ok(Platform::Web),
            other => Err(AppError::invalid_input(format!("Unknown platform: {other}"))),
        }
    }
}

/// Device record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Device {
    pub device_id: String,
    pub user_id: String,
    pub device_name: String,
    pub platform: String,
    pub last_sync: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Device repository
pub struct DeviceRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> DeviceRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a device by id
    pub async fn get(&self, device_id: &str) -> Result<Option<Device>> {
        let device = sqlx::query_as::<_, Device>(
            r#"
            SELECT device_id, user_id, device_name, platform, last_sync,
                   is_active, created_at, updated_at
            FROM devices
            WHERE device_id = ?
            "#,
        )
        .bind(device_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(device)
    }

    /// Register a device or refresh its owner, platform and last-seen time
    pub async fn upsert(
        &self,
        device_id: &str,
        user_id: &str,
        platform: Platform,
        seen_at: DateTime<Utc>,
    ) -> Result<Device> {
        let now = clock::format(seen_at);

        sqlx::query(
            r#"
            INSERT INTO devices (device_id, user_id, platform, last_sync, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(device_id) DO UPDATE SET
                user_id = excluded.user_id,
                platform = excluded.platform,
                last_sync = excluded.last_sync,
                is_active = 1,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(device_id)
        .bind(user_id)
        .bind(platform.as_str())
        .bind(&now)
        .bind(&now)
        .bind(&now)
        .execute(self.pool)
        .await?;

        self.get(device_id)
            .await?
            .ok_or_else(|| AppError::Internal("Failed to fetch upserted device".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[tokio::test]
    async fn test_upsert_refreshes_last_sync() {
        let pool = test_pool().await;
        let repo = DeviceRepository::new(&pool);

        let first = repo
            .upsert(
                "device-1",
                "owner-1",
                Platform::Android,
                clock::parse("2024-01-01T00:00:00Z").unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(first.device_name, "Dispositivo Móvel");
        assert_eq!(first.platform, "android");

        let second = repo
            .upsert(
                "device-1",
                "owner-1",
                Platform::Ios,
                clock::parse("2024-01-05T00:00:00Z").unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(second.platform, "ios");
        assert_eq!(second.created_at, first.created_at);
        assert!(second.last_sync > first.last_sync);
    }

    #[test]
    fn test_platform_parse() {
        assert_eq!("iOS".parse::<Platform>().unwrap(), Platform::Ios);
        assert!("symbian".parse::<Platform>().is_err());
    }
}
