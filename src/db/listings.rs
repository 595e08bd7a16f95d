//! Listing database operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::clock;
use crate::listings::{Category, CategoryCount, Listing, ListingStore, StoreError};

const LISTING_COLUMNS: &str = "owner_id, id, title, description, price, category, contact, \
                               images_json, device_id, created_at, updated_at, is_deleted";

const REPLACE_SQL: &str = r#"
    UPDATE listings
    SET title = ?, description = ?, price = ?, category = ?, contact = ?,
        images_json = ?, device_id = ?, updated_at = ?, is_deleted = ?
    WHERE owner_id = ? AND id = ?
"#;

/// SQLite-backed listing store
#[derive(Clone)]
pub struct SqliteListingStore {
    pool: SqlitePool,
}

impl SqliteListingStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn write(&self, listing: &Listing, only_active: bool) -> Result<bool, StoreError> {
        let images = encode_images(listing)?;
        let query = if only_active {
            format!("{} AND is_deleted = 0", REPLACE_SQL.trim_end())
        } else {
            REPLACE_SQL.to_string()
        };

        let result = sqlx::query(&query)
            .bind(&listing.title)
            .bind(&listing.description)
            .bind(&listing.price)
            .bind(listing.category.label())
            .bind(&listing.contact)
            .bind(&images)
            .bind(&listing.device_id)
            .bind(clock::format(listing.updated_at))
            .bind(listing.is_deleted)
            .bind(&listing.owner_id)
            .bind(&listing.id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ListingStore for SqliteListingStore {
    async fn find(&self, owner_id: &str, id: &str) -> Result<Option<Listing>, StoreError> {
        let row = sqlx::query_as::<_, ListingRow>(&format!(
            "SELECT {LISTING_COLUMNS} FROM listings WHERE owner_id = ? AND id = ?"
        ))
        .bind(owner_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ListingRow::into_listing).transpose()
    }

    async fn insert(&self, listing: &Listing) -> Result<(), StoreError> {
        let images = encode_images(listing)?;

        sqlx::query(&format!(
            "INSERT INTO listings ({LISTING_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(&listing.owner_id)
        .bind(&listing.id)
        .bind(&listing.title)
        .bind(&listing.description)
        .bind(&listing.price)
        .bind(listing.category.label())
        .bind(&listing.contact)
        .bind(&images)
        .bind(&listing.device_id)
        .bind(clock::format(listing.created_at))
        .bind(clock::format(listing.updated_at))
        .bind(listing.is_deleted)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn replace(&self, listing: &Listing) -> Result<bool, StoreError> {
        self.write(listing, false).await
    }

    async fn replace_active(&self, listing: &Listing) -> Result<bool, StoreError> {
        self.write(listing, true).await
    }

    async fn mark_deleted(
        &self,
        owner_id: &str,
        id: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE listings SET is_deleted = 1, updated_at = ? WHERE owner_id = ? AND id = ?",
        )
        .bind(clock::format(at))
        .bind(owner_id)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_active(
        &self,
        owner_id: &str,
        modified_since: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<Listing>, StoreError> {
        let since = modified_since.map(clock::format);

        let rows = sqlx::query_as::<_, ListingRow>(&format!(
            r#"
            SELECT {LISTING_COLUMNS}
            FROM listings
            WHERE owner_id = ? AND is_deleted = 0 AND (? IS NULL OR updated_at > ?)
            ORDER BY created_at DESC
            LIMIT ?
            "#
        ))
        .bind(owner_id)
        .bind(&since)
        .bind(&since)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ListingRow::into_listing).collect()
    }

    async fn changed_since(
        &self,
        owner_id: &str,
        watermark: DateTime<Utc>,
    ) -> Result<Vec<Listing>, StoreError> {
        let rows = sqlx::query_as::<_, ListingRow>(&format!(
            r#"
            SELECT {LISTING_COLUMNS}
            FROM listings
            WHERE owner_id = ? AND updated_at > ?
            ORDER BY updated_at DESC
            "#
        ))
        .bind(owner_id)
        .bind(clock::format(watermark))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ListingRow::into_listing).collect()
    }

    async fn count_by_category(&self, owner_id: &str) -> Result<Vec<CategoryCount>, StoreError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT category, COUNT(*)
            FROM listings
            WHERE owner_id = ? AND is_deleted = 0
            GROUP BY category
            ORDER BY COUNT(*) DESC, category ASC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(category, count)| -> Result<CategoryCount, StoreError> {
                let category = category.parse::<Category>().map_err(|_| StoreError::Corrupt {
                    id: owner_id.to_string(),
                    reason: format!("unknown category {category}"),
                })?;
                Ok(CategoryCount { category, count })
            })
            .collect()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn encode_images(listing: &Listing) -> Result<String, StoreError> {
    serde_json::to_string(&listing.images).map_err(|e| StoreError::Corrupt {
        id: listing.id.clone(),
        reason: e.to_string(),
    })
}

#[derive(sqlx::FromRow)]
struct ListingRow {
    owner_id: String,
    id: String,
    title: String,
    description: String,
    price: String,
    category: String,
    contact: String,
    images_json: String,
    device_id: String,
    created_at: String,
    updated_at: String,
    is_deleted: bool,
}

impl ListingRow {
    fn into_listing(self) -> Result<Listing, StoreError> {
        let corrupt = |reason: String| StoreError::Corrupt {
            id: self.id.clone(),
            reason,
        };

        let category = self.category.parse::<Category>().map_err(|e| corrupt(format!("{e}")))?;
        let images = serde_json::from_str(&self.images_json).map_err(|e| corrupt(e.to_string()))?;
        let created_at = clock::parse(&self.created_at).map_err(|e| corrupt(e.to_string()))?;
        let updated_at = clock::parse(&self.updated_at).map_err(|e| corrupt(e.to_string()))?;

        Ok(Listing {
            id: self.id,
            owner_id: self.owner_id,
            device_id: self.device_id,
            title: self.title,
            description: self.description,
            price: self.price,
            category,
            contact: self.contact,
            images,
            created_at,
            updated_at,
            is_deleted: self.is_deleted,
        })
    }
}
