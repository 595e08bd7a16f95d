//! Record store abstraction
//!
//! The sync engine and the CRUD service only see this trait. The SQLite
//! implementation lives in `crate::db`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use super::types::{CategoryCount, Listing};

/// Record store failures
#[derive(Debug, Error)]
pub enum StoreError {
    /// The (owner, id) pair is already taken
    #[error("listing already exists")]
    Duplicate,

    /// The store cannot be reached at all
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt listing {id}: {reason}")]
    Corrupt { id: String, reason: String },

    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl StoreError {
    /// Whether the failure means the store itself is unreachable
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                StoreError::Duplicate
            }
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Io(_) => StoreError::Unavailable(err.to_string()),
            other => StoreError::Database(other),
        }
    }
}

/// Keyed storage for listings
///
/// Every method is scoped to a single owner; a listing is addressed by the
/// `(owner_id, id)` pair.
#[async_trait]
pub trait ListingStore: Send + Sync {
    /// Point lookup, including soft-deleted listings
    async fn find(&self, owner_id: &str, id: &str) -> Result<Option<Listing>, StoreError>;

    /// Insert a new listing; `StoreError::Duplicate` if the key is taken
    async fn insert(&self, listing: &Listing) -> Result<(), StoreError>;

    /// Overwrite a listing by key regardless of its delete flag
    async fn replace(&self, listing: &Listing) -> Result<bool, StoreError>;

    /// Overwrite a listing by key only while it is not deleted
    async fn replace_active(&self, listing: &Listing) -> Result<bool, StoreError>;

    /// Set the delete flag and re-stamp the listing
    async fn mark_deleted(
        &self,
        owner_id: &str,
        id: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Non-deleted listings, newest created first
    async fn list_active(
        &self,
        owner_id: &str,
        modified_since: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<Listing>, StoreError>;

    /// Every listing (deleted or not) modified strictly after `watermark`,
    /// newest modification first
    async fn changed_since(
        &self,
        owner_id: &str,
        watermark: DateTime<Utc>,
    ) -> Result<Vec<Listing>, StoreError>;

    /// Active listing counts grouped by category
    async fn count_by_category(&self, owner_id: &str) -> Result<Vec<CategoryCount>, StoreError>;

    /// Connectivity probe
    async fn ping(&self) -> Result<(), StoreError>;
}
