//! Single-record listing operations
//!
//! Create, list, update, delete and stats on top of a `ListingStore`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::store::ListingStore;
use super::types::{normalize_id, Listing, ListingFields, ListingStats};
use crate::clock::Clock;
use crate::error::{AppError, Result};

/// Safety bound on list reads
pub const MAX_PAGE_SIZE: i64 = 1000;

pub struct ListingService {
    store: Arc<dyn ListingStore>,
    clock: Arc<dyn Clock>,
}

impl ListingService {
    pub fn new(store: Arc<dyn ListingStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Create a listing with server-assigned timestamps
    ///
    /// A missing or empty `id` gets a fresh UUID; a supplied one is trimmed.
    pub async fn create(
        &self,
        owner_id: &str,
        device_id: &str,
        id: Option<String>,
        fields: ListingFields,
    ) -> Result<Listing> {
        let content = fields.into_content()?;

        let id = match id.as_deref().and_then(normalize_id) {
            Some(id) => {
                if self.store.find(owner_id, &id).await?.is_some() {
                    return Err(AppError::conflict("Advertisement already exists"));
                }
                id
            }
            None => Uuid::new_v4().to_string(),
        };

        let now = self.clock.now();
        let listing = Listing::new(id, owner_id, device_id, content, now, now);

        self.store.insert(&listing).await?;
        tracing::info!(owner = owner_id, id = %listing.id, "Created listing");
        Ok(listing)
    }

    /// Active listings, optionally only those modified after `since`
    pub async fn list(
        &self,
        owner_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Listing>> {
        Ok(self
            .store
            .list_active(owner_id, since, MAX_PAGE_SIZE)
            .await?)
    }

    /// Patch an active listing and re-stamp it
    pub async fn update(&self, owner_id: &str, id: &str, fields: ListingFields) -> Result<Listing> {
        let id = id.trim();
        let mut listing = self
            .store
            .find(owner_id, id)
            .await?
            .filter(|l| !l.is_deleted)
            .ok_or_else(|| AppError::not_found("Advertisement not found"))?;

        let content = fields.apply_to(listing.content())?;
        listing.set_content(content);
        listing.updated_at = self.clock.now();

        if !self.store.replace_active(&listing).await? {
            return Err(AppError::not_found("Advertisement not found"));
        }
        Ok(listing)
    }

    /// Soft-delete a listing
    ///
    /// Deleting an already-deleted listing succeeds and re-stamps it.
    pub async fn delete(&self, owner_id: &str, id: &str) -> Result<()> {
        let id = id.trim();
        let now = self.clock.now();
        if !self.store.mark_deleted(owner_id, id, now).await? {
            return Err(AppError::not_found("Advertisement not found"));
        }
        tracing::info!(owner = owner_id, id, "Soft-deleted listing");
        Ok(())
    }

    pub async fn stats(&self, owner_id: &str) -> Result<ListingStats> {
        let by_category = self.store.count_by_category(owner_id).await?;
        Ok(ListingStats {
            total: by_category.iter().map(|c| c.count).sum(),
            by_category,
            last_update: self.clock.now(),
        })
    }

    /// Whether the backing store answers
    pub async fn store_reachable(&self) -> bool {
        match self.store.ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Store ping failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::db::test_store;
    use crate::listings::Category;

    async fn setup() -> (ListingService, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::at("2024-05-01T12:00:00Z"));
        let store = test_store().await;
        (ListingService::new(store, clock.clone()), clock)
    }

    fn fields(title: &str, category: &str) -> ListingFields {
        ListingFields {
            title: Some(title.into()),
            description: Some("desc".into()),
            price: Some("100".into()),
            category: Some(category.into()),
            contact: Some("contact".into()),
            images: None,
        }
    }

    #[tokio::test]
    async fn test_create_generates_id() {
        let (service, _) = setup().await;
        let listing = service
            .create("owner-1", "device-1", None, fields("Sofa", "Móveis"))
            .await
            .unwrap();

        assert!(Uuid::parse_str(&listing.id).is_ok());
        assert_eq!(listing.created_at, listing.updated_at);
    }

    #[tokio::test]
    async fn test_duplicate_create_conflicts_and_keeps_original() {
        let (service, _) = setup().await;
        service
            .create("owner-1", "device-1", Some("ad-1".into()), fields("Sofa", "Móveis"))
            .await
            .unwrap();

        let err = service
            .create("owner-1", "device-2", Some("ad-1".into()), fields("Mesa", "Móveis"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let listed = service.list("owner-1", None).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "Sofa");
    }

    #[tokio::test]
    async fn test_same_id_for_different_owners() {
        let (service, _) = setup().await;
        service
            .create("owner-1", "device-1", Some("ad-1".into()), fields("Sofa", "Móveis"))
            .await
            .unwrap();
        service
            .create("owner-2", "device-9", Some("ad-1".into()), fields("Carro", "Veículos"))
            .await
            .unwrap();

        assert_eq!(service.list("owner-1", None).await.unwrap().len(), 1);
        assert_eq!(service.list("owner-2", None).await.unwrap()[0].title, "Carro");
    }

    #[tokio::test]
    async fn test_ids_are_trimmed_on_every_path() {
        let (service, _) = setup().await;
        let created = service
            .create("owner-1", "device-1", Some(" ad-1 ".into()), fields("Sofa", "Móveis"))
            .await
            .unwrap();
        assert_eq!(created.id, "ad-1");

        let err = service
            .create("owner-1", "device-1", Some("ad-1".into()), fields("Sofa", "Móveis"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let updated = service
            .update(
                "owner-1",
                "  ad-1",
                ListingFields {
                    title: Some("Sofa cama".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "Sofa cama");

        service.delete("owner-1", "ad-1 ").await.unwrap();
        assert!(service.list("owner-1", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_is_capped() {
        let clock = Arc::new(ManualClock::at("2024-05-01T12:00:00Z"));
        let store = test_store().await;
        let service = ListingService::new(store.clone(), clock.clone());

        for n in 0..=MAX_PAGE_SIZE {
            let content = fields("Item", "Outros").into_content().unwrap();
            let now = clock.now();
            store
                .insert(&Listing::new(format!("ad-{n}"), "owner-1", "d", content, now, now))
                .await
                .unwrap();
        }

        let listed = service.list("owner-1", None).await.unwrap();
        assert_eq!(listed.len() as i64, MAX_PAGE_SIZE);
    }

    #[tokio::test]
    async fn test_create_missing_field_is_invalid() {
        let (service, _) = setup().await;
        let mut incomplete = fields("Sofa", "Móveis");
        incomplete.price = None;

        let err = service
            .create("owner-1", "device-1", None, incomplete)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_update_restamps_and_missing_is_not_found() {
        let (service, clock) = setup().await;
        let created = service
            .create("owner-1", "device-1", Some("ad-1".into()), fields("Sofa", "Móveis"))
            .await
            .unwrap();

        clock.advance_secs(60);
        let updated = service
            .update(
                "owner-1",
                "ad-1",
                ListingFields {
                    price: Some("80".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.price, "80");
        assert!(updated.updated_at > created.updated_at);
        assert_eq!(updated.created_at, created.created_at);

        let err = service
            .update("owner-1", "nope", ListingFields::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(service.list("owner-1", None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_hides_listing_and_is_repeatable() {
        let (service, _) = setup().await;
        service
            .create("owner-1", "device-1", Some("ad-1".into()), fields("Sofa", "Móveis"))
            .await
            .unwrap();

        service.delete("owner-1", "ad-1").await.unwrap();
        assert!(service.list("owner-1", None).await.unwrap().is_empty());

        // Second delete still succeeds
        service.delete("owner-1", "ad-1").await.unwrap();

        let err = service
            .update("owner-1", "ad-1", ListingFields::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = service.delete("owner-1", "missing").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_since_filters_by_modification() {
        let (service, clock) = setup().await;
        service
            .create("owner-1", "device-1", Some("old".into()), fields("Old", "Outros"))
            .await
            .unwrap();
        let watermark = clock.now();
        clock.advance_secs(10);
        service
            .create("owner-1", "device-1", Some("new".into()), fields("New", "Outros"))
            .await
            .unwrap();

        let listed = service.list("owner-1", Some(watermark)).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, "new");
    }

    #[tokio::test]
    async fn test_stats_group_by_category() {
        let (service, _) = setup().await;
        service
            .create("owner-1", "d", Some("a".into()), fields("A", "Roupas"))
            .await
            .unwrap();
        service
            .create("owner-1", "d", Some("b".into()), fields("B", "Roupas"))
            .await
            .unwrap();
        service
            .create("owner-1", "d", Some("c".into()), fields("C", "Serviços"))
            .await
            .unwrap();
        service.delete("owner-1", "c").await.unwrap();

        let stats = service.stats("owner-1").await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.by_category.len(), 1);
        assert_eq!(stats.by_category[0].category, Category::Clothing);
        assert_eq!(stats.by_category[0].count, 2);
    }
}
