//! Batch reconciliation
//!
//! Every entry of a client batch is merged independently against the
//! owner's stored copy; a failing entry never aborts the rest of the batch.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use super::conflict::{resolve, MergeDecision};
use super::types::{RecordOutcome, SyncCandidate, SyncResult};
use crate::clock::Clock;
use crate::listings::{normalize_id, Listing, ListingStore, StoreError};

pub struct SyncEngine {
    store: Arc<dyn ListingStore>,
    clock: Arc<dyn Clock>,
}

impl SyncEngine {
    pub fn new(store: Arc<dyn ListingStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Merge `batch` into the owner's listings, then collect what changed
    /// after `watermark`
    ///
    /// Only an unreachable store fails the whole call. Every other problem is
    /// reported as a `Failed` outcome for the entry that caused it.
    pub async fn reconcile(
        &self,
        owner_id: &str,
        device_id: &str,
        batch: &[Value],
        watermark: Option<DateTime<Utc>>,
    ) -> Result<SyncResult, StoreError> {
        let mut outcomes = Vec::with_capacity(batch.len());

        for raw in batch {
            let outcome = match self.merge_one(owner_id, device_id, raw).await {
                Ok(outcome) => outcome,
                Err(MergeFailure::Fatal(err)) => return Err(err),
                Err(MergeFailure::Record(error)) => {
                    let id = raw_id(raw);
                    warn!(owner = owner_id, id = ?id, %error, "Sync entry failed");
                    RecordOutcome::Failed { id, error }
                }
            };
            outcomes.push(outcome);
        }

        let server_changes = match watermark {
            Some(watermark) => self.store.changed_since(owner_id, watermark).await?,
            None => Vec::new(),
        };

        let result = SyncResult {
            outcomes,
            server_changes,
            sync_time: self.clock.now(),
        };
        debug!(
            owner = owner_id,
            device = device_id,
            created = result.created(),
            updated = result.updated(),
            changes = result.server_changes.len(),
            "Sync reconciled"
        );
        Ok(result)
    }

    async fn merge_one(
        &self,
        owner_id: &str,
        device_id: &str,
        raw: &Value,
    ) -> Result<RecordOutcome, MergeFailure> {
        let candidate: SyncCandidate = serde_json::from_value(raw.clone())
            .map_err(|e| MergeFailure::Record(format!("Malformed advertisement: {e}")))?;

        let id = normalize_id(&candidate.id)
            .ok_or_else(|| MergeFailure::Record("Advertisement id is required".to_string()))?;

        match self.store.find(owner_id, &id).await? {
            None => {
                let now = self.clock.now();
                let content = candidate.fields.clone().into_content()?;
                let created_at = candidate.created_at.unwrap_or(now);
                let updated_at = candidate.declared_modified().unwrap_or(now);

                let mut listing =
                    Listing::new(id.clone(), owner_id, device_id, content, created_at, updated_at);
                listing.is_deleted = candidate.is_deleted.unwrap_or(false);

                self.store.insert(&listing).await?;
                Ok(RecordOutcome::Created { id })
            }
            Some(mut existing) => {
                match resolve(candidate.declared_modified(), existing.updated_at) {
                    MergeDecision::KeepServer => Ok(RecordOutcome::Skipped { id }),
                    MergeDecision::TakeClient => {
                        let content = candidate.fields.clone().apply_to(existing.content())?;
                        existing.set_content(content);
                        existing.device_id = device_id.to_string();
                        existing.is_deleted = candidate.is_deleted.unwrap_or(existing.is_deleted);
                        existing.updated_at = self.clock.now();

                        if !self.store.replace(&existing).await? {
                            return Err(MergeFailure::Record(
                                "Advertisement vanished during sync".to_string(),
                            ));
                        }
                        Ok(RecordOutcome::Updated { id })
                    }
                }
            }
        }
    }
}

/// Why a single entry could not be merged
enum MergeFailure {
    /// Aborts the whole call
    Fatal(StoreError),
    /// Recorded against the entry only
    Record(String),
}

impl From<StoreError> for MergeFailure {
    fn from(err: StoreError) -> Self {
        match err {
            err if err.is_unavailable() => MergeFailure::Fatal(err),
            StoreError::Duplicate => {
                MergeFailure::Record("Advertisement already exists".to_string())
            }
            other => MergeFailure::Record(other.to_string()),
        }
    }
}

impl From<crate::listings::ValidationError> for MergeFailure {
    fn from(err: crate::listings::ValidationError) -> Self {
        MergeFailure::Record(err.to_string())
    }
}

/// Best-effort id of an entry that could not be parsed
fn raw_id(raw: &Value) -> Option<String> {
    match raw.get("id")? {
        Value::String(s) => normalize_id(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
