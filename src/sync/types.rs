//! Sync data types
//!
//! Defines the wire shapes of the batch sync endpoint and the per-record
//! outcomes produced by the engine.

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::clock;
use crate::listings::{Listing, ListingFields};

/// A client-proposed listing inside a sync batch
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncCandidate {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(flatten)]
    pub fields: ListingFields,
    #[serde(default, deserialize_with = "normalized_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "normalized_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Older clients send `lastModified` instead of `updatedAt`
    #[serde(default, deserialize_with = "normalized_timestamp")]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_deleted: Option<bool>,
}

impl SyncCandidate {
    /// Client-declared last-modified time
    pub fn declared_modified(&self) -> Option<DateTime<Utc>> {
        self.updated_at.or(self.last_modified)
    }
}

/// Numeric ids are accepted and kept in their decimal text form
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(id) => id,
        RawId::Number(id) => id.to_string(),
    })
}

fn normalized_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<DateTime<Utc>>::deserialize(deserializer)? {
        Some(ts) if !clock::is_storable(ts) => Err(D::Error::custom(format!(
            "timestamp out of range: {ts}"
        ))),
        value => Ok(value.map(clock::normalize)),
    }
}

/// Request body of `POST /advertisements/sync`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    /// Kept as raw JSON so one malformed entry fails alone
    pub advertisements: Option<Value>,
    pub last_sync: Option<String>,
    pub device_id: Option<String>,
    pub platform: Option<String>,
}

/// What happened to one batch entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum RecordOutcome {
    Created { id: String },
    Updated { id: String },
    /// Server copy kept (tie or older client copy)
    Skipped { id: String },
    Failed { id: Option<String>, error: String },
}

/// Entry of the legacy `errors` list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncError {
    pub id: Option<String>,
    pub error: String,
}

/// Result of reconciling one batch
#[derive(Debug, Clone)]
pub struct SyncResult {
    /// One entry per batch element, in input order
    pub outcomes: Vec<RecordOutcome>,
    pub server_changes: Vec<Listing>,
    pub sync_time: DateTime<Utc>,
}

impl SyncResult {
    pub fn created(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, RecordOutcome::Created { .. }))
            .count()
    }

    pub fn updated(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, RecordOutcome::Updated { .. }))
            .count()
    }

    pub fn errors(&self) -> Vec<SyncError> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                RecordOutcome::Failed { id, error } => Some(SyncError {
                    id: id.clone(),
                    error: error.clone(),
                }),
                _ => None,
            })
            .collect()
    }
}

/// Counters block of the sync response
#[derive(Debug, Clone, Serialize)]
pub struct SyncSummary {
    pub created: usize,
    pub updated: usize,
    pub errors: Vec<SyncError>,
    pub outcomes: Vec<RecordOutcome>,
}

/// Response body of `POST /advertisements/sync`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    pub success: bool,
    pub results: SyncSummary,
    pub server_changes: Vec<Listing>,
    pub sync_time: DateTime<Utc>,
}

impl From<SyncResult> for SyncResponse {
    fn from(result: SyncResult) -> Self {
        SyncResponse {
            success: true,
            results: SyncSummary {
                created: result.created(),
                updated: result.updated(),
                errors: result.errors(),
                outcomes: result.outcomes,
            },
            server_changes: result.server_changes,
            sync_time: result.sync_time,
        }
    }
}
