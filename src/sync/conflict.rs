//! Last-write-wins conflict resolution
//!
//! A client copy replaces the server copy only when its declared
//! modification time is strictly later. Ties and missing timestamps keep
//! the server copy.

use chrono::{DateTime, Utc};

/// Which copy survives a merge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeDecision {
    /// The incoming client copy overwrites the stored one
    TakeClient,
    /// The stored copy is kept untouched
    KeepServer,
}

pub fn resolve(
    client_modified: Option<DateTime<Utc>>,
    server_modified: DateTime<Utc>,
) -> MergeDecision {
    match client_modified {
        Some(client) if client > server_modified => MergeDecision::TakeClient,
        _ => MergeDecision::KeepServer,
    }
}
