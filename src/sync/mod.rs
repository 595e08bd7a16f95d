//! Multi-device synchronization
//!
//! Clients edit listings offline and periodically push a batch of local
//! copies together with the time of their last successful sync. Each entry
//! is merged with last-write-wins on the declared modification time, and the
//! response carries every listing of the owner that changed after that
//! watermark, including the ones written by the same call.

mod conflict;
mod engine;
mod types;

pub use conflict::{resolve, MergeDecision};
pub use engine::SyncEngine;
pub use types::{
    RecordOutcome, SyncCandidate, SyncError, SyncRequest, SyncResponse, SyncResult, SyncSummary,
};
