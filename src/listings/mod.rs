//! Listing domain
//!
//! Listing records, field validation, the record store abstraction and the
//! single-record operations exposed over HTTP.

mod service;
mod store;
mod types;

pub use service::{ListingService, MAX_PAGE_SIZE};
pub use store::{ListingStore, StoreError};
pub use types::{
    Category, CategoryCount, Listing, ListingContent, ListingFields, ListingStats,
    normalize_id, ValidationError, DESCRIPTION_MAX_CHARS, TITLE_MAX_CHARS,
};
