//! Classifieds Sync Server
//!
//! Backend for a classified-ads app whose clients edit listings offline on
//! several devices and reconcile with the server copy through a batch sync
//! endpoint using last-write-wins merging.

pub mod app;
pub mod auth;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod listings;
pub mod rate_limit;
pub mod routes;
pub mod state;
pub mod sync;

pub use app::build_router;
pub use config::Config;
pub use state::AppState;
