//! Application state management

use std::sync::Arc;
use std::time::Instant;

use sqlx::SqlitePool;

use crate::auth::TokenVerifier;
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::db::SqliteListingStore;
use crate::listings::{ListingService, ListingStore};
use crate::rate_limit::RateLimiter;
use crate::sync::SyncEngine;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    db: SqlitePool,
    listings: ListingService,
    sync: SyncEngine,
    clock: Arc<dyn Clock>,
    verifier: TokenVerifier,
    limiter: RateLimiter,
    started_at: Instant,
}

impl AppState {
    /// Create application state on top of an open pool, using the wall clock
    pub fn new(config: Config, db: SqlitePool) -> Self {
        Self::with_clock(config, db, Arc::new(SystemClock))
    }

    pub fn with_clock(config: Config, db: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        let store: Arc<dyn ListingStore> = Arc::new(SqliteListingStore::new(db.clone()));

        Self {
            inner: Arc::new(AppStateInner {
                listings: ListingService::new(store.clone(), clock.clone()),
                sync: SyncEngine::new(store, clock.clone()),
                verifier: TokenVerifier::new(&config.auth),
                limiter: RateLimiter::from_config(&config.rate_limit),
                clock,
                config,
                db,
                started_at: Instant::now(),
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the database pool
    pub fn db(&self) -> &SqlitePool {
        &self.inner.db
    }

    pub fn listings(&self) -> &ListingService {
        &self.inner.listings
    }

    pub fn sync_engine(&self) -> &SyncEngine {
        &self.inner.sync
    }

    pub fn clock(&self) -> &dyn Clock {
        self.inner.clock.as_ref()
    }

    pub fn verifier(&self) -> &TokenVerifier {
        &self.inner.verifier
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.inner.limiter
    }

    /// Seconds since the state was built
    pub fn uptime_secs(&self) -> f64 {
        self.inner.started_at.elapsed().as_secs_f64()
    }

    /// Close the database pool; waits for checked-out connections
    pub async fn shutdown(&self) {
        self.inner.db.close().await;
        tracing::info!("Database pool closed");
    }
}
