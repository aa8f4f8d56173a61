//! Application state.
//!
//! Holds the service graph built once at startup and hands out request
//! contexts carrying the configured deadline.

use crate::config::{CoreConfig, Settings};
use crate::db::{AsyncDbPool, Ctx};
use crate::repositories::{MemoryStore, Repositories};
use crate::services::Services;

/// Cloning is cheap since services share their repositories behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub core: CoreConfig,
}

impl AppState {
    pub fn new(repos: Repositories, core: CoreConfig) -> Self {
        Self {
            services: Services::new(repos),
            core,
        }
    }

    /// State backed by PostgreSQL through `pool`.
    ///
    /// # Example
    /// ```ignore
    /// let pool = establish_async_connection_pool(&settings.database).await?;
    /// let state = AppState::postgres(pool, &settings);
    /// ```
    pub fn postgres(pool: AsyncDbPool, settings: &Settings) -> Self {
        Self::new(Repositories::postgres(pool), settings.core.clone())
    }

    /// State backed by a fresh in-memory store.
    pub fn in_memory(core: CoreConfig) -> Self {
        Self::new(Repositories::in_memory(MemoryStore::new()), core)
    }

    /// Context for one request, expiring after `core.request_timeout`.
    pub fn request_ctx(&self) -> Ctx {
        Ctx::background().with_timeout(self.core.request_timeout())
    }
}
