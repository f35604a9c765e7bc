//! Application state shared across the web layer.

use std::sync::Arc;
use std::time::Instant;

use sqlx::PgPool;

use crate::cache::{Kv, SessionStore};
use crate::entitlements::Synchronizer;

/// Shared handles for request handlers. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub kv: Arc<dyn Kv>,
    pub sessions: SessionStore,
    pub entitlements: Arc<Synchronizer>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        db_pool: PgPool,
        kv: Arc<dyn Kv>,
        sessions: SessionStore,
        entitlements: Arc<Synchronizer>,
    ) -> Self {
        Self {
            db_pool,
            kv,
            sessions,
            entitlements,
            started_at: Instant::now(),
        }
    }
}
