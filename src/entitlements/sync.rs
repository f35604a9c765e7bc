//! Cache-aside synchronization between the entitlement cache and the store.
//!
//! Reads prefer the cache; any miss or cache error falls back to Postgres,
//! returns the authoritative answer immediately, and warms the cache from a
//! detached task so the caller never waits on cache writes. Writes after a
//! committed purchase update the cache best-effort; a failure there is logged
//! and swallowed because the store is already consistent and the next miss
//! rebuilds.
//!
//! The detached warm races with concurrent purchases: an `insert_incremental`
//! landing before the warm's `store_all` completes can be overwritten by the
//! rebuild. That staleness window is accepted -- the store stays ground truth
//! and the next miss self-heals.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::data::StoreResult;
use crate::data::ids::UserId;
use crate::entitlements::{EntitlementCache, Snapshot, StickerSet};

/// Authoritative source of a user's owned sticker sets.
#[async_trait]
pub trait EntitlementSource: Send + Sync {
    async fn owned_sticker_sets(&self, user: UserId) -> StoreResult<Vec<StickerSet>>;
}

pub struct Synchronizer {
    cache: Arc<EntitlementCache>,
    source: Arc<dyn EntitlementSource>,
}

impl Synchronizer {
    pub fn new(cache: Arc<EntitlementCache>, source: Arc<dyn EntitlementSource>) -> Self {
        Self { cache, source }
    }

    /// The user's current entitlements, cache-aside.
    ///
    /// A cache hit returns without touching the store. Otherwise any torn
    /// state is cleared best-effort, the store is queried, the result is
    /// returned immediately, and a detached task repopulates the cache.
    /// Only store failures propagate.
    pub async fn snapshot(&self, user: UserId) -> StoreResult<Snapshot> {
        match self.cache.get_all(user).await {
            Ok(Some(snapshot)) => return Ok(snapshot),
            Ok(None) => {
                debug!(user_id = %user, "Entitlement cache miss; rebuilding from store");
            }
            Err(err) => {
                warn!(user_id = %user, error = %err, "Entitlement cache read failed; rebuilding from store");
            }
        }

        if let Err(err) = self.cache.invalidate_all(user).await {
            warn!(user_id = %user, error = %err, "Failed to clear entitlement cache before rebuild");
        }

        let sets = self.source.owned_sticker_sets(user).await?;
        let snapshot: Snapshot = sets.into_iter().map(|set| (set.id, set)).collect();

        // Warm the cache off the request path; failures are log-only.
        let cache = Arc::clone(&self.cache);
        let warm = snapshot.clone();
        tokio::spawn(async move {
            if let Err(err) = cache.store_all(user, &warm).await {
                warn!(user_id = %user, error = %err, "Entitlement cache warm failed");
            }
        });

        Ok(snapshot)
    }

    /// Fold a freshly purchased sticker set into the cache, best-effort.
    pub async fn record_purchase(&self, user: UserId, set: &StickerSet) {
        if let Err(err) = self.cache.insert_incremental(user, set).await {
            warn!(
                user_id = %user,
                sticker_set_id = %set.id,
                error = %err,
                "Entitlement cache update after purchase failed"
            );
        }
    }
}

/// Test doubles for the synchronizer's collaborators, shared with the
/// content-filter tests.
#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::data::ids::{Price, StickerId, StickerSetId};
    use crate::entitlements::Sticker;

    /// In-memory `EntitlementSource` with a call counter.
    #[derive(Default)]
    pub(crate) struct StaticSource {
        sets: Mutex<Vec<StickerSet>>,
        calls: AtomicUsize,
    }

    impl StaticSource {
        pub(crate) fn with_sets(sets: Vec<StickerSet>) -> Self {
            Self {
                sets: Mutex::new(sets),
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn push(&self, set: StickerSet) {
            self.sets.lock().unwrap().push(set);
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EntitlementSource for StaticSource {
        async fn owned_sticker_sets(&self, _user: UserId) -> StoreResult<Vec<StickerSet>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.sets.lock().unwrap().clone())
        }
    }

    pub(crate) fn make_set(id: u64, sticker_ids: &[u64]) -> StickerSet {
        StickerSet {
            id: StickerSetId::new(id),
            name: format!("set-{id}"),
            author: "tester".to_owned(),
            price: Price::new(100),
            stickers: sticker_ids
                .iter()
                .map(|&sid| Sticker {
                    id: StickerId::new(sid),
                    sticker_set_id: StickerSetId::new(id),
                    name: format!("sticker-{sid}"),
                })
                .collect(),
        }
    }
}
