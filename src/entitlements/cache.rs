//! Cache operations for per-user entitlement snapshots.
//!
//! Two key families per user, deliberately independent because the backend
//! has no cross-key transactions:
//!
//! - `sticker::user:{userId}` -- a hash with one field per owned sticker set
//!   id, each value the JSON-serialized [`StickerSet`] (members included);
//! - `sticker::user:{userId}::set:{stickerSetId}` -- a set of owned sticker
//!   ids, for membership checks without deserializing the snapshot.
//!
//! Both families share one TTL. Successful reads and writes extend it; a
//! failed TTL refresh never turns a successful read into an error.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::cache::Kv;
use crate::data::ids::{StickerId, StickerSetId, UserId};
use crate::entitlements::{CacheError, Snapshot, StickerSet};

pub struct EntitlementCache {
    kv: Arc<dyn Kv>,
    ttl: Duration,
}

impl EntitlementCache {
    pub fn new(kv: Arc<dyn Kv>, ttl: Duration) -> Self {
        Self { kv, ttl }
    }

    pub(crate) fn snapshot_key(user: UserId) -> String {
        format!("sticker::user:{user}")
    }

    pub(crate) fn member_key(user: UserId, set: StickerSetId) -> String {
        format!("sticker::user:{user}::set:{set}")
    }

    /// Read the user's full snapshot.
    ///
    /// `Ok(None)` means the snapshot key does not exist (confirmed cold), as
    /// opposed to `Err(_)` for an unreadable or unreachable cache. Callers use
    /// the distinction to decide whether torn state needs clearing first.
    pub async fn get_all(&self, user: UserId) -> Result<Option<Snapshot>, CacheError> {
        let key = Self::snapshot_key(user);
        if !self.kv.exists(&key).await? {
            return Ok(None);
        }

        let fields = self.kv.hash_get_all(&key).await?;
        let mut snapshot = Snapshot::with_capacity(fields.len());
        for (field, raw) in fields {
            let set: StickerSet = serde_json::from_str(&raw)
                .map_err(|source| CacheError::Corrupt { field, source })?;
            snapshot.insert(set.id, set);
        }

        if let Err(err) = self.kv.expire(&key, self.ttl).await {
            warn!(user_id = %user, error = %err, "Failed to refresh entitlement snapshot TTL");
        }
        Ok(Some(snapshot))
    }

    /// Merge one sticker set into an existing snapshot.
    ///
    /// If the snapshot key is absent this is a no-op: the user's next read
    /// falls through to a full store-backed rebuild, which will include this
    /// set anyway. When the key exists, the hash field is overwritten and the
    /// matching membership set recreated, refreshing the TTL on both.
    pub async fn insert_incremental(
        &self,
        user: UserId,
        set: &StickerSet,
    ) -> Result<(), CacheError> {
        let key = Self::snapshot_key(user);
        if !self.kv.exists(&key).await? {
            return Ok(());
        }

        let raw = serde_json::to_string(set)?;
        self.kv
            .hash_set(&key, &[(set.id.to_string(), raw)])
            .await?;
        self.rebuild_member_set(user, set).await?;
        self.kv.expire(&key, self.ttl).await?;
        Ok(())
    }

    /// Replace the snapshot with a full store-backed rebuild.
    ///
    /// Writes every sticker set's hash field and membership set under one
    /// uniform TTL. An empty snapshot writes nothing, leaving the user cold.
    pub async fn store_all(&self, user: UserId, snapshot: &Snapshot) -> Result<(), CacheError> {
        if snapshot.is_empty() {
            return Ok(());
        }

        let key = Self::snapshot_key(user);
        let mut fields = Vec::with_capacity(snapshot.len());
        for set in snapshot.values() {
            fields.push((set.id.to_string(), serde_json::to_string(set)?));
        }
        self.kv.hash_set(&key, &fields).await?;
        self.kv.expire(&key, self.ttl).await?;

        for set in snapshot.values() {
            self.rebuild_member_set(user, set).await?;
        }
        Ok(())
    }

    /// Whether the membership set records this sticker, without touching the
    /// snapshot hash. Any successful query refreshes that set's TTL so hot
    /// entitlements stay alive longer.
    pub async fn check_membership(
        &self,
        user: UserId,
        set: StickerSetId,
        sticker: StickerId,
    ) -> Result<bool, CacheError> {
        let key = Self::member_key(user, set);
        let found = self.kv.set_contains(&key, &sticker.to_string()).await?;
        if let Err(err) = self.kv.expire(&key, self.ttl).await {
            warn!(user_id = %user, sticker_set_id = %set, error = %err, "Failed to refresh membership TTL");
        }
        Ok(found)
    }

    /// Delete the snapshot hash and every membership set discoverable from
    /// its field names. Fields that do not parse as a sticker set id are
    /// skipped; their orphaned membership keys age out via TTL. Nothing to
    /// delete is success.
    pub async fn invalidate_all(&self, user: UserId) -> Result<(), CacheError> {
        let key = Self::snapshot_key(user);
        let fields = self.kv.hash_get_all(&key).await?;
        let mut keys: Vec<String> = fields
            .keys()
            .filter_map(|field| field.parse::<StickerSetId>().ok())
            .map(|set| Self::member_key(user, set))
            .collect();
        keys.push(key);
        self.kv.delete(&keys).await?;
        Ok(())
    }

    /// Drop and rebuild the membership set for one sticker set.
    async fn rebuild_member_set(&self, user: UserId, set: &StickerSet) -> Result<(), CacheError> {
        let key = Self::member_key(user, set.id);
        self.kv.delete(&[key.clone()]).await?;
        let ids: Vec<String> = set.stickers.iter().map(|s| s.id.to_string()).collect();
        if !ids.is_empty() {
            self.kv.set_add(&key, &ids).await?;
            self.kv.expire(&key, self.ttl).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryKv;
    use crate::data::ids::Price;
    use crate::entitlements::Sticker;

    fn cache() -> (Arc<MemoryKv>, EntitlementCache) {
        let kv = Arc::new(MemoryKv::new());
        let cache = EntitlementCache::new(kv.clone(), Duration::from_secs(3600));
        (kv, cache)
    }

    fn set(id: u64, sticker_ids: &[u64]) -> StickerSet {
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

    fn snapshot_of(sets: &[StickerSet]) -> Snapshot {
        sets.iter().map(|s| (s.id, s.clone())).collect()
    }

    const USER: UserId = UserId::new(1);

    // -- read path --

    #[tokio::test]
    async fn cold_cache_reads_as_none() {
        let (_, cache) = cache();
        assert!(cache.get_all(USER).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn store_all_then_get_all_roundtrips() {
        let (_, cache) = cache();
        let snapshot = snapshot_of(&[set(42, &[7, 8]), set(43, &[9])]);

        cache.store_all(USER, &snapshot).await.unwrap();
        let read = cache.get_all(USER).await.unwrap().unwrap();
        assert_eq!(read, snapshot);

        assert!(
            cache
                .check_membership(USER, StickerSetId::new(42), StickerId::new(7))
                .await
                .unwrap()
        );
        assert!(
            !cache
                .check_membership(USER, StickerSetId::new(42), StickerId::new(9))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn corrupt_field_surfaces_as_error_not_miss() {
        let (kv, cache) = cache();
        kv.hash_set(
            &EntitlementCache::snapshot_key(USER),
            &[("42".to_owned(), "{not json".to_owned())],
        )
        .await
        .unwrap();

        let err = cache.get_all(USER).await.unwrap_err();
        assert!(matches!(err, CacheError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn membership_check_on_missing_key_is_false() {
        let (_, cache) = cache();
        assert!(
            !cache
                .check_membership(USER, StickerSetId::new(1), StickerId::new(1))
                .await
                .unwrap()
        );
    }

    // -- incremental updates --

    #[tokio::test]
    async fn insert_on_absent_snapshot_is_a_noop() {
        let (kv, cache) = cache();
        cache.insert_incremental(USER, &set(42, &[7])).await.unwrap();

        assert!(cache.get_all(USER).await.unwrap().is_none());
        assert!(
            !kv.exists(&EntitlementCache::snapshot_key(USER))
                .await
                .unwrap()
        );
        assert!(
            !cache
                .check_membership(USER, StickerSetId::new(42), StickerId::new(7))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn insert_merges_into_existing_snapshot() {
        let (_, cache) = cache();
        cache
            .store_all(USER, &snapshot_of(&[set(1, &[10])]))
            .await
            .unwrap();

        cache.insert_incremental(USER, &set(2, &[20, 21])).await.unwrap();

        let read = cache.get_all(USER).await.unwrap().unwrap();
        assert_eq!(read.len(), 2);
        assert!(read.contains_key(&StickerSetId::new(1)));
        assert_eq!(read[&StickerSetId::new(2)].stickers.len(), 2);
        assert!(
            cache
                .check_membership(USER, StickerSetId::new(2), StickerId::new(20))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn insert_twice_matches_insert_once() {
        let (_, cache) = cache();
        cache
            .store_all(USER, &snapshot_of(&[set(1, &[10])]))
            .await
            .unwrap();

        let new_set = set(42, &[7, 8]);
        cache.insert_incremental(USER, &new_set).await.unwrap();
        let after_once = cache.get_all(USER).await.unwrap().unwrap();

        cache.insert_incremental(USER, &new_set).await.unwrap();
        let after_twice = cache.get_all(USER).await.unwrap().unwrap();

        assert_eq!(after_once, after_twice);
        for sticker in [7, 8] {
            assert!(
                cache
                    .check_membership(USER, StickerSetId::new(42), StickerId::new(sticker))
                    .await
                    .unwrap()
            );
        }
    }

    #[tokio::test]
    async fn insert_recreates_the_member_set() {
        let (_, cache) = cache();
        cache
            .store_all(USER, &snapshot_of(&[set(42, &[1, 2])]))
            .await
            .unwrap();

        // Same set republished with a different sticker roster.
        cache.insert_incremental(USER, &set(42, &[2, 3])).await.unwrap();

        let members = [
            (1, false),
            (2, true),
            (3, true),
        ];
        for (sticker, expected) in members {
            assert_eq!(
                cache
                    .check_membership(USER, StickerSetId::new(42), StickerId::new(sticker))
                    .await
                    .unwrap(),
                expected,
                "sticker {sticker}"
            );
        }
    }

    // -- invalidation --

    #[tokio::test]
    async fn invalidate_clears_snapshot_and_member_sets() {
        let (kv, cache) = cache();
        let snapshot = snapshot_of(&[set(42, &[7]), set(43, &[9])]);
        cache.store_all(USER, &snapshot).await.unwrap();

        cache.invalidate_all(USER).await.unwrap();

        assert!(cache.get_all(USER).await.unwrap().is_none());
        assert!(
            !kv.exists(&EntitlementCache::member_key(USER, StickerSetId::new(42)))
                .await
                .unwrap()
        );
        assert!(
            !kv.exists(&EntitlementCache::member_key(USER, StickerSetId::new(43)))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn invalidate_with_nothing_cached_is_success() {
        let (_, cache) = cache();
        cache.invalidate_all(USER).await.unwrap();
    }

    #[tokio::test]
    async fn invalidate_tolerates_unparseable_field_names() {
        let (kv, cache) = cache();
        kv.hash_set(
            &EntitlementCache::snapshot_key(USER),
            &[("garbage".to_owned(), "{}".to_owned())],
        )
        .await
        .unwrap();

        cache.invalidate_all(USER).await.unwrap();
        assert!(cache.get_all(USER).await.unwrap().is_none());
    }

    // -- store_all edge cases --

    #[tokio::test]
    async fn store_all_empty_leaves_user_cold() {
        let (kv, cache) = cache();
        cache.store_all(USER, &Snapshot::new()).await.unwrap();

        assert!(cache.get_all(USER).await.unwrap().is_none());
        assert!(
            !kv.exists(&EntitlementCache::snapshot_key(USER))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn store_all_with_empty_sticker_roster_skips_member_set() {
        let (kv, cache) = cache();
        cache
            .store_all(USER, &snapshot_of(&[set(42, &[])]))
            .await
            .unwrap();

        // Snapshot exists, but no membership key was created.
        assert!(cache.get_all(USER).await.unwrap().is_some());
        assert!(
            !kv.exists(&EntitlementCache::member_key(USER, StickerSetId::new(42)))
                .await
                .unwrap()
        );
    }
}
