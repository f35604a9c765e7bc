//! Sticker set purchase: debit, bind ownership, update the cache.
//!
//! Everything that moves money or ownership happens in one transaction, so a
//! purchase either fully completes or leaves no trace. Only after commit is
//! the entitlement cache told about the new set, best-effort -- the cache
//! write failing cannot un-ring the purchase.

use sqlx::PgPool;
use thiserror::Error;

use crate::data::ids::{StickerSetId, UserId};
use crate::data::{StoreError, stickers, wallet};
use crate::entitlements::{StickerSet, Synchronizer};

#[derive(Debug, Error)]
pub enum PurchaseError {
    #[error("sticker set not found")]
    NotFound,
    #[error("insufficient funds")]
    InsufficientFunds,
    #[error("sticker set already owned")]
    AlreadyOwned,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<sqlx::Error> for PurchaseError {
    fn from(err: sqlx::Error) -> Self {
        Self::Store(StoreError::from(err))
    }
}

/// Buy a sticker set for the session user. Returns the purchased set.
pub async fn buy_sticker_set(
    buyer: UserId,
    set_id: StickerSetId,
    sync: &Synchronizer,
    pool: &PgPool,
) -> Result<StickerSet, PurchaseError> {
    let mut tx = pool.begin().await?;

    let set = match stickers::get_set(&mut tx, set_id).await {
        Ok(set) => set,
        Err(StoreError::NotFound(_)) => return Err(PurchaseError::NotFound),
        Err(err) => return Err(err.into()),
    };

    // Check and deduct are a single conditional UPDATE; the ledger entry
    // lands in the same transaction.
    if !wallet::debit(&mut tx, buyer, i64::from(set.price.get())).await? {
        return Err(PurchaseError::InsufficientFunds);
    }

    if stickers::is_owned(&mut *tx, buyer, set_id).await? {
        return Err(PurchaseError::AlreadyOwned);
    }
    // A concurrent purchase can still win between the check and the insert;
    // the primary key turns that race into the same answer.
    match stickers::insert_ownership(&mut tx, buyer, set_id).await {
        Ok(()) => {}
        Err(StoreError::Conflict(_)) => return Err(PurchaseError::AlreadyOwned),
        Err(err) => return Err(err.into()),
    }

    tx.commit().await?;

    sync.record_purchase(buyer, &set).await;

    Ok(set)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::Utc;

    use super::*;
    use crate::cache::MemoryKv;
    use crate::data::models::LedgerKind;
    use crate::data::stickers::PgEntitlements;
    use crate::data::users;
    use crate::entitlements::EntitlementCache;

    // Seeded catalog: set 3 ("Pixel Ducks") is the cheapest at 80.
    const DUCKS: StickerSetId = StickerSetId::new(3);

    fn synchronizer(pool: &PgPool) -> Synchronizer {
        let cache = Arc::new(EntitlementCache::new(
            Arc::new(MemoryKv::new()),
            Duration::from_secs(3600),
        ));
        Synchronizer::new(cache, Arc::new(PgEntitlements::new(pool.clone())))
    }

    async fn buyer_with_balance(balance: i64, pool: &PgPool) -> UserId {
        let user = users::create("penny", "test-hash", pool).await.unwrap();
        wallet::charge(user.id, balance, pool).await.unwrap();
        user.id
    }

    async fn ledger(user: UserId, pool: &PgPool) -> Vec<(LedgerKind, i64)> {
        let cursor = Utc::now() + chrono::Duration::days(1);
        wallet::log(user, cursor, -50, pool)
            .await
            .unwrap()
            .into_iter()
            .map(|entry| (entry.kind, entry.amount))
            .collect()
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn failed_purchase_leaves_wallet_and_ownership_untouched(pool: PgPool) {
        let buyer = buyer_with_balance(5, &pool).await;
        let sync = synchronizer(&pool);

        let err = buy_sticker_set(buyer, DUCKS, &sync, &pool)
            .await
            .unwrap_err();

        assert!(matches!(err, PurchaseError::InsufficientFunds));
        assert_eq!(wallet::balance(buyer, &pool).await.unwrap(), 5);
        assert!(!stickers::is_owned(&pool, buyer, DUCKS).await.unwrap());
        // Only the top-up is on the ledger; no cost was recorded.
        assert_eq!(ledger(buyer, &pool).await, vec![(LedgerKind::Charge, 5)]);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn purchase_debits_binds_and_logs_together(pool: PgPool) {
        let buyer = buyer_with_balance(100, &pool).await;
        let sync = synchronizer(&pool);

        let set = buy_sticker_set(buyer, DUCKS, &sync, &pool).await.unwrap();

        assert_eq!(set.id, DUCKS);
        assert_eq!(wallet::balance(buyer, &pool).await.unwrap(), 20);
        assert!(stickers::is_owned(&pool, buyer, DUCKS).await.unwrap());
        let log = ledger(buyer, &pool).await;
        assert_eq!(log.len(), 2);
        assert!(log.contains(&(LedgerKind::Cost, 80)));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn repeat_purchase_rolls_back_the_debit(pool: PgPool) {
        let buyer = buyer_with_balance(200, &pool).await;
        let sync = synchronizer(&pool);

        buy_sticker_set(buyer, DUCKS, &sync, &pool).await.unwrap();
        let err = buy_sticker_set(buyer, DUCKS, &sync, &pool)
            .await
            .unwrap_err();

        assert!(matches!(err, PurchaseError::AlreadyOwned));
        // The second debit happened inside the aborted transaction.
        assert_eq!(wallet::balance(buyer, &pool).await.unwrap(), 120);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn unknown_set_is_not_found(pool: PgPool) {
        let buyer = buyer_with_balance(100, &pool).await;
        let sync = synchronizer(&pool);

        let err = buy_sticker_set(buyer, StickerSetId::new(999), &sync, &pool)
            .await
            .unwrap_err();

        assert!(matches!(err, PurchaseError::NotFound));
        assert_eq!(wallet::balance(buyer, &pool).await.unwrap(), 100);
    }
}
