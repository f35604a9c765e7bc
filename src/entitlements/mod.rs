//! Per-user sticker entitlements.
//!
//! The authoritative record of "which stickers does this user own" lives in
//! Postgres; a denormalized per-user snapshot of it lives in Redis because the
//! question is asked on the hot path of every chat message. This module owns
//! that snapshot: the key scheme and cache operations ([`cache`]), the
//! cache-aside protocol that keeps snapshot and store acceptably consistent
//! ([`sync`]), and the message-text filter that consumes it ([`filter`]).

pub mod cache;
pub mod filter;
pub mod sync;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use cache::EntitlementCache;
pub use sync::{EntitlementSource, Synchronizer};

use crate::cache::KvError;
use crate::data::ids::{Price, StickerId, StickerSetId};

/// A single sticker inside a set. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Sticker {
    pub id: StickerId,
    pub sticker_set_id: StickerSetId,
    pub name: String,
}

/// A purchasable sticker set with its stickers, ordered by sticker id.
/// Immutable once created; the authoritative copy lives only in Postgres.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StickerSet {
    pub id: StickerSetId,
    pub name: String,
    pub author: String,
    pub price: Price,
    pub stickers: Vec<Sticker>,
}

/// A user's cached entitlements: sticker set id → full sticker set.
///
/// Derived, never authoritative. It may be stale, missing, or torn relative
/// to the store; readers that cannot trust it fall back to Postgres.
pub type Snapshot = HashMap<StickerSetId, StickerSet>;

/// Failure reading or writing the entitlement snapshot.
///
/// A cache *miss* is not an error; [`EntitlementCache::get_all`] models it as
/// `Ok(None)` so callers can tell "confirmed cold" from "cache unavailable".
#[derive(Debug, Error)]
pub enum CacheError {
    /// Backend I/O failure. Readers degrade to the store.
    #[error("entitlement cache unavailable: {0}")]
    Unavailable(#[from] KvError),
    /// Cached bytes failed to deserialize. Readers invalidate and rebuild.
    #[error("corrupt entitlement entry in field {field}: {source}")]
    Corrupt {
        field: String,
        #[source]
        source: serde_json::Error,
    },
    /// A snapshot entry failed to serialize on the way in.
    #[error("failed to encode entitlement entry: {0}")]
    Encode(#[from] serde_json::Error),
}
