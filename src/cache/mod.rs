//! Key-value cache backends.
//!
//! Everything the service wants from Redis goes through the [`Kv`] trait:
//! hash-maps, id sets, plain string keys, and counters. [`RedisKv`] is the
//! production backend; [`MemoryKv`] backs tests and cacheless development.

pub mod memory;
pub mod redis;
pub mod session;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::MemoryKv;
pub use redis::RedisKv;
pub use session::SessionStore;

/// Failure from a key-value backend call (connectivity, timeout, protocol).
#[derive(Debug, Error)]
pub enum KvError {
    #[error("redis: {0}")]
    Redis(#[from] ::redis::RedisError),
    #[error("kv backend: {0}")]
    Backend(String),
}

/// The key-value verbs the service needs from its cache backend.
///
/// Semantics mirror Redis: reads against a missing key yield empty/`None`/
/// `false`, never an error; writes create keys without a TTL until `expire`
/// (or `set_with_ttl`) assigns one; `expire` on a missing key is a no-op.
#[async_trait]
pub trait Kv: Send + Sync {
    /// Whether the key exists.
    async fn exists(&self, key: &str) -> Result<bool, KvError>;

    /// All field/value pairs of a hash key.
    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, KvError>;

    /// Set (or overwrite) fields on a hash key.
    async fn hash_set(&self, key: &str, fields: &[(String, String)]) -> Result<(), KvError>;

    /// Add members to a set key.
    async fn set_add(&self, key: &str, members: &[String]) -> Result<(), KvError>;

    /// Whether a member is in a set key.
    async fn set_contains(&self, key: &str, member: &str) -> Result<bool, KvError>;

    /// Delete keys. Absent keys are ignored.
    async fn delete(&self, keys: &[String]) -> Result<(), KvError>;

    /// Set a key's TTL.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), KvError>;

    /// Read a plain string key.
    async fn get(&self, key: &str) -> Result<Option<String>, KvError>;

    /// Write a plain string key with a TTL.
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), KvError>;

    /// Increment a counter key by one, returning the new value.
    async fn increment(&self, key: &str) -> Result<i64, KvError>;

    /// Round-trip liveness check against the backend.
    async fn ping(&self) -> Result<(), KvError>;
}
