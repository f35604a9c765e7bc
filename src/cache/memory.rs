//! In-memory implementation of the [`Kv`] trait.
//!
//! Backs the test suite and cacheless local development. Expiry is lazy:
//! entries past their deadline are dropped the next time the key is touched.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::cache::{Kv, KvError};

#[derive(Debug, Clone)]
enum Value {
    Text(String),
    Hash(HashMap<String, String>),
    Set(HashSet<String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Instant::now())
    }
}

#[derive(Default)]
pub struct MemoryKv {
    entries: DashMap<String, Entry>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the entry if its deadline has passed.
    fn purge_expired(&self, key: &str) {
        self.entries.remove_if(key, |_, entry| entry.expired());
    }

    fn wrong_type(key: &str) -> KvError {
        KvError::Backend(format!("wrong value type at key {key}"))
    }
}

#[async_trait]
impl Kv for MemoryKv {
    async fn exists(&self, key: &str) -> Result<bool, KvError> {
        self.purge_expired(key);
        Ok(self.entries.contains_key(key))
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, KvError> {
        self.purge_expired(key);
        match self.entries.get(key).map(|e| e.value.clone()) {
            Some(Value::Hash(map)) => Ok(map),
            Some(_) => Err(Self::wrong_type(key)),
            None => Ok(HashMap::new()),
        }
    }

    async fn hash_set(&self, key: &str, fields: &[(String, String)]) -> Result<(), KvError> {
        if fields.is_empty() {
            return Ok(());
        }
        self.purge_expired(key);
        match self.entries.entry(key.to_owned()) {
            dashmap::Entry::Occupied(mut occupied) => match &mut occupied.get_mut().value {
                Value::Hash(map) => {
                    for (field, value) in fields {
                        map.insert(field.clone(), value.clone());
                    }
                    Ok(())
                }
                _ => Err(Self::wrong_type(key)),
            },
            dashmap::Entry::Vacant(vacant) => {
                vacant.insert(Entry {
                    value: Value::Hash(fields.iter().cloned().collect()),
                    expires_at: None,
                });
                Ok(())
            }
        }
    }

    async fn set_add(&self, key: &str, members: &[String]) -> Result<(), KvError> {
        if members.is_empty() {
            return Ok(());
        }
        self.purge_expired(key);
        match self.entries.entry(key.to_owned()) {
            dashmap::Entry::Occupied(mut occupied) => match &mut occupied.get_mut().value {
                Value::Set(set) => {
                    set.extend(members.iter().cloned());
                    Ok(())
                }
                _ => Err(Self::wrong_type(key)),
            },
            dashmap::Entry::Vacant(vacant) => {
                vacant.insert(Entry {
                    value: Value::Set(members.iter().cloned().collect()),
                    expires_at: None,
                });
                Ok(())
            }
        }
    }

    async fn set_contains(&self, key: &str, member: &str) -> Result<bool, KvError> {
        self.purge_expired(key);
        match self.entries.get(key) {
            Some(entry) => match &entry.value {
                Value::Set(set) => Ok(set.contains(member)),
                _ => Err(Self::wrong_type(key)),
            },
            None => Ok(false),
        }
    }

    async fn delete(&self, keys: &[String]) -> Result<(), KvError> {
        for key in keys {
            self.entries.remove(key);
        }
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), KvError> {
        self.purge_expired(key);
        if let Some(mut entry) = self.entries.get_mut(key) {
            entry.expires_at = Some(Instant::now() + ttl);
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        self.purge_expired(key);
        match self.entries.get(key) {
            Some(entry) => match &entry.value {
                Value::Text(text) => Ok(Some(text.clone())),
                _ => Err(Self::wrong_type(key)),
            },
            None => Ok(None),
        }
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), KvError> {
        self.entries.insert(
            key.to_owned(),
            Entry {
                value: Value::Text(value.to_owned()),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn increment(&self, key: &str) -> Result<i64, KvError> {
        self.purge_expired(key);
        match self.entries.entry(key.to_owned()) {
            dashmap::Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                let Value::Text(text) = &entry.value else {
                    return Err(Self::wrong_type(key));
                };
                let next = text
                    .parse::<i64>()
                    .map_err(|_| KvError::Backend(format!("non-integer value at key {key}")))?
                    + 1;
                entry.value = Value::Text(next.to_string());
                Ok(next)
            }
            dashmap::Entry::Vacant(vacant) => {
                vacant.insert(Entry {
                    value: Value::Text("1".to_owned()),
                    expires_at: None,
                });
                Ok(1)
            }
        }
    }

    async fn ping(&self) -> Result<(), KvError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_roundtrip_and_missing_key() {
        let kv = MemoryKv::new();
        assert!(!kv.exists("h").await.unwrap());
        assert!(kv.hash_get_all("h").await.unwrap().is_empty());

        kv.hash_set("h", &[("a".into(), "1".into()), ("b".into(), "2".into())])
            .await
            .unwrap();
        kv.hash_set("h", &[("b".into(), "3".into())]).await.unwrap();

        let map = kv.hash_get_all("h").await.unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["a"], "1");
        assert_eq!(map["b"], "3");
        assert!(kv.exists("h").await.unwrap());
    }

    #[tokio::test]
    async fn set_membership() {
        let kv = MemoryKv::new();
        assert!(!kv.set_contains("s", "7").await.unwrap());

        kv.set_add("s", &["7".into(), "9".into()]).await.unwrap();
        assert!(kv.set_contains("s", "7").await.unwrap());
        assert!(!kv.set_contains("s", "8").await.unwrap());

        kv.delete(&["s".into()]).await.unwrap();
        assert!(!kv.set_contains("s", "7").await.unwrap());
    }

    #[tokio::test]
    async fn zero_ttl_expires_immediately() {
        let kv = MemoryKv::new();
        kv.set_with_ttl("t", "v", Duration::ZERO).await.unwrap();
        assert_eq!(kv.get("t").await.unwrap(), None);
        assert!(!kv.exists("t").await.unwrap());
    }

    #[tokio::test]
    async fn expire_applies_to_existing_keys_only() {
        let kv = MemoryKv::new();
        kv.hash_set("h", &[("a".into(), "1".into())]).await.unwrap();
        kv.expire("h", Duration::ZERO).await.unwrap();
        assert!(!kv.exists("h").await.unwrap());

        // Missing key: no-op, nothing created.
        kv.expire("nope", Duration::from_secs(60)).await.unwrap();
        assert!(!kv.exists("nope").await.unwrap());
    }

    #[tokio::test]
    async fn increment_counts_from_one() {
        let kv = MemoryKv::new();
        assert_eq!(kv.increment("c").await.unwrap(), 1);
        assert_eq!(kv.increment("c").await.unwrap(), 2);
        assert_eq!(kv.increment("c").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn wrong_type_is_an_error() {
        let kv = MemoryKv::new();
        kv.set_add("s", &["1".into()]).await.unwrap();
        assert!(kv.hash_get_all("s").await.is_err());
        assert!(kv.get("s").await.is_err());
        assert!(kv.increment("s").await.is_err());
    }
}
