//! Opaque-token session store over the cache backend.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::{Kv, KvError};
use crate::data::ids::UserId;

/// Sessions are opaque nanoid tokens mapped to user ids under `session:{token}`,
/// expiring after the configured TTL. Every successful resolve refreshes the TTL
/// so active users stay logged in.
#[derive(Clone)]
pub struct SessionStore {
    kv: Arc<dyn Kv>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(kv: Arc<dyn Kv>, ttl: Duration) -> Self {
        Self { kv, ttl }
    }

    /// The configured session lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn key(token: &str) -> String {
        format!("session:{token}")
    }

    /// Mint a fresh session token for the user.
    pub async fn create(&self, user: UserId) -> Result<String, KvError> {
        let token = nanoid::nanoid!();
        self.kv
            .set_with_ttl(&Self::key(&token), &user.to_string(), self.ttl)
            .await?;
        Ok(token)
    }

    /// Resolve a token to its user, refreshing the session TTL on success.
    pub async fn resolve(&self, token: &str) -> Result<Option<UserId>, KvError> {
        let key = Self::key(token);
        let Some(raw) = self.kv.get(&key).await? else {
            return Ok(None);
        };
        let Ok(user) = raw.parse::<UserId>() else {
            // Unreadable session value: drop it and force a re-login.
            self.kv.delete(&[key]).await?;
            return Ok(None);
        };
        self.kv.expire(&key, self.ttl).await?;
        Ok(Some(user))
    }

    /// Delete the session for a token. Unknown tokens are fine.
    pub async fn revoke(&self, token: &str) -> Result<(), KvError> {
        self.kv.delete(&[Self::key(token)]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryKv;

    fn store() -> SessionStore {
        SessionStore::new(Arc::new(MemoryKv::new()), Duration::from_secs(60))
    }

    #[tokio::test]
    async fn create_resolve_revoke() {
        let sessions = store();
        let token = sessions.create(UserId::new(7)).await.unwrap();
        assert_eq!(
            sessions.resolve(&token).await.unwrap(),
            Some(UserId::new(7))
        );

        sessions.revoke(&token).await.unwrap();
        assert_eq!(sessions.resolve(&token).await.unwrap(), None);
    }

    #[tokio::test]
    async fn unknown_token_resolves_to_none() {
        let sessions = store();
        assert_eq!(sessions.resolve("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn corrupt_session_value_is_dropped() {
        let kv = Arc::new(MemoryKv::new());
        let sessions = SessionStore::new(kv.clone(), Duration::from_secs(60));
        kv.set_with_ttl("session:bad", "not-a-user-id", Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(sessions.resolve("bad").await.unwrap(), None);
        assert!(!kv.exists("session:bad").await.unwrap());
    }

    #[tokio::test]
    async fn tokens_are_unique_per_session() {
        let sessions = store();
        let a = sessions.create(UserId::new(1)).await.unwrap();
        let b = sessions.create(UserId::new(1)).await.unwrap();
        assert_ne!(a, b);
    }
}
