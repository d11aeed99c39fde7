//! Login sessions
//!
//! Each login gets its own bearer token. Handlers look the session up per
//! request; there is no process-wide "logged in" state.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub token: Uuid,
    pub customer_id: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

pub struct SessionStore {
    ttl: chrono::Duration,
    sessions: RwLock<HashMap<Uuid, Session>>,
}

impl SessionStore {
    /// Fails if `ttl` does not fit a signed timestamp delta.
    pub fn new(ttl: std::time::Duration) -> Result<Self> {
        let ttl = chrono::Duration::from_std(ttl).map_err(|_| Error::InvalidConfig {
            key: "SESSION_TTL_SECS",
            message: format!("session lifetime {:?} is out of range", ttl).into(),
        })?;
        Ok(Self {
            ttl,
            sessions: RwLock::new(HashMap::new()),
        })
    }

    pub async fn create(&self, customer_id: &str, username: &str) -> Result<Session> {
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| Error::InvalidConfig {
                key: "SESSION_TTL_SECS",
                message: "session expiry overflows the calendar".into(),
            })?;
        let session = Session {
            token: Uuid::new_v4(),
            customer_id: customer_id.to_string(),
            username: username.to_string(),
            created_at: now,
            expires_at,
        };
        self.sessions
            .write()
            .await
            .insert(session.token, session.clone());
        debug!("Session opened for customer {}", customer_id);
        Ok(session)
    }

    /// Live session for `token`. Expired sessions are removed and yield `None`.
    pub async fn get(&self, token: &Uuid) -> Option<Session> {
        let now = Utc::now();
        {
            let sessions = self.sessions.read().await;
            match sessions.get(token) {
                Some(session) if !session.is_expired_at(now) => return Some(session.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        self.sessions.write().await.remove(token);
        None
    }

    /// Returns true if a session was removed.
    pub async fn revoke(&self, token: &Uuid) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }

    /// Drop every expired session, returning how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired_at(now));
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_create_and_get() {
        let store = SessionStore::new(Duration::from_secs(60)).unwrap();
        let session = store.create("X", "Xuan").await.unwrap();
        let found = store.get(&session.token).await.unwrap();
        assert_eq!(found.customer_id, "X");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let store = SessionStore::new(Duration::from_secs(60)).unwrap();
        let a = store.create("X", "Xuan").await.unwrap();
        let b = store.create("Y", "Yen").await.unwrap();
        assert_ne!(a.token, b.token);

        assert!(store.revoke(&a.token).await);
        assert!(store.get(&a.token).await.is_none());
        assert_eq!(store.get(&b.token).await.unwrap().customer_id, "Y");
        assert!(!store.revoke(&a.token).await);
    }

    #[tokio::test]
    async fn test_expired_sessions() {
        let store = SessionStore::new(Duration::ZERO).unwrap();
        let session = store.create("X", "Xuan").await.unwrap();
        assert!(store.get(&session.token).await.is_none());
        assert!(store.is_empty().await);

        store.create("Y", "Yen").await.unwrap();
        assert_eq!(store.purge_expired().await, 1);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_unknown_token() {
        let store = SessionStore::new(Duration::from_secs(60)).unwrap();
        assert!(store.get(&Uuid::new_v4()).await.is_none());
    }

    #[tokio::test]
    async fn test_oversized_ttl_fails_cleanly() {
        // Representable as a delta but past the last supported date.
        let store = SessionStore::new(Duration::from_secs(1_000_000_000_000_000)).unwrap();
        assert!(matches!(
            store.create("X", "Xuan").await,
            Err(Error::InvalidConfig { .. })
        ));
        assert!(store.is_empty().await);

        assert!(SessionStore::new(Duration::from_secs(u64::MAX)).is_err());
    }
}
