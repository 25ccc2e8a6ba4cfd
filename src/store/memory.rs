//! In-memory store backend.
//!
//! Used by tests and by storeless development runs. Dedup records do not
//! survive a restart, so redelivered tokens from before the restart will
//! be processed again.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use super::{PendingReply, Store, UserRecord};
use crate::error::{Error, Result};

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    users: HashSet<String>,
    // Keyed by delivery token; the map key is the uniqueness constraint.
    pending: HashMap<String, PendingReply>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| Error::Persistence("memory store lock poisoned".into()))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ensure_user(&self, user_id: &str) -> Result<()> {
        self.lock()?.users.insert(user_id.to_string());
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>> {
        Ok(self
            .lock()?
            .users
            .iter()
            .map(|user_id| UserRecord { user_id: user_id.clone() })
            .collect())
    }

    async fn insert_pending(&self, pending: &PendingReply) -> Result<bool> {
        let mut inner = self.lock()?;
        if inner.pending.contains_key(&pending.delivery_token) {
            return Ok(false);
        }
        inner.pending.insert(pending.delivery_token.clone(), pending.clone());
        Ok(true)
    }

    async fn find_pending(&self, delivery_token: &str) -> Result<Option<PendingReply>> {
        Ok(self.lock()?.pending.get(delivery_token).cloned())
    }

    async fn delete_pending(&self, id: Uuid) -> Result<()> {
        self.lock()?.pending.retain(|_, pending| pending.id != id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_insert_with_same_token_is_rejected() {
        let store = MemoryStore::new();
        let first = PendingReply::new("tok-1", "user-1", "text", "hello");
        let second = PendingReply::new("tok-1", "user-1", "text", "hello again");

        assert!(store.insert_pending(&first).await.unwrap());
        assert!(!store.insert_pending(&second).await.unwrap());

        let found = store.find_pending("tok-1").await.unwrap().unwrap();
        assert_eq!(found.id, first.id);
    }

    #[tokio::test]
    async fn delete_frees_the_token_for_redelivery() {
        let store = MemoryStore::new();
        let pending = PendingReply::new("tok-2", "user-1", "text", "hi");
        assert!(store.insert_pending(&pending).await.unwrap());

        store.delete_pending(pending.id).await.unwrap();
        assert!(store.find_pending("tok-2").await.unwrap().is_none());
        assert!(store.insert_pending(&pending).await.unwrap());
    }

    #[tokio::test]
    async fn ensure_user_is_idempotent() {
        let store = MemoryStore::new();
        store.ensure_user("user-1").await.unwrap();
        store.ensure_user("user-1").await.unwrap();
        store.ensure_user("user-2").await.unwrap();

        let users = store.list_users().await.unwrap();
        assert_eq!(users.len(), 2);
    }
}
