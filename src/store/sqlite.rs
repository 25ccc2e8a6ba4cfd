//! SQLite store backend.
//!
//! A single serialized connection driven through `tokio-rusqlite`. The
//! `UNIQUE` constraint on `delivery_token` plus `INSERT OR IGNORE` makes
//! admission atomic even across process restarts. Every operation carries
//! a timeout so a wedged database cannot stall event processing forever.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};
use tokio_rusqlite::Connection;
use uuid::Uuid;

use super::{PendingReply, Store, UserRecord};
use crate::error::{Error, Result};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    user_id TEXT PRIMARY KEY
);
CREATE TABLE IF NOT EXISTS pending_replies (
    id             TEXT PRIMARY KEY,
    delivery_token TEXT NOT NULL UNIQUE,
    user_id        TEXT NOT NULL,
    kind           TEXT NOT NULL,
    text           TEXT NOT NULL,
    created_at     TEXT NOT NULL
);
";

pub struct SqliteStore {
    conn: Connection,
    op_timeout: Duration,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and apply the schema.
    pub async fn open(path: PathBuf, op_timeout: Duration) -> Result<Self> {
        let conn = Connection::open(path).await.map_err(persistence)?;
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await
        .map_err(persistence)?;
        Ok(Self { conn, op_timeout })
    }

    async fn timed<T>(
        &self,
        fut: impl Future<Output = tokio_rusqlite::Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(result) => result.map_err(persistence),
            Err(_) => Err(Error::Persistence("store operation timed out".into())),
        }
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn ensure_user(&self, user_id: &str) -> Result<()> {
        let user_id = user_id.to_string();
        self.timed(self.conn.call(move |conn| {
            conn.execute("INSERT OR IGNORE INTO users (user_id) VALUES (?1)", params![user_id])?;
            Ok(())
        }))
        .await
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>> {
        let user_ids: Vec<String> = self
            .timed(self.conn.call(|conn| {
                let mut stmt = conn.prepare("SELECT user_id FROM users")?;
                let rows = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<rusqlite::Result<Vec<String>>>()?;
                Ok(rows)
            }))
            .await?;
        Ok(user_ids.into_iter().map(|user_id| UserRecord { user_id }).collect())
    }

    async fn insert_pending(&self, pending: &PendingReply) -> Result<bool> {
        let pending = pending.clone();
        self.timed(self.conn.call(move |conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO pending_replies
                 (id, delivery_token, user_id, kind, text, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    pending.id.to_string(),
                    pending.delivery_token,
                    pending.user_id,
                    pending.kind,
                    pending.text,
                    pending.created_at,
                ],
            )?;
            Ok(changed > 0)
        }))
        .await
    }

    async fn find_pending(&self, delivery_token: &str) -> Result<Option<PendingReply>> {
        let token = delivery_token.to_string();
        let row: Option<(String, String, String, String, String, DateTime<Utc>)> = self
            .timed(self.conn.call(move |conn| {
                let row = conn
                    .query_row(
                        "SELECT id, delivery_token, user_id, kind, text, created_at
                         FROM pending_replies WHERE delivery_token = ?1",
                        params![token],
                        |row| {
                            Ok((
                                row.get(0)?,
                                row.get(1)?,
                                row.get(2)?,
                                row.get(3)?,
                                row.get(4)?,
                                row.get(5)?,
                            ))
                        },
                    )
                    .optional()?;
                Ok(row)
            }))
            .await?;

        row.map(|(id, delivery_token, user_id, kind, text, created_at)| {
            let id = Uuid::parse_str(&id)
                .map_err(|err| Error::Persistence(format!("corrupt pending id {id}: {err}")))?;
            Ok(PendingReply { id, delivery_token, user_id, kind, text, created_at })
        })
        .transpose()
    }

    async fn delete_pending(&self, id: Uuid) -> Result<()> {
        let id = id.to_string();
        self.timed(self.conn.call(move |conn| {
            conn.execute("DELETE FROM pending_replies WHERE id = ?1", params![id])?;
            Ok(())
        }))
        .await
    }
}

fn persistence(err: tokio_rusqlite::Error) -> Error {
    Error::Persistence(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn open_temp() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("relay.db"), Duration::from_secs(5))
            .await
            .unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn insert_is_atomic_per_token() {
        let (_dir, store) = open_temp().await;
        let first = PendingReply::new("tok-1", "user-1", "text", "hello");
        let second = PendingReply::new("tok-1", "user-2", "text", "hello again");

        assert!(store.insert_pending(&first).await.unwrap());
        assert!(!store.insert_pending(&second).await.unwrap());

        let found = store.find_pending("tok-1").await.unwrap().unwrap();
        assert_eq!(found.id, first.id);
        assert_eq!(found.user_id, "user-1");
    }

    #[tokio::test]
    async fn delete_clears_the_record() {
        let (_dir, store) = open_temp().await;
        let pending = PendingReply::new("tok-2", "user-1", "text", "hi");
        assert!(store.insert_pending(&pending).await.unwrap());

        store.delete_pending(pending.id).await.unwrap();
        assert!(store.find_pending("tok-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn dedup_records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.db");
        let pending = PendingReply::new("tok-3", "user-1", "text", "hi");

        {
            let store = SqliteStore::open(path.clone(), Duration::from_secs(5)).await.unwrap();
            store.ensure_user("user-1").await.unwrap();
            assert!(store.insert_pending(&pending).await.unwrap());
        }

        let store = SqliteStore::open(path, Duration::from_secs(5)).await.unwrap();
        assert!(!store.insert_pending(&pending).await.unwrap());
        assert_eq!(store.list_users().await.unwrap().len(), 1);
    }
}
