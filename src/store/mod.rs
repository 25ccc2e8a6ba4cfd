//! Persistent store for users and pending replies.
//!
//! The pending-reply table doubles as the de-duplication guard: admission
//! and record creation are one atomic insert-if-absent, with a uniqueness
//! constraint on the delivery token as the correctness backstop. Deleting
//! the record is the commit point that marks a token fully handled.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;

/// A chat event admitted for processing but not yet answered.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingReply {
    pub id: Uuid,
    pub delivery_token: String,
    pub user_id: String,
    pub kind: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl PendingReply {
    pub fn new(
        delivery_token: impl Into<String>,
        user_id: impl Into<String>,
        kind: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            delivery_token: delivery_token.into(),
            user_id: user_id.into(),
            kind: kind.into(),
            text: text.into(),
            created_at: Utc::now(),
        }
    }
}

/// A known chat user; the broadcast recipient list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub user_id: String,
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Create the user record if this user has not been seen before.
    async fn ensure_user(&self, user_id: &str) -> Result<()>;

    /// All known users, in no particular order.
    async fn list_users(&self) -> Result<Vec<UserRecord>>;

    /// Atomically create the pending reply unless one already exists for
    /// its delivery token.
    ///
    /// Returns `true` when the record was created (the event is admitted)
    /// and `false` when the token was already present (duplicate delivery;
    /// the caller must skip all further processing).
    async fn insert_pending(&self, pending: &PendingReply) -> Result<bool>;

    /// Look up a pending reply by its delivery token.
    async fn find_pending(&self, delivery_token: &str) -> Result<Option<PendingReply>>;

    /// Delete a pending reply once its reply has been delivered.
    async fn delete_pending(&self, id: Uuid) -> Result<()>;
}
