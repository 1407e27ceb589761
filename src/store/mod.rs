//! Storage ports
//!
//! Every collaborator the core talks to sits behind one of these traits.
//! Two backends implement them:
//!
//! - [`memory`] - DashMap-backed, used in dev mode and by the tests
//! - [`mongo`] - MongoDB collections shared with the identity service
//!
//! Each mutating method is a single atomic operation on its backend; callers
//! never hold locks across calls.

pub mod memory;
pub mod mongo;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::news::comment::Comment;
use crate::news::model::{Engaged, EngagementOp, NewsEdit, NewsItem};
use crate::news::visibility::NewsFilter;
use crate::notify::model::Notification;
use crate::types::{ContentId, NotificationId, Result, UserId, UserRole};

pub use memory::{
    MemoryCommentStore, MemoryContentStore, MemoryNotificationDirectory, MemoryPreferenceStore,
    MemoryUserDirectory,
};
pub use mongo::{
    MongoCommentStore, MongoContentStore, MongoNotificationDirectory, MongoPreferenceStore,
    MongoUserDirectory,
};

/// A user as known to the identity service (read-only here)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub username: String,
    pub role: UserRole,
    #[serde(default)]
    pub is_admin: bool,
}

/// Per-user preferences. Absence of a record means "no archives, no category filter".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    pub user_id: UserId,
    /// Raw ids in toggle order; not validated when stored
    pub archived_news_ids: Vec<String>,
    pub selected_categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserPreferences {
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            archived_news_ids: Vec::new(),
            selected_categories: Vec::new(),
            updated_at: None,
        }
    }

    /// Flip membership of `raw_id`, preserving the order of the others
    pub fn toggle_archived(&mut self, raw_id: &str) -> bool {
        if let Some(pos) = self.archived_news_ids.iter().position(|id| id == raw_id) {
            self.archived_news_ids.remove(pos);
            false
        } else {
            self.archived_news_ids.push(raw_id.to_string());
            true
        }
    }

    pub fn has_archived(&self, raw_id: &str) -> bool {
        self.archived_news_ids.iter().any(|id| id == raw_id)
    }
}

/// Content items
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn insert(&self, item: NewsItem) -> Result<NewsItem>;

    async fn get(&self, id: &ContentId) -> Result<Option<NewsItem>>;

    /// Items matching `filter`, newest first, ties in insertion order
    async fn query(&self, filter: &NewsFilter) -> Result<Vec<NewsItem>>;

    /// Replace title/body (and image when given). `None` if the item is gone.
    async fn update(&self, id: &ContentId, edit: &NewsEdit) -> Result<Option<NewsItem>>;

    /// Remove and return the item
    async fn remove(&self, id: &ContentId) -> Result<Option<NewsItem>>;

    /// Atomic read-modify-write of the engagement sets. `None` if the item is gone.
    async fn apply(&self, id: &ContentId, op: &EngagementOp) -> Result<Option<Engaged>>;
}

/// Per-user preference records
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn get(&self, user: &UserId) -> Result<Option<UserPreferences>>;

    /// Flip `raw_id` in the user's archive set, creating the record if needed
    async fn toggle_archive(&self, user: &UserId, raw_id: &str) -> Result<UserPreferences>;

    async fn set_categories(&self, user: &UserId, categories: Vec<String>)
        -> Result<UserPreferences>;

    /// Remove `raw_id` from every user's archive set. Returns records touched.
    async fn pull_archived_everywhere(&self, raw_id: &str) -> Result<u64>;
}

/// Read-only view of user accounts, consulted at fan-out time
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn all_users(&self) -> Result<Vec<UserRecord>>;

    /// Users whose role is exactly `role`
    async fn users_with_role(&self, role: UserRole) -> Result<Vec<UserRecord>>;
}

#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn insert(&self, comment: Comment) -> Result<Comment>;

    /// Comments on one item, newest first
    async fn list_for(&self, news_id: &ContentId) -> Result<Vec<Comment>>;
}

/// Durable notification records
#[async_trait]
pub trait NotificationDirectory: Send + Sync {
    async fn insert(&self, notification: Notification) -> Result<Notification>;

    /// A user's notifications, highest sequence stamp first
    async fn list_for(&self, user: &UserId) -> Result<Vec<Notification>>;

    /// Set the read flag. `None` unless the notification exists and belongs to `user`.
    async fn mark_read(&self, user: &UserId, id: &NotificationId) -> Result<Option<Notification>>;

    /// Mark every unread notification of `user`. Returns the number changed.
    async fn mark_all_read(&self, user: &UserId) -> Result<u64>;

    async fn unread_count(&self, user: &UserId) -> Result<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_archived_restores_order() {
        let mut prefs = UserPreferences::empty("u1".into());
        prefs.toggle_archived("a");
        prefs.toggle_archived("b");
        prefs.toggle_archived("c");
        assert!(!prefs.toggle_archived("b"));
        assert_eq!(prefs.archived_news_ids, vec!["a", "c"]);
        assert!(prefs.toggle_archived("b"));
        assert!(prefs.has_archived("b"));
    }
}
