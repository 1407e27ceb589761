//! In-memory store backends
//!
//! Used in dev mode when MongoDB is unavailable and by every test. Each
//! mutation runs under the DashMap entry lock of the record it touches,
//! which gives the same single-record atomicity the MongoDB backend gets
//! from `find_one_and_update`.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::news::comment::Comment;
use crate::news::model::{Engaged, EngagementOp, NewsEdit, NewsItem};
use crate::news::visibility::NewsFilter;
use crate::notify::model::Notification;
use crate::types::{ContentId, NotificationId, Result, UserId, UserRole};

use super::{
    CommentStore, ContentStore, NotificationDirectory, PreferenceStore, UserDirectory,
    UserPreferences, UserRecord,
};

struct Stored {
    /// Insertion order, breaks `created_at` ties
    order: u64,
    item: NewsItem,
}

#[derive(Default)]
pub struct MemoryContentStore {
    items: DashMap<ContentId, Stored>,
    next_order: AtomicU64,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn insert(&self, item: NewsItem) -> Result<NewsItem> {
        let order = self.next_order.fetch_add(1, Ordering::Relaxed);
        self.items.insert(
            item.id.clone(),
            Stored {
                order,
                item: item.clone(),
            },
        );
        Ok(item)
    }

    async fn get(&self, id: &ContentId) -> Result<Option<NewsItem>> {
        Ok(self.items.get(id).map(|s| s.item.clone()))
    }

    async fn query(&self, filter: &NewsFilter) -> Result<Vec<NewsItem>> {
        let mut matched: Vec<(u64, NewsItem)> = self
            .items
            .iter()
            .filter(|s| filter.matches(&s.item))
            .map(|s| (s.order, s.item.clone()))
            .collect();
        matched.sort_by(|(oa, a), (ob, b)| b.created_at.cmp(&a.created_at).then(oa.cmp(ob)));
        Ok(matched.into_iter().map(|(_, item)| item).collect())
    }

    async fn update(&self, id: &ContentId, edit: &NewsEdit) -> Result<Option<NewsItem>> {
        Ok(self.items.get_mut(id).map(|mut s| {
            s.item.apply_edit(edit, Utc::now());
            s.item.clone()
        }))
    }

    async fn remove(&self, id: &ContentId) -> Result<Option<NewsItem>> {
        Ok(self.items.remove(id).map(|(_, s)| s.item))
    }

    async fn apply(&self, id: &ContentId, op: &EngagementOp) -> Result<Option<Engaged>> {
        Ok(self.items.get_mut(id).map(|mut s| {
            let changed = s.item.apply(op, Utc::now());
            Engaged {
                item: s.item.clone(),
                changed,
            }
        }))
    }
}

#[derive(Default)]
pub struct MemoryPreferenceStore {
    records: DashMap<UserId, UserPreferences>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferenceStore {
    async fn get(&self, user: &UserId) -> Result<Option<UserPreferences>> {
        Ok(self.records.get(user).map(|r| r.clone()))
    }

    async fn toggle_archive(&self, user: &UserId, raw_id: &str) -> Result<UserPreferences> {
        let mut record = self
            .records
            .entry(user.clone())
            .or_insert_with(|| UserPreferences::empty(user.clone()));
        record.toggle_archived(raw_id);
        record.updated_at = Some(Utc::now());
        Ok(record.clone())
    }

    async fn set_categories(
        &self,
        user: &UserId,
        categories: Vec<String>,
    ) -> Result<UserPreferences> {
        let mut record = self
            .records
            .entry(user.clone())
            .or_insert_with(|| UserPreferences::empty(user.clone()));
        record.selected_categories = categories;
        record.updated_at = Some(Utc::now());
        Ok(record.clone())
    }

    async fn pull_archived_everywhere(&self, raw_id: &str) -> Result<u64> {
        let mut touched = 0;
        for mut record in self.records.iter_mut() {
            let before = record.archived_news_ids.len();
            record.archived_news_ids.retain(|id| id != raw_id);
            if record.archived_news_ids.len() != before {
                record.updated_at = Some(Utc::now());
                touched += 1;
            }
        }
        Ok(touched)
    }
}

/// User directory seeded by the caller (tests, dev mode)
#[derive(Default)]
pub struct MemoryUserDirectory {
    users: DashMap<UserId, UserRecord>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: impl IntoIterator<Item = UserRecord>) -> Self {
        let dir = Self::new();
        for user in users {
            dir.upsert(user);
        }
        dir
    }

    pub fn upsert(&self, user: UserRecord) {
        self.users.insert(user.id.clone(), user);
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn all_users(&self) -> Result<Vec<UserRecord>> {
        Ok(self.users.iter().map(|u| u.clone()).collect())
    }

    async fn users_with_role(&self, role: UserRole) -> Result<Vec<UserRecord>> {
        Ok(self
            .users
            .iter()
            .filter(|u| u.role == role)
            .map(|u| u.clone())
            .collect())
    }
}

#[derive(Default)]
pub struct MemoryCommentStore {
    comments: DashMap<ContentId, Vec<Comment>>,
}

impl MemoryCommentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CommentStore for MemoryCommentStore {
    async fn insert(&self, comment: Comment) -> Result<Comment> {
        self.comments
            .entry(comment.news_id.clone())
            .or_default()
            .push(comment.clone());
        Ok(comment)
    }

    async fn list_for(&self, news_id: &ContentId) -> Result<Vec<Comment>> {
        // Stored oldest first
        Ok(self
            .comments
            .get(news_id)
            .map(|list| list.iter().rev().cloned().collect())
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub struct MemoryNotificationDirectory {
    by_user: DashMap<UserId, Vec<Notification>>,
}

impl MemoryNotificationDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationDirectory for MemoryNotificationDirectory {
    async fn insert(&self, notification: Notification) -> Result<Notification> {
        self.by_user
            .entry(notification.user_id.clone())
            .or_default()
            .push(notification.clone());
        Ok(notification)
    }

    async fn list_for(&self, user: &UserId) -> Result<Vec<Notification>> {
        let mut list = self
            .by_user
            .get(user)
            .map(|l| l.clone())
            .unwrap_or_default();
        // Stable: equal stamps keep insertion order before the reversal
        list.sort_by(|a, b| a.seq.cmp(&b.seq).then(a.created_at.cmp(&b.created_at)));
        list.reverse();
        Ok(list)
    }

    async fn mark_read(&self, user: &UserId, id: &NotificationId) -> Result<Option<Notification>> {
        Ok(self.by_user.get_mut(user).and_then(|mut list| {
            list.iter_mut().find(|n| &n.id == id).map(|n| {
                n.read = true;
                n.clone()
            })
        }))
    }

    async fn mark_all_read(&self, user: &UserId) -> Result<u64> {
        let mut changed = 0;
        if let Some(mut list) = self.by_user.get_mut(user) {
            for n in list.iter_mut().filter(|n| !n.read) {
                n.read = true;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn unread_count(&self, user: &UserId) -> Result<u64> {
        Ok(self
            .by_user
            .get(user)
            .map(|l| l.iter().filter(|n| !n.read).count() as u64)
            .unwrap_or(0))
    }
}
