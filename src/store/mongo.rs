//! MongoDB store backends
//!
//! Every mutation is a single server-side operation (`find_one_and_update`
//! with an aggregation pipeline where a toggle is needed), so concurrent
//! writers never lose updates.

use async_trait::async_trait;
use bson::{doc, DateTime, Document};
use chrono::Utc;
use mongodb::options::ReturnDocument;
use tracing::{debug, info, warn};

use crate::db::mongo::{MongoClient, MongoCollection};
use crate::db::schemas::{
    CommentDoc, NewsDoc, NotificationDoc, PreferencesDoc, UserDoc, COMMENT_COLLECTION,
    NEWS_COLLECTION, NOTIFICATION_COLLECTION, PREFERENCES_COLLECTION, USER_COLLECTION,
};
use crate::news::comment::Comment;
use crate::news::model::{search_tokens, Engaged, EngagementOp, NewsEdit, NewsItem};
use crate::news::visibility::NewsFilter;
use crate::notify::model::Notification;
use crate::types::{ContentId, NotificationId, Result, UserId, UserRole};

use super::{
    CommentStore, ContentStore, NotificationDirectory, PreferenceStore, UserDirectory,
    UserPreferences, UserRecord,
};

/// Pipeline expression that flips `value` in the array field `field`,
/// keeping the order of the remaining elements
fn toggle_member(field: &str, value: &str) -> Document {
    doc! {
        "$let": {
            "vars": { "cur": { "$ifNull": [format!("${}", field), []] } },
            "in": {
                "$cond": [
                    { "$in": [{ "$literal": value }, "$$cur"] },
                    {
                        "$filter": {
                            "input": "$$cur",
                            "cond": { "$ne": ["$$this", { "$literal": value }] }
                        }
                    },
                    { "$concatArrays": ["$$cur", [{ "$literal": value }]] }
                ]
            }
        }
    }
}

fn now() -> DateTime {
    DateTime::from_chrono(Utc::now())
}

pub struct MongoContentStore {
    news: MongoCollection<NewsDoc>,
}

impl MongoContentStore {
    pub async fn new(client: &MongoClient) -> Result<Self> {
        let store = Self {
            news: client.collection(NEWS_COLLECTION).await?,
        };
        store.backfill_search_tokens().await?;
        Ok(store)
    }

    /// Store `searchTokens` on items written without them
    async fn backfill_search_tokens(&self) -> Result<()> {
        let missing = self
            .news
            .find_many(doc! { "searchTokens": { "$exists": false } }, None)
            .await?;
        if missing.is_empty() {
            return Ok(());
        }

        for doc in &missing {
            self.news
                .inner()
                .update_one(
                    doc! { "_id": doc.id, "searchTokens": { "$exists": false } },
                    doc! { "$set": { "searchTokens": doc.text_tokens() } },
                )
                .await?;
        }
        info!(count = missing.len(), "Backfilled search tokens");
        Ok(())
    }

    async fn toggle_like(&self, id: &ContentId, user: &UserId) -> Result<Option<Engaged>> {
        let pipeline = vec![
            doc! { "$set": { "likedBy": toggle_member("likedBy", user.as_str()) } },
            doc! { "$set": { "likeCount": { "$size": "$likedBy" }, "updatedAt": now() } },
        ];
        let updated = self
            .news
            .inner()
            .find_one_and_update(doc! { "_id": id.to_object_id() }, pipeline)
            .return_document(ReturnDocument::After)
            .await?;
        Ok(updated.map(|doc| Engaged {
            item: doc.into(),
            changed: true,
        }))
    }

    /// Matches only when the membership actually has to change
    async fn set_like(
        &self,
        id: &ContentId,
        user: &UserId,
        liked: bool,
    ) -> Result<Option<Engaged>> {
        let (filter, update) = if liked {
            (
                doc! { "_id": id.to_object_id(), "likedBy": { "$ne": user.as_str() } },
                doc! {
                    "$addToSet": { "likedBy": user.as_str() },
                    "$inc": { "likeCount": 1 },
                    "$set": { "updatedAt": now() },
                },
            )
        } else {
            (
                doc! { "_id": id.to_object_id(), "likedBy": user.as_str() },
                doc! {
                    "$pull": { "likedBy": user.as_str() },
                    "$inc": { "likeCount": -1 },
                    "$set": { "updatedAt": now() },
                },
            )
        };
        self.engage_or_unchanged(id, filter, update).await
    }

    async fn register_view(&self, id: &ContentId, user: &UserId) -> Result<Option<Engaged>> {
        let filter = doc! { "_id": id.to_object_id(), "viewedBy": { "$ne": user.as_str() } };
        let update = doc! {
            "$addToSet": { "viewedBy": user.as_str() },
            "$inc": { "viewCount": 1 },
            "$set": { "updatedAt": now() },
        };
        self.engage_or_unchanged(id, filter, update).await
    }

    /// Conditional update; when the filter misses, the item is either already
    /// in the requested state or gone
    async fn engage_or_unchanged(
        &self,
        id: &ContentId,
        filter: Document,
        update: Document,
    ) -> Result<Option<Engaged>> {
        let updated = self
            .news
            .inner()
            .find_one_and_update(filter, update)
            .return_document(ReturnDocument::After)
            .await?;

        if let Some(doc) = updated {
            return Ok(Some(Engaged {
                item: doc.into(),
                changed: true,
            }));
        }

        Ok(self.get(id).await?.map(|item| Engaged {
            item,
            changed: false,
        }))
    }
}

#[async_trait]
impl ContentStore for MongoContentStore {
    async fn insert(&self, item: NewsItem) -> Result<NewsItem> {
        self.news.insert_one(NewsDoc::from(&item)).await?;
        debug!(news_id = %item.id, "Inserted news item");
        Ok(item)
    }

    async fn get(&self, id: &ContentId) -> Result<Option<NewsItem>> {
        let found = self.news.find_one(doc! { "_id": id.to_object_id() }).await?;
        Ok(found.map(NewsItem::from))
    }

    async fn query(&self, filter: &NewsFilter) -> Result<Vec<NewsItem>> {
        let docs = self
            .news
            .find_many(filter.to_document(), Some(doc! { "createdAt": -1, "_id": 1 }))
            .await?;
        Ok(docs.into_iter().map(NewsItem::from).collect())
    }

    async fn update(&self, id: &ContentId, edit: &NewsEdit) -> Result<Option<NewsItem>> {
        let mut set = doc! {
            "title": edit.title.as_str(),
            "content": edit.content.as_str(),
            "searchTokens": search_tokens(&format!("{} {}", edit.title, edit.content)),
            "updatedAt": now(),
        };
        if let Some(image) = &edit.image {
            set.insert("image", image.as_str());
        }

        let updated = self
            .news
            .inner()
            .find_one_and_update(doc! { "_id": id.to_object_id() }, doc! { "$set": set })
            .return_document(ReturnDocument::After)
            .await?;
        Ok(updated.map(NewsItem::from))
    }

    async fn remove(&self, id: &ContentId) -> Result<Option<NewsItem>> {
        let removed = self
            .news
            .inner()
            .find_one_and_delete(doc! { "_id": id.to_object_id() })
            .await?;
        Ok(removed.map(NewsItem::from))
    }

    async fn apply(&self, id: &ContentId, op: &EngagementOp) -> Result<Option<Engaged>> {
        match op {
            EngagementOp::ToggleLike(user) => self.toggle_like(id, user).await,
            EngagementOp::SetLike(user, liked) => self.set_like(id, user, *liked).await,
            EngagementOp::RegisterView(user) => self.register_view(id, user).await,
        }
    }
}

pub struct MongoPreferenceStore {
    prefs: MongoCollection<PreferencesDoc>,
}

impl MongoPreferenceStore {
    pub async fn new(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            prefs: client.collection(PREFERENCES_COLLECTION).await?,
        })
    }
}

#[async_trait]
impl PreferenceStore for MongoPreferenceStore {
    async fn get(&self, user: &UserId) -> Result<Option<UserPreferences>> {
        let found = self.prefs.find_one(doc! { "userId": user.as_str() }).await?;
        Ok(found.map(UserPreferences::from))
    }

    async fn toggle_archive(&self, user: &UserId, raw_id: &str) -> Result<UserPreferences> {
        let pipeline = vec![doc! {
            "$set": {
                "archivedNewsIds": toggle_member("archivedNewsIds", raw_id),
                "selectedCategories": { "$ifNull": ["$selectedCategories", []] },
                "updatedAt": now(),
            }
        }];
        let updated = self
            .prefs
            .inner()
            .find_one_and_update(doc! { "userId": user.as_str() }, pipeline)
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await?;
        Ok(updated
            .map(UserPreferences::from)
            .unwrap_or_else(|| UserPreferences::empty(user.clone())))
    }

    async fn set_categories(
        &self,
        user: &UserId,
        categories: Vec<String>,
    ) -> Result<UserPreferences> {
        let updated = self
            .prefs
            .inner()
            .find_one_and_update(
                doc! { "userId": user.as_str() },
                doc! {
                    "$set": { "selectedCategories": categories, "updatedAt": now() },
                    "$setOnInsert": { "archivedNewsIds": [] },
                },
            )
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await?;
        Ok(updated
            .map(UserPreferences::from)
            .unwrap_or_else(|| UserPreferences::empty(user.clone())))
    }

    async fn pull_archived_everywhere(&self, raw_id: &str) -> Result<u64> {
        let result = self
            .prefs
            .inner()
            .update_many(
                doc! { "archivedNewsIds": raw_id },
                doc! {
                    "$pull": { "archivedNewsIds": raw_id },
                    "$set": { "updatedAt": now() },
                },
            )
            .await?;
        Ok(result.modified_count)
    }
}

pub struct MongoUserDirectory {
    users: MongoCollection<UserDoc>,
}

impl MongoUserDirectory {
    pub async fn new(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            users: client.collection(USER_COLLECTION).await?,
        })
    }
}

#[async_trait]
impl UserDirectory for MongoUserDirectory {
    async fn all_users(&self) -> Result<Vec<UserRecord>> {
        let docs = self.users.find_many(doc! {}, None).await?;
        Ok(docs.into_iter().map(UserRecord::from).collect())
    }

    async fn users_with_role(&self, role: UserRole) -> Result<Vec<UserRecord>> {
        let docs = self
            .users
            .find_many(doc! { "role": role.as_str() }, None)
            .await?;
        Ok(docs.into_iter().map(UserRecord::from).collect())
    }
}

pub struct MongoCommentStore {
    comments: MongoCollection<CommentDoc>,
}

impl MongoCommentStore {
    pub async fn new(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            comments: client.collection(COMMENT_COLLECTION).await?,
        })
    }
}

#[async_trait]
impl CommentStore for MongoCommentStore {
    async fn insert(&self, comment: Comment) -> Result<Comment> {
        self.comments.insert_one(CommentDoc::from(&comment)).await?;
        Ok(comment)
    }

    async fn list_for(&self, news_id: &ContentId) -> Result<Vec<Comment>> {
        let docs = self
            .comments
            .find_many(
                doc! { "newsId": news_id.as_str() },
                Some(doc! { "createdAt": -1, "_id": -1 }),
            )
            .await?;

        let mut comments = Vec::with_capacity(docs.len());
        for doc in docs {
            match Comment::try_from(doc) {
                Ok(c) => comments.push(c),
                Err(e) => warn!("Skipping malformed comment: {}", e),
            }
        }
        Ok(comments)
    }
}

pub struct MongoNotificationDirectory {
    notifications: MongoCollection<NotificationDoc>,
}

impl MongoNotificationDirectory {
    pub async fn new(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            notifications: client.collection(NOTIFICATION_COLLECTION).await?,
        })
    }
}

#[async_trait]
impl NotificationDirectory for MongoNotificationDirectory {
    async fn insert(&self, notification: Notification) -> Result<Notification> {
        self.notifications
            .insert_one(NotificationDoc::from(&notification))
            .await?;
        Ok(notification)
    }

    async fn list_for(&self, user: &UserId) -> Result<Vec<Notification>> {
        let docs = self
            .notifications
            .find_many(
                doc! { "userId": user.as_str() },
                Some(doc! { "seq": -1, "createdAt": -1 }),
            )
            .await?;
        Ok(docs.into_iter().map(Notification::from).collect())
    }

    async fn mark_read(&self, user: &UserId, id: &NotificationId) -> Result<Option<Notification>> {
        let updated = self
            .notifications
            .inner()
            .find_one_and_update(
                doc! { "_id": id.to_object_id(), "userId": user.as_str() },
                doc! { "$set": { "read": true } },
            )
            .return_document(ReturnDocument::After)
            .await?;
        Ok(updated.map(Notification::from))
    }

    async fn mark_all_read(&self, user: &UserId) -> Result<u64> {
        let result = self
            .notifications
            .inner()
            .update_many(
                doc! { "userId": user.as_str(), "read": false },
                doc! { "$set": { "read": true } },
            )
            .await?;
        Ok(result.modified_count)
    }

    async fn unread_count(&self, user: &UserId) -> Result<u64> {
        self.notifications
            .count(doc! { "userId": user.as_str(), "read": false })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_member_references_field() {
        let expr = toggle_member("likedBy", "u1");
        let vars = expr
            .get_document("$let")
            .and_then(|l| l.get_document("vars"))
            .and_then(|v| v.get_document("cur"))
            .expect("vars");
        let if_null = vars.get_array("$ifNull").expect("ifNull");
        assert_eq!(if_null[0].as_str(), Some("$likedBy"));
    }
}
