//! Notification document schema

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::IntoIndexes;
use crate::notify::model::Notification;
use crate::types::{ContentId, NotificationId, Scope, UserId};

/// Collection name for notifications
pub const NOTIFICATION_COLLECTION: &str = "notifications";

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct NotificationDoc {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user_id: String,
    pub title: String,
    pub body: String,
    pub role: Scope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub news_id: Option<String>,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime,
    /// Older records predate the stamp; they sort by creation time
    #[serde(default)]
    pub seq: i64,
}

impl From<&Notification> for NotificationDoc {
    fn from(n: &Notification) -> Self {
        Self {
            id: n.id.to_object_id(),
            user_id: n.user_id.to_string(),
            title: n.title.clone(),
            body: n.body.clone(),
            role: n.role,
            news_id: n.news_id.as_ref().map(|id| id.to_string()),
            read: n.read,
            created_at: DateTime::from_chrono(n.created_at),
            seq: n.seq,
        }
    }
}

impl From<NotificationDoc> for Notification {
    fn from(doc: NotificationDoc) -> Self {
        let created_at = doc.created_at.to_chrono();
        Self {
            id: NotificationId::from_object_id(doc.id),
            user_id: UserId::new(doc.user_id),
            title: doc.title,
            body: doc.body,
            role: doc.role,
            news_id: doc.news_id.and_then(|raw| ContentId::parse(&raw).ok()),
            read: doc.read,
            seq: if doc.seq > 0 {
                doc.seq
            } else {
                created_at.timestamp_millis()
            },
            created_at,
        }
    }
}

impl IntoIndexes for NotificationDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "userId": 1, "seq": -1, "createdAt": -1 },
                Some(
                    IndexOptions::builder()
                        .name("user_seq".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "userId": 1, "read": 1 },
                Some(
                    IndexOptions::builder()
                        .name("user_unread".to_string())
                        .build(),
                ),
            ),
        ]
    }
}
