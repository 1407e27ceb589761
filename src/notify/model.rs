//! Notification records and the live frames that carry them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ContentId, NotificationId, Scope, UserId};

/// A durable, per-recipient notification. Only `read` ever changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "_id")]
    pub id: NotificationId,
    pub user_id: UserId,
    pub title: String,
    pub body: String,
    pub role: Scope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub news_id: Option<ContentId>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    /// Shared by every notification of one fan-out event; orders listings
    pub seq: i64,
}

/// Title, body and scope derived once per event, before recipients are known
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationMessage {
    pub title: String,
    pub body: String,
    pub scope: Scope,
    pub news_id: Option<ContentId>,
}

impl NotificationMessage {
    /// Materialise the message for one recipient
    pub fn for_recipient(&self, user: UserId, seq: i64, now: DateTime<Utc>) -> Notification {
        Notification {
            id: NotificationId::generate(),
            user_id: user,
            title: self.title.clone(),
            body: self.body.clone(),
            role: self.scope,
            news_id: self.news_id.clone(),
            read: false,
            created_at: now,
            seq,
        }
    }
}

/// Frames sent from server to a websocket client
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerFrame {
    Joined {
        #[serde(rename = "userId")]
        user_id: UserId,
    },
    Notification {
        notification: Notification,
    },
    Pong,
    Error {
        message: String,
    },
}

impl ServerFrame {
    pub fn error(message: impl Into<String>) -> Self {
        ServerFrame::Error {
            message: message.into(),
        }
    }
}

/// Frames sent from a websocket client to the server
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientFrame {
    Join {
        #[serde(rename = "userId")]
        user_id: UserId,
    },
    Leave,
    Ping,
}
