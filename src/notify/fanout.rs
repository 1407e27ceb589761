//! Notification fan-out
//!
//! Turns one event into a durable notification per recipient plus a
//! best-effort live push. Recipients are independent: each one's write and
//! push runs as its own future, capped at `concurrency` in flight, and a
//! failure is logged without touching its siblings. The triggering request
//! waits for the aggregate and only fails when every recipient failed.

use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::news::comment::preview;
use crate::news::model::NewsItem;
use crate::store::{NotificationDirectory, UserDirectory};
use crate::types::{BulletinError, ChannelKey, Result, Scope, UserId, UserRole};

use super::audience::{Audience, AudienceRule};
use super::model::{NotificationMessage, ServerFrame};
use super::presence::LiveDelivery;

pub const DEFAULT_FANOUT_CONCURRENCY: usize = 32;
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_millis(5000);

/// Something that happened and should be announced
#[derive(Debug, Clone)]
pub enum FanoutEvent {
    ContentCreated(NewsItem),
    ContentUpdated(NewsItem),
    ContentDeleted(NewsItem),
    CommentCreated {
        item: NewsItem,
        commenter: UserId,
        commenter_name: String,
        commenter_role: UserRole,
        text: String,
    },
    Reminder {
        audience: AudienceRule,
        text: String,
    },
}

impl FanoutEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            FanoutEvent::ContentCreated(_) => "content_created",
            FanoutEvent::ContentUpdated(_) => "content_updated",
            FanoutEvent::ContentDeleted(_) => "content_deleted",
            FanoutEvent::CommentCreated { .. } => "comment_created",
            FanoutEvent::Reminder { .. } => "reminder",
        }
    }

    /// Who receives the event
    pub fn audience(&self) -> Audience {
        match self {
            FanoutEvent::ContentCreated(item)
            | FanoutEvent::ContentUpdated(item)
            | FanoutEvent::ContentDeleted(item) => {
                Audience::Rule(AudienceRule::for_visibility(item.role))
            }
            // The author hears about comments, but never about their own
            FanoutEvent::CommentCreated { item, commenter, .. } => {
                if &item.created_by == commenter {
                    Audience::Nobody
                } else {
                    Audience::User(item.created_by.clone())
                }
            }
            FanoutEvent::Reminder { audience, .. } => Audience::Rule(*audience),
        }
    }

    /// Title, body and scope shared by every recipient
    pub fn message(&self) -> NotificationMessage {
        match self {
            FanoutEvent::ContentCreated(item) => content_message(
                item,
                "New News Post",
                format!("A new post \"{}\" has been added.", item.title),
            ),
            FanoutEvent::ContentUpdated(item) => content_message(
                item,
                "News Updated",
                format!("The post \"{}\" has been updated.", item.title),
            ),
            FanoutEvent::ContentDeleted(item) => content_message(
                item,
                "News Deleted",
                format!("The post \"{}\" has been deleted.", item.title),
            ),
            FanoutEvent::CommentCreated {
                item,
                commenter_name,
                commenter_role,
                text,
                ..
            } => NotificationMessage {
                title: "New Comment".to_string(),
                body: format!(
                    "{} commented on your post: \"{}\"",
                    commenter_name,
                    preview(text)
                ),
                scope: (*commenter_role).into(),
                news_id: Some(item.id.clone()),
            },
            FanoutEvent::Reminder { audience, text } => NotificationMessage {
                title: "Reminder".to_string(),
                body: text.clone(),
                scope: audience.scope(),
                news_id: None,
            },
        }
    }
}

fn content_message(item: &NewsItem, title: &str, body: String) -> NotificationMessage {
    NotificationMessage {
        title: title.to_string(),
        body,
        scope: Scope::from(item.role),
        news_id: Some(item.id.clone()),
    }
}

/// Aggregate outcome of one event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FanoutReport {
    pub event: &'static str,
    pub seq: i64,
    pub recipients: usize,
    pub persisted: usize,
    pub pushed: usize,
    pub failed: usize,
}

enum Delivery {
    Persisted { pushed: bool },
    Failed,
}

#[derive(Debug, Clone, Copy)]
pub struct FanoutConfig {
    pub concurrency: usize,
    pub write_timeout: Duration,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_FANOUT_CONCURRENCY,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }
}

pub struct FanoutEngine {
    users: Arc<dyn UserDirectory>,
    notifications: Arc<dyn NotificationDirectory>,
    live: Arc<dyn LiveDelivery>,
    config: FanoutConfig,
    last_seq: AtomicI64,
}

impl FanoutEngine {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        notifications: Arc<dyn NotificationDirectory>,
        live: Arc<dyn LiveDelivery>,
        config: FanoutConfig,
    ) -> Self {
        Self {
            users,
            notifications,
            live,
            config: FanoutConfig {
                concurrency: config.concurrency.max(1),
                ..config
            },
            last_seq: AtomicI64::new(0),
        }
    }

    /// Next sequence stamp: wall-clock millis, forced strictly increasing
    fn next_seq(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let mut prev = self.last_seq.load(Ordering::Relaxed);
        loop {
            let next = now.max(prev + 1);
            match self
                .last_seq
                .compare_exchange_weak(prev, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(actual) => prev = actual,
            }
        }
    }

    pub async fn dispatch(&self, event: FanoutEvent) -> Result<FanoutReport> {
        let seq = self.next_seq();
        let kind = event.kind();
        let message = event.message();
        let recipients = event.audience().resolve(self.users.as_ref()).await?;
        let now = Utc::now();

        let outcomes: Vec<Delivery> = stream::iter(recipients.iter().cloned())
            .map(|user| {
                let notification = message.for_recipient(user, seq, now);
                self.deliver_one(notification)
            })
            .buffer_unordered(self.config.concurrency)
            .collect()
            .await;

        let mut report = FanoutReport {
            event: kind,
            seq,
            recipients: recipients.len(),
            persisted: 0,
            pushed: 0,
            failed: 0,
        };
        for outcome in outcomes {
            match outcome {
                Delivery::Persisted { pushed } => {
                    report.persisted += 1;
                    if pushed {
                        report.pushed += 1;
                    }
                }
                Delivery::Failed => report.failed += 1,
            }
        }

        info!(
            event = kind,
            seq,
            recipients = report.recipients,
            persisted = report.persisted,
            pushed = report.pushed,
            failed = report.failed,
            "Fan-out complete"
        );

        if report.recipients > 0 && report.failed == report.recipients {
            return Err(BulletinError::Fanout(format!(
                "all {} recipients failed for {}",
                report.recipients, kind
            )));
        }
        Ok(report)
    }

    async fn deliver_one(&self, notification: super::model::Notification) -> Delivery {
        let user = notification.user_id.clone();
        let write = tokio::time::timeout(
            self.config.write_timeout,
            self.notifications.insert(notification),
        )
        .await
        .unwrap_or_else(|_| {
            Err(BulletinError::Timeout(format!(
                "notification write exceeded {}ms",
                self.config.write_timeout.as_millis()
            )))
        });

        let stored = match write {
            Ok(stored) => stored,
            Err(e) => {
                warn!(user = %user, code = e.code(), error = %e, "Notification write failed");
                return Delivery::Failed;
            }
        };

        let key = ChannelKey::for_user(&user);
        let frame = ServerFrame::Notification {
            notification: stored,
        };
        let pushed = self.live.deliver(&key, &frame) > 0;
        Delivery::Persisted { pushed }
    }
}
