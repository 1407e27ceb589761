//! Newsroom: authoring, comments and reminders
//!
//! Every write here ends in a fan-out. Deletes cascade into preference
//! records before the deletion is announced.

use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use crate::auth::Caller;
use crate::notify::{AudienceRule, FanoutEngine, FanoutEvent, FanoutReport};
use crate::store::{CommentStore, ContentStore, PreferenceStore};
use crate::types::{BulletinError, CommentId, ContentId, Result};

use super::comment::{Comment, CommentDraft};
use super::model::{NewsDraft, NewsEdit, NewsItem};
use super::visibility::VisibilityFilter;

pub const MAX_REMINDER_CHARS: usize = 500;

pub struct Newsroom {
    content: Arc<dyn ContentStore>,
    prefs: Arc<dyn PreferenceStore>,
    comments: Arc<dyn CommentStore>,
    visibility: Arc<VisibilityFilter>,
    fanout: Arc<FanoutEngine>,
}

impl Newsroom {
    pub fn new(
        content: Arc<dyn ContentStore>,
        prefs: Arc<dyn PreferenceStore>,
        comments: Arc<dyn CommentStore>,
        visibility: Arc<VisibilityFilter>,
        fanout: Arc<FanoutEngine>,
    ) -> Self {
        Self {
            content,
            prefs,
            comments,
            visibility,
            fanout,
        }
    }

    /// Publish a new item. Any authenticated user may post.
    pub async fn create(&self, caller: &Caller, draft: NewsDraft) -> Result<NewsItem> {
        let draft = draft.validate()?;
        let item = NewsItem::from_draft(draft, caller.id.clone(), Utc::now());
        let item = self.content.insert(item).await?;
        info!(user = %caller.id, news_id = %item.id, title = %item.title, "News created");

        self.fanout
            .dispatch(FanoutEvent::ContentCreated(item.clone()))
            .await?;
        Ok(item)
    }

    pub async fn update(&self, caller: &Caller, id: &ContentId, edit: NewsEdit) -> Result<NewsItem> {
        caller.require_admin()?;
        let edit = edit.validate()?;
        let item = self
            .content
            .update(id, &edit)
            .await?
            .ok_or_else(|| BulletinError::NotFound("News not found".into()))?;
        info!(user = %caller.id, news_id = %id, "News updated");

        self.fanout
            .dispatch(FanoutEvent::ContentUpdated(item.clone()))
            .await?;
        Ok(item)
    }

    /// Remove an item, pull it from every archive set, then announce it
    pub async fn delete(&self, caller: &Caller, id: &ContentId) -> Result<NewsItem> {
        caller.require_admin()?;
        let item = self
            .content
            .remove(id)
            .await?
            .ok_or_else(|| BulletinError::NotFound("News not found".into()))?;
        let pulled = self.prefs.pull_archived_everywhere(id.as_str()).await?;
        info!(user = %caller.id, news_id = %id, archives_pulled = pulled, "News deleted");

        self.fanout
            .dispatch(FanoutEvent::ContentDeleted(item.clone()))
            .await?;
        Ok(item)
    }

    /// Comment on an item the caller can see; the item's author is notified
    pub async fn comment(&self, caller: &Caller, draft: CommentDraft) -> Result<Comment> {
        let (news_id, text) = draft.validate()?;
        let item = self.visibility.fetch_one(caller, &news_id).await?;

        let comment = Comment {
            id: CommentId::generate(),
            news_id,
            user_id: caller.id.clone(),
            username: caller.username.clone(),
            content: text.clone(),
            created_at: Utc::now(),
        };
        let comment = self.comments.insert(comment).await?;
        info!(user = %caller.id, news_id = %comment.news_id, "Comment added");

        self.fanout
            .dispatch(FanoutEvent::CommentCreated {
                item,
                commenter: caller.id.clone(),
                commenter_name: caller.username.clone(),
                commenter_role: caller.role,
                text,
            })
            .await?;
        Ok(comment)
    }

    /// Comments on an item the caller can see, newest first
    pub async fn comments(&self, caller: &Caller, news_id: &ContentId) -> Result<Vec<Comment>> {
        self.visibility.fetch_one(caller, news_id).await?;
        self.comments.list_for(news_id).await
    }

    /// Reminder signal from the scheduler (admin credentials required)
    pub async fn remind(
        &self,
        caller: &Caller,
        audience: AudienceRule,
        text: &str,
    ) -> Result<FanoutReport> {
        caller.require_admin()?;
        let text = text.trim();
        if text.is_empty() {
            return Err(BulletinError::BadRequest("Reminder text is required".into()));
        }
        if text.chars().count() > MAX_REMINDER_CHARS {
            return Err(BulletinError::BadRequest(format!(
                "Reminder must be {} characters or less",
                MAX_REMINDER_CHARS
            )));
        }
        info!(user = %caller.id, audience = ?audience, "Reminder requested");
        self.fanout
            .dispatch(FanoutEvent::Reminder {
                audience,
                text: text.to_string(),
            })
            .await
    }
}
