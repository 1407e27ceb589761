//! Engagement counters
//!
//! Like toggles and first-view registration. Every call is one atomic
//! store operation keyed by the caller, so retries and concurrent requests
//! from the same user can never double-count.

use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::auth::Caller;
use crate::store::ContentStore;
use crate::types::{BulletinError, ContentId, Result, UserId};

use super::model::{Engaged, EngagementOp, NewsItem};

/// Result of a like toggle
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeOutcome {
    #[serde(rename = "_id")]
    pub id: ContentId,
    pub like_count: u64,
    pub liked_by: Vec<UserId>,
    /// Whether the caller likes the item after the toggle
    pub liked: bool,
    pub view_count: u64,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Result of a view registration
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewOutcome {
    /// False when the caller had already viewed the item
    pub counted: bool,
    pub news: NewsItem,
}

pub struct EngagementCounter {
    content: Arc<dyn ContentStore>,
}

impl EngagementCounter {
    pub fn new(content: Arc<dyn ContentStore>) -> Self {
        Self { content }
    }

    pub async fn toggle_like(&self, caller: &Caller, id: &ContentId) -> Result<LikeOutcome> {
        let engaged = self.engage(caller, id, EngagementOp::ToggleLike(caller.id.clone())).await?;
        Ok(Self::like_outcome(caller, id, engaged.item))
    }

    /// Like or unlike explicitly; repeating the call changes nothing
    pub async fn set_like(&self, caller: &Caller, id: &ContentId, liked: bool) -> Result<LikeOutcome> {
        let engaged = self
            .engage(caller, id, EngagementOp::SetLike(caller.id.clone(), liked))
            .await?;
        Ok(Self::like_outcome(caller, id, engaged.item))
    }

    fn like_outcome(caller: &Caller, id: &ContentId, item: NewsItem) -> LikeOutcome {
        let liked = item.is_liked_by(&caller.id);
        debug!(user = %caller.id, news_id = %id, liked, count = item.like_count, "Like applied");
        LikeOutcome {
            id: item.id,
            like_count: item.like_count,
            liked,
            liked_by: item.liked_by,
            view_count: item.view_count,
            updated_at: item.updated_at,
        }
    }

    pub async fn register_view(&self, caller: &Caller, id: &ContentId) -> Result<ViewOutcome> {
        let engaged = self
            .engage(caller, id, EngagementOp::RegisterView(caller.id.clone()))
            .await?;
        debug!(user = %caller.id, news_id = %id, counted = engaged.changed, "View registered");
        Ok(ViewOutcome {
            counted: engaged.changed,
            news: engaged.item,
        })
    }

    async fn engage(
        &self,
        caller: &Caller,
        id: &ContentId,
        op: EngagementOp,
    ) -> Result<Engaged> {
        let engaged = self
            .content
            .apply(id, &op)
            .await?
            .ok_or_else(|| BulletinError::NotFound("News not found".into()))?;
        if engaged.changed {
            debug!(user = %caller.id, news_id = %id, "Engagement recorded");
        }
        Ok(engaged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::news::model::{NewsDraft, NewsItem};
    use crate::store::MemoryContentStore;
    use crate::types::{UserRole, Visibility};
    use chrono::Utc;

    async fn seeded(role: Visibility) -> (Arc<MemoryContentStore>, ContentId) {
        let store = Arc::new(MemoryContentStore::new());
        let draft = NewsDraft {
            title: "Open day".into(),
            content: "Tours every hour".into(),
            category: "Events".into(),
            role: Some(role),
            ..Default::default()
        };
        let item = NewsItem::from_draft(draft, "author".into(), Utc::now());
        let id = item.id.clone();
        store.insert(item).await.unwrap();
        (store, id)
    }

    #[tokio::test]
    async fn test_double_toggle_restores_state() {
        let (store, id) = seeded(Visibility::All).await;
        let counter = EngagementCounter::new(store);
        let caller = Caller::new("u1".into(), "u", UserRole::Student, false);

        let first = counter.toggle_like(&caller, &id).await.unwrap();
        assert!(first.liked);
        assert_eq!(first.like_count, 1);

        let second = counter.toggle_like(&caller, &id).await.unwrap();
        assert!(!second.liked);
        assert_eq!(second.like_count, 0);
        assert!(second.liked_by.is_empty());
    }

    #[tokio::test]
    async fn test_explicit_like_survives_retry() {
        let (store, id) = seeded(Visibility::All).await;
        let counter = EngagementCounter::new(store);
        let caller = Caller::new("u1".into(), "u", UserRole::Student, false);

        assert_eq!(counter.set_like(&caller, &id, true).await.unwrap().like_count, 1);
        let retried = counter.set_like(&caller, &id, true).await.unwrap();
        assert_eq!(retried.like_count, 1);
        assert_eq!(retried.liked_by, vec![UserId::from("u1")]);

        let unliked = counter.set_like(&caller, &id, false).await.unwrap();
        assert!(!unliked.liked);
        assert_eq!(unliked.like_count, 0);
    }

    #[tokio::test]
    async fn test_view_counts_once() {
        let (store, id) = seeded(Visibility::All).await;
        let counter = EngagementCounter::new(store);
        let caller = Caller::new("u1".into(), "u", UserRole::Faculty, false);

        assert!(counter.register_view(&caller, &id).await.unwrap().counted);
        let again = counter.register_view(&caller, &id).await.unwrap();
        assert!(!again.counted);
        assert_eq!(again.news.view_count, 1);
    }

    #[tokio::test]
    async fn test_missing_item() {
        let (store, _) = seeded(Visibility::Faculty).await;
        let counter = EngagementCounter::new(store);
        let caller = Caller::new("u1".into(), "u", UserRole::Student, false);

        assert!(matches!(
            counter.toggle_like(&caller, &ContentId::generate()).await,
            Err(BulletinError::NotFound(_))
        ));
        assert!(matches!(
            counter.register_view(&caller, &ContentId::generate()).await,
            Err(BulletinError::NotFound(_))
        ));
    }
}
