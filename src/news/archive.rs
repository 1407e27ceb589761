//! Per-user archive toggle

use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::auth::Caller;
use crate::store::{ContentStore, PreferenceStore};
use crate::types::{BulletinError, ContentId, Result};

use super::model::NewsItem;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveOutcome {
    /// Whether the id is archived after the toggle
    pub archived: bool,
    pub archived_news_ids: Vec<String>,
    /// Current item, if it still exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub news: Option<NewsItem>,
}

pub struct ArchiveToggle {
    content: Arc<dyn ContentStore>,
    prefs: Arc<dyn PreferenceStore>,
}

impl ArchiveToggle {
    pub fn new(content: Arc<dyn ContentStore>, prefs: Arc<dyn PreferenceStore>) -> Self {
        Self { content, prefs }
    }

    /// Flip `raw_id` in the caller's archive set. The id is stored as given;
    /// a malformed id simply never matches an item.
    pub async fn toggle(&self, caller: &Caller, raw_id: &str) -> Result<ArchiveOutcome> {
        let raw_id = raw_id.trim();
        if raw_id.is_empty() {
            return Err(BulletinError::BadRequest("News ID is required".into()));
        }

        let prefs = self.prefs.toggle_archive(&caller.id, raw_id).await?;
        let archived = prefs.has_archived(raw_id);

        let news = match ContentId::parse(raw_id) {
            Ok(id) => self.content.get(&id).await?,
            Err(_) => None,
        };

        info!(user = %caller.id, news_id = %raw_id, archived, "Archive toggled");

        Ok(ArchiveOutcome {
            archived,
            archived_news_ids: prefs.archived_news_ids,
            news,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryContentStore, MemoryPreferenceStore};
    use crate::types::UserRole;

    #[tokio::test]
    async fn test_toggle_twice_restores_set() {
        let toggle = ArchiveToggle::new(
            Arc::new(MemoryContentStore::new()),
            Arc::new(MemoryPreferenceStore::new()),
        );
        let caller = Caller::new("u1".into(), "u", UserRole::Student, false);
        let id = ContentId::generate();

        let on = toggle.toggle(&caller, id.as_str()).await.unwrap();
        assert!(on.archived);
        assert_eq!(on.archived_news_ids, vec![id.to_string()]);
        assert!(on.news.is_none());

        let off = toggle.toggle(&caller, id.as_str()).await.unwrap();
        assert!(!off.archived);
        assert!(off.archived_news_ids.is_empty());
    }

    #[tokio::test]
    async fn test_blank_id_rejected() {
        let toggle = ArchiveToggle::new(
            Arc::new(MemoryContentStore::new()),
            Arc::new(MemoryPreferenceStore::new()),
        );
        let caller = Caller::new("u1".into(), "u", UserRole::Student, false);
        assert!(matches!(
            toggle.toggle(&caller, "  ").await,
            Err(BulletinError::BadRequest(_))
        ));
    }
}
