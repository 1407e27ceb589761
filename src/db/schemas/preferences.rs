//! User preferences document schema

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::IntoIndexes;
use crate::store::UserPreferences;
use crate::types::UserId;

/// Collection name for preference records
pub const PREFERENCES_COLLECTION: &str = "userpreferences";

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesDoc {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: String,
    #[serde(default)]
    pub archived_news_ids: Vec<String>,
    #[serde(default)]
    pub selected_categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,
}

impl From<PreferencesDoc> for UserPreferences {
    fn from(doc: PreferencesDoc) -> Self {
        Self {
            user_id: UserId::new(doc.user_id),
            archived_news_ids: doc.archived_news_ids,
            selected_categories: doc.selected_categories,
            updated_at: doc.updated_at.map(|d| d.to_chrono()),
        }
    }
}

impl IntoIndexes for PreferencesDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // One record per user; upserts rely on this
            (
                doc! { "userId": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("user_id_unique".to_string())
                        .build(),
                ),
            ),
            // Delete cascade looks records up by archived id
            (
                doc! { "archivedNewsIds": 1 },
                Some(
                    IndexOptions::builder()
                        .name("archived_news_ids".to_string())
                        .build(),
                ),
            ),
        ]
    }
}
