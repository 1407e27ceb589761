//! News document schema
//!
//! Field names follow the existing `news` collection (camelCase) so the
//! identity service and older clients keep reading the same documents.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::IntoIndexes;
use crate::news::model::{search_tokens, NewsItem};
use crate::types::{ContentId, UserId, Visibility};

/// Collection name for news items
pub const NEWS_COLLECTION: &str = "news";

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct NewsDoc {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    pub content: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub role: Visibility,
    pub created_by: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
    #[serde(default)]
    pub like_count: i64,
    #[serde(default)]
    pub view_count: i64,
    #[serde(default)]
    pub liked_by: Vec<String>,
    #[serde(default)]
    pub viewed_by: Vec<String>,
    /// Lexical tokens of title and body, rewritten on every edit
    #[serde(default)]
    pub search_tokens: Vec<String>,
}

impl NewsDoc {
    /// Tokens derived from title and body; used to fill in documents that
    /// were stored without `searchTokens`
    pub fn text_tokens(&self) -> Vec<String> {
        search_tokens(&format!("{} {}", self.title, self.content))
    }
}

impl From<&NewsItem> for NewsDoc {
    fn from(item: &NewsItem) -> Self {
        Self {
            id: item.id.to_object_id(),
            title: item.title.clone(),
            content: item.content.clone(),
            category: item.category.clone(),
            image: item.image.clone(),
            role: item.role,
            created_by: item.created_by.to_string(),
            created_at: DateTime::from_chrono(item.created_at),
            updated_at: DateTime::from_chrono(item.updated_at),
            like_count: item.like_count as i64,
            view_count: item.view_count as i64,
            liked_by: item.liked_by.iter().map(|u| u.to_string()).collect(),
            viewed_by: item.viewed_by.iter().map(|u| u.to_string()).collect(),
            search_tokens: item.search_tokens(),
        }
    }
}

impl From<NewsDoc> for NewsItem {
    fn from(doc: NewsDoc) -> Self {
        // Counts are derived from the sets; stored counters are advisory
        let liked_by: Vec<UserId> = dedup(doc.liked_by);
        let viewed_by: Vec<UserId> = dedup(doc.viewed_by);
        Self {
            id: ContentId::from_object_id(doc.id),
            title: doc.title,
            content: doc.content,
            category: doc.category,
            image: doc.image,
            role: doc.role,
            created_by: UserId::new(doc.created_by),
            created_at: doc.created_at.to_chrono(),
            updated_at: doc.updated_at.to_chrono(),
            like_count: liked_by.len() as u64,
            view_count: viewed_by.len() as u64,
            liked_by,
            viewed_by,
        }
    }
}

fn dedup(ids: Vec<String>) -> Vec<UserId> {
    let mut out: Vec<UserId> = Vec::with_capacity(ids.len());
    for id in ids {
        let id = UserId::new(id);
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

impl IntoIndexes for NewsDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Listing order
            (
                doc! { "createdAt": -1, "_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("created_desc".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "role": 1, "createdAt": -1 },
                Some(
                    IndexOptions::builder()
                        .name("role_created".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "searchTokens": 1 },
                Some(
                    IndexOptions::builder()
                        .name("search_tokens".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "updatedAt": -1 },
                Some(
                    IndexOptions::builder()
                        .name("updated_desc".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::news::model::{EngagementOp, NewsDraft};
    use crate::news::visibility::NewsFilter;
    use chrono::Utc;

    #[test]
    fn test_doc_conversion_keeps_engagement() {
        let draft = NewsDraft {
            title: "Chess Club".into(),
            content: "Meets Tuesdays".into(),
            category: "Events".into(),
            ..Default::default()
        };
        let mut item = NewsItem::from_draft(draft, "a1".into(), Utc::now());
        item.apply(&EngagementOp::ToggleLike("u1".into()), Utc::now());

        let doc = NewsDoc::from(&item);
        assert_eq!(doc.search_tokens, vec!["chess", "club", "meets", "tuesdays"]);
        assert_eq!(doc.like_count, 1);

        let back = NewsItem::from(doc);
        assert_eq!(back.id, item.id);
        assert_eq!(back.liked_by, item.liked_by);
        assert_eq!(back.like_count, 1);
    }

    #[test]
    fn test_doc_without_tokens_is_still_searchable() {
        let stored = doc! {
            "_id": ObjectId::new(),
            "title": "Midterm Schedule",
            "content": "Rooms are posted outside the registrar",
            "category": "Academics",
            "role": "student",
            "createdBy": "a1",
            "createdAt": DateTime::now(),
            "updatedAt": DateTime::now(),
        };
        let doc: NewsDoc = bson::from_document(stored).unwrap();
        assert!(doc.search_tokens.is_empty());
        assert!(doc.text_tokens().contains(&"midterm".to_string()));

        let filter = NewsFilter {
            tokens: Some(vec!["midterm".into()]),
            ..Default::default()
        };
        assert!(filter.matches(&NewsItem::from(doc)));
    }

    #[test]
    fn test_duplicate_ids_collapse() {
        let mut doc = NewsDoc::from(&NewsItem::from_draft(
            NewsDraft {
                title: "t".into(),
                content: "c".into(),
                category: "General".into(),
                ..Default::default()
            },
            "a1".into(),
            Utc::now(),
        ));
        doc.viewed_by = vec!["u1".into(), "u1".into(), "u2".into()];
        doc.view_count = 3;
        let item = NewsItem::from(doc);
        assert_eq!(item.view_count, 2);
    }
}
