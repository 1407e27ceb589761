//! Comment document schema

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::IntoIndexes;
use crate::news::comment::Comment;
use crate::types::{CommentId, ContentId, UserId};

/// Collection name for comments
pub const COMMENT_COLLECTION: &str = "comments";

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CommentDoc {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub news_id: String,
    pub user_id: String,
    pub username: String,
    pub content: String,
    pub created_at: DateTime,
}

impl From<&Comment> for CommentDoc {
    fn from(c: &Comment) -> Self {
        Self {
            id: c.id.to_object_id(),
            news_id: c.news_id.to_string(),
            user_id: c.user_id.to_string(),
            username: c.username.clone(),
            content: c.content.clone(),
            created_at: DateTime::from_chrono(c.created_at),
        }
    }
}

impl TryFrom<CommentDoc> for Comment {
    type Error = crate::types::BulletinError;

    fn try_from(doc: CommentDoc) -> Result<Self, Self::Error> {
        Ok(Self {
            id: CommentId::from_object_id(doc.id),
            news_id: ContentId::parse(&doc.news_id)?,
            user_id: UserId::new(doc.user_id),
            username: doc.username,
            content: doc.content,
            created_at: doc.created_at.to_chrono(),
        })
    }
}

impl IntoIndexes for CommentDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "newsId": 1, "createdAt": -1 },
            Some(
                IndexOptions::builder()
                    .name("news_created".to_string())
                    .build(),
            ),
        )]
    }
}
