//! Comments on content items

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{BulletinError, CommentId, ContentId, Result, UserId};

pub const MAX_COMMENT_CHARS: usize = 500;

/// Characters of a comment quoted in the author's notification
pub const PREVIEW_CHARS: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: CommentId,
    pub news_id: ContentId,
    pub user_id: UserId,
    pub username: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Request body for posting a comment
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentDraft {
    #[serde(default)]
    pub news_id: String,
    #[serde(default)]
    pub content: String,
}

impl CommentDraft {
    /// Validate, returning the parsed target id and the comment text
    pub fn validate(self) -> Result<(ContentId, String)> {
        if self.news_id.trim().is_empty() || self.content.trim().is_empty() {
            return Err(BulletinError::BadRequest(
                "News ID and content are required".into(),
            ));
        }
        if self.content.chars().count() > MAX_COMMENT_CHARS {
            return Err(BulletinError::BadRequest(format!(
                "Comment must be {} characters or less",
                MAX_COMMENT_CHARS
            )));
        }
        let news_id = ContentId::parse(&self.news_id)?;
        Ok((news_id, self.content))
    }
}

/// First [`PREVIEW_CHARS`] characters, with an ellipsis when truncated
pub fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview() {
        assert_eq!(preview("short"), "short");
        let exact = "a".repeat(PREVIEW_CHARS);
        assert_eq!(preview(&exact), exact);
        let long = "b".repeat(PREVIEW_CHARS + 1);
        assert_eq!(preview(&long), format!("{}...", "b".repeat(PREVIEW_CHARS)));
    }

    #[test]
    fn test_draft_validation() {
        let id = ContentId::generate();
        let ok = CommentDraft {
            news_id: id.to_string(),
            content: "Nice".into(),
        };
        assert_eq!(ok.validate().unwrap().0, id);

        let too_long = CommentDraft {
            news_id: id.to_string(),
            content: "x".repeat(MAX_COMMENT_CHARS + 1),
        };
        assert!(too_long.validate().is_err());

        let bad_id = CommentDraft {
            news_id: "nope".into(),
            content: "Nice".into(),
        };
        assert!(matches!(bad_id.validate(), Err(BulletinError::BadRequest(_))));
    }
}
