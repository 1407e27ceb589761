//! Content items and the inputs that create or change them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{BulletinError, ContentId, Result, UserId, Visibility};

pub const MAX_TITLE_CHARS: usize = 100;
pub const MAX_CONTENT_CHARS: usize = 5000;

/// Shortest word that takes part in lexical search
pub const MIN_TOKEN_CHARS: usize = 2;

/// A published content item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    #[serde(rename = "_id")]
    pub id: ContentId,
    pub title: String,
    pub content: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub role: Visibility,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub like_count: u64,
    pub view_count: u64,
    pub liked_by: Vec<UserId>,
    pub viewed_by: Vec<UserId>,
}

/// A single engagement mutation. The actor is always the authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngagementOp {
    ToggleLike(UserId),
    /// Like (`true`) or unlike (`false`) regardless of the current state;
    /// a retried request lands on the same result
    SetLike(UserId, bool),
    RegisterView(UserId),
}

/// Item state after an engagement mutation
#[derive(Debug, Clone)]
pub struct Engaged {
    pub item: NewsItem,
    /// False when the operation was a no-op (repeat view)
    pub changed: bool,
}

impl NewsItem {
    /// Build a fresh item from a validated draft
    pub fn from_draft(draft: NewsDraft, author: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: ContentId::generate(),
            title: draft.title,
            content: draft.content,
            category: draft.category,
            image: draft.image,
            role: draft.role.unwrap_or_default(),
            created_by: author,
            created_at: now,
            updated_at: now,
            like_count: 0,
            view_count: 0,
            liked_by: Vec::new(),
            viewed_by: Vec::new(),
        }
    }

    /// Apply an engagement mutation in place. Returns whether anything changed.
    ///
    /// Counts are recomputed from the sets so `like_count == liked_by.len()`
    /// holds even if a stored record had drifted.
    pub fn apply(&mut self, op: &EngagementOp, now: DateTime<Utc>) -> bool {
        let changed = match op {
            EngagementOp::ToggleLike(user) => {
                if let Some(pos) = self.liked_by.iter().position(|u| u == user) {
                    self.liked_by.remove(pos);
                } else {
                    self.liked_by.push(user.clone());
                }
                true
            }
            EngagementOp::SetLike(user, liked) => {
                let pos = self.liked_by.iter().position(|u| u == user);
                match (pos, *liked) {
                    (Some(pos), false) => {
                        self.liked_by.remove(pos);
                        true
                    }
                    (None, true) => {
                        self.liked_by.push(user.clone());
                        true
                    }
                    _ => false,
                }
            }
            EngagementOp::RegisterView(user) => {
                if self.viewed_by.contains(user) {
                    false
                } else {
                    self.viewed_by.push(user.clone());
                    true
                }
            }
        };
        self.like_count = self.liked_by.len() as u64;
        self.view_count = self.viewed_by.len() as u64;
        if changed {
            self.updated_at = now;
        }
        changed
    }

    pub fn apply_edit(&mut self, edit: &NewsEdit, now: DateTime<Utc>) {
        self.title = edit.title.clone();
        self.content = edit.content.clone();
        if let Some(image) = &edit.image {
            self.image = Some(image.clone());
        }
        self.updated_at = now;
    }

    pub fn is_liked_by(&self, user: &UserId) -> bool {
        self.liked_by.contains(user)
    }

    /// Lexical tokens of title and body
    pub fn search_tokens(&self) -> Vec<String> {
        search_tokens(&format!("{} {}", self.title, self.content))
    }
}

/// Lowercased, de-duplicated word tokens of at least [`MIN_TOKEN_CHARS`]
pub fn search_tokens(text: &str) -> Vec<String> {
    let mut tokens: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= MIN_TOKEN_CHARS)
        .map(|w| w.to_lowercase())
        .collect();
    tokens.sort();
    tokens.dedup();
    tokens
}

/// Input for creating a content item
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub role: Option<Visibility>,
}

impl NewsDraft {
    pub fn validate(mut self) -> Result<Self> {
        self.category = self.category.trim().to_string();
        if self.title.trim().is_empty() || self.content.trim().is_empty() || self.category.is_empty()
        {
            return Err(BulletinError::BadRequest(
                "Title, content, and category are required".into(),
            ));
        }
        check_lengths(&self.title, &self.content)?;
        self.image = normalize_image(self.image);
        Ok(self)
    }
}

/// Input for editing a content item
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsEdit {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub image: Option<String>,
}

impl NewsEdit {
    pub fn validate(mut self) -> Result<Self> {
        if self.title.trim().is_empty() || self.content.trim().is_empty() {
            return Err(BulletinError::BadRequest(
                "Title and content are required".into(),
            ));
        }
        check_lengths(&self.title, &self.content)?;
        self.image = normalize_image(self.image);
        Ok(self)
    }
}

fn check_lengths(title: &str, content: &str) -> Result<()> {
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(BulletinError::BadRequest(format!(
            "Title must be {} characters or less",
            MAX_TITLE_CHARS
        )));
    }
    if content.chars().count() > MAX_CONTENT_CHARS {
        return Err(BulletinError::BadRequest(format!(
            "Content must be {} characters or less",
            MAX_CONTENT_CHARS
        )));
    }
    Ok(())
}

// An empty image string means "no image"
fn normalize_image(image: Option<String>) -> Option<String> {
    image.filter(|s| !s.trim().is_empty())
}
