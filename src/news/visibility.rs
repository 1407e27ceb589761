//! Visibility filtering
//!
//! Decides which content items a caller may see for a given query. The
//! predicate lives in [`NewsFilter`], a plain value that is either evaluated
//! in memory ([`NewsFilter::matches`]) or compiled into a MongoDB filter
//! ([`NewsFilter::to_document`]), so both storage backends agree on exactly
//! which items are eligible.
//!
//! All clauses are conjunctive:
//!
//! | Clause | Source |
//! |---|---|
//! | role eligibility | caller role (admins skip), optional `role` query param |
//! | lexical search | `q`, any shared token |
//! | category | `category`, case-insensitive substring |
//! | since | `since`, created or updated strictly after |
//! | archive exclusion | caller's archive set unless `includeArchived=true` |

use bson::{doc, Bson, Document};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::auth::Caller;
use crate::store::{ContentStore, PreferenceStore};
use crate::types::{BulletinError, ContentId, Result, Visibility};

use super::model::{search_tokens, NewsItem};

/// Categories a non-admin may see in their archived listing
pub const ARCHIVE_SAFE_CATEGORIES: [&str; 4] = ["General", "Sports", "Events", "Academics"];

/// Query parameters shared by the listing endpoints
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsQuery {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub since: Option<String>,
    /// Only the literal `true` opts in
    #[serde(default, deserialize_with = "literal_true")]
    pub include_archived: bool,
    #[serde(default, alias = "search")]
    pub q: Option<String>,
}

impl NewsQuery {
    pub fn from_query_string(query: Option<&str>) -> Result<Self> {
        serde_urlencoded::from_str(query.unwrap_or(""))
            .map_err(|e| BulletinError::BadRequest(format!("Invalid query: {}", e)))
    }

    fn non_blank(value: &Option<String>) -> Option<&str> {
        value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }
}

fn literal_true<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(raw == "true")
}

/// Eligibility predicate over content items
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewsFilter {
    /// Allowed visibility roles; `None` admits every role
    pub roles: Option<Vec<Visibility>>,
    /// Any-of lexical tokens
    pub tokens: Option<Vec<String>>,
    /// Lowercased substring of the category
    pub category_contains: Option<String>,
    /// Exact category allow-list
    pub categories_in: Option<Vec<String>>,
    pub since: Option<DateTime<Utc>>,
    pub ids_in: Option<Vec<ContentId>>,
    pub ids_not_in: Vec<ContentId>,
}

impl NewsFilter {
    /// Base eligibility for a caller: admins see everything, others see `all`
    /// plus their own role
    pub fn for_caller(caller: &Caller) -> Self {
        let roles = if caller.is_admin() {
            None
        } else {
            let mut roles = vec![Visibility::All];
            roles.extend(Visibility::for_role(caller.role));
            Some(roles)
        };
        Self {
            roles,
            ..Default::default()
        }
    }

    /// Intersect the allowed roles with `allowed`
    pub fn narrow_roles(&mut self, allowed: &[Visibility]) {
        let next = match self.roles.take() {
            None => allowed.to_vec(),
            Some(current) => current.into_iter().filter(|r| allowed.contains(r)).collect(),
        };
        self.roles = Some(next);
    }

    pub fn matches(&self, item: &NewsItem) -> bool {
        if let Some(roles) = &self.roles {
            if !roles.contains(&item.role) {
                return false;
            }
        }
        if let Some(tokens) = &self.tokens {
            let own = item.search_tokens();
            if !tokens.iter().any(|t| own.contains(t)) {
                return false;
            }
        }
        if let Some(needle) = &self.category_contains {
            if !item.category.to_lowercase().contains(needle.as_str()) {
                return false;
            }
        }
        if let Some(allowed) = &self.categories_in {
            if !allowed.iter().any(|c| c == &item.category) {
                return false;
            }
        }
        if let Some(since) = self.since {
            if !(item.created_at > since || item.updated_at > since) {
                return false;
            }
        }
        if let Some(ids) = &self.ids_in {
            if !ids.contains(&item.id) {
                return false;
            }
        }
        !self.ids_not_in.contains(&item.id)
    }

    /// Compile to a MongoDB filter with the same meaning as [`Self::matches`]
    pub fn to_document(&self) -> Document {
        let mut clauses: Vec<Document> = Vec::new();

        if let Some(roles) = &self.roles {
            let roles: Vec<&str> = roles.iter().map(|r| r.as_str()).collect();
            clauses.push(doc! { "role": { "$in": roles } });
        }
        if let Some(tokens) = &self.tokens {
            // Documents written before tokens were stored are matched on the text itself
            let pattern = token_pattern(tokens);
            clauses.push(doc! {
                "$or": [
                    { "searchTokens": { "$in": tokens.clone() } },
                    {
                        "searchTokens": { "$exists": false },
                        "$or": [
                            { "title": { "$regex": pattern.as_str(), "$options": "i" } },
                            { "content": { "$regex": pattern.as_str(), "$options": "i" } },
                        ]
                    },
                ]
            });
        }
        if let Some(needle) = &self.category_contains {
            clauses.push(doc! {
                "category": { "$regex": escape_regex(needle), "$options": "i" }
            });
        }
        if let Some(allowed) = &self.categories_in {
            clauses.push(doc! { "category": { "$in": allowed.clone() } });
        }
        if let Some(since) = self.since {
            let since = bson::DateTime::from_chrono(since);
            clauses.push(doc! {
                "$or": [
                    { "createdAt": { "$gt": since } },
                    { "updatedAt": { "$gt": since } },
                ]
            });
        }
        if let Some(ids) = &self.ids_in {
            clauses.push(doc! { "_id": { "$in": object_ids(ids) } });
        }
        if !self.ids_not_in.is_empty() {
            clauses.push(doc! { "_id": { "$nin": object_ids(&self.ids_not_in) } });
        }

        match clauses.len() {
            0 => Document::new(),
            1 => clauses.remove(0),
            _ => doc! { "$and": clauses },
        }
    }
}

fn object_ids(ids: &[ContentId]) -> Vec<Bson> {
    ids.iter().map(|id| Bson::ObjectId(id.to_object_id())).collect()
}

/// Regex matching any of `tokens` as a whole word, the way [`search_tokens`]
/// splits text on non-alphanumeric characters
pub fn token_pattern(tokens: &[String]) -> String {
    let alternatives: Vec<String> = tokens.iter().map(|t| escape_regex(t)).collect();
    format!(
        "(?:^|[^\\p{{L}}\\p{{N}}])(?:{})(?:[^\\p{{L}}\\p{{N}}]|$)",
        alternatives.join("|")
    )
}

/// Escape regex metacharacters so the category is matched literally
pub fn escape_regex(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if "\\.+*?()|[]{}^$#-".contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Parse a `since` value: RFC 3339, naive `YYYY-MM-DDTHH:MM:SS[.fff]` (UTC),
/// `YYYY-MM-DD` (UTC midnight) or integer epoch milliseconds.
pub fn parse_since(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    let invalid = || BulletinError::BadRequest(format!("Invalid since date: {}", raw));

    if !raw.is_empty() && raw.chars().all(|c| c.is_ascii_digit()) {
        let millis: i64 = raw.parse().map_err(|_| invalid())?;
        return Utc.timestamp_millis_opt(millis).single().ok_or_else(invalid);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(Utc.from_utc_datetime(&naive));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(invalid)?;
        return Ok(Utc.from_utc_datetime(&midnight));
    }
    Err(invalid())
}

/// Whether `caller` may see `item` at all
pub fn is_visible(caller: &Caller, item: &NewsItem) -> bool {
    caller.is_admin() || item.role.admits(caller.role)
}

/// Role-aware read side over content and preferences
pub struct VisibilityFilter {
    content: Arc<dyn ContentStore>,
    prefs: Arc<dyn PreferenceStore>,
}

impl VisibilityFilter {
    pub fn new(content: Arc<dyn ContentStore>, prefs: Arc<dyn PreferenceStore>) -> Self {
        Self { content, prefs }
    }

    /// Filter shared by every listing: base eligibility, role narrowing,
    /// category and since
    fn base_filter(caller: &Caller, query: &NewsQuery) -> Result<NewsFilter> {
        let mut filter = NewsFilter::for_caller(caller);

        if let Some(role) = NewsQuery::non_blank(&query.role) {
            let role: Visibility = role.parse()?;
            filter.narrow_roles(&[Visibility::All, role]);
        }
        if let Some(category) = NewsQuery::non_blank(&query.category) {
            filter.category_contains = Some(category.to_lowercase());
        }
        if let Some(since) = NewsQuery::non_blank(&query.since) {
            filter.since = Some(parse_since(since)?);
        }
        Ok(filter)
    }

    async fn exclude_archived(
        &self,
        caller: &Caller,
        query: &NewsQuery,
        filter: &mut NewsFilter,
    ) -> Result<()> {
        if query.include_archived {
            return Ok(());
        }
        if let Some(prefs) = self.prefs.get(&caller.id).await? {
            filter.ids_not_in = prefs
                .archived_news_ids
                .iter()
                .filter_map(|raw| ContentId::parse(raw).ok())
                .collect();
        }
        Ok(())
    }

    /// Visible items, newest first
    pub async fn list(&self, caller: &Caller, query: &NewsQuery) -> Result<Vec<NewsItem>> {
        let mut filter = Self::base_filter(caller, query)?;
        self.exclude_archived(caller, query, &mut filter).await?;
        let items = self.content.query(&filter).await?;
        debug!(user = %caller.id, count = items.len(), "Listed news");
        Ok(items)
    }

    /// Visible items sharing a token with `q`; a blank term is a validation error
    pub async fn search(&self, caller: &Caller, query: &NewsQuery) -> Result<Vec<NewsItem>> {
        let term = NewsQuery::non_blank(&query.q)
            .ok_or_else(|| BulletinError::BadRequest("Search query is required".into()))?;
        let tokens = search_tokens(term);
        if tokens.is_empty() {
            return Err(BulletinError::BadRequest(
                "Search query has no searchable words".into(),
            ));
        }

        let mut filter = Self::base_filter(caller, query)?;
        filter.tokens = Some(tokens);
        self.exclude_archived(caller, query, &mut filter).await?;
        let items = self.content.query(&filter).await?;
        debug!(user = %caller.id, term, count = items.len(), "Searched news");
        Ok(items)
    }

    /// The caller's archived items. Invalid stored ids are skipped; non-admins
    /// only see the archive-safe categories.
    pub async fn archived(&self, caller: &Caller, query: &NewsQuery) -> Result<Vec<NewsItem>> {
        let prefs = match self.prefs.get(&caller.id).await? {
            Some(prefs) => prefs,
            None => return Ok(Vec::new()),
        };

        let mut ids = Vec::with_capacity(prefs.archived_news_ids.len());
        for raw in &prefs.archived_news_ids {
            match ContentId::parse(raw) {
                Ok(id) => ids.push(id),
                Err(_) => warn!(user = %caller.id, id = %raw, "Skipping invalid archived id"),
            }
        }
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut filter = Self::base_filter(caller, query)?;
        filter.ids_in = Some(ids);
        if !caller.is_admin() {
            filter.categories_in = Some(
                ARCHIVE_SAFE_CATEGORIES
                    .iter()
                    .map(|c| c.to_string())
                    .collect(),
            );
        }
        self.content.query(&filter).await
    }

    /// One item: `NotFound` if missing, `Forbidden` if it exists but is hidden
    pub async fn fetch_one(&self, caller: &Caller, id: &ContentId) -> Result<NewsItem> {
        let item = self
            .content
            .get(id)
            .await?
            .ok_or_else(|| BulletinError::NotFound("News not found".into()))?;
        if !is_visible(caller, &item) {
            return Err(BulletinError::Forbidden(
                "You do not have access to this news".into(),
            ));
        }
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UserRole;
    use chrono::Datelike;

    fn student() -> Caller {
        Caller::new("s1".into(), "sam", UserRole::Student, false)
    }

    #[test]
    fn test_parse_since_formats() {
        let rfc = parse_since("2024-03-01T10:00:00Z").unwrap();
        let naive = parse_since("2024-03-01T10:00:00").unwrap();
        let frac = parse_since("2024-03-01T10:00:00.000").unwrap();
        assert_eq!(rfc, naive);
        assert_eq!(rfc, frac);

        let day = parse_since("2024-03-01").unwrap();
        assert_eq!(day.day(), 1);
        assert_eq!(day.timestamp() % 86_400, 0);

        let millis = parse_since("1709287200000").unwrap();
        assert_eq!(millis, rfc);

        assert!(matches!(parse_since("yesterday"), Err(BulletinError::BadRequest(_))));
        assert!(parse_since("").is_err());
    }

    #[test]
    fn test_role_narrowing_intersects() {
        let mut filter = NewsFilter::for_caller(&student());
        assert_eq!(
            filter.roles,
            Some(vec![Visibility::All, Visibility::Student])
        );
        filter.narrow_roles(&[Visibility::All, Visibility::Faculty]);
        assert_eq!(filter.roles, Some(vec![Visibility::All]));

        let admin = Caller::new("a1".into(), "ann", UserRole::Admin, true);
        let mut filter = NewsFilter::for_caller(&admin);
        assert!(filter.roles.is_none());
        filter.narrow_roles(&[Visibility::All, Visibility::Faculty]);
        assert_eq!(
            filter.roles,
            Some(vec![Visibility::All, Visibility::Faculty])
        );
    }

    #[test]
    fn test_document_covers_every_clause() {
        let filter = NewsFilter {
            roles: Some(vec![Visibility::All]),
            tokens: Some(vec!["game".into()]),
            category_contains: Some("sport".into()),
            categories_in: Some(vec!["Sports".into()]),
            since: Some(Utc::now()),
            ids_in: Some(vec![ContentId::generate()]),
            ids_not_in: vec![ContentId::generate()],
        };
        let compiled = filter.to_document();
        let clauses = compiled.get_array("$and").unwrap();
        assert_eq!(clauses.len(), 7);
    }

    #[test]
    fn test_search_clause_falls_back_to_text_without_tokens() {
        let filter = NewsFilter {
            tokens: Some(vec!["midterm".into(), "exam".into()]),
            ..Default::default()
        };
        let compiled = filter.to_document();
        let branches = compiled.get_array("$or").unwrap();
        assert_eq!(branches.len(), 2);

        let legacy = branches[1].as_document().unwrap();
        assert_eq!(
            legacy.get_document("searchTokens").unwrap(),
            &doc! { "$exists": false }
        );
        let text = legacy.get_array("$or").unwrap();
        let title = text[0].as_document().unwrap().get_document("title").unwrap();
        assert_eq!(
            title.get_str("$regex").unwrap(),
            "(?:^|[^\\p{L}\\p{N}])(?:midterm|exam)(?:[^\\p{L}\\p{N}]|$)"
        );
        assert_eq!(title.get_str("$options").unwrap(), "i");
    }

    #[test]
    fn test_empty_filter_compiles_to_empty_document() {
        assert!(NewsFilter::default().to_document().is_empty());
    }

    #[test]
    fn test_escape_regex() {
        assert_eq!(escape_regex("a.b*"), "a\\.b\\*");
        assert_eq!(escape_regex("Sports"), "Sports");
    }

    #[test]
    fn test_query_string_parsing() {
        let q = NewsQuery::from_query_string(Some("category=Sport&includeArchived=true&q=big%20game"))
            .unwrap();
        assert_eq!(q.category.as_deref(), Some("Sport"));
        assert!(q.include_archived);
        assert_eq!(q.q.as_deref(), Some("big game"));

        assert!(NewsQuery::from_query_string(None).unwrap().role.is_none());
        for loose in ["maybe", "1", "yes", "TRUE", ""] {
            let q = NewsQuery::from_query_string(Some(format!("includeArchived={}", loose).as_str()))
                .unwrap();
            assert!(!q.include_archived, "{}", loose);
        }
    }
}
