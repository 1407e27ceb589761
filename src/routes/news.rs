//! `/api/news` routes

use bytes::Bytes;
use hyper::StatusCode;
use serde::Deserialize;

use crate::auth::Caller;
use crate::news::{NewsDraft, NewsEdit, NewsQuery};
use crate::server::AppState;
use crate::types::{BulletinError, ContentId, Result};

use super::{json_response, parse_json, ApiResponse};

pub async fn list(state: &AppState, caller: &Caller, query: Option<&str>) -> Result<ApiResponse> {
    let query = NewsQuery::from_query_string(query)?;
    let items = state.visibility.list(caller, &query).await?;
    Ok(json_response(StatusCode::OK, &items))
}

pub async fn search(
    state: &AppState,
    caller: &Caller,
    query: Option<&str>,
) -> Result<ApiResponse> {
    let query = NewsQuery::from_query_string(query)?;
    let items = state.visibility.search(caller, &query).await?;
    Ok(json_response(StatusCode::OK, &items))
}

pub async fn archived(
    state: &AppState,
    caller: &Caller,
    query: Option<&str>,
) -> Result<ApiResponse> {
    let query = NewsQuery::from_query_string(query)?;
    let items = state.visibility.archived(caller, &query).await?;
    Ok(json_response(StatusCode::OK, &items))
}

pub async fn get(state: &AppState, caller: &Caller, id: &str) -> Result<ApiResponse> {
    let id = ContentId::parse(id)?;
    let item = state.visibility.fetch_one(caller, &id).await?;
    Ok(json_response(StatusCode::OK, &item))
}

pub async fn create(state: &AppState, caller: &Caller, body: &Bytes) -> Result<ApiResponse> {
    let draft: NewsDraft = parse_json(body)?;
    let item = state.newsroom.create(caller, draft).await?;
    Ok(json_response(StatusCode::CREATED, &item))
}

pub async fn update(
    state: &AppState,
    caller: &Caller,
    id: &str,
    body: &Bytes,
) -> Result<ApiResponse> {
    let id = ContentId::parse(id)?;
    let edit: NewsEdit = parse_json(body)?;
    let item = state.newsroom.update(caller, &id, edit).await?;
    Ok(json_response(StatusCode::OK, &item))
}

pub async fn delete(state: &AppState, caller: &Caller, id: &str) -> Result<ApiResponse> {
    let id = ContentId::parse(id)?;
    state.newsroom.delete(caller, &id).await?;
    Ok(json_response(
        StatusCode::OK,
        &serde_json::json!({ "message": "News deleted successfully" }),
    ))
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct LikeRequest {
    #[serde(default)]
    news_id: String,
    /// Explicit intent; absent means toggle
    #[serde(default)]
    liked: Option<bool>,
}

pub async fn like(
    state: &AppState,
    caller: &Caller,
    id: &str,
    body: &Bytes,
) -> Result<ApiResponse> {
    let request: LikeRequest = parse_json(body)?;
    apply_like(state, caller, id, request.liked).await
}

/// Older clients post `{"newsId"}` to `/api/news/like`
pub async fn like_from_body(
    state: &AppState,
    caller: &Caller,
    body: &Bytes,
) -> Result<ApiResponse> {
    let request: LikeRequest = parse_json(body)?;
    let id = request.news_id.trim();
    if id.is_empty() {
        return Err(BulletinError::BadRequest("News ID is required".into()));
    }
    apply_like(state, caller, id, request.liked).await
}

async fn apply_like(
    state: &AppState,
    caller: &Caller,
    id: &str,
    liked: Option<bool>,
) -> Result<ApiResponse> {
    let id = ContentId::parse(id)?;
    let outcome = match liked {
        Some(liked) => state.engagement.set_like(caller, &id, liked).await?,
        None => state.engagement.toggle_like(caller, &id).await?,
    };
    Ok(json_response(StatusCode::OK, &outcome))
}

pub async fn view(state: &AppState, caller: &Caller, id: &str) -> Result<ApiResponse> {
    let id = ContentId::parse(id)?;
    let outcome = state.engagement.register_view(caller, &id).await?;
    Ok(json_response(StatusCode::OK, &outcome))
}

pub async fn toggle_archive(state: &AppState, caller: &Caller, id: &str) -> Result<ApiResponse> {
    let outcome = state.archive.toggle(caller, id).await?;
    Ok(json_response(StatusCode::OK, &outcome))
}
