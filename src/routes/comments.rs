//! `/api/comments` routes

use bytes::Bytes;
use hyper::StatusCode;

use crate::auth::Caller;
use crate::news::CommentDraft;
use crate::server::AppState;
use crate::types::{ContentId, Result};

use super::{json_response, parse_json, ApiResponse};

pub async fn create(state: &AppState, caller: &Caller, body: &Bytes) -> Result<ApiResponse> {
    let draft: CommentDraft = parse_json(body)?;
    let comment = state.newsroom.comment(caller, draft).await?;
    Ok(json_response(StatusCode::CREATED, &comment))
}

pub async fn list(state: &AppState, caller: &Caller, news_id: &str) -> Result<ApiResponse> {
    let news_id = ContentId::parse(news_id)?;
    let comments = state.newsroom.comments(caller, &news_id).await?;
    Ok(json_response(StatusCode::OK, &comments))
}
