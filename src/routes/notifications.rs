//! `/api/notifications` routes

use hyper::StatusCode;

use crate::auth::Caller;
use crate::server::AppState;
use crate::types::{NotificationId, Result};

use super::{json_response, ApiResponse};

pub async fn list(state: &AppState, caller: &Caller) -> Result<ApiResponse> {
    let notifications = state.inbox.list(caller).await?;
    Ok(json_response(StatusCode::OK, &notifications))
}

pub async fn unread_count(state: &AppState, caller: &Caller) -> Result<ApiResponse> {
    let count = state.inbox.unread_count(caller).await?;
    Ok(json_response(
        StatusCode::OK,
        &serde_json::json!({ "count": count }),
    ))
}

pub async fn mark_read(state: &AppState, caller: &Caller, id: &str) -> Result<ApiResponse> {
    let id = NotificationId::parse(id)?;
    let notification = state.inbox.mark_read(caller, &id).await?;
    Ok(json_response(StatusCode::OK, &notification))
}

pub async fn mark_all_read(state: &AppState, caller: &Caller) -> Result<ApiResponse> {
    let updated = state.inbox.mark_all_read(caller).await?;
    Ok(json_response(
        StatusCode::OK,
        &serde_json::json!({
            "message": "All notifications marked as read",
            "updated": updated,
        }),
    ))
}
