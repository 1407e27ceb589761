//! `/api/userpreferences` routes

use bytes::Bytes;
use hyper::StatusCode;
use serde::Deserialize;
use tracing::info;

use crate::auth::Caller;
use crate::server::AppState;
use crate::store::UserPreferences;
use crate::types::{Result, UserId};

use super::{json_response, parse_json, ApiResponse};

/// Preferences of `user_id`; an absent record reads as empty
pub async fn get(state: &AppState, caller: &Caller, user_id: &str) -> Result<ApiResponse> {
    let user_id = UserId::new(user_id);
    caller.require_self_or_admin(&user_id)?;

    let prefs = state
        .stores
        .prefs
        .get(&user_id)
        .await?
        .unwrap_or_else(|| UserPreferences::empty(user_id));
    Ok(json_response(StatusCode::OK, &prefs))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateCategoriesRequest {
    /// Defaults to the caller
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default, alias = "categories")]
    selected_categories: Vec<String>,
}

pub async fn update_categories(
    state: &AppState,
    caller: &Caller,
    body: &Bytes,
) -> Result<ApiResponse> {
    let request: UpdateCategoriesRequest = parse_json(body)?;
    let user_id = request
        .user_id
        .filter(|id| !id.trim().is_empty())
        .map(UserId::new)
        .unwrap_or_else(|| caller.id.clone());
    caller.require_self_or_admin(&user_id)?;

    let mut categories: Vec<String> = Vec::with_capacity(request.selected_categories.len());
    for category in request.selected_categories {
        let category = category.trim().to_string();
        if !category.is_empty() && !categories.contains(&category) {
            categories.push(category);
        }
    }

    let prefs = state.stores.prefs.set_categories(&user_id, categories).await?;
    info!(user = %user_id, count = prefs.selected_categories.len(), "Categories updated");
    Ok(json_response(StatusCode::OK, &prefs))
}
