//! `/api/reminders` - trigger from the external scheduler

use bytes::Bytes;
use hyper::StatusCode;
use serde::Deserialize;

use crate::auth::Caller;
use crate::notify::AudienceRule;
use crate::server::AppState;
use crate::types::Result;

use super::{json_response, parse_json, ApiResponse};

#[derive(Deserialize)]
struct ReminderRequest {
    /// `all` or a user role; defaults to everyone
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    text: String,
}

pub async fn trigger(state: &AppState, caller: &Caller, body: &Bytes) -> Result<ApiResponse> {
    let request: ReminderRequest = parse_json(body)?;
    let audience = match request.role.as_deref().map(str::trim) {
        None | Some("") => AudienceRule::All,
        Some(raw) => raw.parse()?,
    };
    let report = state.newsroom.remind(caller, audience, &request.text).await?;
    Ok(json_response(StatusCode::ACCEPTED, &report))
}
