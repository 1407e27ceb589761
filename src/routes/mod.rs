//! HTTP routes for Bulletin
//!
//! Every `/api/*` route is authenticated before it gets here. Handlers
//! return `Result<Response>`; [`respond`] turns errors into the shared
//! `{"error", "code"}` body.

pub mod comments;
pub mod health;
pub mod news;
pub mod notifications;
pub mod preferences;
pub mod reminders;

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{error, warn};

use crate::auth::Caller;
use crate::server::AppState;
use crate::types::{BulletinError, Result};

pub use health::{health_check, HealthResponse};

pub type ApiResponse = Response<Full<Bytes>>;

/// JSON response with CORS headers
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> ApiResponse {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .header("Cache-Control", "no-store")
        .body(Full::new(Bytes::from(json)))
        .unwrap()
}

/// Error body: `{"error": "<message>", "code": "<CODE>"}`
pub fn error_response(err: &BulletinError) -> ApiResponse {
    let status = err.status_code();
    if status.is_server_error() {
        error!(code = err.code(), "Request failed: {}", err);
    } else {
        warn!(code = err.code(), "Request rejected: {}", err);
    }

    let body = serde_json::json!({
        "error": err.public_message(),
        "code": err.code(),
    });
    json_response(status, &body)
}

pub fn respond(result: Result<ApiResponse>) -> ApiResponse {
    result.unwrap_or_else(|e| error_response(&e))
}

/// Decode a JSON request body; an empty body decodes as `{}`
pub fn parse_json<T: DeserializeOwned>(body: &Bytes) -> Result<T> {
    let raw: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
        b"{}"
    } else {
        body
    };
    serde_json::from_slice(raw)
        .map_err(|e| BulletinError::BadRequest(format!("Invalid JSON: {}", e)))
}

/// Route an authenticated `/api/*` request
pub async fn handle_api_request(
    state: &AppState,
    caller: &Caller,
    method: &Method,
    path: &str,
    query: Option<&str>,
    body: Bytes,
) -> Result<ApiResponse> {
    let rest = path.strip_prefix("/api").unwrap_or(path);
    let segments: Vec<&str> = rest.trim_matches('/').split('/').collect();

    match (method.clone(), segments.as_slice()) {
        // News listings; fixed segments before `{id}`
        (Method::GET, ["news"]) => news::list(state, caller, query).await,
        (Method::GET, ["news", "search"]) => news::search(state, caller, query).await,
        (Method::GET, ["news", "archived"]) => news::archived(state, caller, query).await,
        (Method::POST, ["news"]) => news::create(state, caller, &body).await,
        (Method::POST, ["news", "like"]) => news::like_from_body(state, caller, &body).await,
        (Method::GET, ["news", id]) => news::get(state, caller, id).await,
        (Method::PUT, ["news", id]) => news::update(state, caller, id, &body).await,
        (Method::DELETE, ["news", id]) => news::delete(state, caller, id).await,
        (Method::POST, ["news", id, "like"]) => news::like(state, caller, id, &body).await,
        (Method::POST, ["news", id, "view"]) => news::view(state, caller, id).await,
        (Method::POST, ["news", id, "toggle-archive"]) => {
            news::toggle_archive(state, caller, id).await
        }

        (Method::GET, ["notifications"]) => notifications::list(state, caller).await,
        (Method::GET, ["notifications", "unread-count"]) => {
            notifications::unread_count(state, caller).await
        }
        (Method::POST, ["notifications", "read-all"]) => {
            notifications::mark_all_read(state, caller).await
        }
        (Method::POST, ["notifications", id, "read"]) => {
            notifications::mark_read(state, caller, id).await
        }

        (Method::POST, ["comments"]) => comments::create(state, caller, &body).await,
        (Method::GET, ["comments", news_id]) => comments::list(state, caller, news_id).await,

        (Method::POST, ["userpreferences", "update-categories"]) => {
            preferences::update_categories(state, caller, &body).await
        }
        (Method::GET, ["userpreferences", user_id]) => {
            preferences::get(state, caller, user_id).await
        }

        (Method::POST, ["reminders"]) => reminders::trigger(state, caller, &body).await,

        _ => Err(BulletinError::NotFound(format!(
            "No route for {} {}",
            method, path
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_error_body_shape() {
        let resp = error_response(&BulletinError::Forbidden("Admin access required".into()));
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"error": "Admin access required", "code": "FORBIDDEN"})
        );
    }

    #[test]
    fn test_empty_body_is_empty_object() {
        let value: serde_json::Value = parse_json(&Bytes::new()).unwrap();
        assert_eq!(value, serde_json::json!({}));
        assert!(parse_json::<serde_json::Value>(&Bytes::from_static(b"{nope")).is_err());
    }
}
