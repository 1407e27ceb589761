//! Error types for Bulletin
//!
//! One error enum for the whole crate. Each variant maps onto a distinct
//! HTTP status so clients can tell "doesn't exist" apart from "not allowed".

use hyper::StatusCode;

/// Main error type for Bulletin operations
#[derive(Debug, thiserror::Error)]
pub enum BulletinError {
    /// Missing or malformed input. Never retried, nothing written.
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Caller lacks the role or ownership the action needs.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    /// Every recipient of a fan-out failed.
    #[error("Fan-out failed: {0}")]
    Fanout(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BulletinError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Fanout(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::WebSocket(_) => StatusCode::BAD_REQUEST,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for error bodies
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "VALIDATION",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Database(_) => "STORAGE",
            Self::Timeout(_) => "TIMEOUT",
            Self::Fanout(_) => "FANOUT",
            Self::WebSocket(_) => "WEBSOCKET",
            Self::Config(_) => "CONFIG",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Message safe to show to clients. Storage and internal details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            Self::Database(_) | Self::Internal(_) | Self::Config(_) => "Server error".to_string(),
            Self::BadRequest(m)
            | Self::Unauthorized(m)
            | Self::Forbidden(m)
            | Self::NotFound(m)
            | Self::Timeout(m)
            | Self::Fanout(m)
            | Self::WebSocket(m) => m.clone(),
        }
    }
}

impl From<std::io::Error> for BulletinError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for BulletinError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest(format!("JSON error: {}", err))
    }
}

impl From<hyper::Error> for BulletinError {
    fn from(err: hyper::Error) -> Self {
        Self::Internal(format!("HTTP error: {}", err))
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for BulletinError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(err.to_string())
    }
}

impl From<mongodb::error::Error> for BulletinError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<bson::ser::Error> for BulletinError {
    fn from(err: bson::ser::Error) -> Self {
        Self::Internal(format!("BSON encoding error: {}", err))
    }
}

impl From<jsonwebtoken::errors::Error> for BulletinError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::Unauthorized(format!("JWT error: {}", err))
    }
}

/// Result type alias for Bulletin operations
pub type Result<T> = std::result::Result<T, BulletinError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_and_forbidden_are_distinct() {
        let missing = BulletinError::NotFound("news".into());
        let hidden = BulletinError::Forbidden("news".into());
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(hidden.status_code(), StatusCode::FORBIDDEN);
        assert_ne!(missing.code(), hidden.code());
    }

    #[test]
    fn test_storage_details_are_hidden() {
        let err = BulletinError::Database("connection refused at 10.0.0.3".into());
        assert_eq!(err.public_message(), "Server error");
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_client_errors_carry_bare_message() {
        let err = BulletinError::NotFound("News not found".into());
        assert_eq!(err.public_message(), "News not found");
    }
}
