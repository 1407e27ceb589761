//! Bearer token verification
//!
//! Tokens are issued by the identity service; this crate only verifies them.
//!
//! - HS256 (HMAC-SHA256) signatures
//! - Claims carry the user id under `_id` along with role and admin flag
//! - Expired tokens are rejected

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::MIN_JWT_SECRET_LEN;
use crate::types::{BulletinError, UserRole};

/// Payload stored in a bearer token
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// Stored user id
    #[serde(rename = "_id")]
    pub user_id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub is_admin: bool,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Issued at (Unix timestamp)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,
}

/// Result of token validation
#[derive(Debug)]
pub struct TokenValidationResult {
    pub valid: bool,
    pub claims: Option<Claims>,
    pub error: Option<String>,
}

impl TokenValidationResult {
    pub fn valid(claims: Claims) -> Self {
        Self {
            valid: true,
            claims: Some(claims),
            error: None,
        }
    }

    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            claims: None,
            error: Some(error.into()),
        }
    }

    /// Collapse into a `Result`, mapping failures to `Unauthorized`
    pub fn into_claims(self) -> Result<Claims, BulletinError> {
        match (self.valid, self.claims) {
            (true, Some(claims)) => Ok(claims),
            _ => Err(BulletinError::Unauthorized(
                self.error.unwrap_or_else(|| "Invalid token".to_string()),
            )),
        }
    }
}

/// JWT validator
#[derive(Clone)]
pub struct JwtValidator {
    secret: String,
}

impl JwtValidator {
    /// Create a new JWT validator
    ///
    /// Returns an error if the secret is empty or too short
    pub fn new(secret: String) -> Result<Self, BulletinError> {
        if secret.is_empty() {
            return Err(BulletinError::Config(
                "JWT_SECRET is required in production mode".into(),
            ));
        }

        if secret.len() < MIN_JWT_SECRET_LEN {
            return Err(BulletinError::Config(format!(
                "JWT_SECRET must be at least {} characters",
                MIN_JWT_SECRET_LEN
            )));
        }

        Ok(Self { secret })
    }

    /// Create a validator for dev mode
    pub fn new_dev() -> Self {
        Self {
            secret: "dev-only-insecure-secret-do-not-deploy-000".into(),
        }
    }

    /// Verify and decode a token
    pub fn verify_token(&self, token: &str) -> TokenValidationResult {
        let validation = Validation::default();

        match decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        ) {
            Ok(token_data) => TokenValidationResult::valid(token_data.claims),
            Err(err) => {
                use jsonwebtoken::errors::ErrorKind;
                let error_msg = match err.kind() {
                    ErrorKind::ExpiredSignature => "Token expired",
                    ErrorKind::InvalidToken => "Invalid token",
                    ErrorKind::InvalidSignature => "Invalid signature",
                    _ => "Token validation failed",
                };
                TokenValidationResult::invalid(error_msg)
            }
        }
    }

    /// Sign a token with this validator's secret.
    ///
    /// Production tokens come from the identity service; this exists for
    /// local tooling and tests.
    pub fn sign(
        &self,
        user_id: &str,
        username: &str,
        role: UserRole,
        is_admin: bool,
        ttl_seconds: u64,
    ) -> Result<String, BulletinError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| BulletinError::Internal(format!("System time error: {}", e)))?
            .as_secs();

        let claims = Claims {
            user_id: user_id.to_string(),
            username: username.to_string(),
            role,
            is_admin,
            exp: now + ttl_seconds,
            iat: Some(now),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| BulletinError::Internal(format!("Failed to sign token: {}", e)))
    }
}

/// Extract token from Authorization header.
/// Supports "Bearer <token>" format and raw tokens.
pub fn extract_token_from_header(auth_header: Option<&str>) -> Option<&str> {
    let header = auth_header?;

    if let Some(token) = header.strip_prefix("Bearer ") {
        let token = token.trim();
        if !token.is_empty() {
            return Some(token);
        }
    }

    if !header.contains(' ') {
        let token = header.trim();
        if !token.is_empty() {
            return Some(token);
        }
    }

    None
}

/// Extract a named parameter from a query string (`a=1&token=xyz`)
pub fn extract_token_from_query(query: Option<&str>, param_name: &str) -> Option<String> {
    let query = query?;
    for param in query.split('&') {
        if let Some((key, value)) = param.split_once('=') {
            if key == param_name && !value.is_empty() {
                return urlencoding::decode(value).ok().map(|v| v.into_owned());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_validator() -> JwtValidator {
        JwtValidator::new("test-secret-that-is-at-least-32-characters-long".into()).unwrap()
    }

    #[test]
    fn test_sign_and_verify_token() {
        let validator = test_validator();
        let token = validator
            .sign("65f0c0ffee0000000000abcd", "ada", UserRole::Faculty, false, 3600)
            .unwrap();

        let claims = validator.verify_token(&token).into_claims().unwrap();
        assert_eq!(claims.user_id, "65f0c0ffee0000000000abcd");
        assert_eq!(claims.role, UserRole::Faculty);
        assert!(!claims.is_admin);
    }

    #[test]
    fn test_wrong_secret() {
        let other = JwtValidator::new("different-secret-that-is-at-least-32-characters".into())
            .unwrap();
        let token = test_validator()
            .sign("u1", "ada", UserRole::Student, false, 3600)
            .unwrap();

        let result = other.verify_token(&token);
        assert!(!result.valid);
        assert!(matches!(
            result.into_claims(),
            Err(BulletinError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_short_secret_rejected() {
        assert!(JwtValidator::new("too-short".into()).is_err());
        assert!(JwtValidator::new(String::new()).is_err());
    }

    #[test]
    fn test_claims_wire_names() {
        let raw = r#"{"_id":"abc","username":"bo","role":"admin","isAdmin":true,"exp":1}"#;
        let claims: Claims = serde_json::from_str(raw).unwrap();
        assert_eq!(claims.user_id, "abc");
        assert!(claims.is_admin);
        assert_eq!(claims.role, UserRole::Admin);
        assert!(claims.iat.is_none());
    }

    #[test]
    fn test_extract_token() {
        assert_eq!(extract_token_from_header(Some("Bearer abc123")), Some("abc123"));
        assert_eq!(extract_token_from_header(Some("abc123")), Some("abc123"));
        assert_eq!(extract_token_from_header(Some("Basic a b")), None);
        assert_eq!(extract_token_from_header(None), None);

        assert_eq!(
            extract_token_from_query(Some("x=1&token=abc%2Edef"), "token"),
            Some("abc.def".to_string())
        );
        assert_eq!(extract_token_from_query(Some("x=1"), "token"), None);
    }
}
