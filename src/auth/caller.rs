//! The authenticated identity behind a request

use crate::types::{BulletinError, UserId, UserRole};

use super::jwt::Claims;

/// Authenticated caller, derived from verified token claims
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub id: UserId,
    pub username: String,
    pub role: UserRole,
    admin_flag: bool,
}

impl Caller {
    pub fn new(id: UserId, username: impl Into<String>, role: UserRole, admin_flag: bool) -> Self {
        Self {
            id,
            username: username.into(),
            role,
            admin_flag,
        }
    }

    /// Either the explicit admin flag or the admin role grants admin rights
    pub fn is_admin(&self) -> bool {
        self.admin_flag || self.role == UserRole::Admin
    }

    pub fn require_admin(&self) -> Result<(), BulletinError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(BulletinError::Forbidden("Admin access required".into()))
        }
    }

    /// The caller must be `owner` or an admin
    pub fn require_self_or_admin(&self, owner: &UserId) -> Result<(), BulletinError> {
        if &self.id == owner || self.is_admin() {
            Ok(())
        } else {
            Err(BulletinError::Forbidden("Unauthorized access".into()))
        }
    }
}

impl TryFrom<Claims> for Caller {
    type Error = BulletinError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        if claims.user_id.trim().is_empty() {
            return Err(BulletinError::Unauthorized("Token has no subject".into()));
        }
        Ok(Self::new(
            UserId::new(claims.user_id),
            claims.username,
            claims.role,
            claims.is_admin,
        ))
    }
}
