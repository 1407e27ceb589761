//! Role vocabularies
//!
//! Three closely related enums:
//! - [`Visibility`] - who a content item is addressed to (`all`, `student`, `faculty`)
//! - [`UserRole`] - what a user is (`student`, `faculty`, `admin`)
//! - [`Scope`] - the originating role recorded on a notification

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::BulletinError;

/// Visibility role of a content item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    All,
    Student,
    Faculty,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::All => "all",
            Visibility::Student => "student",
            Visibility::Faculty => "faculty",
        }
    }

    /// Whether a (non-admin) user with `role` is addressed by this visibility
    pub fn admits(&self, role: UserRole) -> bool {
        match self {
            Visibility::All => true,
            Visibility::Student => role == UserRole::Student,
            Visibility::Faculty => role == UserRole::Faculty,
        }
    }

    /// The visibility that exactly matches a user role, if any
    pub fn for_role(role: UserRole) -> Option<Self> {
        match role {
            UserRole::Student => Some(Visibility::Student),
            UserRole::Faculty => Some(Visibility::Faculty),
            UserRole::Admin => None,
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = BulletinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Visibility::All),
            "student" => Ok(Visibility::Student),
            "faculty" => Ok(Visibility::Faculty),
            other => Err(BulletinError::BadRequest(format!("Invalid role: {}", other))),
        }
    }
}

/// Role of a user account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Student,
    Faculty,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Student => "student",
            UserRole::Faculty => "faculty",
            UserRole::Admin => "admin",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = BulletinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(UserRole::Student),
            "faculty" => Ok(UserRole::Faculty),
            "admin" => Ok(UserRole::Admin),
            other => Err(BulletinError::BadRequest(format!("Invalid role: {}", other))),
        }
    }
}

/// Originating role scope recorded on a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    All,
    Student,
    Faculty,
    Admin,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::All => "all",
            Scope::Student => "student",
            Scope::Faculty => "faculty",
            Scope::Admin => "admin",
        }
    }
}

impl From<Visibility> for Scope {
    fn from(v: Visibility) -> Self {
        match v {
            Visibility::All => Scope::All,
            Visibility::Student => Scope::Student,
            Visibility::Faculty => Scope::Faculty,
        }
    }
}

impl From<UserRole> for Scope {
    fn from(r: UserRole) -> Self {
        match r {
            UserRole::Student => Scope::Student,
            UserRole::Faculty => Scope::Faculty,
            UserRole::Admin => Scope::Admin,
        }
    }
}

impl FromStr for Scope {
    type Err = BulletinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Scope::All),
            "student" => Ok(Scope::Student),
            "faculty" => Ok(Scope::Faculty),
            "admin" => Ok(Scope::Admin),
            other => Err(BulletinError::BadRequest(format!("Invalid role: {}", other))),
        }
    }
}
