//! Audience selection
//!
//! Rules are resolved against the user directory at fan-out time and never
//! cached, so a role change takes effect on the next event.

use serde::Deserialize;
use std::str::FromStr;

use crate::store::UserDirectory;
use crate::types::{BulletinError, Result, Scope, UserId, UserRole, Visibility};

/// Which users an event is addressed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum AudienceRule {
    All,
    Role(UserRole),
}

impl AudienceRule {
    /// Audience of a content item with the given visibility
    pub fn for_visibility(visibility: Visibility) -> Self {
        match visibility {
            Visibility::All => AudienceRule::All,
            Visibility::Student => AudienceRule::Role(UserRole::Student),
            Visibility::Faculty => AudienceRule::Role(UserRole::Faculty),
        }
    }

    pub fn scope(&self) -> Scope {
        match self {
            AudienceRule::All => Scope::All,
            AudienceRule::Role(role) => (*role).into(),
        }
    }

    pub async fn resolve(&self, users: &dyn UserDirectory) -> Result<Vec<UserId>> {
        let records = match self {
            AudienceRule::All => users.all_users().await?,
            AudienceRule::Role(role) => users.users_with_role(*role).await?,
        };
        Ok(records.into_iter().map(|u| u.id).collect())
    }
}

impl FromStr for AudienceRule {
    type Err = BulletinError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "all" => Ok(AudienceRule::All),
            other => other.parse().map(AudienceRule::Role),
        }
    }
}

impl TryFrom<String> for AudienceRule {
    type Error = BulletinError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

/// Resolved target of one fan-out event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    Rule(AudienceRule),
    /// A single user, e.g. the author of a commented item
    User(UserId),
    /// Nobody; the event produces no notifications
    Nobody,
}

impl Audience {
    pub async fn resolve(&self, users: &dyn UserDirectory) -> Result<Vec<UserId>> {
        match self {
            Audience::Rule(rule) => rule.resolve(users).await,
            Audience::User(user) => Ok(vec![user.clone()]),
            Audience::Nobody => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryUserDirectory, UserRecord};

    fn user(id: &str, role: UserRole) -> UserRecord {
        UserRecord {
            id: id.into(),
            username: id.to_string(),
            role,
            is_admin: role == UserRole::Admin,
        }
    }

    #[tokio::test]
    async fn test_role_rule_selects_exact_role() {
        let dir = MemoryUserDirectory::with_users(vec![
            user("s1", UserRole::Student),
            user("s2", UserRole::Student),
            user("f1", UserRole::Faculty),
            user("a1", UserRole::Admin),
        ]);

        let mut students = AudienceRule::Role(UserRole::Student).resolve(&dir).await.unwrap();
        students.sort();
        assert_eq!(students, vec![UserId::from("s1"), UserId::from("s2")]);

        let everyone = AudienceRule::All.resolve(&dir).await.unwrap();
        assert_eq!(everyone.len(), 4);
    }

    #[test]
    fn test_parse_rule() {
        assert_eq!("all".parse::<AudienceRule>().unwrap(), AudienceRule::All);
        assert_eq!(
            "faculty".parse::<AudienceRule>().unwrap(),
            AudienceRule::Role(UserRole::Faculty)
        );
        assert!("everyone".parse::<AudienceRule>().is_err());
        assert_eq!(AudienceRule::Role(UserRole::Student).scope(), Scope::Student);
    }
}
