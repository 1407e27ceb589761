//! Identifier newtypes
//!
//! User ids, content ids and live-push addressing keys are all strings on the
//! wire. Keeping them as distinct types stops a user id from being used where
//! an addressing key is expected (and vice versa).

use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::BulletinError;

/// Stored user identifier (issued by the identity collaborator)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

macro_rules! object_id_type {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Allocate a fresh id
            pub fn generate() -> Self {
                Self(ObjectId::new().to_hex())
            }

            /// Parse a client-supplied id. Anything that is not an ObjectId is rejected.
            pub fn parse(raw: &str) -> Result<Self, BulletinError> {
                ObjectId::parse_str(raw.trim())
                    .map(|oid| Self(oid.to_hex()))
                    .map_err(|_| {
                        BulletinError::BadRequest(format!("Invalid {} id: {}", $label, raw))
                    })
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn to_object_id(&self) -> ObjectId {
                // Only built through parse/generate/from_object_id, so always valid hex
                ObjectId::parse_str(&self.0).unwrap_or_else(|_| ObjectId::new())
            }

            pub fn from_object_id(oid: ObjectId) -> Self {
                Self(oid.to_hex())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

object_id_type!(
    /// Content item identifier, always a 24-character hex ObjectId
    ContentId,
    "news"
);

object_id_type!(
    /// Notification identifier
    NotificationId,
    "notification"
);

object_id_type!(
    /// Comment identifier
    CommentId,
    "comment"
);

/// Live-push address of a recipient
///
/// Derived from the user id but namespaced, so a change in the user id format
/// cannot collide with other kinds of channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelKey(String);

impl ChannelKey {
    const USER_PREFIX: &'static str = "user:";

    pub fn for_user(user: &UserId) -> Self {
        Self(format!("{}{}", Self::USER_PREFIX, user.as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_id_parse() {
        let id = ContentId::generate();
        assert_eq!(ContentId::parse(id.as_str()).unwrap(), id);
        assert!(ContentId::parse("not-an-object-id").is_err());
        assert!(ContentId::parse("").is_err());
    }

    #[test]
    fn test_channel_key_is_namespaced() {
        let user = UserId::new("65f0c0ffee0000000000abcd");
        let key = ChannelKey::for_user(&user);
        assert_eq!(key.as_str(), "user:65f0c0ffee0000000000abcd");
        assert_ne!(key.as_str(), user.as_str());
    }
}
