//! User document schema
//!
//! The `users` collection belongs to the identity service. Only the fields
//! needed for audience resolution are read; nothing is written.

use bson::{oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::IntoIndexes;
use crate::store::UserRecord;
use crate::types::{UserId, UserRole};

/// Collection name for users
pub const USER_COLLECTION: &str = "users";

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UserDoc {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub is_admin: bool,
}

impl From<UserDoc> for UserRecord {
    fn from(doc: UserDoc) -> Self {
        Self {
            id: UserId::new(doc.id.to_hex()),
            username: doc.username,
            role: doc.role,
            is_admin: doc.is_admin,
        }
    }
}

impl IntoIndexes for UserDoc {
    // Owned elsewhere; no indexes are created from here
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        Vec::new()
    }
}
