//! Database schemas for Bulletin
//!
//! MongoDB document structures for news, comments, notifications,
//! preferences and the (read-only) users collection.

pub mod comment;
pub mod news;
pub mod notification;
pub mod preferences;
pub mod user;

pub use comment::{CommentDoc, COMMENT_COLLECTION};
pub use news::{NewsDoc, NEWS_COLLECTION};
pub use notification::{NotificationDoc, NOTIFICATION_COLLECTION};
pub use preferences::{PreferencesDoc, PREFERENCES_COLLECTION};
pub use user::{UserDoc, USER_COLLECTION};
