//! Shared types for Bulletin

pub mod error;
pub mod ids;
pub mod roles;

pub use error::{BulletinError, Result};
pub use ids::{ChannelKey, CommentId, ContentId, NotificationId, UserId};
pub use roles::{Scope, UserRole, Visibility};
