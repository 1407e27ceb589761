//! Content items: model, visibility, engagement, archives and authoring

pub mod archive;
pub mod comment;
pub mod engagement;
pub mod model;
pub mod service;
pub mod visibility;

pub use archive::{ArchiveOutcome, ArchiveToggle};
pub use comment::{Comment, CommentDraft};
pub use engagement::{EngagementCounter, LikeOutcome, ViewOutcome};
pub use model::{Engaged, EngagementOp, NewsDraft, NewsEdit, NewsItem};
pub use service::Newsroom;
pub use visibility::{NewsFilter, NewsQuery, VisibilityFilter, ARCHIVE_SAFE_CATEGORIES};
