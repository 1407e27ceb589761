//! Notifications: audience resolution, fan-out, live presence and read-state

pub mod audience;
pub mod fanout;
pub mod inbox;
pub mod model;
pub mod presence;

pub use audience::{Audience, AudienceRule};
pub use fanout::{FanoutConfig, FanoutEngine, FanoutEvent, FanoutReport};
pub use inbox::Inbox;
pub use model::{ClientFrame, Notification, NotificationMessage, ServerFrame};
pub use presence::{ChannelId, LiveDelivery, PresenceRegistry, PresenceStats};
