//! Bulletin - campus news gateway
//!
//! Serves role-scoped news listings, per-user engagement and archives, and
//! turns every authoring event into durable per-user notifications with
//! best-effort live delivery over websockets.
//!
//! ## Components
//!
//! - **News**: visibility filtering, engagement counters, archive toggles, authoring
//! - **Notify**: audience resolution, fan-out, presence registry, inbox read-state
//! - **Store**: storage ports with MongoDB and in-memory backends
//! - **Server**: hyper HTTP routes and the presence websocket

pub mod auth;
pub mod config;
pub mod db;
pub mod logging;
pub mod news;
pub mod notify;
pub mod routes;
pub mod server;
pub mod store;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{BulletinError, Result};
