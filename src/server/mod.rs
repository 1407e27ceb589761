//! HTTP and websocket server

pub mod http;
pub mod websocket;

pub use http::{run, AppState, Stores};
