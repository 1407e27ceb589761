//! Health check endpoint
//!
//! `/health` and `/healthz` are unauthenticated liveness checks. They report
//! which storage backend is active and how many live channels are open.

use hyper::StatusCode;
use serde::Serialize;

use crate::notify::PresenceStats;
use crate::server::AppState;

use super::{json_response, ApiResponse};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: &'static str,
    /// Uptime in seconds
    pub uptime: u64,
    /// "mongodb" or "memory"
    pub backend: &'static str,
    pub dev_mode: bool,
    pub presence: PresenceStats,
    pub timestamp: String,
}

pub fn health_check(state: &AppState) -> ApiResponse {
    let response = HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION"),
        uptime: state.started_at.elapsed().as_secs(),
        backend: state.backend,
        dev_mode: state.args.dev_mode,
        presence: state.presence.stats(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    };
    json_response(StatusCode::OK, &response)
}
