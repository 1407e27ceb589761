//! Logging infrastructure for Bulletin
//!
//! A `tracing-subscriber` registry with an `EnvFilter` and either the human
//! readable or the JSON formatter. `RUST_LOG` wins over `LOG_LEVEL` when set.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogFormat;

/// Default filter directive for a given level
pub fn default_directive(log_level: &str) -> String {
    format!("bulletin={},info", log_level)
}

/// Install the global subscriber. Call once, early in `main`.
pub fn init(log_level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(log_level)));

    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .init(),
    }
}
