//! Configuration for Bulletin
//!
//! CLI arguments and environment variable handling using clap.

use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::time::Duration;

/// Minimum accepted length of the token verification secret
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Bulletin - campus news gateway
#[derive(Parser, Debug, Clone)]
#[command(name = "bulletin")]
#[command(about = "Role-scoped campus news with live notification fan-out")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:5000")]
    pub listen: SocketAddr,

    /// Enable development mode (in-memory fallback, built-in token secret)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "collegenews")]
    pub mongodb_db: String,

    /// Secret used to verify HS256 bearer tokens (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value = "text")]
    pub log_format: LogFormat,

    /// Maximum recipients dispatched concurrently per fan-out event
    #[arg(long, env = "FANOUT_CONCURRENCY", default_value = "32")]
    pub fanout_concurrency: usize,

    /// Upper bound on a single notification write, in milliseconds
    #[arg(long, env = "FANOUT_WRITE_TIMEOUT_MS", default_value = "5000")]
    pub fanout_write_timeout_ms: u64,

    /// Frames buffered per live channel before pushes are dropped
    #[arg(long, env = "PUSH_BUFFER", default_value = "64")]
    pub push_buffer: usize,

    /// Largest accepted request body
    #[arg(long, env = "MAX_BODY_BYTES", default_value = "65536")]
    pub max_body_bytes: usize,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

impl Args {
    /// Get effective JWT secret (uses a fixed fallback in dev mode)
    pub fn jwt_secret(&self) -> Option<String> {
        match (&self.jwt_secret, self.dev_mode) {
            (Some(secret), _) => Some(secret.clone()),
            (None, true) => Some("dev-only-insecure-secret-do-not-deploy-000".to_string()),
            (None, false) => None,
        }
    }

    pub fn fanout_write_timeout(&self) -> Duration {
        Duration::from_millis(self.fanout_write_timeout_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode {
            match &self.jwt_secret {
                None => return Err("JWT_SECRET is required in production mode".to_string()),
                Some(s) if s.len() < MIN_JWT_SECRET_LEN => {
                    return Err(format!(
                        "JWT_SECRET must be at least {} characters",
                        MIN_JWT_SECRET_LEN
                    ))
                }
                Some(_) => {}
            }
        }

        if self.fanout_concurrency == 0 {
            return Err("FANOUT_CONCURRENCY must be at least 1".to_string());
        }

        if self.push_buffer == 0 {
            return Err("PUSH_BUFFER must be at least 1".to_string());
        }

        if self.fanout_write_timeout_ms == 0 {
            return Err("FANOUT_WRITE_TIMEOUT_MS must be greater than zero".to_string());
        }

        Ok(())
    }

    /// Defaults suitable for tests and local runs
    pub fn dev() -> Self {
        Self::parse_from(["bulletin", "--dev-mode"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["bulletin"]);
        assert_eq!(args.listen.port(), 5000);
        assert_eq!(args.mongodb_db, "collegenews");
        assert_eq!(args.fanout_concurrency, 32);
        assert_eq!(args.push_buffer, 64);
        assert_eq!(args.log_format, LogFormat::Text);
    }

    #[test]
    fn test_production_requires_strong_secret() {
        let args = Args::parse_from(["bulletin"]);
        assert!(args.validate().is_err());

        let args = Args::parse_from(["bulletin", "--jwt-secret", "short"]);
        assert!(args.validate().is_err());

        let args = Args::parse_from([
            "bulletin",
            "--jwt-secret",
            "a-production-secret-of-sufficient-length",
        ]);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_dev_mode_has_fallback_secret() {
        let args = Args::dev();
        assert!(args.validate().is_ok());
        assert!(args.jwt_secret().is_some());
    }
}
