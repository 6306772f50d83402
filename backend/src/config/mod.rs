//! Configuration module for the video request backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Key guarding the admin endpoints (status update, delete)
    pub admin_key: Option<String>,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit logs as JSON lines instead of the human readable format
    pub log_json: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AddrParseError> {
        dotenvy::dotenv().ok();

        let admin_key = env::var("VIDREQ_ADMIN_KEY")
            .ok()
            .filter(|key| !key.is_empty());

        let db_path = env::var("VIDREQ_DB_PATH")
            .unwrap_or_else(|_| "./data/video-requests.sqlite".to_string())
            .into();

        let bind_addr = env::var("VIDREQ_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:7777".to_string())
            .parse()?;

        let log_level = env::var("VIDREQ_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let log_json = env::var("VIDREQ_LOG_JSON")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            admin_key,
            db_path,
            bind_addr,
            log_level,
            log_json,
        })
    }
}
