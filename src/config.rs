//! Application configuration loaded from environment variables.
//!
//! In production the secrets (`JWT_SIGNING_KEY`, `APP_PASSWORD`) are injected
//! as environment variables by the deployment; locally they come from `.env`.

use sha2::{Digest, Sha256};
use std::env;

use crate::services::alerts::DEFAULT_LOOK_AHEAD_DAYS;

/// Longest look-ahead window accepted from configuration or queries.
pub const MAX_LOOK_AHEAD_DAYS: u32 = 365;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Frontend URL (allowed CORS origin)
    pub frontend_url: String,
    /// GCP project ID hosting Firestore
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Days ahead a date threshold starts raising an alert
    pub alert_look_ahead_days: u32,

    // --- Secrets ---
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// Operator login name
    pub app_username: String,
    /// SHA-256 of the operator password (the clear password is not kept)
    pub app_password_sha256: [u8; 32],
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let alert_look_ahead_days = match env::var("ALERT_LOOK_AHEAD_DAYS") {
            Ok(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|days| *days <= MAX_LOOK_AHEAD_DAYS)
                .ok_or(ConfigError::Invalid("ALERT_LOOK_AHEAD_DAYS"))?,
            Err(_) => DEFAULT_LOOK_AHEAD_DAYS,
        };

        let password = env::var("APP_PASSWORD").map_err(|_| ConfigError::Missing("APP_PASSWORD"))?;

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            alert_look_ahead_days,
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            app_username: env::var("APP_USERNAME")
                .map(|v| v.trim().to_string())
                .unwrap_or_else(|_| "ferme".to_string()),
            app_password_sha256: password_digest(password.trim()),
        })
    }

    /// Config for tests (username `ferme`, password `test_password`).
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            alert_look_ahead_days: DEFAULT_LOOK_AHEAD_DAYS,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            app_username: "ferme".to_string(),
            app_password_sha256: password_digest("test_password"),
        }
    }
}

/// SHA-256 digest of a password, compared in constant time at login.
pub fn password_digest(password: &str) -> [u8; 32] {
    Sha256::digest(password.as_bytes()).into()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
