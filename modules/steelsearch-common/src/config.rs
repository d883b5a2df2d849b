use std::env;

use crate::error::SteelSearchError;

/// Remote session provider used when `STEEL_URL` is not set.
pub const DEFAULT_STEEL_URL: &str = "https://steel-browser-production-9a2a.up.railway.app";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    // Remote browser sessions
    pub steel_url: String,

    // Web server
    pub host: String,
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, SteelSearchError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup. Missing keys fall back
    /// to defaults; a malformed `PORT` is an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SteelSearchError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let steel_url = lookup("STEEL_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_STEEL_URL.to_string());

        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| SteelSearchError::Config(format!("PORT must be a number, got {raw:?}")))?,
            None => 8000,
        };

        Ok(Self {
            steel_url: steel_url.trim_end_matches('/').to_string(),
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
        })
    }
}
