// Runtime configuration, read from environment variables (a `.env` file is
// loaded first by `main`).

use anyhow::{ensure, Context, Result};
use std::time::Duration;

/// Settings for the moderation service.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Address the HTTP server binds to
    pub bind_addr: String,
    /// Folder for runtime databases
    pub data_dir: String,
    /// sqlx connection string for the moderation database
    pub database_url: String,
    /// Requests allowed per client within one rate limit window
    pub rate_limit_max_requests: u32,
    /// Rate limit window length
    pub rate_limit_window: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_dir = "data".to_string();
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            database_url: default_database_url(&data_dir),
            data_dir,
            rate_limit_max_requests: 30,               // 30 requests...
            rate_limit_window: Duration::from_secs(60), // ...per minute
        }
    }
}

fn default_database_url(data_dir: &str) -> String {
    format!("sqlite://{}/moderation.db?mode=rwc", data_dir)
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let bind_addr = lookup("MODERATION_BIND_ADDR").unwrap_or(defaults.bind_addr);
        let data_dir = lookup("MODERATION_DATA_DIR").unwrap_or(defaults.data_dir);
        // Database follows the data dir unless overridden explicitly
        let database_url =
            lookup("MODERATION_DATABASE_URL").unwrap_or_else(|| default_database_url(&data_dir));

        let rate_limit_max_requests = match lookup("MODERATION_RATE_LIMIT_MAX") {
            Some(v) => v
                .trim()
                .parse::<u32>()
                .with_context(|| format!("MODERATION_RATE_LIMIT_MAX must be a number, got '{}'", v))?,
            None => defaults.rate_limit_max_requests,
        };

        let rate_limit_window = match lookup("MODERATION_RATE_LIMIT_WINDOW_SECS") {
            Some(v) => Duration::from_secs(v.trim().parse::<u64>().with_context(|| {
                format!(
                    "MODERATION_RATE_LIMIT_WINDOW_SECS must be a number, got '{}'",
                    v
                )
            })?),
            None => defaults.rate_limit_window,
        };
        // A zero window resets on every call and would never refuse anything
        ensure!(
            !rate_limit_window.is_zero(),
            "MODERATION_RATE_LIMIT_WINDOW_SECS must be at least 1"
        );

        Ok(Self {
            bind_addr,
            data_dir,
            database_url,
            rate_limit_max_requests,
            rate_limit_window,
        })
    }
}
