use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub gemini_api_key: String,
    pub port: u16,
    pub rust_log: String,
    /// Upper bound for the profile-update transaction, which may wait on the model.
    pub profile_tx_timeout_secs: u64,
    /// Cadence of the insight refresh job. 0 disables it.
    pub insight_refresh_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let require = |key: &str| {
            lookup(key).with_context(|| format!("Required environment variable '{key}' is not set"))
        };

        Ok(Config {
            database_url: require("DATABASE_URL")?,
            gemini_api_key: require("GEMINI_API_KEY")?,
            port: lookup("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            profile_tx_timeout_secs: lookup("PROFILE_TX_TIMEOUT_SECS")
                .unwrap_or_else(|| "60".to_string())
                .parse::<u64>()
                .context("PROFILE_TX_TIMEOUT_SECS must be a whole number of seconds")?,
            insight_refresh_interval_secs: lookup("INSIGHT_REFRESH_INTERVAL_SECS")
                .unwrap_or_else(|| "3600".to_string())
                .parse::<u64>()
                .context("INSIGHT_REFRESH_INTERVAL_SECS must be a whole number of seconds")?,
        })
    }

    pub fn profile_tx_timeout(&self) -> Duration {
        Duration::from_secs(self.profile_tx_timeout_secs)
    }
}
