use std::{fmt::Display, str::FromStr};

use anyhow::{Context, anyhow};
use tracing::{info, warn};

pub struct Config {
    pub database_url: String,
    pub bind_address: String,
    pub max_connections: u32,
    pub session_minutes: i64,
    pub firebase_api_key: String,
}

impl Config {
    /// Reads the process environment, falling back to a `.env` file.
    pub fn load() -> anyhow::Result<Self> {
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        Ok(Self {
            database_url: try_load(&lookup, "DATABASE_URL", "sqlite://quotes.db?mode=rwc")?,
            bind_address: try_load(&lookup, "BIND_ADDRESS", "0.0.0.0:8080")?,
            max_connections: try_load(&lookup, "MAX_CONNECTIONS", "16")?,
            session_minutes: try_load(&lookup, "SESSION_MINUTES", "5")?,
            firebase_api_key: lookup("FIREBASE_API_KEY")
                .ok_or_else(|| anyhow!("FIREBASE_API_KEY is required"))?,
        })
    }
}

fn try_load<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> anyhow::Result<T>
where
    T::Err: Display,
{
    let raw = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse()
        .map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");
            anyhow!("{e}")
        })
        .with_context(|| format!("parsing {key}={raw:?}"))
}
