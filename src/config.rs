use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

/// Ten years.
const MAX_SESSION_TTL_MINUTES: i64 = 60 * 24 * 365 * 10;

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub ttl_minutes: i64,
    pub cookie_name: String,
    pub cookie_secure: bool,
    pub purge_interval_secs: u64,
}

impl SessionConfig {
    pub fn ttl(&self) -> time::Duration {
        time::Duration::minutes(self.ttl_minutes)
    }

    pub fn purge_interval(&self) -> Duration {
        Duration::from_secs(self.purge_interval_secs)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            (1..=MAX_SESSION_TTL_MINUTES).contains(&self.ttl_minutes),
            "SESSION_TTL_MINUTES must be between 1 and {MAX_SESSION_TTL_MINUTES}"
        );
        anyhow::ensure!(
            self.purge_interval_secs > 0,
            "SESSION_PURGE_INTERVAL_SECS must be positive"
        );
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: 60 * 24 * 7,
            cookie_name: "anime_cards_sid".into(),
            cookie_secure: false,
            purge_interval_secs: 15 * 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub session: SessionConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let defaults = SessionConfig::default();
        let session = SessionConfig {
            ttl_minutes: env_parse("SESSION_TTL_MINUTES").unwrap_or(defaults.ttl_minutes),
            cookie_name: std::env::var("SESSION_COOKIE_NAME").unwrap_or(defaults.cookie_name),
            cookie_secure: env_parse("SESSION_COOKIE_SECURE").unwrap_or(defaults.cookie_secure),
            purge_interval_secs: env_parse("SESSION_PURGE_INTERVAL_SECS")
                .unwrap_or(defaults.purge_interval_secs),
        };
        session.validate()?;

        Ok(Self {
            database_url,
            max_connections: env_parse("DATABASE_MAX_CONNECTIONS").unwrap_or(10),
            session,
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}
