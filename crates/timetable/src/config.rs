//! Application configuration, loaded from environment variables at startup.
//!
//! A `.env` file in the working directory is honoured outside of tests.

use crate::cache::CacheConfig;
use crate::scrape::{ScrapeConfig, TIMETABLE_URL};
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub db_path: String,
    pub webdriver_url: String,
    pub log_level: Level,
    /// Background sweep of cache entries older than this; `None` keeps everything
    pub cache_retention: Option<Duration>,
    pub scrape: ScrapeConfig,
    pub cache: CacheConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_address = parse_or(&lookup, "TIMETABLE_BIND_ADDRESS", "0.0.0.0:8080")?;
        let db_path =
            lookup("TIMETABLE_DB_PATH").unwrap_or_else(|| "timetable_cache.db".to_string());
        let webdriver_url = lookup("TIMETABLE_WEBDRIVER_URL")
            .unwrap_or_else(|| "http://127.0.0.1:4444".to_string());

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let max_weeks: usize = parse_or(&lookup, "TIMETABLE_MAX_WEEKS", "3")?;
        if max_weeks == 0 {
            return Err(ConfigError::InvalidValue(
                "TIMETABLE_MAX_WEEKS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let stop_after_empty_weeks: Option<usize> =
            parse_optional(&lookup, "TIMETABLE_STOP_AFTER_EMPTY_WEEKS")?;
        if stop_after_empty_weeks == Some(0) {
            return Err(ConfigError::InvalidValue(
                "TIMETABLE_STOP_AFTER_EMPTY_WEEKS".to_string(),
                "must be at least 1, or unset to read every week".to_string(),
            ));
        }
        let cache_retention = parse_optional::<u64, _>(&lookup, "TIMETABLE_CACHE_RETENTION_SECS")?
            .map(Duration::from_secs);

        let scrape = ScrapeConfig {
            timetable_url: lookup("TIMETABLE_URL").unwrap_or_else(|| TIMETABLE_URL.to_string()),
            max_weeks,
            stop_after_empty_weeks,
            ..Default::default()
        };

        Ok(Self {
            bind_address,
            db_path,
            webdriver_url,
            log_level,
            cache_retention,
            scrape,
            cache: CacheConfig::default(),
        })
    }
}

fn parse_or<T, F>(lookup: &F, name: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(name).unwrap_or_else(|| default.to_string());
    raw.parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string()))
}

fn parse_optional<T, F>(lookup: &F, name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .filter(|raw| !raw.trim().is_empty())
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string()))
        })
        .transpose()
}
