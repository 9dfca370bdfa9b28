// src/config.rs
use log::warn;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 3030;
pub const DEFAULT_STORE_PATH: &str = "data/snapshots.json";
pub const DEFAULT_QUOTE_PAGE_URL: &str = "https://tw.stock.yahoo.com/quote";
pub const DEFAULT_PRICE_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Error, PartialEq)]
#[error("{name} must be a positive number, got {value:?}")]
pub struct ConfigError {
    pub name: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub port: u16,
    pub store_path: PathBuf,
    pub quote_page_url: String,
    pub price_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = match lookup("PORT") {
            Some(value) => parse_positive("PORT", &value)?,
            None => {
                warn!("$PORT not set, defaulting to {}", DEFAULT_PORT);
                DEFAULT_PORT
            }
        };

        let timeout_secs = match lookup("PRICE_TIMEOUT_SECS") {
            Some(value) => parse_positive("PRICE_TIMEOUT_SECS", &value)?,
            None => DEFAULT_PRICE_TIMEOUT_SECS,
        };

        Ok(AppConfig {
            port,
            store_path: lookup("SNAPSHOT_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH)),
            quote_page_url: lookup("QUOTE_PAGE_URL")
                .unwrap_or_else(|| DEFAULT_QUOTE_PAGE_URL.to_string()),
            price_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn parse_positive<T>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    value
        .trim()
        .parse::<T>()
        .ok()
        .filter(|v| *v > T::default())
        .ok_or_else(|| ConfigError {
            name,
            value: value.to_string(),
        })
}
