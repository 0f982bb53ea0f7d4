use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    /// `compact` (default) or `json`.
    pub log_format: String,
    /// Directory holding one JSON file per collection. In-memory storage when unset.
    pub data_dir: Option<PathBuf>,
    pub store_queue_size: usize,
    pub poll_interval: Duration,
    pub sos_search_limit: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        let poll_interval_ms: u64 = parse_or_default("POLL_INTERVAL_MS", 2_000)?;
        if poll_interval_ms == 0 {
            return Err(AppError::Internal(
                "invalid POLL_INTERVAL_MS: must be > 0".to_string(),
            ));
        }

        let store_queue_size: usize = parse_or_default("STORE_QUEUE_SIZE", 1024)?;
        if store_queue_size == 0 {
            return Err(AppError::Internal(
                "invalid STORE_QUEUE_SIZE: must be > 0".to_string(),
            ));
        }

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "compact".to_string()),
            data_dir: env::var("DATA_DIR")
                .ok()
                .filter(|raw| !raw.trim().is_empty())
                .map(PathBuf::from),
            store_queue_size,
            poll_interval: Duration::from_millis(poll_interval_ms),
            sos_search_limit: parse_or_default("SOS_SEARCH_LIMIT", 5)?,
        })
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
