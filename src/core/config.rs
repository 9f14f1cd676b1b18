//! Bot configuration
//!
//! All settings come from environment variables (loaded from `.env` by the
//! binary) with documented defaults. Nothing here is required: an empty
//! environment yields a working dry-run configuration.
//!
//! - **Version**: 1.1.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 1.1.0: Added SEND_TIMEOUT_SECS and UTC_OFFSET_MINUTES
//! - 1.0.0: Initial configuration with tick interval and data dir

use anyhow::{anyhow, ensure, Result};
use chrono::FixedOffset;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

/// Runtime configuration for the reminder bot.
#[derive(Debug, Clone)]
pub struct Config {
    /// Log filter passed to env_logger (`LOG_LEVEL`, default `info`).
    pub log_level: String,
    /// Directory holding per-owner reminder files (`DATA_DIR`, default `data`).
    pub data_dir: String,
    /// Scheduler tick interval (`TICK_INTERVAL_SECS`, default 60 — the finest
    /// lead time is 30 minutes, so once per minute is plenty).
    pub tick_interval: Duration,
    /// Upper bound on a single delivery attempt (`SEND_TIMEOUT_SECS`, default 30).
    pub send_timeout: Duration,
    /// Country prefix used when normalizing phone digits (`COUNTRY_CODE`, default `1`).
    pub country_code: String,
    /// Offset of the configured locale from UTC (`UTC_OFFSET_MINUTES`, default 0).
    pub utc_offset: FixedOffset,
}

impl Config {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::build(|name| std::env::var(name).ok())
    }

    /// Builds a configuration from an arbitrary variable source.
    fn build(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let log_level = var("LOG_LEVEL").unwrap_or_else(|| "info".to_string());
        let data_dir = var("DATA_DIR").unwrap_or_else(|| "data".to_string());

        let tick_secs: u64 = parse_var(&var, "TICK_INTERVAL_SECS", 60)?;
        ensure!(tick_secs >= 1, "TICK_INTERVAL_SECS must be at least 1");

        let send_secs: u64 = parse_var(&var, "SEND_TIMEOUT_SECS", 30)?;
        ensure!(send_secs >= 1, "SEND_TIMEOUT_SECS must be at least 1");

        let country_code = var("COUNTRY_CODE").unwrap_or_else(|| "1".to_string());
        ensure!(
            !country_code.is_empty() && country_code.chars().all(|c| c.is_ascii_digit()),
            "COUNTRY_CODE must be a non-empty digit string"
        );

        let offset_minutes: i32 = parse_var(&var, "UTC_OFFSET_MINUTES", 0)?;
        let utc_offset = FixedOffset::east_opt(offset_minutes * 60)
            .ok_or_else(|| anyhow!("UTC_OFFSET_MINUTES out of range: {offset_minutes}"))?;

        Ok(Config {
            log_level,
            data_dir,
            tick_interval: Duration::from_secs(tick_secs),
            send_timeout: Duration::from_secs(send_secs),
            country_code,
            utc_offset,
        })
    }
}

fn parse_var<T>(var: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match var(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("invalid {name} value '{raw}': {e}")),
        None => Ok(default),
    }
}
