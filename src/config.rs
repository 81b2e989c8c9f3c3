use anyhow::{Context, anyhow, bail};
use dotenvy::dotenv;
use std::env;
use std::fmt::Display;
use std::str::FromStr;

use crate::analytics::service::AnalyticsSettings;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_addr: String,
    pub database_url: String,
    pub api_prefix: String,
    pub log_dir: String,

    // Rate limiting
    pub rate_analytics_per_min: u32,
    pub rate_export_per_min: u32,

    // Analytics defaults
    pub standard_hours_per_day: f64,
    pub overtime_threshold_hours: f64,
    pub consecutive_threshold: usize,
    pub late_grace_minutes: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();
        Self::from_vars(|key| env::var(key).ok())
    }

    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let required = |key: &str| lookup(key).with_context(|| format!("{key} must be set"));

        let config = Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            api_prefix: lookup("API_PREFIX").unwrap_or_else(|| "/api".to_string()),
            log_dir: lookup("LOG_DIR").unwrap_or_else(|| "logs".to_string()),

            rate_analytics_per_min: parse_or(&lookup, "RATE_ANALYTICS_PER_MIN", 600)?,
            rate_export_per_min: parse_or(&lookup, "RATE_EXPORT_PER_MIN", 30)?,

            standard_hours_per_day: parse_or(&lookup, "STANDARD_HOURS_PER_DAY", 8.0)?,
            overtime_threshold_hours: parse_or(&lookup, "OVERTIME_THRESHOLD_HOURS", 10.0)?,
            consecutive_threshold: parse_or(&lookup, "CONSECUTIVE_THRESHOLD", 3)?,
            late_grace_minutes: parse_or(&lookup, "LATE_GRACE_MINUTES", 0)?,
        };

        if !config.standard_hours_per_day.is_finite() || config.standard_hours_per_day < 0.0 {
            bail!("STANDARD_HOURS_PER_DAY must be a non-negative number");
        }
        if !config.overtime_threshold_hours.is_finite() || config.overtime_threshold_hours < 0.0 {
            bail!("OVERTIME_THRESHOLD_HOURS must be a non-negative number");
        }
        if config.consecutive_threshold == 0 {
            bail!("CONSECUTIVE_THRESHOLD must be at least 1");
        }

        Ok(config)
    }

    pub fn analytics_settings(&self) -> AnalyticsSettings {
        AnalyticsSettings {
            standard_hours_per_day: self.standard_hours_per_day,
            overtime_threshold_hours: self.overtime_threshold_hours,
            consecutive_threshold: self.consecutive_threshold,
            late_grace_minutes: self.late_grace_minutes,
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{key} has invalid value {raw:?}: {e}")),
        None => Ok(default),
    }
}
