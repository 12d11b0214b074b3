//! Runtime configuration for the application services.
//!
//! Values come from the process environment (see [`AppConfig::from_env`]) or from a
//! JSON document deserialized by the host; both paths end in [`AppConfig::validate`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clock::parse_timezone;

pub const ENV_DEFAULT_TIMEZONE: &str = "AGENDA_DEFAULT_TIMEZONE";
pub const ENV_DOSE_LOG_HORIZON_DAYS: &str = "AGENDA_DOSE_LOG_HORIZON_DAYS";
pub const ENV_SHARE_LINK_MAX_TTL_HOURS: &str = "AGENDA_SHARE_LINK_MAX_TTL_HOURS";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Timezone assumed when a caller supplies none.
    pub default_timezone: String,
    /// How far ahead `GerarDoseLogs` materializes doses when no window is given.
    pub dose_log_horizon_days: u32,
    /// Longest lifetime a newly issued share link may have.
    pub share_link_max_ttl_hours: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_timezone: "America/Sao_Paulo".to_string(),
            dose_log_horizon_days: 7,
            share_link_max_ttl_hours: 24 * 30,
        }
    }
}

impl AppConfig {
    /// Load from `AGENDA_*` environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup (environment, test map...).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let config = Self {
            default_timezone: lookup(ENV_DEFAULT_TIMEZONE)
                .map(|tz| tz.trim().to_string())
                .unwrap_or(defaults.default_timezone),
            dose_log_horizon_days: parse_u32(
                &lookup,
                ENV_DOSE_LOG_HORIZON_DAYS,
                defaults.dose_log_horizon_days,
            )?,
            share_link_max_ttl_hours: parse_u32(
                &lookup,
                ENV_SHARE_LINK_MAX_TTL_HOURS,
                defaults.share_link_max_ttl_hours,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        parse_timezone(&self.default_timezone)
            .map_err(|e| ConfigError::invalid(ENV_DEFAULT_TIMEZONE, e.to_string()))?;
        if self.dose_log_horizon_days == 0 {
            return Err(ConfigError::invalid(ENV_DOSE_LOG_HORIZON_DAYS, "must be greater than zero"));
        }
        if self.share_link_max_ttl_hours == 0 {
            return Err(ConfigError::invalid(
                ENV_SHARE_LINK_MAX_TTL_HOURS,
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

fn parse_u32(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: u32,
) -> Result<u32, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<u32>()
            .map_err(|e| ConfigError::invalid(key, format!("'{raw}': {e}"))),
    }
}
