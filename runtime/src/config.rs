//! Configuration management for Parkslot.
//!
//! Loads configuration from environment variables with sensible defaults.
//! Unset variables fall back to the default; a variable that is set but does
//! not parse is an error rather than a silent default.
//!
//! | Variable | Default |
//! |---|---|
//! | `PARKSLOT_MIN_LEAD_MINUTES` | `0` |
//! | `PARKSLOT_MAX_SELECTABLE_SLOTS` | `20` |
//! | `PARKSLOT_ALLOWED_DURATIONS` | `1,2,3,4,5,6,8,12,24` |
//! | `PARKSLOT_RECENT_LIMIT` | `3` |
//! | `PARKSLOT_LOG_LEVEL` | `info` |
//! | `PARKSLOT_METRICS_ADDR` | unset (no metrics endpoint) |
//!
//! # Example
//!
//! ```no_run
//! use parkslot_runtime::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env()?;
//! println!("Bookable durations: {:?}", config.booking.allowed_durations);
//! # Ok(())
//! # }
//! ```

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use thiserror::Error;

/// Environment variable for the minimum lead time, in minutes.
pub const MIN_LEAD_MINUTES_VAR: &str = "PARKSLOT_MIN_LEAD_MINUTES";
/// Environment variable for the selectable slot cap.
pub const MAX_SELECTABLE_SLOTS_VAR: &str = "PARKSLOT_MAX_SELECTABLE_SLOTS";
/// Environment variable for the comma-separated allowed durations, in hours.
pub const ALLOWED_DURATIONS_VAR: &str = "PARKSLOT_ALLOWED_DURATIONS";
/// Environment variable for the dashboard's recent history length.
pub const RECENT_LIMIT_VAR: &str = "PARKSLOT_RECENT_LIMIT";
/// Environment variable for the log filter.
pub const LOG_LEVEL_VAR: &str = "PARKSLOT_LOG_LEVEL";
/// Environment variable for the Prometheus endpoint address.
pub const METRICS_ADDR_VAR: &str = "PARKSLOT_METRICS_ADDR";

/// Durations offered by the booking form, in hours.
pub const DEFAULT_ALLOWED_DURATIONS: [u32; 9] = [1, 2, 3, 4, 5, 6, 8, 12, 24];

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable was set but could not be parsed
    #[error("Failed to parse {key}={value:?}: {reason}")]
    Parse {
        /// Variable name
        key: String,
        /// Raw value
        value: String,
        /// Parser message
        reason: String,
    },
    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    Validation(String),
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Booking form rules
    pub booking: BookingConfig,
    /// Dashboard presentation
    pub dashboard: DashboardConfig,
    /// Logging and metrics
    pub observability: ObservabilityConfig,
}

/// Client-side rules applied before a create reaches the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingConfig {
    /// How far in the future a booking must start, in minutes
    pub min_lead_minutes: u32,
    /// Upper bound on selectable slot numbers, regardless of lot size
    pub max_selectable_slots: u32,
    /// Durations a booking may have, in hours
    pub allowed_durations: Vec<u32>,
}

/// Dashboard presentation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Number of recent history entries to show
    pub recent_limit: usize,
}

/// Logging and metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log filter directive (trace, debug, info, warn, error, or an `EnvFilter` string)
    pub log_level: String,
    /// Prometheus endpoint address, `None` to disable
    pub metrics_addr: Option<SocketAddr>,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            min_lead_minutes: 0,
            max_selectable_slots: 20,
            allowed_durations: DEFAULT_ALLOWED_DURATIONS.to_vec(),
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self { recent_limit: 3 }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_addr: None,
        }
    }
}

impl BookingConfig {
    /// Minimum lead time as a duration
    #[must_use]
    pub fn min_lead_time(&self) -> Duration {
        Duration::minutes(i64::from(self.min_lead_minutes))
    }

    /// Whether `hours` is an offered duration
    #[must_use]
    pub fn allows_duration(&self, hours: u32) -> bool {
        self.allowed_durations.contains(&hours)
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if a variable is set to an unparsable
    /// value, or [`ConfigError::Validation`] if the result is inconsistent.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`Config::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let allowed_durations = match lookup(ALLOWED_DURATIONS_VAR) {
            Some(raw) => parse_list(ALLOWED_DURATIONS_VAR, &raw)?,
            None => defaults.booking.allowed_durations,
        };

        let metrics_addr: Option<SocketAddr> = match lookup(METRICS_ADDR_VAR) {
            Some(raw) if raw.trim().is_empty() => None,
            Some(raw) => Some(parse_value(METRICS_ADDR_VAR, &raw)?),
            None => None,
        };

        let config = Self {
            booking: BookingConfig {
                min_lead_minutes: parse_or(
                    &lookup,
                    MIN_LEAD_MINUTES_VAR,
                    defaults.booking.min_lead_minutes,
                )?,
                max_selectable_slots: parse_or(
                    &lookup,
                    MAX_SELECTABLE_SLOTS_VAR,
                    defaults.booking.max_selectable_slots,
                )?,
                allowed_durations,
            },
            dashboard: DashboardConfig {
                recent_limit: parse_or(&lookup, RECENT_LIMIT_VAR, defaults.dashboard.recent_limit)?,
            },
            observability: ObservabilityConfig {
                log_level: lookup(LOG_LEVEL_VAR).unwrap_or(defaults.observability.log_level),
                metrics_addr,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if any field is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.booking.max_selectable_slots == 0 {
            return Err(ConfigError::Validation(
                "max_selectable_slots must be > 0".to_string(),
            ));
        }
        if self.booking.allowed_durations.is_empty() {
            return Err(ConfigError::Validation(
                "allowed_durations cannot be empty".to_string(),
            ));
        }
        if self.booking.allowed_durations.contains(&0) {
            return Err(ConfigError::Validation(
                "allowed_durations must all be > 0".to_string(),
            ));
        }
        if self.observability.log_level.trim().is_empty() {
            return Err(ConfigError::Validation("log_level cannot be empty".to_string()));
        }
        Ok(())
    }

    /// Set the minimum lead time in minutes
    #[must_use]
    pub const fn with_min_lead_minutes(mut self, minutes: u32) -> Self {
        self.booking.min_lead_minutes = minutes;
        self
    }

    /// Set the selectable slot cap
    #[must_use]
    pub const fn with_max_selectable_slots(mut self, slots: u32) -> Self {
        self.booking.max_selectable_slots = slots;
        self
    }

    /// Set the allowed durations, in hours
    #[must_use]
    pub fn with_allowed_durations(mut self, hours: impl Into<Vec<u32>>) -> Self {
        self.booking.allowed_durations = hours.into();
        self
    }

    /// Set the number of recent history entries on the dashboard
    #[must_use]
    pub const fn with_recent_limit(mut self, limit: usize) -> Self {
        self.dashboard.recent_limit = limit;
        self
    }

    /// Set the Prometheus endpoint address
    #[must_use]
    pub const fn with_metrics_addr(mut self, addr: SocketAddr) -> Self {
        self.observability.metrics_addr = Some(addr);
        self
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Parse {
        key: key.to_string(),
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    lookup(key).map_or(Ok(default), |raw| parse_value(key, &raw))
}

fn parse_list(key: &str, raw: &str) -> Result<Vec<u32>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| parse_value(key, part))
        .collect()
}
