//! Application configuration
//!
//! This module defines the primary configuration structures for the
//! lane-marshal coordinator, including environment variable loading and
//! validation.

use crate::error::Result;
use anyhow::anyhow;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub match_rules: MatchSettings,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSettings {
    /// Service name for logging
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Text channel name whose free-form messages carry match controls
    pub control_channel: String,
    /// Category under which lane voice rooms are provisioned
    pub lane_category: String,
}

/// Match timing rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchSettings {
    /// Match length applied when a start request carries no duration
    pub default_duration_seconds: u64,
    /// Lower bound for an explicitly requested duration
    pub min_duration_seconds: u64,
    /// Upper bound for an explicitly requested duration
    pub max_duration_seconds: u64,
    /// Interval between expiry sweeps
    pub sweep_interval_seconds: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "lane-marshal".to_string(),
            log_level: "info".to_string(),
            control_channel: "lane-assignment".to_string(),
            lane_category: "Lane Assignments".to_string(),
        }
    }
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            default_duration_seconds: 585, // 9 minutes 45 seconds
            min_duration_seconds: 1,
            max_duration_seconds: 1200,
            sweep_interval_seconds: 30,
        }
    }
}

impl MatchSettings {
    /// Resolve a requested duration: default when absent, clamped into the
    /// configured bounds when present
    pub fn resolve_duration(&self, requested_seconds: Option<u64>) -> Duration {
        let seconds = match requested_seconds {
            Some(s) => s.clamp(self.min_duration_seconds, self.max_duration_seconds),
            None => self.default_duration_seconds,
        };
        Duration::seconds(seconds as i64)
    }

    /// Get the sweep interval as a std Duration for tokio timers
    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweep_interval_seconds)
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            config.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            config.service.log_level = log_level;
        }
        if let Ok(channel) = env::var("CONTROL_CHANNEL") {
            config.service.control_channel = channel;
        }
        if let Ok(category) = env::var("LANE_CATEGORY") {
            config.service.lane_category = category;
        }

        // Match rules
        if let Ok(duration) = env::var("MATCH_DURATION_SECONDS") {
            config.match_rules.default_duration_seconds = duration
                .parse()
                .map_err(|_| anyhow!("Invalid MATCH_DURATION_SECONDS value: {}", duration))?;
        }
        if let Ok(min) = env::var("MIN_DURATION_SECONDS") {
            config.match_rules.min_duration_seconds = min
                .parse()
                .map_err(|_| anyhow!("Invalid MIN_DURATION_SECONDS value: {}", min))?;
        }
        if let Ok(max) = env::var("MAX_DURATION_SECONDS") {
            config.match_rules.max_duration_seconds = max
                .parse()
                .map_err(|_| anyhow!("Invalid MAX_DURATION_SECONDS value: {}", max))?;
        }
        if let Ok(sweep) = env::var("SWEEP_INTERVAL_SECONDS") {
            config.match_rules.sweep_interval_seconds = sweep
                .parse()
                .map_err(|_| anyhow!("Invalid SWEEP_INTERVAL_SECONDS value: {}", sweep))?;
        }

        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path.display(), e))?;
        let config: Self = toml::from_str(&contents)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path.display(), e))?;

        validate_config(&config)?;
        Ok(config)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.service.control_channel.is_empty() {
        return Err(anyhow!("Control channel name cannot be empty"));
    }
    if config.service.lane_category.is_empty() {
        return Err(anyhow!("Lane category name cannot be empty"));
    }

    // Validate match rules
    if config.match_rules.min_duration_seconds == 0 {
        return Err(anyhow!("Minimum match duration must be greater than 0"));
    }
    if config.match_rules.max_duration_seconds < config.match_rules.min_duration_seconds {
        return Err(anyhow!(
            "Maximum match duration must not be below the minimum"
        ));
    }
    if config.match_rules.default_duration_seconds < config.match_rules.min_duration_seconds
        || config.match_rules.default_duration_seconds > config.match_rules.max_duration_seconds
    {
        return Err(anyhow!(
            "Default match duration must fall within the configured bounds"
        ));
    }
    if config.match_rules.sweep_interval_seconds == 0 {
        return Err(anyhow!("Sweep interval must be greater than 0"));
    }

    Ok(())
}
