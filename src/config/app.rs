//! Main application configuration
//!
//! This module defines the primary configuration structures for the
//! rally-point league service, including environment variable loading,
//! TOML file loading, and validation.

use crate::config::{GroupingConfig, RatingConfig};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub service: ServiceSettings,
    #[serde(default)]
    pub rating: RatingConfig,
    #[serde(default)]
    pub grouping: GroupingConfig,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Port for the health and metrics endpoints
    pub http_port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "rally-point".to_string(),
            log_level: "info".to_string(),
            http_port: 8080,
            shutdown_timeout_seconds: 30,
        }
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
        if let Ok(port) = env::var("HTTP_PORT") {
            config.service.http_port = port
                .parse()
                .map_err(|_| anyhow!("Invalid HTTP_PORT value: {}", port))?;
        }
        if let Ok(timeout) = env::var("SHUTDOWN_TIMEOUT_SECONDS") {
            config.service.shutdown_timeout_seconds = timeout
                .parse()
                .map_err(|_| anyhow!("Invalid SHUTDOWN_TIMEOUT_SECONDS value: {}", timeout))?;
        }

        // Rating settings
        if let Ok(k_factor) = env::var("ELO_K_FACTOR") {
            config.rating.k_factor = k_factor
                .parse()
                .map_err(|_| anyhow!("Invalid ELO_K_FACTOR value: {}", k_factor))?;
        }
        if let Ok(floor) = env::var("RATING_FLOOR") {
            config.rating.rating_floor = floor
                .parse()
                .map_err(|_| anyhow!("Invalid RATING_FLOOR value: {}", floor))?;
        }
        if let Ok(initial) = env::var("INITIAL_RATING") {
            config.rating.initial_rating = initial
                .parse()
                .map_err(|_| anyhow!("Invalid INITIAL_RATING value: {}", initial))?;
        }
        if let Ok(max_score) = env::var("MAX_SCORE") {
            config.rating.max_score = max_score
                .parse()
                .map_err(|_| anyhow!("Invalid MAX_SCORE value: {}", max_score))?;
        }

        // Grouping settings
        if let Ok(strategy) = env::var("GROUPING_STRATEGY") {
            config.grouping.strategy = strategy
                .parse()
                .map_err(|_| anyhow!("Invalid GROUPING_STRATEGY value: {}", strategy))?;
        }

        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        validate_config(&config)?;
        Ok(config)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    // Validate ports
    if config.service.http_port == 0 {
        return Err(anyhow!("HTTP port cannot be 0"));
    }

    // Validate timeouts
    if config.service.shutdown_timeout_seconds == 0 {
        return Err(anyhow!("Shutdown timeout must be greater than 0"));
    }

    // Validate rating settings
    if config.rating.k_factor <= 0.0 {
        return Err(anyhow!("K-factor must be positive"));
    }
    if config.rating.margin_cap <= 0 {
        return Err(anyhow!("Margin cap must be positive"));
    }
    if config.rating.margin_bonus < 0.0 {
        return Err(anyhow!("Margin bonus must be non-negative"));
    }
    if config.rating.rating_floor < 0 {
        return Err(anyhow!("Rating floor must be non-negative"));
    }
    if config.rating.initial_rating < config.rating.rating_floor {
        return Err(anyhow!(
            "Initial rating {} is below the rating floor {}",
            config.rating.initial_rating,
            config.rating.rating_floor
        ));
    }
    if config.rating.max_score <= 0 {
        return Err(anyhow!("Max score must be positive"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouping::GroupingStrategy;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_ok());

        assert_eq!(config.service.name, "rally-point");
        assert_eq!(config.rating.rating_floor, 100);
        assert_eq!(config.rating.initial_rating, 1000);
        assert_eq!(config.grouping.strategy, GroupingStrategy::RatingBands);
    }

    #[test]
    fn test_validation_catches_bad_values() {
        let mut config = AppConfig::default();
        config.rating.k_factor = -1.0;
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.rating.initial_rating = 50; // below the floor
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.service.log_level = "verbose".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let toml = r#"
            [service]
            name = "rally-point-test"
            log_level = "debug"
            http_port = 9090
            shutdown_timeout_seconds = 10

            [rating]
            k_factor = 32.0
            margin_cap = 15
            margin_bonus = 0.5
            rating_floor = 100
            initial_rating = 1200
            max_score = 21

            [grouping]
            strategy = "snake_draft"
        "#;

        let config: AppConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.service.http_port, 9090);
        assert_eq!(config.rating.k_factor, 32.0);
        assert_eq!(config.grouping.strategy, GroupingStrategy::SnakeDraft);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AppConfig = toml::from_str("[service]\nname = \"x\"\nlog_level = \"info\"\nhttp_port = 8080\nshutdown_timeout_seconds = 30\n").unwrap();
        assert_eq!(config.rating.initial_rating, 1000);
    }
}
