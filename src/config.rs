use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::lifecycle::{listen::DEFAULT_SEEK_TOLERANCE_SECONDS, scheduler::DEFAULT_TICK_INTERVAL};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Env(#[from] envy::Error),
    #[error("{0}")]
    Invalid(String),
}

/// Process configuration, read from environment variables of the same name in upper case.
#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    #[serde(default = "default_scheduler_interval_seconds")]
    pub scheduler_interval_seconds: u64,
    #[serde(default = "default_side_effect_queue_capacity")]
    pub side_effect_queue_capacity: usize,
    #[serde(default = "default_seek_tolerance_seconds")]
    pub seek_tolerance_seconds: f64,
    /// Prefix of deep links in notifications.
    #[serde(default)]
    pub app_base_path: String,
}

fn default_scheduler_interval_seconds() -> u64 {
    DEFAULT_TICK_INTERVAL.as_secs()
}

fn default_side_effect_queue_capacity() -> usize {
    128
}

fn default_seek_tolerance_seconds() -> f64 {
    DEFAULT_SEEK_TOLERANCE_SECONDS
}

impl AppConfig {
    pub fn from_env() -> Result<AppConfig, ConfigError> {
        Self::from_iter(std::env::vars())
    }

    pub fn from_iter(vars: impl Iterator<Item = (String, String)>) -> Result<AppConfig, ConfigError> {
        let config: AppConfig = envy::from_iter(vars)?;
        config.validate()?;
        Ok(config)
    }

    pub fn scheduler_interval(&self) -> Duration {
        Duration::from_secs(self.scheduler_interval_seconds)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database_url.trim().is_empty() {
            return Err(ConfigError::Invalid("DATABASE_URL must not be empty".to_string()));
        }

        if self.scheduler_interval_seconds == 0 {
            return Err(ConfigError::Invalid(
                "SCHEDULER_INTERVAL_SECONDS must be positive".to_string(),
            ));
        }

        if self.side_effect_queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "SIDE_EFFECT_QUEUE_CAPACITY must be positive".to_string(),
            ));
        }

        if !(self.seek_tolerance_seconds >= 0.0) {
            return Err(ConfigError::Invalid(
                "SEEK_TOLERANCE_SECONDS must not be negative".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::{AppConfig, ConfigError};

    fn vars(pairs: &[(&str, &str)]) -> impl Iterator<Item = (String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn defaults_fill_optional_values() {
        let config = AppConfig::from_iter(vars(&[("DATABASE_URL", "sqlite://league.db")])).unwrap();

        assert_eq!(config.database_url, "sqlite://league.db");
        assert_eq!(config.scheduler_interval_seconds, 60);
        assert_eq!(config.side_effect_queue_capacity, 128);
        assert_eq!(config.seek_tolerance_seconds, 1.5);
        assert_eq!(config.app_base_path, "");
    }

    #[test]
    fn values_can_be_overridden() {
        let config = AppConfig::from_iter(vars(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("SCHEDULER_INTERVAL_SECONDS", "5"),
            ("APP_BASE_PATH", "https://league.example"),
        ]))
        .unwrap();

        assert_eq!(config.scheduler_interval().as_secs(), 5);
        assert_eq!(config.app_base_path, "https://league.example");
    }

    #[test]
    fn missing_database_url_is_an_error() {
        assert!(matches!(
            AppConfig::from_iter(vars(&[])),
            Err(ConfigError::Env(_))
        ));
    }

    #[test]
    fn zero_interval_is_rejected() {
        assert!(matches!(
            AppConfig::from_iter(vars(&[
                ("DATABASE_URL", "sqlite::memory:"),
                ("SCHEDULER_INTERVAL_SECONDS", "0"),
            ])),
            Err(ConfigError::Invalid(_))
        ));
    }
}
