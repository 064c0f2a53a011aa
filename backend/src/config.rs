//! Configuration management for the medicine inventory server
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (config/development.toml, config/production.toml)
//! 3. Environment variable overrides with MEDSTORE_ prefix

use std::path::PathBuf;
use std::time::Duration;

use config::{ConfigError, Environment, File};
use serde::Deserialize;
use shared::DayEndSchedule;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Where ledgers are persisted
    pub storage: StorageConfig,

    /// Where spreadsheet exports are written
    pub export: ExportConfig,

    /// Automatic day-end timing
    pub day_end: DayEndConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Directory holding one file per storage key
    pub data_dir: PathBuf,

    /// Optional cap on the total bytes stored
    pub quota_bytes: Option<usize>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExportConfig {
    /// Directory receiving `Medicine_Inventory_<date>.xlsx` files
    pub output_dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DayEndConfig {
    /// Seconds between day boundary checks
    pub poll_interval_secs: u64,

    /// Wall-clock hour of the automatic day-end
    pub trigger_hour: u32,

    /// Wall-clock minute of the automatic day-end
    pub trigger_minute: u32,

    /// Delay before in-memory state is reloaded after an automatic day-end
    pub reload_delay_ms: u64,
}

impl DayEndConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn reload_delay(&self) -> Duration {
        Duration::from_millis(self.reload_delay_ms)
    }

    pub fn schedule(&self) -> DayEndSchedule {
        DayEndSchedule {
            hour: self.trigger_hour,
            minute: self.trigger_minute,
        }
    }
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("MEDSTORE_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "127.0.0.1")?
            .set_default("storage.data_dir", "data")?
            .set_default("export.output_dir", "exports")?
            .set_default("day_end.poll_interval_secs", 60)?
            .set_default("day_end.trigger_hour", 0)?
            .set_default("day_end.trigger_minute", 1)?
            .set_default("day_end.reload_delay_ms", 2000)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (MEDSTORE_ prefix)
            .add_source(
                Environment::with_prefix("MEDSTORE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.day_end.trigger_hour > 23 || self.day_end.trigger_minute > 59 {
            return Err(ConfigError::Message(format!(
                "day_end trigger {:02}:{:02} is not a valid time of day",
                self.day_end.trigger_hour, self.day_end.trigger_minute
            )));
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "127.0.0.1".to_string(),
        }
    }
}

impl Default for DayEndConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 60,
            trigger_hour: 0,
            trigger_minute: 1,
            reload_delay_ms: 2000,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            server: ServerConfig::default(),
            storage: StorageConfig {
                data_dir: PathBuf::from("data"),
                quota_bytes: None,
            },
            export: ExportConfig {
                output_dir: PathBuf::from("exports"),
            },
            day_end: DayEndConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schedule_is_one_minute_past_midnight() {
        let config = Config::default();
        assert_eq!(config.day_end.schedule(), DayEndSchedule { hour: 0, minute: 1 });
        assert_eq!(config.day_end.poll_interval(), Duration::from_secs(60));
    }

    #[test]
    fn rejects_impossible_trigger_time() {
        let mut config = Config::default();
        config.day_end.trigger_minute = 75;
        assert!(config.validate().is_err());
    }
}
