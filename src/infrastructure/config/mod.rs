//! Configuration management

use std::path::PathBuf;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::application::errors::ConfigError;

/// Bot configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub server: ServerConfig,
    pub bot: BotConfig,
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ServerConfig {
    pub listen_host: String,
    pub listen_port: u16,
    /// Base URL of the gateway's HTTP API.
    pub post_url: String,
    pub access_token: String,
    pub log_level: String,
    /// Watch gateway heartbeat meta-events and warn on expiry.
    pub heartbeat_watch: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct BotConfig {
    pub name: String,
    /// Command prefix; must be exactly one character.
    pub prefix: String,
    pub data_dir: PathBuf,
    /// Operator accounts receiving error reports.
    pub admin_users: Vec<i64>,
    pub admin_groups: Vec<i64>,
    /// Literal payloads dropped before any processing.
    pub blocked_payloads: Vec<String>,
    /// The gateway's local clock as hours east of UTC.
    pub timezone_offset_hours: i32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ScheduleConfig {
    /// Ticks between wholesale reloads of the schedule maps.
    pub reload_ticks: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                listen_host: "127.0.0.1".to_string(),
                listen_port: 8000,
                post_url: "http://127.0.0.1:8001/".to_string(),
                access_token: String::new(),
                log_level: "info".to_string(),
                heartbeat_watch: true,
            },
            bot: BotConfig {
                name: "tanuki-bot".to_string(),
                prefix: ".".to_string(),
                data_dir: PathBuf::from("./data"),
                admin_users: Vec::new(),
                admin_groups: Vec::new(),
                blocked_payloads: Vec::new(),
                timezone_offset_hours: 8,
            },
            schedule: ScheduleConfig { reload_ticks: 15 },
        }
    }
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: impl Into<PathBuf>) -> Result<(), ConfigError> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| ConfigError::Parse(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path.into(), content)?;
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.bot.prefix.chars().count() != 1 {
            return Err(ConfigError::InvalidValue(format!(
                "prefix must be a single character, got {:?}",
                self.bot.prefix
            )));
        }
        if self.schedule.reload_ticks < 1 {
            return Err(ConfigError::InvalidValue(
                "reload-ticks must be at least 1".to_string(),
            ));
        }
        if self.utc_offset().is_none() {
            return Err(ConfigError::InvalidValue(format!(
                "timezone-offset-hours out of range: {}",
                self.bot.timezone_offset_hours
            )));
        }
        Ok(())
    }

    /// The validated single prefix character.
    pub fn prefix_char(&self) -> char {
        self.bot.prefix.chars().next().unwrap_or('.')
    }

    pub fn utc_offset(&self) -> Option<FixedOffset> {
        FixedOffset::east_opt(self.bot.timezone_offset_hours * 3600)
    }
}
