//! Configuration management for the ticket lottery
//!
//! Deployment settings (admin, initial price and supply, epoch zero) and
//! logging settings, loaded from TOML with environment variable overrides.

use crate::common::types::{Amount, Identity, Timestamp, MUTEZ_PER_TEZ};
use crate::errors::{AppResult, ConfigurationError};
use crate::lottery::RoundState;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

pub const DEFAULT_ADMIN_LABEL: &str = "admin";
pub const DEFAULT_MAX_TICKETS: u64 = 5;

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LotteryConfig {
    pub deployment: DeploymentConfig,
    pub logging: LoggingConfig,
}

/// Values fixed once when the lottery is deployed
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentConfig {
    /// Admin account: a 64-char hex identity or an account label
    pub admin: String,
    pub ticket_cost: Amount,
    pub max_tickets: u64,
    pub epoch_zero: Timestamp,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            admin: DEFAULT_ADMIN_LABEL.to_string(),
            ticket_cost: MUTEZ_PER_TEZ,
            max_tickets: DEFAULT_MAX_TICKETS,
            epoch_zero: 0,
        }
    }
}

impl DeploymentConfig {
    pub fn admin_identity(&self) -> Result<Identity, ConfigurationError> {
        self.admin.parse().map_err(|_| ConfigurationError::MissingRequired("deployment.admin".to_string()))
    }

    /// Build the round state as it stands right after deployment
    pub fn initial_state(&self) -> AppResult<RoundState> {
        let admin = self.admin_identity()?;
        let state = RoundState::new(admin, self.ticket_cost, self.max_tickets)?;
        Ok(state.with_epoch_zero(self.epoch_zero))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter level when `RUST_LOG` is unset
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Configuration loader with environment variable support
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Load from file (or defaults), apply environment overrides, validate
    pub fn load(&self) -> Result<LotteryConfig, ConfigurationError> {
        let mut config = match self.config_path {
            Some(ref path) => self.load_from_file(path)?,
            None => LotteryConfig::default(),
        };

        self.apply_overrides(&mut config, |key| env::var(key).ok())?;
        self.validate(&config)?;

        Ok(config)
    }

    fn load_from_file(&self, path: &Path) -> Result<LotteryConfig, ConfigurationError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path.display(), e))
        })?;

        toml::from_str(&content)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to parse TOML: {}", e)))
    }

    /// Apply `LOTTERY_*` overrides using `lookup` to read variables
    pub fn apply_overrides<F>(&self, config: &mut LotteryConfig, lookup: F) -> Result<(), ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(admin) = lookup("LOTTERY_ADMIN") {
            config.deployment.admin = admin;
        }
        if let Some(cost) = lookup("LOTTERY_TICKET_COST") {
            config.deployment.ticket_cost = parse_number("LOTTERY_TICKET_COST", cost)?;
        }
        if let Some(max) = lookup("LOTTERY_MAX_TICKETS") {
            config.deployment.max_tickets = parse_number("LOTTERY_MAX_TICKETS", max)?;
        }
        if let Some(epoch) = lookup("LOTTERY_EPOCH_ZERO") {
            config.deployment.epoch_zero = parse_number("LOTTERY_EPOCH_ZERO", epoch)?;
        }
        if let Some(level) = lookup("LOTTERY_LOG_LEVEL") {
            config.logging.level = level;
        }

        Ok(())
    }

    pub fn validate(&self, config: &LotteryConfig) -> Result<(), ConfigurationError> {
        let admin = config.deployment.admin_identity()?;
        if admin.is_null() {
            return Err(ConfigurationError::InvalidValue {
                field: "deployment.admin".to_string(),
                value: config.deployment.admin.clone(),
                reason: "Admin identity cannot be null".to_string(),
            });
        }

        if config.deployment.max_tickets == 0 {
            return Err(ConfigurationError::InvalidValue {
                field: "deployment.max_tickets".to_string(),
                value: "0".to_string(),
                reason: "A round needs at least one ticket".to_string(),
            });
        }

        let level = config.logging.level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigurationError::InvalidValue {
                field: "logging.level".to_string(),
                value: config.logging.level.clone(),
                reason: format!("Expected one of {}", LOG_LEVELS.join(", ")),
            });
        }

        Ok(())
    }

    pub fn save<P: AsRef<Path>>(&self, config: &LotteryConfig, path: P) -> Result<(), ConfigurationError> {
        let path = path.as_ref();
        let toml_string = toml::to_string_pretty(config)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, toml_string).map_err(|e| {
            ConfigurationError::SaveFailed(format!("Failed to write to {}: {}", path.display(), e))
        })
    }
}

fn parse_number(field: &str, value: String) -> Result<u64, ConfigurationError> {
    value.trim().parse().map_err(|_| ConfigurationError::InvalidValue {
        field: field.to_string(),
        value,
        reason: "Expected a non-negative integer".to_string(),
    })
}

/// Write a configuration file holding the defaults
pub fn generate_sample_config<P: AsRef<Path>>(path: P) -> Result<(), ConfigurationError> {
    ConfigLoader::new().save(&LotteryConfig::default(), path)
}
