// 9.0 config.rs: all settings in one place. engine limits, market defaults, logging.
// 9.1 has the environment presets, 9.2 loading and validation.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing_subscriber::{fmt, EnvFilter};

use crate::engine::EngineConfig;
use crate::fixed::Fixed;
use crate::types::Bps;
use rust_decimal_macros::dec;

// Complete configuration for the engine and the binary around it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub environment: Environment,
    pub engine: EngineConfig,
    pub logging: LoggingConfig,
}

/** 9.0.1: log level and output format. RUST_LOG overrides the level */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    // EnvFilter directive, e.g. "info" or "binary_amm=debug"
    pub level: String,
    // "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}

impl LoggingConfig {
    // Install the global tracing subscriber
    pub fn init(&self) -> Result<(), ConfigError> {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));

        let installed = match self.format.as_str() {
            "json" => fmt().json().with_env_filter(filter).try_init(),
            _ => fmt().with_env_filter(filter).try_init(),
        };
        installed.map_err(|e| ConfigError::Logging {
            reason: e.to_string(),
        })
    }
}

impl Settings {
    // 9.1: local runs. no fee, verbose logs.
    pub fn development() -> Self {
        let mut settings = Self::default();
        settings.logging.level = "debug".into();
        settings
    }

    // Testnet: small markets, nominal fee
    pub fn testnet() -> Self {
        let mut settings = Self {
            environment: Environment::Testnet,
            ..Self::default()
        };
        settings.engine.max_initial_liquidity = Fixed::from_int(1_000_000);
        settings.engine.market_defaults.fee = Bps::new(10); // 0.1%
        settings
    }

    // Mainnet: fee on, wider probability floor, machine-readable logs
    pub fn mainnet() -> Self {
        let mut settings = Self {
            environment: Environment::Mainnet,
            ..Self::default()
        };
        settings.engine.max_events = 1_000_000;
        settings.engine.market_defaults.fee = Bps::new(50); // 0.5%
        settings.engine.market_defaults.probability_floor = dec!(0.001);
        settings.logging.format = "json".into();
        settings
    }

    // 9.2: internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.max_events == 0 {
            return Err(ConfigError::InvalidEngine {
                reason: "max_events must be at least 1".to_string(),
            });
        }
        if self.engine.remember_intents && self.engine.max_intents == 0 {
            return Err(ConfigError::InvalidEngine {
                reason: "max_intents must be at least 1 when intents are remembered".to_string(),
            });
        }
        if !self.engine.max_initial_liquidity.is_positive() {
            return Err(ConfigError::InvalidEngine {
                reason: "max_initial_liquidity must be positive".to_string(),
            });
        }

        self.engine
            .market_defaults
            .validate()
            .map_err(|e| ConfigError::InvalidMarket {
                reason: e.to_string(),
            })?;

        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::InvalidLogging {
                reason: "level must not be empty".to_string(),
            });
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(ConfigError::InvalidLogging {
                reason: format!("unknown format {:?}", self.logging.format),
            });
        }

        Ok(())
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let settings: Self = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadFile(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid engine config: {reason}")]
    InvalidEngine { reason: String },

    #[error("invalid market defaults: {reason}")]
    InvalidMarket { reason: String },

    #[error("invalid logging config: {reason}")]
    InvalidLogging { reason: String },

    #[error("failed to install logger: {reason}")]
    Logging { reason: String },
}

// Environment presets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    #[default]
    Development,
    Testnet,
    Mainnet,
}

impl Environment {
    pub fn settings(&self) -> Settings {
        match self {
            Environment::Development => Settings::development(),
            Environment::Testnet => Settings::testnet(),
            Environment::Mainnet => Settings::mainnet(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn test_environment_presets() {
        assert!(Environment::Development.settings().validate().is_ok());
        assert!(Environment::Testnet.settings().validate().is_ok());
        assert!(Environment::Mainnet.settings().validate().is_ok());
        assert_eq!(Environment::Mainnet.settings().engine.market_defaults.fee, Bps::new(50));
        assert_eq!(Environment::Testnet.settings().environment, Environment::Testnet);
    }

    #[test]
    fn test_invalid_engine() {
        let mut settings = Settings::default();
        settings.engine.max_events = 0;
        assert!(matches!(settings.validate(), Err(ConfigError::InvalidEngine { .. })));

        let mut settings = Settings::default();
        settings.engine.max_intents = 0;
        assert!(matches!(settings.validate(), Err(ConfigError::InvalidEngine { .. })));
        settings.engine.remember_intents = false;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_invalid_market_defaults() {
        let mut settings = Settings::default();
        settings.engine.market_defaults.probability_floor = dec!(0);
        assert!(matches!(settings.validate(), Err(ConfigError::InvalidMarket { .. })));
    }

    #[test]
    fn test_invalid_logging_format() {
        let mut settings = Settings::default();
        settings.logging.format = "xml".into();
        assert!(matches!(settings.validate(), Err(ConfigError::InvalidLogging { .. })));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let settings = Settings::from_toml_str(
            r#"
            environment = "testnet"

            [engine]
            max_events = 500
            max_initial_liquidity = "250000"

            [engine.market_defaults]
            fee = 25
            probability_floor = "0.002"

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(settings.environment, Environment::Testnet);
        assert_eq!(settings.engine.max_events, 500);
        assert_eq!(settings.engine.max_initial_liquidity, Fixed::from_int(250_000));
        assert!(settings.engine.remember_intents);
        assert_eq!(settings.engine.max_intents, 10_000);
        assert_eq!(settings.engine.market_defaults.fee, Bps::new(25));
        assert_eq!(settings.engine.market_defaults.probability_floor, dec!(0.002));
        assert_eq!(settings.logging.level, "info");
        assert_eq!(settings.logging.format, "json");
    }

    #[test]
    fn test_bad_toml_is_parse_error() {
        let result = Settings::from_toml_str("[engine\nmax_events = 1");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = Settings::load("/definitely/not/here/settings.toml");
        assert!(matches!(result, Err(ConfigError::ReadFile(_))));
    }

    #[test]
    fn test_settings_serialization() {
        let settings = Settings::mainnet();
        let json = serde_json::to_string(&settings).unwrap();
        let back: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, settings);
    }
}
