//! Engine configuration.
//!
//! Everything the host decides about a strategy instance that is not a
//! strategy parameter: which instrument it trades, the base order volume,
//! stop behaviour and price rounding. Stored as TOML.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize config TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

fn default_instrument() -> String {
    "SIM".to_string()
}

fn default_volume() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_protection_atr_length() -> usize {
    14
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Instrument the strategy trades; subscriptions default to it.
    #[serde(default = "default_instrument")]
    pub instrument: String,

    /// Base order volume (`Volume` in strategy terms).
    #[serde(default = "default_volume")]
    pub volume: f64,

    /// Close any open position when the strategy stops.
    #[serde(default)]
    pub flatten_on_stop: bool,

    /// Minimum price increment for protection levels; 0 disables rounding.
    #[serde(default)]
    pub price_step: f64,

    /// ATR period used by ATR-multiple protection legs.
    #[serde(default = "default_protection_atr_length")]
    pub protection_atr_length: usize,

    /// Initial connectivity flag for the warm-up gate.
    #[serde(default = "default_true")]
    pub online: bool,

    /// Initial permission flag for the warm-up gate.
    #[serde(default = "default_true")]
    pub allowed_to_trade: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            instrument: default_instrument(),
            volume: default_volume(),
            flatten_on_stop: false,
            price_step: 0.0,
            protection_atr_length: default_protection_atr_length(),
            online: true,
            allowed_to_trade: true,
        }
    }
}

impl EngineConfig {
    pub fn new(instrument: impl Into<String>) -> Self {
        Self {
            instrument: instrument.into(),
            ..Self::default()
        }
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = volume;
        self
    }

    pub fn with_flatten_on_stop(mut self, flatten: bool) -> Self {
        self.flatten_on_stop = flatten;
        self
    }

    pub fn with_price_step(mut self, step: f64) -> Self {
        self.price_step = step;
        self
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.instrument.trim().is_empty() {
            return Err(ConfigError::Invalid("instrument must not be empty".into()));
        }
        if !(self.volume.is_finite() && self.volume > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "volume must be positive, got {}",
                self.volume
            )));
        }
        if !self.price_step.is_finite() || self.price_step < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "price_step must be >= 0, got {}",
                self.price_step
            )));
        }
        if self.protection_atr_length == 0 {
            return Err(ConfigError::Invalid(
                "protection_atr_length must be >= 1".into(),
            ));
        }
        Ok(())
    }
}
