//! Chain configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Which stage entries are wrapped in a panic-catching boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultBoundary {
    /// Only the call that starts the chain.
    ///
    /// A panic raised by a stage that was entered after an earlier stage
    /// suspended (handed its continuation to another thread or task) is
    /// not converted into a chain error.
    #[default]
    Initial,

    /// The starting call and every stage entry, wherever it runs.
    EveryStage,
}

/// Per-chain settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Label attached to every log event of this chain
    pub name: String,
    pub fault_boundary: FaultBoundary,
    /// Emit a trace event for every stage entry
    pub trace_stages: bool,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            name: "chain".to_string(),
            fault_boundary: FaultBoundary::Initial,
            trace_stages: false,
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl ChainConfig {
    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Load configuration from a TOML file, or defaults if it does not exist
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }
}
