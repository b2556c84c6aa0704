//! Composer configuration
//!
//! Loaded from a TOML file, then overridden by `COMPOSER_*` environment
//! variables.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::placement::CompatibilityConfig;
use crate::status::LifecycleTables;
use crate::vote::ALTERNATIVE_VOTE_KIND;

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Configuration of a node composer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerConfig {
    /// Name of the node, prefix of generated isolate names
    pub node_name: String,
    /// Kind of the vote engine used for placement elections
    pub engine_kind: String,
    /// Offer a new, empty isolate in every election
    pub offer_neutral_isolate: bool,
    /// Weight of the compatibility criterion ballots
    pub compatibility_weight: f64,
    pub compatibility: CompatibilityConfig,
    pub lifecycle: LifecycleTables,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            node_name: "node".to_string(),
            engine_kind: ALTERNATIVE_VOTE_KIND.to_string(),
            offer_neutral_isolate: true,
            compatibility_weight: 1.0,
            compatibility: CompatibilityConfig::default(),
            lifecycle: LifecycleTables::default(),
        }
    }
}

impl ComposerConfig {
    /// Default configuration with environment overrides
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Read a TOML file, then apply environment overrides
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config.with_env_overrides())
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(name) = std::env::var("COMPOSER_NODE_NAME") {
            self.node_name = name;
        }
        if let Ok(kind) = std::env::var("COMPOSER_ENGINE") {
            self.engine_kind = kind;
        }
        if let Ok(val) = std::env::var("COMPOSER_OFFER_NEUTRAL") {
            self.offer_neutral_isolate = val.to_lowercase() == "true" || val == "1";
        }
        if let Ok(weight) = std::env::var("COMPOSER_COMPATIBILITY_WEIGHT") {
            if let Ok(w) = weight.parse() {
                self.compatibility_weight = w;
            }
        }
        self
    }
}
