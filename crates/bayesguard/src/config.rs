//! Engine configuration.
//!
//! Every field has a default, so a configuration file only needs to name the
//! settings it changes:
//!
//! ```toml
//! tolerance = 1e-6
//! strategy = "min_fill"
//! prune_barren = true
//!
//! [utility]
//! cost_fraud = -1000.0
//! cost_block = -10.0
//! cost_ok = 0.0
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::decision::UtilityModel;
use crate::error::{PgmError, Result};
use crate::network::{self, DEFAULT_TOLERANCE};
use crate::ordering::EliminationStrategy;

/// Configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Allowed deviation of a CPD column sum from 1
    pub tolerance: f64,

    /// Elimination ordering heuristic
    pub strategy: EliminationStrategy,

    /// Drop CPDs of variables that are neither queried, observed, nor ancestors of either
    pub prune_barren: bool,

    /// Costs used by the decision rule
    pub utility: UtilityModel,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            strategy: EliminationStrategy::default(),
            prune_barren: true,
            utility: UtilityModel::default(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| PgmError::Config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            PgmError::Config(format!(
                "failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| PgmError::Config(format!("failed to serialize config: {}", e)))
    }

    pub fn validate(&self) -> Result<()> {
        network::check_tolerance(self.tolerance)?;
        self.utility.validate()
    }
}
