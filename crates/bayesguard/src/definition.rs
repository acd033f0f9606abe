//! Declarative network definitions.
//!
//! A [`NetworkDefinition`] is plain data that can be read from TOML or JSON and
//! turned into a validated [`BayesianNetwork`]. All checks go through
//! [`NetworkBuilder`], so a malformed definition fails at load time.
//!
//! ```toml
//! edges = [["Rain", "WetGrass"]]
//!
//! [[variables]]
//! name = "Rain"
//! states = ["False", "True"]
//!
//! [[variables]]
//! name = "WetGrass"
//! states = ["False", "True"]
//!
//! [[cpds]]
//! variable = "Rain"
//! values = [0.8, 0.2]
//!
//! [[cpds]]
//! variable = "WetGrass"
//! evidence = ["Rain"]
//! evidence_card = [2]
//! values = [0.9, 0.1, 0.1, 0.9]
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::config::EngineConfig;
use crate::error::{PgmError, Result};
use crate::network::{BayesianNetwork, NetworkBuilder, TabularCpd};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VariableDefinition {
    pub name: String,
    pub states: Vec<String>,
}

/// Variables, edges `[parent, child]` and one CPD per variable.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkDefinition {
    pub variables: Vec<VariableDefinition>,
    #[serde(default)]
    pub edges: Vec<(String, String)>,
    #[serde(default)]
    pub cpds: Vec<TabularCpd>,
}

impl NetworkDefinition {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| PgmError::Config(format!("failed to parse network definition: {}", e)))
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| PgmError::Config(format!("failed to parse network definition: {}", e)))
    }

    /// Read a `.toml` or `.json` definition file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            PgmError::Config(format!(
                "failed to read network definition {}: {}",
                path.display(),
                e
            ))
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&content),
            Some("json") => Self::from_json_str(&content),
            _ => Err(PgmError::Config(format!(
                "unsupported network definition format: {}",
                path.display()
            ))),
        }
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| PgmError::Config(format!("failed to serialize network definition: {}", e)))
    }

    /// Build with the default column-sum tolerance.
    pub fn build(&self) -> Result<BayesianNetwork> {
        self.to_builder(NetworkBuilder::new())?.build()
    }

    pub fn build_with_tolerance(&self, tolerance: f64) -> Result<BayesianNetwork> {
        self.to_builder(NetworkBuilder::new().with_tolerance(tolerance))?.build()
    }

    /// Build with the settings of an [`EngineConfig`].
    pub fn build_with_config(&self, config: &EngineConfig) -> Result<BayesianNetwork> {
        self.to_builder(NetworkBuilder::from_config(config))?.build()
    }

    fn to_builder(&self, mut builder: NetworkBuilder) -> Result<NetworkBuilder> {
        for variable in &self.variables {
            builder.add_variable(variable.name.as_str(), variable.states.iter().cloned())?;
        }
        for (parent, child) in &self.edges {
            builder.add_edge(parent, child)?;
        }
        for cpd in &self.cpds {
            builder.add_cpd(cpd.clone())?;
        }
        Ok(builder)
    }
}

impl From<&BayesianNetwork> for NetworkDefinition {
    fn from(network: &BayesianNetwork) -> Self {
        Self {
            variables: network
                .variables()
                .map(|v| VariableDefinition {
                    name: v.name().to_string(),
                    states: v.states().to_vec(),
                })
                .collect(),
            edges: network.edges().to_vec(),
            cpds: network
                .variables()
                .filter_map(|v| network.tabular_cpd(v.name()).cloned())
                .collect(),
        }
    }
}

impl TryFrom<&NetworkDefinition> for BayesianNetwork {
    type Error = PgmError;

    fn try_from(definition: &NetworkDefinition) -> Result<Self> {
        definition.build()
    }
}
