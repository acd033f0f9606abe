//! Error types for network construction, inference and decisions.

use thiserror::Error;

/// Errors that can occur while building, validating or querying a network.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PgmError {
    /// The edge set contains a directed cycle.
    #[error("Structural error: directed cycle through {}", .cycle.join(" -> "))]
    StructuralError {
        /// Variables left over by the topological sort, in declaration order.
        cycle: Vec<String>,
    },

    /// A declared variable has no conditional probability table.
    #[error("Missing CPD for variable '{0}'")]
    MissingCpd(String),

    /// A table, scope or CPD declaration does not match the declared model.
    #[error("Schema mismatch for '{variable}': {reason}")]
    SchemaMismatch { variable: String, reason: String },

    /// Values that should form a probability distribution do not.
    #[error("Invalid distribution in {context}: {reason}")]
    InvalidDistribution { context: String, reason: String },

    /// A name that is not part of the network or factor scope.
    #[error("Unknown variable '{0}'")]
    UnknownVariable(String),

    /// Evidence names a state the variable does not have.
    #[error("Invalid evidence: variable '{variable}' has no state '{state}'")]
    InvalidEvidence { variable: String, state: String },

    /// A probability handed to the decision layer lies outside [0, 1].
    #[error("Invalid probability {0}: expected a value in [0, 1]")]
    InvalidProbability(f64),

    /// A query that names no variables.
    #[error("Query must name at least one variable")]
    EmptyQuery,

    /// Configuration or network definition text could not be used.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PgmError {
    pub(crate) fn schema(variable: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            variable: variable.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn distribution(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDistribution {
            context: context.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for bayesguard operations.
pub type Result<T> = std::result::Result<T, PgmError>;
