//! Discrete random variables with named states.

use serde::{Deserialize, Serialize};

use crate::error::{PgmError, Result};

/// A finite discrete random variable.
///
/// The order of `states` is the variable's index axis in every factor that
/// mentions it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Variable {
    name: String,
    states: Vec<String>,
}

impl Variable {
    /// Create a variable, rejecting fewer than two states or repeated state names.
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        states: impl IntoIterator<Item = S>,
    ) -> Result<Self> {
        let name = name.into();
        let states: Vec<String> = states.into_iter().map(Into::into).collect();

        if states.len() < 2 {
            return Err(PgmError::schema(
                name,
                format!("cardinality must be at least 2, got {}", states.len()),
            ));
        }

        for (i, state) in states.iter().enumerate() {
            if states[..i].contains(state) {
                return Err(PgmError::schema(name, format!("duplicate state '{}'", state)));
            }
        }

        Ok(Self { name, states })
    }

    /// Binary variable with states `["False", "True"]`.
    pub fn boolean(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            states: vec!["False".to_string(), "True".to_string()],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn states(&self) -> &[String] {
        &self.states
    }

    /// Number of states.
    pub fn cardinality(&self) -> usize {
        self.states.len()
    }

    /// Index of a state name, if the variable has it.
    pub fn state_index(&self, state: &str) -> Option<usize> {
        self.states.iter().position(|s| s == state)
    }

    /// Index of a state name, or `InvalidEvidence`.
    pub fn require_state(&self, state: &str) -> Result<usize> {
        self.state_index(state)
            .ok_or_else(|| PgmError::InvalidEvidence {
                variable: self.name.clone(),
                state: state.to_string(),
            })
    }

    pub fn state_name(&self, index: usize) -> Option<&str> {
        self.states.get(index).map(String::as_str)
    }
}
