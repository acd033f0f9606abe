//! Normalized query results.

use crate::error::{PgmError, Result};
use crate::factor::{scope_label, Factor};
use crate::layout;
use crate::variable::Variable;

/// A normalized distribution over the queried variables.
///
/// The scope follows the order in which the variables were queried.
#[derive(Clone, Debug, PartialEq)]
pub struct Posterior {
    factor: Factor,
}

impl Posterior {
    pub(crate) fn new(factor: Factor) -> Self {
        Self { factor }
    }

    pub fn variables(&self) -> &[Variable] {
        self.factor.scope()
    }

    pub fn factor(&self) -> &Factor {
        &self.factor
    }

    pub fn into_factor(self) -> Factor {
        self.factor
    }

    /// Probabilities in layout order (last variable fastest).
    pub fn values(&self) -> Vec<f64> {
        self.factor.to_vec()
    }

    fn single(&self) -> Result<&Variable> {
        match self.factor.scope() {
            [variable] => Ok(variable),
            scope => Err(PgmError::schema(
                scope_label(scope),
                "posterior spans several variables; use joint_probability",
            )),
        }
    }

    /// P(state) for a single-variable posterior.
    pub fn probability(&self, state: &str) -> Result<f64> {
        let variable = self.single()?;
        let index = variable.require_state(state)?;
        Ok(self.factor.value(&[index]).unwrap_or(0.0))
    }

    /// Probability of a full assignment `(variable, state)` over the posterior scope.
    pub fn joint_probability(&self, assignment: &[(&str, &str)]) -> Result<f64> {
        let scope = self.factor.scope();
        let mut indices = vec![None; scope.len()];

        for (name, state) in assignment {
            let axis = scope
                .iter()
                .position(|v| v.name() == *name)
                .ok_or_else(|| PgmError::UnknownVariable(name.to_string()))?;
            if indices[axis].is_some() {
                return Err(PgmError::schema(*name, "assigned more than once"));
            }
            indices[axis] = Some(scope[axis].require_state(state)?);
        }

        let indices: Vec<usize> = indices
            .into_iter()
            .zip(scope)
            .map(|(index, variable)| {
                index.ok_or_else(|| PgmError::schema(variable.name(), "missing from assignment"))
            })
            .collect::<Result<_>>()?;

        Ok(self.factor.value(&indices).unwrap_or(0.0))
    }

    /// `(state, probability)` pairs of a single-variable posterior.
    pub fn distribution(&self) -> Result<Vec<(String, f64)>> {
        let variable = self.single()?;
        Ok(variable
            .states()
            .iter()
            .cloned()
            .zip(self.factor.values().iter().copied())
            .collect())
    }

    /// Every assignment (as state names, in scope order) with its probability.
    pub fn iter(&self) -> impl Iterator<Item = (Vec<&str>, f64)> + '_ {
        let shape = self.factor.shape().to_vec();
        self.factor
            .values()
            .iter()
            .enumerate()
            .map(move |(flat, &p)| {
                let states = layout::unflatten(flat, &shape)
                    .into_iter()
                    .zip(self.factor.scope())
                    .map(|(index, variable)| variable.state_name(index).unwrap_or_default())
                    .collect();
                (states, p)
            })
    }

    /// The most probable assignment; ties go to the first in layout order.
    pub fn most_likely(&self) -> (Vec<&str>, f64) {
        self.iter()
            .fold((Vec::new(), f64::NEG_INFINITY), |best, (states, p)| {
                if p > best.1 {
                    (states, p)
                } else {
                    best
                }
            })
    }

    /// Marginal posterior of one of the queried variables.
    pub fn marginal(&self, name: &str) -> Result<Posterior> {
        if !self.factor.contains(name) {
            return Err(PgmError::UnknownVariable(name.to_string()));
        }
        let others: Vec<String> = self
            .factor
            .variable_names()
            .filter(|v| *v != name)
            .map(str::to_string)
            .collect();
        let factor = others
            .iter()
            .try_fold(self.factor.clone(), |f, v| f.sum_out(v))?;
        Ok(Posterior::new(factor))
    }
}
