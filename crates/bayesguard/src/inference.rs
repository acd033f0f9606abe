//! High-level inference operations.
//!
//! [`InferenceEngine`] answers marginal and conditional queries against a
//! validated [`BayesianNetwork`] by exact variable elimination:
//!
//! ```text
//! query vars, evidence ─► check names/states ─► prune barren nodes
//!        ─► reduce CPDs on evidence ─► order hidden vars ─► eliminate
//!        ─► multiply remainder ─► reorder to query ─► normalize ─► Posterior
//! ```

use indexmap::IndexMap;
use rayon::prelude::*;

use crate::config::EngineConfig;
use crate::elimination;
use crate::error::{PgmError, Result};
use crate::factor::Factor;
use crate::network::BayesianNetwork;
use crate::ordering::{EliminationOrdering, EliminationStrategy};
use crate::posterior::Posterior;
use crate::variable::Variable;

/// Observed states, keyed by variable name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Evidence {
    observations: IndexMap<String, String>,
}

impl Evidence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style observation.
    pub fn with(mut self, variable: impl Into<String>, state: impl Into<String>) -> Self {
        self.insert(variable, state);
        self
    }

    /// Record an observation, replacing any earlier state for the same variable.
    pub fn insert(&mut self, variable: impl Into<String>, state: impl Into<String>) {
        self.observations.insert(variable.into(), state.into());
    }

    pub fn get(&self, variable: &str) -> Option<&str> {
        self.observations.get(variable).map(String::as_str)
    }

    pub fn contains(&self, variable: &str) -> bool {
        self.observations.contains_key(variable)
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.observations
            .iter()
            .map(|(v, s)| (v.as_str(), s.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Evidence {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut evidence = Evidence::new();
        for (variable, state) in iter {
            evidence.insert(variable, state);
        }
        evidence
    }
}

/// Query for P(variables | evidence).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Query {
    /// Query variables
    pub variables: Vec<String>,
    /// Evidence: variable -> state name
    pub evidence: Evidence,
}

impl Query {
    pub fn new<S: Into<String>>(variables: impl IntoIterator<Item = S>) -> Self {
        Self {
            variables: variables.into_iter().map(Into::into).collect(),
            evidence: Evidence::new(),
        }
    }

    /// Add an observation to the query.
    pub fn given(mut self, variable: impl Into<String>, state: impl Into<String>) -> Self {
        self.evidence.insert(variable, state);
        self
    }
}

/// Query inputs after name and state checks.
struct ResolvedQuery<'n> {
    variables: Vec<&'n Variable>,
    evidence: Vec<(String, usize)>,
}

/// Exact inference engine over a validated network.
///
/// The engine only borrows the network, so several engines (or threads) can
/// query the same network at once.
#[derive(Clone, Debug)]
pub struct InferenceEngine<'n> {
    network: &'n BayesianNetwork,
    ordering: EliminationOrdering,
    prune_barren: bool,
}

impl<'n> InferenceEngine<'n> {
    /// Engine with min-fill ordering and barren-node pruning.
    pub fn new(network: &'n BayesianNetwork) -> Self {
        Self {
            network,
            ordering: EliminationOrdering::default(),
            prune_barren: true,
        }
    }

    pub fn from_config(network: &'n BayesianNetwork, config: &EngineConfig) -> Self {
        Self {
            network,
            ordering: EliminationOrdering::new(config.strategy),
            prune_barren: config.prune_barren,
        }
    }

    pub fn with_strategy(mut self, strategy: EliminationStrategy) -> Self {
        self.ordering = EliminationOrdering::new(strategy);
        self
    }

    /// Drop CPDs of variables that are neither queried, observed, nor an
    /// ancestor of one. They sum to one and cannot change the answer.
    pub fn with_pruning(mut self, prune_barren: bool) -> Self {
        self.prune_barren = prune_barren;
        self
    }

    pub fn network(&self) -> &'n BayesianNetwork {
        self.network
    }

    /// P(variables | evidence), normalized, with scope in the order given.
    ///
    /// A queried variable that is also observed gets a point mass on its
    /// observed state. Evidence with zero probability under the model fails
    /// with `InvalidDistribution`.
    pub fn query(&self, variables: &[&str], evidence: &Evidence) -> Result<Posterior> {
        let _span = tracing::debug_span!(
            "query",
            variables = ?variables,
            evidence = evidence.len()
        )
        .entered();

        let resolved = self.resolve(variables, evidence)?;
        let factors = self.relevant_factors(&resolved);
        let factors = elimination::reduce_factors(factors, &resolved.evidence)?;

        let hidden = self.hidden_variables(&resolved);
        let order = self.ordering.compute_order(&factors, &hidden);
        tracing::debug!(order = ?order, factors = factors.len(), "elimination order");

        let remaining = elimination::eliminate(factors, &order)?;
        let mut joint = elimination::multiply_all(&remaining)?;

        for variable in &resolved.variables {
            if let Some((_, index)) = resolved
                .evidence
                .iter()
                .find(|(name, _)| name == variable.name())
            {
                joint = joint.product(&Factor::indicator((*variable).clone(), *index)?)?;
            }
        }

        let names: Vec<&str> = resolved.variables.iter().map(|v| v.name()).collect();
        let posterior = joint.reorder(&names)?.normalize()?;

        tracing::debug!(scope = ?names, "query answered");
        Ok(Posterior::new(posterior))
    }

    /// Run a [`Query`].
    pub fn run(&self, query: &Query) -> Result<Posterior> {
        let variables: Vec<&str> = query.variables.iter().map(String::as_str).collect();
        self.query(&variables, &query.evidence)
    }

    /// Answer independent queries in parallel; results keep the input order.
    pub fn query_batch(&self, queries: &[Query]) -> Vec<Result<Posterior>> {
        queries.par_iter().map(|query| self.run(query)).collect()
    }

    /// Elimination order the engine would use for this query.
    pub fn elimination_order(&self, variables: &[&str], evidence: &Evidence) -> Result<Vec<String>> {
        let resolved = self.resolve(variables, evidence)?;
        let factors =
            elimination::reduce_factors(self.relevant_factors(&resolved), &resolved.evidence)?;
        Ok(self
            .ordering
            .compute_order(&factors, &self.hidden_variables(&resolved)))
    }

    /// Check every name and state before any factor work starts.
    fn resolve(&self, variables: &[&str], evidence: &Evidence) -> Result<ResolvedQuery<'n>> {
        if variables.is_empty() {
            return Err(PgmError::EmptyQuery);
        }

        let mut query_vars: Vec<&'n Variable> = Vec::with_capacity(variables.len());
        for name in variables {
            let variable = self.network.require_variable(name)?;
            if !query_vars.iter().any(|v| v.name() == variable.name()) {
                query_vars.push(variable);
            }
        }

        let observed = evidence
            .iter()
            .map(|(name, state)| {
                let variable = self.network.require_variable(name)?;
                Ok((name.to_string(), variable.require_state(state)?))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ResolvedQuery {
            variables: query_vars,
            evidence: observed,
        })
    }

    fn relevant_factors(&self, resolved: &ResolvedQuery<'_>) -> Vec<Factor> {
        self.relevant_names(resolved)
            .iter()
            .filter_map(|name| self.network.cpd(name).cloned())
            .collect()
    }

    /// Variables whose CPDs take part in the query, in declaration order.
    fn relevant_names(&self, resolved: &ResolvedQuery<'_>) -> Vec<String> {
        let ancestors = self.prune_barren.then(|| {
            let roots = resolved
                .variables
                .iter()
                .map(|v| v.name())
                .chain(resolved.evidence.iter().map(|(n, _)| n.as_str()));
            self.network.ancestral_set(roots)
        });

        self.network
            .variables()
            .map(Variable::name)
            .filter(|name| ancestors.as_ref().map_or(true, |a| a.contains(*name)))
            .map(str::to_string)
            .collect()
    }

    /// Relevant variables that are neither queried nor observed, in declaration order.
    fn hidden_variables(&self, resolved: &ResolvedQuery<'_>) -> Vec<String> {
        self.relevant_names(resolved)
            .into_iter()
            .filter(|name| !resolved.variables.iter().any(|v| v.name() == name))
            .filter(|name| !resolved.evidence.iter().any(|(n, _)| n == name))
            .collect()
    }
}

impl BayesianNetwork {
    /// P(variables | evidence) with the default engine.
    pub fn query(&self, variables: &[&str], evidence: &Evidence) -> Result<Posterior> {
        InferenceEngine::new(self).query(variables, evidence)
    }
}
