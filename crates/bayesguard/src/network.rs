//! Bayesian network construction and validation.
//!
//! A network is assembled with [`NetworkBuilder`] and only becomes a
//! [`BayesianNetwork`] after passing [`validate`](BayesianNetwork::validate).
//! Validation runs four checks in a fixed order and reports the first failure:
//!
//! 1. the edges form a DAG (`StructuralError`),
//! 2. every variable has a CPD (`MissingCpd`),
//! 3. each CPD's evidence matches the variable's parents, name for name and
//!    cardinality for cardinality (`SchemaMismatch`),
//! 4. each CPD column sums to one within tolerance (`InvalidDistribution`).
//!
//! A tolerance that is not finite and positive is rejected with `Config`
//! before any of the checks run.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

use crate::config::EngineConfig;
use crate::error::{PgmError, Result};
use crate::factor::Factor;
use crate::layout;
use crate::variable::Variable;

/// Default absolute tolerance for CPD column sums.
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// A tabular conditional probability distribution P(variable | evidence).
///
/// `values` is the table over scope `[variable, evidence...]` flattened with
/// the last evidence variable fastest. Written as a matrix, each child state is
/// one row and each parent-state combination one column:
///
/// ```text
/// evidence = [Trav, Fraud]     Trav=F        Trav=T
///                            Fr=F  Fr=T    Fr=F  Fr=T
/// FP = False               [ 0.99, 0.90,   0.10, 0.10,
/// FP = True                  0.01, 0.10,   0.90, 0.90 ]
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TabularCpd {
    pub variable: String,
    #[serde(default)]
    pub evidence: Vec<String>,
    #[serde(default)]
    pub evidence_card: Vec<usize>,
    pub values: Vec<f64>,
}

impl TabularCpd {
    /// Prior for a root variable.
    pub fn prior(variable: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            variable: variable.into(),
            evidence: Vec::new(),
            evidence_card: Vec::new(),
            values,
        }
    }

    /// Conditional table given `evidence` with the stated cardinalities.
    pub fn conditional<S: Into<String>>(
        variable: impl Into<String>,
        evidence: impl IntoIterator<Item = (S, usize)>,
        values: Vec<f64>,
    ) -> Self {
        let (evidence, evidence_card) = evidence
            .into_iter()
            .map(|(name, card)| (name.into(), card))
            .unzip();
        Self {
            variable: variable.into(),
            evidence,
            evidence_card,
            values,
        }
    }

    /// Number of parent-state combinations (table columns).
    pub fn columns(&self) -> Result<usize> {
        layout::table_len(&self.evidence_card)
            .ok_or_else(|| PgmError::schema(&self.variable, "table size overflows"))
    }
}

/// Collects variables, edges and CPDs for a [`BayesianNetwork`].
///
/// Local problems (duplicate names, table length, unknown variables) are
/// reported as each piece is added; whole-model checks run in [`build`](Self::build).
#[derive(Clone, Debug)]
pub struct NetworkBuilder {
    variables: IndexMap<String, Variable>,
    edges: Vec<(String, String)>,
    cpds: IndexMap<String, TabularCpd>,
    tolerance: f64,
}

impl Default for NetworkBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkBuilder {
    pub fn new() -> Self {
        Self {
            variables: IndexMap::new(),
            edges: Vec::new(),
            cpds: IndexMap::new(),
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    /// Builder with the column-sum tolerance taken from `config`.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new().with_tolerance(config.tolerance)
    }

    /// Absolute tolerance for the column-sum check. Must be finite and
    /// positive; [`build`](Self::build) rejects anything else with `Config`.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Declare a variable with its ordered state names.
    pub fn add_variable<S: Into<String>>(
        &mut self,
        name: impl Into<String>,
        states: impl IntoIterator<Item = S>,
    ) -> Result<&mut Self> {
        let variable = Variable::new(name, states)?;
        if self.variables.contains_key(variable.name()) {
            return Err(PgmError::schema(variable.name(), "variable declared twice"));
        }
        self.variables.insert(variable.name().to_string(), variable);
        Ok(self)
    }

    /// Add a directed edge `parent -> child`. Repeated edges are ignored.
    pub fn add_edge(&mut self, parent: &str, child: &str) -> Result<&mut Self> {
        for name in [parent, child] {
            if !self.variables.contains_key(name) {
                return Err(PgmError::UnknownVariable(name.to_string()));
            }
        }
        if !self.edges.iter().any(|(p, c)| p == parent && c == child) {
            self.edges.push((parent.to_string(), child.to_string()));
        }
        Ok(self)
    }

    /// Attach the CPD of one variable, checking the table shape against the
    /// declared cardinalities.
    pub fn add_cpd(&mut self, cpd: TabularCpd) -> Result<&mut Self> {
        let child = self
            .variables
            .get(&cpd.variable)
            .ok_or_else(|| PgmError::UnknownVariable(cpd.variable.clone()))?;

        if self.cpds.contains_key(&cpd.variable) {
            return Err(PgmError::schema(&cpd.variable, "more than one CPD attached"));
        }

        if cpd.evidence.len() != cpd.evidence_card.len() {
            return Err(PgmError::schema(
                &cpd.variable,
                format!(
                    "{} evidence variables but {} evidence cardinalities",
                    cpd.evidence.len(),
                    cpd.evidence_card.len()
                ),
            ));
        }

        let columns = cpd.columns()?;
        let expected = child
            .cardinality()
            .checked_mul(columns)
            .ok_or_else(|| PgmError::schema(&cpd.variable, "table size overflows"))?;
        if cpd.values.len() != expected {
            return Err(PgmError::schema(
                &cpd.variable,
                format!(
                    "CPD table has {} values, expected {} ({} states x {} parent combinations)",
                    cpd.values.len(),
                    expected,
                    child.cardinality(),
                    columns
                ),
            ));
        }

        self.cpds.insert(cpd.variable.clone(), cpd);
        Ok(self)
    }

    /// Validate and freeze the network.
    pub fn build(self) -> Result<BayesianNetwork> {
        let checked = check_model(&self.variables, &self.edges, &self.cpds, self.tolerance)?;

        tracing::debug!(
            variables = self.variables.len(),
            edges = self.edges.len(),
            "bayesian network validated"
        );

        Ok(BayesianNetwork {
            variables: self.variables,
            edges: self.edges,
            cpds: self.cpds,
            parents: checked.parents,
            factors: checked.factors,
            topological_order: checked.topological_order,
            tolerance: self.tolerance,
        })
    }
}

/// A validated, immutable discrete Bayesian network.
///
/// There is no mutation API; share it freely between threads.
#[derive(Clone, Debug)]
pub struct BayesianNetwork {
    variables: IndexMap<String, Variable>,
    edges: Vec<(String, String)>,
    cpds: IndexMap<String, TabularCpd>,
    parents: IndexMap<String, Vec<String>>,
    factors: IndexMap<String, Factor>,
    topological_order: Vec<String>,
    tolerance: f64,
}

impl BayesianNetwork {
    pub fn builder() -> NetworkBuilder {
        NetworkBuilder::new()
    }

    /// Re-run the four ordered model checks. Idempotent; a built network always passes.
    pub fn validate(&self) -> Result<()> {
        check_model(&self.variables, &self.edges, &self.cpds, self.tolerance).map(|_| ())
    }

    /// Variables in declaration order.
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.variables.values()
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    /// Variable lookup that fails with `UnknownVariable`.
    pub fn require_variable(&self, name: &str) -> Result<&Variable> {
        self.variable(name)
            .ok_or_else(|| PgmError::UnknownVariable(name.to_string()))
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    /// Parents of `name`, in the order of its CPD's evidence list.
    pub fn parents(&self, name: &str) -> Option<&[String]> {
        self.parents.get(name).map(Vec::as_slice)
    }

    pub fn children(&self, name: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|(p, _)| p == name)
            .map(|(_, c)| c.as_str())
            .collect()
    }

    /// Edges as `(parent, child)` pairs, in insertion order.
    pub fn edges(&self) -> &[(String, String)] {
        &self.edges
    }

    /// The CPD of `name` as a factor over `[name, parents...]`.
    pub fn cpd(&self, name: &str) -> Option<&Factor> {
        self.factors.get(name)
    }

    /// The CPD of `name` as it was declared.
    pub fn tabular_cpd(&self, name: &str) -> Option<&TabularCpd> {
        self.cpds.get(name)
    }

    /// All CPD factors, in declaration order.
    pub fn factors(&self) -> impl Iterator<Item = &Factor> {
        self.factors.values()
    }

    /// Ancestors before descendants; ties keep declaration order.
    pub fn topological_order(&self) -> &[String] {
        &self.topological_order
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// `names` together with all of their ancestors.
    pub fn ancestral_set<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> HashSet<String> {
        let mut seen = HashSet::new();
        let mut stack: Vec<String> = names.into_iter().map(str::to_string).collect();
        while let Some(name) = stack.pop() {
            if !seen.insert(name.clone()) {
                continue;
            }
            if let Some(parents) = self.parents.get(&name) {
                stack.extend(parents.iter().filter(|p| !seen.contains(*p)).cloned());
            }
        }
        seen
    }
}

struct CheckedModel {
    parents: IndexMap<String, Vec<String>>,
    factors: IndexMap<String, Factor>,
    topological_order: Vec<String>,
}

fn check_model(
    variables: &IndexMap<String, Variable>,
    edges: &[(String, String)],
    cpds: &IndexMap<String, TabularCpd>,
    tolerance: f64,
) -> Result<CheckedModel> {
    check_tolerance(tolerance)?;

    // 1. Acyclicity
    let topological_order = topological_sort(variables, edges)?;

    // 2. One CPD per variable
    for name in variables.keys() {
        if !cpds.contains_key(name) {
            return Err(PgmError::MissingCpd(name.clone()));
        }
    }

    // 3. CPD evidence == graph parents
    let mut parents = IndexMap::with_capacity(variables.len());
    for (name, cpd) in cpds {
        check_evidence(variables, edges, name, cpd)?;
        parents.insert(name.clone(), cpd.evidence.clone());
    }

    // 4. Column sums
    let mut factors = IndexMap::with_capacity(variables.len());
    for (name, variable) in variables {
        let cpd = &cpds[name.as_str()];
        check_columns(variables, variable, cpd, tolerance)?;

        let mut scope = Vec::with_capacity(cpd.evidence.len() + 1);
        scope.push(variable.clone());
        scope.extend(cpd.evidence.iter().map(|e| variables[e.as_str()].clone()));
        factors.insert(name.clone(), Factor::new(scope, cpd.values.clone())?);
    }

    Ok(CheckedModel {
        parents,
        factors,
        topological_order,
    })
}

pub(crate) fn check_tolerance(tolerance: f64) -> Result<()> {
    if !tolerance.is_finite() || tolerance <= 0.0 {
        return Err(PgmError::Config(format!(
            "tolerance must be finite and positive, got {}",
            tolerance
        )));
    }
    Ok(())
}

/// Kahn's algorithm; ready nodes are taken in declaration order.
fn topological_sort(
    variables: &IndexMap<String, Variable>,
    edges: &[(String, String)],
) -> Result<Vec<String>> {
    let mut in_degree = vec![0usize; variables.len()];
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); variables.len()];

    for (parent, child) in edges {
        let p = variables
            .get_index_of(parent)
            .ok_or_else(|| PgmError::UnknownVariable(parent.clone()))?;
        let c = variables
            .get_index_of(child)
            .ok_or_else(|| PgmError::UnknownVariable(child.clone()))?;
        children[p].push(c);
        in_degree[c] += 1;
    }

    let mut ready: VecDeque<usize> = (0..variables.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(variables.len());

    while let Some(node) = ready.pop_front() {
        order.push(node);
        for &child in &children[node] {
            in_degree[child] -= 1;
            if in_degree[child] == 0 {
                ready.push_back(child);
            }
        }
    }

    if order.len() != variables.len() {
        let cycle = cyclic_nodes(&in_degree, &children)
            .into_iter()
            .filter_map(|i| variables.get_index(i).map(|(name, _)| name.clone()))
            .collect();
        return Err(PgmError::StructuralError { cycle });
    }

    Ok(order
        .into_iter()
        .filter_map(|i| variables.get_index(i).map(|(name, _)| name.clone()))
        .collect())
}

/// Nodes left over by Kahn's algorithm, minus those that only hang below a
/// cycle: peel nodes without a remaining child until none are left.
fn cyclic_nodes(in_degree: &[usize], children: &[Vec<usize>]) -> Vec<usize> {
    let mut remaining: Vec<bool> = in_degree.iter().map(|&d| d > 0).collect();
    loop {
        let peel: Vec<usize> = (0..remaining.len())
            .filter(|&i| remaining[i] && !children[i].iter().any(|&c| remaining[c]))
            .collect();
        if peel.is_empty() {
            break;
        }
        for i in peel {
            remaining[i] = false;
        }
    }
    (0..remaining.len()).filter(|&i| remaining[i]).collect()
}

fn check_evidence(
    variables: &IndexMap<String, Variable>,
    edges: &[(String, String)],
    name: &str,
    cpd: &TabularCpd,
) -> Result<()> {
    let graph_parents: HashSet<&str> = edges
        .iter()
        .filter(|(_, c)| c == name)
        .map(|(p, _)| p.as_str())
        .collect();
    let declared: HashSet<&str> = cpd.evidence.iter().map(String::as_str).collect();

    if declared.len() != cpd.evidence.len() {
        return Err(PgmError::schema(name, "CPD lists an evidence variable twice"));
    }

    if declared != graph_parents {
        let mut graph_sorted: Vec<&str> = graph_parents.into_iter().collect();
        graph_sorted.sort_unstable();
        return Err(PgmError::schema(
            name,
            format!(
                "CPD evidence {:?} does not match graph parents {:?}",
                cpd.evidence, graph_sorted
            ),
        ));
    }

    for (parent, &card) in cpd.evidence.iter().zip(&cpd.evidence_card) {
        let actual = variables
            .get(parent)
            .map(Variable::cardinality)
            .ok_or_else(|| PgmError::UnknownVariable(parent.clone()))?;
        if actual != card {
            return Err(PgmError::schema(
                name,
                format!(
                    "evidence '{}' declared with cardinality {}, variable has {}",
                    parent, card, actual
                ),
            ));
        }
    }

    Ok(())
}

fn check_columns(
    variables: &IndexMap<String, Variable>,
    variable: &Variable,
    cpd: &TabularCpd,
    tolerance: f64,
) -> Result<()> {
    let columns = cpd.columns()?;
    let shape = [variable.cardinality(), columns];
    let context = format!("CPD of '{}'", variable.name());

    if let Some(bad) = cpd.values.iter().find(|v| !v.is_finite() || **v < 0.0) {
        return Err(PgmError::distribution(
            context,
            format!("entry {} is negative or not finite", bad),
        ));
    }

    for column in 0..columns {
        let sum: f64 = (0..variable.cardinality())
            .map(|row| cpd.values[layout::flat_index(&[row, column], &shape)])
            .sum();

        if (sum - 1.0).abs() > tolerance {
            let parent_states = layout::unflatten(column, &cpd.evidence_card);
            let condition: Vec<String> = cpd
                .evidence
                .iter()
                .zip(parent_states)
                .map(|(parent, index)| {
                    let state = variables
                        .get(parent)
                        .and_then(|v| v.state_name(index))
                        .unwrap_or("?");
                    format!("{}={}", parent, state)
                })
                .collect();
            return Err(PgmError::distribution(
                context,
                format!(
                    "probabilities given [{}] sum to {} (tolerance {})",
                    condition.join(", "),
                    sum,
                    tolerance
                ),
            ));
        }
    }

    Ok(())
}
