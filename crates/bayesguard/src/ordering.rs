//! Elimination ordering heuristics for variable elimination.
//!
//! Different heuristics can produce significantly different elimination orders,
//! which affects the cost of variable elimination: the work is exponential in
//! the largest clique an order induces. Each heuristic works greedily on the
//! interaction graph of the current factor scopes (two variables are adjacent
//! when some factor mentions both) and simulates the fill-in edges that
//! eliminating a variable creates.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::factor::Factor;

/// Strategy for computing variable elimination ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EliminationStrategy {
    /// Eliminate in the order the candidates are given (network declaration order)
    DeclarationOrder,
    /// Min-degree: choose the variable with fewest neighbors
    MinDegree,
    /// Min-weight: choose the variable whose neighborhood has the smallest joint table
    MinWeight,
    /// Min-fill: choose the variable that introduces fewest new edges
    #[default]
    MinFill,
    /// Weighted min-fill: fill edges weighted by the product of their endpoint cardinalities
    WeightedMinFill,
}

type Adjacency = HashMap<String, BTreeSet<String>>;

/// Compute elimination ordering for variable elimination.
#[derive(Debug, Clone, Default)]
pub struct EliminationOrdering {
    strategy: EliminationStrategy,
}

impl EliminationOrdering {
    /// Create with a specific strategy.
    pub fn new(strategy: EliminationStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> EliminationStrategy {
        self.strategy
    }

    /// Order `candidates` for elimination from `factors`.
    ///
    /// Ties are broken by the position in `candidates`, so the result is
    /// deterministic for a given input.
    pub fn compute_order(&self, factors: &[Factor], candidates: &[String]) -> Vec<String> {
        if self.strategy == EliminationStrategy::DeclarationOrder {
            return candidates.to_vec();
        }

        let cardinality = cardinalities(factors);
        let mut adjacency = build_adjacency(factors);
        let mut remaining: Vec<String> = candidates.to_vec();
        let mut order = Vec::with_capacity(remaining.len());

        while !remaining.is_empty() {
            let position = remaining
                .iter()
                .enumerate()
                .min_by_key(|(_, v)| self.score(&adjacency, &cardinality, v))
                .map(|(i, _)| i)
                .unwrap_or(0);

            let var = remaining.remove(position);
            eliminate_from_graph(&mut adjacency, &var);
            order.push(var);
        }

        order
    }

    fn score(&self, adjacency: &Adjacency, cardinality: &HashMap<String, usize>, var: &str) -> u128 {
        let neighbors = adjacency.get(var);

        match self.strategy {
            EliminationStrategy::DeclarationOrder => 0,
            EliminationStrategy::MinDegree => neighbors.map_or(0, |n| n.len() as u128),
            EliminationStrategy::MinWeight => neighbors
                .into_iter()
                .flatten()
                .fold(card(cardinality, var), |acc, n| {
                    acc.saturating_mul(card(cardinality, n))
                }),
            EliminationStrategy::MinFill => fill_edges(adjacency, var).len() as u128,
            EliminationStrategy::WeightedMinFill => fill_edges(adjacency, var)
                .into_iter()
                .fold(0u128, |acc, (a, b)| {
                    acc.saturating_add(card(cardinality, a) * card(cardinality, b))
                }),
        }
    }
}

fn card(cardinality: &HashMap<String, usize>, var: &str) -> u128 {
    cardinality.get(var).copied().unwrap_or(1) as u128
}

/// Largest number of variables in a single factor created while eliminating
/// `order` from `factors` (the induced width plus one).
pub fn induced_width(factors: &[Factor], order: &[String]) -> usize {
    let mut adjacency = build_adjacency(factors);
    let mut widest = factors.iter().map(|f| f.scope().len()).max().unwrap_or(0);

    for var in order {
        if let Some(neighbors) = adjacency.get(var) {
            widest = widest.max(neighbors.len() + 1);
        }
        eliminate_from_graph(&mut adjacency, var);
    }

    widest
}

fn cardinalities(factors: &[Factor]) -> HashMap<String, usize> {
    factors
        .iter()
        .flat_map(|f| f.scope().iter())
        .map(|v| (v.name().to_string(), v.cardinality()))
        .collect()
}

/// Interaction graph of the factor scopes.
fn build_adjacency(factors: &[Factor]) -> Adjacency {
    let mut adjacency: Adjacency = HashMap::new();

    for factor in factors {
        let names: Vec<&str> = factor.variable_names().collect();
        for (i, a) in names.iter().enumerate() {
            let entry = adjacency.entry(a.to_string()).or_default();
            for (j, b) in names.iter().enumerate() {
                if i != j {
                    entry.insert(b.to_string());
                }
            }
        }
    }

    adjacency
}

/// Pairs of neighbors of `var` that are not yet connected.
fn fill_edges<'a>(adjacency: &'a Adjacency, var: &str) -> Vec<(&'a str, &'a str)> {
    let neighbors: Vec<&String> = match adjacency.get(var) {
        Some(n) => n.iter().collect(),
        None => return Vec::new(),
    };

    let mut fill = Vec::new();
    for i in 0..neighbors.len() {
        for j in (i + 1)..neighbors.len() {
            let connected = adjacency
                .get(neighbors[i])
                .is_some_and(|adj| adj.contains(neighbors[j]));
            if !connected {
                fill.push((neighbors[i].as_str(), neighbors[j].as_str()));
            }
        }
    }

    fill
}

/// Remove `var` and connect all of its neighbors pairwise.
fn eliminate_from_graph(adjacency: &mut Adjacency, var: &str) {
    let neighbors = match adjacency.remove(var) {
        Some(n) => n,
        None => return,
    };

    for neighbor in &neighbors {
        if let Some(adj) = adjacency.get_mut(neighbor) {
            adj.remove(var);
            adj.extend(neighbors.iter().filter(|n| *n != neighbor).cloned());
        }
    }
}
