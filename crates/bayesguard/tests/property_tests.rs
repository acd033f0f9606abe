//! Property-based tests for factor algebra, inference and decisions.
//!
//! This module uses proptest to verify:
//! - Factor operations (product, marginalization, normalization)
//! - Variable elimination on randomly parameterized chains
//! - Monotonicity of the decision rule

use approx::assert_abs_diff_eq;
use bayesguard::*;
use proptest::prelude::*;

// ============================================================================
// Helper Functions
// ============================================================================

fn binary(name: &str) -> Variable {
    Variable::boolean(name)
}

fn factor(names: &[&str], values: Vec<f64>) -> Factor {
    Factor::new(names.iter().map(|n| binary(n)).collect(), values).unwrap()
}

/// Normalize each column of a `[child, parent]` table written with `rows` child states.
fn column_normalized(raw: &[f64], rows: usize) -> Vec<f64> {
    let columns = raw.len() / rows;
    let mut values = raw.to_vec();
    for column in 0..columns {
        let sum: f64 = (0..rows).map(|r| raw[r * columns + column]).sum();
        for row in 0..rows {
            values[row * columns + column] /= sum;
        }
    }
    values
}

/// X_0 -> X_1 -> ... -> X_{n-1}, all binary, parameters taken from `raw`.
fn random_chain(prior: f64, raw: &[Vec<f64>]) -> BayesianNetwork {
    let mut builder = BayesianNetwork::builder();
    let names: Vec<String> = (0..=raw.len()).map(|i| format!("X_{}", i)).collect();

    for name in &names {
        builder.add_variable(name.as_str(), ["False", "True"]).unwrap();
    }
    builder
        .add_cpd(TabularCpd::prior(names[0].as_str(), vec![prior, 1.0 - prior]))
        .unwrap();
    for (i, table) in raw.iter().enumerate() {
        builder.add_edge(&names[i], &names[i + 1]).unwrap();
        builder
            .add_cpd(TabularCpd::conditional(
                names[i + 1].as_str(),
                [(names[i].as_str(), 2)],
                column_normalized(table, 2),
            ))
            .unwrap();
    }

    builder.build().unwrap()
}

fn chain_tables() -> impl Strategy<Value = Vec<Vec<f64>>> {
    prop::collection::vec(prop::collection::vec(0.05f64..1.0, 4), 1..5)
}

// ============================================================================
// Factor Operation Properties
// ============================================================================

proptest! {
    /// Property: product is commutative once both results share an axis order
    #[test]
    fn factor_product_commutative(
        values1 in prop::collection::vec(0.1f64..10.0, 4),
        values2 in prop::collection::vec(0.1f64..10.0, 4)
    ) {
        let f1 = factor(&["X", "Y"], values1);
        let f2 = factor(&["Y", "Z"], values2);

        let p1 = f1.product(&f2).unwrap();
        let p2 = f2.product(&f1).unwrap();
        let order: Vec<&str> = p1.variable_names().collect();
        let p2 = p2.reorder(&order).unwrap();

        for (a, b) in p1.to_vec().iter().zip(p2.to_vec()) {
            assert_abs_diff_eq!(*a, b, epsilon = 1e-9);
        }
    }

    /// Property: (f1 * f2) * f3 == f1 * (f2 * f3)
    #[test]
    fn factor_product_associative(
        values1 in prop::collection::vec(0.1f64..5.0, 2),
        values2 in prop::collection::vec(0.1f64..5.0, 4),
        values3 in prop::collection::vec(0.1f64..5.0, 4)
    ) {
        let f1 = factor(&["X"], values1);
        let f2 = factor(&["X", "Y"], values2);
        let f3 = factor(&["Y", "Z"], values3);

        let left = f1.product(&f2).unwrap().product(&f3).unwrap();
        let right = f1.product(&f2.product(&f3).unwrap()).unwrap();
        let order: Vec<&str> = left.variable_names().collect();
        let right = right.reorder(&order).unwrap();

        for (a, b) in left.to_vec().iter().zip(right.to_vec()) {
            assert_abs_diff_eq!(*a, b, epsilon = 1e-9);
        }
    }

    /// Property: normalization is idempotent and yields total mass 1
    #[test]
    fn normalization_idempotent(values in prop::collection::vec(0.01f64..100.0, 8)) {
        let f = factor(&["A", "B", "C"], values);
        let once = f.normalize().unwrap();
        let twice = once.normalize().unwrap();

        assert_abs_diff_eq!(once.total(), 1.0, epsilon = 1e-9);
        for (a, b) in once.to_vec().iter().zip(twice.to_vec()) {
            assert_abs_diff_eq!(*a, b, epsilon = 1e-12);
        }
    }

    /// Property: summing out two variables gives the same factor in either order
    #[test]
    fn sum_out_order_independent(values in prop::collection::vec(0.0f64..10.0, 8)) {
        let f = factor(&["A", "B", "C"], values);

        let ab = f.sum_out("A").unwrap().sum_out("B").unwrap();
        let ba = f.sum_out("B").unwrap().sum_out("A").unwrap();

        prop_assert_eq!(ab.variable_names().collect::<Vec<_>>(), vec!["C"]);
        for (a, b) in ab.to_vec().iter().zip(ba.to_vec()) {
            assert_abs_diff_eq!(*a, b, epsilon = 1e-9);
        }
        assert_abs_diff_eq!(ab.total(), f.total(), epsilon = 1e-9);
    }

    /// Property: reducing then summing equals summing the selected slice
    #[test]
    fn reduce_selects_slice(values in prop::collection::vec(0.0f64..10.0, 4), state in 0usize..2) {
        let f = factor(&["A", "B"], values.clone());
        let reduced = f.reduce_index("A", state).unwrap();

        prop_assert_eq!(reduced.variable_names().collect::<Vec<_>>(), vec!["B"]);
        assert_abs_diff_eq!(reduced.value(&[0]).unwrap(), values[state * 2], epsilon = 1e-12);
        assert_abs_diff_eq!(reduced.value(&[1]).unwrap(), values[state * 2 + 1], epsilon = 1e-12);
    }
}

// ============================================================================
// Inference Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: every marginal of a random chain sums to one
    #[test]
    fn chain_marginals_sum_to_one(prior in 0.05f64..0.95, tables in chain_tables()) {
        let network = random_chain(prior, &tables);

        for variable in network.variables() {
            let posterior = network.query(&[variable.name()], &Evidence::new()).unwrap();
            let total: f64 = posterior.values().iter().sum();
            assert_abs_diff_eq!(total, 1.0, epsilon = 1e-9);
        }
    }

    /// Property: the root marginal of a chain is its prior
    #[test]
    fn chain_root_marginal_is_prior(prior in 0.05f64..0.95, tables in chain_tables()) {
        let network = random_chain(prior, &tables);
        let posterior = network.query(&["X_0"], &Evidence::new()).unwrap();
        assert_abs_diff_eq!(posterior.probability("False").unwrap(), prior, epsilon = 1e-9);
    }

    /// Property: conditioning on the root and averaging recovers the marginal
    #[test]
    fn chain_law_of_total_probability(prior in 0.05f64..0.95, tables in chain_tables()) {
        let network = random_chain(prior, &tables);
        let last = format!("X_{}", tables.len());

        let marginal = network.query(&[last.as_str()], &Evidence::new()).unwrap();
        let given_false = network
            .query(&[last.as_str()], &Evidence::new().with("X_0", "False"))
            .unwrap();
        let given_true = network
            .query(&[last.as_str()], &Evidence::new().with("X_0", "True"))
            .unwrap();

        let mixed = prior * given_false.probability("True").unwrap()
            + (1.0 - prior) * given_true.probability("True").unwrap();
        assert_abs_diff_eq!(marginal.probability("True").unwrap(), mixed, epsilon = 1e-9);
    }

    /// Property: the elimination heuristic never changes the answer
    #[test]
    fn strategies_agree(prior in 0.05f64..0.95, tables in chain_tables(), observed in any::<bool>()) {
        let network = random_chain(prior, &tables);
        let last = format!("X_{}", tables.len());
        let state = if observed { "True" } else { "False" };
        let evidence = Evidence::new().with(last.as_str(), state);

        let reference = InferenceEngine::new(&network)
            .with_strategy(EliminationStrategy::DeclarationOrder)
            .with_pruning(false)
            .query(&["X_0"], &evidence)
            .unwrap();
        for strategy in [EliminationStrategy::MinFill, EliminationStrategy::WeightedMinFill] {
            let posterior = InferenceEngine::new(&network)
                .with_strategy(strategy)
                .query(&["X_0"], &evidence)
                .unwrap();
            assert_abs_diff_eq!(
                posterior.probability("True").unwrap(),
                reference.probability("True").unwrap(),
                epsilon = 1e-9
            );
        }
    }
}

// ============================================================================
// Decision Properties
// ============================================================================

proptest! {
    /// Property: once blocking wins, it keeps winning as fraud becomes more likely
    #[test]
    fn decision_monotone_in_probability(
        p1 in 0.0f64..=1.0,
        p2 in 0.0f64..=1.0,
        cost_fraud in -5000.0f64..-1.0,
        cost_block in -100.0f64..0.0
    ) {
        let (low, high) = if p1 <= p2 { (p1, p2) } else { (p2, p1) };
        let utility = UtilityModel::new(cost_fraud, cost_block, 0.0);

        let low_decision = utility.decide(low).unwrap();
        let high_decision = utility.decide(high).unwrap();
        if low_decision.action == Action::Block {
            prop_assert_eq!(high_decision.action, Action::Block);
        }
    }

    /// Property: the chosen action never has the lower expected utility
    #[test]
    fn decision_maximizes_expected_utility(
        p in 0.0f64..=1.0,
        cost_fraud in -5000.0f64..0.0,
        cost_block in -100.0f64..0.0,
        cost_ok in -5.0f64..0.0
    ) {
        let decision = decide(p, cost_fraud, cost_block, cost_ok).unwrap();
        match decision.action {
            Action::Allow => prop_assert!(decision.eu_allow >= decision.eu_block),
            Action::Block => prop_assert!(decision.eu_block > decision.eu_allow),
        }
    }
}
