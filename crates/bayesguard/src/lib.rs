//! Discrete Bayesian networks with exact inference and expected-utility decisions.
//!
//! A network is declared once (in code through [`NetworkBuilder`] or as data
//! through [`NetworkDefinition`]), validated eagerly, and then queried without
//! further mutation. Queries run variable elimination over the network's CPD
//! factors and return a normalized [`Posterior`]; the [`decision`] layer turns
//! a fraud probability into an allow/block action.
//!
//! # Architecture
//!
//! ```text
//! NetworkDefinition → NetworkBuilder → BayesianNetwork → InferenceEngine → Posterior → Decision
//!                          ↓                 ↓                  ↓
//!                     load checks       CPD factors     reduce / eliminate
//! ```
//!
//! # Example
//!
//! ```
//! use bayesguard::{decide_from_posterior, BayesianNetwork, Evidence, TabularCpd, UtilityModel};
//!
//! let mut builder = BayesianNetwork::builder();
//! builder
//!     .add_variable("Fraud", ["False", "True"])?
//!     .add_variable("ForeignPurchase", ["False", "True"])?
//!     .add_edge("Fraud", "ForeignPurchase")?
//!     .add_cpd(TabularCpd::prior("Fraud", vec![0.99, 0.01]))?
//!     .add_cpd(TabularCpd::conditional(
//!         "ForeignPurchase",
//!         [("Fraud", 2)],
//!         vec![0.95, 0.2, 0.05, 0.8],
//!     ))?;
//! let network = builder.build()?;
//!
//! let evidence = Evidence::new().with("ForeignPurchase", "True");
//! let posterior = network.query(&["Fraud"], &evidence)?;
//! let decision = decide_from_posterior(&posterior, "True", &UtilityModel::default())?;
//! println!("{}", decision.action);
//! # Ok::<(), bayesguard::PgmError>(())
//! ```

pub mod config;
pub mod decision;
pub mod definition;
pub mod elimination;
mod error;
mod factor;
mod inference;
pub mod layout;
mod network;
mod ordering;
mod posterior;
mod variable;

pub use config::EngineConfig;
pub use decision::{decide, decide_from_posterior, decide_with, Action, Decision, UtilityModel};
pub use definition::{NetworkDefinition, VariableDefinition};
pub use error::{PgmError, Result};
pub use factor::Factor;
pub use inference::{Evidence, InferenceEngine, Query};
pub use network::{BayesianNetwork, NetworkBuilder, TabularCpd, DEFAULT_TOLERANCE};
pub use ordering::{induced_width, EliminationOrdering, EliminationStrategy};
pub use posterior::Posterior;
pub use variable::Variable;

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_end_to_end_decision() {
        let mut builder = BayesianNetwork::builder();
        builder
            .add_variable("Fraud", ["False", "True"])
            .unwrap()
            .add_variable("Alarm", ["False", "True"])
            .unwrap()
            .add_edge("Fraud", "Alarm")
            .unwrap()
            .add_cpd(TabularCpd::prior("Fraud", vec![0.9, 0.1]))
            .unwrap()
            .add_cpd(TabularCpd::conditional(
                "Alarm",
                [("Fraud", 2)],
                vec![0.8, 0.1, 0.2, 0.9],
            ))
            .unwrap();
        let network = builder.build().unwrap();

        let posterior = network
            .query(&["Fraud"], &Evidence::new().with("Alarm", "True"))
            .unwrap();
        // 0.1*0.9 / (0.9*0.2 + 0.1*0.9)
        let expected = 0.09 / 0.27;
        assert_abs_diff_eq!(posterior.probability("True").unwrap(), expected, epsilon = 1e-12);

        let decision = decide_from_posterior(&posterior, "True", &UtilityModel::default()).unwrap();
        assert_eq!(decision.action, Action::Block);
        assert_eq!(
            decide_with(expected, &UtilityModel::default()).unwrap().action,
            Action::Block
        );
    }
}
