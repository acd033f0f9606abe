//! Expected-utility decisions on top of a posterior.
//!
//! A transaction can be allowed or blocked. Allowing it is a gamble on whether
//! it is fraudulent; blocking it costs the same whatever the truth is:
//!
//! ```text
//! EU(allow) = p · cost_fraud + (1 - p) · cost_ok
//! EU(block) = cost_block
//! ```
//!
//! The action with the greater expected utility wins. When both are equal the
//! transaction is allowed.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{PgmError, Result};
use crate::posterior::Posterior;

/// Costs (negative utilities) of each outcome.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UtilityModel {
    /// Utility of allowing a fraudulent transaction
    pub cost_fraud: f64,
    /// Utility of blocking, fraudulent or not
    pub cost_block: f64,
    /// Utility of allowing a legitimate transaction
    pub cost_ok: f64,
}

impl Default for UtilityModel {
    fn default() -> Self {
        Self {
            cost_fraud: -1000.0,
            cost_block: -10.0,
            cost_ok: 0.0,
        }
    }
}

/// Intervention chosen for a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Allow,
    Block,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => write!(f, "ALLOW"),
            Self::Block => write!(f, "BLOCK"),
        }
    }
}

/// Both expected utilities and the action they select.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub eu_allow: f64,
    pub eu_block: f64,
    pub action: Action,
}

impl UtilityModel {
    pub fn new(cost_fraud: f64, cost_block: f64, cost_ok: f64) -> Self {
        Self {
            cost_fraud,
            cost_block,
            cost_ok,
        }
    }

    /// Reject non-finite costs.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("cost_fraud", self.cost_fraud),
            ("cost_block", self.cost_block),
            ("cost_ok", self.cost_ok),
        ] {
            if !value.is_finite() {
                return Err(PgmError::Config(format!(
                    "utility {} must be finite, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    pub fn expected_utility_allow(&self, p: f64) -> f64 {
        p * self.cost_fraud + (1.0 - p) * self.cost_ok
    }

    pub fn expected_utility_block(&self) -> f64 {
        self.cost_block
    }

    /// Fraud probability at which both actions have equal expected utility,
    /// `(cost_block - cost_ok) / (cost_fraud - cost_ok)`. `None` when allowing
    /// costs the same whether or not the transaction is fraudulent.
    pub fn break_even_probability(&self) -> Option<f64> {
        let spread = self.cost_fraud - self.cost_ok;
        (spread != 0.0).then(|| (self.cost_block - self.cost_ok) / spread)
    }

    /// Choose an action for fraud probability `p`.
    ///
    /// Ties go to [`Action::Allow`]. `p` outside [0, 1] (or NaN) is rejected
    /// with `InvalidProbability`.
    pub fn decide(&self, p: f64) -> Result<Decision> {
        if !(0.0..=1.0).contains(&p) {
            return Err(PgmError::InvalidProbability(p));
        }

        let eu_allow = self.expected_utility_allow(p);
        let eu_block = self.expected_utility_block();
        let action = if eu_block > eu_allow {
            Action::Block
        } else {
            Action::Allow
        };

        Ok(Decision {
            eu_allow,
            eu_block,
            action,
        })
    }
}

/// Choose an action for fraud probability `p` under the given costs.
pub fn decide(p: f64, cost_fraud: f64, cost_block: f64, cost_ok: f64) -> Result<Decision> {
    UtilityModel::new(cost_fraud, cost_block, cost_ok).decide(p)
}

/// Same as [`decide`], with the costs taken from a [`UtilityModel`].
pub fn decide_with(p: f64, utility: &UtilityModel) -> Result<Decision> {
    utility.decide(p)
}

/// Decide from a single-variable posterior, reading the probability of `fraud_state`.
pub fn decide_from_posterior(
    posterior: &Posterior,
    fraud_state: &str,
    utility: &UtilityModel,
) -> Result<Decision> {
    let p = posterior.probability(fraud_state)?;
    // Normalization can leave p a rounding error above 1.
    utility.decide(p.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_boundary_flips_at_break_even() {
        let utility = UtilityModel::default();
        assert_abs_diff_eq!(
            utility.break_even_probability().unwrap(),
            0.01,
            epsilon = 1e-15
        );

        let below = decide(0.0099, -1000.0, -10.0, 0.0).unwrap();
        assert_eq!(below.action, Action::Allow);
        assert_abs_diff_eq!(below.eu_allow, -9.9, epsilon = 1e-9);
        assert_eq!(below.eu_block, -10.0);

        let above = decide(0.0101, -1000.0, -10.0, 0.0).unwrap();
        assert_eq!(above.action, Action::Block);
        assert_abs_diff_eq!(above.eu_allow, -10.1, epsilon = 1e-9);
    }

    #[test]
    fn test_tie_allows() {
        // EU(allow) = 0.5 * -20 = -10 = EU(block), exactly representable
        let decision = decide(0.5, -20.0, -10.0, 0.0).unwrap();
        assert_eq!(decision.eu_allow, decision.eu_block);
        assert_eq!(decision.action, Action::Allow);
    }

    #[test]
    fn test_extremes() {
        let utility = UtilityModel::default();
        assert_eq!(utility.decide(0.0).unwrap().action, Action::Allow);
        assert_eq!(utility.decide(1.0).unwrap().action, Action::Block);
    }

    #[test]
    fn test_invalid_probability() {
        let utility = UtilityModel::default();
        assert_eq!(
            utility.decide(1.5).unwrap_err(),
            PgmError::InvalidProbability(1.5)
        );
        assert!(utility.decide(-0.01).is_err());
        assert!(utility.decide(f64::NAN).is_err());
    }

    #[test]
    fn test_break_even_undefined() {
        let flat = UtilityModel::new(-5.0, -10.0, -5.0);
        assert_eq!(flat.break_even_probability(), None);
    }

    #[test]
    fn test_action_display() {
        assert_eq!(Action::Allow.to_string(), "ALLOW");
        assert_eq!(Action::Block.to_string(), "BLOCK");
    }

    #[test]
    fn test_validate_rejects_non_finite() {
        assert!(UtilityModel::default().validate().is_ok());
        assert!(UtilityModel::new(f64::INFINITY, -10.0, 0.0).validate().is_err());
    }
}
