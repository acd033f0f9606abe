//! Factor representation and operations.

use scirs2_core::ndarray::{ArrayD, Axis, IxDyn};

use crate::error::{PgmError, Result};
use crate::layout;
use crate::variable::Variable;

/// A factor in a discrete probabilistic graphical model.
///
/// Represents a non-negative function over a tuple of variables:
/// φ(X₁, X₂, ..., Xₖ) → ℝ⁺. The table is indexed by the scope's state indices
/// using the [`layout`](crate::layout) convention (last scope variable fastest).
///
/// Factors are immutable: every operation returns a new factor.
#[derive(Clone, Debug, PartialEq)]
pub struct Factor {
    scope: Vec<Variable>,
    values: ArrayD<f64>,
}

impl Factor {
    /// Create a factor from a flat table.
    ///
    /// Fails with `SchemaMismatch` for a repeated scope variable or a table of
    /// the wrong length, and with `InvalidDistribution` for negative or
    /// non-finite entries.
    pub fn new(scope: Vec<Variable>, values: Vec<f64>) -> Result<Self> {
        for (i, var) in scope.iter().enumerate() {
            if scope[..i].iter().any(|v| v.name() == var.name()) {
                return Err(PgmError::schema(
                    var.name(),
                    "variable appears twice in factor scope",
                ));
            }
        }

        let shape: Vec<usize> = scope.iter().map(Variable::cardinality).collect();
        let expected = table_len(&scope, &shape)?;
        if values.len() != expected {
            return Err(PgmError::schema(
                scope_label(&scope),
                format!(
                    "table has {} values, scope requires {}",
                    values.len(),
                    expected
                ),
            ));
        }

        if let Some(bad) = values.iter().find(|v| !v.is_finite() || **v < 0.0) {
            return Err(PgmError::distribution(
                format!("factor over {}", scope_label(&scope)),
                format!("value {} is negative or not finite", bad),
            ));
        }

        Self::from_shape(scope, &shape, values)
    }

    /// The multiplicative identity: empty scope, single value 1.
    pub fn unit() -> Self {
        Self {
            scope: Vec::new(),
            values: ArrayD::from_elem(IxDyn(&[]), 1.0),
        }
    }

    /// Point mass on one state of `variable`.
    pub fn indicator(variable: Variable, index: usize) -> Result<Self> {
        if index >= variable.cardinality() {
            return Err(PgmError::InvalidEvidence {
                variable: variable.name().to_string(),
                state: index.to_string(),
            });
        }
        let mut values = vec![0.0; variable.cardinality()];
        values[index] = 1.0;
        Self::new(vec![variable], values)
    }

    fn from_shape(scope: Vec<Variable>, shape: &[usize], values: Vec<f64>) -> Result<Self> {
        let values = ArrayD::from_shape_vec(IxDyn(shape), values)
            .map_err(|e| PgmError::schema(scope_label(&scope), e.to_string()))?;
        Ok(Self { scope, values })
    }

    pub fn scope(&self) -> &[Variable] {
        &self.scope
    }

    /// Names of the scope variables, in scope order.
    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.scope.iter().map(Variable::name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.scope.iter().any(|v| v.name() == name)
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.scope.iter().find(|v| v.name() == name)
    }

    /// True for a factor with empty scope.
    pub fn is_scalar(&self) -> bool {
        self.scope.is_empty()
    }

    pub fn shape(&self) -> &[usize] {
        self.values.shape()
    }

    pub fn values(&self) -> &ArrayD<f64> {
        &self.values
    }

    /// Flat copy of the table in layout order.
    pub fn to_vec(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }

    /// Value at a multi-index over the scope.
    pub fn value(&self, assignment: &[usize]) -> Option<f64> {
        if assignment.len() != self.scope.len() {
            return None;
        }
        self.values.get(assignment).copied()
    }

    /// Sum of all entries.
    pub fn total(&self) -> f64 {
        self.values.sum()
    }

    fn axis_of(&self, name: &str) -> Result<usize> {
        self.scope
            .iter()
            .position(|v| v.name() == name)
            .ok_or_else(|| PgmError::UnknownVariable(name.to_string()))
    }

    /// Compute the product of two factors.
    ///
    /// φ₁(X₁) * φ₂(X₂) = φ(X₁ ∪ X₂); the result scope is `self`'s scope followed
    /// by `other`'s variables not already present.
    pub fn product(&self, other: &Factor) -> Result<Factor> {
        let mut scope = self.scope.clone();
        for var in &other.scope {
            match scope.iter().find(|v| v.name() == var.name()) {
                Some(existing) if existing != var => {
                    return Err(PgmError::schema(
                        var.name(),
                        "factors disagree on the variable's states",
                    ));
                }
                Some(_) => {}
                None => scope.push(var.clone()),
            }
        }

        let shape: Vec<usize> = scope.iter().map(Variable::cardinality).collect();
        let self_axes = axes_within(&self.scope, &scope);
        let other_axes = axes_within(&other.scope, &scope);

        let total = table_len(&scope, &shape)?;
        let mut data = Vec::with_capacity(total);
        let mut assignment = vec![0; shape.len()];
        let mut self_idx = vec![0; self_axes.len()];
        let mut other_idx = vec![0; other_axes.len()];

        for flat in 0..total {
            layout::unflatten_into(flat, &shape, &mut assignment);
            gather(&assignment, &self_axes, &mut self_idx);
            gather(&assignment, &other_axes, &mut other_idx);
            data.push(self.values[self_idx.as_slice()] * other.values[other_idx.as_slice()]);
        }

        Self::from_shape(scope, &shape, data)
    }

    /// Sum out a variable.
    ///
    /// ∑ₓ φ(X, Y) = φ(Y)
    pub fn sum_out(&self, name: &str) -> Result<Factor> {
        let axis = self.axis_of(name)?;
        let values = self.values.sum_axis(Axis(axis));

        let mut scope = self.scope.clone();
        scope.remove(axis);

        Ok(Factor { scope, values })
    }

    /// Fix `name` to the named state and drop it from the scope.
    pub fn reduce(&self, name: &str, state: &str) -> Result<Factor> {
        let axis = self.axis_of(name)?;
        let index = self.scope[axis].require_state(state)?;
        self.reduce_at(axis, index)
    }

    /// Fix `name` to the state at `index` and drop it from the scope.
    pub fn reduce_index(&self, name: &str, index: usize) -> Result<Factor> {
        let axis = self.axis_of(name)?;
        if index >= self.scope[axis].cardinality() {
            return Err(PgmError::InvalidEvidence {
                variable: name.to_string(),
                state: index.to_string(),
            });
        }
        self.reduce_at(axis, index)
    }

    fn reduce_at(&self, axis: usize, index: usize) -> Result<Factor> {
        let values = self.values.index_axis(Axis(axis), index).to_owned();

        let mut scope = self.scope.clone();
        scope.remove(axis);

        Ok(Factor { scope, values })
    }

    /// Divide every entry by the total.
    ///
    /// A zero (or non-finite) total means the evidence behind this factor has
    /// no probability mass under the model; that is reported as
    /// `InvalidDistribution`.
    pub fn normalize(&self) -> Result<Factor> {
        let total = self.total();
        if !(total > 0.0 && total.is_finite()) {
            return Err(PgmError::distribution(
                format!("factor over {}", scope_label(&self.scope)),
                format!("cannot normalize a table with total mass {}", total),
            ));
        }

        Ok(Factor {
            scope: self.scope.clone(),
            values: self.values.mapv(|v| v / total),
        })
    }

    /// Permute the scope into `order`, which must name every scope variable once.
    pub fn reorder(&self, order: &[&str]) -> Result<Factor> {
        if order.len() != self.scope.len() {
            return Err(PgmError::schema(
                scope_label(&self.scope),
                format!("reorder needs {} variables, got {}", self.scope.len(), order.len()),
            ));
        }

        let mut scope = Vec::with_capacity(order.len());
        let mut source_axes = Vec::with_capacity(order.len());
        for name in order {
            let axis = self.axis_of(name)?;
            if source_axes.contains(&axis) {
                return Err(PgmError::schema(*name, "variable named twice in reorder"));
            }
            source_axes.push(axis);
            scope.push(self.scope[axis].clone());
        }

        if source_axes.iter().enumerate().all(|(i, &axis)| i == axis) {
            return Ok(self.clone());
        }

        let shape: Vec<usize> = scope.iter().map(Variable::cardinality).collect();
        let total = table_len(&scope, &shape)?;
        let mut data = Vec::with_capacity(total);
        let mut assignment = vec![0; shape.len()];
        let mut source = vec![0; shape.len()];

        for flat in 0..total {
            layout::unflatten_into(flat, &shape, &mut assignment);
            for (position, &axis) in source_axes.iter().enumerate() {
                source[axis] = assignment[position];
            }
            data.push(self.values[source.as_slice()]);
        }

        Self::from_shape(scope, &shape, data)
    }
}

fn table_len(scope: &[Variable], shape: &[usize]) -> Result<usize> {
    layout::table_len(shape)
        .ok_or_else(|| PgmError::schema(scope_label(scope), "table size overflows"))
}

/// Position of every `inner` variable within `outer`.
fn axes_within(inner: &[Variable], outer: &[Variable]) -> Vec<usize> {
    inner
        .iter()
        .filter_map(|v| outer.iter().position(|o| o.name() == v.name()))
        .collect()
}

fn gather(assignment: &[usize], axes: &[usize], out: &mut [usize]) {
    for (slot, &axis) in out.iter_mut().zip(axes) {
        *slot = assignment[axis];
    }
}

pub(crate) fn scope_label(scope: &[Variable]) -> String {
    let names: Vec<&str> = scope.iter().map(Variable::name).collect();
    format!("[{}]", names.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn var(name: &str) -> Variable {
        Variable::boolean(name)
    }

    fn factor(names: &[&str], values: Vec<f64>) -> Factor {
        Factor::new(names.iter().map(|n| var(n)).collect(), values).unwrap()
    }

    #[test]
    fn test_factor_creation() {
        let f = factor(&["x", "y"], vec![0.1, 0.2, 0.3, 0.4]);
        assert_eq!(f.scope().len(), 2);
        assert_eq!(f.shape(), &[2, 2]);
        // Last scope variable varies fastest.
        assert_eq!(f.value(&[0, 1]), Some(0.2));
        assert_eq!(f.value(&[1, 0]), Some(0.3));
    }

    #[test]
    fn test_rejects_wrong_table_length() {
        let err = Factor::new(vec![var("x"), var("y")], vec![0.5, 0.5]).unwrap_err();
        assert!(matches!(err, PgmError::SchemaMismatch { .. }));
    }

    #[test]
    fn test_rejects_oversized_scope() {
        // 2^64 entries do not fit in a usize
        let scope: Vec<Variable> = (0..64).map(|i| var(&format!("X{}", i))).collect();
        let err = Factor::new(scope, Vec::new()).unwrap_err();
        assert!(matches!(
            err,
            PgmError::SchemaMismatch { ref reason, .. } if reason.contains("overflows")
        ));
    }

    #[test]
    fn test_rejects_duplicate_scope() {
        let err = Factor::new(vec![var("x"), var("x")], vec![0.25; 4]).unwrap_err();
        assert!(matches!(err, PgmError::SchemaMismatch { ref variable, .. } if variable == "x"));
    }

    #[test]
    fn test_rejects_negative_values() {
        let err = Factor::new(vec![var("x")], vec![1.5, -0.5]).unwrap_err();
        assert!(matches!(err, PgmError::InvalidDistribution { .. }));
    }

    #[test]
    fn test_factor_product() {
        // φ₁(X) and φ₂(Y) → φ(X,Y)
        let f1 = factor(&["x"], vec![0.6, 0.4]);
        let f2 = factor(&["y"], vec![0.7, 0.3]);

        let product = f1.product(&f2).unwrap();
        assert_eq!(product.variable_names().collect::<Vec<_>>(), vec!["x", "y"]);
        assert_abs_diff_eq!(product.value(&[0, 0]).unwrap(), 0.42, epsilon = 1e-12);
        assert_abs_diff_eq!(product.value(&[0, 1]).unwrap(), 0.18, epsilon = 1e-12);
        assert_abs_diff_eq!(product.value(&[1, 0]).unwrap(), 0.28, epsilon = 1e-12);
        assert_abs_diff_eq!(product.value(&[1, 1]).unwrap(), 0.12, epsilon = 1e-12);
    }

    #[test]
    fn test_factor_product_with_shared_vars() {
        // φ₁(X,Y) and φ₂(Y,Z) → φ(X,Y,Z)
        let f1 = factor(&["x", "y"], vec![0.1, 0.2, 0.3, 0.4]);
        let f2 = factor(&["y", "z"], vec![1.0, 2.0, 3.0, 4.0]);

        let product = f1.product(&f2).unwrap();
        assert_eq!(product.variable_names().collect::<Vec<_>>(), vec!["x", "y", "z"]);
        // x=1, y=0, z=1: 0.3 * 2.0
        assert_abs_diff_eq!(product.value(&[1, 0, 1]).unwrap(), 0.6, epsilon = 1e-12);
        // x=0, y=1, z=0: 0.2 * 3.0
        assert_abs_diff_eq!(product.value(&[0, 1, 0]).unwrap(), 0.6, epsilon = 1e-12);
    }

    #[test]
    fn test_product_with_unit_is_identity() {
        let f = factor(&["x", "y"], vec![0.1, 0.2, 0.3, 0.4]);
        assert_eq!(Factor::unit().product(&f).unwrap(), f);
        assert_eq!(f.product(&Factor::unit()).unwrap(), f);
    }

    #[test]
    fn test_product_rejects_conflicting_states() {
        let f1 = factor(&["x"], vec![0.5, 0.5]);
        let x3 = Variable::new("x", ["a", "b", "c"]).unwrap();
        let f2 = Factor::new(vec![x3], vec![0.2, 0.3, 0.5]).unwrap();
        assert!(matches!(
            f1.product(&f2),
            Err(PgmError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_sum_out() {
        // φ(X,Y) → φ(X)
        let f = factor(&["x", "y"], vec![0.1, 0.2, 0.3, 0.4]);
        let marginal = f.sum_out("y").unwrap();
        assert_eq!(marginal.variable_names().collect::<Vec<_>>(), vec!["x"]);
        assert_abs_diff_eq!(marginal.value(&[0]).unwrap(), 0.3, epsilon = 1e-12);
        assert_abs_diff_eq!(marginal.value(&[1]).unwrap(), 0.7, epsilon = 1e-12);

        let scalar = marginal.sum_out("x").unwrap();
        assert!(scalar.is_scalar());
        assert_abs_diff_eq!(scalar.total(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_sum_out_unknown_variable() {
        let f = factor(&["x"], vec![0.5, 0.5]);
        assert_eq!(
            f.sum_out("z").unwrap_err(),
            PgmError::UnknownVariable("z".to_string())
        );
    }

    #[test]
    fn test_reduce() {
        // φ(X,Y) with Y=True → φ(X)
        let f = factor(&["x", "y"], vec![0.1, 0.2, 0.3, 0.4]);
        let reduced = f.reduce("y", "True").unwrap();
        assert_eq!(reduced.variable_names().collect::<Vec<_>>(), vec!["x"]);
        assert_eq!(reduced.to_vec(), vec![0.2, 0.4]);

        let reduced_x = f.reduce_index("x", 1).unwrap();
        assert_eq!(reduced_x.to_vec(), vec![0.3, 0.4]);
    }

    #[test]
    fn test_reduce_invalid_state() {
        let f = factor(&["x"], vec![0.5, 0.5]);
        assert!(matches!(
            f.reduce("x", "Perhaps"),
            Err(PgmError::InvalidEvidence { .. })
        ));
        assert!(matches!(
            f.reduce_index("x", 2),
            Err(PgmError::InvalidEvidence { .. })
        ));
        assert!(matches!(
            f.reduce("y", "True"),
            Err(PgmError::UnknownVariable(_))
        ));
    }

    #[test]
    fn test_normalize() {
        let f = factor(&["x", "y"], vec![1.0, 2.0, 3.0, 4.0]);
        let normalized = f.normalize().unwrap();
        assert_abs_diff_eq!(normalized.total(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(normalized.value(&[1, 1]).unwrap(), 0.4, epsilon = 1e-12);
        // The source factor is untouched.
        assert_abs_diff_eq!(f.total(), 10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_normalize_zero_mass() {
        let f = factor(&["x"], vec![0.0, 0.0]);
        assert!(matches!(
            f.normalize(),
            Err(PgmError::InvalidDistribution { .. })
        ));
    }

    #[test]
    fn test_indicator() {
        let f = Factor::indicator(var("x"), 1).unwrap();
        assert_eq!(f.to_vec(), vec![0.0, 1.0]);
        assert!(Factor::indicator(var("x"), 2).is_err());
    }

    #[test]
    fn test_reorder() {
        let f = factor(&["x", "y", "z"], (1..=8).map(f64::from).collect());
        let r = f.reorder(&["z", "x", "y"]).unwrap();
        assert_eq!(r.variable_names().collect::<Vec<_>>(), vec!["z", "x", "y"]);
        for x in 0..2 {
            for y in 0..2 {
                for z in 0..2 {
                    assert_eq!(r.value(&[z, x, y]), f.value(&[x, y, z]));
                }
            }
        }
        assert!(f.reorder(&["x", "y"]).is_err());
        assert!(f.reorder(&["x", "x", "y"]).is_err());
    }
}
