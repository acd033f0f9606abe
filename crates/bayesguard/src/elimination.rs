//! Variable elimination over a working set of factors.
//!
//! These are the building blocks the [`InferenceEngine`](crate::InferenceEngine)
//! strings together: reduce the CPDs on the evidence, eliminate the hidden
//! variables one at a time, multiply what is left.

use crate::error::Result;
use crate::factor::Factor;

/// Reduce every factor on each observed `(variable, state index)` it mentions.
pub fn reduce_factors(factors: Vec<Factor>, evidence: &[(String, usize)]) -> Result<Vec<Factor>> {
    factors
        .into_iter()
        .map(|factor| {
            let observed: Vec<&(String, usize)> = evidence
                .iter()
                .filter(|(name, _)| factor.contains(name))
                .collect();
            observed
                .into_iter()
                .try_fold(factor, |reduced, (name, index)| {
                    reduced.reduce_index(name, *index)
                })
        })
        .collect()
}

/// Eliminate a single variable: multiply the factors that mention it and sum
/// it out of the product. Factors without `var` pass through unchanged.
///
/// Scalar results are kept; they carry the probability of the evidence.
pub fn eliminate_variable(factors: Vec<Factor>, var: &str) -> Result<Vec<Factor>> {
    let (containing, mut result): (Vec<Factor>, Vec<Factor>) =
        factors.into_iter().partition(|f| f.contains(var));

    if containing.is_empty() {
        return Ok(result);
    }

    let width = containing.len();
    let product = multiply_all(&containing)?;
    let summed = product.sum_out(var)?;

    tracing::trace!(
        variable = var,
        combined = width,
        scope = ?summed.variable_names().collect::<Vec<_>>(),
        "eliminated variable"
    );

    result.push(summed);
    Ok(result)
}

/// Eliminate `order` left to right. Each step consumes the previous step's
/// factors, so the order is significant for cost but not for the result.
pub fn eliminate(mut factors: Vec<Factor>, order: &[String]) -> Result<Vec<Factor>> {
    for var in order {
        factors = eliminate_variable(factors, var)?;
    }
    Ok(factors)
}

/// Multiply all factors together; the empty product is [`Factor::unit`].
pub fn multiply_all(factors: &[Factor]) -> Result<Factor> {
    let mut iter = factors.iter();
    let first = match iter.next() {
        Some(f) => f.clone(),
        None => return Ok(Factor::unit()),
    };
    iter.try_fold(first, |acc, f| acc.product(f))
}
