//! Mixed-radix flattening of factor tables.
//!
//! A factor over scope `[X₁, …, Xₖ]` stores `∏ |Xᵢ|` values in one flat
//! table. The variable listed **last** varies fastest:
//!
//! ```text
//! flat = ((a₁ · |X₂| + a₂) · |X₃| + a₃) · … + aₖ
//! ```
//!
//! A CPD has scope `[child, parent₁, …, parentₖ]`, so its flat table is the
//! child's rows laid end to end, and within each row the parent combinations
//! run with the last parent fastest. Every flatten/unflatten in the crate goes
//! through this module.

/// Number of entries in a table with the given shape, or `None` if it does
/// not fit in a `usize`.
pub fn table_len(shape: &[usize]) -> Option<usize> {
    shape.iter().try_fold(1usize, |acc, &card| acc.checked_mul(card))
}

/// Flat position of a multi-index.
pub fn flat_index(assignment: &[usize], shape: &[usize]) -> usize {
    assignment
        .iter()
        .zip(shape)
        .fold(0, |acc, (&a, &card)| acc * card + a)
}

/// Decode a flat position into `assignment` (which must have `shape.len()` slots).
pub fn unflatten_into(mut flat: usize, shape: &[usize], assignment: &mut [usize]) {
    for axis in (0..shape.len()).rev() {
        assignment[axis] = flat % shape[axis];
        flat /= shape[axis];
    }
}

/// Decode a flat position into a fresh multi-index.
pub fn unflatten(flat: usize, shape: &[usize]) -> Vec<usize> {
    let mut assignment = vec![0; shape.len()];
    unflatten_into(flat, shape, &mut assignment);
    assignment
}
