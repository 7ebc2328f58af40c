//! Validation of coordinate-triple input.
//!
//! This module checks that a set of `(row, col, weight)` triples describes a
//! square lower-triangular sparse matrix before a graph is built from it.

use crate::{Error, Result};
use std::collections::HashSet;

/// Result of input validation.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Whether the input is valid.
    pub is_valid: bool,
    /// Every problem found, in input order.
    pub errors: Vec<Error>,
    /// Largest index referenced by the input.
    pub dimension: usize,
}

impl ValidationResult {
    /// Create a valid result.
    #[must_use]
    pub fn valid(dimension: usize) -> Self {
        Self {
            is_valid: true,
            errors: vec![],
            dimension,
        }
    }

    /// Create an invalid result with errors.
    #[must_use]
    pub fn invalid(errors: Vec<Error>) -> Self {
        Self {
            is_valid: false,
            errors,
            dimension: 0,
        }
    }

    /// Convert into the dimension, or the first error found.
    ///
    /// # Errors
    ///
    /// Returns the first recorded error if the input was invalid.
    pub fn into_result(self) -> Result<usize> {
        match self.errors.into_iter().next() {
            Some(error) => Err(error),
            None => Ok(self.dimension),
        }
    }
}

/// Validate coordinate triples of a lower-triangular matrix.
///
/// Checks for:
/// - Sequences of different lengths (reported alone, nothing else is checked)
/// - Zero indices (indices are 1-based)
/// - Entries above the diagonal (`row < col`)
/// - Repeated `(row, col)` pairs
/// - Non-finite weights
#[must_use]
pub fn validate_triples(rows: &[usize], cols: &[usize], weights: &[f64]) -> ValidationResult {
    if rows.len() != cols.len() || rows.len() != weights.len() {
        return ValidationResult::invalid(vec![Error::input_shape(format!(
            "sequence lengths differ: {} rows, {} columns, {} weights",
            rows.len(),
            cols.len(),
            weights.len()
        ))]);
    }

    let mut errors = Vec::new();
    let mut seen = HashSet::with_capacity(rows.len());
    let mut dimension = 0;

    for (position, ((&row, &col), &weight)) in rows.iter().zip(cols).zip(weights).enumerate() {
        if row == 0 || col == 0 {
            errors.push(Error::input_shape(format!(
                "entry {position} uses index 0; indices are 1-based"
            )));
            continue;
        }
        if row < col {
            errors.push(Error::input_shape(format!(
                "entry {position} at ({row}, {col}) is above the diagonal"
            )));
        }
        if !seen.insert((row, col)) {
            errors.push(Error::input_shape(format!(
                "entry {position} repeats ({row}, {col})"
            )));
        }
        if !weight.is_finite() {
            errors.push(Error::input_shape(format!(
                "entry {position} at ({row}, {col}) has non-finite weight {weight}"
            )));
        }
        dimension = dimension.max(row);
    }

    if errors.is_empty() {
        ValidationResult::valid(dimension)
    } else {
        ValidationResult::invalid(errors)
    }
}
