//! Projection of tabular cross sections onto the final union grid.
//!
//! Below its physical threshold a reaction's cross section is exactly zero;
//! those leading zeros are not stored. The threshold rule is a strict
//! floating-point comparison against zero: the source data already encodes
//! exact zeros below threshold after evaluation through its interpolation
//! law, and a value like 1e-300 is physically nonzero.

use crate::common::constants::ELASTIC_DIFFERENCE_SNAP_TOLERANCE;

/// A dependent-value array whose leading implicit zeros are trimmed:
/// storage starts at `threshold_index` and
/// `values.len() + threshold_index == grid.len()`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ThresholdIndexedArray {
    pub threshold_index: usize,
    pub values: Vec<f64>,
}

impl ThresholdIndexedArray {
    /// Full grid length this array was resampled against.
    pub fn grid_len(&self) -> usize {
        self.threshold_index + self.values.len()
    }

    /// Value at a full-grid index; implicitly zero below the threshold.
    pub fn value_at(&self, grid_index: usize) -> f64 {
        if grid_index < self.threshold_index {
            0.0
        } else {
            self.values[grid_index - self.threshold_index]
        }
    }
}

/// Evaluate `function` at every union-grid point and trim the leading exact
/// zeros. An all-zero evaluation is valid (a reaction that never turns on
/// in-domain): `threshold_index == grid.len()` with an empty array.
pub fn resample(union_grid: &[f64], function: &dyn Fn(f64) -> f64) -> ThresholdIndexedArray {
    let dense: Vec<f64> = union_grid.iter().map(|&energy| function(energy)).collect();
    trim_leading_zeros(dense)
}

/// Two-cross-section variant for the screened-Rutherford / cutoff elastic
/// split: resample `total - cutoff`, snapping any relative difference below
/// 1e-6 to exactly zero so roundoff noise cannot masquerade as a physical
/// cross section (and cannot go negative).
pub fn resample_difference(
    union_grid: &[f64],
    total: &dyn Fn(f64) -> f64,
    cutoff: &dyn Fn(f64) -> f64,
) -> ThresholdIndexedArray {
    let dense: Vec<f64> = union_grid
        .iter()
        .map(|&energy| {
            let total_value = total(energy);
            let difference = total_value - cutoff(energy);
            if total_value != 0.0
                && difference.abs() / total_value.abs() < ELASTIC_DIFFERENCE_SNAP_TOLERANCE
            {
                0.0
            } else {
                difference
            }
        })
        .collect();
    trim_leading_zeros(dense)
}

fn trim_leading_zeros(dense: Vec<f64>) -> ThresholdIndexedArray {
    let threshold_index = dense
        .iter()
        .position(|&value| value != 0.0)
        .unwrap_or(dense.len());
    ThresholdIndexedArray {
        threshold_index,
        values: dense[threshold_index..].to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::{resample, resample_difference};
    use crate::numerics::tabular::{InterpolationLaw, TabularFunction};

    #[test]
    fn threshold_rule_is_a_strict_nonzero_comparison() {
        // f(x) = 0 for x < 2 and (x - 2) for x >= 2: the tabulated value at
        // x = 2.0 is itself exactly zero, so the threshold sits at index 3.
        let function = TabularFunction::new(
            vec![0.0, 1.0, 2.0, 3.0, 4.0],
            vec![0.0, 0.0, 0.0, 1.0, 2.0],
            InterpolationLaw::LinLin,
        )
        .expect("valid table");
        let grid = [0.0, 1.0, 2.0, 3.0, 4.0];

        let resampled = resample(&grid, &|x| function.evaluate(x));
        assert_eq!(resampled.threshold_index, 3);
        assert_eq!(resampled.values, vec![1.0, 2.0]);
        assert_eq!(resampled.grid_len(), grid.len());
    }

    #[test]
    fn tiny_values_count_as_nonzero() {
        let grid = [1.0, 2.0, 3.0];
        let resampled = resample(&grid, &|x| if x < 2.0 { 0.0 } else { 1.0e-300 });
        assert_eq!(resampled.threshold_index, 1);
        assert_eq!(resampled.values, vec![1.0e-300, 1.0e-300]);
    }

    #[test]
    fn all_zero_reaction_is_valid_with_empty_storage() {
        let grid = [1.0, 2.0, 3.0];
        let resampled = resample(&grid, &|_| 0.0);
        assert_eq!(resampled.threshold_index, 3);
        assert!(resampled.values.is_empty());
        assert_eq!(resampled.grid_len(), 3);
    }

    #[test]
    fn value_at_reports_implicit_zeros_below_threshold() {
        let grid = [1.0, 2.0, 3.0, 4.0];
        let resampled = resample(&grid, &|x| if x < 3.0 { 0.0 } else { x });
        assert_eq!(resampled.threshold_index, 2);
        assert_eq!(resampled.value_at(0), 0.0);
        assert_eq!(resampled.value_at(1), 0.0);
        assert_eq!(resampled.value_at(2), 3.0);
        assert_eq!(resampled.value_at(3), 4.0);
    }

    #[test]
    fn difference_snaps_roundoff_to_zero_and_advances_the_threshold() {
        let grid = [1.0, 2.0, 3.0, 4.0];
        // Below 3.0 total and cutoff agree to roundoff; above, the total
        // carries a genuine screened-Rutherford excess.
        let total = |x: f64| if x < 3.0 { 5.0 + 1.0e-9 } else { 8.0 };
        let cutoff = |x: f64| if x < 3.0 { 5.0 } else { 6.0 };

        let resampled = resample_difference(&grid, &total, &cutoff);
        assert_eq!(resampled.threshold_index, 2);
        assert_eq!(resampled.values, vec![2.0, 2.0]);
    }

    #[test]
    fn difference_keeps_genuine_small_differences() {
        let grid = [1.0, 2.0];
        let total = |_: f64| 2.0;
        let cutoff = |_: f64| 1.0;
        let resampled = resample_difference(&grid, &total, &cutoff);
        assert_eq!(resampled.threshold_index, 0);
        assert_eq!(resampled.values, vec![1.0, 1.0]);
    }
}
