//! One-dimensional tabulated functions with an explicit interpolation law.
//!
//! Evaluated nuclear data arrives as (grid, values) pairs tagged with the
//! interpolation law the evaluation used; the tag is dispatched explicitly
//! instead of through a virtual hierarchy so it stays a testable parameter
//! in the hot adaptive-refinement loops.

use serde::{Deserialize, Serialize};

/// Interpolation law for a tabulated function. The first tag names the
/// independent-axis treatment, the second the dependent axis: `LinLog` is
/// linear in x and logarithmic in y.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InterpolationLaw {
    LinLin,
    LinLog,
    LogLin,
    LogLog,
}

impl InterpolationLaw {
    pub const fn log_in_x(self) -> bool {
        matches!(self, Self::LogLin | Self::LogLog)
    }

    pub const fn log_in_y(self) -> bool {
        matches!(self, Self::LinLog | Self::LogLog)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TabularError {
    #[error("tabulated function requires at least 2 points, got {actual}")]
    InsufficientPoints { actual: usize },
    #[error("tabulated function length mismatch: grid={grid}, values={values}")]
    LengthMismatch { grid: usize, values: usize },
    #[error("tabulated grid must be strictly increasing, index {index} has {current} after {previous}")]
    NonIncreasingGrid {
        index: usize,
        previous: f64,
        current: f64,
    },
    #[error("tabulated entry must be finite, {axis} index {index} got {value}")]
    NonFiniteEntry {
        axis: &'static str,
        index: usize,
        value: f64,
    },
}

/// A validated tabulated 1-D function: strictly increasing grid, matching
/// dependent values, and an interpolation law.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabularFunction {
    grid: Vec<f64>,
    values: Vec<f64>,
    law: InterpolationLaw,
}

impl TabularFunction {
    pub fn new(
        grid: Vec<f64>,
        values: Vec<f64>,
        law: InterpolationLaw,
    ) -> Result<Self, TabularError> {
        validate_tabulated_pair(&grid, &values)?;
        Ok(Self { grid, values, law })
    }

    pub fn grid(&self) -> &[f64] {
        &self.grid
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn law(&self) -> InterpolationLaw {
        self.law
    }

    pub fn lower_bound(&self) -> f64 {
        self.grid[0]
    }

    pub fn upper_bound(&self) -> f64 {
        self.grid[self.grid.len() - 1]
    }

    /// Evaluate the function at `x`.
    ///
    /// Outside the tabulated domain the function is exactly zero (a cross
    /// section vanishes off-table, and that exact zero is what threshold
    /// derivation keys on). Exact grid hits return the stored value so
    /// tabulated zeros survive evaluation untouched.
    pub fn evaluate(&self, x: f64) -> f64 {
        if !x.is_finite() || x < self.lower_bound() || x > self.upper_bound() {
            return 0.0;
        }

        // partition_point yields the first index with grid[i] >= x.
        let upper = match self.grid.partition_point(|&value| value < x) {
            0 => return self.values[0],
            index if index >= self.grid.len() => self.grid.len() - 1,
            index => index,
        };
        if self.grid[upper] == x {
            return self.values[upper];
        }
        let lower = upper - 1;

        interpolate_cell(
            self.law,
            self.grid[lower],
            self.grid[upper],
            self.values[lower],
            self.values[upper],
            x,
        )
    }
}

/// Interpolate within one cell under the given law, falling back to the
/// linear form on any axis whose endpoints are not strictly positive (the
/// logarithm is undefined there; tabulated zeros below threshold hit this).
pub fn interpolate_cell(
    law: InterpolationLaw,
    x0: f64,
    x1: f64,
    y0: f64,
    y1: f64,
    x: f64,
) -> f64 {
    let use_log_x = law.log_in_x() && x0 > 0.0 && x1 > 0.0 && x > 0.0;
    let use_log_y = law.log_in_y() && y0 > 0.0 && y1 > 0.0;

    let fraction = if use_log_x {
        (x / x0).ln() / (x1 / x0).ln()
    } else {
        (x - x0) / (x1 - x0)
    };

    if use_log_y {
        y0 * (y1 / y0).powf(fraction)
    } else {
        y0 + fraction * (y1 - y0)
    }
}

pub(crate) fn validate_tabulated_pair(grid: &[f64], values: &[f64]) -> Result<(), TabularError> {
    if grid.len() < 2 {
        return Err(TabularError::InsufficientPoints { actual: grid.len() });
    }
    if values.len() != grid.len() {
        return Err(TabularError::LengthMismatch {
            grid: grid.len(),
            values: values.len(),
        });
    }

    for (index, &value) in grid.iter().enumerate() {
        if !value.is_finite() {
            return Err(TabularError::NonFiniteEntry {
                axis: "grid",
                index,
                value,
            });
        }
        if index > 0 && value <= grid[index - 1] {
            return Err(TabularError::NonIncreasingGrid {
                index,
                previous: grid[index - 1],
                current: value,
            });
        }
    }
    for (index, &value) in values.iter().enumerate() {
        if !value.is_finite() {
            return Err(TabularError::NonFiniteEntry {
                axis: "values",
                index,
                value,
            });
        }
    }

    Ok(())
}
