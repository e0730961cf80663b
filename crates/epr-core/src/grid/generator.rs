//! Adaptive refinement of a shared energy grid.
//!
//! A grid cell is accepted once linear interpolation at its midpoint agrees
//! with the true evaluation of every registered function; otherwise the
//! midpoint is inserted and both halves are re-examined. The traversal uses
//! an explicit leftmost-first stack, so the output is already ascending and
//! independent sub-intervals stay independent.

use crate::common::constants::GRID_DEDUP_RELATIVE_TOLERANCE;

/// Convergence knobs shared by every grid-generation call within one
/// generator instance. Immutable after construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvergenceConfig {
    relative_convergence_tolerance: f64,
    absolute_difference_tolerance: f64,
    distance_tolerance: f64,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConvergenceConfigError {
    #[error("relative convergence tolerance must be in (0, 1), got {value}")]
    InvalidRelativeTolerance { value: f64 },
    #[error("absolute difference tolerance must be finite and positive, got {value}")]
    InvalidAbsoluteTolerance { value: f64 },
    #[error("distance tolerance must be finite and positive, got {value}")]
    InvalidDistanceTolerance { value: f64 },
}

impl ConvergenceConfig {
    pub fn new(
        relative_convergence_tolerance: f64,
        absolute_difference_tolerance: f64,
        distance_tolerance: f64,
    ) -> Result<Self, ConvergenceConfigError> {
        if !relative_convergence_tolerance.is_finite()
            || relative_convergence_tolerance <= 0.0
            || relative_convergence_tolerance >= 1.0
        {
            return Err(ConvergenceConfigError::InvalidRelativeTolerance {
                value: relative_convergence_tolerance,
            });
        }
        if !absolute_difference_tolerance.is_finite() || absolute_difference_tolerance <= 0.0 {
            return Err(ConvergenceConfigError::InvalidAbsoluteTolerance {
                value: absolute_difference_tolerance,
            });
        }
        if !distance_tolerance.is_finite() || distance_tolerance <= 0.0 {
            return Err(ConvergenceConfigError::InvalidDistanceTolerance {
                value: distance_tolerance,
            });
        }

        Ok(Self {
            relative_convergence_tolerance,
            absolute_difference_tolerance,
            distance_tolerance,
        })
    }

    pub fn relative_convergence_tolerance(&self) -> f64 {
        self.relative_convergence_tolerance
    }

    pub fn absolute_difference_tolerance(&self) -> f64 {
        self.absolute_difference_tolerance
    }

    pub fn distance_tolerance(&self) -> f64 {
        self.distance_tolerance
    }
}

/// What to do when a cell hits the distance-tolerance floor while still
/// failing the convergence test. Strict is the default; lenient acceptance
/// is an explicit opt-in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize,
)]
pub enum DirtyConvergencePolicy {
    #[default]
    Strict,
    Accept,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GridConvergenceError {
    #[error("initial grid requires at least 2 points, got {actual}")]
    InsufficientInitialPoints { actual: usize },
    #[error("initial grid must be strictly increasing, index {index} has {current} after {previous}")]
    NonIncreasingInitialGrid {
        index: usize,
        previous: f64,
        current: f64,
    },
    #[error("no functions registered for grid refinement")]
    NoFunctions,
    #[error("function {function_index} evaluated to a non-finite value at {abscissa}")]
    NonFiniteEvaluation { function_index: usize, abscissa: f64 },
    #[error(
        "sub-interval [{lower}, {upper}] reached the distance tolerance without converging (function {function_index}, midpoint error {midpoint_error})"
    )]
    DirtyConvergence {
        lower: f64,
        upper: f64,
        function_index: usize,
        midpoint_error: f64,
    },
}

/// Adaptive union-grid refiner over a set of evaluators sharing one domain.
#[derive(Clone, Copy, Debug)]
pub struct AdaptiveGridGenerator {
    config: ConvergenceConfig,
    policy: DirtyConvergencePolicy,
}

impl AdaptiveGridGenerator {
    pub fn new(config: ConvergenceConfig, policy: DirtyConvergencePolicy) -> Self {
        Self { config, policy }
    }

    pub fn config(&self) -> &ConvergenceConfig {
        &self.config
    }

    pub fn policy(&self) -> DirtyConvergencePolicy {
        self.policy
    }

    /// Refine `initial_grid` until every cell is converged for every
    /// function. The result is strictly ascending with no duplicates and is
    /// a superset of the initial grid.
    pub fn generate(
        &self,
        initial_grid: &[f64],
        functions: &[&dyn Fn(f64) -> f64],
    ) -> Result<Vec<f64>, GridConvergenceError> {
        validate_initial_grid(initial_grid)?;
        if functions.is_empty() {
            return Err(GridConvergenceError::NoFunctions);
        }

        let evaluate_all = |x: f64| -> Result<Vec<f64>, GridConvergenceError> {
            functions
                .iter()
                .enumerate()
                .map(|(function_index, function)| {
                    let value = function(x);
                    if value.is_finite() {
                        Ok(value)
                    } else {
                        Err(GridConvergenceError::NonFiniteEvaluation {
                            function_index,
                            abscissa: x,
                        })
                    }
                })
                .collect()
        };

        let mut refined = Vec::with_capacity(initial_grid.len());

        // Leftmost-first depth-first traversal: push the right half before
        // the left so accepted cells emit their lower endpoints in order.
        let mut stack: Vec<(f64, Vec<f64>, f64, Vec<f64>)> = Vec::new();
        for window in initial_grid.windows(2).rev() {
            let lower_values = evaluate_all(window[0])?;
            let upper_values = evaluate_all(window[1])?;
            stack.push((window[0], lower_values, window[1], upper_values));
        }

        while let Some((lower, lower_values, upper, upper_values)) = stack.pop() {
            let midpoint = 0.5 * (lower + upper);
            let width = upper - lower;

            // Floating point can pin the midpoint to an endpoint before the
            // width reaches the configured floor; treat that as the floor.
            let at_distance_floor = width <= self.config.distance_tolerance
                || midpoint <= lower
                || midpoint >= upper;

            let midpoint_values = evaluate_all(midpoint)?;
            let violation = self.first_unconverged_function(
                &lower_values,
                &upper_values,
                &midpoint_values,
            );

            match violation {
                Some((function_index, midpoint_error)) if at_distance_floor => {
                    match self.policy {
                        DirtyConvergencePolicy::Strict => {
                            return Err(GridConvergenceError::DirtyConvergence {
                                lower,
                                upper,
                                function_index,
                                midpoint_error,
                            });
                        }
                        DirtyConvergencePolicy::Accept => {
                            tracing::warn!(
                                lower,
                                upper,
                                function_index,
                                midpoint_error,
                                "accepting unconverged cell at distance tolerance"
                            );
                            refined.push(lower);
                        }
                    }
                }
                Some(_) => {
                    stack.push((midpoint, midpoint_values.clone(), upper, upper_values));
                    stack.push((lower, lower_values, midpoint, midpoint_values));
                }
                None => refined.push(lower),
            }
        }

        refined.push(initial_grid[initial_grid.len() - 1]);
        dedup_ascending(&mut refined);
        Ok(refined)
    }

    /// Returns the first function whose midpoint interpolation error exceeds
    /// both tolerances, together with that error. A midpoint value of
    /// exactly zero waives the relative check and keys on the absolute
    /// difference alone.
    fn first_unconverged_function(
        &self,
        lower_values: &[f64],
        upper_values: &[f64],
        midpoint_values: &[f64],
    ) -> Option<(usize, f64)> {
        for (function_index, &midpoint_value) in midpoint_values.iter().enumerate() {
            let interpolated = 0.5 * (lower_values[function_index] + upper_values[function_index]);
            let absolute_error = (midpoint_value - interpolated).abs();
            if absolute_error <= self.config.absolute_difference_tolerance {
                continue;
            }
            if midpoint_value == 0.0 {
                return Some((function_index, absolute_error));
            }
            let relative_error = absolute_error / midpoint_value.abs();
            if relative_error > self.config.relative_convergence_tolerance {
                return Some((function_index, absolute_error));
            }
        }
        None
    }
}

fn validate_initial_grid(grid: &[f64]) -> Result<(), GridConvergenceError> {
    if grid.len() < 2 {
        return Err(GridConvergenceError::InsufficientInitialPoints { actual: grid.len() });
    }
    for index in 1..grid.len() {
        if grid[index] <= grid[index - 1] {
            return Err(GridConvergenceError::NonIncreasingInitialGrid {
                index,
                previous: grid[index - 1],
                current: grid[index],
            });
        }
    }
    Ok(())
}

/// Remove near-coincident neighbours from an ascending grid in place.
pub(crate) fn dedup_ascending(grid: &mut Vec<f64>) {
    grid.dedup_by(|current, previous| {
        let scale = previous.abs().max(current.abs()).max(f64::MIN_POSITIVE);
        (*current - *previous).abs() <= GRID_DEDUP_RELATIVE_TOLERANCE * scale
    });
}
