//! Construction of the shared ("union") energy grid.
//!
//! One grid must carry every physical quantity of a generation pass without
//! interpolation loss for any of them: the builder seeds the grid with the
//! domain endpoints and the known threshold energies (each paired with a
//! nudged companion so threshold derivation sees a clean zero-to-nonzero
//! transition), then refines it once per quantity, feeding the running grid
//! back in so the result only ever grows.

use super::generator::{
    dedup_ascending, AdaptiveGridGenerator, ConvergenceConfig, DirtyConvergencePolicy,
    GridConvergenceError,
};
use crate::common::constants::THRESHOLD_NUDGE_FACTOR;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UnionGridError {
    #[error("union grid domain must satisfy 0 < min < max, got [{domain_min}, {domain_max}]")]
    InvalidDomain { domain_min: f64, domain_max: f64 },
    #[error("union grid refinement failed for quantity '{quantity}': {source}")]
    QuantityRefinement {
        quantity: String,
        source: GridConvergenceError,
    },
}

/// A labelled evaluator contributing to a union grid. The label identifies
/// the physical quantity (and subshell, where applicable) in failure
/// reports.
pub struct UnionQuantity<'a> {
    pub label: String,
    pub evaluate: &'a dyn Fn(f64) -> f64,
}

impl<'a> UnionQuantity<'a> {
    pub fn new(label: impl Into<String>, evaluate: &'a dyn Fn(f64) -> f64) -> Self {
        Self {
            label: label.into(),
            evaluate,
        }
    }
}

#[derive(Debug)]
pub struct UnionGridBuilder {
    domain_min: f64,
    domain_max: f64,
    generator: AdaptiveGridGenerator,
}

impl UnionGridBuilder {
    pub fn new(
        domain_min: f64,
        domain_max: f64,
        config: ConvergenceConfig,
        policy: DirtyConvergencePolicy,
    ) -> Result<Self, UnionGridError> {
        if !domain_min.is_finite() || !domain_max.is_finite() || domain_min <= 0.0
            || domain_min >= domain_max
        {
            return Err(UnionGridError::InvalidDomain {
                domain_min,
                domain_max,
            });
        }
        Ok(Self {
            domain_min,
            domain_max,
            generator: AdaptiveGridGenerator::new(config, policy),
        })
    }

    pub fn domain_min(&self) -> f64 {
        self.domain_min
    }

    pub fn domain_max(&self) -> f64 {
        self.domain_max
    }

    /// Seed grid: the domain endpoints plus every strictly interior
    /// must-include point and its nudged companion `p * 1.0001`. The
    /// companion gives threshold derivation a point just above each
    /// discontinuity so no interpolated value straddles it.
    pub fn initialize(&self, must_include_points: &[f64]) -> Vec<f64> {
        let mut seed = vec![self.domain_min, self.domain_max];
        for &point in must_include_points {
            if point <= self.domain_min || point >= self.domain_max {
                continue;
            }
            seed.push(point);
            let nudged = point * THRESHOLD_NUDGE_FACTOR;
            if nudged < self.domain_max {
                seed.push(nudged);
            }
        }
        seed.sort_by(f64::total_cmp);
        dedup_ascending(&mut seed);
        seed
    }

    /// Insert `new_points` into `grid`: sort, clip everything below the
    /// requested domain (native grids of some quantities start lower), and
    /// deduplicate at magnitude-scaled machine epsilon.
    pub fn merge(&self, grid: &mut Vec<f64>, new_points: &[f64]) {
        grid.extend_from_slice(new_points);
        grid.sort_by(f64::total_cmp);
        grid.retain(|&point| point >= self.domain_min);
        dedup_ascending(grid);
    }

    /// Refine `seed` once per quantity, feeding the running grid back in.
    /// The grid strictly grows or stays the same size; any refinement
    /// failure is wrapped with the quantity label and propagated, because a
    /// non-converged grid would produce silently wrong cross sections
    /// downstream.
    pub fn accumulate(
        &self,
        seed: Vec<f64>,
        quantities: &[UnionQuantity<'_>],
    ) -> Result<Vec<f64>, UnionGridError> {
        let mut grid = seed;
        for quantity in quantities {
            tracing::debug!(quantity = %quantity.label, points = grid.len(), "refining union grid");
            grid = self
                .generator
                .generate(&grid, &[quantity.evaluate])
                .map_err(|source| UnionGridError::QuantityRefinement {
                    quantity: quantity.label.clone(),
                    source,
                })?;
        }
        Ok(grid)
    }
}
