//! Moment-preserving reduction of the elastic angular distribution.
//!
//! Replaces the continuous distribution above the cutoff angle cosine with a
//! small set of discrete angles and weights that reproduce its low-order
//! Legendre moments exactly: normalize the partial moments by the retained
//! mass, convert to monomial moments, invert through a Gauss-Radau rule with
//! one node pinned at the forward direction, then drop that pinned node. The
//! retained weight sum before renormalization is the cross-section reduction
//! factor applied downstream.

use super::moments::{ElasticMomentEvaluator, MomentEvaluationError};
use crate::common::constants::RUTHERFORD_PEAK_ANGLE_COSINE;
use crate::grid::resample::ThresholdIndexedArray;
use crate::numerics::legendre::power_moments_from_legendre_moments;
use crate::numerics::quadrature::CompensatedSum;
use crate::numerics::radau::{radau_quadrature, MomentInversionError};

// Nodes may land a few ulps outside the measure support from roundoff in
// the eigen solve.
const NODE_RANGE_SLACK: f64 = 1.0e-12;
const FIXED_NODE_TOLERANCE: f64 = 1.0e-10;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReductionError {
    #[error("cutoff angle cosine must be in [-1, 1), got {value}")]
    InvalidCutoffAngleCosine { value: f64 },
    #[error(
        "reduction is inactive for cutoff angle cosine {cutoff_angle_cosine} and {discrete_angle_count} discrete angles"
    )]
    Inactive {
        cutoff_angle_cosine: f64,
        discrete_angle_count: usize,
    },
    #[error("retained probability mass above the cutoff is not positive: {mass}")]
    VanishingRetainedMass { mass: f64 },
    #[error(transparent)]
    Moments(#[from] MomentEvaluationError),
    #[error(transparent)]
    MomentInversion(#[from] MomentInversionError),
    #[error("largest recovered node {node} is not the pinned forward node")]
    MissingFixedNode { node: f64 },
    #[error("recovered node {node} lies outside [{lower}, 1)")]
    NodeOutsideRange { node: f64, lower: f64 },
    #[error("recovered weight {weight} for node {node} is not positive")]
    NonPositiveWeight { node: f64, weight: f64 },
    #[error(
        "cross-section arrays disagree on grid length: cutoff={cutoff}, screened_rutherford={screened_rutherford}, auxiliary={auxiliary}"
    )]
    GridLengthMismatch {
        cutoff: usize,
        screened_rutherford: usize,
        auxiliary: usize,
    },
}

/// Discrete angles and weights standing in for the continuous distribution
/// above the cutoff, plus the factor by which the elastic cross section
/// shrinks when the forward mass is absorbed into it.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DiscreteAngularDistribution {
    pub angles: Vec<f64>,
    pub weights: Vec<f64>,
    pub cross_section_reduction_factor: f64,
}

pub struct MomentPreservingElasticReducer {
    cutoff_angle_cosine: f64,
    discrete_angle_count: usize,
}

impl MomentPreservingElasticReducer {
    pub fn new(
        cutoff_angle_cosine: f64,
        discrete_angle_count: usize,
    ) -> Result<Self, ReductionError> {
        if !cutoff_angle_cosine.is_finite()
            || cutoff_angle_cosine < -1.0
            || cutoff_angle_cosine >= 1.0
        {
            return Err(ReductionError::InvalidCutoffAngleCosine {
                value: cutoff_angle_cosine,
            });
        }
        Ok(Self {
            cutoff_angle_cosine,
            discrete_angle_count,
        })
    }

    /// A reduction only makes sense with at least one discrete angle and a
    /// cutoff below the forward peak boundary; otherwise the tabulated
    /// distribution is kept as-is.
    pub fn is_active(&self) -> bool {
        self.discrete_angle_count >= 1
            && self.cutoff_angle_cosine < RUTHERFORD_PEAK_ANGLE_COSINE
    }

    pub fn cutoff_angle_cosine(&self) -> f64 {
        self.cutoff_angle_cosine
    }

    pub fn reduce(
        &self,
        evaluator: &ElasticMomentEvaluator,
    ) -> Result<DiscreteAngularDistribution, ReductionError> {
        if !self.is_active() {
            return Err(ReductionError::Inactive {
                cutoff_angle_cosine: self.cutoff_angle_cosine,
                discrete_angle_count: self.discrete_angle_count,
            });
        }

        // One extra node is pinned at mu = 1 and dropped after inversion, so
        // the caller gets exactly the requested number of discrete angles.
        let node_count = self.discrete_angle_count + 1;
        let legendre_moments = evaluator
            .legendre_moments(self.cutoff_angle_cosine, 2 * node_count)?;

        let retained_mass = legendre_moments[0];
        if !(retained_mass > 0.0) {
            return Err(ReductionError::VanishingRetainedMass {
                mass: retained_mass,
            });
        }
        let normalized: Vec<f64> = legendre_moments
            .iter()
            .map(|&moment| moment / retained_mass)
            .collect();

        let power_moments = power_moments_from_legendre_moments(&normalized);
        let rule = radau_quadrature(&power_moments, node_count, 1.0)?;

        // Nodes come back ascending; the last one must be the pinned
        // forward node, which the discrete representation does not carry.
        let last_node = rule.nodes[rule.nodes.len() - 1];
        if (last_node - 1.0).abs() > FIXED_NODE_TOLERANCE {
            return Err(ReductionError::MissingFixedNode { node: last_node });
        }
        let angles = rule.nodes[..rule.nodes.len() - 1].to_vec();
        let raw_weights = &rule.weights[..rule.weights.len() - 1];

        let mut retained = CompensatedSum::default();
        for (&node, &weight) in angles.iter().zip(raw_weights) {
            if node < self.cutoff_angle_cosine - NODE_RANGE_SLACK || node >= 1.0 {
                return Err(ReductionError::NodeOutsideRange {
                    node,
                    lower: self.cutoff_angle_cosine,
                });
            }
            if !(weight > 0.0) {
                return Err(ReductionError::NonPositiveWeight { node, weight });
            }
            retained.add(weight);
        }
        let reduction_factor = retained.value();
        if !(reduction_factor > 0.0) {
            return Err(ReductionError::VanishingRetainedMass {
                mass: reduction_factor,
            });
        }

        let weights = raw_weights
            .iter()
            .map(|&weight| weight / reduction_factor)
            .collect();

        tracing::debug!(
            discrete_angles = angles.len(),
            reduction_factor,
            "reduced elastic distribution"
        );
        Ok(DiscreteAngularDistribution {
            angles,
            weights,
            cross_section_reduction_factor: reduction_factor,
        })
    }
}

/// Moment-preserving elastic cross section on the union grid:
/// `rf(E) * [sr(E) + (1 - cdf(E)) * cutoff(E)]` from the cutoff threshold
/// up, where `cdf(E)` is the cutoff distribution's cdf at the cutoff angle
/// cosine and `rf(E)` the per-energy reduction factor.
pub fn moment_preserving_cross_section(
    cutoff_cross_section: &ThresholdIndexedArray,
    screened_rutherford_cross_section: &ThresholdIndexedArray,
    cutoff_cdf_values: &[f64],
    reduction_factors: &[f64],
) -> Result<ThresholdIndexedArray, ReductionError> {
    let grid_len = cutoff_cross_section.grid_len();
    if screened_rutherford_cross_section.grid_len() != grid_len
        || cutoff_cdf_values.len() != grid_len
        || reduction_factors.len() != grid_len
    {
        return Err(ReductionError::GridLengthMismatch {
            cutoff: grid_len,
            screened_rutherford: screened_rutherford_cross_section.grid_len(),
            auxiliary: cutoff_cdf_values.len().min(reduction_factors.len()),
        });
    }

    let threshold_index = cutoff_cross_section.threshold_index;
    let values = (threshold_index..grid_len)
        .map(|index| {
            reduction_factors[index]
                * (screened_rutherford_cross_section.value_at(index)
                    + (1.0 - cutoff_cdf_values[index]) * cutoff_cross_section.value_at(index))
        })
        .collect();

    Ok(ThresholdIndexedArray {
        threshold_index,
        values,
    })
}
