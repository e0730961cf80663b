//! Elastic scattering: tabulated cutoff distributions, the analytic
//! screened-Rutherford forward peak, and the moment-preserving reduction
//! that replaces the peak with a few discrete angles.

pub mod distribution;
pub mod moments;
pub mod reducer;
pub mod rutherford;

pub use distribution::{
    elastic_angle_cosines, AngularDistributionError, CutoffElasticDistribution,
};
pub use moments::{CombinedElasticDistribution, ElasticMomentEvaluator, MomentEvaluationError};
pub use reducer::{
    moment_preserving_cross_section, DiscreteAngularDistribution,
    MomentPreservingElasticReducer, ReductionError,
};
pub use rutherford::{moliere_screening_constant, RutherfordError, ScreenedRutherfordTail};
