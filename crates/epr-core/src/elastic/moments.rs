//! Legendre moments of the combined elastic angular distribution.
//!
//! The combined distribution is the tabulated cutoff pdf up to the forward
//! peak boundary (angle cosine 0.999999) joined to the analytic
//! screened-Rutherford tail above it. Moment-preserving reduction needs the
//! partial Legendre moments of that distribution from the cutoff angle
//! cosine up to one; the tabulated span is integrated adaptively at the
//! moment precision, the tail span analytically for the zeroth moment and
//! adaptively for the rest.

use super::distribution::CutoffElasticDistribution;
use super::rutherford::ScreenedRutherfordTail;
use crate::common::constants::{MOMENT_QUADRATURE_PRECISION, RUTHERFORD_PEAK_ANGLE_COSINE};
use crate::numerics::legendre::legendre;
use crate::numerics::quadrature::{integrate_adaptive, CompensatedSum, QuadratureError};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MomentEvaluationError {
    #[error("lower angle cosine {lower_mu} is outside the distribution range")]
    LowerBoundOutOfRange { lower_mu: f64 },
    #[error("Legendre moment of order {order} failed to integrate: {source}")]
    MomentQuadrature {
        order: usize,
        source: QuadratureError,
    },
}

/// Tabulated cutoff pdf with an optional screened-Rutherford tail above the
/// forward peak boundary. Without a tail the tabulated pdf covers its full
/// range alone.
#[derive(Debug, Clone)]
pub struct CombinedElasticDistribution {
    cutoff: CutoffElasticDistribution,
    tail: Option<ScreenedRutherfordTail>,
}

impl CombinedElasticDistribution {
    pub fn new(cutoff: CutoffElasticDistribution, tail: Option<ScreenedRutherfordTail>) -> Self {
        Self { cutoff, tail }
    }

    pub fn cutoff(&self) -> &CutoffElasticDistribution {
        &self.cutoff
    }

    pub fn pdf(&self, mu: f64) -> f64 {
        match &self.tail {
            Some(tail) if mu > RUTHERFORD_PEAK_ANGLE_COSINE => {
                if mu <= 1.0 {
                    tail.evaluate(mu)
                } else {
                    0.0
                }
            }
            _ => self.cutoff.pdf(mu),
        }
    }

    fn tabulated_upper_bound(&self) -> f64 {
        if self.tail.is_some() {
            RUTHERFORD_PEAK_ANGLE_COSINE.min(self.cutoff.cutoff_angle_cosine())
        } else {
            self.cutoff.cutoff_angle_cosine()
        }
    }
}

/// Evaluates partial Legendre moments of a combined elastic distribution
/// over `[lower_mu, 1]`.
pub struct ElasticMomentEvaluator {
    distribution: CombinedElasticDistribution,
    precision: f64,
}

impl ElasticMomentEvaluator {
    pub fn new(distribution: CombinedElasticDistribution) -> Self {
        Self {
            distribution,
            precision: MOMENT_QUADRATURE_PRECISION,
        }
    }

    /// Moments `L_k = ∫_{lower_mu}^{1} P_k(mu) f(mu) dmu` for
    /// `k = 0 .. moment_count - 1`. These are moments of the unnormalized
    /// restriction, so `L_0` is the retained probability mass above
    /// `lower_mu`.
    pub fn legendre_moments(
        &self,
        lower_mu: f64,
        moment_count: usize,
    ) -> Result<Vec<f64>, MomentEvaluationError> {
        if !lower_mu.is_finite() || lower_mu < -1.0 || lower_mu >= 1.0 {
            return Err(MomentEvaluationError::LowerBoundOutOfRange { lower_mu });
        }

        let tabulated_upper = self.distribution.tabulated_upper_bound();
        let mut moments = Vec::with_capacity(moment_count);
        for order in 0..moment_count {
            let mut moment = CompensatedSum::default();

            if lower_mu < tabulated_upper {
                let tabulated = integrate_adaptive(
                    &|mu| legendre(order, mu) * self.distribution.cutoff.pdf(mu),
                    lower_mu,
                    tabulated_upper,
                    self.precision,
                )
                .map_err(|source| MomentEvaluationError::MomentQuadrature { order, source })?;
                moment.add(tabulated);
            }

            if let Some(tail) = &self.distribution.tail {
                let contribution = if order == 0 {
                    tail.integral()
                } else {
                    integrate_adaptive(
                        &|mu| legendre(order, mu) * tail.evaluate(mu),
                        RUTHERFORD_PEAK_ANGLE_COSINE,
                        1.0,
                        self.precision,
                    )
                    .map_err(|source| MomentEvaluationError::MomentQuadrature { order, source })?
                };
                moment.add(contribution);
            }

            moments.push(moment.value());
        }
        Ok(moments)
    }
}

#[cfg(test)]
mod tests {
    use super::{CombinedElasticDistribution, ElasticMomentEvaluator, MomentEvaluationError};
    use crate::elastic::distribution::CutoffElasticDistribution;
    use crate::elastic::rutherford::ScreenedRutherfordTail;

    fn uniform_distribution() -> CombinedElasticDistribution {
        let cutoff =
            CutoffElasticDistribution::new(vec![-1.0, 1.0], vec![1.0, 1.0]).expect("uniform");
        CombinedElasticDistribution::new(cutoff, None)
    }

    #[test]
    fn uniform_moments_match_closed_forms() {
        // f = 1/2 on [-1, 1]: over [0, 1] L_0 is 1/2, L_1 is 1/4 and L_2
        // vanishes because (mu^3 - mu) is zero at both endpoints.
        let evaluator = ElasticMomentEvaluator::new(uniform_distribution());
        let moments = evaluator.legendre_moments(0.0, 3).expect("moments");
        assert!((moments[0] - 0.5).abs() <= 1.0e-12);
        assert!((moments[1] - 0.25).abs() <= 1.0e-12);
        assert!(moments[2].abs() <= 1.0e-12);
    }

    #[test]
    fn full_range_zeroth_moment_is_the_total_mass() {
        let evaluator = ElasticMomentEvaluator::new(uniform_distribution());
        let moments = evaluator.legendre_moments(-1.0, 1).expect("moments");
        assert!((moments[0] - 1.0).abs() <= 1.0e-12);
    }

    #[test]
    fn linear_pdf_moments_match_hand_integration() {
        // Raw pdf (2 - mu) / 3 on [0, 1] integrates to 1/2, so the
        // normalized pdf is 2 (2 - mu) / 3 and over [0.9, 1]:
        // L_0 = 0.07, L_1 = 2/3 * (2/3 - 0.567) = 0.0664444...
        let cutoff =
            CutoffElasticDistribution::new(vec![0.0, 1.0], vec![2.0 / 3.0, 1.0 / 3.0])
                .expect("valid");
        let evaluator =
            ElasticMomentEvaluator::new(CombinedElasticDistribution::new(cutoff, None));
        let moments = evaluator.legendre_moments(0.9, 2).expect("moments");
        assert!((moments[0] - 0.07).abs() <= 1.0e-12, "L0 = {}", moments[0]);
        assert!(
            (moments[1] - 0.066_444_444_444_444_4).abs() <= 1.0e-12,
            "L1 = {}",
            moments[1]
        );
    }

    #[test]
    fn tail_mass_is_added_to_the_zeroth_moment() {
        let cutoff =
            CutoffElasticDistribution::new(vec![-1.0, 1.0], vec![1.0, 1.0]).expect("uniform");
        let tail = ScreenedRutherfordTail::new(1.0e-5, 0.5).expect("tail");
        let tail_mass = tail.integral();
        let with_tail = CombinedElasticDistribution::new(cutoff, Some(tail));

        let evaluator = ElasticMomentEvaluator::new(with_tail);
        let moments = evaluator.legendre_moments(0.0, 2).expect("moments");

        // Tabulated span stops at 0.999999; the remainder comes from the
        // tail in closed form.
        let tabulated_mass = 0.5 * (0.999999 - 0.0);
        assert!(
            (moments[0] - (tabulated_mass + tail_mass)).abs() <= 1.0e-12,
            "L0 = {}",
            moments[0]
        );
        // Over [0.999999, 1] the first-order tail moment is within the
        // interval width of the tail mass itself.
        assert!(moments[1] > 0.0);
    }

    #[test]
    fn out_of_range_lower_bound_is_rejected() {
        let evaluator = ElasticMomentEvaluator::new(uniform_distribution());
        assert!(matches!(
            evaluator.legendre_moments(1.0, 2),
            Err(MomentEvaluationError::LowerBoundOutOfRange { lower_mu }) if lower_mu == 1.0
        ));
    }
}
