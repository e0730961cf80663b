//! Tabulated cutoff elastic angular distributions.
//!
//! Source evaluations tabulate the elastic angle as `1 - cosine`, ascending
//! away from the forward direction. Everything downstream works in the angle
//! cosine `mu` directly, ascending toward the forward peak, so the table is
//! reversed and transformed on ingest.

use crate::numerics::tabular::{InterpolationLaw, TabularError, TabularFunction};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AngularDistributionError {
    #[error("angular distribution needs at least two points, got {points}")]
    TooFewPoints { points: usize },
    #[error("angle cosines must be strictly ascending in [-1, 1], violated at index {index}")]
    InvalidAngleGrid { index: usize },
    #[error("pdf values must be finite and non-negative, violated at index {index} with {value}")]
    InvalidPdfValue { index: usize, value: f64 },
    #[error("pdf integrates to a non-positive value {integral}")]
    DegeneratePdf { integral: f64 },
    #[error(transparent)]
    Tabular(#[from] TabularError),
}

/// Convert a `1 - cosine` angle grid (ascending from the forward peak) into
/// ascending angle cosines. The output is the reversed, negated grid.
pub fn elastic_angle_cosines(one_minus_cosines: &[f64]) -> Vec<f64> {
    one_minus_cosines
        .iter()
        .rev()
        .map(|&value| 1.0 - value)
        .collect()
}

/// A normalized lin-lin angular pdf over `[mu_min, mu_cutoff]` with its
/// piecewise-linear analytic cdf.
#[derive(Debug, Clone, PartialEq)]
pub struct CutoffElasticDistribution {
    pdf: TabularFunction,
    cumulative: Vec<f64>,
}

impl CutoffElasticDistribution {
    /// Build from ascending angle cosines and raw (not necessarily
    /// normalized) pdf values. The pdf is renormalized so its trapezoid
    /// integral over the tabulated range is exactly one.
    pub fn new(
        angle_cosines: Vec<f64>,
        raw_pdf: Vec<f64>,
    ) -> Result<Self, AngularDistributionError> {
        if angle_cosines.len() < 2 || raw_pdf.len() < 2 {
            return Err(AngularDistributionError::TooFewPoints {
                points: angle_cosines.len().min(raw_pdf.len()),
            });
        }
        for (index, window) in angle_cosines.windows(2).enumerate() {
            if !(window[0] < window[1]) {
                return Err(AngularDistributionError::InvalidAngleGrid { index: index + 1 });
            }
        }
        if angle_cosines[0] < -1.0 || angle_cosines[angle_cosines.len() - 1] > 1.0 {
            return Err(AngularDistributionError::InvalidAngleGrid { index: 0 });
        }
        for (index, &value) in raw_pdf.iter().enumerate() {
            if !value.is_finite() || value < 0.0 {
                return Err(AngularDistributionError::InvalidPdfValue { index, value });
            }
        }

        let integral = trapezoid_integral(&angle_cosines, &raw_pdf);
        if !(integral > 0.0) {
            return Err(AngularDistributionError::DegeneratePdf { integral });
        }
        let normalized: Vec<f64> = raw_pdf.iter().map(|&value| value / integral).collect();

        let mut cumulative = Vec::with_capacity(angle_cosines.len());
        cumulative.push(0.0);
        let mut running = 0.0;
        for i in 1..angle_cosines.len() {
            let width = angle_cosines[i] - angle_cosines[i - 1];
            running += 0.5 * (normalized[i - 1] + normalized[i]) * width;
            cumulative.push(running);
        }
        // Roundoff in the running sum is pinned so the cdf ends exactly at 1.
        if let Some(last) = cumulative.last_mut() {
            *last = 1.0;
        }

        let pdf = TabularFunction::new(angle_cosines, normalized, InterpolationLaw::LinLin)?;
        Ok(Self { pdf, cumulative })
    }

    pub fn cutoff_angle_cosine(&self) -> f64 {
        self.pdf.upper_bound()
    }

    pub fn min_angle_cosine(&self) -> f64 {
        self.pdf.lower_bound()
    }

    /// Normalized pdf at `mu`; zero outside the tabulated range.
    pub fn pdf(&self, mu: f64) -> f64 {
        self.pdf.evaluate(mu)
    }

    /// Analytic cdf at `mu`. A lin-lin pdf integrates to a quadratic within
    /// each bin, so the cdf is evaluated in closed form rather than through
    /// quadrature. Clamps to 0 below the range and 1 above it.
    pub fn cdf(&self, mu: f64) -> f64 {
        let grid = self.pdf.grid();
        if mu <= grid[0] {
            return 0.0;
        }
        if mu >= grid[grid.len() - 1] {
            return 1.0;
        }
        let upper = grid.partition_point(|&x| x <= mu);
        let lower = upper - 1;
        let pdf_values = self.pdf.values();
        let width = grid[upper] - grid[lower];
        let fraction = (mu - grid[lower]) / width;
        let pdf_at_mu = pdf_values[lower] + fraction * (pdf_values[upper] - pdf_values[lower]);
        self.cumulative[lower] + 0.5 * (pdf_values[lower] + pdf_at_mu) * (mu - grid[lower])
    }
}

fn trapezoid_integral(x: &[f64], y: &[f64]) -> f64 {
    x.windows(2)
        .zip(y.windows(2))
        .map(|(xs, ys)| 0.5 * (ys[0] + ys[1]) * (xs[1] - xs[0]))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::{elastic_angle_cosines, AngularDistributionError, CutoffElasticDistribution};

    #[test]
    fn angle_conversion_reverses_and_negates() {
        let cosines = elastic_angle_cosines(&[0.0, 0.5, 1.0, 2.0]);
        assert_eq!(cosines, vec![-1.0, 0.0, 0.5, 1.0]);
    }

    #[test]
    fn pdf_is_renormalized_to_unit_integral() {
        // Raw pdf integrates to 4 over [-1, 1]; normalization divides by 4.
        let distribution =
            CutoffElasticDistribution::new(vec![-1.0, 1.0], vec![2.0, 2.0]).expect("valid");
        assert!((distribution.pdf(0.0) - 0.5).abs() <= 1.0e-15);
        assert_eq!(distribution.cdf(1.0), 1.0);
    }

    #[test]
    fn cdf_of_a_uniform_pdf_is_linear() {
        let distribution =
            CutoffElasticDistribution::new(vec![-1.0, 1.0], vec![1.0, 1.0]).expect("valid");
        assert!((distribution.cdf(0.0) - 0.5).abs() <= 1.0e-15);
        assert!((distribution.cdf(0.5) - 0.75).abs() <= 1.0e-15);
        assert_eq!(distribution.cdf(-1.5), 0.0);
        assert_eq!(distribution.cdf(1.5), 1.0);
    }

    #[test]
    fn cdf_is_quadratic_within_a_linear_bin() {
        // pdf(mu) = (2 - mu) / 3 on [0, 1] integrates to
        // (2 mu - mu^2 / 2) / 3.
        let distribution =
            CutoffElasticDistribution::new(vec![0.0, 1.0], vec![2.0 / 3.0, 1.0 / 3.0])
                .expect("valid");
        let analytic = |mu: f64| (2.0 * mu - 0.5 * mu * mu) / 3.0 / 0.5;
        for &mu in &[0.1, 0.25, 0.5, 0.9] {
            // Renormalization divides the raw integral 0.5 out.
            assert!(
                (distribution.cdf(mu) - analytic(mu)).abs() <= 1.0e-14,
                "cdf({mu})"
            );
        }
    }

    #[test]
    fn cdf_agrees_with_stored_breakpoints() {
        let distribution = CutoffElasticDistribution::new(
            vec![-1.0, -0.5, 0.2, 0.9],
            vec![0.1, 0.4, 0.8, 3.0],
        )
        .expect("valid");
        assert_eq!(distribution.cdf(-1.0), 0.0);
        assert_eq!(distribution.cdf(0.9), 1.0);
        // Monotone non-decreasing across bins.
        let mut previous = 0.0;
        let mut mu = -1.0;
        while mu <= 0.9 {
            let value = distribution.cdf(mu);
            assert!(value >= previous);
            previous = value;
            mu += 0.01;
        }
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        assert!(matches!(
            CutoffElasticDistribution::new(vec![0.0], vec![1.0]),
            Err(AngularDistributionError::TooFewPoints { points: 1 })
        ));
        assert!(matches!(
            CutoffElasticDistribution::new(vec![0.0, 0.0], vec![1.0, 1.0]),
            Err(AngularDistributionError::InvalidAngleGrid { index: 1 })
        ));
        assert!(matches!(
            CutoffElasticDistribution::new(vec![0.0, 1.0], vec![1.0, -0.5]),
            Err(AngularDistributionError::InvalidPdfValue { index: 1, .. })
        ));
        assert!(matches!(
            CutoffElasticDistribution::new(vec![0.0, 1.0], vec![0.0, 0.0]),
            Err(AngularDistributionError::DegeneratePdf { .. })
        ));
    }
}
