//! Screened-Rutherford treatment of the elastic forward peak.
//!
//! Above an angle cosine of 0.999999 the tabulated cutoff distribution
//! gives way to the analytic screened-Rutherford form. The screening is
//! Moliere's, with Seltzer's 1.13 + 3.76 (alpha Z / beta)^2 correction, and
//! the tail pdf is matched continuously to the tabulated pdf at the
//! boundary.

use crate::common::constants::{
    ELECTRON_REST_MASS_MEV, FINE_STRUCTURE, RUTHERFORD_PEAK_ANGLE_COSINE,
    THOMAS_FERMI_RADIUS_FACTOR,
};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RutherfordError {
    #[error("incident energy must be finite and positive, got {energy} MeV")]
    InvalidEnergy { energy: f64 },
    #[error("atomic number must be in [1, 100], got {atomic_number}")]
    InvalidAtomicNumber { atomic_number: u32 },
    #[error("boundary pdf must be finite and non-negative, got {value}")]
    InvalidBoundaryPdf { value: f64 },
}

/// Moliere screening constant eta for an electron of the given kinetic
/// energy (MeV) on an atom of the given Z.
pub fn moliere_screening_constant(energy: f64, atomic_number: u32) -> Result<f64, RutherfordError> {
    if !energy.is_finite() || energy <= 0.0 {
        return Err(RutherfordError::InvalidEnergy { energy });
    }
    if atomic_number == 0 || atomic_number > 100 {
        return Err(RutherfordError::InvalidAtomicNumber { atomic_number });
    }

    let z = f64::from(atomic_number);
    let tau = energy / ELECTRON_REST_MASS_MEV;
    let tau_term = tau * (tau + 2.0);
    let beta_squared = tau_term / ((tau + 1.0) * (tau + 1.0));

    let screening_scale = 0.25 * (FINE_STRUCTURE / THOMAS_FERMI_RADIUS_FACTOR).powi(2)
        * z.powf(2.0 / 3.0);
    let correction = 1.13 + 3.76 * (FINE_STRUCTURE * z).powi(2) / beta_squared;

    Ok(screening_scale / tau_term * correction)
}

/// Analytic screened-Rutherford tail over [0.999999, 1], pinned to the
/// tabulated pdf value at the boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenedRutherfordTail {
    eta: f64,
    boundary_pdf: f64,
}

impl ScreenedRutherfordTail {
    pub fn new(eta: f64, boundary_pdf: f64) -> Result<Self, RutherfordError> {
        if !boundary_pdf.is_finite() || boundary_pdf < 0.0 {
            return Err(RutherfordError::InvalidBoundaryPdf {
                value: boundary_pdf,
            });
        }
        Ok(Self { eta, boundary_pdf })
    }

    pub fn eta(&self) -> f64 {
        self.eta
    }

    /// pdf(mu) = pdf_boundary * ((1 - mu_peak + eta) / (1 - mu + eta))^2,
    /// defined for mu in [mu_peak, 1].
    pub fn evaluate(&self, mu: f64) -> f64 {
        let delta_peak = 1.0 - RUTHERFORD_PEAK_ANGLE_COSINE + self.eta;
        let delta = 1.0 - mu + self.eta;
        self.boundary_pdf * (delta_peak / delta) * (delta_peak / delta)
    }

    /// Closed-form integral of the tail pdf over [mu_peak, 1]:
    /// pdf_boundary * (delta + eta) * delta / eta with
    /// delta = 1 - mu_peak.
    pub fn integral(&self) -> f64 {
        let delta = 1.0 - RUTHERFORD_PEAK_ANGLE_COSINE;
        self.boundary_pdf * (delta + self.eta) * delta / self.eta
    }
}

#[cfg(test)]
mod tests {
    use super::{moliere_screening_constant, RutherfordError, ScreenedRutherfordTail};
    use crate::common::constants::RUTHERFORD_PEAK_ANGLE_COSINE;
    use crate::numerics::quadrature::integrate_adaptive;

    #[test]
    fn screening_constant_decreases_with_energy() {
        let low = moliere_screening_constant(1.0e-3, 79).expect("low energy");
        let high = moliere_screening_constant(10.0, 79).expect("high energy");
        assert!(low > high);
        assert!(high > 0.0);
    }

    #[test]
    fn screening_constant_grows_with_atomic_number() {
        let light = moliere_screening_constant(1.0e-2, 6).expect("carbon");
        let heavy = moliere_screening_constant(1.0e-2, 82).expect("lead");
        assert!(heavy > light);
    }

    #[test]
    fn screening_constant_magnitude_is_physical() {
        // For gold at 1 keV eta is small but far from machine scale.
        let eta = moliere_screening_constant(1.0e-3, 79).expect("gold");
        assert!(eta > 1.0e-6 && eta < 1.0, "eta = {eta}");
    }

    #[test]
    fn invalid_arguments_are_rejected() {
        assert_eq!(
            moliere_screening_constant(0.0, 79).expect_err("zero energy"),
            RutherfordError::InvalidEnergy { energy: 0.0 }
        );
        assert_eq!(
            moliere_screening_constant(1.0, 0).expect_err("zero Z"),
            RutherfordError::InvalidAtomicNumber { atomic_number: 0 }
        );
        assert_eq!(
            ScreenedRutherfordTail::new(1.0e-4, -1.0).expect_err("negative pdf"),
            RutherfordError::InvalidBoundaryPdf { value: -1.0 }
        );
    }

    #[test]
    fn tail_is_continuous_at_the_boundary_and_peaks_forward() {
        let tail = ScreenedRutherfordTail::new(1.0e-5, 3.0).expect("tail");
        let boundary = tail.evaluate(RUTHERFORD_PEAK_ANGLE_COSINE);
        assert!((boundary - 3.0).abs() <= 1.0e-12);
        assert!(tail.evaluate(1.0) > boundary);
    }

    #[test]
    fn closed_form_integral_matches_quadrature() {
        let tail = ScreenedRutherfordTail::new(2.5e-5, 7.0).expect("tail");
        let numeric = integrate_adaptive(
            &|mu| tail.evaluate(mu),
            RUTHERFORD_PEAK_ANGLE_COSINE,
            1.0,
            1.0e-16,
        )
        .expect("quadrature");
        let analytic = tail.integral();
        assert!(
            (numeric - analytic).abs() <= 1.0e-12 * analytic.abs().max(1.0),
            "numeric {numeric} vs analytic {analytic}"
        );
    }
}
