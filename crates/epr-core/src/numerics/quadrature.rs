//! Adaptive definite integration for moment evaluation.
//!
//! Adaptive Simpson with Richardson error control: each interval is accepted
//! when `|S(a,m) + S(m,b) - S(a,b)| <= 15 * tolerance`, otherwise split. The
//! traversal is an explicit stack so independent sub-intervals remain
//! independent, and the accumulation is compensated to hold the tight
//! precision targets the moment evaluator asks for.

const MAX_SUBDIVISION_DEPTH: u32 = 60;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QuadratureError {
    #[error("integration bounds must be finite with lower < upper, got [{lower}, {upper}]")]
    InvalidBounds { lower: f64, upper: f64 },
    #[error("integration tolerance must be finite and positive, got {tolerance}")]
    InvalidTolerance { tolerance: f64 },
    #[error("integrand evaluated to a non-finite value at x = {abscissa}")]
    NonFiniteEvaluation { abscissa: f64 },
    #[error(
        "failed to reach tolerance {tolerance} over [{lower}, {upper}] after depth {depth} subdivision"
    )]
    SubdivisionLimit {
        lower: f64,
        upper: f64,
        tolerance: f64,
        depth: u32,
    },
}

/// Compensated (Kahan) accumulator used wherever long sums of small
/// contributions must not lose the low-order bits.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompensatedSum {
    sum: f64,
    compensation: f64,
}

impl CompensatedSum {
    pub fn add(&mut self, value: f64) {
        let corrected = value - self.compensation;
        let next = self.sum + corrected;
        self.compensation = (next - self.sum) - corrected;
        self.sum = next;
    }

    pub fn value(&self) -> f64 {
        self.sum
    }
}

struct Segment {
    lower: f64,
    upper: f64,
    f_lower: f64,
    f_mid: f64,
    f_upper: f64,
    simpson: f64,
    tolerance: f64,
    depth: u32,
}

/// Integrate `integrand` over `[lower, upper]` to the requested absolute
/// tolerance. The tolerance is split between halves at every subdivision.
pub fn integrate_adaptive(
    integrand: &dyn Fn(f64) -> f64,
    lower: f64,
    upper: f64,
    tolerance: f64,
) -> Result<f64, QuadratureError> {
    if !lower.is_finite() || !upper.is_finite() || lower >= upper {
        return Err(QuadratureError::InvalidBounds { lower, upper });
    }
    if !tolerance.is_finite() || tolerance <= 0.0 {
        return Err(QuadratureError::InvalidTolerance { tolerance });
    }

    let evaluate = |x: f64| -> Result<f64, QuadratureError> {
        let value = integrand(x);
        if value.is_finite() {
            Ok(value)
        } else {
            Err(QuadratureError::NonFiniteEvaluation { abscissa: x })
        }
    };

    let midpoint = 0.5 * (lower + upper);
    let f_lower = evaluate(lower)?;
    let f_mid = evaluate(midpoint)?;
    let f_upper = evaluate(upper)?;
    let whole = simpson(lower, upper, f_lower, f_mid, f_upper);

    let mut accumulated = CompensatedSum::default();
    let mut stack = vec![Segment {
        lower,
        upper,
        f_lower,
        f_mid,
        f_upper,
        simpson: whole,
        tolerance,
        depth: 0,
    }];

    while let Some(segment) = stack.pop() {
        let mid = 0.5 * (segment.lower + segment.upper);
        let left_mid = 0.5 * (segment.lower + mid);
        let right_mid = 0.5 * (mid + segment.upper);
        let f_left_mid = evaluate(left_mid)?;
        let f_right_mid = evaluate(right_mid)?;

        let left = simpson(segment.lower, mid, segment.f_lower, f_left_mid, segment.f_mid);
        let right = simpson(mid, segment.upper, segment.f_mid, f_right_mid, segment.f_upper);
        let difference = left + right - segment.simpson;

        if difference.abs() <= 15.0 * segment.tolerance {
            accumulated.add(left + right + difference / 15.0);
            continue;
        }

        if segment.depth >= MAX_SUBDIVISION_DEPTH {
            return Err(QuadratureError::SubdivisionLimit {
                lower: segment.lower,
                upper: segment.upper,
                tolerance: segment.tolerance,
                depth: segment.depth,
            });
        }

        let half_tolerance = 0.5 * segment.tolerance;
        stack.push(Segment {
            lower: mid,
            upper: segment.upper,
            f_lower: segment.f_mid,
            f_mid: f_right_mid,
            f_upper: segment.f_upper,
            simpson: right,
            tolerance: half_tolerance,
            depth: segment.depth + 1,
        });
        stack.push(Segment {
            lower: segment.lower,
            upper: mid,
            f_lower: segment.f_lower,
            f_mid: f_left_mid,
            f_upper: segment.f_mid,
            simpson: left,
            tolerance: half_tolerance,
            depth: segment.depth + 1,
        });
    }

    Ok(accumulated.value())
}

fn simpson(lower: f64, upper: f64, f_lower: f64, f_mid: f64, f_upper: f64) -> f64 {
    (upper - lower) / 6.0 * (f_lower + 4.0 * f_mid + f_upper)
}

#[cfg(test)]
mod tests {
    use super::{integrate_adaptive, CompensatedSum, QuadratureError};

    #[test]
    fn polynomials_integrate_exactly() {
        // Simpson is exact for cubics; the adaptive wrapper must not degrade that.
        let cubic = |x: f64| 2.0 * x * x * x - x + 0.5;
        let actual = integrate_adaptive(&cubic, -1.0, 2.0, 1.0e-13).expect("integration");
        // Antiderivative: x^4/2 - x^2/2 + x/2 evaluated over [-1, 2].
        let expected = (8.0 - 2.0 + 1.0) - (0.5 - 0.5 - 0.5);
        assert!((actual - expected).abs() <= 1.0e-12, "got {actual}");
    }

    #[test]
    fn smooth_transcendental_reaches_tight_tolerance() {
        let actual =
            integrate_adaptive(&|x: f64| x.exp(), 0.0, 1.0, 1.0e-13).expect("integration");
        let expected = 1.0_f64.exp() - 1.0;
        assert!((actual - expected).abs() <= 1.0e-12, "got {actual}");
    }

    #[test]
    fn sharply_peaked_integrand_converges() {
        // Narrow Lorentzian, analytic integral via arctan.
        let gamma = 1.0e-3;
        let peaked = move |x: f64| gamma / (gamma * gamma + x * x);
        let actual = integrate_adaptive(&peaked, -1.0, 1.0, 1.0e-12).expect("integration");
        let expected = 2.0 * (1.0 / gamma).atan();
        assert!(
            (actual - expected).abs() <= 1.0e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        let error = integrate_adaptive(&|x| x, 1.0, 1.0, 1.0e-10).expect_err("empty interval");
        assert_eq!(
            error,
            QuadratureError::InvalidBounds {
                lower: 1.0,
                upper: 1.0
            }
        );

        let error = integrate_adaptive(&|x| x, 0.0, 1.0, 0.0).expect_err("zero tolerance");
        assert_eq!(error, QuadratureError::InvalidTolerance { tolerance: 0.0 });

        let error = integrate_adaptive(&|x| 1.0 / x, 0.0, 1.0, 1.0e-10)
            .expect_err("singular integrand should fail");
        assert!(matches!(
            error,
            QuadratureError::NonFiniteEvaluation { .. } | QuadratureError::SubdivisionLimit { .. }
        ));
    }

    #[test]
    fn compensated_sum_holds_small_terms() {
        let mut sum = CompensatedSum::default();
        sum.add(1.0);
        for _ in 0..1_000_000 {
            sum.add(1.0e-16);
        }
        assert!((sum.value() - (1.0 + 1.0e-10)).abs() <= 1.0e-14);
    }
}
