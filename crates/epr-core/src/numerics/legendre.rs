//! Legendre polynomial recurrences and moment-basis conversions.

/// Evaluate `P_0(x) .. P_max_order(x)` with the three-term recurrence
/// `(k+1) P_{k+1} = (2k+1) x P_k - k P_{k-1}`.
pub fn legendre_sequence(x: f64, max_order: usize) -> Vec<f64> {
    let mut sequence = Vec::with_capacity(max_order + 1);
    sequence.push(1.0);
    if max_order == 0 {
        return sequence;
    }
    sequence.push(x);

    for order in 1..max_order {
        let k = order as f64;
        let next = ((2.0 * k + 1.0) * x * sequence[order] - k * sequence[order - 1]) / (k + 1.0);
        sequence.push(next);
    }
    sequence
}

pub fn legendre(order: usize, x: f64) -> f64 {
    legendre_sequence(x, order)[order]
}

/// Expansion coefficients of the monomial `x^power` in the Legendre basis:
/// returns `c` with `x^power = sum_j c[j] P_j(x)`.
///
/// Built by repeatedly applying `x P_j = ((j+1) P_{j+1} + j P_{j-1}) / (2j+1)`
/// to the coefficient vector, which is exact in floating point up to
/// rounding of the rational coefficients.
pub fn monomial_in_legendre_basis(power: usize) -> Vec<f64> {
    let mut coefficients = vec![0.0; power + 1];
    coefficients[0] = 1.0;

    for _ in 0..power {
        let mut next = vec![0.0; power + 1];
        for (j, &coefficient) in coefficients.iter().enumerate() {
            if coefficient == 0.0 {
                continue;
            }
            let jf = j as f64;
            if j + 1 <= power {
                next[j + 1] += coefficient * (jf + 1.0) / (2.0 * jf + 1.0);
            }
            if j > 0 {
                next[j - 1] += coefficient * jf / (2.0 * jf + 1.0);
            }
        }
        coefficients = next;
    }
    coefficients
}

/// Convert a sequence of Legendre moments `L_k = ∫ P_k(x) f(x) dx` into the
/// monomial (power) moments `m_k = ∫ x^k f(x) dx` over the same measure.
///
/// Exact because each monomial is a finite Legendre combination; no
/// quadrature is involved.
pub fn power_moments_from_legendre_moments(legendre_moments: &[f64]) -> Vec<f64> {
    legendre_moments
        .iter()
        .enumerate()
        .map(|(power, _)| {
            monomial_in_legendre_basis(power)
                .iter()
                .zip(legendre_moments)
                .map(|(&coefficient, &moment)| coefficient * moment)
                .sum()
        })
        .collect()
}
