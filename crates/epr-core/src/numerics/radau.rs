//! Moment-problem inversion for the moment-preserving elastic reduction.
//!
//! Given the monomial moments of a distribution, recover an n-node
//! Gauss-Radau rule (one node pinned at a chosen endpoint) that reproduces
//! those moments: Chebyshev algorithm for the three-term recurrence,
//! Golub's endpoint modification of the final diagonal entry, then an
//! implicit-shift QL eigen solve of the symmetric tridiagonal Jacobi matrix
//! whose eigenvalues are the nodes and whose first eigenvector components
//! square to the weights (Golub-Welsch).

use faer::Mat;

const QL_MAX_ITERATIONS: u32 = 50;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MomentInversionError {
    #[error("{node_count} nodes require at least {required} moments, got {actual}")]
    InsufficientMoments {
        node_count: usize,
        required: usize,
        actual: usize,
    },
    #[error("node count must be at least 1")]
    NoNodesRequested,
    #[error("zeroth moment must be finite and positive, got {value}")]
    NonPositiveZerothMoment { value: f64 },
    #[error("moment {index} is not finite: {value}")]
    NonFiniteMoment { index: usize, value: f64 },
    #[error(
        "moment sequence is degenerate: recurrence coefficient beta[{order}] = {value} is not positive"
    )]
    DegenerateMomentSequence { order: usize, value: f64 },
    #[error(
        "endpoint {endpoint} is a root of the orthogonal polynomial of degree {degree}; the Radau modification is singular"
    )]
    SingularEndpointModification { endpoint: f64, degree: f64 },
    #[error("tridiagonal QL failed to converge for eigenvalue index {index} after {iterations} iterations")]
    EigenSolveDivergence { index: usize, iterations: u32 },
}

/// Nodes and weights of a recovered quadrature rule, sorted by ascending
/// node. The weights sum to the zeroth input moment.
#[derive(Debug, Clone, PartialEq)]
pub struct RadauQuadrature {
    pub nodes: Vec<f64>,
    pub weights: Vec<f64>,
}

/// Recover an `node_count`-node Gauss-Radau rule from monomial moments
/// `m_0 .. m_{2 node_count - 1}`, with one node fixed at `fixed_node`.
pub fn radau_quadrature(
    power_moments: &[f64],
    node_count: usize,
    fixed_node: f64,
) -> Result<RadauQuadrature, MomentInversionError> {
    if node_count == 0 {
        return Err(MomentInversionError::NoNodesRequested);
    }
    let required = 2 * node_count;
    if power_moments.len() < required {
        return Err(MomentInversionError::InsufficientMoments {
            node_count,
            required,
            actual: power_moments.len(),
        });
    }
    for (index, &value) in power_moments.iter().enumerate() {
        if !value.is_finite() {
            return Err(MomentInversionError::NonFiniteMoment { index, value });
        }
    }
    let zeroth = power_moments[0];
    if zeroth <= 0.0 {
        return Err(MomentInversionError::NonPositiveZerothMoment { value: zeroth });
    }

    if node_count == 1 {
        // All represented mass sits on the fixed node.
        return Ok(RadauQuadrature {
            nodes: vec![fixed_node],
            weights: vec![zeroth],
        });
    }

    let (alpha, beta) = recurrence_coefficients(power_moments, node_count)?;
    let jacobi = radau_jacobi_matrix(&alpha, &beta, fixed_node)?;

    let mut diagonal: Vec<f64> = (0..node_count).map(|i| jacobi[(i, i)]).collect();
    let mut off_diagonal: Vec<f64> = (0..node_count - 1).map(|i| jacobi[(i + 1, i)]).collect();
    let mut first_components = vec![0.0; node_count];
    first_components[0] = 1.0;

    tridiagonal_ql(&mut diagonal, &mut off_diagonal, &mut first_components)?;

    let mut pairs: Vec<(f64, f64)> = diagonal
        .iter()
        .zip(&first_components)
        .map(|(&node, &component)| (node, zeroth * component * component))
        .collect();
    pairs.sort_by(|lhs, rhs| lhs.0.total_cmp(&rhs.0));

    Ok(RadauQuadrature {
        nodes: pairs.iter().map(|&(node, _)| node).collect(),
        weights: pairs.iter().map(|&(_, weight)| weight).collect(),
    })
}

/// Chebyshev algorithm: monomial moments -> monic three-term recurrence
/// coefficients `alpha_0..alpha_{n-1}`, `beta_0..beta_{n-1}` (with
/// `beta_0 = m_0` by convention). A non-positive `beta_k` means the moment
/// sequence is not generated by a nonnegative measure with at least `n`
/// points of support, which is exactly the degenerate-distribution case the
/// caller must be told about.
fn recurrence_coefficients(
    moments: &[f64],
    order_count: usize,
) -> Result<(Vec<f64>, Vec<f64>), MomentInversionError> {
    let width = 2 * order_count;
    let mut alpha = Vec::with_capacity(order_count);
    let mut beta = Vec::with_capacity(order_count);
    alpha.push(moments[1] / moments[0]);
    beta.push(moments[0]);

    // sigma rows for degrees k-1 and k-2 of the modified-moment table.
    let mut previous: Vec<f64> = moments[..width].to_vec();
    let mut before_previous = vec![0.0; width];

    for k in 1..order_count {
        let mut current = vec![0.0; width];
        for l in k..=(width - k - 1) {
            current[l] = previous[l + 1] - alpha[k - 1] * previous[l]
                - if k >= 2 { beta[k - 1] * before_previous[l] } else { 0.0 };
        }

        let denominator = previous[k - 1];
        let diagonal = current[k];
        let beta_k = diagonal / denominator;
        if !beta_k.is_finite() || beta_k <= 0.0 {
            return Err(MomentInversionError::DegenerateMomentSequence {
                order: k,
                value: beta_k,
            });
        }
        let alpha_k = current[k + 1] / diagonal - previous[k] / denominator;
        if !alpha_k.is_finite() {
            return Err(MomentInversionError::DegenerateMomentSequence {
                order: k,
                value: alpha_k,
            });
        }

        alpha.push(alpha_k);
        beta.push(beta_k);
        before_previous = previous;
        previous = current;
    }

    Ok((alpha, beta))
}

/// Assemble the endpoint-modified Jacobi matrix: symmetric tridiagonal with
/// `alpha` on the diagonal (last entry replaced by Golub's Radau
/// modification) and `sqrt(beta_k)` on the off-diagonals.
fn radau_jacobi_matrix(
    alpha: &[f64],
    beta: &[f64],
    fixed_node: f64,
) -> Result<Mat<f64>, MomentInversionError> {
    let dimension = alpha.len();

    // Monic orthogonal polynomials at the fixed endpoint.
    let mut p_previous = 0.0;
    let mut p_current = 1.0;
    for degree in 0..dimension - 1 {
        let p_next = (fixed_node - alpha[degree]) * p_current
            - if degree >= 1 { beta[degree] * p_previous } else { 0.0 };
        p_previous = p_current;
        p_current = p_next;
    }
    if p_current == 0.0 || !p_current.is_finite() {
        return Err(MomentInversionError::SingularEndpointModification {
            endpoint: fixed_node,
            degree: (dimension - 1) as f64,
        });
    }
    let modified_last_diagonal =
        fixed_node - beta[dimension - 1] * p_previous / p_current;

    let mut jacobi = Mat::<f64>::zeros(dimension, dimension);
    for index in 0..dimension {
        jacobi[(index, index)] = if index + 1 == dimension {
            modified_last_diagonal
        } else {
            alpha[index]
        };
    }
    for index in 1..dimension {
        let coupling = beta[index].sqrt();
        jacobi[(index, index - 1)] = coupling;
        jacobi[(index - 1, index)] = coupling;
    }

    Ok(jacobi)
}

/// Implicit-shift QL for a symmetric tridiagonal matrix, rotating a single
/// tracked vector (the first row of the accumulated eigenvector matrix) so
/// the Golub-Welsch weights fall out without storing full eigenvectors.
fn tridiagonal_ql(
    diagonal: &mut [f64],
    off_diagonal: &mut [f64],
    first_components: &mut [f64],
) -> Result<(), MomentInversionError> {
    let dimension = diagonal.len();
    let mut extended_off = off_diagonal.to_vec();
    extended_off.push(0.0);

    for l in 0..dimension {
        let mut iterations = 0;
        loop {
            let mut m = l;
            while m + 1 < dimension {
                let scale = diagonal[m].abs() + diagonal[m + 1].abs();
                if extended_off[m].abs() <= f64::EPSILON * scale {
                    break;
                }
                m += 1;
            }
            if m == l {
                break;
            }

            iterations += 1;
            if iterations > QL_MAX_ITERATIONS {
                return Err(MomentInversionError::EigenSolveDivergence {
                    index: l,
                    iterations,
                });
            }

            let mut g = (diagonal[l + 1] - diagonal[l]) / (2.0 * extended_off[l]);
            let mut r = g.hypot(1.0);
            g = diagonal[m] - diagonal[l]
                + extended_off[l] / (g + if g >= 0.0 { r.abs() } else { -r.abs() });
            let mut s = 1.0;
            let mut c = 1.0;
            let mut p = 0.0;
            let mut underflow = false;

            let mut i = m;
            while i > l {
                i -= 1;
                let mut f = s * extended_off[i];
                let b = c * extended_off[i];
                r = f.hypot(g);
                extended_off[i + 1] = r;
                if r == 0.0 {
                    // Rotation underflowed; deflate and restart this sweep.
                    diagonal[i + 1] -= p;
                    extended_off[m] = 0.0;
                    underflow = true;
                    break;
                }
                s = f / r;
                c = g / r;
                g = diagonal[i + 1] - p;
                r = (diagonal[i] - g) * s + 2.0 * c * b;
                p = s * r;
                diagonal[i + 1] = g + p;
                g = c * r - b;

                f = first_components[i + 1];
                first_components[i + 1] = s * first_components[i] + c * f;
                first_components[i] = c * first_components[i] - s * f;
            }

            if underflow {
                continue;
            }
            diagonal[l] -= p;
            extended_off[l] = g;
            extended_off[m] = 0.0;
        }
    }

    off_diagonal.copy_from_slice(&extended_off[..dimension - 1]);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{radau_quadrature, MomentInversionError, RadauQuadrature};

    fn uniform_moments(count: usize) -> Vec<f64> {
        // f(x) = 1 on [-1, 1]: m_k = 2/(k+1) for even k, 0 for odd k.
        (0..count)
            .map(|k| if k % 2 == 0 { 2.0 / (k as f64 + 1.0) } else { 0.0 })
            .collect()
    }

    fn assert_moments_reproduced(rule: &RadauQuadrature, moments: &[f64], degree: usize) {
        for k in 0..=degree {
            let discrete: f64 = rule
                .nodes
                .iter()
                .zip(&rule.weights)
                .map(|(&node, &weight)| weight * node.powi(k as i32))
                .sum();
            assert!(
                (discrete - moments[k]).abs() <= 1.0e-12,
                "moment {k}: expected {}, got {discrete}",
                moments[k]
            );
        }
    }

    #[test]
    fn single_node_rule_places_all_mass_on_the_fixed_node() {
        let rule = radau_quadrature(&[0.25, 0.2], 1, 1.0).expect("rule");
        assert_eq!(rule.nodes, vec![1.0]);
        assert_eq!(rule.weights, vec![0.25]);
    }

    #[test]
    fn two_node_radau_matches_the_classical_rule() {
        // Gauss-Radau on [-1, 1] with endpoint +1: nodes {-1/3, 1},
        // weights {3/2, 1/2}.
        let rule = radau_quadrature(&uniform_moments(4), 2, 1.0).expect("rule");
        assert!((rule.nodes[0] + 1.0 / 3.0).abs() <= 1.0e-13, "{:?}", rule.nodes);
        assert!((rule.nodes[1] - 1.0).abs() <= 1.0e-13);
        assert!((rule.weights[0] - 1.5).abs() <= 1.0e-13, "{:?}", rule.weights);
        assert!((rule.weights[1] - 0.5).abs() <= 1.0e-13);
    }

    #[test]
    fn three_node_radau_reproduces_uniform_moments_through_degree_four() {
        let moments = uniform_moments(6);
        let rule = radau_quadrature(&moments, 3, 1.0).expect("rule");

        let fixed = rule
            .nodes
            .iter()
            .copied()
            .fold(f64::MIN, f64::max);
        assert!((fixed - 1.0).abs() <= 1.0e-12);
        assert!(rule.weights.iter().all(|&weight| weight > 0.0));
        // n-node Radau is exact through degree 2n - 2.
        assert_moments_reproduced(&rule, &moments, 4);
    }

    #[test]
    fn asymmetric_measure_is_inverted_consistently() {
        // f(x) = 1 + x on [-1, 1]: m_k = 2/(k+1) for even k, 2/(k+2) for odd k.
        let moments: Vec<f64> = (0..6)
            .map(|k| {
                if k % 2 == 0 {
                    2.0 / (k as f64 + 1.0)
                } else {
                    2.0 / (k as f64 + 2.0)
                }
            })
            .collect();
        let rule = radau_quadrature(&moments, 3, 1.0).expect("rule");
        assert!(rule.weights.iter().all(|&weight| weight > 0.0));
        assert_moments_reproduced(&rule, &moments, 4);
    }

    #[test]
    fn weight_sum_equals_the_zeroth_moment() {
        let moments = uniform_moments(8);
        let rule = radau_quadrature(&moments, 4, 1.0).expect("rule");
        let total: f64 = rule.weights.iter().sum();
        assert!((total - moments[0]).abs() <= 1.0e-12);
    }

    #[test]
    fn degenerate_point_mass_is_reported_not_inverted() {
        // All mass at x = 0.4: m_k = 0.4^k. Hankel determinants beyond the
        // first vanish, so beta_1 degenerates.
        let moments: Vec<f64> = (0..4).map(|k| 0.4_f64.powi(k)).collect();
        let error = radau_quadrature(&moments, 2, 1.0).expect_err("degenerate sequence");
        assert!(matches!(
            error,
            MomentInversionError::DegenerateMomentSequence { .. }
        ));
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        let error = radau_quadrature(&[1.0, 0.0], 2, 1.0).expect_err("too few moments");
        assert_eq!(
            error,
            MomentInversionError::InsufficientMoments {
                node_count: 2,
                required: 4,
                actual: 2
            }
        );

        let error = radau_quadrature(&[-1.0, 0.0], 1, 1.0).expect_err("negative zeroth moment");
        assert_eq!(
            error,
            MomentInversionError::NonPositiveZerothMoment { value: -1.0 }
        );

        let error = radau_quadrature(&[1.0, 0.0], 0, 1.0).expect_err("zero nodes");
        assert_eq!(error, MomentInversionError::NoNodesRequested);
    }
}
