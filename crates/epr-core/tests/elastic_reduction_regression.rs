use epr_core::elastic::{
    elastic_angle_cosines, CombinedElasticDistribution, CutoffElasticDistribution,
    ElasticMomentEvaluator, MomentPreservingElasticReducer, ScreenedRutherfordTail,
};

/// The 3-point ENDL fixture stored in "1 - cosine" order, whose normalized
/// pdf is (2 - mu) / 3 over [-1, 1].
fn triangular_distribution() -> CutoffElasticDistribution {
    let angle_cosines = elastic_angle_cosines(&[0.0, 1.0, 2.0]);
    assert_eq!(angle_cosines, vec![-1.0, 0.0, 1.0]);
    CutoffElasticDistribution::new(angle_cosines, vec![1.0, 2.0, 1.0]).expect("valid distribution")
}

fn evaluator_without_tail() -> ElasticMomentEvaluator {
    ElasticMomentEvaluator::new(CombinedElasticDistribution::new(
        triangular_distribution(),
        None,
    ))
}

#[test]
fn single_angle_reduction_recovers_the_hand_solved_node() {
    // For pdf (2 - mu) / 3 above cutoff 0.9 the one-free-node Radau rule is
    // solvable by hand: the free node sits at 0.9328125 and the retained
    // weight is 2048/2709.
    let reducer = MomentPreservingElasticReducer::new(0.9, 1).expect("valid reducer");
    let reduced = reducer
        .reduce(&evaluator_without_tail())
        .expect("reduction succeeds");

    assert_eq!(reduced.angles.len(), 1);
    assert!((reduced.angles[0] - 0.9328125).abs() <= 1.0e-10);
    assert!((reduced.weights[0] - 1.0).abs() <= 1.0e-12);
    assert!((reduced.cross_section_reduction_factor - 2048.0 / 2709.0).abs() <= 1.0e-10);
}

#[test]
fn reduction_preserves_the_first_normalized_moment() {
    let evaluator = evaluator_without_tail();
    let reducer = MomentPreservingElasticReducer::new(0.9, 1).expect("valid reducer");
    let reduced = reducer.reduce(&evaluator).expect("reduction succeeds");

    let moments = evaluator
        .legendre_moments(0.9, 2)
        .expect("moments evaluate");
    let normalized_first = moments[1] / moments[0];

    // The dropped forward node at mu = 1 carries the remaining weight, so
    // the discrete rule reproduces nu_1 as rf * x + (1 - rf).
    let reduction_factor = reduced.cross_section_reduction_factor;
    let discrete_first = reduction_factor * reduced.weights[0] * reduced.angles[0]
        + (1.0 - reduction_factor);
    assert!((discrete_first - normalized_first).abs() <= 1.0e-10);
}

#[test]
fn multi_angle_reduction_yields_ordered_interior_nodes() {
    let angle_cosines = vec![-1.0, -0.5, 0.0, 0.5, 1.0];
    let raw_pdf = vec![0.5, 1.0, 2.0, 3.0, 5.0];
    let cutoff =
        CutoffElasticDistribution::new(angle_cosines, raw_pdf).expect("valid distribution");
    let evaluator =
        ElasticMomentEvaluator::new(CombinedElasticDistribution::new(cutoff, None));

    let reducer = MomentPreservingElasticReducer::new(0.5, 2).expect("valid reducer");
    let reduced = reducer.reduce(&evaluator).expect("reduction succeeds");

    assert_eq!(reduced.angles.len(), 2);
    assert!(reduced.angles[0] < reduced.angles[1]);
    for &angle in &reduced.angles {
        assert!(angle >= 0.5 && angle < 1.0);
    }
    let weight_sum: f64 = reduced.weights.iter().sum();
    assert!((weight_sum - 1.0).abs() <= 1.0e-12);
    assert!(
        reduced.cross_section_reduction_factor > 0.0
            && reduced.cross_section_reduction_factor < 1.0
    );
}

#[test]
fn screened_rutherford_tail_mass_shifts_the_reduction_forward() {
    let boundary_pdf = triangular_distribution().pdf(0.999999);
    let tail = ScreenedRutherfordTail::new(1.0e-7, boundary_pdf).expect("valid tail");
    let with_tail = ElasticMomentEvaluator::new(CombinedElasticDistribution::new(
        triangular_distribution(),
        Some(tail),
    ));

    let reducer = MomentPreservingElasticReducer::new(0.9, 1).expect("valid reducer");
    let reduced_with_tail = reducer.reduce(&with_tail).expect("reduction succeeds");
    let reduced_without_tail = reducer
        .reduce(&evaluator_without_tail())
        .expect("reduction succeeds");

    // The tail concentrates mass near mu = 1, so more of the retained
    // distribution is absorbed into the dropped forward node.
    assert!(
        reduced_with_tail.cross_section_reduction_factor
            < reduced_without_tail.cross_section_reduction_factor
    );
    assert!(reduced_with_tail.angles[0] >= reduced_without_tail.angles[0] - 1.0e-6);
}

#[test]
fn inactive_configurations_refuse_to_reduce() {
    let zero_angles = MomentPreservingElasticReducer::new(0.9, 0).expect("valid reducer");
    assert!(!zero_angles.is_active());
    assert!(zero_angles.reduce(&evaluator_without_tail()).is_err());

    let cutoff_at_peak =
        MomentPreservingElasticReducer::new(0.999999, 1).expect("valid reducer");
    assert!(!cutoff_at_peak.is_active());
}
