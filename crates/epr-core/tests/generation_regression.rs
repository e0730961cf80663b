use std::collections::BTreeMap;

use epr_core::data::extractors::{RawTable, RecoilTable};
use epr_core::grid::generator::DirtyConvergencePolicy;
use epr_core::{
    ElectronPhotonRelaxationDataContainer, EndlElectronTable, GeneratorConfig, PhotoatomicTable,
    StandardGenerator,
};

fn carbon_config() -> GeneratorConfig {
    GeneratorConfig {
        atomic_number: 6,
        min_photon_energy: 1.0e-3,
        max_photon_energy: 20.0,
        min_electron_energy: 1.0e-5,
        max_electron_energy: 1.0e5,
        occupation_number_evaluation_tolerance: 1.0e-3,
        subshell_incoherent_evaluation_tolerance: 1.0e-3,
        cutoff_angle_cosine: 0.9,
        number_of_moment_preserving_angles: 1,
        grid_convergence_tolerance: 1.0e-3,
        grid_absolute_difference_tolerance: 1.0e-12,
        grid_distance_tolerance: 1.0e-14,
        dirty_convergence_policy: DirtyConvergencePolicy::Strict,
    }
}

fn carbon_photoatomic() -> PhotoatomicTable {
    let grid = vec![1.0e-3, 1.0e-2, 1.0e-1, 1.0, 10.0, 20.0];
    let mut subshell_photoelectric = BTreeMap::new();
    subshell_photoelectric.insert(1_u32, vec![0.0, 0.0, 40.0, 4.0, 0.4, 0.2]);
    let mut profile_grids = BTreeMap::new();
    profile_grids.insert(1_u32, vec![0.0, 1.0, 2.0]);
    let mut profiles = BTreeMap::new();
    profiles.insert(1_u32, vec![1.0, 0.5, 0.0]);

    PhotoatomicTable {
        photon_energy_grid: grid,
        incoherent_cross_section: vec![0.01, 0.1, 0.6, 0.5, 0.2, 0.15],
        coherent_cross_section: vec![2.0, 1.5, 0.5, 0.05, 0.005, 0.002],
        photoelectric_cross_section: vec![50.0, 10.0, 45.0, 4.5, 0.45, 0.22],
        pair_production_cross_section: vec![0.0, 0.0, 0.0, 0.0, 0.05, 0.1],
        average_heating_numbers: vec![5.0e-4, 5.0e-3, 0.05, 0.5, 5.0, 10.0],
        subshell_photoelectric_cross_sections: subshell_photoelectric,
        scattering_function: RawTable {
            grid: vec![0.0, 1.0, 100.0],
            values: vec![0.0, 3.0, 6.0],
        },
        form_factor: RawTable {
            grid: vec![0.0, 1.0, 100.0],
            values: vec![6.0, 3.0, 0.0],
        },
        compton_profile_momentum_grids: profile_grids,
        compton_profiles: profiles,
        impulse_approx_subshell_incoherent_cross_sections: None,
    }
}

fn carbon_endl() -> EndlElectronTable {
    let mut ionization = BTreeMap::new();
    ionization.insert(
        1_u32,
        RawTable {
            grid: vec![2.9e-4, 1.0, 1.0e5],
            values: vec![0.0, 1.0e3, 1.0e2],
        },
    );
    let mut recoil = BTreeMap::new();
    recoil.insert(
        1_u32,
        RecoilTable {
            incident_energy_grid: vec![2.9e-4, 1.0e5],
            recoil_energies: vec![vec![1.0e-7, 1.0e-4], vec![1.0e-7, 5.0e4]],
            recoil_pdf: vec![vec![0.5, 0.5], vec![0.9, 0.1]],
        },
    );

    EndlElectronTable {
        subshell_designators: vec![1],
        subshell_occupancies: vec![2.0],
        subshell_binding_energies: vec![2.9e-4],
        elastic_energy_grid: vec![1.0e-5, 1.0, 1.0e5],
        cutoff_elastic_cross_section: vec![3.0e9, 1.0e6, 2.0e4],
        total_elastic_cross_section: vec![3.0e9, 1.1e6, 5.0e4],
        elastic_angular_energy_grid: vec![1.0e-5, 1.0e5],
        elastic_angles: vec![vec![0.0, 1.0, 2.0], vec![0.0, 1.0, 2.0]],
        elastic_pdf: vec![vec![1.0, 2.0, 1.0], vec![1.0, 2.0, 1.0]],
        bremsstrahlung_cross_section: RawTable {
            grid: vec![1.0e-5, 1.0e5],
            values: vec![1.0e2, 1.0e1],
        },
        bremsstrahlung_photon_energy_grid: vec![1.0e-5, 1.0e5],
        bremsstrahlung_photon_energies: vec![vec![1.0e-7, 1.0e-5], vec![1.0e-7, 1.0e5]],
        bremsstrahlung_photon_pdf: vec![vec![0.5, 0.5], vec![1.0, 1.0e-9]],
        atomic_excitation_cross_section: RawTable {
            grid: vec![1.0e-5, 1.0e5],
            values: vec![1.0e8, 1.0e5],
        },
        atomic_excitation_energy_loss: RawTable {
            grid: vec![1.0e-5, 1.0e5],
            values: vec![9.0e-6, 2.0e-5],
        },
        electroionization_cross_sections: ionization,
        electroionization_recoil: recoil,
    }
}

fn generate() -> ElectronPhotonRelaxationDataContainer {
    StandardGenerator::new(carbon_config(), carbon_photoatomic(), carbon_endl())
        .expect("valid inputs")
        .generate()
        .expect("generation succeeds")
}

#[test]
fn generated_container_is_internally_consistent() {
    let container = generate();

    let parameters = container.generation_parameters().expect("parameters");
    assert_eq!(parameters.atomic_number, 6);
    assert_eq!(parameters.cutoff_angle_cosine, 0.9);

    let photon_grid = container.photon_energy_grid().expect("photon grid");
    assert_eq!(photon_grid[0], 1.0e-3);
    assert_eq!(photon_grid[photon_grid.len() - 1], 20.0);
    for window in photon_grid.windows(2) {
        assert!(window[0] < window[1]);
    }
    let photon_len = photon_grid.len();
    for array in [
        container
            .waller_hartree_incoherent_cross_section()
            .expect("incoherent"),
        container
            .waller_hartree_coherent_cross_section()
            .expect("coherent"),
        container
            .pair_production_cross_section()
            .expect("pair production"),
        container
            .total_photoelectric_cross_section()
            .expect("photoelectric"),
    ] {
        assert_eq!(array.grid_len(), photon_len);
    }
    assert_eq!(
        container
            .average_photon_heating_numbers()
            .expect("heating")
            .len(),
        photon_len
    );
    assert_eq!(
        container
            .waller_hartree_total_cross_section()
            .expect("total")
            .len(),
        photon_len
    );

    let electron_grid = container.electron_energy_grid().expect("electron grid");
    let electron_len = electron_grid.len();
    for array in [
        container.cutoff_elastic_cross_section().expect("cutoff"),
        container
            .screened_rutherford_elastic_cross_section()
            .expect("screened rutherford"),
        container.total_elastic_cross_section().expect("total"),
        container
            .bremsstrahlung_cross_section()
            .expect("bremsstrahlung"),
        container
            .atomic_excitation_cross_section()
            .expect("excitation"),
    ] {
        assert_eq!(array.grid_len(), electron_len);
    }
}

#[test]
fn total_photon_cross_section_is_the_sum_of_its_parts() {
    let container = generate();
    let photon_len = container.photon_energy_grid().expect("photon grid").len();

    let incoherent = container
        .waller_hartree_incoherent_cross_section()
        .expect("incoherent");
    let coherent = container
        .waller_hartree_coherent_cross_section()
        .expect("coherent");
    let pair = container
        .pair_production_cross_section()
        .expect("pair production");
    let photoelectric = container
        .total_photoelectric_cross_section()
        .expect("photoelectric");
    let total = container
        .waller_hartree_total_cross_section()
        .expect("total");

    for index in 0..photon_len {
        let sum = incoherent.value_at(index)
            + coherent.value_at(index)
            + pair.value_at(index)
            + photoelectric.value_at(index);
        let expected = total[index];
        assert!(
            (sum - expected).abs() <= 1.0e-9 * expected.abs().max(1.0),
            "index {index}: {sum} vs {expected}"
        );
    }
}

#[test]
fn screened_rutherford_threshold_matches_the_native_split() {
    let container = generate();
    let grid = container.electron_energy_grid().expect("electron grid");
    let screened = container
        .screened_rutherford_elastic_cross_section()
        .expect("screened rutherford");

    // The native total and cutoff cross sections agree at low energy, so
    // the difference turns on somewhere above the grid minimum.
    assert!(screened.threshold_index > 0);
    assert!(screened.threshold_index < grid.len());
    for &value in &screened.values {
        assert!(value >= 0.0);
    }
}

#[test]
fn moment_preserving_output_covers_the_angular_grid() {
    let container = generate();

    let angular_grid = container
        .elastic_angular_energy_grid()
        .expect("angular grid");
    let distributions = container
        .moment_preserving_distributions()
        .expect("distributions");
    assert_eq!(distributions.len(), angular_grid.len());
    for distribution in distributions {
        assert_eq!(distribution.angles.len(), 1);
        assert!(distribution.angles[0] > 0.9 && distribution.angles[0] < 1.0);
        assert!((distribution.weights[0] - 1.0).abs() <= 1.0e-12);
    }

    let reduced = container
        .moment_preserving_cross_section()
        .expect("reduced cross section");
    let cutoff = container.cutoff_elastic_cross_section().expect("cutoff");
    assert_eq!(reduced.grid_len(), cutoff.grid_len());
    assert_eq!(reduced.threshold_index, cutoff.threshold_index);
    for &value in &reduced.values {
        assert!(value >= 0.0);
    }
}

#[test]
fn container_round_trips_through_a_json_file() {
    let container = generate();
    let temp = tempfile::TempDir::new().expect("tempdir");
    let path = temp.path().join("container.json");
    std::fs::write(&path, serde_json::to_string(&container).expect("serialize"))
        .expect("container written");

    let serialized = std::fs::read_to_string(&path).expect("container read");
    let restored: ElectronPhotonRelaxationDataContainer =
        serde_json::from_str(&serialized).expect("deserialize");

    assert_eq!(
        restored.photon_energy_grid(),
        container.photon_energy_grid()
    );
    assert_eq!(
        restored.moment_preserving_distributions(),
        container.moment_preserving_distributions()
    );
    assert_eq!(
        restored.electroionization_recoil_pdf(),
        container.electroionization_recoil_pdf()
    );
}
