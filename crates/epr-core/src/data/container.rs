//! The generated electron-photon-relaxation data container.
//!
//! A typed record of every quantity a generation run produces. Fields are
//! write-once: a second write to any field is an error, which is what lets
//! the orchestrator stay the single writer without the stages coordinating.
//! Setters validate grid ordering and threshold-array length consistency so
//! a malformed container cannot be constructed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::elastic::reducer::DiscreteAngularDistribution;
use crate::grid::resample::ThresholdIndexedArray;

const WEIGHT_NORMALIZATION_TOLERANCE: f64 = 1.0e-12;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ContainerError {
    #[error("field '{field}' has already been set")]
    FieldAlreadySet { field: &'static str },
    #[error("field '{field}' requires '{requires}' to be set first")]
    MissingPrerequisite {
        field: &'static str,
        requires: &'static str,
    },
    #[error("field '{field}' must be strictly ascending, violated at index {index}")]
    NonAscendingGrid { field: &'static str, index: usize },
    #[error(
        "field '{field}' threshold array does not span the grid: threshold {threshold_index} + {stored} stored values != grid length {grid_len}"
    )]
    ThresholdLengthMismatch {
        field: &'static str,
        threshold_index: usize,
        stored: usize,
        grid_len: usize,
    },
    #[error("field '{field}' expected {expected} entries, got {actual}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("field '{field}' weights sum to {sum}, expected 1")]
    UnnormalizedWeights { field: &'static str, sum: f64 },
}

/// Echo of the configuration a container was generated with, stored so
/// downstream consumers can check consistency against their own settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParameters {
    pub atomic_number: u32,
    pub min_photon_energy: f64,
    pub max_photon_energy: f64,
    pub min_electron_energy: f64,
    pub max_electron_energy: f64,
    pub occupation_number_evaluation_tolerance: f64,
    pub subshell_incoherent_evaluation_tolerance: f64,
    pub cutoff_angle_cosine: f64,
    pub number_of_moment_preserving_angles: usize,
    pub grid_convergence_tolerance: f64,
    pub grid_absolute_difference_tolerance: f64,
    pub grid_distance_tolerance: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElectronPhotonRelaxationDataContainer {
    generation_parameters: Option<GenerationParameters>,

    // Subshell and relaxation data.
    subshells: Option<Vec<u32>>,
    subshell_occupancies: Option<Vec<f64>>,
    subshell_binding_energies: Option<Vec<f64>>,

    // Compton profiles and occupation numbers, keyed by subshell designator.
    compton_profile_momentum_grids: Option<BTreeMap<u32, Vec<f64>>>,
    compton_profiles: Option<BTreeMap<u32, Vec<f64>>>,
    occupation_number_momentum_grids: Option<BTreeMap<u32, Vec<f64>>>,
    occupation_numbers: Option<BTreeMap<u32, Vec<f64>>>,

    // Waller-Hartree scattering function and form factors.
    waller_hartree_scattering_function_momentum_grid: Option<Vec<f64>>,
    waller_hartree_scattering_function: Option<Vec<f64>>,
    waller_hartree_atomic_form_factor_momentum_grid: Option<Vec<f64>>,
    waller_hartree_atomic_form_factor: Option<Vec<f64>>,
    waller_hartree_squared_atomic_form_factor_squared_momentum_grid: Option<Vec<f64>>,
    waller_hartree_squared_atomic_form_factor: Option<Vec<f64>>,

    // Photon union grid and cross sections.
    photon_energy_grid: Option<Vec<f64>>,
    average_photon_heating_numbers: Option<Vec<f64>>,
    waller_hartree_incoherent_cross_section: Option<ThresholdIndexedArray>,
    impulse_approx_subshell_incoherent_cross_sections:
        Option<BTreeMap<u32, ThresholdIndexedArray>>,
    waller_hartree_coherent_cross_section: Option<ThresholdIndexedArray>,
    pair_production_cross_section: Option<ThresholdIndexedArray>,
    subshell_photoelectric_cross_sections: Option<BTreeMap<u32, ThresholdIndexedArray>>,
    total_photoelectric_cross_section: Option<ThresholdIndexedArray>,
    waller_hartree_total_cross_section: Option<Vec<f64>>,

    // Electron union grid and cross sections.
    electron_energy_grid: Option<Vec<f64>>,
    cutoff_elastic_cross_section: Option<ThresholdIndexedArray>,
    screened_rutherford_elastic_cross_section: Option<ThresholdIndexedArray>,
    total_elastic_cross_section: Option<ThresholdIndexedArray>,
    bremsstrahlung_cross_section: Option<ThresholdIndexedArray>,
    atomic_excitation_cross_section: Option<ThresholdIndexedArray>,
    electroionization_cross_sections: Option<BTreeMap<u32, ThresholdIndexedArray>>,

    // Elastic angular data.
    elastic_angular_energy_grid: Option<Vec<f64>>,
    cutoff_elastic_angles: Option<Vec<Vec<f64>>>,
    cutoff_elastic_pdf: Option<Vec<Vec<f64>>>,

    // Moment-preserving data (absent when the reduction is disabled).
    moment_preserving_distributions: Option<Vec<DiscreteAngularDistribution>>,
    moment_preserving_cross_section: Option<ThresholdIndexedArray>,

    // Pass-through secondary distributions.
    bremsstrahlung_photon_energy_grid: Option<Vec<f64>>,
    bremsstrahlung_photon_energies: Option<Vec<Vec<f64>>>,
    bremsstrahlung_photon_pdf: Option<Vec<Vec<f64>>>,
    atomic_excitation_energy_grid: Option<Vec<f64>>,
    atomic_excitation_energy_loss: Option<Vec<f64>>,
    electroionization_recoil_energy_grids: Option<BTreeMap<u32, Vec<f64>>>,
    electroionization_recoil_energies: Option<BTreeMap<u32, Vec<Vec<f64>>>>,
    electroionization_recoil_pdf: Option<BTreeMap<u32, Vec<Vec<f64>>>>,
}

fn set_once<T>(
    slot: &mut Option<T>,
    field: &'static str,
    value: T,
) -> Result<(), ContainerError> {
    if slot.is_some() {
        return Err(ContainerError::FieldAlreadySet { field });
    }
    *slot = Some(value);
    Ok(())
}

fn require_ascending(field: &'static str, grid: &[f64]) -> Result<(), ContainerError> {
    for (index, window) in grid.windows(2).enumerate() {
        if !(window[0] < window[1]) {
            return Err(ContainerError::NonAscendingGrid {
                field,
                index: index + 1,
            });
        }
    }
    Ok(())
}

fn require_spans_grid(
    field: &'static str,
    array: &ThresholdIndexedArray,
    grid_len: usize,
) -> Result<(), ContainerError> {
    if array.grid_len() != grid_len {
        return Err(ContainerError::ThresholdLengthMismatch {
            field,
            threshold_index: array.threshold_index,
            stored: array.values.len(),
            grid_len,
        });
    }
    Ok(())
}

fn require_len(
    field: &'static str,
    expected: usize,
    actual: usize,
) -> Result<(), ContainerError> {
    if expected != actual {
        return Err(ContainerError::LengthMismatch {
            field,
            expected,
            actual,
        });
    }
    Ok(())
}

impl ElectronPhotonRelaxationDataContainer {
    pub fn new() -> Self {
        Self::default()
    }

    fn photon_grid_len(&self, field: &'static str) -> Result<usize, ContainerError> {
        self.photon_energy_grid
            .as_ref()
            .map(Vec::len)
            .ok_or(ContainerError::MissingPrerequisite {
                field,
                requires: "photon_energy_grid",
            })
    }

    fn electron_grid_len(&self, field: &'static str) -> Result<usize, ContainerError> {
        self.electron_energy_grid
            .as_ref()
            .map(Vec::len)
            .ok_or(ContainerError::MissingPrerequisite {
                field,
                requires: "electron_energy_grid",
            })
    }

    fn angular_grid_len(&self, field: &'static str) -> Result<usize, ContainerError> {
        self.elastic_angular_energy_grid
            .as_ref()
            .map(Vec::len)
            .ok_or(ContainerError::MissingPrerequisite {
                field,
                requires: "elastic_angular_energy_grid",
            })
    }

    pub fn set_generation_parameters(
        &mut self,
        parameters: GenerationParameters,
    ) -> Result<(), ContainerError> {
        set_once(
            &mut self.generation_parameters,
            "generation_parameters",
            parameters,
        )
    }

    pub fn set_subshells(&mut self, subshells: Vec<u32>) -> Result<(), ContainerError> {
        set_once(&mut self.subshells, "subshells", subshells)
    }

    pub fn set_subshell_occupancies(
        &mut self,
        occupancies: Vec<f64>,
    ) -> Result<(), ContainerError> {
        let expected = self
            .subshells
            .as_ref()
            .map(Vec::len)
            .ok_or(ContainerError::MissingPrerequisite {
                field: "subshell_occupancies",
                requires: "subshells",
            })?;
        require_len("subshell_occupancies", expected, occupancies.len())?;
        set_once(
            &mut self.subshell_occupancies,
            "subshell_occupancies",
            occupancies,
        )
    }

    pub fn set_subshell_binding_energies(
        &mut self,
        binding_energies: Vec<f64>,
    ) -> Result<(), ContainerError> {
        let expected = self
            .subshells
            .as_ref()
            .map(Vec::len)
            .ok_or(ContainerError::MissingPrerequisite {
                field: "subshell_binding_energies",
                requires: "subshells",
            })?;
        require_len("subshell_binding_energies", expected, binding_energies.len())?;
        set_once(
            &mut self.subshell_binding_energies,
            "subshell_binding_energies",
            binding_energies,
        )
    }

    pub fn set_compton_profile_momentum_grids(
        &mut self,
        grids: BTreeMap<u32, Vec<f64>>,
    ) -> Result<(), ContainerError> {
        for grid in grids.values() {
            require_ascending("compton_profile_momentum_grids", grid)?;
        }
        set_once(
            &mut self.compton_profile_momentum_grids,
            "compton_profile_momentum_grids",
            grids,
        )
    }

    pub fn set_compton_profiles(
        &mut self,
        profiles: BTreeMap<u32, Vec<f64>>,
    ) -> Result<(), ContainerError> {
        set_once(&mut self.compton_profiles, "compton_profiles", profiles)
    }

    pub fn set_occupation_number_momentum_grids(
        &mut self,
        grids: BTreeMap<u32, Vec<f64>>,
    ) -> Result<(), ContainerError> {
        for grid in grids.values() {
            require_ascending("occupation_number_momentum_grids", grid)?;
        }
        set_once(
            &mut self.occupation_number_momentum_grids,
            "occupation_number_momentum_grids",
            grids,
        )
    }

    pub fn set_occupation_numbers(
        &mut self,
        numbers: BTreeMap<u32, Vec<f64>>,
    ) -> Result<(), ContainerError> {
        set_once(&mut self.occupation_numbers, "occupation_numbers", numbers)
    }

    pub fn set_waller_hartree_scattering_function(
        &mut self,
        momentum_grid: Vec<f64>,
        values: Vec<f64>,
    ) -> Result<(), ContainerError> {
        require_ascending("waller_hartree_scattering_function_momentum_grid", &momentum_grid)?;
        require_len(
            "waller_hartree_scattering_function",
            momentum_grid.len(),
            values.len(),
        )?;
        set_once(
            &mut self.waller_hartree_scattering_function_momentum_grid,
            "waller_hartree_scattering_function_momentum_grid",
            momentum_grid,
        )?;
        set_once(
            &mut self.waller_hartree_scattering_function,
            "waller_hartree_scattering_function",
            values,
        )
    }

    pub fn set_waller_hartree_atomic_form_factor(
        &mut self,
        momentum_grid: Vec<f64>,
        values: Vec<f64>,
    ) -> Result<(), ContainerError> {
        require_ascending("waller_hartree_atomic_form_factor_momentum_grid", &momentum_grid)?;
        require_len(
            "waller_hartree_atomic_form_factor",
            momentum_grid.len(),
            values.len(),
        )?;
        set_once(
            &mut self.waller_hartree_atomic_form_factor_momentum_grid,
            "waller_hartree_atomic_form_factor_momentum_grid",
            momentum_grid,
        )?;
        set_once(
            &mut self.waller_hartree_atomic_form_factor,
            "waller_hartree_atomic_form_factor",
            values,
        )
    }

    pub fn set_waller_hartree_squared_atomic_form_factor(
        &mut self,
        squared_momentum_grid: Vec<f64>,
        values: Vec<f64>,
    ) -> Result<(), ContainerError> {
        require_ascending(
            "waller_hartree_squared_atomic_form_factor_squared_momentum_grid",
            &squared_momentum_grid,
        )?;
        require_len(
            "waller_hartree_squared_atomic_form_factor",
            squared_momentum_grid.len(),
            values.len(),
        )?;
        set_once(
            &mut self.waller_hartree_squared_atomic_form_factor_squared_momentum_grid,
            "waller_hartree_squared_atomic_form_factor_squared_momentum_grid",
            squared_momentum_grid,
        )?;
        set_once(
            &mut self.waller_hartree_squared_atomic_form_factor,
            "waller_hartree_squared_atomic_form_factor",
            values,
        )
    }

    pub fn set_photon_energy_grid(&mut self, grid: Vec<f64>) -> Result<(), ContainerError> {
        require_ascending("photon_energy_grid", &grid)?;
        set_once(&mut self.photon_energy_grid, "photon_energy_grid", grid)
    }

    pub fn set_average_photon_heating_numbers(
        &mut self,
        values: Vec<f64>,
    ) -> Result<(), ContainerError> {
        let expected = self.photon_grid_len("average_photon_heating_numbers")?;
        require_len("average_photon_heating_numbers", expected, values.len())?;
        set_once(
            &mut self.average_photon_heating_numbers,
            "average_photon_heating_numbers",
            values,
        )
    }

    pub fn set_waller_hartree_incoherent_cross_section(
        &mut self,
        array: ThresholdIndexedArray,
    ) -> Result<(), ContainerError> {
        let grid_len = self.photon_grid_len("waller_hartree_incoherent_cross_section")?;
        require_spans_grid("waller_hartree_incoherent_cross_section", &array, grid_len)?;
        set_once(
            &mut self.waller_hartree_incoherent_cross_section,
            "waller_hartree_incoherent_cross_section",
            array,
        )
    }

    pub fn set_impulse_approx_subshell_incoherent_cross_sections(
        &mut self,
        arrays: BTreeMap<u32, ThresholdIndexedArray>,
    ) -> Result<(), ContainerError> {
        let grid_len =
            self.photon_grid_len("impulse_approx_subshell_incoherent_cross_sections")?;
        for array in arrays.values() {
            require_spans_grid(
                "impulse_approx_subshell_incoherent_cross_sections",
                array,
                grid_len,
            )?;
        }
        set_once(
            &mut self.impulse_approx_subshell_incoherent_cross_sections,
            "impulse_approx_subshell_incoherent_cross_sections",
            arrays,
        )
    }

    pub fn set_waller_hartree_coherent_cross_section(
        &mut self,
        array: ThresholdIndexedArray,
    ) -> Result<(), ContainerError> {
        let grid_len = self.photon_grid_len("waller_hartree_coherent_cross_section")?;
        require_spans_grid("waller_hartree_coherent_cross_section", &array, grid_len)?;
        set_once(
            &mut self.waller_hartree_coherent_cross_section,
            "waller_hartree_coherent_cross_section",
            array,
        )
    }

    pub fn set_pair_production_cross_section(
        &mut self,
        array: ThresholdIndexedArray,
    ) -> Result<(), ContainerError> {
        let grid_len = self.photon_grid_len("pair_production_cross_section")?;
        require_spans_grid("pair_production_cross_section", &array, grid_len)?;
        set_once(
            &mut self.pair_production_cross_section,
            "pair_production_cross_section",
            array,
        )
    }

    pub fn set_subshell_photoelectric_cross_sections(
        &mut self,
        arrays: BTreeMap<u32, ThresholdIndexedArray>,
    ) -> Result<(), ContainerError> {
        let grid_len = self.photon_grid_len("subshell_photoelectric_cross_sections")?;
        for array in arrays.values() {
            require_spans_grid("subshell_photoelectric_cross_sections", array, grid_len)?;
        }
        set_once(
            &mut self.subshell_photoelectric_cross_sections,
            "subshell_photoelectric_cross_sections",
            arrays,
        )
    }

    pub fn set_total_photoelectric_cross_section(
        &mut self,
        array: ThresholdIndexedArray,
    ) -> Result<(), ContainerError> {
        let grid_len = self.photon_grid_len("total_photoelectric_cross_section")?;
        require_spans_grid("total_photoelectric_cross_section", &array, grid_len)?;
        set_once(
            &mut self.total_photoelectric_cross_section,
            "total_photoelectric_cross_section",
            array,
        )
    }

    pub fn set_waller_hartree_total_cross_section(
        &mut self,
        values: Vec<f64>,
    ) -> Result<(), ContainerError> {
        let expected = self.photon_grid_len("waller_hartree_total_cross_section")?;
        require_len("waller_hartree_total_cross_section", expected, values.len())?;
        set_once(
            &mut self.waller_hartree_total_cross_section,
            "waller_hartree_total_cross_section",
            values,
        )
    }

    pub fn set_electron_energy_grid(&mut self, grid: Vec<f64>) -> Result<(), ContainerError> {
        require_ascending("electron_energy_grid", &grid)?;
        set_once(&mut self.electron_energy_grid, "electron_energy_grid", grid)
    }

    pub fn set_cutoff_elastic_cross_section(
        &mut self,
        array: ThresholdIndexedArray,
    ) -> Result<(), ContainerError> {
        let grid_len = self.electron_grid_len("cutoff_elastic_cross_section")?;
        require_spans_grid("cutoff_elastic_cross_section", &array, grid_len)?;
        set_once(
            &mut self.cutoff_elastic_cross_section,
            "cutoff_elastic_cross_section",
            array,
        )
    }

    pub fn set_screened_rutherford_elastic_cross_section(
        &mut self,
        array: ThresholdIndexedArray,
    ) -> Result<(), ContainerError> {
        let grid_len = self.electron_grid_len("screened_rutherford_elastic_cross_section")?;
        require_spans_grid(
            "screened_rutherford_elastic_cross_section",
            &array,
            grid_len,
        )?;
        set_once(
            &mut self.screened_rutherford_elastic_cross_section,
            "screened_rutherford_elastic_cross_section",
            array,
        )
    }

    pub fn set_total_elastic_cross_section(
        &mut self,
        array: ThresholdIndexedArray,
    ) -> Result<(), ContainerError> {
        let grid_len = self.electron_grid_len("total_elastic_cross_section")?;
        require_spans_grid("total_elastic_cross_section", &array, grid_len)?;
        set_once(
            &mut self.total_elastic_cross_section,
            "total_elastic_cross_section",
            array,
        )
    }

    pub fn set_bremsstrahlung_cross_section(
        &mut self,
        array: ThresholdIndexedArray,
    ) -> Result<(), ContainerError> {
        let grid_len = self.electron_grid_len("bremsstrahlung_cross_section")?;
        require_spans_grid("bremsstrahlung_cross_section", &array, grid_len)?;
        set_once(
            &mut self.bremsstrahlung_cross_section,
            "bremsstrahlung_cross_section",
            array,
        )
    }

    pub fn set_atomic_excitation_cross_section(
        &mut self,
        array: ThresholdIndexedArray,
    ) -> Result<(), ContainerError> {
        let grid_len = self.electron_grid_len("atomic_excitation_cross_section")?;
        require_spans_grid("atomic_excitation_cross_section", &array, grid_len)?;
        set_once(
            &mut self.atomic_excitation_cross_section,
            "atomic_excitation_cross_section",
            array,
        )
    }

    pub fn set_electroionization_cross_sections(
        &mut self,
        arrays: BTreeMap<u32, ThresholdIndexedArray>,
    ) -> Result<(), ContainerError> {
        let grid_len = self.electron_grid_len("electroionization_cross_sections")?;
        for array in arrays.values() {
            require_spans_grid("electroionization_cross_sections", array, grid_len)?;
        }
        set_once(
            &mut self.electroionization_cross_sections,
            "electroionization_cross_sections",
            arrays,
        )
    }

    pub fn set_elastic_angular_energy_grid(
        &mut self,
        grid: Vec<f64>,
    ) -> Result<(), ContainerError> {
        require_ascending("elastic_angular_energy_grid", &grid)?;
        set_once(
            &mut self.elastic_angular_energy_grid,
            "elastic_angular_energy_grid",
            grid,
        )
    }

    pub fn set_cutoff_elastic_angles(
        &mut self,
        angles: Vec<Vec<f64>>,
    ) -> Result<(), ContainerError> {
        let expected = self.angular_grid_len("cutoff_elastic_angles")?;
        require_len("cutoff_elastic_angles", expected, angles.len())?;
        for bin in &angles {
            require_ascending("cutoff_elastic_angles", bin)?;
        }
        set_once(
            &mut self.cutoff_elastic_angles,
            "cutoff_elastic_angles",
            angles,
        )
    }

    pub fn set_cutoff_elastic_pdf(&mut self, pdf: Vec<Vec<f64>>) -> Result<(), ContainerError> {
        let expected = self.angular_grid_len("cutoff_elastic_pdf")?;
        require_len("cutoff_elastic_pdf", expected, pdf.len())?;
        set_once(&mut self.cutoff_elastic_pdf, "cutoff_elastic_pdf", pdf)
    }

    pub fn set_moment_preserving_distributions(
        &mut self,
        distributions: Vec<DiscreteAngularDistribution>,
    ) -> Result<(), ContainerError> {
        let expected = self.angular_grid_len("moment_preserving_distributions")?;
        require_len("moment_preserving_distributions", expected, distributions.len())?;
        for distribution in &distributions {
            let sum: f64 = distribution.weights.iter().sum();
            if (sum - 1.0).abs() > WEIGHT_NORMALIZATION_TOLERANCE {
                return Err(ContainerError::UnnormalizedWeights {
                    field: "moment_preserving_distributions",
                    sum,
                });
            }
        }
        set_once(
            &mut self.moment_preserving_distributions,
            "moment_preserving_distributions",
            distributions,
        )
    }

    pub fn set_moment_preserving_cross_section(
        &mut self,
        array: ThresholdIndexedArray,
    ) -> Result<(), ContainerError> {
        let grid_len = self.electron_grid_len("moment_preserving_cross_section")?;
        require_spans_grid("moment_preserving_cross_section", &array, grid_len)?;
        set_once(
            &mut self.moment_preserving_cross_section,
            "moment_preserving_cross_section",
            array,
        )
    }

    pub fn set_bremsstrahlung_photon_data(
        &mut self,
        energy_grid: Vec<f64>,
        photon_energies: Vec<Vec<f64>>,
        photon_pdf: Vec<Vec<f64>>,
    ) -> Result<(), ContainerError> {
        require_ascending("bremsstrahlung_photon_energy_grid", &energy_grid)?;
        require_len(
            "bremsstrahlung_photon_energies",
            energy_grid.len(),
            photon_energies.len(),
        )?;
        require_len(
            "bremsstrahlung_photon_pdf",
            energy_grid.len(),
            photon_pdf.len(),
        )?;
        set_once(
            &mut self.bremsstrahlung_photon_energy_grid,
            "bremsstrahlung_photon_energy_grid",
            energy_grid,
        )?;
        set_once(
            &mut self.bremsstrahlung_photon_energies,
            "bremsstrahlung_photon_energies",
            photon_energies,
        )?;
        set_once(
            &mut self.bremsstrahlung_photon_pdf,
            "bremsstrahlung_photon_pdf",
            photon_pdf,
        )
    }

    pub fn set_atomic_excitation_energy_loss(
        &mut self,
        energy_grid: Vec<f64>,
        energy_loss: Vec<f64>,
    ) -> Result<(), ContainerError> {
        require_ascending("atomic_excitation_energy_grid", &energy_grid)?;
        require_len(
            "atomic_excitation_energy_loss",
            energy_grid.len(),
            energy_loss.len(),
        )?;
        set_once(
            &mut self.atomic_excitation_energy_grid,
            "atomic_excitation_energy_grid",
            energy_grid,
        )?;
        set_once(
            &mut self.atomic_excitation_energy_loss,
            "atomic_excitation_energy_loss",
            energy_loss,
        )
    }

    pub fn set_electroionization_recoil_data(
        &mut self,
        energy_grids: BTreeMap<u32, Vec<f64>>,
        recoil_energies: BTreeMap<u32, Vec<Vec<f64>>>,
        recoil_pdf: BTreeMap<u32, Vec<Vec<f64>>>,
    ) -> Result<(), ContainerError> {
        for (designator, grid) in &energy_grids {
            require_ascending("electroionization_recoil_energy_grids", grid)?;
            let energies = recoil_energies.get(designator).map(Vec::len).unwrap_or(0);
            require_len("electroionization_recoil_energies", grid.len(), energies)?;
            let pdf = recoil_pdf.get(designator).map(Vec::len).unwrap_or(0);
            require_len("electroionization_recoil_pdf", grid.len(), pdf)?;
        }
        set_once(
            &mut self.electroionization_recoil_energy_grids,
            "electroionization_recoil_energy_grids",
            energy_grids,
        )?;
        set_once(
            &mut self.electroionization_recoil_energies,
            "electroionization_recoil_energies",
            recoil_energies,
        )?;
        set_once(
            &mut self.electroionization_recoil_pdf,
            "electroionization_recoil_pdf",
            recoil_pdf,
        )
    }

    pub fn generation_parameters(&self) -> Option<&GenerationParameters> {
        self.generation_parameters.as_ref()
    }

    pub fn subshells(&self) -> Option<&[u32]> {
        self.subshells.as_deref()
    }

    pub fn subshell_occupancies(&self) -> Option<&[f64]> {
        self.subshell_occupancies.as_deref()
    }

    pub fn subshell_binding_energies(&self) -> Option<&[f64]> {
        self.subshell_binding_energies.as_deref()
    }

    pub fn compton_profile_momentum_grids(&self) -> Option<&BTreeMap<u32, Vec<f64>>> {
        self.compton_profile_momentum_grids.as_ref()
    }

    pub fn compton_profiles(&self) -> Option<&BTreeMap<u32, Vec<f64>>> {
        self.compton_profiles.as_ref()
    }

    pub fn occupation_number_momentum_grids(&self) -> Option<&BTreeMap<u32, Vec<f64>>> {
        self.occupation_number_momentum_grids.as_ref()
    }

    pub fn occupation_numbers(&self) -> Option<&BTreeMap<u32, Vec<f64>>> {
        self.occupation_numbers.as_ref()
    }

    pub fn waller_hartree_scattering_function_momentum_grid(&self) -> Option<&[f64]> {
        self.waller_hartree_scattering_function_momentum_grid.as_deref()
    }

    pub fn waller_hartree_scattering_function(&self) -> Option<&[f64]> {
        self.waller_hartree_scattering_function.as_deref()
    }

    pub fn waller_hartree_atomic_form_factor_momentum_grid(&self) -> Option<&[f64]> {
        self.waller_hartree_atomic_form_factor_momentum_grid.as_deref()
    }

    pub fn waller_hartree_atomic_form_factor(&self) -> Option<&[f64]> {
        self.waller_hartree_atomic_form_factor.as_deref()
    }

    pub fn waller_hartree_squared_atomic_form_factor_squared_momentum_grid(
        &self,
    ) -> Option<&[f64]> {
        self.waller_hartree_squared_atomic_form_factor_squared_momentum_grid
            .as_deref()
    }

    pub fn waller_hartree_squared_atomic_form_factor(&self) -> Option<&[f64]> {
        self.waller_hartree_squared_atomic_form_factor.as_deref()
    }

    pub fn photon_energy_grid(&self) -> Option<&[f64]> {
        self.photon_energy_grid.as_deref()
    }

    pub fn average_photon_heating_numbers(&self) -> Option<&[f64]> {
        self.average_photon_heating_numbers.as_deref()
    }

    pub fn waller_hartree_incoherent_cross_section(&self) -> Option<&ThresholdIndexedArray> {
        self.waller_hartree_incoherent_cross_section.as_ref()
    }

    pub fn impulse_approx_subshell_incoherent_cross_sections(
        &self,
    ) -> Option<&BTreeMap<u32, ThresholdIndexedArray>> {
        self.impulse_approx_subshell_incoherent_cross_sections.as_ref()
    }

    pub fn waller_hartree_coherent_cross_section(&self) -> Option<&ThresholdIndexedArray> {
        self.waller_hartree_coherent_cross_section.as_ref()
    }

    pub fn pair_production_cross_section(&self) -> Option<&ThresholdIndexedArray> {
        self.pair_production_cross_section.as_ref()
    }

    pub fn subshell_photoelectric_cross_sections(
        &self,
    ) -> Option<&BTreeMap<u32, ThresholdIndexedArray>> {
        self.subshell_photoelectric_cross_sections.as_ref()
    }

    pub fn total_photoelectric_cross_section(&self) -> Option<&ThresholdIndexedArray> {
        self.total_photoelectric_cross_section.as_ref()
    }

    pub fn waller_hartree_total_cross_section(&self) -> Option<&[f64]> {
        self.waller_hartree_total_cross_section.as_deref()
    }

    pub fn electron_energy_grid(&self) -> Option<&[f64]> {
        self.electron_energy_grid.as_deref()
    }

    pub fn cutoff_elastic_cross_section(&self) -> Option<&ThresholdIndexedArray> {
        self.cutoff_elastic_cross_section.as_ref()
    }

    pub fn screened_rutherford_elastic_cross_section(&self) -> Option<&ThresholdIndexedArray> {
        self.screened_rutherford_elastic_cross_section.as_ref()
    }

    pub fn total_elastic_cross_section(&self) -> Option<&ThresholdIndexedArray> {
        self.total_elastic_cross_section.as_ref()
    }

    pub fn bremsstrahlung_cross_section(&self) -> Option<&ThresholdIndexedArray> {
        self.bremsstrahlung_cross_section.as_ref()
    }

    pub fn atomic_excitation_cross_section(&self) -> Option<&ThresholdIndexedArray> {
        self.atomic_excitation_cross_section.as_ref()
    }

    pub fn electroionization_cross_sections(
        &self,
    ) -> Option<&BTreeMap<u32, ThresholdIndexedArray>> {
        self.electroionization_cross_sections.as_ref()
    }

    pub fn elastic_angular_energy_grid(&self) -> Option<&[f64]> {
        self.elastic_angular_energy_grid.as_deref()
    }

    pub fn cutoff_elastic_angles(&self) -> Option<&[Vec<f64>]> {
        self.cutoff_elastic_angles.as_deref()
    }

    pub fn cutoff_elastic_pdf(&self) -> Option<&[Vec<f64>]> {
        self.cutoff_elastic_pdf.as_deref()
    }

    pub fn moment_preserving_distributions(&self) -> Option<&[DiscreteAngularDistribution]> {
        self.moment_preserving_distributions.as_deref()
    }

    pub fn moment_preserving_cross_section(&self) -> Option<&ThresholdIndexedArray> {
        self.moment_preserving_cross_section.as_ref()
    }

    pub fn bremsstrahlung_photon_energy_grid(&self) -> Option<&[f64]> {
        self.bremsstrahlung_photon_energy_grid.as_deref()
    }

    pub fn bremsstrahlung_photon_energies(&self) -> Option<&[Vec<f64>]> {
        self.bremsstrahlung_photon_energies.as_deref()
    }

    pub fn bremsstrahlung_photon_pdf(&self) -> Option<&[Vec<f64>]> {
        self.bremsstrahlung_photon_pdf.as_deref()
    }

    pub fn atomic_excitation_energy_grid(&self) -> Option<&[f64]> {
        self.atomic_excitation_energy_grid.as_deref()
    }

    pub fn atomic_excitation_energy_loss(&self) -> Option<&[f64]> {
        self.atomic_excitation_energy_loss.as_deref()
    }

    pub fn electroionization_recoil_energy_grids(&self) -> Option<&BTreeMap<u32, Vec<f64>>> {
        self.electroionization_recoil_energy_grids.as_ref()
    }

    pub fn electroionization_recoil_energies(
        &self,
    ) -> Option<&BTreeMap<u32, Vec<Vec<f64>>>> {
        self.electroionization_recoil_energies.as_ref()
    }

    pub fn electroionization_recoil_pdf(&self) -> Option<&BTreeMap<u32, Vec<Vec<f64>>>> {
        self.electroionization_recoil_pdf.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::{ContainerError, ElectronPhotonRelaxationDataContainer};
    use crate::elastic::reducer::DiscreteAngularDistribution;
    use crate::grid::resample::ThresholdIndexedArray;

    #[test]
    fn fields_are_write_once() {
        let mut container = ElectronPhotonRelaxationDataContainer::new();
        container
            .set_photon_energy_grid(vec![1.0, 2.0, 3.0])
            .expect("first write");
        let error = container
            .set_photon_energy_grid(vec![1.0, 2.0])
            .expect_err("second write");
        assert_eq!(
            error,
            ContainerError::FieldAlreadySet {
                field: "photon_energy_grid"
            }
        );
    }

    #[test]
    fn cross_sections_require_their_grid_first() {
        let mut container = ElectronPhotonRelaxationDataContainer::new();
        let array = ThresholdIndexedArray {
            threshold_index: 0,
            values: vec![1.0, 2.0],
        };
        let error = container
            .set_cutoff_elastic_cross_section(array)
            .expect_err("no electron grid yet");
        assert!(matches!(
            error,
            ContainerError::MissingPrerequisite {
                field: "cutoff_elastic_cross_section",
                requires: "electron_energy_grid"
            }
        ));
    }

    #[test]
    fn threshold_arrays_must_span_the_grid() {
        let mut container = ElectronPhotonRelaxationDataContainer::new();
        container
            .set_electron_energy_grid(vec![1.0, 2.0, 3.0, 4.0])
            .expect("grid");
        let error = container
            .set_cutoff_elastic_cross_section(ThresholdIndexedArray {
                threshold_index: 1,
                values: vec![5.0],
            })
            .expect_err("1 + 1 != 4");
        assert!(matches!(
            error,
            ContainerError::ThresholdLengthMismatch {
                field: "cutoff_elastic_cross_section",
                threshold_index: 1,
                stored: 1,
                grid_len: 4,
            }
        ));

        container
            .set_cutoff_elastic_cross_section(ThresholdIndexedArray {
                threshold_index: 1,
                values: vec![5.0, 6.0, 7.0],
            })
            .expect("spanning array accepted");
    }

    #[test]
    fn non_ascending_grids_are_rejected() {
        let mut container = ElectronPhotonRelaxationDataContainer::new();
        let error = container
            .set_photon_energy_grid(vec![1.0, 1.0, 2.0])
            .expect_err("duplicate point");
        assert!(matches!(
            error,
            ContainerError::NonAscendingGrid {
                field: "photon_energy_grid",
                index: 1
            }
        ));
    }

    #[test]
    fn subshell_arrays_must_match_the_designator_list() {
        let mut container = ElectronPhotonRelaxationDataContainer::new();
        container.set_subshells(vec![1, 3, 5]).expect("subshells");
        let error = container
            .set_subshell_occupancies(vec![2.0, 2.0])
            .expect_err("length mismatch");
        assert!(matches!(
            error,
            ContainerError::LengthMismatch {
                field: "subshell_occupancies",
                expected: 3,
                actual: 2
            }
        ));
        container
            .set_subshell_occupancies(vec![2.0, 2.0, 4.0])
            .expect("matching lengths");
    }

    #[test]
    fn moment_preserving_weights_must_be_normalized() {
        let mut container = ElectronPhotonRelaxationDataContainer::new();
        container
            .set_elastic_angular_energy_grid(vec![1.0e-5, 20.0])
            .expect("grid");
        let bad = DiscreteAngularDistribution {
            angles: vec![0.9],
            weights: vec![0.9],
            cross_section_reduction_factor: 0.5,
        };
        let good = DiscreteAngularDistribution {
            angles: vec![0.9],
            weights: vec![1.0],
            cross_section_reduction_factor: 0.5,
        };
        let error = container
            .set_moment_preserving_distributions(vec![bad, good.clone()])
            .expect_err("unnormalized weights");
        assert!(matches!(
            error,
            ContainerError::UnnormalizedWeights {
                field: "moment_preserving_distributions",
                ..
            }
        ));
        container
            .set_moment_preserving_distributions(vec![good.clone(), good])
            .expect("normalized weights");
    }

    #[test]
    fn container_round_trips_through_json() {
        let mut container = ElectronPhotonRelaxationDataContainer::new();
        container.set_subshells(vec![1, 2]).expect("subshells");
        container
            .set_subshell_binding_energies(vec![8.8e-2, 1.4e-2])
            .expect("binding energies");
        container
            .set_photon_energy_grid(vec![1.0e-3, 1.0, 20.0])
            .expect("grid");
        container
            .set_waller_hartree_incoherent_cross_section(ThresholdIndexedArray {
                threshold_index: 1,
                values: vec![0.5, 0.8],
            })
            .expect("cross section");
        let mut profiles = BTreeMap::new();
        profiles.insert(1_u32, vec![0.1, 0.2]);
        container.set_compton_profiles(profiles).expect("profiles");

        let json = serde_json::to_string(&container).expect("serialize");
        let back: ElectronPhotonRelaxationDataContainer =
            serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, container);
    }
}
