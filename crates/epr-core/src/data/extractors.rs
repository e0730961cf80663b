//! Already-extracted input tables.
//!
//! Parsing ACE and ENDL files is out of scope; a generation run consumes the
//! arrays-of-doubles-by-name those extractors expose, deserialized from JSON
//! fixtures by the CLI. `validate()` defends the pipeline against the
//! malformed shapes a hand-assembled fixture can carry: mismatched array
//! lengths, non-ascending grids, and designators with missing per-subshell
//! data.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DataExtractionError {
    #[error("{table}: field '{field}' must be strictly ascending, violated at index {index}")]
    NonAscendingGrid {
        table: &'static str,
        field: &'static str,
        index: usize,
    },
    #[error("{table}: field '{field}' expected {expected} entries, got {actual}")]
    LengthMismatch {
        table: &'static str,
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("{table}: subshell {designator} has no '{field}' data")]
    MissingSubshellData {
        table: &'static str,
        field: &'static str,
        designator: u32,
    },
    #[error("{table}: field '{field}' must not be empty")]
    EmptyField {
        table: &'static str,
        field: &'static str,
    },
}

/// A bare (grid, values) pair as the extractors hand it over, before any
/// interpolation law is attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    pub grid: Vec<f64>,
    pub values: Vec<f64>,
}

/// Per-subshell electroionization recoil data: one (energies, pdf) bin per
/// incident energy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoilTable {
    pub incident_energy_grid: Vec<f64>,
    pub recoil_energies: Vec<Vec<f64>>,
    pub recoil_pdf: Vec<Vec<f64>>,
}

/// Photoatomic (ACE EPR block) data. All photon cross sections share the
/// photon energy grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoatomicTable {
    pub photon_energy_grid: Vec<f64>,
    pub incoherent_cross_section: Vec<f64>,
    pub coherent_cross_section: Vec<f64>,
    pub photoelectric_cross_section: Vec<f64>,
    pub pair_production_cross_section: Vec<f64>,
    pub average_heating_numbers: Vec<f64>,
    pub subshell_photoelectric_cross_sections: BTreeMap<u32, Vec<f64>>,
    pub scattering_function: RawTable,
    pub form_factor: RawTable,
    pub compton_profile_momentum_grids: BTreeMap<u32, Vec<f64>>,
    pub compton_profiles: BTreeMap<u32, Vec<f64>>,
    /// Pre-evaluated impulse-approximation incoherent cross sections per
    /// subshell; absent when only the Waller-Hartree treatment is wanted.
    #[serde(default)]
    pub impulse_approx_subshell_incoherent_cross_sections: Option<BTreeMap<u32, RawTable>>,
}

const PHOTOATOMIC: &str = "photoatomic table";

impl PhotoatomicTable {
    pub fn validate(&self) -> Result<(), DataExtractionError> {
        require_ascending(PHOTOATOMIC, "photon_energy_grid", &self.photon_energy_grid)?;
        let grid_len = self.photon_energy_grid.len();
        require_len(
            PHOTOATOMIC,
            "incoherent_cross_section",
            grid_len,
            self.incoherent_cross_section.len(),
        )?;
        require_len(
            PHOTOATOMIC,
            "coherent_cross_section",
            grid_len,
            self.coherent_cross_section.len(),
        )?;
        require_len(
            PHOTOATOMIC,
            "photoelectric_cross_section",
            grid_len,
            self.photoelectric_cross_section.len(),
        )?;
        require_len(
            PHOTOATOMIC,
            "pair_production_cross_section",
            grid_len,
            self.pair_production_cross_section.len(),
        )?;
        require_len(
            PHOTOATOMIC,
            "average_heating_numbers",
            grid_len,
            self.average_heating_numbers.len(),
        )?;
        for values in self.subshell_photoelectric_cross_sections.values() {
            require_len(
                PHOTOATOMIC,
                "subshell_photoelectric_cross_sections",
                grid_len,
                values.len(),
            )?;
        }

        validate_raw_table(PHOTOATOMIC, "scattering_function", &self.scattering_function)?;
        validate_raw_table(PHOTOATOMIC, "form_factor", &self.form_factor)?;

        for (designator, grid) in &self.compton_profile_momentum_grids {
            require_ascending(PHOTOATOMIC, "compton_profile_momentum_grids", grid)?;
            let profile = self.compton_profiles.get(designator).ok_or(
                DataExtractionError::MissingSubshellData {
                    table: PHOTOATOMIC,
                    field: "compton_profiles",
                    designator: *designator,
                },
            )?;
            require_len(PHOTOATOMIC, "compton_profiles", grid.len(), profile.len())?;
        }

        if let Some(tables) = &self.impulse_approx_subshell_incoherent_cross_sections {
            for table in tables.values() {
                validate_raw_table(
                    PHOTOATOMIC,
                    "impulse_approx_subshell_incoherent_cross_sections",
                    table,
                )?;
            }
        }
        Ok(())
    }
}

/// ENDL electron data. Elastic cross sections share the elastic energy grid;
/// angular bins are tabulated as "1 - cosine" ascending from the forward
/// direction and converted downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndlElectronTable {
    pub subshell_designators: Vec<u32>,
    pub subshell_occupancies: Vec<f64>,
    pub subshell_binding_energies: Vec<f64>,
    pub elastic_energy_grid: Vec<f64>,
    pub cutoff_elastic_cross_section: Vec<f64>,
    pub total_elastic_cross_section: Vec<f64>,
    pub elastic_angular_energy_grid: Vec<f64>,
    /// Angle bins in "1 - cosine" form, one per angular-grid energy.
    pub elastic_angles: Vec<Vec<f64>>,
    pub elastic_pdf: Vec<Vec<f64>>,
    pub bremsstrahlung_cross_section: RawTable,
    pub bremsstrahlung_photon_energy_grid: Vec<f64>,
    pub bremsstrahlung_photon_energies: Vec<Vec<f64>>,
    pub bremsstrahlung_photon_pdf: Vec<Vec<f64>>,
    pub atomic_excitation_cross_section: RawTable,
    pub atomic_excitation_energy_loss: RawTable,
    pub electroionization_cross_sections: BTreeMap<u32, RawTable>,
    pub electroionization_recoil: BTreeMap<u32, RecoilTable>,
}

const ENDL: &str = "ENDL electron table";

impl EndlElectronTable {
    pub fn validate(&self) -> Result<(), DataExtractionError> {
        if self.subshell_designators.is_empty() {
            return Err(DataExtractionError::EmptyField {
                table: ENDL,
                field: "subshell_designators",
            });
        }
        require_len(
            ENDL,
            "subshell_occupancies",
            self.subshell_designators.len(),
            self.subshell_occupancies.len(),
        )?;
        require_len(
            ENDL,
            "subshell_binding_energies",
            self.subshell_designators.len(),
            self.subshell_binding_energies.len(),
        )?;

        require_ascending(ENDL, "elastic_energy_grid", &self.elastic_energy_grid)?;
        require_len(
            ENDL,
            "cutoff_elastic_cross_section",
            self.elastic_energy_grid.len(),
            self.cutoff_elastic_cross_section.len(),
        )?;
        require_len(
            ENDL,
            "total_elastic_cross_section",
            self.elastic_energy_grid.len(),
            self.total_elastic_cross_section.len(),
        )?;

        require_ascending(
            ENDL,
            "elastic_angular_energy_grid",
            &self.elastic_angular_energy_grid,
        )?;
        require_len(
            ENDL,
            "elastic_angles",
            self.elastic_angular_energy_grid.len(),
            self.elastic_angles.len(),
        )?;
        require_len(
            ENDL,
            "elastic_pdf",
            self.elastic_angular_energy_grid.len(),
            self.elastic_pdf.len(),
        )?;
        for (angles, pdf) in self.elastic_angles.iter().zip(&self.elastic_pdf) {
            require_ascending(ENDL, "elastic_angles", angles)?;
            require_len(ENDL, "elastic_pdf", angles.len(), pdf.len())?;
        }

        validate_raw_table(ENDL, "bremsstrahlung_cross_section", &self.bremsstrahlung_cross_section)?;
        require_ascending(
            ENDL,
            "bremsstrahlung_photon_energy_grid",
            &self.bremsstrahlung_photon_energy_grid,
        )?;
        require_len(
            ENDL,
            "bremsstrahlung_photon_energies",
            self.bremsstrahlung_photon_energy_grid.len(),
            self.bremsstrahlung_photon_energies.len(),
        )?;
        require_len(
            ENDL,
            "bremsstrahlung_photon_pdf",
            self.bremsstrahlung_photon_energy_grid.len(),
            self.bremsstrahlung_photon_pdf.len(),
        )?;

        validate_raw_table(
            ENDL,
            "atomic_excitation_cross_section",
            &self.atomic_excitation_cross_section,
        )?;
        validate_raw_table(
            ENDL,
            "atomic_excitation_energy_loss",
            &self.atomic_excitation_energy_loss,
        )?;

        for designator in &self.subshell_designators {
            let cross_section = self.electroionization_cross_sections.get(designator).ok_or(
                DataExtractionError::MissingSubshellData {
                    table: ENDL,
                    field: "electroionization_cross_sections",
                    designator: *designator,
                },
            )?;
            validate_raw_table(ENDL, "electroionization_cross_sections", cross_section)?;

            let recoil = self.electroionization_recoil.get(designator).ok_or(
                DataExtractionError::MissingSubshellData {
                    table: ENDL,
                    field: "electroionization_recoil",
                    designator: *designator,
                },
            )?;
            require_ascending(
                ENDL,
                "electroionization_recoil.incident_energy_grid",
                &recoil.incident_energy_grid,
            )?;
            require_len(
                ENDL,
                "electroionization_recoil.recoil_energies",
                recoil.incident_energy_grid.len(),
                recoil.recoil_energies.len(),
            )?;
            require_len(
                ENDL,
                "electroionization_recoil.recoil_pdf",
                recoil.incident_energy_grid.len(),
                recoil.recoil_pdf.len(),
            )?;
        }
        Ok(())
    }
}

fn require_ascending(
    table: &'static str,
    field: &'static str,
    grid: &[f64],
) -> Result<(), DataExtractionError> {
    for (index, window) in grid.windows(2).enumerate() {
        if !(window[0] < window[1]) {
            return Err(DataExtractionError::NonAscendingGrid {
                table,
                field,
                index: index + 1,
            });
        }
    }
    Ok(())
}

fn require_len(
    table: &'static str,
    field: &'static str,
    expected: usize,
    actual: usize,
) -> Result<(), DataExtractionError> {
    if expected != actual {
        return Err(DataExtractionError::LengthMismatch {
            table,
            field,
            expected,
            actual,
        });
    }
    Ok(())
}

fn validate_raw_table(
    table: &'static str,
    field: &'static str,
    raw: &RawTable,
) -> Result<(), DataExtractionError> {
    if raw.grid.is_empty() {
        return Err(DataExtractionError::EmptyField { table, field });
    }
    require_ascending(table, field, &raw.grid)?;
    require_len(table, field, raw.grid.len(), raw.values.len())
}
