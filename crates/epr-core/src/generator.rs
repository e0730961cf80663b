//! Generation orchestrator.
//!
//! Runs the fixed stage sequence that turns the extracted photoatomic and
//! ENDL electron tables into a populated
//! `ElectronPhotonRelaxationDataContainer`: subshell data, Compton profiles,
//! occupation numbers, Waller-Hartree scattering function and form factors,
//! the photon and electron union grids with their resampled cross sections,
//! elastic angular data, the moment-preserving reduction when enabled, and
//! the pass-through secondary tables. Stages compute; the orchestrator alone
//! writes the container, so the write-once discipline holds by construction.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::common::constants::RUTHERFORD_PEAK_ANGLE_COSINE;
use crate::data::container::{
    ContainerError, ElectronPhotonRelaxationDataContainer, GenerationParameters,
};
use crate::data::extractors::{DataExtractionError, EndlElectronTable, PhotoatomicTable};
use crate::elastic::distribution::{
    elastic_angle_cosines, AngularDistributionError, CutoffElasticDistribution,
};
use crate::elastic::moments::{
    CombinedElasticDistribution, ElasticMomentEvaluator, MomentEvaluationError,
};
use crate::elastic::reducer::{
    moment_preserving_cross_section, DiscreteAngularDistribution,
    MomentPreservingElasticReducer, ReductionError,
};
use crate::elastic::rutherford::{
    moliere_screening_constant, RutherfordError, ScreenedRutherfordTail,
};
use crate::grid::generator::{
    AdaptiveGridGenerator, ConvergenceConfig, ConvergenceConfigError, DirtyConvergencePolicy,
    GridConvergenceError,
};
use crate::grid::resample::{resample, resample_difference, ThresholdIndexedArray};
use crate::grid::union::{UnionGridBuilder, UnionGridError, UnionQuantity};
use crate::numerics::tabular::{InterpolationLaw, TabularError, TabularFunction};

/// Everything a generation run is configured by. Validated before the first
/// stage runs; the moment-preserving reduction is disabled by the sentinel
/// pair `cutoff_angle_cosine = 1.0`, `number_of_moment_preserving_angles = 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
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
    #[serde(default)]
    pub dirty_convergence_policy: DirtyConvergencePolicy,
}

impl GeneratorConfig {
    pub fn validate(&self) -> Result<(), GenerationError> {
        let invalid = |reason: String| GenerationError::InvalidConfiguration { reason };

        if self.atomic_number == 0 || self.atomic_number > 100 {
            return Err(invalid(format!(
                "atomic number must be in [1, 100], got {}",
                self.atomic_number
            )));
        }
        for (name, min, max) in [
            ("photon", self.min_photon_energy, self.max_photon_energy),
            ("electron", self.min_electron_energy, self.max_electron_energy),
        ] {
            if !min.is_finite() || !max.is_finite() || min <= 0.0 || min >= max {
                return Err(invalid(format!(
                    "{name} energy bounds must satisfy 0 < min < max, got [{min}, {max}]"
                )));
            }
        }
        for (name, value) in [
            (
                "occupation_number_evaluation_tolerance",
                self.occupation_number_evaluation_tolerance,
            ),
            (
                "subshell_incoherent_evaluation_tolerance",
                self.subshell_incoherent_evaluation_tolerance,
            ),
            ("grid_convergence_tolerance", self.grid_convergence_tolerance),
            (
                "grid_absolute_difference_tolerance",
                self.grid_absolute_difference_tolerance,
            ),
            ("grid_distance_tolerance", self.grid_distance_tolerance),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(invalid(format!(
                    "{name} must be finite and positive, got {value}"
                )));
            }
        }
        if self.grid_convergence_tolerance >= 1.0
            || self.occupation_number_evaluation_tolerance >= 1.0
            || self.subshell_incoherent_evaluation_tolerance >= 1.0
        {
            return Err(invalid(
                "relative evaluation tolerances must be below 1".to_string(),
            ));
        }
        if !self.cutoff_angle_cosine.is_finite()
            || self.cutoff_angle_cosine < -1.0
            || self.cutoff_angle_cosine > 1.0
        {
            return Err(invalid(format!(
                "cutoff angle cosine must be in [-1, 1], got {}",
                self.cutoff_angle_cosine
            )));
        }
        if self.cutoff_angle_cosine == 1.0 && self.number_of_moment_preserving_angles != 0 {
            return Err(invalid(format!(
                "cutoff angle cosine 1.0 disables the reduction; requesting {} discrete angles with it is contradictory",
                self.number_of_moment_preserving_angles
            )));
        }
        Ok(())
    }

    pub fn moment_preserving_enabled(&self) -> bool {
        self.number_of_moment_preserving_angles >= 1
            && self.cutoff_angle_cosine < RUTHERFORD_PEAK_ANGLE_COSINE
    }

    fn grid_convergence_config(&self) -> Result<ConvergenceConfig, ConvergenceConfigError> {
        ConvergenceConfig::new(
            self.grid_convergence_tolerance,
            self.grid_absolute_difference_tolerance,
            self.grid_distance_tolerance,
        )
    }

    fn occupation_convergence_config(&self) -> Result<ConvergenceConfig, ConvergenceConfigError> {
        ConvergenceConfig::new(
            self.occupation_number_evaluation_tolerance,
            self.grid_absolute_difference_tolerance,
            self.grid_distance_tolerance,
        )
    }

    fn incoherent_convergence_config(&self) -> Result<ConvergenceConfig, ConvergenceConfigError> {
        ConvergenceConfig::new(
            self.subshell_incoherent_evaluation_tolerance,
            self.grid_absolute_difference_tolerance,
            self.grid_distance_tolerance,
        )
    }

    fn echo(&self) -> GenerationParameters {
        GenerationParameters {
            atomic_number: self.atomic_number,
            min_photon_energy: self.min_photon_energy,
            max_photon_energy: self.max_photon_energy,
            min_electron_energy: self.min_electron_energy,
            max_electron_energy: self.max_electron_energy,
            occupation_number_evaluation_tolerance: self.occupation_number_evaluation_tolerance,
            subshell_incoherent_evaluation_tolerance: self
                .subshell_incoherent_evaluation_tolerance,
            cutoff_angle_cosine: self.cutoff_angle_cosine,
            number_of_moment_preserving_angles: self.number_of_moment_preserving_angles,
            grid_convergence_tolerance: self.grid_convergence_tolerance,
            grid_absolute_difference_tolerance: self.grid_absolute_difference_tolerance,
            grid_distance_tolerance: self.grid_distance_tolerance,
        }
    }
}

/// Any error a single stage can produce.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StageError {
    #[error(transparent)]
    Tabular(#[from] TabularError),
    #[error(transparent)]
    Convergence(#[from] GridConvergenceError),
    #[error(transparent)]
    UnionGrid(#[from] UnionGridError),
    #[error(transparent)]
    Angular(#[from] AngularDistributionError),
    #[error(transparent)]
    Rutherford(#[from] RutherfordError),
    #[error(transparent)]
    Moments(#[from] MomentEvaluationError),
    #[error(transparent)]
    Reduction(#[from] ReductionError),
    #[error(transparent)]
    Container(#[from] ContainerError),
    #[error(transparent)]
    Config(#[from] ConvergenceConfigError),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GenerationError {
    #[error("invalid generator configuration: {reason}")]
    InvalidConfiguration { reason: String },
    #[error(transparent)]
    InputValidation(#[from] DataExtractionError),
    #[error("stage '{stage}' failed: {source}")]
    Stage {
        stage: &'static str,
        source: StageError,
    },
    #[error("stage '{stage}' failed for subshell {subshell}: {source}")]
    SubshellStage {
        stage: &'static str,
        subshell: u32,
        source: StageError,
    },
}

impl GenerationError {
    fn stage(stage: &'static str, source: impl Into<StageError>) -> Self {
        Self::Stage {
            stage,
            source: source.into(),
        }
    }

    fn subshell(stage: &'static str, subshell: u32, source: impl Into<StageError>) -> Self {
        Self::SubshellStage {
            stage,
            subshell,
            source: source.into(),
        }
    }
}

pub struct StandardGenerator {
    config: GeneratorConfig,
    photoatomic: PhotoatomicTable,
    endl: EndlElectronTable,
}

impl StandardGenerator {
    pub fn new(
        config: GeneratorConfig,
        photoatomic: PhotoatomicTable,
        endl: EndlElectronTable,
    ) -> Result<Self, GenerationError> {
        config.validate()?;
        photoatomic.validate()?;
        endl.validate()?;
        Ok(Self {
            config,
            photoatomic,
            endl,
        })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn generate(&self) -> Result<ElectronPhotonRelaxationDataContainer, GenerationError> {
        let mut container = ElectronPhotonRelaxationDataContainer::new();

        tracing::info!(atomic_number = self.config.atomic_number, "starting generation");
        container
            .set_generation_parameters(self.config.echo())
            .map_err(|e| GenerationError::stage("generation parameters", e))?;

        self.populate_subshell_data(&mut container)?;
        self.populate_compton_profiles(&mut container)?;
        self.populate_occupation_numbers(&mut container)?;
        self.populate_waller_hartree_data(&mut container)?;
        self.populate_photon_data(&mut container)?;
        let (cutoff_elastic, screened_rutherford) =
            self.populate_electron_data(&mut container)?;
        let angular_data = self.populate_elastic_angular_data(&mut container)?;
        if self.config.moment_preserving_enabled() {
            self.populate_moment_preserving_data(
                &mut container,
                &angular_data,
                &cutoff_elastic,
                &screened_rutherford,
            )?;
        } else {
            tracing::info!("moment-preserving reduction disabled");
        }
        self.populate_pass_through_data(&mut container)?;

        tracing::info!("generation complete");
        Ok(container)
    }

    fn populate_subshell_data(
        &self,
        container: &mut ElectronPhotonRelaxationDataContainer,
    ) -> Result<(), GenerationError> {
        const STAGE: &str = "subshell data";
        tracing::info!(stage = STAGE, "populating");
        container
            .set_subshells(self.endl.subshell_designators.clone())
            .map_err(|e| GenerationError::stage(STAGE, e))?;
        container
            .set_subshell_occupancies(self.endl.subshell_occupancies.clone())
            .map_err(|e| GenerationError::stage(STAGE, e))?;
        container
            .set_subshell_binding_energies(self.endl.subshell_binding_energies.clone())
            .map_err(|e| GenerationError::stage(STAGE, e))?;
        Ok(())
    }

    fn populate_compton_profiles(
        &self,
        container: &mut ElectronPhotonRelaxationDataContainer,
    ) -> Result<(), GenerationError> {
        const STAGE: &str = "compton profiles";
        tracing::info!(stage = STAGE, "populating");
        let generator = self
            .grid_generator(self.config.grid_convergence_config())
            .map_err(|e| GenerationError::stage(STAGE, e))?;

        let mut grids = BTreeMap::new();
        let mut profiles = BTreeMap::new();
        for (&designator, momentum_grid) in &self.photoatomic.compton_profile_momentum_grids {
            let raw_profile = &self.photoatomic.compton_profiles[&designator];
            let (grid, values) = refine_table(
                &generator,
                momentum_grid,
                raw_profile,
                InterpolationLaw::LinLin,
            )
            .map_err(|e| GenerationError::subshell(STAGE, designator, e))?;
            tracing::debug!(subshell = designator, points = grid.len(), "profile gridded");
            grids.insert(designator, grid);
            profiles.insert(designator, values);
        }

        container
            .set_compton_profile_momentum_grids(grids)
            .map_err(|e| GenerationError::stage(STAGE, e))?;
        container
            .set_compton_profiles(profiles)
            .map_err(|e| GenerationError::stage(STAGE, e))?;
        Ok(())
    }

    fn populate_occupation_numbers(
        &self,
        container: &mut ElectronPhotonRelaxationDataContainer,
    ) -> Result<(), GenerationError> {
        const STAGE: &str = "occupation numbers";
        tracing::info!(stage = STAGE, "populating");
        let generator = self
            .grid_generator(self.config.occupation_convergence_config())
            .map_err(|e| GenerationError::stage(STAGE, e))?;

        let mut grids = BTreeMap::new();
        let mut numbers = BTreeMap::new();
        for (&designator, momentum_grid) in &self.photoatomic.compton_profile_momentum_grids {
            let raw_profile = &self.photoatomic.compton_profiles[&designator];
            let (grid, values) = refine_table(
                &generator,
                momentum_grid,
                raw_profile,
                InterpolationLaw::LinLin,
            )
            .map_err(|e| GenerationError::subshell(STAGE, designator, e))?;

            // The occupation number is the cumulative profile integral,
            // normalized so it reaches one at the highest momentum.
            let mut cumulative = Vec::with_capacity(grid.len());
            cumulative.push(0.0);
            let mut running = 0.0;
            for i in 1..grid.len() {
                running += 0.5 * (values[i - 1] + values[i]) * (grid[i] - grid[i - 1]);
                cumulative.push(running);
            }
            if running > 0.0 {
                for value in &mut cumulative {
                    *value /= running;
                }
            }

            grids.insert(designator, grid);
            numbers.insert(designator, cumulative);
        }

        container
            .set_occupation_number_momentum_grids(grids)
            .map_err(|e| GenerationError::stage(STAGE, e))?;
        container
            .set_occupation_numbers(numbers)
            .map_err(|e| GenerationError::stage(STAGE, e))?;
        Ok(())
    }

    fn populate_waller_hartree_data(
        &self,
        container: &mut ElectronPhotonRelaxationDataContainer,
    ) -> Result<(), GenerationError> {
        const STAGE: &str = "waller-hartree data";
        tracing::info!(stage = STAGE, "populating");
        let generator = self
            .grid_generator(self.config.grid_convergence_config())
            .map_err(|e| GenerationError::stage(STAGE, e))?;

        let (sf_grid, sf_values) = refine_table(
            &generator,
            &self.photoatomic.scattering_function.grid,
            &self.photoatomic.scattering_function.values,
            InterpolationLaw::LogLog,
        )
        .map_err(|e| GenerationError::stage(STAGE, e))?;
        container
            .set_waller_hartree_scattering_function(sf_grid, sf_values)
            .map_err(|e| GenerationError::stage(STAGE, e))?;

        let (ff_grid, ff_values) = refine_table(
            &generator,
            &self.photoatomic.form_factor.grid,
            &self.photoatomic.form_factor.values,
            InterpolationLaw::LogLog,
        )
        .map_err(|e| GenerationError::stage(STAGE, e))?;

        // Squared form factor on the squared momentum grid, used for
        // coherent sampling.
        let squared_grid: Vec<f64> = ff_grid.iter().map(|&q| q * q).collect();
        let squared_values: Vec<f64> = ff_values.iter().map(|&f| f * f).collect();
        container
            .set_waller_hartree_atomic_form_factor(ff_grid, ff_values)
            .map_err(|e| GenerationError::stage(STAGE, e))?;
        container
            .set_waller_hartree_squared_atomic_form_factor(squared_grid, squared_values)
            .map_err(|e| GenerationError::stage(STAGE, e))?;
        Ok(())
    }

    fn populate_photon_data(
        &self,
        container: &mut ElectronPhotonRelaxationDataContainer,
    ) -> Result<(), GenerationError> {
        const STAGE: &str = "photon union grid";
        tracing::info!(stage = STAGE, "populating");

        let builder = self
            .union_builder(self.config.min_photon_energy, self.config.max_photon_energy)
            .map_err(|e| GenerationError::stage(STAGE, e))?;
        let mut seed = builder.initialize(&self.endl.subshell_binding_energies);
        builder.merge(&mut seed, &self.photoatomic.photon_energy_grid);

        let photon_grid = self.photoatomic.photon_energy_grid.clone();
        let table = |values: &[f64], law| {
            TabularFunction::new(photon_grid.clone(), values.to_vec(), law)
        };
        let heating = table(&self.photoatomic.average_heating_numbers, InterpolationLaw::LinLin)
            .map_err(|e| GenerationError::stage(STAGE, e))?;
        let incoherent = table(&self.photoatomic.incoherent_cross_section, InterpolationLaw::LogLog)
            .map_err(|e| GenerationError::stage(STAGE, e))?;
        let coherent = table(&self.photoatomic.coherent_cross_section, InterpolationLaw::LogLog)
            .map_err(|e| GenerationError::stage(STAGE, e))?;
        let photoelectric = table(
            &self.photoatomic.photoelectric_cross_section,
            InterpolationLaw::LogLog,
        )
        .map_err(|e| GenerationError::stage(STAGE, e))?;
        let pair_production = table(
            &self.photoatomic.pair_production_cross_section,
            InterpolationLaw::LogLog,
        )
        .map_err(|e| GenerationError::stage(STAGE, e))?;

        let mut subshell_photoelectric = BTreeMap::new();
        for (&designator, values) in &self.photoatomic.subshell_photoelectric_cross_sections {
            let function = table(values, InterpolationLaw::LogLog)
                .map_err(|e| GenerationError::subshell(STAGE, designator, e))?;
            subshell_photoelectric.insert(designator, function);
        }
        let mut impulse_incoherent = BTreeMap::new();
        if let Some(tables) = &self.photoatomic.impulse_approx_subshell_incoherent_cross_sections
        {
            for (&designator, raw) in tables {
                let function = TabularFunction::new(
                    raw.grid.clone(),
                    raw.values.clone(),
                    InterpolationLaw::LogLog,
                )
                .map_err(|e| GenerationError::subshell(STAGE, designator, e))?;
                impulse_incoherent.insert(designator, function);
            }
        }

        let mut quantities: Vec<UnionQuantity<'_>> = Vec::new();
        let heating_eval = |x: f64| heating.evaluate(x);
        let incoherent_eval = |x: f64| incoherent.evaluate(x);
        let coherent_eval = |x: f64| coherent.evaluate(x);
        let photoelectric_eval = |x: f64| photoelectric.evaluate(x);
        let pair_eval = |x: f64| pair_production.evaluate(x);
        quantities.push(UnionQuantity::new("photon heating numbers", &heating_eval));
        quantities.push(UnionQuantity::new("incoherent cross section", &incoherent_eval));
        quantities.push(UnionQuantity::new("coherent cross section", &coherent_eval));
        quantities.push(UnionQuantity::new(
            "photoelectric cross section",
            &photoelectric_eval,
        ));
        quantities.push(UnionQuantity::new(
            "pair production cross section",
            &pair_eval,
        ));
        let subshell_evals: Vec<(u32, Box<dyn Fn(f64) -> f64 + '_>)> = subshell_photoelectric
            .iter()
            .map(|(&designator, function)| {
                let evaluator: Box<dyn Fn(f64) -> f64 + '_> =
                    Box::new(move |x| function.evaluate(x));
                (designator, evaluator)
            })
            .collect();
        for (designator, evaluator) in &subshell_evals {
            quantities.push(UnionQuantity::new(
                format!("subshell {designator} photoelectric cross section"),
                evaluator.as_ref(),
            ));
        }
        let impulse_evals: Vec<(u32, Box<dyn Fn(f64) -> f64 + '_>)> = impulse_incoherent
            .iter()
            .map(|(&designator, function)| {
                let evaluator: Box<dyn Fn(f64) -> f64 + '_> =
                    Box::new(move |x| function.evaluate(x));
                (designator, evaluator)
            })
            .collect();
        let impulse_quantities: Vec<UnionQuantity<'_>> = impulse_evals
            .iter()
            .map(|(designator, evaluator)| {
                UnionQuantity::new(
                    format!("subshell {designator} impulse incoherent cross section"),
                    evaluator.as_ref(),
                )
            })
            .collect();

        let union_grid = builder
            .accumulate(seed, &quantities)
            .map_err(|e| GenerationError::stage(STAGE, e))?;
        // Impulse-approximation incoherent tables refine at their own
        // evaluation tolerance, not the shared grid tolerance.
        let union_grid = if impulse_quantities.is_empty() {
            union_grid
        } else {
            let incoherent_builder = UnionGridBuilder::new(
                self.config.min_photon_energy,
                self.config.max_photon_energy,
                self.config
                    .incoherent_convergence_config()
                    .map_err(|e| GenerationError::stage(STAGE, e))?,
                self.config.dirty_convergence_policy,
            )
            .map_err(|e| GenerationError::stage(STAGE, e))?;
            incoherent_builder
                .accumulate(union_grid, &impulse_quantities)
                .map_err(|e| GenerationError::stage(STAGE, e))?
        };
        tracing::info!(points = union_grid.len(), "photon union grid converged");

        // Dense totals before the grid moves into the container.
        let heating_values: Vec<f64> =
            union_grid.iter().map(|&energy| heating.evaluate(energy)).collect();
        let total: Vec<f64> = union_grid
            .iter()
            .map(|&energy| {
                incoherent.evaluate(energy)
                    + coherent.evaluate(energy)
                    + photoelectric.evaluate(energy)
                    + pair_production.evaluate(energy)
            })
            .collect();

        let incoherent_xs = resample(&union_grid, &|x| incoherent.evaluate(x));
        let coherent_xs = resample(&union_grid, &|x| coherent.evaluate(x));
        let photoelectric_xs = resample(&union_grid, &|x| photoelectric.evaluate(x));
        let pair_xs = resample(&union_grid, &|x| pair_production.evaluate(x));
        let subshell_xs: BTreeMap<u32, ThresholdIndexedArray> = subshell_photoelectric
            .iter()
            .map(|(&designator, function)| {
                (designator, resample(&union_grid, &|x| function.evaluate(x)))
            })
            .collect();
        let impulse_xs: BTreeMap<u32, ThresholdIndexedArray> = impulse_incoherent
            .iter()
            .map(|(&designator, function)| {
                (designator, resample(&union_grid, &|x| function.evaluate(x)))
            })
            .collect();

        container
            .set_photon_energy_grid(union_grid)
            .map_err(|e| GenerationError::stage(STAGE, e))?;
        container
            .set_average_photon_heating_numbers(heating_values)
            .map_err(|e| GenerationError::stage(STAGE, e))?;
        container
            .set_waller_hartree_incoherent_cross_section(incoherent_xs)
            .map_err(|e| GenerationError::stage(STAGE, e))?;
        container
            .set_waller_hartree_coherent_cross_section(coherent_xs)
            .map_err(|e| GenerationError::stage(STAGE, e))?;
        container
            .set_total_photoelectric_cross_section(photoelectric_xs)
            .map_err(|e| GenerationError::stage(STAGE, e))?;
        container
            .set_pair_production_cross_section(pair_xs)
            .map_err(|e| GenerationError::stage(STAGE, e))?;
        container
            .set_subshell_photoelectric_cross_sections(subshell_xs)
            .map_err(|e| GenerationError::stage(STAGE, e))?;
        if !impulse_xs.is_empty() {
            container
                .set_impulse_approx_subshell_incoherent_cross_sections(impulse_xs)
                .map_err(|e| GenerationError::stage(STAGE, e))?;
        }
        container
            .set_waller_hartree_total_cross_section(total)
            .map_err(|e| GenerationError::stage(STAGE, e))?;
        Ok(())
    }

    fn populate_electron_data(
        &self,
        container: &mut ElectronPhotonRelaxationDataContainer,
    ) -> Result<(ThresholdIndexedArray, ThresholdIndexedArray), GenerationError> {
        const STAGE: &str = "electron union grid";
        tracing::info!(stage = STAGE, "populating");

        let builder = self
            .union_builder(
                self.config.min_electron_energy,
                self.config.max_electron_energy,
            )
            .map_err(|e| GenerationError::stage(STAGE, e))?;
        let mut seed = builder.initialize(&self.endl.subshell_binding_energies);
        builder.merge(&mut seed, &self.endl.elastic_energy_grid);
        builder.merge(&mut seed, &self.endl.bremsstrahlung_cross_section.grid);
        builder.merge(&mut seed, &self.endl.atomic_excitation_cross_section.grid);

        let cutoff_elastic = TabularFunction::new(
            self.endl.elastic_energy_grid.clone(),
            self.endl.cutoff_elastic_cross_section.clone(),
            InterpolationLaw::LogLog,
        )
        .map_err(|e| GenerationError::stage(STAGE, e))?;
        let total_elastic = TabularFunction::new(
            self.endl.elastic_energy_grid.clone(),
            self.endl.total_elastic_cross_section.clone(),
            InterpolationLaw::LogLog,
        )
        .map_err(|e| GenerationError::stage(STAGE, e))?;
        let bremsstrahlung = TabularFunction::new(
            self.endl.bremsstrahlung_cross_section.grid.clone(),
            self.endl.bremsstrahlung_cross_section.values.clone(),
            InterpolationLaw::LogLog,
        )
        .map_err(|e| GenerationError::stage(STAGE, e))?;
        let atomic_excitation = TabularFunction::new(
            self.endl.atomic_excitation_cross_section.grid.clone(),
            self.endl.atomic_excitation_cross_section.values.clone(),
            InterpolationLaw::LogLog,
        )
        .map_err(|e| GenerationError::stage(STAGE, e))?;

        let mut electroionization = BTreeMap::new();
        for (&designator, raw) in &self.endl.electroionization_cross_sections {
            builder.merge(&mut seed, &raw.grid);
            let function = TabularFunction::new(
                raw.grid.clone(),
                raw.values.clone(),
                InterpolationLaw::LogLog,
            )
            .map_err(|e| GenerationError::subshell(STAGE, designator, e))?;
            electroionization.insert(designator, function);
        }

        let cutoff_eval = |x: f64| cutoff_elastic.evaluate(x);
        let total_eval = |x: f64| total_elastic.evaluate(x);
        let brems_eval = |x: f64| bremsstrahlung.evaluate(x);
        let excitation_eval = |x: f64| atomic_excitation.evaluate(x);
        let mut quantities = vec![
            UnionQuantity::new("cutoff elastic cross section", &cutoff_eval),
            UnionQuantity::new("total elastic cross section", &total_eval),
            UnionQuantity::new("bremsstrahlung cross section", &brems_eval),
            UnionQuantity::new("atomic excitation cross section", &excitation_eval),
        ];
        let ionization_evals: Vec<(u32, Box<dyn Fn(f64) -> f64 + '_>)> = electroionization
            .iter()
            .map(|(&designator, function)| {
                let evaluator: Box<dyn Fn(f64) -> f64 + '_> =
                    Box::new(move |x| function.evaluate(x));
                (designator, evaluator)
            })
            .collect();
        for (designator, evaluator) in &ionization_evals {
            quantities.push(UnionQuantity::new(
                format!("subshell {designator} electroionization cross section"),
                evaluator.as_ref(),
            ));
        }

        let union_grid = builder
            .accumulate(seed, &quantities)
            .map_err(|e| GenerationError::stage(STAGE, e))?;
        tracing::info!(points = union_grid.len(), "electron union grid converged");

        let cutoff_xs = resample(&union_grid, &|x| cutoff_elastic.evaluate(x));
        let total_xs = resample(&union_grid, &|x| total_elastic.evaluate(x));
        let screened_rutherford_xs = resample_difference(
            &union_grid,
            &|x| total_elastic.evaluate(x),
            &|x| cutoff_elastic.evaluate(x),
        );
        let brems_xs = resample(&union_grid, &|x| bremsstrahlung.evaluate(x));
        let excitation_xs = resample(&union_grid, &|x| atomic_excitation.evaluate(x));
        let ionization_xs: BTreeMap<u32, ThresholdIndexedArray> = electroionization
            .iter()
            .map(|(&designator, function)| {
                (designator, resample(&union_grid, &|x| function.evaluate(x)))
            })
            .collect();

        container
            .set_electron_energy_grid(union_grid)
            .map_err(|e| GenerationError::stage(STAGE, e))?;
        container
            .set_cutoff_elastic_cross_section(cutoff_xs.clone())
            .map_err(|e| GenerationError::stage(STAGE, e))?;
        container
            .set_screened_rutherford_elastic_cross_section(screened_rutherford_xs.clone())
            .map_err(|e| GenerationError::stage(STAGE, e))?;
        container
            .set_total_elastic_cross_section(total_xs)
            .map_err(|e| GenerationError::stage(STAGE, e))?;
        container
            .set_bremsstrahlung_cross_section(brems_xs)
            .map_err(|e| GenerationError::stage(STAGE, e))?;
        container
            .set_atomic_excitation_cross_section(excitation_xs)
            .map_err(|e| GenerationError::stage(STAGE, e))?;
        container
            .set_electroionization_cross_sections(ionization_xs)
            .map_err(|e| GenerationError::stage(STAGE, e))?;
        Ok((cutoff_xs, screened_rutherford_xs))
    }

    fn populate_elastic_angular_data(
        &self,
        container: &mut ElectronPhotonRelaxationDataContainer,
    ) -> Result<ElasticAngularData, GenerationError> {
        const STAGE: &str = "elastic angular data";
        tracing::info!(stage = STAGE, "populating");

        let mut angles = Vec::with_capacity(self.endl.elastic_angles.len());
        let mut pdfs = Vec::with_capacity(self.endl.elastic_pdf.len());
        for (one_minus_cosines, pdf) in
            self.endl.elastic_angles.iter().zip(&self.endl.elastic_pdf)
        {
            angles.push(elastic_angle_cosines(one_minus_cosines));
            pdfs.push(pdf.iter().rev().copied().collect::<Vec<f64>>());
        }

        container
            .set_elastic_angular_energy_grid(self.endl.elastic_angular_energy_grid.clone())
            .map_err(|e| GenerationError::stage(STAGE, e))?;
        container
            .set_cutoff_elastic_angles(angles.clone())
            .map_err(|e| GenerationError::stage(STAGE, e))?;
        container
            .set_cutoff_elastic_pdf(pdfs.clone())
            .map_err(|e| GenerationError::stage(STAGE, e))?;

        Ok(ElasticAngularData {
            energy_grid: self.endl.elastic_angular_energy_grid.clone(),
            angles,
            pdfs,
        })
    }

    fn populate_moment_preserving_data(
        &self,
        container: &mut ElectronPhotonRelaxationDataContainer,
        angular_data: &ElasticAngularData,
        cutoff_elastic: &ThresholdIndexedArray,
        screened_rutherford: &ThresholdIndexedArray,
    ) -> Result<(), GenerationError> {
        const STAGE: &str = "moment-preserving data";
        tracing::info!(
            stage = STAGE,
            cutoff = self.config.cutoff_angle_cosine,
            angles = self.config.number_of_moment_preserving_angles,
            "populating"
        );

        let reducer = MomentPreservingElasticReducer::new(
            self.config.cutoff_angle_cosine,
            self.config.number_of_moment_preserving_angles,
        )
        .map_err(|e| GenerationError::stage(STAGE, e))?;

        let mut distributions: Vec<DiscreteAngularDistribution> =
            Vec::with_capacity(angular_data.energy_grid.len());
        let mut reduction_factors = Vec::with_capacity(angular_data.energy_grid.len());
        let mut cutoff_cdfs = Vec::with_capacity(angular_data.energy_grid.len());
        for ((&energy, angles), pdf) in angular_data
            .energy_grid
            .iter()
            .zip(&angular_data.angles)
            .zip(&angular_data.pdfs)
        {
            let distribution = CutoffElasticDistribution::new(angles.clone(), pdf.clone())
                .map_err(|e| GenerationError::stage(STAGE, e))?;
            let cutoff_cdf = distribution.cdf(self.config.cutoff_angle_cosine);
            let boundary_pdf = distribution.pdf(RUTHERFORD_PEAK_ANGLE_COSINE);

            let eta = moliere_screening_constant(energy, self.config.atomic_number)
                .map_err(|e| GenerationError::stage(STAGE, e))?;
            let tail = if boundary_pdf > 0.0 {
                Some(
                    ScreenedRutherfordTail::new(eta, boundary_pdf)
                        .map_err(|e| GenerationError::stage(STAGE, e))?,
                )
            } else {
                None
            };

            let evaluator = ElasticMomentEvaluator::new(CombinedElasticDistribution::new(
                distribution,
                tail,
            ));
            let reduced = reducer
                .reduce(&evaluator)
                .map_err(|e| GenerationError::stage(STAGE, e))?;
            tracing::debug!(
                energy,
                reduction_factor = reduced.cross_section_reduction_factor,
                "energy reduced"
            );
            reduction_factors.push(reduced.cross_section_reduction_factor);
            cutoff_cdfs.push(cutoff_cdf);
            distributions.push(reduced);
        }

        container
            .set_moment_preserving_distributions(distributions)
            .map_err(|e| GenerationError::stage(STAGE, e))?;

        // Reduction factors and cutoff cdfs interpolate lin-lin across the
        // angular energy grid onto the electron union grid.
        let electron_grid = container
            .electron_energy_grid()
            .ok_or_else(|| {
                GenerationError::stage(
                    STAGE,
                    ContainerError::MissingPrerequisite {
                        field: "moment_preserving_cross_section",
                        requires: "electron_energy_grid",
                    },
                )
            })?
            .to_vec();
        let factor_table = TabularFunction::new(
            angular_data.energy_grid.clone(),
            reduction_factors,
            InterpolationLaw::LinLin,
        )
        .map_err(|e| GenerationError::stage(STAGE, e))?;
        let cdf_table = TabularFunction::new(
            angular_data.energy_grid.clone(),
            cutoff_cdfs,
            InterpolationLaw::LinLin,
        )
        .map_err(|e| GenerationError::stage(STAGE, e))?;

        let dense_factors: Vec<f64> = electron_grid
            .iter()
            .map(|&energy| factor_table.evaluate(energy))
            .collect();
        let dense_cdfs: Vec<f64> = electron_grid
            .iter()
            .map(|&energy| cdf_table.evaluate(energy))
            .collect();

        let mp_xs = moment_preserving_cross_section(
            cutoff_elastic,
            screened_rutherford,
            &dense_cdfs,
            &dense_factors,
        )
        .map_err(|e| GenerationError::stage(STAGE, e))?;
        container
            .set_moment_preserving_cross_section(mp_xs)
            .map_err(|e| GenerationError::stage(STAGE, e))?;
        Ok(())
    }

    fn populate_pass_through_data(
        &self,
        container: &mut ElectronPhotonRelaxationDataContainer,
    ) -> Result<(), GenerationError> {
        const STAGE: &str = "pass-through data";
        tracing::info!(stage = STAGE, "populating");

        container
            .set_bremsstrahlung_photon_data(
                self.endl.bremsstrahlung_photon_energy_grid.clone(),
                self.endl.bremsstrahlung_photon_energies.clone(),
                self.endl.bremsstrahlung_photon_pdf.clone(),
            )
            .map_err(|e| GenerationError::stage(STAGE, e))?;
        container
            .set_atomic_excitation_energy_loss(
                self.endl.atomic_excitation_energy_loss.grid.clone(),
                self.endl.atomic_excitation_energy_loss.values.clone(),
            )
            .map_err(|e| GenerationError::stage(STAGE, e))?;

        let mut recoil_grids = BTreeMap::new();
        let mut recoil_energies = BTreeMap::new();
        let mut recoil_pdf = BTreeMap::new();
        for (&designator, recoil) in &self.endl.electroionization_recoil {
            recoil_grids.insert(designator, recoil.incident_energy_grid.clone());
            recoil_energies.insert(designator, recoil.recoil_energies.clone());
            recoil_pdf.insert(designator, recoil.recoil_pdf.clone());
        }
        container
            .set_electroionization_recoil_data(recoil_grids, recoil_energies, recoil_pdf)
            .map_err(|e| GenerationError::stage(STAGE, e))?;
        Ok(())
    }

    fn grid_generator(
        &self,
        config: Result<ConvergenceConfig, ConvergenceConfigError>,
    ) -> Result<AdaptiveGridGenerator, StageError> {
        Ok(AdaptiveGridGenerator::new(
            config?,
            self.config.dirty_convergence_policy,
        ))
    }

    fn union_builder(&self, domain_min: f64, domain_max: f64) -> Result<UnionGridBuilder, StageError> {
        Ok(UnionGridBuilder::new(
            domain_min,
            domain_max,
            self.config.grid_convergence_config()?,
            self.config.dirty_convergence_policy,
        )?)
    }
}

struct ElasticAngularData {
    energy_grid: Vec<f64>,
    angles: Vec<Vec<f64>>,
    pdfs: Vec<Vec<f64>>,
}

fn refine_table(
    generator: &AdaptiveGridGenerator,
    grid: &[f64],
    values: &[f64],
    law: InterpolationLaw,
) -> Result<(Vec<f64>, Vec<f64>), StageError> {
    let table = TabularFunction::new(grid.to_vec(), values.to_vec(), law)?;
    let evaluate = |x: f64| table.evaluate(x);
    let refined = generator.generate(table.grid(), &[&evaluate as &dyn Fn(f64) -> f64])?;
    let resampled = refined.iter().map(|&x| table.evaluate(x)).collect();
    Ok((refined, resampled))
}
