//! Electron-photon-relaxation data generation.
//!
//! Converts extracted photoatomic (ACE) and ENDL electron tables into a
//! self-consistent native data container: adaptive union-energy-grid
//! construction, cross-section resampling with threshold bookkeeping, and
//! the moment-preserving reduction of elastic angular distributions.

pub mod common;
pub mod data;
pub mod elastic;
pub mod generator;
pub mod grid;
pub mod numerics;

pub use data::container::{ElectronPhotonRelaxationDataContainer, GenerationParameters};
pub use data::extractors::{EndlElectronTable, PhotoatomicTable};
pub use generator::{GenerationError, GeneratorConfig, StandardGenerator};
