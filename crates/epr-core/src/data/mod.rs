//! Input-table interfaces and the generated data container.

pub mod container;
pub mod extractors;

pub use container::{
    ContainerError, ElectronPhotonRelaxationDataContainer, GenerationParameters,
};
pub use extractors::{
    DataExtractionError, EndlElectronTable, PhotoatomicTable, RawTable, RecoilTable,
};
