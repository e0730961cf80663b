//! Adaptive grid refinement, union-grid construction, and threshold-indexed
//! resampling of cross sections onto the shared energy grid.

pub mod generator;
pub mod resample;
pub mod union;

pub use generator::{
    AdaptiveGridGenerator, ConvergenceConfig, ConvergenceConfigError, DirtyConvergencePolicy,
    GridConvergenceError,
};
pub use resample::{resample, resample_difference, ThresholdIndexedArray};
pub use union::{UnionGridBuilder, UnionGridError, UnionQuantity};
