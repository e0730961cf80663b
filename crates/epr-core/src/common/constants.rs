//! Physical and policy constants shared across the generation pipeline.
//!
//! Values are kept in one place so the grid, elastic, and orchestration
//! modules never carry ad hoc per-module literals.

/// Fine structure constant.
pub const FINE_STRUCTURE: f64 = 1.0 / 137.035_999_139_f64;

/// Electron rest mass energy in MeV.
pub const ELECTRON_REST_MASS_MEV: f64 = 0.510_998_918_f64;

/// Thomas-Fermi screening radius factor entering the Moliere constant.
pub const THOMAS_FERMI_RADIUS_FACTOR: f64 = 0.885;

/// Multiplier applied to every must-include union-grid point to create its
/// near-threshold companion just above the discontinuity.
pub const THRESHOLD_NUDGE_FACTOR: f64 = 1.0001;

/// Angle cosine separating the tabulated cutoff elastic distribution from
/// the analytic screened-Rutherford forward peak.
pub const RUTHERFORD_PEAK_ANGLE_COSINE: f64 = 0.999999;

/// Relative tolerance used when deduplicating adjacent grid abscissas.
pub const GRID_DEDUP_RELATIVE_TOLERANCE: f64 = 1.0e-15;

/// Relative difference below which `total - cutoff` elastic cross sections
/// are treated as roundoff and snapped to exactly zero.
pub const ELASTIC_DIFFERENCE_SNAP_TOLERANCE: f64 = 1.0e-6;

/// Target precision for elastic Legendre moment quadrature.
pub const MOMENT_QUADRATURE_PRECISION: f64 = 1.0e-13;
