pub mod legendre;
pub mod quadrature;
pub mod radau;
pub mod tabular;

pub use legendre::{
    legendre, legendre_sequence, monomial_in_legendre_basis, power_moments_from_legendre_moments,
};
pub use quadrature::{integrate_adaptive, CompensatedSum, QuadratureError};
pub use radau::{radau_quadrature, MomentInversionError, RadauQuadrature};
pub use tabular::{interpolate_cell, InterpolationLaw, TabularError, TabularFunction};
