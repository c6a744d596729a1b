//! Tract Typology math utilities.

pub mod math;

pub use math::entropy::*;
pub use math::gaussian::*;
pub use math::linalg::{clamp_eigenvalues, symmetric_eigen, Cholesky, Matrix, SymmetricEigen};
pub use math::moments::*;
pub use math::stable::*;
