//! Numerical utilities: quadrature and finite differences.

pub mod diff;
pub mod quadrature;

pub use diff::*;
pub use quadrature::*;
