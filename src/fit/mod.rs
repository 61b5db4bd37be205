//! Histogram fitting.
//!
//! Responsibilities:
//!
//! - turn a histogram + fit range into a binned loss (chi-square or Poisson likelihood)
//! - minimize it inside the parameter boxes
//! - report the minimum, uncertainties and status as a [`crate::domain::FitResult`]

pub mod fitter;
pub mod objective;
pub mod optimizer;

pub use fitter::*;
pub use objective::*;
pub use optimizer::*;
