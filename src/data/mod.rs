//! Data containers and synthetic data generation.

pub mod histogram;
pub mod sample;

pub use histogram::Histogram1D;
pub use sample::{SampleData, TabulatedSampler, generate_histogram};
