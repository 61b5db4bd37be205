//! `hist-fit` library crate.
//!
//! The binary (`hfit`) is a thin wrapper around this library so that:
//!
//! - the generate/fit/compare pipeline is testable without spawning processes
//! - rendering stays an optional consumer of plain data

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
