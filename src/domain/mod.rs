//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - configuration enums (`LossMode`, `BinExpectation`, `DiagnosticStart`)
//! - fit inputs (`ParameterSpec`, `FitRange`, `RunConfig`)
//! - fit outputs (`FitResult`, `FitStatus`, `CompareRow`)

pub mod types;

pub use types::*;
