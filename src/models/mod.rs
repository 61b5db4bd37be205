//! Fit models and the generating density.
//!
//! Models are small, pure evaluators so that fitting and diagnostics code can
//! stay generic over [`ModelFunction`].

pub mod model;

pub use model::*;
