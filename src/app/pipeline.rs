//! Shared "fit pipeline" logic.
//!
//! Keeping this in one place keeps the core workflow free of presentation:
//! sample generation -> histogram -> fit -> residuals
//!
//! The binary then only decides how to print the outputs.

use tracing::info;

use crate::data::{SampleData, generate_histogram};
use crate::domain::{FitResult, RunConfig};
use crate::error::FitError;
use crate::fit::{FitSpec, OptimizerConfig, fit_histogram};
use crate::models::{ExponentialModel, reference_density};
use crate::report::{ResidualSeries, compute_residuals};

/// All computed outputs of a single run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub sample: SampleData,
    pub fit: FitResult,
    pub residuals: ResidualSeries,
}

/// Fit specification for `config`: the reference exponential with the run's
/// range, loss and limits.
pub fn fit_spec_from_config(config: &RunConfig) -> FitSpec {
    FitSpec {
        range: config.fit_range,
        loss: config.loss,
        expectation: config.expectation,
        allow_at_limit: config.allow_at_limit,
        optimizer: OptimizerConfig {
            max_iter: config.max_iter,
            ..OptimizerConfig::default()
        },
        ..FitSpec::reference()
    }
}

/// Execute the full pipeline and return the computed outputs.
pub fn run(config: &RunConfig) -> Result<RunOutput, FitError> {
    // 1) Sample the reference density into a histogram.
    let sample = generate_histogram(reference_density, config)?;
    info!(
        entries = sample.histogram.entries(),
        seed = sample.seed,
        "sample generated"
    );

    // 2) Fit the exponential tail.
    let model = ExponentialModel;
    let fit = fit_histogram(&sample.histogram, &model, &fit_spec_from_config(config))?;

    // 3) Compare data and model bin by bin.
    let residuals = compute_residuals(
        &sample.histogram,
        &model,
        &fit.parameters,
        config.diagnostic_start,
    );

    Ok(RunOutput {
        sample,
        fit,
        residuals,
    })
}
