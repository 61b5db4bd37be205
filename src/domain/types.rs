//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during generation, fitting and diagnostics
//! - printed as JSON by `hfit --json`
//! - handed to an optional renderer as plain data

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Loss minimized by the fitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum LossMode {
    /// Neyman chi-square with per-bin variance taken from the histogram's sum of
    /// squared weights. Bins with zero variance are skipped.
    Chi2,
    /// Binned Poisson likelihood (Baker–Cousins form, on the chi-square scale).
    LogLikelihood,
}

impl LossMode {
    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            LossMode::Chi2 => "Chi2",
            LossMode::LogLikelihood => "-2 log(L)",
        }
    }
}

/// How the expected count of a bin is derived from the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum BinExpectation {
    /// Definite integral of the model over the bin.
    Integral,
    /// Model value at the bin centre (the model is read as "counts per bin").
    Center,
}

/// First histogram slot visited by the residual diagnostic.
///
/// The diagnostic always visits `n_bins` consecutive slots. Starting at the
/// underflow slot reproduces the historical loop (`i = 0 .. n_bins - 1`), which
/// covers the underflow and skips the last real bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticStart {
    Underflow,
    FirstBin,
}

impl DiagnosticStart {
    pub fn first_index(self) -> usize {
        match self {
            DiagnosticStart::Underflow => 0,
            DiagnosticStart::FirstBin => 1,
        }
    }
}

/// A named fit parameter with its starting value and box constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    pub initial: f64,
    pub lower: f64,
    pub upper: f64,
}

impl ParameterSpec {
    pub fn new(name: impl Into<String>, initial: f64, lower: f64, upper: f64) -> Self {
        Self {
            name: name.into(),
            initial,
            lower,
            upper,
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

/// Closed interval of the independent variable used to select fit bins.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitRange {
    pub min: f64,
    pub max: f64,
}

impl FitRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, x: f64) -> bool {
        x >= self.min && x <= self.max
    }
}

/// Which minimizer stage produced the accepted minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Minimizer {
    Lbfgs,
    NelderMead,
}

impl Minimizer {
    pub fn display_name(self) -> &'static str {
        match self {
            Minimizer::Lbfgs => "L-BFGS",
            Minimizer::NelderMead => "Nelder-Mead",
        }
    }
}

/// Fit-quality metadata attached to every successful fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitStatus {
    pub minimizer: Minimizer,
    /// Termination message of the accepted stage.
    pub message: String,
    /// `false` when the Hessian could not be inverted and the errors are
    /// diagonal approximations (no covariance matrix is reported).
    pub covariance_ok: bool,
}

/// Fit output: best-fit values and their uncertainties.
///
/// The model evaluator is never mutated; callers evaluate it with
/// [`FitResult::parameters`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitResult {
    pub parameter_names: Vec<String>,
    pub parameters: Vec<f64>,
    pub errors: Vec<f64>,
    /// Row-major covariance matrix, if the Hessian was invertible.
    pub covariance: Option<Vec<f64>>,
    pub loss: LossMode,
    pub range: FitRange,
    /// Loss value at the minimum.
    pub min_value: f64,
    /// Bins contributing to the loss.
    pub n_bins_used: usize,
    /// Degrees of freedom (`n_bins_used - n_params`).
    pub ndf: usize,
    pub n_iter: u64,
    pub n_fev: usize,
    pub n_gev: usize,
    pub status: FitStatus,
}

impl FitResult {
    /// Best-fit value of a parameter, looked up by name.
    pub fn parameter(&self, name: &str) -> Option<f64> {
        self.index_of(name).map(|i| self.parameters[i])
    }

    pub fn value_per_ndf(&self) -> Option<f64> {
        (self.ndf > 0).then(|| self.min_value / self.ndf as f64)
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.parameter_names.iter().position(|n| n == name)
    }
}

/// One line of the residual diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompareRow {
    /// Histogram slot index (0 = underflow).
    pub bin: usize,
    pub low: f64,
    pub content: f64,
    pub fit_integral: f64,
    pub residual: f64,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags; [`Default`] holds the values of the
/// reference tutorial run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub n_events: usize,
    pub seed: u64,

    pub n_bins: usize,
    pub low: f64,
    pub high: f64,

    pub fit_range: FitRange,
    pub loss: LossMode,
    pub expectation: BinExpectation,
    /// Accept minima with a parameter pinned at a box boundary.
    pub allow_at_limit: bool,
    pub max_iter: u64,

    pub diagnostic_start: DiagnosticStart,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,
    pub json: bool,
    pub print_compare: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            n_events: 100_000,
            seed: 4357,
            n_bins: 100,
            low: 0.0,
            high: 100.0,
            fit_range: FitRange::new(20.0, 100.0),
            loss: LossMode::LogLikelihood,
            expectation: BinExpectation::Integral,
            allow_at_limit: false,
            max_iter: 1000,
            diagnostic_start: DiagnosticStart::Underflow,
            plot: true,
            plot_width: 100,
            plot_height: 20,
            json: false,
            print_compare: true,
        }
    }
}
