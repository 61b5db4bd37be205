//! Command-line parsing for the histogram fitter.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! sampling/fitting code. Every default is the value of the reference run.

use clap::{Args, Parser};

use crate::domain::{BinExpectation, DiagnosticStart, LossMode};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "hfit",
    version,
    about = "Generate, histogram and fit an exponential tail, then compare bin by bin"
)]
pub struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: tracing::Level,

    #[command(flatten)]
    pub run: RunArgs,
}

/// Options for a single generate/fit/compare run.
#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    /// Number of samples drawn from the generating density.
    #[arg(short = 'n', long, default_value_t = 100_000)]
    pub events: usize,

    /// Random seed for sample generation.
    #[arg(long, default_value_t = 4357)]
    pub seed: u64,

    /// Number of histogram bins.
    #[arg(long, default_value_t = 100)]
    pub bins: usize,

    /// Lower edge of the histogram (and of the sampling domain).
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub low: f64,

    /// Upper edge of the histogram (and of the sampling domain).
    #[arg(long, default_value_t = 100.0, allow_negative_numbers = true)]
    pub high: f64,

    /// Lower end of the fit range.
    #[arg(long, default_value_t = 20.0, allow_negative_numbers = true)]
    pub fit_min: f64,

    /// Upper end of the fit range.
    #[arg(long, default_value_t = 100.0, allow_negative_numbers = true)]
    pub fit_max: f64,

    /// Loss minimized by the fit.
    #[arg(long, value_enum, default_value_t = LossMode::LogLikelihood)]
    pub loss: LossMode,

    /// Expected bin count: model integral over the bin, or model value at its centre.
    #[arg(long, value_enum, default_value_t = BinExpectation::Integral)]
    pub expectation: BinExpectation,

    /// First slot of the Compare diagnostic (`underflow` keeps the historical loop).
    #[arg(long, value_enum, default_value_t = DiagnosticStart::Underflow)]
    pub diagnostic_start: DiagnosticStart,

    /// Accept a best fit with a parameter pinned at its bound.
    #[arg(long)]
    pub allow_at_limit: bool,

    /// L-BFGS iteration budget.
    #[arg(long, default_value_t = 1000)]
    pub max_iter: u64,

    /// Render ASCII plots in the terminal (enabled by default).
    #[arg(long, default_value_t = true)]
    pub plot: bool,

    /// Disable the terminal plots.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,

    /// Print one JSON document instead of the text summaries and plots.
    #[arg(long)]
    pub json: bool,

    /// Do not print the per-bin `Compare` lines.
    #[arg(long)]
    pub quiet_compare: bool,
}
