//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - installs the log subscriber
//! - runs the generate/fit/compare pipeline
//! - prints the Compare lines, summaries and plots (or JSON)

use std::io::{self, Write};

use clap::Parser;
use serde::Serialize;

use crate::cli::{Cli, RunArgs};
use crate::data::Histogram1D;
use crate::domain::{CompareRow, FitRange, FitResult, RunConfig};
use crate::error::AppError;
use crate::models::{ExponentialModel, ModelFunction};

pub mod pipeline;

/// Exit code for failures writing to stdout.
const OUTPUT_EXIT_CODE: u8 = 5;

/// Entry point for the `hfit` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let config = run_config_from_args(&cli.run);
    let output = pipeline::run(&config)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_output(&mut out, &config, &output).map_err(output_error)?;
    out.flush().map_err(output_error)
}

fn output_error(err: io::Error) -> AppError {
    AppError::new(OUTPUT_EXIT_CODE, format!("Failed to write output: {err}"))
}

pub fn run_config_from_args(args: &RunArgs) -> RunConfig {
    RunConfig {
        n_events: args.events,
        seed: args.seed,
        n_bins: args.bins,
        low: args.low,
        high: args.high,
        fit_range: FitRange::new(args.fit_min, args.fit_max),
        loss: args.loss,
        expectation: args.expectation,
        allow_at_limit: args.allow_at_limit,
        max_iter: args.max_iter,
        diagnostic_start: args.diagnostic_start,
        plot: args.plot && !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,
        json: args.json,
        print_compare: !args.quiet_compare,
    }
}

/// Histogram numbers included in the JSON report.
#[derive(Debug, Clone, Serialize)]
pub struct HistogramStats {
    pub n_bins: usize,
    pub low: f64,
    pub high: f64,
    pub entries: u64,
    pub underflow: f64,
    pub overflow: f64,
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
    pub peak_bin: Option<usize>,
}

impl HistogramStats {
    pub fn from_histogram(hist: &Histogram1D) -> Self {
        Self {
            n_bins: hist.n_bins(),
            low: hist.low(),
            high: hist.high(),
            entries: hist.entries(),
            underflow: hist.underflow(),
            overflow: hist.overflow(),
            mean: hist.mean(),
            std_dev: hist.std_dev(),
            peak_bin: (hist.integral() > 0.0).then(|| hist.maximum_bin()),
        }
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    seed: u64,
    histogram: HistogramStats,
    fit: &'a FitResult,
    residuals: &'a [CompareRow],
}

/// Print a run in the order: Compare lines, then summaries + plots or JSON.
pub fn write_output<W: Write>(
    out: &mut W,
    config: &RunConfig,
    output: &pipeline::RunOutput,
) -> io::Result<()> {
    let hist = &output.sample.histogram;
    let model = ExponentialModel;

    if config.print_compare {
        crate::report::write_compare_lines(out, &output.residuals.rows)?;
    }

    if config.json {
        let report = JsonReport {
            seed: output.sample.seed,
            histogram: HistogramStats::from_histogram(hist),
            fit: &output.fit,
            residuals: &output.residuals.rows,
        };
        serde_json::to_writer_pretty(&mut *out, &report).map_err(io::Error::other)?;
        writeln!(out)?;
        return Ok(());
    }

    writeln!(out)?;
    write!(out, "{}", crate::report::format_histogram_summary("h1", hist))?;
    writeln!(out)?;
    write!(out, "{}", crate::report::format_fit_summary(model.name(), &output.fit))?;

    if config.plot {
        writeln!(out)?;
        write!(
            out,
            "{}",
            crate::plot::render_fit_panel(hist, &model, &output.fit, config.plot_width, config.plot_height)
        )?;
        writeln!(out)?;
        write!(
            out,
            "{}",
            crate::plot::render_residual_panel(&output.residuals, config.plot_width, config.plot_height)
        )?;
    }
    Ok(())
}
