//! End-to-end runs of the generate -> fit -> compare pipeline.

use hist_fit::app::pipeline::{self, RunOutput};
use hist_fit::app::write_output;
use hist_fit::domain::{DiagnosticStart, FitRange, LossMode, RunConfig};
use hist_fit::error::FitError;
use hist_fit::models::ExponentialModel;

fn reference_run() -> RunOutput {
    pipeline::run(&RunConfig::default()).expect("reference run")
}

#[test]
fn reference_run_recovers_tail_slope() {
    let run = reference_run();
    let hist = &run.sample.histogram;

    assert_eq!(hist.total(), 100_000.0);
    let peak = hist.maximum_bin();
    assert!((4..=12).contains(&peak), "peak bin {peak}");

    let dropoff = run.fit.parameters[ExponentialModel::DROPOFF];
    assert!((dropoff + 0.1).abs() < 0.02, "dropoff {dropoff}");

    for (spec, value) in ExponentialModel::default_parameters()
        .iter()
        .zip(&run.fit.parameters)
    {
        assert!(spec.contains(*value), "{} = {value} outside bounds", spec.name);
    }
    assert_eq!(run.fit.n_bins_used, 80);
    assert_eq!(run.fit.ndf, 78);
}

#[test]
fn chi2_run_agrees_with_likelihood() {
    let config = RunConfig {
        loss: LossMode::Chi2,
        ..RunConfig::default()
    };
    let chi2 = pipeline::run(&config).unwrap();
    let dropoff = chi2.fit.parameters[ExponentialModel::DROPOFF];
    assert!((dropoff + 0.1).abs() < 0.02, "dropoff {dropoff}");
    assert_eq!(chi2.fit.loss, LossMode::Chi2);
}

#[test]
fn runs_are_deterministic() {
    let a = reference_run();
    let b = reference_run();
    assert_eq!(a.sample.histogram, b.sample.histogram);
    assert_eq!(a.fit.parameters, b.fit.parameters);
    assert_eq!(a.residuals.rows, b.residuals.rows);
}

#[test]
fn zero_events_is_an_empty_fit() {
    let config = RunConfig {
        n_events: 0,
        ..RunConfig::default()
    };
    let err = pipeline::run(&config).unwrap_err();
    assert!(matches!(err, FitError::EmptyFit(_)), "{err}");
    assert_eq!(err.exit_code(), 3);
}

#[test]
fn sparse_sample_fits_small_normalization() {
    let config = RunConfig {
        n_events: 5,
        ..RunConfig::default()
    };
    let run = pipeline::run(&config).unwrap();
    let norm = run.fit.parameters[ExponentialModel::NORMALIZATION];
    assert!(norm > 0.0 && norm < 10.0, "normalization {norm}");
}

#[test]
fn fit_range_outside_histogram_is_rejected() {
    let config = RunConfig {
        fit_range: FitRange::new(20.0, 150.0),
        ..RunConfig::default()
    };
    let err = pipeline::run(&config).unwrap_err();
    assert!(matches!(err, FitError::InvalidRange { .. }), "{err}");
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn compare_lines_start_at_underflow_slot() {
    let run = reference_run();
    let rows = &run.residuals.rows;
    assert_eq!(rows.len(), 100);
    assert_eq!(rows[0].bin, 0);
    assert_eq!(rows[0].low, -1.0);
    assert_eq!(rows[0].content, 0.0);
    assert_eq!(rows[99].bin, 99);

    let config = RunConfig {
        plot: false,
        ..RunConfig::default()
    };
    let mut buf = Vec::new();
    write_output(&mut buf, &config, &run).unwrap();
    let text = String::from_utf8(buf).unwrap();
    let compare: Vec<&str> = text.lines().filter(|l| l.starts_with("Compare : ")).collect();
    assert_eq!(compare.len(), 100);
    assert!(compare[0].starts_with("Compare : -1 0 "));
    assert!(text.contains("=== Fit of fitFunc over [20, 100] ==="));
}

#[test]
fn first_bin_start_covers_every_real_bin() {
    let config = RunConfig {
        diagnostic_start: DiagnosticStart::FirstBin,
        ..RunConfig::default()
    };
    let run = pipeline::run(&config).unwrap();
    let rows = &run.residuals.rows;
    assert_eq!(rows.first().map(|r| (r.bin, r.low)), Some((1, 0.0)));
    assert_eq!(rows.last().map(|r| r.bin), Some(100));
}

#[test]
fn json_output_is_a_single_document() {
    let run = reference_run();
    let config = RunConfig {
        json: true,
        print_compare: false,
        ..RunConfig::default()
    };
    let mut buf = Vec::new();
    write_output(&mut buf, &config, &run).unwrap();

    let doc: serde_json::Value = serde_json::from_slice(&buf).unwrap();
    assert_eq!(doc["seed"], 4357);
    assert_eq!(doc["histogram"]["entries"], 100_000);
    assert_eq!(doc["fit"]["loss"], "log-likelihood");
    assert_eq!(doc["residuals"].as_array().map(Vec::len), Some(100));
}
