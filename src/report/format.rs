//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the data/fitting code stays clean and testable
//! - output changes are localized (easy to pin in tests)

use crate::data::Histogram1D;
use crate::domain::FitResult;

/// ROOT-style fit block: loss, minimum, NDf, status and the parameter table.
pub fn format_fit_summary(model_name: &str, fit: &FitResult) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "=== Fit of {model_name} over [{}, {}] ===\n",
        fit.range.min, fit.range.max
    ));
    out.push_str(&format!(
        "{:<14} = {:.6}\n",
        fit.loss.display_name(),
        fit.min_value
    ));
    out.push_str(&format!("{:<14} = {}\n", "NDf", fit.ndf));
    if let Some(per_ndf) = fit.value_per_ndf() {
        out.push_str(&format!("{:<14} = {per_ndf:.4}\n", "value / NDf"));
    }
    out.push_str(&format!(
        "{:<14} = {} ({} iterations, {} calls, {} gradients)\n",
        "Minimizer",
        fit.status.minimizer.display_name(),
        fit.n_iter,
        fit.n_fev,
        fit.n_gev
    ));
    if !fit.status.covariance_ok {
        out.push_str("Covariance     = not positive definite, diagonal errors only\n");
    }

    let width = fit
        .parameter_names
        .iter()
        .map(|n| n.len())
        .max()
        .unwrap_or(0)
        .max(4);
    for (i, name) in fit.parameter_names.iter().enumerate() {
        out.push_str(&format!(
            "p{i} {name:<width$} = {:>14.6e} +/- {:.6e}\n",
            fit.parameters[i], fit.errors[i]
        ));
    }

    out
}

/// Entries, moments, flows and the peak bin of a histogram.
pub fn format_histogram_summary(name: &str, hist: &Histogram1D) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "=== {name}: {} bins over [{}, {}) ===\n",
        hist.n_bins(),
        hist.low(),
        hist.high()
    ));
    out.push_str(&format!("Entries   = {}\n", hist.entries()));
    match (hist.mean(), hist.std_dev()) {
        (Some(mean), Some(rms)) => {
            out.push_str(&format!("Mean      = {mean:.4}\n"));
            out.push_str(&format!("Std Dev   = {rms:.4}\n"));
        }
        _ => out.push_str("Mean      = n/a (empty)\n"),
    }
    out.push_str(&format!("Underflow = {}\n", hist.underflow()));
    out.push_str(&format!("Overflow  = {}\n", hist.overflow()));
    if hist.integral() > 0.0 {
        let peak = hist.maximum_bin();
        out.push_str(&format!(
            "Peak      = bin {peak} (centre {}, content {})\n",
            hist.bin_center(peak),
            hist.content(peak)
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FitRange, FitStatus, LossMode, Minimizer};

    fn fit() -> FitResult {
        FitResult {
            parameter_names: vec!["Normalization".into(), "Dropoff".into()],
            parameters: vec![18000.0, -0.095],
            errors: vec![120.0, 0.0005],
            covariance: None,
            loss: LossMode::LogLikelihood,
            range: FitRange::new(20.0, 100.0),
            min_value: 80.0,
            n_bins_used: 80,
            ndf: 78,
            n_iter: 12,
            n_fev: 40,
            n_gev: 25,
            status: FitStatus {
                minimizer: Minimizer::Lbfgs,
                message: "Solver converged".into(),
                covariance_ok: false,
            },
        }
    }

    #[test]
    fn fit_summary_lists_every_parameter() {
        let s = format_fit_summary("fitFunc", &fit());
        assert!(s.starts_with("=== Fit of fitFunc over [20, 100] ===\n"));
        assert!(s.contains("-2 log(L)      = 80.000000\n"));
        assert!(s.contains("NDf            = 78\n"));
        assert!(s.contains("Minimizer      = L-BFGS (12 iterations, 40 calls, 25 gradients)\n"));
        assert!(s.contains("p0 Normalization ="));
        assert!(s.contains("p1 Dropoff       ="));
        assert!(s.contains("diagonal errors only"));
    }

    #[test]
    fn histogram_summary_handles_empty() {
        let h = Histogram1D::new(10, 0.0, 10.0).unwrap();
        let s = format_histogram_summary("h", &h);
        assert!(s.contains("Entries   = 0\n"));
        assert!(s.contains("n/a (empty)"));
        assert!(!s.contains("Peak"));
    }

    #[test]
    fn histogram_summary_reports_peak() {
        let mut h = Histogram1D::new(10, 0.0, 10.0).unwrap();
        h.fill(3.2);
        h.fill(3.7);
        h.fill(12.0);
        let s = format_histogram_summary("h", &h);
        assert!(s.contains("Overflow  = 1\n"));
        assert!(s.contains("Peak      = bin 4 (centre 3.5, content 2)\n"));
    }
}
