//! Reporting utilities: per-bin residuals and the `Compare` lines.

pub mod format;

use std::io::{self, Write};

use serde::Serialize;

use crate::data::Histogram1D;
use crate::domain::{CompareRow, DiagnosticStart};
use crate::models::ModelFunction;

pub use format::*;

/// Residual ratios `content / ∫model − 1` for a fitted histogram.
#[derive(Debug, Clone, Serialize)]
pub struct ResidualSeries {
    /// Same binning as the input; slot `i` holds the residual of visited slot `i`,
    /// every other slot is 0.
    pub histogram: Histogram1D,
    /// One record per visited slot, in visiting order.
    pub rows: Vec<CompareRow>,
}

/// Compare `hist` with the bin integrals of `model` at `params`.
///
/// Visits `n_bins` consecutive slots starting at `start.first_index()`. A slot
/// whose model integral is exactly zero gets residual 0.
pub fn compute_residuals<M: ModelFunction + ?Sized>(
    hist: &Histogram1D,
    model: &M,
    params: &[f64],
    start: DiagnosticStart,
) -> ResidualSeries {
    let mut histogram = hist.empty_clone();
    let first = start.first_index();

    let rows: Vec<CompareRow> = (first..first + hist.n_bins())
        .map(|bin| {
            let low = hist.bin_low_edge(bin);
            let high = low + hist.bin_width(bin);
            let content = hist.content(bin);
            let fit_integral = model.integral(low, high, params);
            let residual = if fit_integral != 0.0 {
                content / fit_integral - 1.0
            } else {
                0.0
            };
            histogram.set_content(bin, residual);
            CompareRow {
                bin,
                low,
                content,
                fit_integral,
                residual,
            }
        })
        .collect();

    ResidualSeries { histogram, rows }
}

/// `Compare : <low> <content> <fit_integral>`.
pub fn format_compare_line(row: &CompareRow) -> String {
    format!("Compare : {} {} {}", row.low, row.content, row.fit_integral)
}

/// One `Compare` line per row, in order.
pub fn format_compare_lines(rows: &[CompareRow]) -> Vec<String> {
    rows.iter().map(format_compare_line).collect()
}

/// Write the `Compare` lines, newline-terminated, to `out`.
pub fn write_compare_lines<W: Write>(out: &mut W, rows: &[CompareRow]) -> io::Result<()> {
    for line in format_compare_lines(rows) {
        writeln!(out, "{line}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExponentialModel;
    use approx::assert_relative_eq;

    fn small() -> Histogram1D {
        let mut h = Histogram1D::with_errors(4, 0.0, 4.0).unwrap();
        for x in [-0.5, 0.5, 1.5, 1.5, 3.5] {
            h.fill(x);
        }
        h
    }

    #[test]
    fn underflow_start_visits_flow_slot_and_skips_last_bin() {
        let h = small();
        let series = compute_residuals(&h, &ExponentialModel, &[1.0, 0.0], DiagnosticStart::Underflow);
        let bins: Vec<usize> = series.rows.iter().map(|r| r.bin).collect();
        assert_eq!(bins, vec![0, 1, 2, 3]);
        assert_eq!(series.rows[0].low, -1.0);
        assert_eq!(series.rows[0].content, 1.0);
        // Last real bin (index 4) is never visited.
        assert_eq!(series.histogram.content(4), 0.0);
    }

    #[test]
    fn first_bin_start_visits_every_real_bin() {
        let h = small();
        let series = compute_residuals(&h, &ExponentialModel, &[1.0, 0.0], DiagnosticStart::FirstBin);
        let bins: Vec<usize> = series.rows.iter().map(|r| r.bin).collect();
        assert_eq!(bins, vec![1, 2, 3, 4]);
        assert_eq!(series.rows[0].low, 0.0);
        assert_eq!(series.histogram.content(0), 0.0);
    }

    #[test]
    fn residual_is_ratio_minus_one() {
        let h = small();
        // Flat model with integral 1 per bin.
        let series = compute_residuals(&h, &ExponentialModel, &[1.0, 0.0], DiagnosticStart::FirstBin);
        assert_relative_eq!(series.rows[0].fit_integral, 1.0, epsilon = 1e-15);
        assert_relative_eq!(series.rows[0].residual, 0.0, epsilon = 1e-15);
        assert_relative_eq!(series.rows[1].residual, 1.0, epsilon = 1e-15);
        assert_relative_eq!(series.rows[2].residual, -1.0, epsilon = 1e-15);
        assert_relative_eq!(series.histogram.content(2), 1.0, epsilon = 1e-15);
    }

    #[test]
    fn zero_integral_gives_zero_residual() {
        let h = small();
        let series = compute_residuals(&h, &ExponentialModel, &[0.0, -0.1], DiagnosticStart::Underflow);
        assert!(series.rows.iter().all(|r| r.fit_integral == 0.0 && r.residual == 0.0));
    }

    #[test]
    fn compare_lines_use_plain_display() {
        let row = CompareRow {
            bin: 21,
            low: 20.0,
            content: 2345.0,
            fit_integral: 2351.25,
            residual: 0.0,
        };
        assert_eq!(format_compare_line(&row), "Compare : 20 2345 2351.25");

        let mut buf = Vec::new();
        write_compare_lines(&mut buf, &[row, row]).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "Compare : 20 2345 2351.25\nCompare : 20 2345 2351.25\n"
        );
    }
}
