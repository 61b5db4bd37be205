//! Binned fit objectives.
//!
//! Given the histogram bins selected by a fit range, the objective compares the
//! observed counts `n_i` with the model expectation `μ_i(p)`:
//!
//! ```text
//! Chi2:           Σ (n_i - μ_i)² / σ_i²                    (σ_i² > 0 only)
//! LogLikelihood:  2 Σ [μ_i - n_i + n_i ln(n_i / μ_i)]      (Baker–Cousins)
//! ```
//!
//! Both are on the chi-square scale, so a one-sigma error corresponds to an
//! increase of 1 and the covariance is `2 · H⁻¹`.

use crate::data::Histogram1D;
use crate::domain::{BinExpectation, FitRange, LossMode};
use crate::error::FitError;
use crate::fit::optimizer::ObjectiveFunction;
use crate::models::ModelFunction;

/// Smallest expectation used inside the logarithm.
const MIN_EXPECTED: f64 = f64::MIN_POSITIVE;

/// A histogram bin participating in the fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitBin {
    pub index: usize,
    pub low: f64,
    pub high: f64,
    pub content: f64,
    pub variance: f64,
}

impl FitBin {
    pub fn center(&self) -> f64 {
        0.5 * (self.low + self.high)
    }
}

/// Select the real bins whose centre lies inside `range`.
///
/// The range must be finite, non-empty and contained in the histogram axis.
pub fn select_bins(hist: &Histogram1D, range: FitRange) -> Result<Vec<FitBin>, FitError> {
    let (min, max) = (range.min, range.max);
    if !(min.is_finite() && max.is_finite()) {
        return Err(FitError::invalid_range(min, max, "bounds must be finite"));
    }
    if min >= max {
        return Err(FitError::invalid_range(min, max, "range is empty or inverted"));
    }
    if min < hist.low() || max > hist.high() {
        return Err(FitError::invalid_range(
            min,
            max,
            format!("outside the histogram domain [{}, {})", hist.low(), hist.high()),
        ));
    }

    let bins: Vec<FitBin> = (1..=hist.n_bins())
        .filter(|&b| range.contains(hist.bin_center(b)))
        .map(|b| {
            let low = hist.bin_low_edge(b);
            FitBin {
                index: b,
                low,
                high: low + hist.bin_width(b),
                content: hist.content(b),
                variance: hist.variance(b),
            }
        })
        .collect();

    if bins.is_empty() {
        return Err(FitError::invalid_range(min, max, "no bin centre falls inside the range"));
    }
    Ok(bins)
}

/// Loss of a model against a fixed set of bins.
pub struct BinnedObjective<'a, M: ModelFunction + ?Sized> {
    model: &'a M,
    bins: Vec<FitBin>,
    loss: LossMode,
    expectation: BinExpectation,
}

impl<'a, M: ModelFunction + ?Sized> BinnedObjective<'a, M> {
    /// Build the objective for `hist` restricted to `range`.
    ///
    /// Fails with [`FitError::EmptyFit`] when the selected bins carry no usable
    /// content, and with [`FitError::Underdetermined`] when fewer usable bins than
    /// model parameters remain.
    pub fn new(
        model: &'a M,
        hist: &Histogram1D,
        range: FitRange,
        loss: LossMode,
        expectation: BinExpectation,
    ) -> Result<Self, FitError> {
        let selected = select_bins(hist, range)?;

        let bins: Vec<FitBin> = match loss {
            LossMode::Chi2 => selected.into_iter().filter(|b| b.variance > 0.0).collect(),
            LossMode::LogLikelihood => {
                if selected.iter().all(|b| b.content == 0.0) {
                    Vec::new()
                } else {
                    selected
                }
            }
        };

        if bins.is_empty() {
            return Err(FitError::EmptyFit(format!(
                "no entries in fit range [{}, {}]",
                range.min, range.max
            )));
        }
        if bins.len() < model.n_params() {
            return Err(FitError::Underdetermined {
                bins: bins.len(),
                params: model.n_params(),
            });
        }

        Ok(Self {
            model,
            bins,
            loss,
            expectation,
        })
    }

    pub fn n_bins(&self) -> usize {
        self.bins.len()
    }

    /// Expected count of `bin` under `params`.
    pub fn expected(&self, bin: &FitBin, params: &[f64]) -> f64 {
        match self.expectation {
            BinExpectation::Integral => self.model.integral(bin.low, bin.high, params),
            BinExpectation::Center => self.model.eval(bin.center(), params),
        }
    }

    fn expected_gradient(&self, bin: &FitBin, params: &[f64]) -> Vec<f64> {
        match self.expectation {
            BinExpectation::Integral => self.model.integral_gradient(bin.low, bin.high, params),
            BinExpectation::Center => self.model.eval_gradient(bin.center(), params),
        }
    }

    /// Per-bin contribution to the loss and `∂loss/∂μ`.
    fn term(&self, bin: &FitBin, mu: f64) -> (f64, f64) {
        let n = bin.content;
        match self.loss {
            LossMode::Chi2 => {
                let r = n - mu;
                (r * r / bin.variance, -2.0 * r / bin.variance)
            }
            LossMode::LogLikelihood => {
                let mu = mu.max(MIN_EXPECTED);
                let log_term = if n > 0.0 { n * (n / mu).ln() } else { 0.0 };
                (2.0 * (mu - n + log_term), 2.0 * (1.0 - n / mu))
            }
        }
    }
}

impl<M: ModelFunction + ?Sized> ObjectiveFunction for BinnedObjective<'_, M> {
    fn eval(&self, params: &[f64]) -> f64 {
        self.bins
            .iter()
            .map(|bin| self.term(bin, self.expected(bin, params)).0)
            .sum()
    }

    fn gradient(&self, params: &[f64]) -> Vec<f64> {
        let mut grad = vec![0.0; params.len()];
        for bin in &self.bins {
            let (_, dmu) = self.term(bin, self.expected(bin, params));
            for (g, d) in grad.iter_mut().zip(self.expected_gradient(bin, params)) {
                *g += dmu * d;
            }
        }
        grad
    }
}
