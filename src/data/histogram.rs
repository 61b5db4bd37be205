//! Fixed-width 1-D histogram with underflow/overflow slots.
//!
//! Storage follows the usual HEP convention:
//!
//! - slot `0` is the underflow (`x < low`)
//! - slots `1..=n_bins` are the real bins
//! - slot `n_bins + 1` is the overflow (`x >= high`)
//!
//! Each slot stores the sum of weights and, when error tracking is enabled, the
//! sum of squared weights (the Poisson variance for unit-weight fills).

use serde::{Deserialize, Serialize};

use crate::error::FitError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram1D {
    n_bins: usize,
    low: f64,
    high: f64,
    contents: Vec<f64>,
    sumw2: Option<Vec<f64>>,
    entries: u64,
}

impl Histogram1D {
    pub fn new(n_bins: usize, low: f64, high: f64) -> Result<Self, FitError> {
        if n_bins == 0 {
            return Err(FitError::InvalidHistogram("bin count must be > 0".into()));
        }
        if !(low.is_finite() && high.is_finite() && high > low) {
            return Err(FitError::InvalidHistogram(format!(
                "invalid axis [{low}, {high}) (must be finite with high > low)"
            )));
        }
        Ok(Self {
            n_bins,
            low,
            high,
            contents: vec![0.0; n_bins + 2],
            sumw2: None,
            entries: 0,
        })
    }

    /// Same as [`Histogram1D::new`] with squared-weight tracking switched on.
    pub fn with_errors(n_bins: usize, low: f64, high: f64) -> Result<Self, FitError> {
        let mut h = Self::new(n_bins, low, high)?;
        h.enable_errors();
        Ok(h)
    }

    /// Start tracking squared weights. Existing contents are assumed to come from
    /// unit-weight fills.
    pub fn enable_errors(&mut self) {
        if self.sumw2.is_none() {
            self.sumw2 = Some(self.contents.clone());
        }
    }

    pub fn tracks_errors(&self) -> bool {
        self.sumw2.is_some()
    }

    pub fn n_bins(&self) -> usize {
        self.n_bins
    }

    pub fn low(&self) -> f64 {
        self.low
    }

    pub fn high(&self) -> f64 {
        self.high
    }

    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Index of the slot that `x` falls into, or `None` for NaN.
    pub fn find_bin(&self, x: f64) -> Option<usize> {
        if x.is_nan() {
            return None;
        }
        if x < self.low {
            return Some(0);
        }
        if x >= self.high {
            return Some(self.n_bins + 1);
        }
        let idx = ((x - self.low) / self.bin_width(1)).floor() as usize + 1;
        // Rounding right below `high` can land one past the last bin.
        Some(idx.min(self.n_bins))
    }

    pub fn fill(&mut self, x: f64) -> Option<usize> {
        self.fill_weighted(x, 1.0)
    }

    pub fn fill_weighted(&mut self, x: f64, w: f64) -> Option<usize> {
        let idx = self.find_bin(x)?;
        self.contents[idx] += w;
        if let Some(sumw2) = self.sumw2.as_mut() {
            sumw2[idx] += w * w;
        }
        self.entries += 1;
        Some(idx)
    }

    pub fn bin_width(&self, _bin: usize) -> f64 {
        (self.high - self.low) / self.n_bins as f64
    }

    /// Lower edge of slot `bin`; for the underflow slot this is `low - width`.
    pub fn bin_low_edge(&self, bin: usize) -> f64 {
        self.low + (bin as f64 - 1.0) * self.bin_width(bin)
    }

    pub fn bin_center(&self, bin: usize) -> f64 {
        self.bin_low_edge(bin) + 0.5 * self.bin_width(bin)
    }

    /// Content of slot `bin` (0 for indices past the overflow).
    pub fn content(&self, bin: usize) -> f64 {
        self.contents.get(bin).copied().unwrap_or(0.0)
    }

    pub fn set_content(&mut self, bin: usize, value: f64) {
        if let Some(slot) = self.contents.get_mut(bin) {
            *slot = value;
        }
    }

    /// Variance of slot `bin`: the sum of squared weights when tracked,
    /// otherwise the content itself (Poisson).
    pub fn variance(&self, bin: usize) -> f64 {
        match &self.sumw2 {
            Some(sumw2) => sumw2.get(bin).copied().unwrap_or(0.0),
            None => self.content(bin).abs(),
        }
    }

    /// Override the variance of slot `bin`, switching error tracking on if needed.
    pub fn set_variance(&mut self, bin: usize, value: f64) {
        self.enable_errors();
        if let Some(slot) = self.sumw2.as_mut().and_then(|s| s.get_mut(bin)) {
            *slot = value;
        }
    }

    pub fn underflow(&self) -> f64 {
        self.contents[0]
    }

    pub fn overflow(&self) -> f64 {
        self.contents[self.n_bins + 1]
    }

    /// Contents of the real bins (`1..=n_bins`).
    pub fn bin_contents(&self) -> &[f64] {
        &self.contents[1..=self.n_bins]
    }

    /// Sum of every slot, flows included.
    pub fn total(&self) -> f64 {
        self.contents.iter().sum()
    }

    /// Sum over the real bins only.
    pub fn integral(&self) -> f64 {
        self.bin_contents().iter().sum()
    }

    /// Real bin with the largest content (lowest index on ties).
    pub fn maximum_bin(&self) -> usize {
        let mut best = 1;
        for bin in 2..=self.n_bins {
            if self.contents[bin] > self.contents[best] {
                best = bin;
            }
        }
        best
    }

    /// Content-weighted mean of the bin centres (real bins only).
    pub fn mean(&self) -> Option<f64> {
        let sum = self.integral();
        if sum <= 0.0 {
            return None;
        }
        let sx: f64 = (1..=self.n_bins)
            .map(|b| self.contents[b] * self.bin_center(b))
            .sum();
        Some(sx / sum)
    }

    /// Content-weighted standard deviation of the bin centres.
    pub fn std_dev(&self) -> Option<f64> {
        let mean = self.mean()?;
        let sum = self.integral();
        let sxx: f64 = (1..=self.n_bins)
            .map(|b| self.contents[b] * (self.bin_center(b) - mean).powi(2))
            .sum();
        Some((sxx / sum).sqrt())
    }

    /// Zero every slot and the entry count, keeping the binning.
    pub fn reset(&mut self) {
        self.contents.iter_mut().for_each(|v| *v = 0.0);
        if let Some(sumw2) = self.sumw2.as_mut() {
            sumw2.iter_mut().for_each(|v| *v = 0.0);
        }
        self.entries = 0;
    }

    /// An empty histogram with identical binning and error tracking.
    pub fn empty_clone(&self) -> Self {
        let mut h = self.clone();
        h.reset();
        h
    }
}
