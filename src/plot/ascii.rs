//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Fit panel elements:
//! - observed bin contents: `o`
//! - fitted bin expectation: `-` line
//!
//! Residual panel elements:
//! - zero line: `.`
//! - residual bars: `#`

use crate::data::Histogram1D;
use crate::domain::FitResult;
use crate::models::ModelFunction;
use crate::report::ResidualSeries;

/// Histogram contents with the fitted expectation drawn over the fit range.
pub fn render_fit_panel<M: ModelFunction + ?Sized>(
    hist: &Histogram1D,
    model: &M,
    fit: &FitResult,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);
    let (x_min, x_max) = (hist.low(), hist.high());

    let points: Vec<(f64, f64)> = (1..=hist.n_bins())
        .map(|b| (hist.bin_center(b), hist.content(b)))
        .collect();

    let half = 0.5 * hist.bin_width(1);
    let c_min = fit.range.min.max(x_min);
    let c_max = fit.range.max.min(x_max);
    let curve: Vec<(f64, f64)> = (0..width)
        .map(|i| {
            let x = c_min + (i as f64 / (width as f64 - 1.0)) * (c_max - c_min);
            (x, model.integral(x - half, x + half, &fit.parameters))
        })
        .collect();

    let (y_min, y_max) = y_range(points.iter().chain(curve.iter()).map(|&(_, y)| y)).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Curve first so points can overlay.
    draw_curve(&mut grid, &curve, x_min, x_max, y_min, y_max);
    for &(x, y) in &points {
        let col = map_x(x, x_min, x_max, width);
        let row = map_y(y, y_min, y_max, height);
        grid[row][col] = 'o';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Fit: x=[{x_min:.2}, {x_max:.2}] | y=[{y_min:.2}, {y_max:.2}]\n"
    ));
    push_grid(&mut out, grid);
    out
}

/// Residual bars from a zero line, one bar per visited slot.
pub fn render_residual_panel(residuals: &ResidualSeries, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);
    let hist = &residuals.histogram;

    let x_min = residuals
        .rows
        .iter()
        .map(|r| r.low)
        .fold(hist.low(), f64::min);
    let x_max = residuals
        .rows
        .iter()
        .map(|r| r.low + hist.bin_width(r.bin))
        .fold(hist.high(), f64::max);

    let ys = residuals.rows.iter().map(|r| r.residual).chain(std::iter::once(0.0));
    let (y_min, y_max) = y_range(ys).unwrap_or((-1.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];
    let zero = map_y(0.0, y_min, y_max, height);
    grid[zero].iter_mut().for_each(|c| *c = '.');

    for r in &residuals.rows {
        if r.residual == 0.0 || !r.residual.is_finite() {
            continue;
        }
        let col = map_x(r.low + 0.5 * hist.bin_width(r.bin), x_min, x_max, width);
        let row = map_y(r.residual, y_min, y_max, height);
        for line in grid.iter_mut().take(zero.max(row) + 1).skip(zero.min(row)) {
            line[col] = '#';
        }
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Residuals: x=[{x_min:.2}, {x_max:.2}] | y=[{y_min:.2}, {y_max:.2}]\n"
    ));
    push_grid(&mut out, grid);
    out
}

fn push_grid(out: &mut String, grid: Vec<Vec<char>>) {
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
}

fn y_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for y in values.filter(|y| y.is_finite()) {
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }
    if min_y.is_finite() && max_y.is_finite() && max_y > min_y {
        Some((min_y, max_y))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], x_min: f64, x_max: f64, y_min: f64, y_max: f64) {
    if curve.len() < 2 {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(x, y) in curve.iter().filter(|(_, y)| y.is_finite()) {
        let col = map_x(x, x_min, x_max, width);
        let row = map_y(y, y_min, y_max, height);
        if let Some((c0, r0)) = prev {
            draw_line(grid, c0, r0, col, row, '-');
        } else {
            grid[row][col] = '-';
        }
        prev = Some((col, row));
    }
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DiagnosticStart, FitRange, FitStatus, LossMode, Minimizer};
    use crate::models::ExponentialModel;
    use crate::report::compute_residuals;

    fn flat_fit(level: f64, range: FitRange) -> FitResult {
        FitResult {
            parameter_names: vec!["Normalization".into(), "Dropoff".into()],
            parameters: vec![level, 0.0],
            errors: vec![0.0, 0.0],
            covariance: None,
            loss: LossMode::LogLikelihood,
            range,
            min_value: 0.0,
            n_bins_used: 10,
            ndf: 8,
            n_iter: 0,
            n_fev: 0,
            n_gev: 0,
            status: FitStatus {
                minimizer: Minimizer::Lbfgs,
                message: String::new(),
                covariance_ok: false,
            },
        }
    }

    #[test]
    fn fit_panel_golden_snapshot_small() {
        let mut h = Histogram1D::new(10, 0.0, 10.0).unwrap();
        for (b, n) in [(1, 4.0), (2, 3.0), (3, 2.0), (4, 1.0)] {
            h.set_content(b, n);
        }
        let fit = flat_fit(2.0, FitRange::new(0.0, 10.0));

        let txt = render_fit_panel(&h, &ExponentialModel, &fit, 21, 5);
        let expected = concat!(
            "Fit: x=[0.00, 10.00] | y=[-0.20, 4.20]\n",
            " o                   \n",
            "   o                 \n",
            "-----o---------------\n",
            "       o             \n",
            "         o o o o o o \n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn residual_panel_golden_snapshot_small() {
        let mut h = Histogram1D::new(4, 0.0, 4.0).unwrap();
        h.fill_weighted(0.5, 2.0);
        h.fill(1.5);
        h.fill_weighted(3.5, 1.5);
        let series = compute_residuals(&h, &ExponentialModel, &[1.0, 0.0], DiagnosticStart::FirstBin);

        let txt = render_residual_panel(&series, 9, 5);
        let expected = concat!(
            "Residuals: x=[0.00, 4.00] | y=[-1.10, 1.10]\n",
            " #       \n",
            " #     # \n",
            ".#...#.#.\n",
            "     #   \n",
            "     #   \n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn residual_panel_spans_underflow_slot() {
        let mut h = Histogram1D::new(4, 0.0, 4.0).unwrap();
        h.fill(-0.5);
        let series = compute_residuals(&h, &ExponentialModel, &[1.0, 0.0], DiagnosticStart::Underflow);
        let txt = render_residual_panel(&series, 11, 5);
        assert!(txt.starts_with("Residuals: x=[-1.00, 4.00]"));
        assert_eq!(txt.lines().count(), 6);
    }
}
