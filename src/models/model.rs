//! Model evaluation.
//!
//! The fitter relies on three primitive operations of a model:
//! - evaluate `f(x; p)` (bin-centre expectations, plotting)
//! - integrate `f` over a bin (bin-integral expectations, residuals)
//! - parameter gradients of both (analytic loss gradients)
//!
//! Generic numeric fallbacks are provided; [`ExponentialModel`] overrides them
//! with closed forms.

use crate::domain::ParameterSpec;
use crate::math::{central_gradient, integrate};

/// Decay constant of the generating density.
pub const REFERENCE_DECAY: f64 = 0.1;

/// Generating density `g(x) = (1 - e^(-0.1x)) · e^(-0.1x)` (unnormalized).
pub fn reference_density(x: f64) -> f64 {
    let e = (-REFERENCE_DECAY * x).exp();
    -(-REFERENCE_DECAY * x).exp_m1() * e
}

/// A parametric function of one variable.
pub trait ModelFunction {
    fn name(&self) -> &str;

    fn n_params(&self) -> usize;

    fn eval(&self, x: f64, params: &[f64]) -> f64;

    /// Definite integral over `[a, b]`.
    fn integral(&self, a: f64, b: f64, params: &[f64]) -> f64 {
        integrate(|x| self.eval(x, params), a, b)
    }

    /// `∂f(x)/∂p_i`.
    fn eval_gradient(&self, x: f64, params: &[f64]) -> Vec<f64> {
        central_gradient(|p| self.eval(x, p), params)
    }

    /// `∂/∂p_i ∫_a^b f`.
    fn integral_gradient(&self, a: f64, b: f64, params: &[f64]) -> Vec<f64> {
        central_gradient(|p| self.integral(a, b, p), params)
    }
}

/// `f(x) = p[0] · e^(p[1]·x)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExponentialModel;

impl ExponentialModel {
    pub const NORMALIZATION: usize = 0;
    pub const DROPOFF: usize = 1;

    /// Starting values and box constraints of the reference fit.
    pub fn default_parameters() -> Vec<ParameterSpec> {
        vec![
            ParameterSpec::new("Normalization", 10.0, 0.0, 100_000.0),
            ParameterSpec::new("Dropoff", -0.2, -1.0, 1.0),
        ]
    }
}

impl ModelFunction for ExponentialModel {
    fn name(&self) -> &str {
        "fitFunc"
    }

    fn n_params(&self) -> usize {
        2
    }

    fn eval(&self, x: f64, params: &[f64]) -> f64 {
        params[0] * (params[1] * x).exp()
    }

    fn integral(&self, a: f64, b: f64, params: &[f64]) -> f64 {
        params[0] * exp_integral(params[1], a, b)
    }

    fn eval_gradient(&self, x: f64, params: &[f64]) -> Vec<f64> {
        let e = (params[1] * x).exp();
        vec![e, params[0] * x * e]
    }

    fn integral_gradient(&self, a: f64, b: f64, params: &[f64]) -> Vec<f64> {
        vec![
            exp_integral(params[1], a, b),
            params[0] * x_exp_integral(params[1], a, b),
        ]
    }
}

/// `∫_a^b e^(k·x) dx`, stable as `k → 0`.
fn exp_integral(k: f64, a: f64, b: f64) -> f64 {
    let w = b - a;
    let scale = (k * a).exp();
    if k == 0.0 {
        return w;
    }
    scale * (k * w).exp_m1() / k
}

/// `∫_a^b x · e^(k·x) dx`, stable as `k → 0`.
///
/// Written as `e^(ka) [a ∫_0^w e^(kt) dt + ∫_0^w t e^(kt) dt]` with `w = b - a`.
fn x_exp_integral(k: f64, a: f64, b: f64) -> f64 {
    let w = b - a;
    let z = k * w;
    let scale = (k * a).exp();

    let first = if k == 0.0 { w } else { z.exp_m1() / k };
    let second = if z.abs() < 1e-2 {
        // Σ z^n / (n! (n + 2))
        w * w * (0.5 + z / 3.0 + z * z / 8.0 + z.powi(3) / 30.0 + z.powi(4) / 144.0 + z.powi(5) / 840.0)
    } else {
        (z * z.exp() - z.exp_m1()) / (k * k)
    };

    scale * (a * first + second)
}
