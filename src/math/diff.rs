//! Finite-difference derivatives.

use nalgebra::DMatrix;

/// Central-difference gradient of `f` at `params`.
///
/// Step: `1e-8 · max(|x_i|, 1)`.
pub fn central_gradient<F>(f: F, params: &[f64]) -> Vec<f64>
where
    F: Fn(&[f64]) -> f64,
{
    let mut work = params.to_vec();
    let mut grad = vec![0.0; params.len()];
    for i in 0..params.len() {
        let eps = 1e-8 * params[i].abs().max(1.0);

        work[i] = params[i] + eps;
        let f_plus = f(&work);
        work[i] = params[i] - eps;
        let f_minus = f(&work);
        work[i] = params[i];

        grad[i] = (f_plus - f_minus) / (2.0 * eps);
    }
    grad
}

/// Hessian from forward differences of an analytic gradient, symmetrised.
pub fn hessian_from_gradient<G>(grad: G, params: &[f64]) -> DMatrix<f64>
where
    G: Fn(&[f64]) -> Vec<f64>,
{
    let n = params.len();
    let grad_center = grad(params);
    let mut hessian = DMatrix::zeros(n, n);

    for j in 0..n {
        let eps = 1e-4 * params[j].abs().max(1.0);
        let mut params_plus = params.to_vec();
        params_plus[j] += eps;
        let grad_plus = grad(&params_plus);

        for i in 0..n {
            hessian[(i, j)] = (grad_plus[i] - grad_center[i]) / eps;
        }
    }

    let ht = hessian.transpose();
    (&hessian + &ht) * 0.5
}
