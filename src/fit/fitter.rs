//! Histogram fitting for a single model.
//!
//! Given:
//! - a filled histogram
//! - a [`ModelFunction`] and one [`ParameterSpec`] per model parameter
//! - a fit range, loss and bin-expectation mode
//!
//! we:
//! - build the binned objective over the bins whose centre lies in the range
//! - minimize it inside the parameter boxes
//! - estimate the covariance from the Hessian at the minimum
//!
//! and return a [`FitResult`]. The model itself is never modified.

use nalgebra::DMatrix;
use tracing::{debug, info, warn};

use crate::data::Histogram1D;
use crate::domain::{BinExpectation, FitRange, FitResult, FitStatus, LossMode, ParameterSpec};
use crate::error::FitError;
use crate::fit::objective::BinnedObjective;
use crate::fit::optimizer::{BoundedMinimizer, ObjectiveFunction, OptimizerConfig};
use crate::math::hessian_from_gradient;
use crate::models::{ExponentialModel, ModelFunction};

/// Everything the fitter needs besides the data and the model.
#[derive(Debug, Clone)]
pub struct FitSpec {
    pub range: FitRange,
    pub parameters: Vec<ParameterSpec>,
    pub loss: LossMode,
    pub expectation: BinExpectation,
    pub optimizer: OptimizerConfig,
    /// Accept a minimum with a parameter pinned at its box boundary.
    pub allow_at_limit: bool,
}

impl FitSpec {
    /// The reference exponential fit: `[20, 100]`, log-likelihood, bin integrals.
    pub fn reference() -> Self {
        Self {
            range: FitRange::new(20.0, 100.0),
            parameters: ExponentialModel::default_parameters(),
            loss: LossMode::LogLikelihood,
            expectation: BinExpectation::Integral,
            optimizer: OptimizerConfig::default(),
            allow_at_limit: false,
        }
    }
}

impl Default for FitSpec {
    fn default() -> Self {
        Self::reference()
    }
}

fn validate_parameters<M: ModelFunction + ?Sized>(
    model: &M,
    parameters: &[ParameterSpec],
) -> Result<(), FitError> {
    if parameters.len() != model.n_params() {
        return Err(FitError::InvalidParameter {
            name: model.name().to_string(),
            reason: format!(
                "model takes {} parameters, {} given",
                model.n_params(),
                parameters.len()
            ),
        });
    }
    for p in parameters {
        let bad = |reason: &str| FitError::InvalidParameter {
            name: p.name.clone(),
            reason: reason.to_string(),
        };
        if !(p.initial.is_finite() && p.lower.is_finite() && p.upper.is_finite()) {
            return Err(bad("values must be finite"));
        }
        if p.lower >= p.upper {
            return Err(bad("lower bound must be below upper bound"));
        }
        if !p.contains(p.initial) {
            return Err(bad("initial value outside bounds"));
        }
    }
    Ok(())
}

/// Fit `model` to `hist` as described by `spec`.
pub fn fit_histogram<M: ModelFunction + ?Sized>(
    hist: &Histogram1D,
    model: &M,
    spec: &FitSpec,
) -> Result<FitResult, FitError> {
    validate_parameters(model, &spec.parameters)?;
    let objective = BinnedObjective::new(model, hist, spec.range, spec.loss, spec.expectation)?;
    let n_params = spec.parameters.len();

    debug!(
        model = model.name(),
        bins = objective.n_bins(),
        loss = spec.loss.display_name(),
        "starting fit"
    );

    let opt = BoundedMinimizer::new(spec.optimizer.clone()).minimize(&objective, &spec.parameters)?;

    if !spec.allow_at_limit {
        let pinned = spec
            .parameters
            .iter()
            .zip(&opt.parameters)
            .zip(&opt.at_limit)
            .find(|(_, at_limit)| **at_limit);
        if let Some(((p, &value), _)) = pinned {
            return Err(FitError::ParameterAtLimit {
                name: p.name.clone(),
                value,
                lower: p.lower,
                upper: p.upper,
            });
        }
    }

    if !opt.converged || !opt.fval.is_finite() {
        return Err(FitError::Convergence {
            iterations: opt.n_iter,
            reason: format!("{} stopped: {}", opt.minimizer.display_name(), opt.message),
        });
    }

    let hessian = hessian_from_gradient(|p| objective.gradient(p), &opt.parameters);
    let (errors, covariance) = match invert_hessian(&hessian) {
        Some(cov) => {
            let errors = (0..n_params).map(|i| cov[(i, i)].sqrt()).collect();
            (errors, Some(cov.transpose().iter().copied().collect::<Vec<f64>>()))
        }
        None => {
            warn!("Hessian inversion failed, using diagonal approximation");
            (diagonal_errors(&hessian), None)
        }
    };

    let n_bins_used = objective.n_bins();
    let result = FitResult {
        parameter_names: spec.parameters.iter().map(|p| p.name.clone()).collect(),
        parameters: opt.parameters,
        errors,
        status: FitStatus {
            minimizer: opt.minimizer,
            message: opt.message,
            covariance_ok: covariance.is_some(),
        },
        covariance,
        loss: spec.loss,
        range: spec.range,
        min_value: opt.fval,
        n_bins_used,
        ndf: n_bins_used.saturating_sub(n_params),
        n_iter: opt.n_iter,
        n_fev: opt.n_fev,
        n_gev: opt.n_gev,
    };

    info!(
        min_value = result.min_value,
        ndf = result.ndf,
        n_iter = result.n_iter,
        minimizer = result.status.minimizer.display_name(),
        "fit converged"
    );
    Ok(result)
}

/// `2 · H⁻¹` via Cholesky; `None` unless every variance is finite and positive.
fn invert_hessian(hessian: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    let n = hessian.nrows();
    let chol = nalgebra::linalg::Cholesky::new(hessian.clone())?;
    let cov = chol.inverse() * 2.0;
    (0..n)
        .all(|i| cov[(i, i)].is_finite() && cov[(i, i)] > 0.0)
        .then_some(cov)
}

fn diagonal_errors(hessian: &DMatrix<f64>) -> Vec<f64> {
    (0..hessian.nrows())
        .map(|i| (2.0 / hessian[(i, i)].abs().max(1e-12)).sqrt())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const TRUE_PARAMS: [f64; 2] = [2000.0, -0.1];

    /// Bin contents equal to the exact integrals of `2000 · e^(-0.1x)`.
    fn noiseless() -> Histogram1D {
        let mut h = Histogram1D::with_errors(100, 0.0, 100.0).unwrap();
        for b in 1..=100 {
            let lo = h.bin_low_edge(b);
            let mu = ExponentialModel.integral(lo, lo + 1.0, &TRUE_PARAMS);
            h.set_content(b, mu);
            h.set_variance(b, mu);
        }
        h
    }

    #[test]
    fn recovers_noiseless_exponential_with_both_losses() {
        let h = noiseless();
        for loss in [LossMode::LogLikelihood, LossMode::Chi2] {
            let spec = FitSpec {
                loss,
                ..FitSpec::reference()
            };
            let fit = fit_histogram(&h, &ExponentialModel, &spec).unwrap();
            assert_relative_eq!(fit.parameters[0], 2000.0, max_relative = 1e-3);
            assert_relative_eq!(fit.parameters[1], -0.1, max_relative = 1e-3);
            assert!(fit.min_value < 1e-4, "{loss:?} minimum {}", fit.min_value);
            assert_eq!(fit.n_bins_used, 80);
            assert_eq!(fit.ndf, 78);
            assert!(fit.errors.iter().all(|e| e.is_finite() && *e > 0.0));
        }
    }

    #[test]
    fn covariance_is_symmetric_with_matching_errors() {
        let fit = fit_histogram(&noiseless(), &ExponentialModel, &FitSpec::reference()).unwrap();
        let cov = fit.covariance.as_ref().unwrap();
        assert!(fit.status.covariance_ok);
        assert_relative_eq!(cov[1], cov[2], max_relative = 1e-9);
        assert_relative_eq!(cov[0].sqrt(), fit.errors[0], max_relative = 1e-12);
        assert_relative_eq!(cov[3].sqrt(), fit.errors[1], max_relative = 1e-12);
        assert_eq!(fit.parameter("Dropoff"), Some(fit.parameters[1]));
    }

    #[test]
    fn empty_histogram_fails_instead_of_guessing() {
        let h = Histogram1D::with_errors(100, 0.0, 100.0).unwrap();
        let err = fit_histogram(&h, &ExponentialModel, &FitSpec::reference()).unwrap_err();
        assert!(matches!(err, FitError::EmptyFit(_)));
    }

    #[test]
    fn bad_ranges_are_rejected() {
        let h = noiseless();
        for range in [FitRange::new(100.0, 20.0), FitRange::new(20.0, 120.0)] {
            let spec = FitSpec {
                range,
                ..FitSpec::reference()
            };
            let err = fit_histogram(&h, &ExponentialModel, &spec).unwrap_err();
            assert!(matches!(err, FitError::InvalidRange { .. }), "{err}");
        }
    }

    #[test]
    fn malformed_parameters_are_rejected() {
        let h = noiseless();
        let mut spec = FitSpec::reference();
        spec.parameters[1].initial = 2.0;
        assert!(matches!(
            fit_histogram(&h, &ExponentialModel, &spec),
            Err(FitError::InvalidParameter { .. })
        ));

        spec.parameters.truncate(1);
        assert!(matches!(
            fit_histogram(&h, &ExponentialModel, &spec),
            Err(FitError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn pinned_parameter_is_reported_unless_allowed() {
        let h = noiseless();
        let mut spec = FitSpec::reference();
        spec.parameters[1] = ParameterSpec::new("Dropoff", -0.02, -0.05, 1.0);

        match fit_histogram(&h, &ExponentialModel, &spec) {
            Err(FitError::ParameterAtLimit { name, lower, .. }) => {
                assert_eq!(name, "Dropoff");
                assert_eq!(lower, -0.05);
            }
            other => panic!("expected ParameterAtLimit, got {other:?}"),
        }

        spec.allow_at_limit = true;
        let fit = fit_histogram(&h, &ExponentialModel, &spec).unwrap();
        assert!(fit.parameters[1] >= -0.05);
        assert!(fit.parameters[1] < -0.049);
        assert!(fit.parameters[0] >= 0.0 && fit.parameters[0] <= 100_000.0);
    }

    #[test]
    fn small_normalization_near_lower_bound_is_accepted() {
        // Normalization 2 sits 2e-5 of the box above its lower bound of 0.
        let mut h = Histogram1D::with_errors(100, 0.0, 100.0).unwrap();
        let truth = [2.0, -0.05];
        for b in 1..=100 {
            let lo = h.bin_low_edge(b);
            let mu = ExponentialModel.integral(lo, lo + 1.0, &truth);
            h.set_content(b, mu);
            h.set_variance(b, mu);
        }

        let fit = fit_histogram(&h, &ExponentialModel, &FitSpec::reference()).unwrap();
        assert_relative_eq!(fit.parameters[0], 2.0, max_relative = 1e-2);
        assert_relative_eq!(fit.parameters[1], -0.05, max_relative = 1e-2);
    }

    #[test]
    fn exhausted_iteration_budget_is_a_convergence_error() {
        let spec = FitSpec {
            optimizer: OptimizerConfig {
                max_iter: 1,
                seed_iter: 0,
                simplex_max_iter: 2,
                ..OptimizerConfig::default()
            },
            allow_at_limit: true,
            ..FitSpec::reference()
        };
        let err = fit_histogram(&noiseless(), &ExponentialModel, &spec).unwrap_err();
        assert!(matches!(err, FitError::Convergence { .. }), "{err}");
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn gradient_evaluations_are_reported() {
        let fit = fit_histogram(&noiseless(), &ExponentialModel, &FitSpec::reference()).unwrap();
        assert!(fit.n_gev > 0);
        assert!(fit.n_fev > 0);
    }
}
