//! Box-constrained minimization on top of argmin.
//!
//! Bounds are enforced by a sine transform: the solvers work on unbounded
//! internal coordinates `u` and every evaluation maps them back through
//!
//! ```text
//! p = lo + (hi - lo) · (sin(u) + 1) / 2
//! ```
//!
//! so no trial point can leave the box. Minimization runs in three stages:
//!
//! 1. a short Nelder–Mead pass to get close to the minimum without relying on
//!    gradient scale
//! 2. L-BFGS (More–Thuente line search) from the seed, using analytic gradients
//! 3. if L-BFGS fails or stops at its iteration limit, a full Nelder–Mead run
//!    from the best point so far

use std::sync::atomic::{AtomicUsize, Ordering};

use argmin::core::{CostFunction, Executor, Gradient, State, TerminationReason, TerminationStatus};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::neldermead::NelderMead;
use argmin::solver::quasinewton::LBFGS;
use tracing::{debug, warn};

use crate::domain::{Minimizer, ParameterSpec};
use crate::error::FitError;
use crate::math::central_gradient;

/// Returned in place of non-finite objective values so line searches can back off.
const INVALID_COST: f64 = 1e300;

/// Keeps starting points off the exact bounds, where `dp/du` vanishes.
const EDGE_MARGIN: f64 = 1e-9;

/// A parameter is at its limit when `1 - |sin u|` drops below this.
const AT_LIMIT_EPS: f64 = 1e-6;

#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    /// L-BFGS iteration budget.
    pub max_iter: u64,
    /// L-BFGS gradient-norm tolerance (internal coordinates).
    pub tol_grad: f64,
    /// L-BFGS absolute cost-change tolerance.
    pub tol_cost: f64,
    /// L-BFGS history length.
    pub m: usize,
    /// Iterations of the seeding simplex pass (0 disables it).
    pub seed_iter: u64,
    /// Iteration budget of the fallback simplex (0 disables it).
    pub simplex_max_iter: u64,
    /// Standard-deviation tolerance of the fallback simplex.
    pub simplex_tol: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            tol_grad: 1e-6,
            tol_cost: 1e-9,
            m: 10,
            seed_iter: 200,
            simplex_max_iter: 5000,
            simplex_tol: 1e-10,
        }
    }
}

/// Result of a minimization, in external (bounded) coordinates.
#[derive(Debug, Clone)]
pub struct OptimizationResult {
    pub parameters: Vec<f64>,
    pub fval: f64,
    pub n_iter: u64,
    pub n_fev: usize,
    pub n_gev: usize,
    /// Met the stage tolerance with a finite minimum.
    pub converged: bool,
    /// Per parameter: driven onto a box boundary.
    pub at_limit: Vec<bool>,
    pub minimizer: Minimizer,
    pub message: String,
}

/// Objective function trait for optimization.
pub trait ObjectiveFunction {
    fn eval(&self, params: &[f64]) -> f64;

    /// Gradient at `params` (central differences unless overridden).
    fn gradient(&self, params: &[f64]) -> Vec<f64> {
        central_gradient(|p| self.eval(p), params)
    }
}

/// Sine mapping between internal and external coordinates.
#[derive(Debug, Clone)]
pub struct BoundedTransform {
    bounds: Vec<(f64, f64)>,
}

impl BoundedTransform {
    pub fn new(bounds: Vec<(f64, f64)>) -> Self {
        Self { bounds }
    }

    pub fn to_internal(&self, external: &[f64]) -> Vec<f64> {
        external
            .iter()
            .zip(&self.bounds)
            .map(|(&p, &(lo, hi))| {
                let s = 2.0 * (p - lo) / (hi - lo) - 1.0;
                s.clamp(-1.0 + EDGE_MARGIN, 1.0 - EDGE_MARGIN).asin()
            })
            .collect()
    }

    pub fn to_external(&self, internal: &[f64]) -> Vec<f64> {
        internal
            .iter()
            .zip(&self.bounds)
            .map(|(&u, &(lo, hi))| (lo + 0.5 * (hi - lo) * (u.sin() + 1.0)).clamp(lo, hi))
            .collect()
    }

    /// Per parameter: whether `u_i` sits where the mapping saturates at a bound.
    pub fn at_limit(&self, internal: &[f64]) -> Vec<bool> {
        internal
            .iter()
            .map(|&u| 1.0 - u.sin().abs() < AT_LIMIT_EPS)
            .collect()
    }

    /// `dp_i/du_i`.
    pub fn jacobian_diag(&self, internal: &[f64]) -> Vec<f64> {
        internal
            .iter()
            .zip(&self.bounds)
            .map(|(&u, &(lo, hi))| 0.5 * (hi - lo) * u.cos())
            .collect()
    }
}

#[derive(Default)]
struct FuncCounts {
    cost: AtomicUsize,
    grad: AtomicUsize,
}

/// Wrapper to make an [`ObjectiveFunction`] compatible with argmin.
struct ArgminProblem<'a> {
    objective: &'a dyn ObjectiveFunction,
    transform: &'a BoundedTransform,
    counts: &'a FuncCounts,
}

impl CostFunction for ArgminProblem<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, params: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
        self.counts.cost.fetch_add(1, Ordering::Relaxed);
        let value = self.objective.eval(&self.transform.to_external(params));
        Ok(if value.is_finite() { value } else { INVALID_COST })
    }
}

impl Gradient for ArgminProblem<'_> {
    type Param = Vec<f64>;
    type Gradient = Vec<f64>;

    fn gradient(&self, params: &Self::Param) -> Result<Self::Gradient, argmin::core::Error> {
        self.counts.grad.fetch_add(1, Ordering::Relaxed);
        let external = self.transform.to_external(params);
        let g = self.objective.gradient(&external);
        let jac = self.transform.jacobian_diag(params);
        Ok(g.iter()
            .zip(jac.iter())
            .map(|(&gi, &ji)| {
                let v = gi * ji;
                if v.is_finite() { v } else { 0.0 }
            })
            .collect())
    }
}

/// Outcome of one solver stage, internal coordinates.
struct Stage {
    best: Vec<f64>,
    fval: f64,
    n_iter: u64,
    converged: bool,
    /// `false` when the best cost is the non-finite placeholder.
    finite: bool,
    message: String,
}

impl Stage {
    fn accepted(&self) -> bool {
        self.converged && self.finite
    }
}

fn is_converged(status: &TerminationStatus) -> bool {
    matches!(
        status,
        TerminationStatus::Terminated(TerminationReason::SolverConverged)
            | TerminationStatus::Terminated(TerminationReason::TargetCostReached)
    )
}

/// Box-constrained minimizer: simplex seed, L-BFGS, simplex fallback.
pub struct BoundedMinimizer {
    config: OptimizerConfig,
}

impl BoundedMinimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    /// Minimize `objective` starting from the parameters' initial values and
    /// honouring their bounds.
    ///
    /// A result with `converged == false` is returned (not an error) when every
    /// stage ran but none met its tolerance; errors are reserved for invalid
    /// input and solver setup failures.
    pub fn minimize(
        &self,
        objective: &dyn ObjectiveFunction,
        parameters: &[ParameterSpec],
    ) -> Result<OptimizationResult, FitError> {
        let bounds: Vec<(f64, f64)> = parameters.iter().map(|p| (p.lower, p.upper)).collect();
        let transform = BoundedTransform::new(bounds);
        let init: Vec<f64> = parameters.iter().map(|p| p.initial).collect();
        let counts = FuncCounts::default();
        let problem = || ArgminProblem {
            objective,
            transform: &transform,
            counts: &counts,
        };

        let mut start = transform.to_internal(&init);
        let mut total_iter = 0;

        if self.config.seed_iter > 0 {
            match self.run_simplex(problem(), &start, self.config.seed_iter, 1e-6) {
                Ok(stage) => {
                    total_iter += stage.n_iter;
                    debug!(fval = stage.fval, n_iter = stage.n_iter, "simplex seed");
                    start = stage.best;
                }
                Err(e) => warn!("simplex seed failed: {e}"),
            }
        }

        let lbfgs = match self.run_lbfgs(problem(), &start) {
            Ok(stage) => {
                total_iter += stage.n_iter;
                debug!(fval = stage.fval, converged = stage.converged, "L-BFGS stage");
                Some(stage)
            }
            Err(e) => {
                warn!("L-BFGS stage failed: {e}");
                None
            }
        };

        let finish = |stage: Stage, minimizer: Minimizer, n_iter: u64| OptimizationResult {
            parameters: transform.to_external(&stage.best),
            fval: stage.fval,
            n_iter,
            n_fev: counts.cost.load(Ordering::Relaxed),
            n_gev: counts.grad.load(Ordering::Relaxed),
            converged: stage.accepted(),
            at_limit: transform.at_limit(&stage.best),
            minimizer,
            message: stage.message,
        };

        let restart = match lbfgs {
            Some(stage) if stage.accepted() || self.config.simplex_max_iter == 0 => {
                return Ok(finish(stage, Minimizer::Lbfgs, total_iter));
            }
            Some(stage) => stage.best,
            None if self.config.simplex_max_iter == 0 => {
                return Err(FitError::Convergence {
                    iterations: total_iter,
                    reason: "L-BFGS failed and the simplex fallback is disabled".into(),
                });
            }
            None => start,
        };

        warn!("L-BFGS did not converge; falling back to Nelder-Mead");
        let stage = self.run_simplex(
            problem(),
            &restart,
            self.config.simplex_max_iter,
            self.config.simplex_tol,
        )?;
        total_iter += stage.n_iter;
        Ok(finish(stage, Minimizer::NelderMead, total_iter))
    }

    fn run_lbfgs(&self, problem: ArgminProblem<'_>, start: &[f64]) -> Result<Stage, FitError> {
        let setup = |e: argmin::core::Error| FitError::Convergence {
            iterations: 0,
            reason: format!("invalid L-BFGS configuration: {e}"),
        };
        let linesearch = MoreThuenteLineSearch::new();
        let solver = LBFGS::new(linesearch, self.config.m)
            .with_tolerance_grad(self.config.tol_grad)
            .map_err(setup)?
            .with_tolerance_cost(self.config.tol_cost)
            .map_err(setup)?;

        let res = Executor::new(problem, solver)
            .configure(|state| state.param(start.to_vec()).max_iters(self.config.max_iter))
            .run()
            .map_err(|e| FitError::Convergence {
                iterations: 0,
                reason: format!("L-BFGS failed: {e}"),
            })?;

        let state = res.state();
        let best = state
            .get_best_param()
            .ok_or_else(|| FitError::Convergence {
                iterations: state.get_iter(),
                reason: "L-BFGS produced no parameters".into(),
            })?
            .clone();
        let status = state.get_termination_status();
        let fval = state.get_best_cost();
        Ok(Stage {
            best,
            fval,
            n_iter: state.get_iter(),
            converged: is_converged(status),
            finite: fval < INVALID_COST,
            message: status.to_string(),
        })
    }

    fn run_simplex(
        &self,
        problem: ArgminProblem<'_>,
        start: &[f64],
        max_iter: u64,
        tol: f64,
    ) -> Result<Stage, FitError> {
        let setup = |e: argmin::core::Error| FitError::Convergence {
            iterations: 0,
            reason: format!("invalid Nelder-Mead configuration: {e}"),
        };

        // Initial simplex: the start point plus one vertex per axis.
        let mut vertices = vec![start.to_vec()];
        for i in 0..start.len() {
            let mut v = start.to_vec();
            v[i] += 0.1;
            vertices.push(v);
        }

        let solver = NelderMead::new(vertices).with_sd_tolerance(tol).map_err(setup)?;
        let res = Executor::new(problem, solver)
            .configure(|state| state.max_iters(max_iter))
            .run()
            .map_err(|e| FitError::Convergence {
                iterations: 0,
                reason: format!("Nelder-Mead failed: {e}"),
            })?;

        let state = res.state();
        let best = state
            .get_best_param()
            .ok_or_else(|| FitError::Convergence {
                iterations: state.get_iter(),
                reason: "Nelder-Mead produced no parameters".into(),
            })?
            .clone();
        let status = state.get_termination_status();
        let fval = state.get_best_cost();
        Ok(Stage {
            best,
            fval,
            n_iter: state.get_iter(),
            converged: is_converged(status),
            finite: fval < INVALID_COST,
            message: status.to_string(),
        })
    }
}

impl Default for BoundedMinimizer {
    fn default() -> Self {
        Self::new(OptimizerConfig::default())
    }
}
