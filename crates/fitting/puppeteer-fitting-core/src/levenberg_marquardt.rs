//! Global damped Gauss-Newton over the whole state vector.

use nalgebra::{DMatrix, DVector};
use puppeteer_model_core::KinematicModel;

use crate::config::{FitConfig, JacobianMode};
use crate::error::Result;
use crate::fitter::{log_outcome, prepare, FitOutcome, FitStatus, PoseFitter};
use crate::jacobian::{analytic_jacobian, numeric_jacobian, residuals};
use crate::target::FitTarget;

/// Levenberg-Marquardt fitter.
///
/// Solves `(JᵀJ + λI) δ = -Jᵀr` each iteration. Accepted steps shrink `λ`,
/// rejected ones grow it; the run gives up once `λ` exceeds `max_damping`.
/// A negligible step ends the run as `SmallStep` when the gradient is also
/// negligible and as `Stalled` otherwise.
#[derive(Debug, Clone)]
pub struct LevenbergMarquardtFitter {
    config: FitConfig,
    last: Option<FitOutcome>,
}

impl LevenbergMarquardtFitter {
    pub fn new(config: FitConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, last: None })
    }

    fn jacobian(&self, work: &mut KinematicModel, targets: &[FitTarget]) -> Result<DMatrix<f64>> {
        match self.config.jacobian {
            JacobianMode::Analytic => analytic_jacobian(work, targets, 0..work.dof_count()),
            JacobianMode::CentralDifference { step } => numeric_jacobian(work, targets, step),
        }
    }
}

impl PoseFitter for LevenbergMarquardtFitter {
    fn run(
        &mut self,
        model: &KinematicModel,
        targets: &[FitTarget],
        initial: &[f64],
    ) -> Result<FitOutcome> {
        let mut work = prepare(model, targets, initial)?;
        let n = work.dof_count();
        let cfg = &self.config;
        let tol_sq = cfg.tolerance * cfg.tolerance;

        let mut q = DVector::from_column_slice(initial);
        let mut r = residuals(&work, targets)?;
        let mut current = r.norm_squared();
        let initial_residual = current.sqrt();
        let mut lambda = cfg.initial_damping;
        let mut status = FitStatus::MaxIterations;
        let mut iterations = 0;

        while iterations < cfg.max_iterations {
            if current <= tol_sq {
                status = FitStatus::Converged;
                break;
            }
            iterations += 1;

            let jac = self.jacobian(&mut work, targets)?;
            let gradient = jac.transpose() * &r;
            if gradient.norm() <= cfg.step_tolerance {
                status = FitStatus::SmallStep;
                break;
            }
            let hessian = jac.transpose() * &jac;

            // Raise the damping until a step lowers the cost.
            let mut accepted = None;
            while lambda <= cfg.max_damping {
                let lhs = &hessian + DMatrix::identity(n, n) * lambda;
                let Some(delta) = lhs.cholesky().map(|c| c.solve(&(-&gradient))) else {
                    lambda *= cfg.damping_increase;
                    continue;
                };
                let candidate = &q + &delta;
                work.set_state_and_update(candidate.as_slice())?;
                let trial = residuals(&work, targets)?;
                let trial_cost = trial.norm_squared();
                if trial_cost < current {
                    lambda = (lambda / cfg.damping_decrease).max(f64::MIN_POSITIVE);
                    accepted = Some((candidate, trial, trial_cost, delta.norm()));
                    break;
                }
                lambda *= cfg.damping_increase;
            }

            let Some((candidate, trial, trial_cost, step)) = accepted else {
                work.set_state_and_update(q.as_slice())?;
                status = FitStatus::DampingExhausted;
                break;
            };
            q = candidate;
            r = trial;
            current = trial_cost;
            log::trace!("lm iteration {iterations}: cost {current:.3e}, lambda {lambda:.1e}");

            if current <= tol_sq {
                status = FitStatus::Converged;
                break;
            }
            if step <= cfg.step_tolerance * (q.norm() + cfg.step_tolerance) {
                // A vanishing step only counts as a minimum if the gradient vanishes too.
                let jac = self.jacobian(&mut work, targets)?;
                status = if (jac.transpose() * &r).norm() <= cfg.step_tolerance {
                    FitStatus::SmallStep
                } else {
                    FitStatus::Stalled
                };
                break;
            }
        }
        if status == FitStatus::MaxIterations && current <= tol_sq {
            status = FitStatus::Converged;
        }

        let outcome = FitOutcome {
            state: q.as_slice().to_vec(),
            status,
            residual: current.sqrt(),
            initial_residual,
            iterations,
        };
        log_outcome("levenberg-marquardt", &outcome);
        self.last = Some(outcome.clone());
        Ok(outcome)
    }

    fn last_outcome(&self) -> Option<&FitOutcome> {
        self.last.as_ref()
    }

    fn config(&self) -> &FitConfig {
        &self.config
    }
}
