//! Per-joint analytic strategy.
//!
//! Walks the frames root to leaf. Each frame solves a small damped least
//! squares problem over its own coordinates only, using the markers attached
//! to it, then forward kinematics is refreshed before the next frame. The
//! damping follows Sugihara: half the squared local error plus a constant
//! bias, so steps shrink to Gauss-Newton as the error vanishes.

use nalgebra::DMatrix;
use puppeteer_model_core::{FrameId, KinematicModel};

use crate::config::FitConfig;
use crate::error::Result;
use crate::fitter::{log_outcome, prepare, FitOutcome, FitStatus, PoseFitter};
use crate::jacobian::{analytic_jacobian, cost, residuals};
use crate::target::FitTarget;

#[derive(Debug, Clone)]
pub struct AnalyticFitter {
    config: FitConfig,
    last: Option<FitOutcome>,
}

impl AnalyticFitter {
    pub fn new(config: FitConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, last: None })
    }

    /// Up to `inner_iterations` damped steps on one frame. A step that does
    /// not lower the frame's own error is undone and ends the local solve.
    fn solve_frame(
        &self,
        work: &mut KinematicModel,
        q: &mut [f64],
        frame: FrameId,
        targets: &[FitTarget],
    ) -> Result<()> {
        let range = work.dof_range(frame)?;
        let n = range.len();
        for _ in 0..self.config.inner_iterations {
            let r = residuals(work, targets)?;
            let error = 0.5 * r.norm_squared();
            if error == 0.0 {
                break;
            }
            let jac = analytic_jacobian(work, targets, range.clone())?;
            let damping = error + self.config.sugihara_bias;
            let lhs = jac.transpose() * &jac + DMatrix::identity(n, n) * damping;
            let rhs = -(jac.transpose() * &r);
            let Some(delta) = lhs.cholesky().map(|c| c.solve(&rhs)) else {
                break;
            };

            let saved: Vec<f64> = q[range.clone()].to_vec();
            for (k, d) in delta.iter().enumerate() {
                q[range.start + k] += d;
            }
            work.set_state_and_update(q)?;
            let trial = 0.5 * residuals(work, targets)?.norm_squared();
            if trial.is_nan() || trial >= error {
                q[range.clone()].copy_from_slice(&saved);
                work.set_state_and_update(q)?;
                break;
            }
        }
        Ok(())
    }
}

impl PoseFitter for AnalyticFitter {
    fn run(
        &mut self,
        model: &KinematicModel,
        targets: &[FitTarget],
        initial: &[f64],
    ) -> Result<FitOutcome> {
        let mut work = prepare(model, targets, initial)?;
        let mut q = initial.to_vec();

        // Targets grouped by frame, in arena order; frames without
        // coordinates cannot move their markers and are left out.
        let mut groups: Vec<(FrameId, Vec<FitTarget>)> = Vec::new();
        for id in work.frame_ids() {
            if work.dof_range(id)?.is_empty() {
                continue;
            }
            let own: Vec<FitTarget> = targets.iter().filter(|t| t.frame == id).cloned().collect();
            if !own.is_empty() {
                groups.push((id, own));
            }
        }

        let tol_sq = self.config.tolerance * self.config.tolerance;
        let mut total = cost(&work, targets)?;
        let initial_residual = total.sqrt();
        let mut status = FitStatus::MaxIterations;
        let mut iterations = 0;

        if total <= tol_sq {
            status = FitStatus::Converged;
        } else {
            for _ in 0..self.config.max_iterations {
                iterations += 1;
                for (frame, own) in &groups {
                    self.solve_frame(&mut work, &mut q, *frame, own)?;
                }
                let next = cost(&work, targets)?;
                let improvement = total - next;
                total = next;
                if total <= tol_sq {
                    status = FitStatus::Converged;
                    break;
                }
                if improvement <= self.config.stall_ratio * (total + improvement) {
                    status = FitStatus::Stalled;
                    break;
                }
            }
        }

        let outcome = FitOutcome {
            state: q,
            status,
            residual: total.sqrt(),
            initial_residual,
            iterations,
        };
        log_outcome("analytic", &outcome);
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
