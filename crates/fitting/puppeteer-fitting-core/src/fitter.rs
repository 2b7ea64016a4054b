//! The fitting contract shared by both strategies.

use puppeteer_model_core::KinematicModel;
use serde::{Deserialize, Serialize};

use crate::config::FitConfig;
use crate::error::{FitError, Result};
use crate::target::FitTarget;

/// Why a fit stopped.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitStatus {
    /// Residual at or below the tolerance.
    Converged,
    /// Step or gradient became negligible: a local minimum was reached.
    SmallStep,
    /// A full pass no longer reduced the residual meaningfully.
    Stalled,
    MaxIterations,
    /// No damping level produced a descent step.
    DampingExhausted,
}

impl FitStatus {
    #[inline]
    pub fn is_success(self) -> bool {
        matches!(self, FitStatus::Converged | FitStatus::SmallStep)
    }
}

/// Result of one fit. The state is the best one reached, successful or not.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FitOutcome {
    pub state: Vec<f64>,
    pub status: FitStatus,
    /// Residual norm at `state`.
    pub residual: f64,
    /// Residual norm at the initial state.
    pub initial_residual: f64,
    pub iterations: usize,
}

impl FitOutcome {
    #[inline]
    pub fn success(&self) -> bool {
        self.status.is_success()
    }
}

/// A pose-fitting strategy.
///
/// Fitters work on a private copy of the model: `run` never touches the
/// caller's live state. Callers apply [`fitted_state`](Self::fitted_state)
/// explicitly.
pub trait PoseFitter {
    /// Fit `initial` so that every target marker lands on its observation.
    fn run(
        &mut self,
        model: &KinematicModel,
        targets: &[FitTarget],
        initial: &[f64],
    ) -> Result<FitOutcome>;

    fn last_outcome(&self) -> Option<&FitOutcome>;

    fn config(&self) -> &FitConfig;

    /// Whether the most recent run succeeded.
    fn is_converged(&self) -> bool {
        self.last_outcome().map(FitOutcome::success).unwrap_or(false)
    }

    /// State reached by the most recent run.
    fn fitted_state(&self) -> Option<&[f64]> {
        self.last_outcome().map(|o| o.state.as_slice())
    }
}

/// Validate inputs and produce the scratch model positioned at `initial`.
pub(crate) fn prepare(
    model: &KinematicModel,
    targets: &[FitTarget],
    initial: &[f64],
) -> Result<KinematicModel> {
    if initial.len() != model.dof_count() {
        return Err(FitError::InitialStateLength {
            expected: model.dof_count(),
            actual: initial.len(),
        });
    }
    if targets.is_empty() {
        return Err(FitError::NoTargets);
    }
    for t in targets {
        model.frame(t.frame)?;
        if !t.target.coords.iter().all(|v| v.is_finite()) {
            return Err(FitError::NonFiniteTarget {
                marker: t.marker.clone(),
            });
        }
    }
    let mut work = model.clone();
    work.set_state_and_update(initial)?;
    Ok(work)
}

pub(crate) fn log_outcome(strategy: &str, outcome: &FitOutcome) {
    if outcome.success() {
        log::debug!(
            "{strategy}: {:?} after {} iterations, residual {:.3e} (from {:.3e})",
            outcome.status,
            outcome.iterations,
            outcome.residual,
            outcome.initial_residual
        );
    } else {
        log::warn!(
            "{strategy}: no convergence ({:?}) after {} iterations, residual {:.3e} (from {:.3e})",
            outcome.status,
            outcome.iterations,
            outcome.residual,
            outcome.initial_residual
        );
    }
}
