//! Fitting configuration.

use serde::{Deserialize, Serialize};

use crate::error::{FitError, Result};

/// Which fitting algorithm a [`FittingEngine`](crate::FittingEngine) runs.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitStrategy {
    /// Frame-by-frame damped least squares over each frame's own coordinates.
    Analytic,
    /// Damped Gauss-Newton over the whole state vector.
    LevenbergMarquardt,
}

/// How marker-position Jacobians are evaluated by the global strategy.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum JacobianMode {
    Analytic,
    CentralDifference { step: f64 },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    pub strategy: FitStrategy,
    /// Outer iterations (full passes for the analytic strategy).
    pub max_iterations: usize,
    /// Converged once the residual norm is at or below this.
    pub tolerance: f64,
    /// Relative step size below which the global strategy stops. Also the
    /// gradient norm at or below which that stop counts as a minimum.
    pub step_tolerance: f64,
    /// Analytic strategy: a pass that lowers the squared residual by less
    /// than this fraction ends the run as stalled.
    pub stall_ratio: f64,
    pub initial_damping: f64,
    pub damping_increase: f64,
    pub damping_decrease: f64,
    pub max_damping: f64,
    /// Constant added to the residual-dependent damping of the analytic strategy.
    pub sugihara_bias: f64,
    /// Local solves per frame per pass.
    pub inner_iterations: usize,
    pub jacobian: JacobianMode,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            strategy: FitStrategy::LevenbergMarquardt,
            max_iterations: 100,
            tolerance: 1e-6,
            step_tolerance: 1e-10,
            stall_ratio: 1e-6,
            initial_damping: 1e-3,
            damping_increase: 10.0,
            damping_decrease: 10.0,
            max_damping: 1e10,
            sugihara_bias: 1e-3,
            inner_iterations: 5,
            jacobian: JacobianMode::Analytic,
        }
    }
}

impl FitConfig {
    pub fn with_strategy(mut self, strategy: FitStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("tolerance", self.tolerance),
            ("step_tolerance", self.step_tolerance),
            ("initial_damping", self.initial_damping),
            ("max_damping", self.max_damping),
            ("sugihara_bias", self.sugihara_bias),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(FitError::InvalidConfig {
                    reason: format!("{name} must be finite and positive, got {value}"),
                });
            }
        }
        if !(self.damping_increase > 1.0 && self.damping_decrease > 1.0) {
            return Err(FitError::InvalidConfig {
                reason: "damping factors must be greater than 1".into(),
            });
        }
        if !(0.0..1.0).contains(&self.stall_ratio) {
            return Err(FitError::InvalidConfig {
                reason: format!("stall_ratio must lie in [0, 1), got {}", self.stall_ratio),
            });
        }
        if self.max_iterations == 0 || self.inner_iterations == 0 {
            return Err(FitError::InvalidConfig {
                reason: "iteration budgets must be at least 1".into(),
            });
        }
        if let JacobianMode::CentralDifference { step } = self.jacobian {
            if !step.is_finite() || step <= 0.0 {
                return Err(FitError::InvalidConfig {
                    reason: format!("finite-difference step must be positive, got {step}"),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate_and_round_trip() {
        let cfg = FitConfig::default();
        cfg.validate().unwrap();
        let json = serde_json::to_string(&cfg).unwrap();
        assert_eq!(serde_json::from_str::<FitConfig>(&json).unwrap(), cfg);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: FitConfig = serde_json::from_str(
            r#"{ "strategy": "analytic", "jacobian": { "mode": "central_difference", "step": 1e-6 } }"#,
        )
        .unwrap();
        assert_eq!(cfg.strategy, FitStrategy::Analytic);
        assert_eq!(cfg.max_iterations, 100);
        assert_eq!(cfg.jacobian, JacobianMode::CentralDifference { step: 1e-6 });
    }

    #[test]
    fn rejects_bad_budgets() {
        let cfg = FitConfig {
            max_iterations: 0,
            ..FitConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(FitError::InvalidConfig { .. })));
        let cfg = FitConfig {
            damping_increase: 1.0,
            ..FitConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
