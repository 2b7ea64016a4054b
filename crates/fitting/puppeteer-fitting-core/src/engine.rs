//! Strategy selection behind one type.

use puppeteer_model_core::KinematicModel;

use crate::analytic::AnalyticFitter;
use crate::config::{FitConfig, FitStrategy};
use crate::error::Result;
use crate::fitter::{FitOutcome, PoseFitter};
use crate::levenberg_marquardt::LevenbergMarquardtFitter;
use crate::target::FitTarget;

/// The fitter chosen by [`FitConfig::strategy`].
#[derive(Debug, Clone)]
pub enum FittingEngine {
    Analytic(AnalyticFitter),
    LevenbergMarquardt(LevenbergMarquardtFitter),
}

impl FittingEngine {
    pub fn new(config: FitConfig) -> Result<Self> {
        Ok(match config.strategy {
            FitStrategy::Analytic => Self::Analytic(AnalyticFitter::new(config)?),
            FitStrategy::LevenbergMarquardt => {
                Self::LevenbergMarquardt(LevenbergMarquardtFitter::new(config)?)
            }
        })
    }

    pub fn strategy(&self) -> FitStrategy {
        match self {
            Self::Analytic(_) => FitStrategy::Analytic,
            Self::LevenbergMarquardt(_) => FitStrategy::LevenbergMarquardt,
        }
    }

    fn inner(&self) -> &dyn PoseFitter {
        match self {
            Self::Analytic(f) => f,
            Self::LevenbergMarquardt(f) => f,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn PoseFitter {
        match self {
            Self::Analytic(f) => f,
            Self::LevenbergMarquardt(f) => f,
        }
    }
}

impl PoseFitter for FittingEngine {
    fn run(
        &mut self,
        model: &KinematicModel,
        targets: &[FitTarget],
        initial: &[f64],
    ) -> Result<FitOutcome> {
        self.inner_mut().run(model, targets, initial)
    }

    fn last_outcome(&self) -> Option<&FitOutcome> {
        self.inner().last_outcome()
    }

    fn config(&self) -> &FitConfig {
        self.inner().config()
    }
}
