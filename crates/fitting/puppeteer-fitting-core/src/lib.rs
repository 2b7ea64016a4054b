//! puppeteer-fitting-core: fit a kinematic model's state to observed markers.
//!
//! Two strategies share the [`PoseFitter`] contract:
//! - [`AnalyticFitter`] solves each frame's coordinates in turn against that
//!   frame's own markers.
//! - [`LevenbergMarquardtFitter`] minimizes all residuals over the whole state.
//!
//! [`FittingEngine`] picks one from a [`FitConfig`].

pub mod analytic;
pub mod config;
pub mod engine;
pub mod error;
pub mod fitter;
pub mod jacobian;
pub mod levenberg_marquardt;
pub mod target;

pub use analytic::AnalyticFitter;
pub use config::{FitConfig, FitStrategy, JacobianMode};
pub use engine::FittingEngine;
pub use error::{FitError, Result};
pub use fitter::{FitOutcome, FitStatus, PoseFitter};
pub use levenberg_marquardt::LevenbergMarquardtFitter;
pub use target::{collect_targets, FitTarget, TargetSet};
