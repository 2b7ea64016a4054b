//! Error types for pose fitting. Non-convergence is not an error; see
//! [`FitStatus`](crate::FitStatus).

use puppeteer_model_core::ModelError;
use thiserror::Error;

/// Invalid fitting input. Raised before any iteration runs.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum FitError {
    /// Initial state sized for a different model
    #[error("initial state has {actual} values, model has {expected} degrees of freedom")]
    InitialStateLength { expected: usize, actual: usize },

    /// Empty target set
    #[error("no targets to fit")]
    NoTargets,

    /// Target position with NaN or infinite coordinates
    #[error("target for marker '{marker}' is not finite")]
    NonFiniteTarget { marker: String },

    /// Invalid fitting configuration
    #[error("invalid fit configuration: {reason}")]
    InvalidConfig { reason: String },

    /// Model lookup failure
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl FitError {
    pub fn category(&self) -> &'static str {
        match self {
            Self::InitialStateLength { .. } | Self::NonFiniteTarget { .. } => "data",
            Self::Model(err) => err.category(),
            _ => "configuration",
        }
    }
}

pub type Result<T> = std::result::Result<T, FitError>;
