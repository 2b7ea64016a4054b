//! Error types for keyframed animation and batch synthesis.

use puppeteer_fitting_core::FitError;
use puppeteer_markers_core::MarkerError;
use puppeteer_model_core::ModelError;
use thiserror::Error;

/// Invalid keyframe data or queries.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum AnimationError {
    /// Keyframe state sized for a different model
    #[error("keyframe {index} holds {actual} values, model has {expected} degrees of freedom")]
    DofMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },

    /// Keyframe time not after its predecessor
    #[error("keyframe {index} at {time}s does not come after the previous keyframe")]
    NonMonotonicTime { index: usize, time: f64 },

    /// NaN or infinite keyframe time or value
    #[error("keyframe {index} has a non-finite time or value")]
    NonFinite { index: usize },

    /// Query on an animation without keyframes
    #[error("animation has no keyframes")]
    Empty,

    /// Query time outside the keyframe range
    #[error("time {time}s is outside the animation range [{first}, {last}]")]
    TimeOutOfRange { time: f64, first: f64, last: f64 },

    /// Model failure
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl AnimationError {
    pub fn category(&self) -> &'static str {
        match self {
            Self::DofMismatch { .. } | Self::NonMonotonicTime { .. } | Self::NonFinite { .. } => {
                "data"
            }
            Self::TimeOutOfRange { .. } | Self::Empty => "range",
            Self::Model(err) => err.category(),
        }
    }
}

/// Failures that abort a synthesis batch. Batch configuration problems are
/// reported before the first frame is fitted.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum SynthesisError {
    /// Start frame after end frame
    #[error("frame range [{start}, {end}] is empty")]
    EmptyRange { start: i32, end: i32 },

    /// Model without marker correspondences
    #[error("model has no marker correspondences to fit")]
    NoCorrespondences,

    /// Correspondence naming a marker the capture lacks
    #[error("marker '{name}' is assigned on the model but missing from the capture")]
    MissingMarker { name: String },

    /// Model failure
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Marker store failure
    #[error(transparent)]
    Markers(#[from] MarkerError),

    /// Fitting failure
    #[error(transparent)]
    Fit(#[from] FitError),

    /// Keyframe failure
    #[error(transparent)]
    Animation(#[from] AnimationError),
}

impl SynthesisError {
    pub fn category(&self) -> &'static str {
        match self {
            Self::EmptyRange { .. } => "range",
            Self::NoCorrespondences | Self::MissingMarker { .. } => "configuration",
            Self::Model(err) => err.category(),
            Self::Markers(err) => err.category(),
            Self::Fit(err) => err.category(),
            Self::Animation(err) => err.category(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AnimationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_pass_through_wrapped_errors() {
        let err = SynthesisError::from(MarkerError::FrameOutOfRange {
            frame: 12,
            first: 1,
            last: 10,
        });
        assert_eq!(err.category(), "range");
        assert_eq!(
            AnimationError::DofMismatch {
                index: 0,
                expected: 6,
                actual: 5
            }
            .category(),
            "data"
        );
        assert_eq!(SynthesisError::NoCorrespondences.category(), "configuration");
    }
}
