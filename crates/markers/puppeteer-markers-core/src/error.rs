//! Error types for the marker store.

use thiserror::Error;

/// Failures raised while loading or querying marker trajectories.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum MarkerError {
    /// First frame after last frame
    #[error("invalid frame range [{first}, {last}]")]
    InvalidRange { first: i32, last: i32 },

    /// Non-positive or non-finite sample rate
    #[error("sample rate must be finite and positive, got {rate}")]
    InvalidSampleRate { rate: f64 },

    /// Trajectory sample count does not match the frame range
    #[error("trajectory '{name}' has {actual} samples on {axis}, expected {expected}")]
    TrajectoryLength {
        name: String,
        axis: char,
        expected: usize,
        actual: usize,
    },

    /// Two trajectories with one name
    #[error("duplicate marker trajectory '{name}'")]
    DuplicateMarker { name: String },

    /// No trajectory with this name
    #[error("unknown marker '{name}'")]
    UnknownMarker { name: String },

    /// Frame outside the capture range
    #[error("frame {frame} out of range [{first}, {last}]")]
    FrameOutOfRange { frame: i32, first: i32, last: i32 },

    /// Invalid store configuration
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl MarkerError {
    pub fn category(&self) -> &'static str {
        match self {
            Self::FrameOutOfRange { .. } => "range",
            Self::TrajectoryLength { .. } | Self::InvalidRange { .. } => "data",
            _ => "configuration",
        }
    }
}

pub type Result<T> = std::result::Result<T, MarkerError>;
