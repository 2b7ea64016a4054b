//! Error types for the kinematic model.

use thiserror::Error;

/// Failures raised by [`KinematicModel`](crate::KinematicModel) operations.
///
/// Every variant is rejected before any mutation takes place.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum ModelError {
    /// Frame id not in this model
    #[error("unknown frame id {id} (model has {count} frames)")]
    UnknownFrame { id: usize, count: usize },

    /// No frame with this name
    #[error("unknown frame '{name}'")]
    UnknownFrameName { name: String },

    /// Marker not attached to the frame
    #[error("frame '{frame}' has no marker '{marker}'")]
    UnknownMarker { frame: String, marker: String },

    /// State variable name not in this model
    #[error("unknown state variable '{name}'")]
    UnknownVariable { name: String },

    /// State index past the last degree of freedom
    #[error("state index {index} out of range [0, {len})")]
    StateIndexOutOfRange { index: usize, len: usize },

    /// State vector of the wrong length
    #[error("state vector has {actual} values but the model has {expected} degrees of freedom")]
    StateLengthMismatch { expected: usize, actual: usize },

    /// Snapshot lacks some model variables
    #[error("state snapshot is missing {missing} of {expected} variables (first: '{first}')")]
    MissingVariables {
        expected: usize,
        missing: usize,
        first: String,
    },

    /// NaN or infinite state value
    #[error("state value for '{name}' is not finite")]
    NonFiniteValue { name: String },

    /// World-space read after a state write, before forward kinematics
    #[error("global transforms are stale; run forward_kinematics() after mutating the state")]
    StaleKinematics,

    /// Frame name used twice
    #[error("duplicate frame name '{name}'")]
    DuplicateFrame { name: String },

    /// Two degrees of freedom share a state variable name
    #[error("state variable name '{name}' is used by more than one degree of freedom")]
    DuplicateVariable { name: String },

    /// Parent name not defined
    #[error("frame '{frame}' references unknown parent '{parent}'")]
    UnknownParent { frame: String, parent: String },

    /// Definition without exactly one parentless frame
    #[error("model definition must have exactly one root frame, found {found}")]
    RootCount { found: usize },

    /// Frames unreachable from the root
    #[error("frame hierarchy contains a cycle through '{frame}'")]
    Cycle { frame: String },

    /// Joint axis of zero length
    #[error("degree of freedom {dof} of frame '{frame}' has a zero-length axis")]
    DegenerateAxis { frame: String, dof: usize },
}

impl ModelError {
    /// Coarse error class, used for logging and by callers deciding how to recover.
    pub fn category(&self) -> &'static str {
        match self {
            Self::StateIndexOutOfRange { .. } => "range",
            Self::StateLengthMismatch { .. }
            | Self::MissingVariables { .. }
            | Self::NonFiniteValue { .. } => "data",
            Self::StaleKinematics => "state",
            _ => "configuration",
        }
    }
}

/// Result alias for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;
