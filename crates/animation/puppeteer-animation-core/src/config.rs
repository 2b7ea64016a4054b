//! Animation and synthesis configuration.

use serde::{Deserialize, Serialize};

/// How [`Animation::pose_at`](crate::Animation::pose_at) fills in times
/// between keyframes.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpolationPolicy {
    /// Per-coordinate linear blend of the bounding keyframes.
    #[default]
    Linear,
    /// State of the closer bounding keyframe; ties go to the earlier one.
    Nearest,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Policy given to the synthesized animation.
    pub interpolation: InterpolationPolicy,
}
