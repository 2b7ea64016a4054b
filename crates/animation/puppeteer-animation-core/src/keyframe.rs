//! Time-ordered pose sequences.

use puppeteer_model_core::KinematicModel;
use serde::{Deserialize, Serialize};

use crate::config::InterpolationPolicy;
use crate::error::{AnimationError, Result};

/// A full state vector stamped with a time in seconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub time: f64,
    pub state: Vec<f64>,
}

impl Keyframe {
    pub fn new(time: f64, state: Vec<f64>) -> Self {
        Self { time, state }
    }
}

/// Keyframes with strictly increasing times, all sized for one model.
///
/// Deserialization goes through the same checks as [`Animation::from_keyframes`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawAnimation")]
pub struct Animation {
    dof_count: usize,
    interpolation: InterpolationPolicy,
    keyframes: Vec<Keyframe>,
}

#[derive(Deserialize)]
struct RawAnimation {
    dof_count: usize,
    #[serde(default)]
    interpolation: InterpolationPolicy,
    keyframes: Vec<Keyframe>,
}

impl TryFrom<RawAnimation> for Animation {
    type Error = AnimationError;

    fn try_from(raw: RawAnimation) -> Result<Self> {
        Self::from_keyframes(raw.dof_count, raw.interpolation, raw.keyframes)
    }
}

impl Animation {
    /// An empty animation for a model with `dof_count` coordinates.
    pub fn new(dof_count: usize, interpolation: InterpolationPolicy) -> Self {
        Self {
            dof_count,
            interpolation,
            keyframes: Vec::new(),
        }
    }

    /// Validate an externally loaded sequence. Short or long states are a
    /// hard error; nothing is padded or truncated.
    pub fn from_keyframes(
        dof_count: usize,
        interpolation: InterpolationPolicy,
        keyframes: Vec<Keyframe>,
    ) -> Result<Self> {
        let mut animation = Self::new(dof_count, interpolation);
        animation.keyframes.reserve(keyframes.len());
        for keyframe in keyframes {
            animation.push(keyframe)?;
        }
        Ok(animation)
    }

    /// Append a keyframe after the current last one.
    pub fn push(&mut self, keyframe: Keyframe) -> Result<()> {
        let index = self.keyframes.len();
        if keyframe.state.len() != self.dof_count {
            return Err(AnimationError::DofMismatch {
                index,
                expected: self.dof_count,
                actual: keyframe.state.len(),
            });
        }
        if !keyframe.time.is_finite() || keyframe.state.iter().any(|v| !v.is_finite()) {
            return Err(AnimationError::NonFinite { index });
        }
        if let Some(last) = self.keyframes.last() {
            if keyframe.time <= last.time {
                return Err(AnimationError::NonMonotonicTime {
                    index,
                    time: keyframe.time,
                });
            }
        }
        self.keyframes.push(keyframe);
        Ok(())
    }

    pub fn dof_count(&self) -> usize {
        self.dof_count
    }

    pub fn interpolation(&self) -> InterpolationPolicy {
        self.interpolation
    }

    pub fn set_interpolation(&mut self, interpolation: InterpolationPolicy) {
        self.interpolation = interpolation;
    }

    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    pub fn first_time(&self) -> Option<f64> {
        self.keyframes.first().map(|k| k.time)
    }

    pub fn last_time(&self) -> Option<f64> {
        self.keyframes.last().map(|k| k.time)
    }

    /// Pose at `time`. Exact keyframe times return the stored state unchanged.
    pub fn pose_at(&self, time: f64) -> Result<Vec<f64>> {
        let (Some(first), Some(last)) = (self.keyframes.first(), self.keyframes.last()) else {
            return Err(AnimationError::Empty);
        };
        if !(time >= first.time && time <= last.time) {
            return Err(AnimationError::TimeOutOfRange {
                time,
                first: first.time,
                last: last.time,
            });
        }

        // Index of the first keyframe strictly after `time`.
        let upper = self.keyframes.partition_point(|k| k.time <= time);
        let left = &self.keyframes[upper - 1];
        if left.time == time || upper == self.keyframes.len() {
            return Ok(left.state.clone());
        }
        let right = &self.keyframes[upper];
        let u = (time - left.time) / (right.time - left.time);

        Ok(match self.interpolation {
            InterpolationPolicy::Linear => left
                .state
                .iter()
                .zip(&right.state)
                .map(|(a, b)| a + (b - a) * u)
                .collect(),
            InterpolationPolicy::Nearest => {
                if u <= 0.5 {
                    left.state.clone()
                } else {
                    right.state.clone()
                }
            }
        })
    }

    /// Write the pose at `time` into `model` and refresh its kinematics.
    pub fn apply_to(&self, model: &mut KinematicModel, time: f64) -> Result<()> {
        if model.dof_count() != self.dof_count {
            return Err(AnimationError::DofMismatch {
                index: 0,
                expected: model.dof_count(),
                actual: self.dof_count,
            });
        }
        let pose = self.pose_at(time)?;
        model.set_state_and_update(&pose)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_keys(policy: InterpolationPolicy) -> Animation {
        Animation::from_keyframes(
            2,
            policy,
            vec![
                Keyframe::new(0.0, vec![0.0, 1.0]),
                Keyframe::new(0.5, vec![2.0, -1.0]),
                Keyframe::new(1.0, vec![4.0, 0.0]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn nearest_picks_the_closer_keyframe() {
        let anim = two_keys(InterpolationPolicy::Nearest);
        assert_eq!(anim.pose_at(0.2).unwrap(), vec![0.0, 1.0]);
        assert_eq!(anim.pose_at(0.25).unwrap(), vec![0.0, 1.0]);
        assert_eq!(anim.pose_at(0.3).unwrap(), vec![2.0, -1.0]);
        assert_eq!(anim.pose_at(1.0).unwrap(), vec![4.0, 0.0]);
    }

    #[test]
    fn rejects_out_of_order_and_non_finite_keys() {
        let mut anim = two_keys(InterpolationPolicy::Linear);
        assert_eq!(
            anim.push(Keyframe::new(1.0, vec![0.0, 0.0])),
            Err(AnimationError::NonMonotonicTime { index: 3, time: 1.0 })
        );
        assert_eq!(
            anim.push(Keyframe::new(f64::NAN, vec![0.0, 0.0])),
            Err(AnimationError::NonFinite { index: 3 })
        );
        assert_eq!(anim.len(), 3);
    }

    #[test]
    fn queries_outside_the_range_fail() {
        let anim = two_keys(InterpolationPolicy::Linear);
        assert!(matches!(
            anim.pose_at(-0.1),
            Err(AnimationError::TimeOutOfRange { .. })
        ));
        assert!(anim.pose_at(f64::NAN).is_err());
        let empty = Animation::new(2, InterpolationPolicy::Linear);
        assert_eq!(empty.pose_at(0.0), Err(AnimationError::Empty));
    }

    #[test]
    fn loading_revalidates() {
        let anim = two_keys(InterpolationPolicy::Linear);
        let json = serde_json::to_string(&anim).unwrap();
        let back: Animation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, anim);

        let short = r#"{ "dof_count": 2, "keyframes": [ { "time": 0.0, "state": [1.0] } ] }"#;
        assert!(serde_json::from_str::<Animation>(short).is_err());
    }
}
