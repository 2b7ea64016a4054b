//! Detection of captures recorded with the subject facing the reverse direction.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::capture::MarkerTrajectory;
use crate::config::OrientationConfig;

/// Outcome of the backward-facing vote over a capture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrientationReport {
    /// Frames whose pelvic vector projects negatively onto the forward axis.
    pub negative: usize,
    /// Frames where both pelvic markers were visible.
    pub sampled: usize,
    pub reversed: bool,
}

impl OrientationReport {
    pub fn negative_fraction(&self) -> f64 {
        if self.sampled == 0 {
            0.0
        } else {
            self.negative as f64 / self.sampled as f64
        }
    }
}

/// Vote over every frame where both markers are visible.
pub fn detect_reversal(
    left: &MarkerTrajectory,
    right: &MarkerTrajectory,
    config: &OrientationConfig,
) -> OrientationReport {
    let forward = Vector3::from(config.forward_axis);
    let mut negative = 0;
    let mut sampled = 0;
    for i in 0..left.len().min(right.len()) {
        let l = Vector3::from(left.sample(i));
        let r = Vector3::from(right.sample(i));
        if !(l.iter().all(|v| v.is_finite()) && r.iter().all(|v| v.is_finite())) {
            continue;
        }
        sampled += 1;
        if (r - l).dot(&forward) < 0.0 {
            negative += 1;
        }
    }
    let reversed = sampled > 0 && negative as f64 > config.threshold * sampled as f64;
    OrientationReport {
        negative,
        sampled,
        reversed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Pelvis pair facing forward except in the frames listed in `backward`.
    fn pelvis(frames: usize, backward: &[usize]) -> (MarkerTrajectory, MarkerTrajectory) {
        let mut l = Vec::new();
        let mut r = Vec::new();
        for i in 0..frames {
            let s = if backward.contains(&i) { -1.0 } else { 1.0 };
            l.push([i as f64, 120.0 * s, 1000.0]);
            r.push([i as f64, -120.0 * s, 1000.0]);
        }
        (
            MarkerTrajectory::from_points("LASI", &l),
            MarkerTrajectory::from_points("RASI", &r),
        )
    }

    #[test]
    fn majority_backward_flags_reversal() {
        let (l, r) = pelvis(10, &[0, 1, 2, 3, 4, 5]);
        let report = detect_reversal(&l, &r, &OrientationConfig::default());
        assert_eq!(report.negative, 6);
        assert!(report.reversed);
    }

    #[test]
    fn minority_or_exact_half_does_not_flag() {
        let (l, r) = pelvis(10, &[2, 7, 9]);
        assert!(!detect_reversal(&l, &r, &OrientationConfig::default()).reversed);
        let (l, r) = pelvis(10, &[0, 1, 2, 3, 4]);
        assert!(!detect_reversal(&l, &r, &OrientationConfig::default()).reversed);
    }

    #[test]
    fn occluded_frames_are_not_sampled() {
        let (mut l, r) = pelvis(4, &[0, 1]);
        l.x[2] = f64::NAN;
        l.y[3] = f64::NAN;
        let report = detect_reversal(&l, &r, &OrientationConfig::default());
        assert_eq!(report.sampled, 2);
        assert_eq!(report.negative, 2);
        assert!(report.reversed);
    }
}
