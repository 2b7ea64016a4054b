//! Marker store configuration.

use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};

/// A marker shown by the viewer, with its display color.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackedMarker {
    pub name: String,
    pub color: [f32; 3],
}

impl TrackedMarker {
    pub fn new(name: impl Into<String>, color: [f32; 3]) -> Self {
        Self {
            name: name.into(),
            color,
        }
    }
}

const TORSO: [f32; 3] = [0.0, 0.0, 1.0];
const RIGHT: [f32; 3] = [1.0, 0.0, 0.0];
const LEFT: [f32; 3] = [0.0, 1.0, 0.0];

/// Plug-in-Gait head, torso, arm and leg markers.
pub fn default_tracked_markers() -> Vec<TrackedMarker> {
    let torso = [
        "LFHD", "LBHD", "RFHD", "RBHD", "LASI", "LPSI", "RASI", "RPSI", "C7", "STRN", "T10",
    ];
    let right = [
        "RSHO", "RUPA", "RELB", "RWRA", "RWRB", "RTHI", "RTIB", "RKNE", "RANK", "RHEE", "RTOE",
    ];
    let left = [
        "LSHO", "LUPA", "LELB", "LWRA", "LWRB", "LTHI", "LTIB", "LKNE", "LANK", "LHEE", "LTOE",
    ];
    torso
        .iter()
        .map(|n| TrackedMarker::new(*n, TORSO))
        .chain(right.iter().map(|n| TrackedMarker::new(*n, RIGHT)))
        .chain(left.iter().map(|n| TrackedMarker::new(*n, LEFT)))
        .collect()
}

/// Linear map applied to every sample of a capture flagged as reversed.
/// Stored row-major so that axis swaps and sign flips can be written directly.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AxisCorrection {
    pub rows: [[f64; 3]; 3],
}

impl AxisCorrection {
    pub fn identity() -> Self {
        Self {
            rows: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        }
    }

    /// Half turn about the vertical (z) axis: x and y change sign.
    pub fn half_turn_about_vertical() -> Self {
        Self {
            rows: [[-1.0, 0.0, 0.0], [0.0, -1.0, 0.0], [0.0, 0.0, 1.0]],
        }
    }

    pub fn matrix(&self) -> Matrix3<f64> {
        let r = &self.rows;
        Matrix3::new(
            r[0][0], r[0][1], r[0][2], r[1][0], r[1][1], r[1][2], r[2][0], r[2][1], r[2][2],
        )
    }
}

impl Default for AxisCorrection {
    fn default() -> Self {
        Self::half_turn_about_vertical()
    }
}

/// Backward-facing capture detection.
///
/// A frame counts as backward when `(right - left) · forward_axis < 0`. The
/// default axis matches a lab where subjects walk along +x with z up, so
/// the left-to-right pelvic vector points along -y.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrientationConfig {
    pub left_marker: String,
    pub right_marker: String,
    pub forward_axis: [f64; 3],
    /// Fraction of sampled frames that must face backward (strictly exceeded).
    pub threshold: f64,
    pub correction: AxisCorrection,
}

impl Default for OrientationConfig {
    fn default() -> Self {
        Self {
            left_marker: "LASI".into(),
            right_marker: "RASI".into(),
            forward_axis: [0.0, -1.0, 0.0],
            threshold: 0.5,
            correction: AxisCorrection::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerStoreConfig {
    /// Scale from capture length units to model units (mm to m by default).
    pub unit_scale: f64,
    pub tracked: Vec<TrackedMarker>,
    pub orientation: OrientationConfig,
}

impl Default for MarkerStoreConfig {
    fn default() -> Self {
        Self {
            unit_scale: 1.0e-3,
            tracked: default_tracked_markers(),
            orientation: OrientationConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    #[test]
    fn default_correction_turns_about_z() {
        let m = AxisCorrection::default().matrix();
        assert_eq!(m * Vector3::new(1.0, 2.0, 3.0), Vector3::new(-1.0, -2.0, 3.0));
    }

    #[test]
    fn config_round_trips_through_json() {
        let cfg = MarkerStoreConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: MarkerStoreConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
        assert_eq!(cfg.tracked.len(), 33);
    }
}
