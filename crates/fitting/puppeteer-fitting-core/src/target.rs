//! Fit targets: a correspondence paired with the observed world position.

use nalgebra::{Point3, Vector3};
use puppeteer_model_core::{FrameId, KinematicModel};

/// One marker to pull towards an observed position.
#[derive(Clone, Debug, PartialEq)]
pub struct FitTarget {
    pub frame: FrameId,
    pub marker: String,
    /// Marker offset in the frame's local coordinates.
    pub local: Vector3<f64>,
    /// Observed world position.
    pub target: Point3<f64>,
}

/// Targets gathered for one capture frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TargetSet {
    pub targets: Vec<FitTarget>,
    /// Correspondences with no finite observation (occluded or unknown to the lookup).
    pub skipped: Vec<String>,
}

impl TargetSet {
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }
}

/// Pair every correspondence of `model` with `lookup(marker_name)`.
pub fn collect_targets<F>(model: &KinematicModel, mut lookup: F) -> TargetSet
where
    F: FnMut(&str) -> Option<Point3<f64>>,
{
    let mut set = TargetSet::default();
    for (frame, marker) in model.correspondences() {
        match lookup(&marker.name) {
            Some(p) if p.coords.iter().all(|v| v.is_finite()) => set.targets.push(FitTarget {
                frame,
                marker: marker.name.clone(),
                local: marker.local,
                target: p,
            }),
            _ => set.skipped.push(marker.name.clone()),
        }
    }
    set
}
