//! Capture data handed over by a motion-capture loader.

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};

use crate::error::{MarkerError, Result};

/// Samples of one marker in capture units. Occluded samples are non-finite.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerTrajectory {
    pub name: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
}

impl MarkerTrajectory {
    pub fn new(name: impl Into<String>, x: Vec<f64>, y: Vec<f64>, z: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            x,
            y,
            z,
        }
    }

    /// Build from per-frame points.
    pub fn from_points(name: impl Into<String>, points: &[[f64; 3]]) -> Self {
        Self::new(
            name,
            points.iter().map(|p| p[0]).collect(),
            points.iter().map(|p| p[1]).collect(),
            points.iter().map(|p| p[2]).collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    #[inline]
    pub(crate) fn sample(&self, offset: usize) -> [f64; 3] {
        [self.x[offset], self.y[offset], self.z[offset]]
    }
}

/// A whole capture: inclusive frame range, sample rate and trajectories.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CaptureData {
    pub first_frame: i32,
    pub last_frame: i32,
    /// Frames per second.
    pub sample_rate: f64,
    pub trajectories: Vec<MarkerTrajectory>,
}

impl CaptureData {
    pub fn frame_count(&self) -> usize {
        (self.last_frame as i64 - self.first_frame as i64 + 1).max(0) as usize
    }

    pub fn validate(&self) -> Result<()> {
        if self.first_frame > self.last_frame {
            return Err(MarkerError::InvalidRange {
                first: self.first_frame,
                last: self.last_frame,
            });
        }
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(MarkerError::InvalidSampleRate {
                rate: self.sample_rate,
            });
        }
        let expected = self.frame_count();
        let mut seen = HashSet::with_capacity(self.trajectories.len());
        for t in &self.trajectories {
            if !seen.insert(t.name.as_str()) {
                return Err(MarkerError::DuplicateMarker {
                    name: t.name.clone(),
                });
            }
            for (axis, samples) in [('x', &t.x), ('y', &t.y), ('z', &t.z)] {
                if samples.len() != expected {
                    return Err(MarkerError::TrajectoryLength {
                        name: t.name.clone(),
                        axis,
                        expected,
                        actual: samples.len(),
                    });
                }
            }
        }
        Ok(())
    }
}
