//! Random-access marker store with a cached current frame.

use hashbrown::HashMap;
use nalgebra::{Matrix3, Point3, Vector3};

use crate::capture::{CaptureData, MarkerTrajectory};
use crate::config::MarkerStoreConfig;
use crate::error::{MarkerError, Result};
use crate::orientation::{detect_reversal, OrientationReport};

/// Cached world position of a tracked marker at the current frame.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackedPosition {
    pub name: String,
    pub color: [f32; 3],
    pub position: Point3<f64>,
}

/// Marker trajectories of one capture, addressed by name and frame number.
///
/// Single writer: `set_current_frame` and `set_reoriented` refresh the cached
/// tracked positions before returning.
#[derive(Clone, Debug)]
pub struct MarkerStore {
    first_frame: i32,
    last_frame: i32,
    sample_rate: f64,
    trajectories: Vec<MarkerTrajectory>,
    index: HashMap<String, usize>,
    config: MarkerStoreConfig,
    correction: Matrix3<f64>,
    reoriented: bool,
    current_frame: i32,
    tracked: Vec<(usize, usize)>,
    current: Vec<TrackedPosition>,
    orientation: Option<OrientationReport>,
}

impl MarkerStore {
    pub fn new(capture: CaptureData, config: MarkerStoreConfig) -> Result<Self> {
        capture.validate()?;
        if !config.unit_scale.is_finite() || config.unit_scale <= 0.0 {
            return Err(MarkerError::InvalidConfig {
                reason: format!("unit scale must be positive, got {}", config.unit_scale),
            });
        }
        let correction = config.orientation.correction.matrix();
        if correction.iter().any(|v| !v.is_finite()) {
            return Err(MarkerError::InvalidConfig {
                reason: "axis correction contains non-finite entries".into(),
            });
        }

        let index: HashMap<String, usize> = capture
            .trajectories
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name.clone(), i))
            .collect();

        let mut tracked = Vec::with_capacity(config.tracked.len());
        for (k, marker) in config.tracked.iter().enumerate() {
            match index.get(&marker.name) {
                Some(&i) => tracked.push((k, i)),
                None => log::warn!(
                    "tracked marker '{}' is not present in the capture; skipping",
                    marker.name
                ),
            }
        }

        let mut store = Self {
            first_frame: capture.first_frame,
            last_frame: capture.last_frame,
            sample_rate: capture.sample_rate,
            trajectories: capture.trajectories,
            index,
            config,
            correction,
            reoriented: false,
            current_frame: capture.first_frame,
            tracked,
            current: Vec::new(),
            orientation: None,
        };
        store.orientation = store.vote_orientation();
        store.refresh_current();
        log::debug!(
            "marker store: {} trajectories, frames [{}, {}] at {} Hz",
            store.trajectories.len(),
            store.first_frame,
            store.last_frame,
            store.sample_rate
        );
        Ok(store)
    }

    pub fn first_frame(&self) -> i32 {
        self.first_frame
    }

    pub fn last_frame(&self) -> i32 {
        self.last_frame
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn frame_count(&self) -> usize {
        (self.last_frame as i64 - self.first_frame as i64 + 1) as usize
    }

    pub fn current_frame(&self) -> i32 {
        self.current_frame
    }

    pub fn config(&self) -> &MarkerStoreConfig {
        &self.config
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn marker_names(&self) -> impl Iterator<Item = &str> {
        self.trajectories.iter().map(|t| t.name.as_str())
    }

    /// Seconds since the first frame.
    pub fn time_of(&self, frame: i32) -> Result<f64> {
        let offset = self.offset_of(frame)?;
        Ok(offset as f64 / self.sample_rate)
    }

    fn offset_of(&self, frame: i32) -> Result<usize> {
        if frame < self.first_frame || frame > self.last_frame {
            return Err(MarkerError::FrameOutOfRange {
                frame,
                first: self.first_frame,
                last: self.last_frame,
            });
        }
        Ok((frame as i64 - self.first_frame as i64) as usize)
    }

    fn trajectory(&self, name: &str) -> Result<&MarkerTrajectory> {
        self.index
            .get(name)
            .map(|&i| &self.trajectories[i])
            .ok_or_else(|| MarkerError::UnknownMarker {
                name: name.to_string(),
            })
    }

    fn convert(&self, sample: [f64; 3]) -> Point3<f64> {
        let scaled = Vector3::from(sample) * self.config.unit_scale;
        if self.reoriented {
            Point3::from(self.correction * scaled)
        } else {
            Point3::from(scaled)
        }
    }

    /// Position of `name` at `frame` in model units, with the orientation
    /// correction applied when enabled. Occluded samples come back non-finite.
    pub fn position_of(&self, name: &str, frame: i32) -> Result<Point3<f64>> {
        let offset = self.offset_of(frame)?;
        let t = self.trajectory(name)?;
        Ok(self.convert(t.sample(offset)))
    }

    /// Position of `name` at the current frame.
    pub fn current_position(&self, name: &str) -> Result<Point3<f64>> {
        self.position_of(name, self.current_frame)
    }

    /// Cached positions of the tracked markers present in this capture.
    pub fn current_positions(&self) -> &[TrackedPosition] {
        &self.current
    }

    /// Move to `frame`; out-of-range frames are rejected and nothing changes.
    pub fn set_current_frame(&mut self, frame: i32) -> Result<()> {
        self.offset_of(frame)?;
        self.current_frame = frame;
        self.refresh_current();
        Ok(())
    }

    pub fn is_reoriented(&self) -> bool {
        self.reoriented
    }

    /// Enable or disable the configured axis correction for every sample.
    pub fn set_reoriented(&mut self, reoriented: bool) {
        if self.reoriented != reoriented {
            self.reoriented = reoriented;
            self.refresh_current();
        }
    }

    /// Backward-facing vote taken on the raw samples when the store was
    /// created; `None` when either pelvic marker is missing from the capture.
    pub fn orientation(&self) -> Option<&OrientationReport> {
        self.orientation.as_ref()
    }

    /// The load-time vote, or the lookup error for a missing pelvic marker.
    pub fn detect_reversal(&self) -> Result<OrientationReport> {
        match self.orientation {
            Some(report) => Ok(report),
            None => {
                let cfg = &self.config.orientation;
                self.trajectory(&cfg.left_marker)?;
                self.trajectory(&cfg.right_marker)?;
                Err(MarkerError::UnknownMarker {
                    name: cfg.left_marker.clone(),
                })
            }
        }
    }

    fn vote_orientation(&self) -> Option<OrientationReport> {
        let cfg = &self.config.orientation;
        let (Ok(left), Ok(right)) = (
            self.trajectory(&cfg.left_marker),
            self.trajectory(&cfg.right_marker),
        ) else {
            log::warn!(
                "pelvic markers '{}'/'{}' not both present; orientation vote skipped",
                cfg.left_marker,
                cfg.right_marker
            );
            return None;
        };
        let report = detect_reversal(left, right, cfg);
        log::info!(
            "orientation vote: {}/{} frames backward, reversed = {}",
            report.negative,
            report.sampled,
            report.reversed
        );
        Some(report)
    }

    fn refresh_current(&mut self) {
        let offset = (self.current_frame as i64 - self.first_frame as i64) as usize;
        let current: Vec<TrackedPosition> = self
            .tracked
            .iter()
            .map(|&(k, i)| {
                let marker = &self.config.tracked[k];
                TrackedPosition {
                    name: marker.name.clone(),
                    color: marker.color,
                    position: self.convert(self.trajectories[i].sample(offset)),
                }
            })
            .collect();
        self.current = current;
    }
}
