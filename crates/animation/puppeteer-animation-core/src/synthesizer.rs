//! Batch fitting over a range of capture frames.

use std::ops::RangeInclusive;

use puppeteer_fitting_core::{collect_targets, FitStatus, PoseFitter};
use puppeteer_markers_core::MarkerStore;
use puppeteer_model_core::KinematicModel;
use serde::{Deserialize, Serialize};

use crate::cancel::Cancellation;
use crate::config::SynthesisConfig;
use crate::error::SynthesisError;
use crate::keyframe::{Animation, Keyframe};

/// What happened at one capture frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameReport {
    pub frame: i32,
    pub time: f64,
    /// `None` when no marker was visible and the fit was skipped.
    pub status: Option<FitStatus>,
    pub residual: Option<f64>,
    pub iterations: usize,
    /// Assigned markers with no finite sample at this frame.
    pub occluded: Vec<String>,
    pub success: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SynthesisReport {
    pub animation: Animation,
    pub frames: Vec<FrameReport>,
    pub cancelled: bool,
    /// Every requested frame was fitted successfully and the run was not cancelled.
    pub success: bool,
}

impl SynthesisReport {
    pub fn failed_frames(&self) -> impl Iterator<Item = i32> + '_ {
        self.frames.iter().filter(|f| !f.success).map(|f| f.frame)
    }
}

#[derive(Clone, Debug, Default)]
pub struct AnimationSynthesizer {
    config: SynthesisConfig,
}

impl AnimationSynthesizer {
    pub fn new(config: SynthesisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    /// Fit every frame in `range` and collect one keyframe per frame.
    ///
    /// Each frame is seeded from the state committed for the frame before it,
    /// and its fitted state (successful or not) is committed to `model`.
    /// A failed frame is reported and the batch carries on. `cancel` is
    /// polled before each frame; a cancelled run keeps the keyframes made so
    /// far and reports failure.
    ///
    /// Errors are only returned for problems that make the whole batch
    /// meaningless; they are detected before the model is touched.
    pub fn synthesize<F, C>(
        &self,
        model: &mut KinematicModel,
        markers: &mut MarkerStore,
        engine: &mut F,
        range: RangeInclusive<i32>,
        cancel: &C,
    ) -> Result<SynthesisReport, SynthesisError>
    where
        F: PoseFitter + ?Sized,
        C: Cancellation + ?Sized,
    {
        let (start, end) = (*range.start(), *range.end());
        if start > end {
            return Err(SynthesisError::EmptyRange { start, end });
        }
        markers.time_of(start)?;
        markers.time_of(end)?;

        let mut assigned = 0;
        for (_, marker) in model.correspondences() {
            if !markers.contains(&marker.name) {
                return Err(SynthesisError::MissingMarker {
                    name: marker.name.clone(),
                });
            }
            assigned += 1;
        }
        if assigned == 0 {
            return Err(SynthesisError::NoCorrespondences);
        }
        if model.is_stale() {
            model.forward_kinematics();
        }

        let mut animation = Animation::new(model.dof_count(), self.config.interpolation);
        let mut frames = Vec::with_capacity((end as i64 - start as i64 + 1) as usize);
        let mut cancelled = false;

        for frame in range {
            if cancel.is_cancelled() {
                log::warn!("synthesis cancelled before frame {frame}");
                cancelled = true;
                break;
            }
            markers.set_current_frame(frame)?;
            let time = markers.time_of(frame)?;
            let set = collect_targets(model, |name| markers.current_position(name).ok());

            let report = if set.is_empty() {
                log::warn!("frame {frame}: no visible markers, keeping previous pose");
                FrameReport {
                    frame,
                    time,
                    status: None,
                    residual: None,
                    iterations: 0,
                    occluded: set.skipped,
                    success: false,
                }
            } else {
                if !set.skipped.is_empty() {
                    log::debug!("frame {frame}: {} occluded markers skipped", set.skipped.len());
                }
                let outcome = engine.run(model, &set.targets, model.state())?;
                model.set_state_and_update(&outcome.state)?;
                FrameReport {
                    frame,
                    time,
                    status: Some(outcome.status),
                    residual: Some(outcome.residual),
                    iterations: outcome.iterations,
                    occluded: set.skipped,
                    success: outcome.success(),
                }
            };
            log::debug!(
                "frame {frame} at {time:.3}s: {:?}, residual {:?}",
                report.status,
                report.residual
            );

            animation.push(Keyframe::new(time, model.state().to_vec()))?;
            frames.push(report);
        }

        let success = !cancelled && frames.iter().all(|f| f.success);
        let failed = frames.iter().filter(|f| !f.success).count();
        log::info!(
            "synthesized {} keyframes over [{start}, {end}]: {failed} failed, cancelled = {cancelled}",
            animation.len()
        );
        Ok(SynthesisReport {
            animation,
            frames,
            cancelled,
            success,
        })
    }
}
