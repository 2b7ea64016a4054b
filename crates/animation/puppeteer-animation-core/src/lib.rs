//! puppeteer-animation-core: keyframed pose sequences and their synthesis
//! from a marker capture.
//!
//! [`AnimationSynthesizer`] steps a [`MarkerStore`](puppeteer_markers_core::MarkerStore)
//! through a frame range, fits the model at every frame with any
//! [`PoseFitter`](puppeteer_fitting_core::PoseFitter) and records an
//! [`Animation`].

pub mod cancel;
pub mod config;
pub mod error;
pub mod keyframe;
pub mod synthesizer;

pub use cancel::{CancelFlag, Cancellation, NeverCancel};
pub use config::{InterpolationPolicy, SynthesisConfig};
pub use error::{AnimationError, Result, SynthesisError};
pub use keyframe::{Animation, Keyframe};
pub use synthesizer::{AnimationSynthesizer, FrameReport, SynthesisReport};
