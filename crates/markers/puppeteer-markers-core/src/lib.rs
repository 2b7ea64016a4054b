//! puppeteer-markers-core: motion-capture marker trajectories for pose fitting.
//!
//! A [`MarkerStore`] owns every trajectory of one capture over an inclusive
//! `[first_frame, last_frame]` range, converts samples to model units and can
//! apply an axis correction to captures recorded facing the wrong way.

pub mod capture;
pub mod config;
pub mod error;
pub mod orientation;
pub mod store;

pub use capture::{CaptureData, MarkerTrajectory};
pub use config::{
    default_tracked_markers, AxisCorrection, MarkerStoreConfig, OrientationConfig, TrackedMarker,
};
pub use error::{MarkerError, Result};
pub use orientation::{detect_reversal, OrientationReport};
pub use store::{MarkerStore, TrackedPosition};
