//! puppeteer-model-core: hierarchical body model for marker-based pose fitting.
//!
//! Frames live in an arena addressed by [`FrameId`]; the root is always
//! `FrameId(0)` and parents precede their children, so the state vector is
//! laid out as contiguous per-frame ranges in arena order.

pub mod builder;
pub mod definition;
pub mod error;
pub mod frame;
pub mod joint;
pub mod model;

pub use builder::ModelBuilder;
pub use definition::{FrameDefinition, MarkerDefinition, ModelDefinition, StateSnapshot};
pub use error::{ModelError, Result};
pub use frame::{Frame, FrameId, MarkerCorrespondence, VisualPrimitive};
pub use joint::{DofKind, Joint, JointDof};
pub use model::{DofAxis, KinematicModel};

pub use nalgebra;
