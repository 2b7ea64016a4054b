//! Frames: the nodes of the kinematic tree, stored in an arena and addressed by [`FrameId`].

use std::ops::Range;

use nalgebra::{Isometry3, Vector3};
use serde::{Deserialize, Serialize};

use crate::joint::Joint;

/// Index of a frame inside its model's arena. The root is always `FrameId(0)`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct FrameId(pub usize);

impl FrameId {
    pub const ROOT: FrameId = FrameId(0);

    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A marker attached to a frame at a fixed offset in frame-local coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct MarkerCorrespondence {
    pub name: String,
    pub local: Vector3<f64>,
}

/// Display geometry attached to a frame. Opaque to the kinematics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VisualPrimitive {
    /// Center in frame-local coordinates.
    pub center: [f64; 3],
    /// Box extents along the local axes.
    pub dimensions: [f64; 3],
    #[serde(default = "default_visual_color")]
    pub color: [f32; 3],
}

fn default_visual_color() -> [f32; 3] {
    [0.8, 0.8, 0.8]
}

/// Node of the kinematic tree.
#[derive(Clone, Debug)]
pub struct Frame {
    pub(crate) name: String,
    pub(crate) parent: Option<FrameId>,
    pub(crate) children: Vec<FrameId>,
    pub(crate) joint: Joint,
    /// Cached `joint.offset()`.
    pub(crate) offset: Isometry3<f64>,
    pub(crate) dof_range: Range<usize>,
    pub(crate) markers: Vec<MarkerCorrespondence>,
    pub(crate) visuals: Vec<VisualPrimitive>,
}

impl Frame {
    pub(crate) fn new(name: String, parent: Option<FrameId>, joint: Joint) -> Self {
        let offset = joint.offset();
        Self {
            name,
            parent,
            children: Vec::new(),
            joint,
            offset,
            dof_range: 0..0,
            markers: Vec::new(),
            visuals: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<FrameId> {
        self.parent
    }

    pub fn children(&self) -> &[FrameId] {
        &self.children
    }

    pub fn joint(&self) -> &Joint {
        &self.joint
    }

    /// Half-open range of this frame's coordinates in the model state vector.
    pub fn dof_range(&self) -> Range<usize> {
        self.dof_range.clone()
    }

    pub fn markers(&self) -> &[MarkerCorrespondence] {
        &self.markers
    }

    pub fn marker(&self, name: &str) -> Option<&MarkerCorrespondence> {
        self.markers.iter().find(|m| m.name == name)
    }

    pub fn visuals(&self) -> &[VisualPrimitive] {
        &self.visuals
    }

    /// Insert or replace the marker called `name`; the last assignment wins.
    pub(crate) fn upsert_marker(&mut self, name: &str, local: Vector3<f64>) {
        match self.markers.iter_mut().find(|m| m.name == name) {
            Some(existing) => existing.local = local,
            None => self.markers.push(MarkerCorrespondence {
                name: name.to_string(),
                local,
            }),
        }
    }
}
