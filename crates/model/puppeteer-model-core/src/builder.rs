//! Incremental construction of a [`KinematicModel`].

use hashbrown::{HashMap, HashSet};
use nalgebra::Vector3;

use crate::error::{ModelError, Result};
use crate::frame::{Frame, FrameId, VisualPrimitive};
use crate::joint::Joint;
use crate::model::KinematicModel;

/// Builds the frame arena root first. A frame can only be attached to a parent
/// that already exists, so arena order is always a valid root-to-leaf order.
#[derive(Debug)]
pub struct ModelBuilder {
    frames: Vec<Frame>,
    by_name: HashMap<String, FrameId>,
}

impl ModelBuilder {
    pub fn new(root_name: impl Into<String>, mut joint: Joint) -> Result<Self> {
        let name = root_name.into();
        joint.normalize(&name)?;
        let mut by_name = HashMap::new();
        by_name.insert(name.clone(), FrameId::ROOT);
        Ok(Self {
            frames: vec![Frame::new(name, None, joint)],
            by_name,
        })
    }

    pub fn add_frame(
        &mut self,
        name: impl Into<String>,
        parent: FrameId,
        mut joint: Joint,
    ) -> Result<FrameId> {
        let name = name.into();
        if parent.0 >= self.frames.len() {
            return Err(ModelError::UnknownFrame {
                id: parent.0,
                count: self.frames.len(),
            });
        }
        if self.by_name.contains_key(&name) {
            return Err(ModelError::DuplicateFrame { name });
        }
        joint.normalize(&name)?;
        let id = FrameId(self.frames.len());
        self.frames[parent.0].children.push(id);
        self.by_name.insert(name.clone(), id);
        self.frames.push(Frame::new(name, Some(parent), joint));
        Ok(id)
    }

    pub fn add_marker(
        &mut self,
        frame: FrameId,
        name: impl Into<String>,
        local: Vector3<f64>,
    ) -> Result<()> {
        let count = self.frames.len();
        let target = self
            .frames
            .get_mut(frame.0)
            .ok_or(ModelError::UnknownFrame { id: frame.0, count })?;
        target.upsert_marker(&name.into(), local);
        Ok(())
    }

    pub fn add_visual(&mut self, frame: FrameId, visual: VisualPrimitive) -> Result<()> {
        let count = self.frames.len();
        self.frames
            .get_mut(frame.0)
            .ok_or(ModelError::UnknownFrame { id: frame.0, count })?
            .visuals
            .push(visual);
        Ok(())
    }

    pub fn frame_id(&self, name: &str) -> Option<FrameId> {
        self.by_name.get(name).copied()
    }

    /// Lay out the state vector in arena order and run forward kinematics once.
    ///
    /// Fails when two coordinates end up with the same variable name, since
    /// name-keyed snapshots could not tell them apart.
    pub fn build(mut self) -> Result<KinematicModel> {
        let mut next = 0;
        let mut variable_names = Vec::new();
        let mut seen = HashSet::new();
        let mut dof_owner = Vec::new();
        for (idx, frame) in self.frames.iter_mut().enumerate() {
            let count = frame.joint.dof_count();
            frame.dof_range = next..next + count;
            next += count;

            let labels: Vec<String> = frame.joint.dofs.iter().map(|d| d.label()).collect();
            for (k, label) in labels.iter().enumerate() {
                let ambiguous = labels.iter().filter(|l| *l == label).count() > 1;
                let label = if ambiguous {
                    format!("{label}{k}")
                } else {
                    label.clone()
                };
                let name = format!("{}.{}", frame.name, label);
                if !seen.insert(name.clone()) {
                    return Err(ModelError::DuplicateVariable { name });
                }
                variable_names.push(name);
                dof_owner.push(FrameId(idx));
            }
        }
        log::debug!(
            "built kinematic model: {} frames, {} degrees of freedom",
            self.frames.len(),
            next
        );
        Ok(KinematicModel::from_parts(
            self.frames,
            self.by_name,
            variable_names,
            dof_owner,
        ))
    }
}
