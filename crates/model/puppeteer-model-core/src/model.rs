//! The kinematic model: frame arena, generalized state vector and cached
//! forward kinematics.

use std::ops::Range;

use hashbrown::HashMap;
use nalgebra::{Isometry3, Point3, Translation3, Vector3};

use crate::error::{ModelError, Result};
use crate::frame::{Frame, FrameId, MarkerCorrespondence};
use crate::joint::DofKind;

/// World-space motion axis of one degree of freedom, valid for the state the
/// kinematics were last computed from.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DofAxis {
    pub kind: DofKind,
    /// Point on the axis (the joint position when the DOF is applied).
    pub origin: Point3<f64>,
    /// Unit direction in world coordinates.
    pub axis: Vector3<f64>,
}

impl DofAxis {
    /// Velocity of `point` per unit change of this coordinate.
    #[inline]
    pub fn point_velocity(&self, point: &Point3<f64>) -> Vector3<f64> {
        match self.kind {
            DofKind::Rotation => self.axis.cross(&(point - self.origin)),
            DofKind::Translation => self.axis,
        }
    }
}

/// Hierarchical body model with a flat vector of generalized coordinates.
///
/// State writes mark the cached global transforms stale; every read of a
/// world-space quantity fails with [`ModelError::StaleKinematics`] until
/// [`forward_kinematics`](Self::forward_kinematics) runs again.
#[derive(Clone, Debug)]
pub struct KinematicModel {
    frames: Vec<Frame>,
    by_name: HashMap<String, FrameId>,
    state: Vec<f64>,
    variable_names: Vec<String>,
    dof_owner: Vec<FrameId>,
    globals: Vec<Isometry3<f64>>,
    dof_axes: Vec<DofAxis>,
    stale: bool,
}

impl KinematicModel {
    pub(crate) fn from_parts(
        frames: Vec<Frame>,
        by_name: HashMap<String, FrameId>,
        variable_names: Vec<String>,
        dof_owner: Vec<FrameId>,
    ) -> Self {
        let dofs = variable_names.len();
        let placeholder = DofAxis {
            kind: DofKind::Rotation,
            origin: Point3::origin(),
            axis: Vector3::z(),
        };
        let mut model = Self {
            globals: vec![Isometry3::identity(); frames.len()],
            frames,
            by_name,
            state: vec![0.0; dofs],
            variable_names,
            dof_owner,
            dof_axes: vec![placeholder; dofs],
            stale: true,
        };
        model.forward_kinematics();
        model
    }

    // ----- structure -----

    pub fn root(&self) -> FrameId {
        FrameId::ROOT
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Total number of generalized coordinates.
    pub fn dof_count(&self) -> usize {
        self.state.len()
    }

    /// Frames in arena (root-to-leaf) order.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn frame_ids(&self) -> impl Iterator<Item = FrameId> {
        (0..self.frames.len()).map(FrameId)
    }

    pub fn frame(&self, id: FrameId) -> Result<&Frame> {
        self.frames.get(id.0).ok_or(ModelError::UnknownFrame {
            id: id.0,
            count: self.frames.len(),
        })
    }

    fn frame_mut(&mut self, id: FrameId) -> Result<&mut Frame> {
        let count = self.frames.len();
        self.frames
            .get_mut(id.0)
            .ok_or(ModelError::UnknownFrame { id: id.0, count })
    }

    pub fn frame_by_name(&self, name: &str) -> Result<FrameId> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| ModelError::UnknownFrameName {
                name: name.to_string(),
            })
    }

    pub fn dof_range(&self, frame: FrameId) -> Result<Range<usize>> {
        Ok(self.frame(frame)?.dof_range())
    }

    /// Frame owning the coordinate at `index`.
    pub fn frame_of_dof(&self, index: usize) -> Result<FrameId> {
        self.dof_owner
            .get(index)
            .copied()
            .ok_or(ModelError::StateIndexOutOfRange {
                index,
                len: self.state.len(),
            })
    }

    /// Whether `index` is one of `frame`'s own coordinates.
    pub fn is_dof_of_frame(&self, index: usize, frame: FrameId) -> Result<bool> {
        let owner = self.frame_of_dof(index)?;
        self.frame(frame)?;
        Ok(owner == frame)
    }

    /// True if `frame` is `ancestor` or lies below it in the tree.
    pub fn is_in_subtree(&self, ancestor: FrameId, frame: FrameId) -> bool {
        let mut cursor = Some(frame);
        while let Some(id) = cursor {
            if id == ancestor {
                return true;
            }
            // Parents always precede children in the arena.
            if id.0 < ancestor.0 {
                return false;
            }
            cursor = self.frames.get(id.0).and_then(|f| f.parent);
        }
        false
    }

    // ----- state -----

    pub fn state(&self) -> &[f64] {
        &self.state
    }

    pub fn variable_names(&self) -> &[String] {
        &self.variable_names
    }

    pub fn variable_index(&self, name: &str) -> Result<usize> {
        self.variable_names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| ModelError::UnknownVariable {
                name: name.to_string(),
            })
    }

    pub fn state_value(&self, index: usize) -> Result<f64> {
        self.state
            .get(index)
            .copied()
            .ok_or(ModelError::StateIndexOutOfRange {
                index,
                len: self.state.len(),
            })
    }

    /// Replace the whole state vector. Marks the kinematics stale.
    pub fn set_state(&mut self, values: &[f64]) -> Result<()> {
        if values.len() != self.state.len() {
            return Err(ModelError::StateLengthMismatch {
                expected: self.state.len(),
                actual: values.len(),
            });
        }
        if let Some(i) = values.iter().position(|v| !v.is_finite()) {
            return Err(ModelError::NonFiniteValue {
                name: self.variable_names[i].clone(),
            });
        }
        self.state.copy_from_slice(values);
        self.stale = true;
        Ok(())
    }

    /// Write one coordinate. Marks the kinematics stale.
    pub fn set_state_value(&mut self, index: usize, value: f64) -> Result<()> {
        let len = self.state.len();
        let name = self
            .variable_names
            .get(index)
            .ok_or(ModelError::StateIndexOutOfRange { index, len })?;
        if !value.is_finite() {
            return Err(ModelError::NonFiniteValue { name: name.clone() });
        }
        self.state[index] = value;
        self.stale = true;
        Ok(())
    }

    /// `set_state` followed by `forward_kinematics`.
    pub fn set_state_and_update(&mut self, values: &[f64]) -> Result<()> {
        self.set_state(values)?;
        self.forward_kinematics();
        Ok(())
    }

    // ----- kinematics -----

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Recompute every frame's global transform from the current state.
    pub fn forward_kinematics(&mut self) {
        for (idx, frame) in self.frames.iter().enumerate() {
            let mut transform = match frame.parent {
                Some(parent) => self.globals[parent.0] * frame.offset,
                None => frame.offset,
            };
            for (k, dof) in frame.joint.dofs.iter().enumerate() {
                let i = frame.dof_range.start + k;
                self.dof_axes[i] = DofAxis {
                    kind: dof.kind,
                    origin: Point3::from(transform.translation.vector),
                    axis: transform.rotation * dof.axis_vector(),
                };
                transform *= dof.motion(self.state[i]);
            }
            self.globals[idx] = transform;
        }
        self.stale = false;
    }

    fn ensure_fresh(&self) -> Result<()> {
        if self.stale {
            Err(ModelError::StaleKinematics)
        } else {
            Ok(())
        }
    }

    pub fn global_transform(&self, frame: FrameId) -> Result<&Isometry3<f64>> {
        self.frame(frame)?;
        self.ensure_fresh()?;
        Ok(&self.globals[frame.0])
    }

    /// World-space motion axes of all coordinates, indexed like the state vector.
    pub fn dof_axes(&self) -> Result<&[DofAxis]> {
        self.ensure_fresh()?;
        Ok(&self.dof_axes)
    }

    /// World position of a point given in `frame`'s local coordinates.
    pub fn global_marker_position(
        &self,
        frame: FrameId,
        local: &Vector3<f64>,
    ) -> Result<Point3<f64>> {
        Ok(self.global_transform(frame)? * Point3::from(*local))
    }

    /// Local coordinates in `frame` of the world point `world`.
    pub fn local_coordinates_for(
        &self,
        frame: FrameId,
        world: &Point3<f64>,
    ) -> Result<Vector3<f64>> {
        Ok(self
            .global_transform(frame)?
            .inverse_transform_point(world)
            .coords)
    }

    // ----- markers and visuals -----

    /// Every correspondence in arena order.
    pub fn correspondences(&self) -> impl Iterator<Item = (FrameId, &MarkerCorrespondence)> {
        self.frames
            .iter()
            .enumerate()
            .flat_map(|(i, f)| f.markers.iter().map(move |m| (FrameId(i), m)))
    }

    pub fn marker_world_position(&self, frame: FrameId, marker: &str) -> Result<Point3<f64>> {
        let f = self.frame(frame)?;
        let m = f.marker(marker).ok_or_else(|| ModelError::UnknownMarker {
            frame: f.name.clone(),
            marker: marker.to_string(),
        })?;
        self.global_marker_position(frame, &m.local)
    }

    /// World positions of all correspondences, in [`correspondences`](Self::correspondences) order.
    pub fn marker_world_positions(&self) -> Result<Vec<(FrameId, &str, Point3<f64>)>> {
        self.ensure_fresh()?;
        Ok(self
            .correspondences()
            .map(|(id, m)| {
                (
                    id,
                    m.name.as_str(),
                    self.globals[id.0] * Point3::from(m.local),
                )
            })
            .collect())
    }

    /// World transforms of the frame's visual primitives (translated to their centers).
    pub fn visual_world_transforms(&self, frame: FrameId) -> Result<Vec<Isometry3<f64>>> {
        let global = self.global_transform(frame)?;
        Ok(self.frames[frame.0]
            .visuals
            .iter()
            .map(|v| global * Translation3::new(v.center[0], v.center[1], v.center[2]))
            .collect())
    }

    /// Attach `marker` to `frame` so that it sits at `world` in the current pose.
    /// Replaces an existing marker of the same name on that frame.
    pub fn assign_marker(
        &mut self,
        frame: FrameId,
        marker: &str,
        world: &Point3<f64>,
    ) -> Result<Vector3<f64>> {
        let local = self.local_coordinates_for(frame, world)?;
        self.frame_mut(frame)?.upsert_marker(marker, local);
        log::debug!(
            "assigned marker '{}' to frame '{}' at local {:?}",
            marker,
            self.frames[frame.0].name,
            local
        );
        Ok(local)
    }

    /// Attach `marker` to `frame` at an explicit local offset.
    pub fn set_marker_offset(
        &mut self,
        frame: FrameId,
        marker: &str,
        local: Vector3<f64>,
    ) -> Result<()> {
        self.frame_mut(frame)?.upsert_marker(marker, local);
        Ok(())
    }

    pub fn remove_marker(&mut self, frame: FrameId, marker: &str) -> Result<MarkerCorrespondence> {
        let f = self.frame_mut(frame)?;
        match f.markers.iter().position(|m| m.name == marker) {
            Some(i) => Ok(f.markers.remove(i)),
            None => Err(ModelError::UnknownMarker {
                frame: f.name.clone(),
                marker: marker.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ModelBuilder;
    use crate::joint::Joint;
    use approx::assert_abs_diff_eq;

    fn chain() -> (KinematicModel, FrameId) {
        let mut b = ModelBuilder::new("root", Joint::translation_xyz()).unwrap();
        let child = b
            .add_frame("child", FrameId::ROOT, Joint::rotation_zyx())
            .unwrap();
        b.add_marker(child, "TIP", Vector3::new(0.0, 0.0, 1.0))
            .unwrap();
        (b.build().unwrap(), child)
    }

    #[test]
    fn state_writes_mark_kinematics_stale() {
        let (mut model, child) = chain();
        assert!(!model.is_stale());
        model.set_state_value(0, 1.0).unwrap();
        assert_eq!(
            model.global_transform(child).unwrap_err(),
            ModelError::StaleKinematics
        );
        model.forward_kinematics();
        let p = model.marker_world_position(child, "TIP").unwrap();
        assert_abs_diff_eq!(p, Point3::new(1.0, 0.0, 1.0), epsilon = 1e-12);
    }

    #[test]
    fn rejected_writes_leave_state_untouched() {
        let (mut model, _) = chain();
        model
            .set_state_and_update(&[1.0, 2.0, 3.0, 0.1, 0.2, 0.3])
            .unwrap();
        let before = model.state().to_vec();

        assert!(matches!(
            model.set_state_value(6, 0.0),
            Err(ModelError::StateIndexOutOfRange { index: 6, len: 6 })
        ));
        assert!(matches!(
            model.set_state(&[0.0; 5]),
            Err(ModelError::StateLengthMismatch { .. })
        ));
        assert!(matches!(
            model.set_state_value(2, f64::NAN),
            Err(ModelError::NonFiniteValue { .. })
        ));
        assert_eq!(model.state(), before.as_slice());
        assert!(!model.is_stale());
    }

    #[test]
    fn dof_ownership_queries() {
        let (model, child) = chain();
        assert!(model.is_dof_of_frame(2, FrameId::ROOT).unwrap());
        assert!(!model.is_dof_of_frame(3, FrameId::ROOT).unwrap());
        assert!(model.is_dof_of_frame(3, child).unwrap());
        assert!(model.is_dof_of_frame(6, child).is_err());
        assert!(model.is_in_subtree(FrameId::ROOT, child));
        assert!(!model.is_in_subtree(child, FrameId::ROOT));
    }

    #[test]
    fn dof_axes_give_point_velocities() {
        let (mut model, child) = chain();
        model
            .set_state_and_update(&[1.0, 0.0, 0.0, 0.0, 0.0, 0.0])
            .unwrap();
        let tip = model.marker_world_position(child, "TIP").unwrap();
        let axes = model.dof_axes().unwrap();
        // Translation columns are the axes themselves.
        assert_abs_diff_eq!(axes[0].point_velocity(&tip), Vector3::x(), epsilon = 1e-12);
        // Rotating about y swings the tip towards +x.
        assert_abs_diff_eq!(axes[4].point_velocity(&tip), Vector3::x(), epsilon = 1e-12);
        // Rotating about z leaves a point on the z axis in place.
        assert_abs_diff_eq!(axes[3].point_velocity(&tip), Vector3::zeros(), epsilon = 1e-12);
    }

    #[test]
    fn assign_then_remove_marker() {
        let (mut model, child) = chain();
        model
            .set_state_and_update(&[0.0, 0.0, 0.0, 0.0, std::f64::consts::FRAC_PI_2, 0.0])
            .unwrap();
        let local = model
            .assign_marker(child, "LAT", &Point3::new(0.0, 0.0, -2.0))
            .unwrap();
        assert_abs_diff_eq!(local, Vector3::new(2.0, 0.0, 0.0), epsilon = 1e-12);

        model
            .assign_marker(child, "LAT", &Point3::new(0.0, 0.0, -3.0))
            .unwrap();
        let frame = model.frame(child).unwrap();
        assert_eq!(frame.markers().iter().filter(|m| m.name == "LAT").count(), 1);

        let removed = model.remove_marker(child, "LAT").unwrap();
        assert_abs_diff_eq!(removed.local, Vector3::new(3.0, 0.0, 0.0), epsilon = 1e-12);
        assert!(model.remove_marker(child, "LAT").is_err());
    }
}
