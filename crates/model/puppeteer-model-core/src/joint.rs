//! Joint templates: the fixed offset of a frame inside its parent plus the
//! ordered list of scalar degrees of freedom the frame contributes.

use nalgebra::{Isometry3, Quaternion, Translation3, Unit, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

const AXIS_EPSILON: f64 = 1e-12;

/// Whether a degree of freedom rotates about or slides along its axis.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DofKind {
    Rotation,
    Translation,
}

/// One scalar generalized coordinate. Angles are radians, translations are
/// model length units.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JointDof {
    pub kind: DofKind,
    /// Axis in the coordinates of the joint at this point of the DOF chain.
    pub axis: [f64; 3],
    /// Optional explicit variable name; defaults to `RX`/`TY`/... for principal axes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl JointDof {
    pub fn rotation(axis: [f64; 3]) -> Self {
        Self {
            kind: DofKind::Rotation,
            axis,
            name: None,
        }
    }

    pub fn translation(axis: [f64; 3]) -> Self {
        Self {
            kind: DofKind::Translation,
            axis,
            name: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[inline]
    pub fn axis_vector(&self) -> Vector3<f64> {
        Vector3::new(self.axis[0], self.axis[1], self.axis[2])
    }

    /// Rigid motion produced by setting this DOF to `q`. The axis must be unit length.
    #[inline]
    pub fn motion(&self, q: f64) -> Isometry3<f64> {
        let axis = self.axis_vector();
        match self.kind {
            DofKind::Rotation => Isometry3::from_parts(
                Translation3::identity(),
                UnitQuaternion::from_axis_angle(&Unit::new_unchecked(axis), q),
            ),
            DofKind::Translation => Isometry3::translation(axis.x * q, axis.y * q, axis.z * q),
        }
    }

    /// Variable label used when no explicit name was given.
    pub fn label(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        let prefix = match self.kind {
            DofKind::Rotation => 'R',
            DofKind::Translation => 'T',
        };
        let axis = self.axis_vector();
        let principal = [('X', Vector3::x()), ('Y', Vector3::y()), ('Z', Vector3::z())]
            .into_iter()
            .find(|(_, v)| (axis - v).norm() < 1e-9)
            .map(|(c, _)| c);
        match principal {
            Some(c) => format!("{prefix}{c}"),
            None => prefix.to_string(),
        }
    }
}

/// Local joint template of a frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Joint {
    /// Position of the joint in parent coordinates.
    #[serde(default)]
    pub origin: [f64; 3],
    /// Fixed orientation relative to the parent as a quaternion `[x, y, z, w]`.
    #[serde(default = "identity_orientation")]
    pub orientation: [f64; 4],
    #[serde(default)]
    pub dofs: Vec<JointDof>,
}

fn identity_orientation() -> [f64; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

impl Default for Joint {
    fn default() -> Self {
        Self::fixed()
    }
}

impl Joint {
    /// A joint with no degrees of freedom.
    pub fn fixed() -> Self {
        Self {
            origin: [0.0; 3],
            orientation: identity_orientation(),
            dofs: Vec::new(),
        }
    }

    pub fn with_dofs(dofs: Vec<JointDof>) -> Self {
        Self {
            dofs,
            ..Self::fixed()
        }
    }

    /// Free translation along x, y and z.
    pub fn translation_xyz() -> Self {
        Self::with_dofs(vec![
            JointDof::translation([1.0, 0.0, 0.0]),
            JointDof::translation([0.0, 1.0, 0.0]),
            JointDof::translation([0.0, 0.0, 1.0]),
        ])
    }

    /// Spherical joint parameterized as intrinsic z-y-x Euler angles.
    pub fn rotation_zyx() -> Self {
        Self::with_dofs(vec![
            JointDof::rotation([0.0, 0.0, 1.0]),
            JointDof::rotation([0.0, 1.0, 0.0]),
            JointDof::rotation([1.0, 0.0, 0.0]),
        ])
    }

    /// Six DOF floating base: translation followed by z-y-x rotation.
    pub fn floating() -> Self {
        let mut dofs = Self::translation_xyz().dofs;
        dofs.extend(Self::rotation_zyx().dofs);
        Self::with_dofs(dofs)
    }

    pub fn with_origin(mut self, origin: [f64; 3]) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_orientation(mut self, orientation: [f64; 4]) -> Self {
        self.orientation = orientation;
        self
    }

    #[inline]
    pub fn dof_count(&self) -> usize {
        self.dofs.len()
    }

    /// Fixed transform from parent coordinates to the joint, before any DOF motion.
    pub fn offset(&self) -> Isometry3<f64> {
        let [x, y, z, w] = self.orientation;
        Isometry3::from_parts(
            Translation3::new(self.origin[0], self.origin[1], self.origin[2]),
            UnitQuaternion::from_quaternion(Quaternion::new(w, x, y, z)),
        )
    }

    /// Check axes and orientation, normalizing them in place.
    pub(crate) fn normalize(&mut self, frame: &str) -> Result<()> {
        for (i, dof) in self.dofs.iter_mut().enumerate() {
            let axis = dof.axis_vector();
            let norm = axis.norm();
            if !norm.is_finite() || norm < AXIS_EPSILON {
                return Err(ModelError::DegenerateAxis {
                    frame: frame.to_string(),
                    dof: i,
                });
            }
            let unit = axis / norm;
            dof.axis = [unit.x, unit.y, unit.z];
        }
        let q = self.orientation;
        let len = (q[0] * q[0] + q[1] * q[1] + q[2] * q[2] + q[3] * q[3]).sqrt();
        self.orientation = if len.is_finite() && len > AXIS_EPSILON {
            [q[0] / len, q[1] / len, q[2] / len, q[3] / len]
        } else {
            identity_orientation()
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::Point3;

    #[test]
    fn labels_follow_kind_and_axis() {
        let joint = Joint::floating();
        let labels: Vec<String> = joint.dofs.iter().map(JointDof::label).collect();
        assert_eq!(labels, ["TX", "TY", "TZ", "RZ", "RY", "RX"]);
        assert_eq!(JointDof::rotation([1.0, 1.0, 0.0]).label(), "R");
        assert_eq!(
            JointDof::rotation([1.0, 0.0, 0.0]).named("flexion").label(),
            "flexion"
        );
    }

    #[test]
    fn rotation_motion_turns_about_axis() {
        let dof = JointDof::rotation([0.0, 1.0, 0.0]);
        let p = dof.motion(std::f64::consts::FRAC_PI_2) * Point3::new(0.0, 0.0, 1.0);
        assert_abs_diff_eq!(p, Point3::new(1.0, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn normalize_rejects_zero_axis_and_scales_others() {
        let mut joint = Joint::with_dofs(vec![JointDof::translation([0.0, 0.0, 2.0])]);
        joint.normalize("pelvis").unwrap();
        assert_eq!(joint.dofs[0].axis, [0.0, 0.0, 1.0]);

        let mut bad = Joint::with_dofs(vec![JointDof::rotation([0.0, 0.0, 0.0])]);
        assert_eq!(
            bad.normalize("pelvis"),
            Err(ModelError::DegenerateAxis {
                frame: "pelvis".into(),
                dof: 0
            })
        );
    }
}
