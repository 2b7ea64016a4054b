//! Marker residuals and their derivatives with respect to the state vector.

use std::ops::Range;

use nalgebra::{DMatrix, DVector, Point3};
use puppeteer_model_core::KinematicModel;

use crate::error::{FitError, Result};
use crate::target::FitTarget;

/// Current world positions of the target markers.
pub fn marker_positions(model: &KinematicModel, targets: &[FitTarget]) -> Result<Vec<Point3<f64>>> {
    targets
        .iter()
        .map(|t| {
            model
                .global_marker_position(t.frame, &t.local)
                .map_err(FitError::from)
        })
        .collect()
}

/// Stacked `position - target` errors, three rows per target.
pub fn residuals(model: &KinematicModel, targets: &[FitTarget]) -> Result<DVector<f64>> {
    let mut r = DVector::zeros(3 * targets.len());
    for (i, t) in targets.iter().enumerate() {
        let p = model.global_marker_position(t.frame, &t.local)?;
        let e = p - t.target;
        r.fixed_rows_mut::<3>(3 * i).copy_from(&e);
    }
    Ok(r)
}

/// Squared residual norm.
pub fn cost(model: &KinematicModel, targets: &[FitTarget]) -> Result<f64> {
    Ok(residuals(model, targets)?.norm_squared())
}

/// Jacobian columns for the coordinates in `columns`, from the cached
/// world-space DOF axes. Markers outside a coordinate's subtree get zeros.
pub fn analytic_jacobian(
    model: &KinematicModel,
    targets: &[FitTarget],
    columns: Range<usize>,
) -> Result<DMatrix<f64>> {
    let axes = model.dof_axes()?;
    let points = marker_positions(model, targets)?;
    let mut jac = DMatrix::zeros(3 * targets.len(), columns.len());
    for (c, k) in columns.enumerate() {
        let owner = model.frame_of_dof(k)?;
        for (i, (t, p)) in targets.iter().zip(points.iter()).enumerate() {
            if model.is_in_subtree(owner, t.frame) {
                let v = axes[k].point_velocity(p);
                jac.fixed_view_mut::<3, 1>(3 * i, c).copy_from(&v);
            }
        }
    }
    Ok(jac)
}

/// Central-difference Jacobian over the full state. `work` is perturbed in
/// place and left at its original state with fresh kinematics.
pub fn numeric_jacobian(
    work: &mut KinematicModel,
    targets: &[FitTarget],
    step: f64,
) -> Result<DMatrix<f64>> {
    let q = work.state().to_vec();
    let mut jac = DMatrix::zeros(3 * targets.len(), q.len());
    let mut probe = q.clone();
    for k in 0..q.len() {
        probe[k] = q[k] + step;
        work.set_state_and_update(&probe)?;
        let forward = residuals(work, targets)?;
        probe[k] = q[k] - step;
        work.set_state_and_update(&probe)?;
        let backward = residuals(work, targets)?;
        probe[k] = q[k];
        jac.set_column(k, &((forward - backward) / (2.0 * step)));
    }
    work.set_state_and_update(&q)?;
    Ok(jac)
}
