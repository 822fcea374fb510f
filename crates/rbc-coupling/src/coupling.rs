//! The coupling engine: projection, constraint refresh, engagement, impulse
//! scatter, and checkpointing for one joint.

use nalgebra::Isometry3;
use rbc_spatial::{Twist, Wrench};
use tracing::debug;

use crate::kinds::{clear_constraints, CouplingKind, UpdateCtx};
use crate::{ConstraintInfo, Coordinate, CouplingError, Result, RigidBodyConstraint};

/// A joint coupling between two rigid bodies.
///
/// The coupling is built once from a [`CouplingKind`] and then driven per
/// step: project the input pose onto the constraint manifold, refresh the
/// constraint directions, hand them to an external solver, and scatter the
/// solved impulses back. All poses, twists and wrenches are expressed in the
/// coupling's home frame D.
#[derive(Debug)]
pub struct RigidBodyCoupling {
    kind: CouplingKind,
    coordinates: Vec<Coordinate>,
    /// Current coordinate values, kept in sync with `coordinates`.
    values: Vec<f64>,
    /// Bilaterals first, then one range-limit slot per coordinate, then
    /// policy slots. Allocated once.
    constraints: Vec<ConstraintInfo>,
    num_bilaterals: usize,
    contact_distance: f64,
    break_speed: f64,
    break_accel: f64,
    bilateral_force: Wrench,
    unilateral_force: Wrench,
}

impl RigidBodyCoupling {
    /// Build a coupling from a joint kind. Rejects invalid kind parameters
    /// and coordinate ranges; all constraint storage is allocated here.
    pub fn new(kind: CouplingKind) -> Result<Self> {
        kind.kinematics().validate()?;
        let layout = kind.kinematics().layout();

        let num_bilaterals = layout.bilaterals.len();
        let mut constraints: Vec<ConstraintInfo> = layout
            .bilaterals
            .iter()
            .map(|m| ConstraintInfo::new(true, *m, None))
            .collect();

        let mut coordinates = Vec::with_capacity(layout.coordinates.len());
        for (i, decl) in layout.coordinates.iter().enumerate() {
            // Ranges come validated from the kind, but a kind assembling one
            // from raw parts is still caught here.
            if decl.range.min() > decl.range.max() {
                return Err(CouplingError::InvalidRange {
                    min: decl.range.min(),
                    max: decl.range.max(),
                });
            }
            let slot = num_bilaterals + i;
            coordinates.push(Coordinate::new(decl.name, decl.range, decl.motion, Some(slot)));
            constraints.push(ConstraintInfo::new(false, decl.motion, Some(i)));
        }
        for m in &layout.policy_slots {
            constraints.push(ConstraintInfo::new(false, *m, None));
        }

        let values = vec![0.0; coordinates.len()];
        Ok(Self {
            kind,
            coordinates,
            values,
            constraints,
            num_bilaterals,
            contact_distance: 0.0,
            break_speed: 0.0,
            break_accel: 0.0,
            bilateral_force: Wrench::zero(),
            unilateral_force: Wrench::zero(),
        })
    }

    // -- projection and coordinates --------------------------------------

    /// Project an arbitrary input pose onto the constraint manifold,
    /// updating the stored coordinate values (rotary coordinates track the
    /// branch nearest their previous value). Returns the projected pose; the
    /// new coordinate values are also copied into `coords_out` when given.
    pub fn project_to_constraints(
        &mut self,
        tfd: &Isometry3<f64>,
        coords_out: Option<&mut Vec<f64>>,
    ) -> Isometry3<f64> {
        let prev = self.values.clone();
        let mut raw = vec![0.0; prev.len()];
        let tgd = self.kind.kinematics().project(tfd, &prev, &mut raw);
        for (i, r) in raw.iter().enumerate() {
            self.coordinates[i].update_value(*r);
            self.values[i] = self.coordinates[i].value();
        }
        if let Some(buf) = coords_out {
            buf.clear();
            buf.extend_from_slice(&self.values);
        }
        tgd
    }

    /// Exact pose for a coordinate vector.
    #[must_use]
    pub fn coordinates_to_tcd(&self, coords: &[f64]) -> Isometry3<f64> {
        self.kind.kinematics().coords_to_tcd(coords)
    }

    /// Extract coordinates from an on-manifold pose, resolving branches
    /// toward the current values. Does not modify the coupling.
    #[must_use]
    pub fn tcd_to_coordinates(&self, tcd: &Isometry3<f64>) -> Vec<f64> {
        let mut out = vec![0.0; self.values.len()];
        self.kind.kinematics().tcd_to_coords(tcd, &self.values, &mut out);
        out
    }

    /// Twist of the projected frame per unit rate of coordinate `index`, at
    /// the current coordinate values.
    #[must_use]
    pub fn coordinate_twist(&self, index: usize) -> Option<Twist> {
        if index >= self.values.len() {
            return None;
        }
        Some(self.kind.kinematics().coordinate_twist(index, &self.values))
    }

    // -- constraint refresh ----------------------------------------------

    /// Refresh every constraint direction for the current step.
    ///
    /// `tgd` is the projected pose from [`Self::project_to_constraints`],
    /// `tfd` the raw input pose, and `vel` the relative velocity of the
    /// coupled bodies in frame D. With `update_engaged` set, unilateral
    /// directions run their engagement state machine; otherwise their
    /// engagement is left as is (used when replaying a checkpoint).
    pub fn update_constraints(
        &mut self,
        tgd: &Isometry3<f64>,
        tfd: &Isometry3<f64>,
        vel: &Twist,
        update_engaged: bool,
    ) {
        let err = Twist::from_isometry(&(tfd * tgd.inverse()));

        clear_constraints(&mut self.constraints);
        {
            let mut ctx = UpdateCtx {
                tgd,
                err: &err,
                vel,
                coords: &self.values,
                constraints: &mut self.constraints,
            };
            self.kind.kinematics().update_constraints(&mut ctx);
        }

        for c in &mut self.constraints[..self.num_bilaterals] {
            c.distance = c.wrench.dot(&err);
            c.contact_speed = c.wrench.dot(vel) + c.dot_wrench.dot(&err);
        }

        for idx in self.num_bilaterals..self.constraints.len() {
            let c = &mut self.constraints[idx];
            if let Some(ci) = c.coordinate {
                let theta = self.values[ci];
                let range = self.coordinates[ci].range();
                let lower_gap = theta - range.min();
                let upper_gap = range.max() - theta;
                // The kind writes the positive-direction dual each refresh.
                let rate = c.wrench.dot(vel);

                if update_engaged && c.engaged == 0 {
                    if lower_gap <= self.contact_distance && lower_gap <= upper_gap {
                        c.engaged = -1;
                        debug!(constraint = idx, coordinate = ci, "lower limit engaged");
                    } else if upper_gap <= self.contact_distance {
                        c.engaged = 1;
                        debug!(constraint = idx, coordinate = ci, "upper limit engaged");
                    }
                }

                match c.engaged {
                    1 => {
                        // Flip so a positive multiplier pushes back inside.
                        c.wrench = -c.wrench;
                        c.dot_wrench = -c.dot_wrench;
                        c.distance = upper_gap;
                        c.contact_speed = -rate;
                    }
                    -1 => {
                        c.distance = lower_gap;
                        c.contact_speed = rate;
                    }
                    _ => {
                        c.distance = lower_gap.min(upper_gap);
                        c.contact_speed = if upper_gap < lower_gap { -rate } else { rate };
                    }
                }
            } else {
                // Policy slot: the kind supplied wrench and distance in the
                // engaged direction.
                c.contact_speed = c.wrench.dot(vel);
                if update_engaged && c.engaged == 0 && c.distance <= self.contact_distance {
                    c.engaged = 1;
                    debug!(constraint = idx, "limit policy engaged");
                }
            }

            if update_engaged
                && c.engaged != 0
                && c.contact_speed > self.break_speed
                && c.contact_accel > self.break_accel
            {
                c.engaged = 0;
                debug!(constraint = idx, speed = c.contact_speed, "limit released");
            }
        }
    }

    // -- introspection ----------------------------------------------------

    /// The joint kind this coupling was built from.
    #[must_use]
    pub fn kind(&self) -> &CouplingKind {
        &self.kind
    }

    /// Number of coordinates.
    #[must_use]
    pub fn num_coordinates(&self) -> usize {
        self.coordinates.len()
    }

    /// Coordinate `index`, if it exists.
    #[must_use]
    pub fn coordinate(&self, index: usize) -> Option<&Coordinate> {
        self.coordinates.get(index)
    }

    /// Number of bilateral constraint directions.
    #[must_use]
    pub fn num_bilaterals(&self) -> usize {
        self.num_bilaterals
    }

    /// Number of potential unilateral directions (engaged or not).
    #[must_use]
    pub fn max_unilaterals(&self) -> usize {
        self.constraints.len() - self.num_bilaterals
    }

    /// Number of currently engaged unilateral directions.
    #[must_use]
    pub fn num_unilaterals(&self) -> usize {
        self.constraints[self.num_bilaterals..]
            .iter()
            .filter(|c| c.engaged != 0)
            .count()
    }

    /// Total constraint slots (bilaterals plus potential unilaterals).
    #[must_use]
    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Constraint slot `index`, if it exists. Bilaterals come first.
    #[must_use]
    pub fn constraint(&self, index: usize) -> Option<&ConstraintInfo> {
        self.constraints.get(index)
    }

    /// Solver-facing records for every active direction (all bilaterals and
    /// the engaged unilaterals), with wrenches expressed in both body
    /// frames. `tca` / `tcb` are the poses of the coupling frame in bodies
    /// A and B.
    #[must_use]
    pub fn solver_constraints(
        &self,
        tca: &Isometry3<f64>,
        tcb: &Isometry3<f64>,
    ) -> Vec<RigidBodyConstraint> {
        self.constraints
            .iter()
            .filter(|c| c.bilateral || c.engaged != 0)
            .map(|c| RigidBodyConstraint::from_info(c, tca, tcb))
            .collect()
    }

    // -- engagement tuning -------------------------------------------------

    /// Separation at or below which a disengaged limit engages.
    pub fn set_contact_distance(&mut self, distance: f64) {
        self.contact_distance = distance;
    }

    /// Separation speed a limit must exceed before it may release.
    pub fn set_break_speed(&mut self, speed: f64) {
        self.break_speed = speed;
    }

    /// Separation acceleration a limit must exceed before it may release.
    pub fn set_break_accel(&mut self, accel: f64) {
        self.break_accel = accel;
    }

    /// Write back the solver's separation acceleration for slot `index`.
    /// Until this is called the stored acceleration stays at zero, which
    /// keeps engaged limits from releasing spuriously.
    pub fn set_contact_accel(&mut self, index: usize, accel: f64) -> Result<()> {
        let n = self.constraints.len();
        let c = self
            .constraints
            .get_mut(index)
            .ok_or(CouplingError::ConstraintCountMismatch {
                expected: index + 1,
                offset: index,
                actual: n,
            })?;
        c.contact_accel = accel;
        Ok(())
    }

    /// Set compliance and damping for constraint slot `index`.
    pub fn set_compliance(&mut self, index: usize, compliance: f64, damping: f64) -> Result<()> {
        let n = self.constraints.len();
        let c = self
            .constraints
            .get_mut(index)
            .ok_or(CouplingError::ConstraintCountMismatch {
                expected: index + 1,
                offset: index,
                actual: n,
            })?;
        c.compliance = compliance;
        c.damping = damping;
        Ok(())
    }

    // -- impulse scatter ---------------------------------------------------

    /// Scatter solved impulses into the bilateral directions, starting at
    /// `offset` in `impulses`. Each multiplier is `impulse / h`; the
    /// resulting wrenches accumulate into the bilateral force. Returns the
    /// offset just past the consumed entries.
    pub fn set_bilateral_impulses(
        &mut self,
        impulses: &[f64],
        h: f64,
        offset: usize,
    ) -> Result<usize> {
        let needed = self.num_bilaterals;
        if impulses.len().saturating_sub(offset) < needed {
            return Err(CouplingError::ConstraintCountMismatch {
                expected: needed,
                offset,
                actual: impulses.len(),
            });
        }
        for (i, c) in self.constraints[..needed].iter_mut().enumerate() {
            let multiplier = impulses[offset + i] / h;
            c.multiplier = multiplier;
            self.bilateral_force = self.bilateral_force.scaled_add(multiplier, &c.wrench);
        }
        Ok(offset + needed)
    }

    /// Scatter solved impulses into the engaged unilateral directions, in
    /// slot order, starting at `offset`. Disengaged slots consume nothing.
    /// Returns the offset just past the consumed entries.
    pub fn set_unilateral_impulses(
        &mut self,
        impulses: &[f64],
        h: f64,
        offset: usize,
    ) -> Result<usize> {
        let needed = self.num_unilaterals();
        if impulses.len().saturating_sub(offset) < needed {
            return Err(CouplingError::ConstraintCountMismatch {
                expected: needed,
                offset,
                actual: impulses.len(),
            });
        }
        let mut at = offset;
        for c in self.constraints[self.num_bilaterals..].iter_mut() {
            if c.engaged == 0 {
                continue;
            }
            let multiplier = impulses[at] / h;
            c.multiplier = multiplier;
            self.unilateral_force = self.unilateral_force.scaled_add(multiplier, &c.wrench);
            at += 1;
        }
        Ok(at)
    }

    /// Accumulated bilateral constraint wrench, in frame D.
    #[must_use]
    pub fn bilateral_force_f(&self) -> Wrench {
        self.bilateral_force
    }

    /// Accumulated unilateral constraint wrench, in frame D.
    #[must_use]
    pub fn unilateral_force_f(&self) -> Wrench {
        self.unilateral_force
    }

    /// Reset accumulated forces and multipliers (start of a solve).
    pub fn zero_forces(&mut self) {
        self.bilateral_force = Wrench::zero();
        self.unilateral_force = Wrench::zero();
        for c in &mut self.constraints {
            c.multiplier = 0.0;
        }
    }

    // -- checkpointing -----------------------------------------------------

    /// Length of the checkpoint buffer: two values per potential unilateral
    /// direction. Bilateral state is recomputed, never persisted.
    #[must_use]
    pub fn state_size(&self) -> usize {
        2 * self.max_unilaterals()
    }

    /// Serialize engagement flags and owning-coordinate values, one
    /// `(engaged, value)` pair per unilateral slot in declaration order.
    pub fn write_state(&self, out: &mut [f64]) -> Result<()> {
        if out.len() != self.state_size() {
            return Err(CouplingError::StateSizeMismatch {
                expected: self.state_size(),
                actual: out.len(),
            });
        }
        for (k, c) in self.constraints[self.num_bilaterals..].iter().enumerate() {
            out[2 * k] = f64::from(c.engaged);
            out[2 * k + 1] = c.coordinate.map_or(0.0, |ci| self.values[ci]);
        }
        Ok(())
    }

    /// Restore a checkpoint written by [`Self::write_state`].
    pub fn read_state(&mut self, data: &[f64]) -> Result<()> {
        if data.len() != self.state_size() {
            return Err(CouplingError::StateSizeMismatch {
                expected: self.state_size(),
                actual: data.len(),
            });
        }
        let nb = self.num_bilaterals;
        for k in 0..self.max_unilaterals() {
            let engaged = data[2 * k];
            let c = &mut self.constraints[nb + k];
            c.engaged = if engaged > 0.5 {
                1
            } else if engaged < -0.5 {
                -1
            } else {
                0
            };
            if let Some(ci) = c.coordinate {
                self.coordinates[ci].set_value(data[2 * k + 1]);
                self.values[ci] = data[2 * k + 1];
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::kinds::{Hinge, RotationSense, Solid};
    use crate::CoordinateRange;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;
    use std::f64::consts::FRAC_PI_3;

    fn hinge() -> RigidBodyCoupling {
        RigidBodyCoupling::new(CouplingKind::Hinge(Hinge::new(
            CoordinateRange::new(-FRAC_PI_3, FRAC_PI_3).unwrap(),
            RotationSense::Positive,
        )))
        .unwrap()
    }

    #[test]
    fn test_layout_counts() {
        let c = hinge();
        assert_eq!(c.num_coordinates(), 1);
        assert_eq!(c.num_bilaterals(), 5);
        assert_eq!(c.max_unilaterals(), 1);
        assert_eq!(c.num_unilaterals(), 0);
        assert_eq!(c.state_size(), 2);
        assert_eq!(c.coordinate(0).unwrap().limit_constraint(), Some(5));
    }

    #[test]
    fn test_projection_updates_coordinate() {
        let mut c = hinge();
        let tfd = Isometry3::rotation(Vector3::new(0.0, 0.0, 0.4));
        let mut coords = Vec::new();
        let tgd = c.project_to_constraints(&tfd, Some(&mut coords));
        assert_relative_eq!(coords[0], 0.4, epsilon = 1e-12);
        assert_relative_eq!(tgd.rotation.angle_to(&tfd.rotation), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_bilateral_distance_measures_error() {
        let mut c = hinge();
        // Slide the input frame off-axis: the x-force direction sees it.
        let tfd = Isometry3::translation(0.02, 0.0, 0.0);
        let tgd = c.project_to_constraints(&tfd, None);
        c.update_constraints(&tgd, &tfd, &Twist::zero(), true);
        assert_relative_eq!(c.constraint(0).unwrap().distance(), 0.02, epsilon = 1e-12);
        for i in 1..5 {
            assert_relative_eq!(c.constraint(i).unwrap().distance(), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_solid_has_no_freedom() {
        let c = RigidBodyCoupling::new(CouplingKind::Solid(Solid::new())).unwrap();
        assert_eq!(c.num_coordinates(), 0);
        assert_eq!(c.num_bilaterals(), 6);
        assert_eq!(c.state_size(), 0);
    }

    #[test]
    fn test_impulse_scatter_accumulates_force() {
        let mut c = hinge();
        let tfd = Isometry3::identity();
        let tgd = c.project_to_constraints(&tfd, None);
        c.update_constraints(&tgd, &tfd, &Twist::zero(), true);
        let next = c.set_bilateral_impulses(&[0.1, 0.0, 0.0, 0.0, 0.0], 0.01, 0).unwrap();
        assert_eq!(next, 5);
        // Impulse 0.1 over h = 0.01 on the x-force direction.
        assert_relative_eq!(
            c.bilateral_force_f().f,
            Vector3::new(10.0, 0.0, 0.0),
            epsilon = 1e-12
        );
        assert_relative_eq!(c.constraint(0).unwrap().multiplier(), 10.0, epsilon = 1e-12);
        c.zero_forces();
        assert_relative_eq!(c.bilateral_force_f().norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_short_impulse_slice_rejected() {
        let mut c = hinge();
        let err = c.set_bilateral_impulses(&[0.1, 0.2], 0.01, 0).unwrap_err();
        assert!(matches!(
            err,
            CouplingError::ConstraintCountMismatch {
                expected: 5,
                offset: 0,
                actual: 2,
            }
        ));
    }

    #[test]
    fn test_state_round_trip() {
        let mut c = hinge();
        let tfd = Isometry3::rotation(Vector3::new(0.0, 0.0, 1.5));
        let tgd = c.project_to_constraints(&tfd, None);
        c.update_constraints(&tgd, &tfd, &Twist::zero(), true);
        assert_eq!(c.constraint(5).unwrap().engaged(), 1);

        let mut state = vec![0.0; c.state_size()];
        c.write_state(&mut state).unwrap();
        assert_relative_eq!(state[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(state[1], 1.5, epsilon = 1e-12);

        let mut other = hinge();
        other.read_state(&state).unwrap();
        assert_eq!(other.constraint(5).unwrap().engaged(), 1);
        assert_relative_eq!(other.coordinate(0).unwrap().value(), 1.5, epsilon = 1e-12);

        assert!(other.read_state(&[0.0]).is_err());
    }
}
