//! Limit engagement, hysteresis, impulse scatter and checkpoint replay on
//! full couplings.

use approx::assert_relative_eq;
use nalgebra::{Isometry3, Vector3};
use rbc_coupling::kinds::{Hinge, RotationSense, Spherical, SphericalLimit};
use rbc_coupling::{CoordinateRange, CouplingKind, RigidBodyCoupling};
use rbc_spatial::Twist;
use std::f64::consts::{FRAC_PI_2, FRAC_PI_3, FRAC_PI_4};

fn limited_hinge() -> RigidBodyCoupling {
    RigidBodyCoupling::new(CouplingKind::Hinge(Hinge::new(
        CoordinateRange::new(-FRAC_PI_3, FRAC_PI_3).unwrap(),
        RotationSense::Positive,
    )))
    .unwrap()
}

fn drive(coupling: &mut RigidBodyCoupling, tfd: &Isometry3<f64>, vel: &Twist) {
    let tgd = coupling.project_to_constraints(tfd, None);
    coupling.update_constraints(&tgd, tfd, vel, true);
}

#[test]
fn test_inside_range_stays_disengaged() {
    let mut c = limited_hinge();
    drive(
        &mut c,
        &Isometry3::rotation(Vector3::new(0.0, 0.0, 0.1)),
        &Twist::zero(),
    );
    let slot = c.constraint(5).unwrap();
    assert_eq!(slot.engaged(), 0);
    assert_eq!(c.num_unilaterals(), 0);
    // Disengaged distance is the gap to the nearer bound.
    assert_relative_eq!(slot.distance(), FRAC_PI_3 - 0.1, epsilon = 1e-12);
    // Only the five bilaterals reach the solver.
    let rows = c.solver_constraints(&Isometry3::identity(), &Isometry3::identity());
    assert_eq!(rows.len(), 5);
}

#[test]
fn test_upper_limit_engages_with_negative_distance() {
    let mut c = limited_hinge();
    drive(
        &mut c,
        &Isometry3::rotation(Vector3::new(0.0, 0.0, FRAC_PI_2)),
        &Twist::zero(),
    );
    let slot = c.constraint(5).unwrap();
    assert_eq!(slot.engaged(), 1);
    assert_relative_eq!(slot.distance(), FRAC_PI_3 - FRAC_PI_2, epsilon = 1e-12);
    // Engaged upper limit pushes the coordinate back down.
    assert_relative_eq!(
        slot.wrench().m,
        Vector3::new(0.0, 0.0, -1.0),
        epsilon = 1e-12
    );
    assert_eq!(c.num_unilaterals(), 1);
    let rows = c.solver_constraints(&Isometry3::identity(), &Isometry3::identity());
    assert_eq!(rows.len(), 6);
}

#[test]
fn test_lower_limit_engages_with_positive_wrench() {
    let mut c = limited_hinge();
    drive(
        &mut c,
        &Isometry3::rotation(Vector3::new(0.0, 0.0, -FRAC_PI_2)),
        &Twist::zero(),
    );
    let slot = c.constraint(5).unwrap();
    assert_eq!(slot.engaged(), -1);
    assert_relative_eq!(slot.distance(), FRAC_PI_3 - FRAC_PI_2, epsilon = 1e-12);
    assert_relative_eq!(
        slot.wrench().m,
        Vector3::new(0.0, 0.0, 1.0),
        epsilon = 1e-12
    );
}

#[test]
fn test_release_needs_speed_and_acceleration() {
    let mut c = limited_hinge();
    c.set_break_speed(0.1);
    c.set_break_accel(0.05);
    let past_limit = Isometry3::rotation(Vector3::new(0.0, 0.0, FRAC_PI_2));
    drive(&mut c, &past_limit, &Twist::zero());
    assert_eq!(c.constraint(5).unwrap().engaged(), 1);

    // Separating fast, but the solver has not reported any separating
    // acceleration yet: the limit must hold.
    let separating = Twist::new(Vector3::zeros(), Vector3::new(0.0, 0.0, -1.0));
    drive(&mut c, &past_limit, &separating);
    let slot = c.constraint(5).unwrap();
    assert!(slot.contact_speed() > 0.1);
    assert_eq!(slot.engaged(), 1);

    // With a reported separating acceleration the limit releases.
    c.set_contact_accel(5, 0.5).unwrap();
    drive(&mut c, &past_limit, &separating);
    assert_eq!(c.constraint(5).unwrap().engaged(), 0);
}

#[test]
fn test_slow_separation_never_releases() {
    let mut c = limited_hinge();
    c.set_break_speed(0.5);
    c.set_break_accel(0.05);
    let past_limit = Isometry3::rotation(Vector3::new(0.0, 0.0, FRAC_PI_2));
    drive(&mut c, &past_limit, &Twist::zero());
    c.set_contact_accel(5, 1.0).unwrap();
    // Acceleration alone is not enough below the break speed.
    let creeping = Twist::new(Vector3::zeros(), Vector3::new(0.0, 0.0, -0.2));
    drive(&mut c, &past_limit, &creeping);
    assert_eq!(c.constraint(5).unwrap().engaged(), 1);
}

#[test]
fn test_unilateral_impulse_scatter() {
    let mut c = limited_hinge();
    let past_limit = Isometry3::rotation(Vector3::new(0.0, 0.0, FRAC_PI_2));
    drive(&mut c, &past_limit, &Twist::zero());
    assert_eq!(c.num_unilaterals(), 1);

    let next = c.set_unilateral_impulses(&[0.02], 0.01, 0).unwrap();
    assert_eq!(next, 1);
    // Multiplier 2.0 along the engaged (flipped) wrench.
    assert_relative_eq!(
        c.unilateral_force_f().m,
        Vector3::new(0.0, 0.0, -2.0),
        epsilon = 1e-12
    );
    assert_relative_eq!(c.constraint(5).unwrap().multiplier(), 2.0, epsilon = 1e-12);

    // A disengaged coupling consumes nothing.
    let mut idle = limited_hinge();
    drive(&mut idle, &Isometry3::identity(), &Twist::zero());
    assert_eq!(idle.set_unilateral_impulses(&[], 0.01, 0).unwrap(), 0);
}

#[test]
fn test_contact_distance_engages_early() {
    let mut c = limited_hinge();
    c.set_contact_distance(0.05);
    // Just inside the bound but within the contact distance.
    drive(
        &mut c,
        &Isometry3::rotation(Vector3::new(0.0, 0.0, FRAC_PI_3 - 0.02)),
        &Twist::zero(),
    );
    assert_eq!(c.constraint(5).unwrap().engaged(), 1);
    assert_relative_eq!(c.constraint(5).unwrap().distance(), 0.02, epsilon = 1e-10);
}

#[test]
fn test_checkpoint_replay_preserves_engagement() {
    let mut c = limited_hinge();
    let past_limit = Isometry3::rotation(Vector3::new(0.0, 0.0, FRAC_PI_2));
    drive(&mut c, &past_limit, &Twist::zero());
    let mut state = vec![0.0; c.state_size()];
    c.write_state(&mut state).unwrap();

    let mut replay = limited_hinge();
    replay.read_state(&state).unwrap();
    // Replaying with update_engaged off must keep the restored engagement
    // even though the replayed pose alone would not change it.
    let tgd = replay.project_to_constraints(&past_limit, None);
    replay.update_constraints(&tgd, &past_limit, &Twist::zero(), false);
    assert_eq!(replay.constraint(5).unwrap().engaged(), 1);
    assert_relative_eq!(
        replay.constraint(5).unwrap().distance(),
        FRAC_PI_3 - FRAC_PI_2,
        epsilon = 1e-12
    );
}

#[test]
fn test_tilt_cone_policy_engagement() {
    let mut c = RigidBodyCoupling::new(CouplingKind::Spherical(Spherical::new(
        SphericalLimit::TiltCone {
            max_tilt: FRAC_PI_4,
        },
    )))
    .unwrap();
    // Inside the cone.
    drive(
        &mut c,
        &Isometry3::rotation(Vector3::new(0.2, 0.0, 0.0)),
        &Twist::zero(),
    );
    assert_eq!(c.constraint(3).unwrap().engaged(), 0);

    // Past the cone: engaged, violated by 0.1.
    drive(
        &mut c,
        &Isometry3::rotation(Vector3::new(FRAC_PI_4 + 0.1, 0.0, 0.0)),
        &Twist::zero(),
    );
    let slot = c.constraint(3).unwrap();
    assert_eq!(slot.engaged(), 1);
    assert_relative_eq!(slot.distance(), -0.1, epsilon = 1e-10);
}
