//! End-to-end scenarios driven through the [`Engine`] interface.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use approx::assert_relative_eq;
use rbd_physics::prelude::*;

const DT: f64 = 1.0 / 60.0;
const GRAVITY: Vector3<f64> = Vector3::new(0.0, -10.0, 0.0);

/// Ground slab whose top face sits at y = 0.
fn add_ground(engine: &mut Engine, world: WorldHandle) {
    let shape = engine.create_box_shape(100.0, 1.0, 100.0).unwrap();
    engine
        .create_body(world, 0.0, Point3::new(0.0, -0.5, 0.0), shape)
        .unwrap();
}

#[test]
fn dropped_cube_settles_at_half_height() {
    let mut engine = Engine::new();
    let world = engine.create_world(GRAVITY).unwrap();
    add_ground(&mut engine, world);

    let cube_shape = engine.create_box_shape(1.0, 1.0, 1.0).unwrap();
    let cube = engine
        .create_body(world, 1.0, Point3::new(0.0, 5.0, 0.0), cube_shape)
        .unwrap();

    for _ in 0..120 {
        engine.step(world, DT).unwrap();
    }

    let (position, _) = engine.body_transform(world, cube).unwrap();
    let (linear, _) = engine.body_velocity(world, cube).unwrap();

    assert!(
        (position.y - 0.5).abs() < 0.05,
        "cube should rest at half height, got y = {}",
        position.y
    );
    assert!(
        linear.y.abs() < 0.1,
        "vertical velocity should be near zero, got {}",
        linear.y
    );
}

#[test]
fn free_fall_velocity_matches_gravity() {
    let mut engine = Engine::new();
    let world = engine.create_world(GRAVITY).unwrap();

    let shape = engine.create_sphere_shape(0.5).unwrap();
    let ball = engine
        .create_body(world, 1.0, Point3::new(0.0, 100.0, 0.0), shape)
        .unwrap();

    for _ in 0..60 {
        engine.step(world, DT).unwrap();
    }

    // Semi-implicit Euler integrates velocity exactly: v = g t.
    let (linear, _) = engine.body_velocity(world, ball).unwrap();
    assert_relative_eq!(linear.y, -10.0, epsilon = 1e-9);
}

#[test]
fn static_bodies_never_move() {
    let mut engine = Engine::new();
    let world = engine.create_world(GRAVITY).unwrap();

    let shape = engine.create_box_shape(2.0, 2.0, 2.0).unwrap();
    let wall = engine
        .create_body(world, 0.0, Point3::new(3.0, 1.0, 0.0), shape)
        .unwrap();

    // A dynamic box dropped straight onto the wall.
    let cube_shape = engine.create_box_shape(1.0, 1.0, 1.0).unwrap();
    engine
        .create_body(world, 1.0, Point3::new(3.0, 4.0, 0.0), cube_shape)
        .unwrap();

    for _ in 0..240 {
        engine.step(world, DT).unwrap();
    }

    let (position, rotation) = engine.body_transform(world, wall).unwrap();
    let (linear, angular) = engine.body_velocity(world, wall).unwrap();
    assert_eq!(position, Point3::new(3.0, 1.0, 0.0));
    assert_eq!(rotation, UnitQuaternion::identity());
    assert_eq!(linear, Vector3::zeros());
    assert_eq!(angular, Vector3::zeros());
}

#[test]
fn zero_timestep_changes_nothing() {
    let mut engine = Engine::new();
    let world = engine.create_world(GRAVITY).unwrap();
    add_ground(&mut engine, world);

    let shape = engine.create_sphere_shape(0.5).unwrap();
    let ball = engine
        .create_body(world, 1.0, Point3::new(0.0, 2.0, 0.0), shape)
        .unwrap();

    for _ in 0..30 {
        engine.step(world, DT).unwrap();
    }
    let (before_pos, before_rot) = engine.body_transform(world, ball).unwrap();
    let (before_lin, before_ang) = engine.body_velocity(world, ball).unwrap();

    engine.step(world, 0.0).unwrap();

    let (after_pos, after_rot) = engine.body_transform(world, ball).unwrap();
    let (after_lin, after_ang) = engine.body_velocity(world, ball).unwrap();
    assert_eq!(before_pos, after_pos);
    assert_eq!(before_rot, after_rot);
    assert_eq!(before_lin, after_lin);
    assert_eq!(before_ang, after_ang);
}

#[test]
fn invalid_timestep_is_rejected_without_side_effects() {
    let mut engine = Engine::new();
    let world = engine.create_world(GRAVITY).unwrap();

    let shape = engine.create_sphere_shape(0.5).unwrap();
    let ball = engine
        .create_body(world, 1.0, Point3::new(0.0, 2.0, 0.0), shape)
        .unwrap();

    for bad in [f64::NAN, f64::INFINITY, -DT] {
        let err = engine.step(world, bad).unwrap_err();
        assert!(matches!(err, PhysicsError::InvalidTimestep(_)));
    }

    let (position, _) = engine.body_transform(world, ball).unwrap();
    let (linear, _) = engine.body_velocity(world, ball).unwrap();
    assert_eq!(position, Point3::new(0.0, 2.0, 0.0));
    assert_eq!(linear, Vector3::zeros());
}

#[test]
fn identical_setups_evolve_identically() {
    fn run() -> (Point3<f64>, UnitQuaternion<f64>, Vector3<f64>, Vector3<f64>) {
        let mut engine = Engine::new();
        let world = engine.create_world(GRAVITY).unwrap();
        add_ground(&mut engine, world);

        let cube_shape = engine.create_box_shape(1.0, 1.0, 1.0).unwrap();
        let sphere_shape = engine.create_sphere_shape(0.5).unwrap();
        let cube = engine
            .create_body(world, 1.0, Point3::new(0.0, 3.0, 0.0), cube_shape)
            .unwrap();
        engine
            .create_body(world, 2.0, Point3::new(0.25, 6.0, 0.1), sphere_shape)
            .unwrap();

        for _ in 0..120 {
            engine.step(world, DT).unwrap();
        }

        let (position, rotation) = engine.body_transform(world, cube).unwrap();
        let (linear, angular) = engine.body_velocity(world, cube).unwrap();
        (position, rotation, linear, angular)
    }

    let a = run();
    let b = run();
    // Bitwise equality: the pipeline iterates in insertion order only.
    assert_eq!(a.0, b.0);
    assert_eq!(a.1, b.1);
    assert_eq!(a.2, b.2);
    assert_eq!(a.3, b.3);
}

#[test]
fn resting_cube_stays_at_rest() {
    let mut engine = Engine::new();
    let world = engine.create_world(GRAVITY).unwrap();
    add_ground(&mut engine, world);

    let shape = engine.create_box_shape(1.0, 1.0, 1.0).unwrap();
    let cube = engine
        .create_body(world, 1.0, Point3::new(0.0, 0.5, 0.0), shape)
        .unwrap();

    for _ in 0..300 {
        engine.step(world, DT).unwrap();
    }

    let (position, _) = engine.body_transform(world, cube).unwrap();
    let (linear, angular) = engine.body_velocity(world, cube).unwrap();
    assert!(
        (position.y - 0.5).abs() < 0.02,
        "resting cube drifted to y = {}",
        position.y
    );
    assert!(linear.norm() < 0.05, "residual linear speed {}", linear.norm());
    assert!(angular.norm() < 0.05, "residual spin {}", angular.norm());
}

#[test]
fn stacked_spheres_separate_along_gravity() {
    let mut engine = Engine::new();
    let world = engine.create_world(GRAVITY).unwrap();
    add_ground(&mut engine, world);

    let shape = engine.create_sphere_shape(0.5).unwrap();
    let lower = engine
        .create_body(world, 1.0, Point3::new(0.0, 0.5, 0.0), shape)
        .unwrap();
    let upper = engine
        .create_body(world, 1.0, Point3::new(0.0, 1.45, 0.0), shape)
        .unwrap();

    for _ in 0..240 {
        engine.step(world, DT).unwrap();
    }

    let (lower_pos, _) = engine.body_transform(world, lower).unwrap();
    let (upper_pos, _) = engine.body_transform(world, upper).unwrap();
    assert!(
        upper_pos.y - lower_pos.y > 0.9,
        "spheres should stack, got {} over {}",
        upper_pos.y,
        lower_pos.y
    );
    assert!((lower_pos.y - 0.5).abs() < 0.05);
}

#[test]
fn removed_body_stops_colliding() {
    let mut engine = Engine::new();
    let world = engine.create_world(GRAVITY).unwrap();
    add_ground(&mut engine, world);

    // A blocker hovering as a static shelf, with a ball above it.
    let shelf_shape = engine.create_box_shape(4.0, 0.5, 4.0).unwrap();
    let shelf = engine
        .create_body(world, 0.0, Point3::new(0.0, 2.0, 0.0), shelf_shape)
        .unwrap();
    let ball_shape = engine.create_sphere_shape(0.5).unwrap();
    let ball = engine
        .create_body(world, 1.0, Point3::new(0.0, 4.0, 0.0), ball_shape)
        .unwrap();

    for _ in 0..180 {
        engine.step(world, DT).unwrap();
    }
    let (resting, _) = engine.body_transform(world, ball).unwrap();
    assert!(resting.y > 2.0, "ball should rest on the shelf, got {}", resting.y);

    engine.remove_body(world, shelf).unwrap();
    for _ in 0..240 {
        engine.step(world, DT).unwrap();
    }

    let (fallen, _) = engine.body_transform(world, ball).unwrap();
    assert!(
        (fallen.y - 0.5).abs() < 0.05,
        "ball should fall to the ground, got {}",
        fallen.y
    );
}
