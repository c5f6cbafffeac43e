//! Velocity and pose integration.

use nalgebra::{UnitQuaternion, Vector3};
use rbd_types::{Pose, Velocity};

/// Integration scheme for one body over one timestep.
pub trait Integrator {
    /// Advance pose and velocity by `dt` under the given accelerations.
    fn integrate(
        pose: &mut Pose,
        velocity: &mut Velocity,
        linear_accel: Vector3<f64>,
        angular_accel: Vector3<f64>,
        dt: f64,
    );
}

/// Semi-implicit (symplectic) Euler.
///
/// Velocity is updated first and the *new* velocity moves the pose:
///
/// ```text
/// v' = v + a * dt
/// x' = x + v' * dt
/// ```
///
/// This makes free fall exact per step (`v = g * t` after `t / dt` steps)
/// and gives the scheme its long-term energy stability.
#[derive(Debug, Clone, Copy, Default)]
pub struct SemiImplicitEuler;

impl Integrator for SemiImplicitEuler {
    fn integrate(
        pose: &mut Pose,
        velocity: &mut Velocity,
        linear_accel: Vector3<f64>,
        angular_accel: Vector3<f64>,
        dt: f64,
    ) {
        velocity.linear += linear_accel * dt;
        velocity.angular += angular_accel * dt;

        pose.position += velocity.linear * dt;
        pose.rotation = integrate_rotation(&pose.rotation, &velocity.angular, dt);
    }
}

/// Rotate a quaternion by an angular velocity over `dt` using the
/// exponential map. Stays normalized by construction.
#[must_use]
pub fn integrate_rotation(
    rotation: &UnitQuaternion<f64>,
    omega: &Vector3<f64>,
    dt: f64,
) -> UnitQuaternion<f64> {
    let scaled = omega * dt;
    if scaled.norm() < 1e-10 {
        return *rotation;
    }
    UnitQuaternion::from_scaled_axis(scaled) * rotation
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    #[test]
    fn test_velocity_updates_before_position() {
        let mut pose = Pose::identity();
        let mut velocity = Velocity::zero();
        let gravity = Vector3::new(0.0, -10.0, 0.0);
        let dt = 0.1;

        SemiImplicitEuler::integrate(&mut pose, &mut velocity, gravity, Vector3::zeros(), dt);

        // Position moves by the NEW velocity: -1.0 * 0.1 = -0.1.
        assert_relative_eq!(velocity.linear.y, -1.0, epsilon = 1e-12);
        assert_relative_eq!(pose.position.y, -0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_free_fall_velocity_is_exact() {
        let mut pose = Pose::from_position(Point3::new(0.0, 100.0, 0.0));
        let mut velocity = Velocity::zero();
        let gravity = Vector3::new(0.0, -10.0, 0.0);
        let dt = 1.0 / 60.0;

        for _ in 0..120 {
            SemiImplicitEuler::integrate(&mut pose, &mut velocity, gravity, Vector3::zeros(), dt);
        }

        // v = g * t holds exactly: acceleration is constant per step.
        assert_relative_eq!(velocity.linear.y, -10.0 * 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rotation_about_z() {
        let mut pose = Pose::identity();
        let mut velocity = Velocity::new(
            Vector3::zeros(),
            Vector3::new(0.0, 0.0, std::f64::consts::FRAC_PI_2),
        );

        // Quarter turn per second for one second.
        for _ in 0..100 {
            SemiImplicitEuler::integrate(
                &mut pose,
                &mut velocity,
                Vector3::zeros(),
                Vector3::zeros(),
                0.01,
            );
        }

        let rotated = pose.rotation.transform_vector(&Vector3::x());
        assert_relative_eq!(rotated.y, 1.0, epsilon = 1e-9);
        assert_relative_eq!(rotated.x, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_tiny_rotation_is_identity() {
        let rotation = UnitQuaternion::identity();
        let result = integrate_rotation(&rotation, &Vector3::new(1e-12, 0.0, 0.0), 1e-3);
        assert_eq!(result, rotation);
    }

    #[test]
    fn test_quaternion_stays_normalized() {
        let mut rotation = UnitQuaternion::from_euler_angles(0.3, 0.4, 0.5);
        let omega = Vector3::new(3.0, -2.0, 5.0);
        for _ in 0..1000 {
            rotation = integrate_rotation(&rotation, &omega, 0.016);
        }
        assert_relative_eq!(rotation.norm(), 1.0, epsilon = 1e-9);
    }
}
