//! Rigid bodies.

use std::sync::Arc;

use nalgebra::{Point3, Vector3};
use rbd_collide::Aabb;
use rbd_types::{MassProperties, Pose, Shape, Velocity};

/// A rigid body: pose, velocity, mass properties, and a shared collision
/// shape.
///
/// Bodies with zero mass are static: collision detection sees them, but the
/// solver and the integrator never move them.
#[derive(Debug, Clone)]
pub struct Body {
    /// World-space pose.
    pub pose: Pose,
    /// Linear and angular velocity.
    pub velocity: Velocity,
    /// Mass and inertia.
    pub mass: MassProperties,
    /// Collision shape, shared between bodies.
    pub shape: Arc<Shape>,
    /// Force accumulated for the next step, world frame.
    accumulated_force: Vector3<f64>,
    /// Torque accumulated for the next step, world frame.
    accumulated_torque: Vector3<f64>,
}

impl Body {
    /// Create a body at rest.
    #[must_use]
    pub fn new(pose: Pose, mass: MassProperties, shape: Arc<Shape>) -> Self {
        Self {
            pose,
            velocity: Velocity::zero(),
            mass,
            shape,
            accumulated_force: Vector3::zeros(),
            accumulated_torque: Vector3::zeros(),
        }
    }

    /// Create a static body.
    #[must_use]
    pub fn new_static(pose: Pose, shape: Arc<Shape>) -> Self {
        Self::new(pose, MassProperties::static_body(), shape)
    }

    /// Set the initial velocity.
    #[must_use]
    pub fn with_velocity(mut self, velocity: Velocity) -> Self {
        self.velocity = velocity;
        self
    }

    /// True if the body never moves.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.mass.is_static()
    }

    /// Accumulate a force through the center of mass.
    pub fn apply_force(&mut self, force: Vector3<f64>) {
        self.accumulated_force += force;
    }

    /// Accumulate a force at a world-space point, adding the induced torque
    /// `r x F` about the center of mass.
    pub fn apply_force_at_point(&mut self, force: Vector3<f64>, point: Point3<f64>) {
        self.accumulated_force += force;
        self.accumulated_torque += (point - self.pose.position).cross(&force);
    }

    /// Accumulate a pure torque.
    pub fn apply_torque(&mut self, torque: Vector3<f64>) {
        self.accumulated_torque += torque;
    }

    /// Force accumulated since the last step.
    #[must_use]
    pub fn accumulated_force(&self) -> Vector3<f64> {
        self.accumulated_force
    }

    /// Torque accumulated since the last step.
    #[must_use]
    pub fn accumulated_torque(&self) -> Vector3<f64> {
        self.accumulated_torque
    }

    /// Reset accumulated force and torque. Called at the end of each step.
    pub fn clear_forces(&mut self) {
        self.accumulated_force = Vector3::zeros();
        self.accumulated_torque = Vector3::zeros();
    }

    /// Current world-space bounding box.
    #[must_use]
    pub fn aabb(&self) -> Aabb {
        Aabb::of_shape(&self.shape, &self.pose)
    }

    /// Kinetic energy, translational plus rotational.
    #[must_use]
    pub fn kinetic_energy(&self) -> f64 {
        if self.is_static() {
            return 0.0;
        }
        let linear = 0.5 * self.mass.mass * self.velocity.linear.norm_squared();
        let angular = 0.5
            * self
                .velocity
                .angular
                .dot(&(self.mass.inertia * self.velocity.angular));
        linear + angular
    }

    /// True if pose and velocity contain only finite values.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.pose.is_finite() && self.velocity.is_finite()
    }
}
