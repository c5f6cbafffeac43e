//! Core types for rigid-body simulation.
//!
//! This crate provides the foundational types shared by the rbd engine:
//!
//! - [`Pose`] / [`Velocity`] - Position, orientation, and motion of rigid bodies
//! - [`MassProperties`] - Mass and inertia, with static bodies as zero inverses
//! - [`Shape`] - Immutable collision geometry (sphere, box)
//! - [`WorldConfig`] / [`SolverConfig`] - Gravity and solver settings
//! - [`WorldHandle`] / [`ShapeHandle`] / [`BodyHandle`] - Generational handles
//! - [`PhysicsError`] - The error taxonomy for every fallible operation
//!
//! # Design Philosophy
//!
//! These types are **pure data**. They have no broad phase, no solver, no
//! integration. They're the common language between the collision crate, the
//! solver crate, the world, and host code holding handles.
//!
//! # Example
//!
//! ```
//! use rbd_types::{Pose, Velocity};
//! use nalgebra::{Point3, Vector3};
//!
//! let pose = Pose::from_position(Point3::new(0.0, 5.0, 0.0));
//! let vel = Velocity::zero();
//!
//! assert_eq!(pose.position.y, 5.0);
//! assert!(vel.linear.norm() < 1e-10);
//! ```

#![doc(html_root_url = "https://docs.rs/rbd-types/0.1.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
// Allow certain clippy lints that are overly pedantic for type definitions
#![allow(
    clippy::missing_const_for_fn,     // Many methods can't be const due to nalgebra
    clippy::suboptimal_flops,          // mul_add style changes aren't always clearer
    clippy::missing_errors_doc,        // Error docs added where non-obvious
)]

mod config;
mod error;
mod handle;
mod mass;
mod pose;
mod shape;

pub use config::{SolverConfig, WorldConfig};
pub use error::PhysicsError;
pub use handle::{BodyHandle, ShapeHandle, WorldHandle};
pub use mass::MassProperties;
pub use pose::{Pose, Velocity};
pub use shape::Shape;

// Re-export math types for convenience
pub use nalgebra::{Matrix3, Point3, UnitQuaternion, Vector3};

/// Result type for physics operations.
pub type Result<T> = std::result::Result<T, PhysicsError>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_sharing() {
        use std::sync::Arc;

        let shape = Arc::new(Shape::sphere(0.5).unwrap());
        let a = Arc::clone(&shape);
        let b = Arc::clone(&shape);
        assert_eq!(a.bounding_radius(), b.bounding_radius());
        assert_eq!(Arc::strong_count(&shape), 3);
    }

    #[test]
    fn test_static_body_types_compose() {
        let props = MassProperties::static_body();
        let pose = Pose::from_position(Point3::new(1.0, 2.0, 3.0));
        assert!(props.is_static());
        assert!(pose.is_finite());
    }
}
