//! Collision shape descriptions.
//!
//! Shapes are immutable once created and are shared between bodies behind an
//! [`Arc`](std::sync::Arc), so a hundred crates on a pallet reference one
//! box description instead of carrying a hundred copies.

use nalgebra::Vector3;

use crate::error::PhysicsError;
use crate::mass::MassProperties;
use crate::Result;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Geometric description of a collision shape, in body-local coordinates.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Shape {
    /// Sphere centered at the body origin.
    Sphere {
        /// Sphere radius, m.
        radius: f64,
    },
    /// Axis-aligned box centered at the body origin (in local frame).
    Box {
        /// Half-lengths along the local X, Y, Z axes, m.
        half_extents: Vector3<f64>,
    },
}

impl Shape {
    /// Create a sphere shape.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::InvalidArgument`] if the radius is not finite
    /// and positive.
    pub fn sphere(radius: f64) -> Result<Self> {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(PhysicsError::invalid_argument(format!(
                "sphere radius must be finite and positive, got {radius}"
            )));
        }
        Ok(Self::Sphere { radius })
    }

    /// Create a box shape from its half-extents.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::InvalidArgument`] if any half-extent is not
    /// finite and positive.
    pub fn cuboid(half_extents: Vector3<f64>) -> Result<Self> {
        if half_extents.iter().any(|h| !h.is_finite() || *h <= 0.0) {
            return Err(PhysicsError::invalid_argument(format!(
                "box half-extents must be finite and positive, got {half_extents:?}"
            )));
        }
        Ok(Self::Box { half_extents })
    }

    /// Create a box shape from its full edge lengths.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::InvalidArgument`] if any dimension is not
    /// finite and positive.
    pub fn cuboid_from_dimensions(width: f64, height: f64, depth: f64) -> Result<Self> {
        Self::cuboid(Vector3::new(width * 0.5, height * 0.5, depth * 0.5))
    }

    /// Radius of the smallest origin-centered sphere enclosing the shape.
    #[must_use]
    pub fn bounding_radius(&self) -> f64 {
        match self {
            Self::Sphere { radius } => *radius,
            Self::Box { half_extents } => half_extents.norm(),
        }
    }

    /// Mass properties for this shape at the given mass.
    ///
    /// A mass of zero yields static properties (zero inverse mass and
    /// inertia).
    #[must_use]
    pub fn mass_properties(&self, mass: f64) -> MassProperties {
        match self {
            Self::Sphere { radius } => MassProperties::sphere(mass, *radius),
            Self::Box { half_extents } => MassProperties::cuboid(mass, *half_extents),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sphere_rejects_bad_radius() {
        assert!(Shape::sphere(0.0).is_err());
        assert!(Shape::sphere(-1.0).is_err());
        assert!(Shape::sphere(f64::NAN).is_err());
        assert!(Shape::sphere(f64::INFINITY).is_err());
        assert!(Shape::sphere(0.5).is_ok());
    }

    #[test]
    fn test_cuboid_rejects_degenerate_extents() {
        assert!(Shape::cuboid(Vector3::new(1.0, 0.0, 1.0)).is_err());
        assert!(Shape::cuboid(Vector3::new(1.0, f64::NAN, 1.0)).is_err());
        assert!(Shape::cuboid(Vector3::new(0.5, 0.5, 0.5)).is_ok());
    }

    #[test]
    fn test_cuboid_from_dimensions_halves() {
        let shape = Shape::cuboid_from_dimensions(2.0, 4.0, 6.0).unwrap();
        match shape {
            Shape::Box { half_extents } => {
                assert_relative_eq!(half_extents, Vector3::new(1.0, 2.0, 3.0));
            }
            Shape::Sphere { .. } => panic!("expected box"),
        }
    }

    #[test]
    fn test_bounding_radius() {
        let sphere = Shape::sphere(2.0).unwrap();
        assert_relative_eq!(sphere.bounding_radius(), 2.0);

        let cube = Shape::cuboid(Vector3::new(1.0, 1.0, 1.0)).unwrap();
        assert_relative_eq!(cube.bounding_radius(), 3.0_f64.sqrt());
    }
}
