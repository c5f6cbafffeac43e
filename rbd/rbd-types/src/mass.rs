//! Mass properties of rigid bodies.

use nalgebra::{Matrix3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Mass and rotational inertia of a rigid body.
///
/// A mass of zero marks a static body: both inverses are zero, so impulses
/// and integration leave it untouched while it still participates in
/// collision detection.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MassProperties {
    /// Body mass, kg. Zero for static bodies.
    pub mass: f64,
    /// Inverse mass, 1/kg. Zero for static bodies.
    pub inverse_mass: f64,
    /// Inertia tensor about the center of mass, body frame, kg·m².
    pub inertia: Matrix3<f64>,
    /// Inverse of the inertia tensor. Zero for static bodies.
    pub inverse_inertia: Matrix3<f64>,
}

impl MassProperties {
    /// Static (immovable) mass properties.
    #[must_use]
    pub fn static_body() -> Self {
        Self {
            mass: 0.0,
            inverse_mass: 0.0,
            inertia: Matrix3::zeros(),
            inverse_inertia: Matrix3::zeros(),
        }
    }

    /// Mass properties of a solid sphere: `I = 2/5 m r²` on the diagonal.
    ///
    /// A non-positive mass yields [`static_body`](Self::static_body).
    #[must_use]
    pub fn sphere(mass: f64, radius: f64) -> Self {
        if mass <= 0.0 {
            return Self::static_body();
        }
        let i = 0.4 * mass * radius * radius;
        Self::from_diagonal(mass, Vector3::new(i, i, i))
    }

    /// Mass properties of a solid box from its half-extents:
    /// `Ixx = 1/12 m ((2hy)² + (2hz)²)` and cyclic.
    ///
    /// A non-positive mass yields [`static_body`](Self::static_body).
    #[must_use]
    pub fn cuboid(mass: f64, half_extents: Vector3<f64>) -> Self {
        if mass <= 0.0 {
            return Self::static_body();
        }
        let x2 = 4.0 * half_extents.x * half_extents.x;
        let y2 = 4.0 * half_extents.y * half_extents.y;
        let z2 = 4.0 * half_extents.z * half_extents.z;
        let k = mass / 12.0;
        Self::from_diagonal(mass, Vector3::new(k * (y2 + z2), k * (x2 + z2), k * (x2 + y2)))
    }

    fn from_diagonal(mass: f64, diag: Vector3<f64>) -> Self {
        let inertia = Matrix3::from_diagonal(&diag);
        let inverse_inertia = Matrix3::from_diagonal(&Vector3::new(
            1.0 / diag.x,
            1.0 / diag.y,
            1.0 / diag.z,
        ));
        Self {
            mass,
            inverse_mass: 1.0 / mass,
            inertia,
            inverse_inertia,
        }
    }

    /// True if the body is immovable.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.inverse_mass == 0.0
    }

    /// True if all fields contain only finite values.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.mass.is_finite()
            && self.inverse_mass.is_finite()
            && self.inertia.iter().all(|v| v.is_finite())
            && self.inverse_inertia.iter().all(|v| v.is_finite())
    }
}

impl Default for MassProperties {
    fn default() -> Self {
        Self::static_body()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_static_has_zero_inverses() {
        let props = MassProperties::static_body();
        assert!(props.is_static());
        assert_eq!(props.inverse_mass, 0.0);
        assert_eq!(props.inverse_inertia, Matrix3::zeros());
    }

    #[test]
    fn test_sphere_inertia() {
        let props = MassProperties::sphere(2.0, 0.5);
        assert!(!props.is_static());
        assert_relative_eq!(props.inverse_mass, 0.5);
        // 2/5 * 2.0 * 0.25 = 0.2
        assert_relative_eq!(props.inertia[(0, 0)], 0.2);
        assert_relative_eq!(props.inverse_inertia[(0, 0)], 5.0);
    }

    #[test]
    fn test_cuboid_inertia() {
        // Unit cube (half-extents 0.5), mass 1: I = 1/12 * (1 + 1) = 1/6.
        let props = MassProperties::cuboid(1.0, Vector3::new(0.5, 0.5, 0.5));
        assert_relative_eq!(props.inertia[(0, 0)], 1.0 / 6.0, epsilon = 1e-12);
        assert_relative_eq!(props.inertia[(1, 1)], 1.0 / 6.0, epsilon = 1e-12);
        assert_relative_eq!(props.inertia[(2, 2)], 1.0 / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_mass_falls_back_to_static() {
        let props = MassProperties::sphere(0.0, 1.0);
        assert!(props.is_static());
        let props = MassProperties::cuboid(-1.0, Vector3::new(1.0, 1.0, 1.0));
        assert!(props.is_static());
    }
}
