//! Axis-aligned bounding boxes.

use nalgebra::{Point3, Vector3};
use rbd_types::{Pose, Shape};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An axis-aligned bounding box (AABB) for broad-phase collision detection.
///
/// Degenerate boxes (zero extent on one or more axes, including point boxes
/// with `min == max`) are valid: overlap tests use inclusive comparisons, so
/// a degenerate proxy still reports contact with anything it touches.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Aabb {
    /// Minimum corner of the bounding box.
    pub min: Point3<f64>,
    /// Maximum corner of the bounding box.
    pub max: Point3<f64>,
}

impl Aabb {
    /// Create a new AABB from minimum and maximum corners.
    #[must_use]
    pub const fn new(min: Point3<f64>, max: Point3<f64>) -> Self {
        Self { min, max }
    }

    /// Create an AABB centered at a point with the given half-extents.
    #[must_use]
    pub fn from_center(center: Point3<f64>, half_extents: Vector3<f64>) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// World-space AABB of a shape at the given pose.
    #[must_use]
    pub fn of_shape(shape: &Shape, pose: &Pose) -> Self {
        let center = pose.position;
        match shape {
            Shape::Sphere { radius } => {
                Self::from_center(center, Vector3::new(*radius, *radius, *radius))
            }
            Shape::Box { half_extents } => {
                // World AABB of a rotated box: |R| * h on each axis.
                let rotation = pose.rotation.to_rotation_matrix();
                let m = rotation.matrix();
                let world_half = Vector3::new(
                    m[(0, 0)].abs() * half_extents.x
                        + m[(0, 1)].abs() * half_extents.y
                        + m[(0, 2)].abs() * half_extents.z,
                    m[(1, 0)].abs() * half_extents.x
                        + m[(1, 1)].abs() * half_extents.y
                        + m[(1, 2)].abs() * half_extents.z,
                    m[(2, 0)].abs() * half_extents.x
                        + m[(2, 1)].abs() * half_extents.y
                        + m[(2, 2)].abs() * half_extents.z,
                );
                Self::from_center(center, world_half)
            }
        }
    }

    /// Check if this AABB overlaps with another AABB.
    ///
    /// Touching boxes count as overlapping, so degenerate boxes are never
    /// missed.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Expand this AABB by a margin on all sides.
    #[must_use]
    pub fn expanded(&self, margin: f64) -> Self {
        Self {
            min: Point3::new(
                self.min.x - margin,
                self.min.y - margin,
                self.min.z - margin,
            ),
            max: Point3::new(
                self.max.x + margin,
                self.max.y + margin,
                self.max.z + margin,
            ),
        }
    }

    /// Get the extent (size) along a specific axis.
    #[must_use]
    pub fn extent(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.max.x - self.min.x,
            Axis::Y => self.max.y - self.min.y,
            Axis::Z => self.max.z - self.min.z,
        }
    }

    /// Get the minimum value along a specific axis.
    #[must_use]
    pub fn min_on_axis(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.min.x,
            Axis::Y => self.min.y,
            Axis::Z => self.min.z,
        }
    }

    /// Get the maximum value along a specific axis.
    #[must_use]
    pub fn max_on_axis(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.max.x,
            Axis::Y => self.max.y,
            Axis::Z => self.max.z,
        }
    }

    /// Center of the box.
    #[must_use]
    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::new(Point3::origin(), Point3::origin())
    }
}

/// Coordinate axis for sweep direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// X-axis.
    X,
    /// Y-axis.
    Y,
    /// Z-axis.
    Z,
}

impl Axis {
    /// Get all three axes.
    #[must_use]
    pub const fn all() -> [Self; 3] {
        [Self::X, Self::Y, Self::Z]
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use rbd_types::UnitQuaternion;

    #[test]
    fn test_aabb_overlaps() {
        let a = Aabb::from_center(Point3::origin(), Vector3::new(1.0, 1.0, 1.0));
        let b = Aabb::from_center(Point3::new(1.5, 0.0, 0.0), Vector3::new(1.0, 1.0, 1.0));
        let c = Aabb::from_center(Point3::new(5.0, 0.0, 0.0), Vector3::new(1.0, 1.0, 1.0));

        assert!(a.overlaps(&b), "a and b should overlap");
        assert!(b.overlaps(&a), "overlap should be symmetric");
        assert!(!a.overlaps(&c), "a and c should not overlap");
    }

    #[test]
    fn test_degenerate_aabb_overlap_is_inclusive() {
        // A point box touching the face of a unit box still overlaps.
        let point = Aabb::new(Point3::new(1.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0));
        let unit = Aabb::from_center(Point3::origin(), Vector3::new(1.0, 1.0, 1.0));

        assert!(point.overlaps(&unit));
        assert!(unit.overlaps(&point));
        assert!(point.overlaps(&point), "a point overlaps itself");
    }

    #[test]
    fn test_aabb_expanded() {
        let aabb = Aabb::from_center(Point3::origin(), Vector3::new(1.0, 1.0, 1.0));
        let expanded = aabb.expanded(0.5);

        assert_eq!(expanded.min.x, -1.5);
        assert_eq!(expanded.max.x, 1.5);
    }

    #[test]
    fn test_of_shape_sphere() {
        let shape = Shape::sphere(2.0).unwrap();
        let pose = Pose::from_position(Point3::new(5.0, 5.0, 5.0));
        let aabb = Aabb::of_shape(&shape, &pose);

        assert_eq!(aabb.min, Point3::new(3.0, 3.0, 3.0));
        assert_eq!(aabb.max, Point3::new(7.0, 7.0, 7.0));
    }

    #[test]
    fn test_of_shape_axis_aligned_box() {
        let shape = Shape::cuboid(Vector3::new(1.0, 2.0, 3.0)).unwrap();
        let aabb = Aabb::of_shape(&shape, &Pose::identity());

        assert_eq!(aabb.min, Point3::new(-1.0, -2.0, -3.0));
        assert_eq!(aabb.max, Point3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_of_shape_rotated_box_grows() {
        // A unit cube rotated 45 degrees about Z spans sqrt(2) on X and Y.
        let shape = Shape::cuboid(Vector3::new(0.5, 0.5, 0.5)).unwrap();
        let pose = Pose::new(
            Point3::origin(),
            UnitQuaternion::from_euler_angles(0.0, 0.0, std::f64::consts::FRAC_PI_4),
        );
        let aabb = Aabb::of_shape(&shape, &pose);

        let expected = std::f64::consts::FRAC_1_SQRT_2;
        assert!((aabb.max.x - expected).abs() < 1e-12);
        assert!((aabb.max.y - expected).abs() < 1e-12);
        assert!((aabb.max.z - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_axis_accessors() {
        let aabb = Aabb::new(Point3::new(0.0, 1.0, 2.0), Point3::new(3.0, 5.0, 7.0));
        assert_eq!(aabb.extent(Axis::X), 3.0);
        assert_eq!(aabb.extent(Axis::Y), 4.0);
        assert_eq!(aabb.extent(Axis::Z), 5.0);
        assert_eq!(aabb.min_on_axis(Axis::Y), 1.0);
        assert_eq!(aabb.max_on_axis(Axis::Z), 7.0);
    }
}
