//! Narrow-phase contact generation.
//!
//! Given two shapes and their poses, [`compute_contacts`] produces the exact
//! contact set: world position, unit normal pointing from the first shape
//! toward the second, and penetration depth (positive when overlapping).
//! The output is a pure function of the inputs, so identical transforms
//! always produce identical contacts.
//!
//! Shape pairs are dispatched to analytic routines:
//!
//! - sphere/sphere: center distance against summed radii
//! - sphere/box: closest point on the oriented box
//! - box/box: separating-axis test over the 15 candidate axes, with contact
//!   points taken from the vertices of each box inside the other

use nalgebra::{Matrix3, Point3, Vector3};
use rbd_types::{Pose, Shape};

use crate::contact::{ContactPoint, MAX_MANIFOLD_POINTS};

/// Axes shorter than this are degenerate cross products and are skipped.
const AXIS_EPSILON: f64 = 1e-9;

/// Tangential tolerance when testing a vertex for containment in a box.
const CONTAIN_TOLERANCE: f64 = 1e-7;

/// Compute the contacts between two posed shapes.
///
/// Returns an empty vector when the shapes are separated or merely touching.
/// Normals point from shape `a` toward shape `b`. At most
/// [`MAX_MANIFOLD_POINTS`] points are returned, deepest first.
#[must_use]
pub fn compute_contacts(
    shape_a: &Shape,
    pose_a: &Pose,
    shape_b: &Shape,
    pose_b: &Pose,
) -> Vec<ContactPoint> {
    match (shape_a, shape_b) {
        (Shape::Sphere { radius: ra }, Shape::Sphere { radius: rb }) => {
            sphere_sphere(*ra, pose_a, *rb, pose_b)
        }
        (Shape::Sphere { radius }, Shape::Box { half_extents }) => {
            sphere_box(*radius, pose_a, *half_extents, pose_b)
        }
        (Shape::Box { half_extents }, Shape::Sphere { radius }) => {
            sphere_box(*radius, pose_b, *half_extents, pose_a)
                .into_iter()
                .map(ContactPoint::flipped)
                .collect()
        }
        (Shape::Box { half_extents: ha }, Shape::Box { half_extents: hb }) => {
            box_box(*ha, pose_a, *hb, pose_b)
        }
    }
}

fn sphere_sphere(ra: f64, pose_a: &Pose, rb: f64, pose_b: &Pose) -> Vec<ContactPoint> {
    let delta = pose_b.position - pose_a.position;
    let sum = ra + rb;
    let dist_sq = delta.norm_squared();
    if dist_sq >= sum * sum {
        return Vec::new();
    }

    let dist = dist_sq.sqrt();
    // Concentric spheres have no preferred direction; pick a fixed one so
    // the result stays deterministic.
    let normal = if dist > AXIS_EPSILON {
        delta / dist
    } else {
        Vector3::y()
    };
    let penetration = sum - dist;
    let position = pose_a.position + normal * (ra - penetration * 0.5);

    vec![ContactPoint::new(
        position,
        normal,
        penetration,
        pose_a.inverse_transform_point(&position),
        pose_b.inverse_transform_point(&position),
    )]
}

/// Sphere (first body) against oriented box (second body).
fn sphere_box(
    radius: f64,
    pose_sphere: &Pose,
    half_extents: Vector3<f64>,
    pose_box: &Pose,
) -> Vec<ContactPoint> {
    let local = pose_box.inverse_transform_point(&pose_sphere.position);
    let clamped = Point3::new(
        local.x.clamp(-half_extents.x, half_extents.x),
        local.y.clamp(-half_extents.y, half_extents.y),
        local.z.clamp(-half_extents.z, half_extents.z),
    );

    let delta = local - clamped;
    let dist_sq = delta.norm_squared();

    let (outward_local, penetration, surface_local) = if dist_sq > AXIS_EPSILON * AXIS_EPSILON {
        // Sphere center outside the box: closest-point case.
        if dist_sq >= radius * radius {
            return Vec::new();
        }
        let dist = dist_sq.sqrt();
        (delta / dist, radius - dist, clamped)
    } else {
        // Center inside the box: push out through the nearest face.
        let depths = [
            half_extents.x - local.x.abs(),
            half_extents.y - local.y.abs(),
            half_extents.z - local.z.abs(),
        ];
        let mut k = 0;
        for i in 1..3 {
            if depths[i] < depths[k] {
                k = i;
            }
        }
        let sign = if local[k] >= 0.0 { 1.0 } else { -1.0 };
        let mut outward = Vector3::zeros();
        outward[k] = sign;
        let mut surface = local;
        surface[k] = sign * half_extents[k];
        (outward, radius + depths[k], surface)
    };

    // `outward_local` points from the box toward the sphere; the contact
    // normal points from the sphere (first body) toward the box.
    let normal = -pose_box.transform_vector(&outward_local);
    let position = pose_box.transform_point(&surface_local);

    vec![ContactPoint::new(
        position,
        normal,
        penetration,
        pose_sphere.inverse_transform_point(&position),
        pose_box.inverse_transform_point(&position),
    )]
}

/// Extent of a box projected onto a world-space axis.
fn projected_extent(half_extents: Vector3<f64>, rotation: &Matrix3<f64>, axis: &Vector3<f64>) -> f64 {
    half_extents.x * rotation.column(0).dot(axis).abs()
        + half_extents.y * rotation.column(1).dot(axis).abs()
        + half_extents.z * rotation.column(2).dot(axis).abs()
}

/// The eight corners of a box, in a fixed order.
fn box_vertices(half_extents: Vector3<f64>, pose: &Pose) -> [Point3<f64>; 8] {
    let mut vertices = [Point3::origin(); 8];
    let mut i = 0;
    for &sx in &[-1.0, 1.0] {
        for &sy in &[-1.0, 1.0] {
            for &sz in &[-1.0, 1.0] {
                vertices[i] = pose.transform_point(&Point3::new(
                    sx * half_extents.x,
                    sy * half_extents.y,
                    sz * half_extents.z,
                ));
                i += 1;
            }
        }
    }
    vertices
}

fn contains(half_extents: Vector3<f64>, pose: &Pose, point: &Point3<f64>) -> bool {
    let local = pose.inverse_transform_point(point);
    local.x.abs() <= half_extents.x + CONTAIN_TOLERANCE
        && local.y.abs() <= half_extents.y + CONTAIN_TOLERANCE
        && local.z.abs() <= half_extents.z + CONTAIN_TOLERANCE
}

#[allow(clippy::too_many_lines)]
fn box_box(
    ha: Vector3<f64>,
    pose_a: &Pose,
    hb: Vector3<f64>,
    pose_b: &Pose,
) -> Vec<ContactPoint> {
    let rot_a = *pose_a.rotation.to_rotation_matrix().matrix();
    let rot_b = *pose_b.rotation.to_rotation_matrix().matrix();
    let t = pose_b.position - pose_a.position;

    // Candidate separating axes: 3 face normals each, 9 edge cross products.
    let mut axes: Vec<(Vector3<f64>, bool)> = Vec::with_capacity(15);
    for k in 0..3 {
        axes.push((rot_a.column(k).into_owned(), true));
    }
    for k in 0..3 {
        axes.push((rot_b.column(k).into_owned(), true));
    }
    for i in 0..3 {
        for j in 0..3 {
            let cross = rot_a.column(i).cross(&rot_b.column(j));
            axes.push((cross, false));
        }
    }

    let mut best_axis = Vector3::zeros();
    let mut best_overlap = f64::INFINITY;
    for (axis, is_face) in axes {
        let length = axis.norm();
        if length < AXIS_EPSILON {
            // Near-parallel edges; the face axes already cover this direction.
            continue;
        }
        let axis = axis / length;

        let ea = projected_extent(ha, &rot_a, &axis);
        let eb = projected_extent(hb, &rot_b, &axis);
        let overlap = ea + eb - t.dot(&axis).abs();
        if overlap < 0.0 {
            return Vec::new();
        }

        // Edge axes must beat the best face axis decisively, so resting
        // face contact keeps a face normal even under rounding noise.
        let margin = if is_face { 0.0 } else { AXIS_EPSILON };
        if overlap + margin < best_overlap {
            best_overlap = overlap;
            best_axis = axis;
        }
    }

    // Orient the normal from a toward b.
    let normal = if t.dot(&best_axis) < 0.0 {
        -best_axis
    } else {
        best_axis
    };

    let mut points = Vec::new();

    // Vertices of a penetrating b, measured against b's near plane along n.
    let eb = projected_extent(hb, &rot_b, &normal);
    let plane_b = pose_b.position.coords.dot(&normal) - eb;
    for vertex in box_vertices(ha, pose_a) {
        if contains(hb, pose_b, &vertex) {
            let depth = vertex.coords.dot(&normal) - plane_b;
            if depth > 0.0 {
                points.push(ContactPoint::new(
                    vertex,
                    normal,
                    depth,
                    pose_a.inverse_transform_point(&vertex),
                    pose_b.inverse_transform_point(&vertex),
                ));
            }
        }
    }

    // Vertices of b penetrating a, measured against a's far plane along n.
    let ea = projected_extent(ha, &rot_a, &normal);
    let plane_a = pose_a.position.coords.dot(&normal) + ea;
    for vertex in box_vertices(hb, pose_b) {
        if contains(ha, pose_a, &vertex) {
            let depth = plane_a - vertex.coords.dot(&normal);
            if depth > 0.0 {
                points.push(ContactPoint::new(
                    vertex,
                    normal,
                    depth,
                    pose_a.inverse_transform_point(&vertex),
                    pose_b.inverse_transform_point(&vertex),
                ));
            }
        }
    }

    // Pure edge-edge overlap leaves no vertex inside either box; fall back
    // to a single point between the two support points.
    if points.is_empty() && best_overlap > 0.0 {
        let support_a = support_point(ha, pose_a, &rot_a, &normal);
        let support_b = support_point(hb, pose_b, &rot_b, &-normal);
        let position = nalgebra::center(&support_a, &support_b);
        points.push(ContactPoint::new(
            position,
            normal,
            best_overlap,
            pose_a.inverse_transform_point(&position),
            pose_b.inverse_transform_point(&position),
        ));
    }

    points.sort_by(|a, b| {
        b.penetration
            .partial_cmp(&a.penetration)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    points.truncate(MAX_MANIFOLD_POINTS);
    points
}

/// Corner of a box farthest along a world-space direction.
fn support_point(
    half_extents: Vector3<f64>,
    pose: &Pose,
    rotation: &Matrix3<f64>,
    direction: &Vector3<f64>,
) -> Point3<f64> {
    let mut local = Vector3::zeros();
    for k in 0..3 {
        let sign = if rotation.column(k).dot(direction) >= 0.0 {
            1.0
        } else {
            -1.0
        };
        local[k] = sign * half_extents[k];
    }
    pose.transform_point(&Point3::from(local))
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rbd_types::UnitQuaternion;

    fn sphere(radius: f64) -> Shape {
        Shape::sphere(radius).unwrap()
    }

    fn cuboid(hx: f64, hy: f64, hz: f64) -> Shape {
        Shape::cuboid(Vector3::new(hx, hy, hz)).unwrap()
    }

    fn at(x: f64, y: f64, z: f64) -> Pose {
        Pose::from_position(Point3::new(x, y, z))
    }

    #[test]
    fn test_sphere_sphere_overlap() {
        let contacts = compute_contacts(&sphere(1.0), &at(0.0, 0.0, 0.0), &sphere(1.0), &at(1.5, 0.0, 0.0));

        assert_eq!(contacts.len(), 1);
        let c = &contacts[0];
        assert_relative_eq!(c.penetration, 0.5, epsilon = 1e-12);
        assert_relative_eq!(c.normal, Vector3::x(), epsilon = 1e-12);
        assert_relative_eq!(c.position.x, 0.75, epsilon = 1e-12);
    }

    #[test]
    fn test_sphere_sphere_separated() {
        let contacts = compute_contacts(&sphere(1.0), &at(0.0, 0.0, 0.0), &sphere(1.0), &at(2.5, 0.0, 0.0));
        assert!(contacts.is_empty());
    }

    #[test]
    fn test_sphere_sphere_touching_is_not_contact() {
        let contacts = compute_contacts(&sphere(1.0), &at(0.0, 0.0, 0.0), &sphere(1.0), &at(2.0, 0.0, 0.0));
        assert!(contacts.is_empty(), "zero penetration is not an overlap");
    }

    #[test]
    fn test_sphere_sphere_concentric_fallback() {
        let contacts = compute_contacts(&sphere(1.0), &at(0.0, 0.0, 0.0), &sphere(0.5), &at(0.0, 0.0, 0.0));
        assert_eq!(contacts.len(), 1);
        assert_relative_eq!(contacts[0].normal, Vector3::y(), epsilon = 1e-12);
        assert_relative_eq!(contacts[0].penetration, 1.5, epsilon = 1e-12);
    }

    #[test]
    fn test_sphere_above_box() {
        // Sphere of radius 0.5 hovering 0.4 above a unit box: 0.1 deep.
        let contacts = compute_contacts(
            &sphere(0.5),
            &at(0.0, 0.9, 0.0),
            &cuboid(0.5, 0.5, 0.5),
            &at(0.0, 0.0, 0.0),
        );

        assert_eq!(contacts.len(), 1);
        let c = &contacts[0];
        assert_relative_eq!(c.penetration, 0.1, epsilon = 1e-12);
        // Sphere is the first body; normal points down into the box.
        assert_relative_eq!(c.normal, -Vector3::y(), epsilon = 1e-12);
        assert_relative_eq!(c.position.y, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_box_sphere_flips_normal() {
        let contacts = compute_contacts(
            &cuboid(0.5, 0.5, 0.5),
            &at(0.0, 0.0, 0.0),
            &sphere(0.5),
            &at(0.0, 0.9, 0.0),
        );

        assert_eq!(contacts.len(), 1);
        // Box is the first body; normal points up toward the sphere.
        assert_relative_eq!(contacts[0].normal, Vector3::y(), epsilon = 1e-12);
        assert_relative_eq!(contacts[0].penetration, 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_sphere_center_inside_box() {
        let contacts = compute_contacts(
            &sphere(0.25),
            &at(0.0, 0.4, 0.0),
            &cuboid(0.5, 0.5, 0.5),
            &at(0.0, 0.0, 0.0),
        );

        assert_eq!(contacts.len(), 1);
        let c = &contacts[0];
        // Nearest face is +Y: depth = radius + (0.5 - 0.4).
        assert_relative_eq!(c.normal, -Vector3::y(), epsilon = 1e-12);
        assert_relative_eq!(c.penetration, 0.35, epsilon = 1e-12);
    }

    #[test]
    fn test_box_box_resting_face_contact() {
        // Unit cube 0.02 deep into a broad ground slab.
        let ground = cuboid(50.0, 0.5, 50.0);
        let cube = cuboid(0.5, 0.5, 0.5);
        let contacts = compute_contacts(&cube, &at(0.0, 0.98, 0.0), &ground, &at(0.0, 0.0, 0.0));

        assert_eq!(contacts.len(), 4, "face contact should produce 4 corners");
        for c in &contacts {
            assert_relative_eq!(c.normal, -Vector3::y(), epsilon = 1e-12);
            assert_relative_eq!(c.penetration, 0.02, epsilon = 1e-12);
            assert_relative_eq!(c.position.y, 0.48, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_box_box_separated() {
        let a = cuboid(0.5, 0.5, 0.5);
        let contacts = compute_contacts(&a, &at(0.0, 0.0, 0.0), &a, &at(3.0, 0.0, 0.0));
        assert!(contacts.is_empty());
    }

    #[test]
    fn test_box_box_rotated_separated_by_gap() {
        // Bounding radius of a rotated unit cube is sqrt(3)/2 ~ 0.866;
        // centers 2.0 apart cannot touch under any rotation.
        let a = cuboid(0.5, 0.5, 0.5);
        let pose_b = Pose::new(
            Point3::new(2.0, 0.0, 0.0),
            UnitQuaternion::from_euler_angles(0.3, 0.4, 0.5),
        );
        assert!(compute_contacts(&a, &at(0.0, 0.0, 0.0), &a, &pose_b).is_empty());
    }

    #[test]
    fn test_box_box_offset_overlap_has_positive_depth() {
        let a = cuboid(0.5, 0.5, 0.5);
        let contacts = compute_contacts(&a, &at(0.0, 0.0, 0.0), &a, &at(0.7, 0.6, 0.0));

        assert!(!contacts.is_empty());
        for c in &contacts {
            assert!(c.penetration > 0.0);
            assert!(c.normal.norm() > 0.999 && c.normal.norm() < 1.001);
            // Normal points from a toward b.
            assert!(c.normal.dot(&Vector3::new(0.7, 0.6, 0.0)) > 0.0);
        }
    }

    #[test]
    fn test_box_box_rotated_shallow_overlap() {
        let a = cuboid(0.5, 0.5, 0.5);
        let pose_a = Pose::new(
            Point3::new(0.0, 0.0, 0.0),
            UnitQuaternion::from_euler_angles(0.0, 0.0, std::f64::consts::FRAC_PI_4),
        );
        let pose_b = Pose::new(
            Point3::new(1.15, 0.0, 0.0),
            UnitQuaternion::from_euler_angles(std::f64::consts::FRAC_PI_4, 0.0, 0.0),
        );
        let contacts = compute_contacts(&a, &pose_a, &a, &pose_b);

        assert!(!contacts.is_empty());
        for c in &contacts {
            assert!(c.penetration > 0.0);
        }
    }

    #[test]
    fn test_box_box_crossed_slender_boxes_fall_back_to_midpoint() {
        // Two slender boxes crossed like an X, overlapping 0.05 along Y
        // with no vertex of either inside the other.
        let along_x = cuboid(2.0, 0.1, 0.1);
        let along_z = cuboid(0.1, 0.1, 2.0);
        let contacts = compute_contacts(
            &along_x,
            &at(0.0, 0.0, 0.0),
            &along_z,
            &at(0.0, 0.15, 0.0),
        );

        assert_eq!(contacts.len(), 1);
        assert_relative_eq!(contacts[0].normal, Vector3::y(), epsilon = 1e-12);
        assert_relative_eq!(contacts[0].penetration, 0.05, epsilon = 1e-12);
    }

    #[test]
    fn test_deterministic_output() {
        let cube = cuboid(0.5, 0.5, 0.5);
        let pose_b = Pose::new(
            Point3::new(0.6, 0.55, 0.1),
            UnitQuaternion::from_euler_angles(0.1, 0.2, 0.3),
        );

        let first = compute_contacts(&cube, &at(0.0, 0.0, 0.0), &cube, &pose_b);
        let second = compute_contacts(&cube, &at(0.0, 0.0, 0.0), &cube, &pose_b);

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.position, b.position);
            assert_eq!(a.normal, b.normal);
            assert_eq!(a.penetration, b.penetration);
        }
    }
}
