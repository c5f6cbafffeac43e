//! Collision detection for rigid-body simulation.
//!
//! This crate covers the two detection phases that feed the contact solver:
//!
//! - **Broad phase**: a persistent index of body AABBs answering "which
//!   pairs might touch?" with no false negatives. Sweep-and-prune for large
//!   scenes, brute force for small ones.
//! - **Narrow phase**: exact contact generation per candidate pair. Each
//!   contact carries a world position, a unit normal pointing from the first
//!   body toward the second, and a penetration depth that is positive when
//!   the shapes overlap.
//!
//! Contacts persist across steps in [`ContactManifold`]s: points matched to
//! the previous step keep their accumulated impulses, which the solver uses
//! for warm starting.
//!
//! # Example
//!
//! ```
//! use rbd_collide::compute_contacts;
//! use rbd_types::{Pose, Shape};
//! use nalgebra::Point3;
//!
//! let sphere = Shape::sphere(1.0)?;
//! let a = Pose::from_position(Point3::new(0.0, 0.0, 0.0));
//! let b = Pose::from_position(Point3::new(1.5, 0.0, 0.0));
//!
//! let contacts = compute_contacts(&sphere, &a, &sphere, &b);
//! assert_eq!(contacts.len(), 1);
//! assert!((contacts[0].penetration - 0.5).abs() < 1e-12);
//! # Ok::<(), rbd_types::PhysicsError>(())
//! ```
//!
//! # Determinism
//!
//! Both phases are deterministic: pair queries return a canonically sorted
//! list, and contact generation is a pure function of the input transforms.
//! Nothing here depends on hash-map iteration order.

#![doc(html_root_url = "https://docs.rs/rbd-collide/0.1.0")]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![warn(missing_docs)]
#![allow(clippy::missing_const_for_fn)]

mod aabb;
mod broad_phase;
mod contact;
mod narrow_phase;

pub use aabb::{Aabb, Axis};
pub use broad_phase::{BroadPhase, BroadPhaseAlgorithm, BroadPhaseConfig};
pub use contact::{ContactManifold, ContactPoint, ManifoldCache, MAX_MANIFOLD_POINTS};
pub use narrow_phase::compute_contacts;

// Re-export types needed for contact computation
pub use rbd_types::{BodyHandle, Pose, Shape, Vector3};

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    #[test]
    fn test_broad_to_narrow_pipeline() {
        let shape = Shape::sphere(1.0).unwrap();
        let poses = [
            Pose::from_position(Point3::new(0.0, 0.0, 0.0)),
            Pose::from_position(Point3::new(1.5, 0.0, 0.0)),
            Pose::from_position(Point3::new(10.0, 0.0, 0.0)),
        ];

        let mut broad = BroadPhase::default();
        for (i, pose) in poses.iter().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            broad.insert(BodyHandle::new(i as u32, 0), Aabb::of_shape(&shape, pose), false);
        }

        let pairs = broad.overlapping_pairs();
        assert_eq!(pairs.len(), 1);

        let (a, b) = pairs[0];
        let contacts = compute_contacts(
            &shape,
            &poses[a.index() as usize],
            &shape,
            &poses[b.index() as usize],
        );
        assert_eq!(contacts.len(), 1);
        assert!(contacts[0].penetration > 0.0);
    }

    #[test]
    fn test_manifold_warm_start_through_cache() {
        let shape = Shape::sphere(1.0).unwrap();
        let pose_a = Pose::from_position(Point3::new(0.0, 0.0, 0.0));
        let pose_b = Pose::from_position(Point3::new(1.5, 0.0, 0.0));
        let pair = (BodyHandle::new(0, 0), BodyHandle::new(1, 0));

        let mut cache = ManifoldCache::new();
        cache.update_pair(pair, compute_contacts(&shape, &pose_a, &shape, &pose_b));

        // Simulate a solve writing accumulated impulse back.
        for manifold in cache.iter_mut() {
            manifold.points[0].normal_impulse = 1.25;
        }

        // Next step: same configuration, impulse survives the refresh.
        cache.begin_refresh();
        cache.update_pair(pair, compute_contacts(&shape, &pose_a, &shape, &pose_b));
        cache.retain_touched();

        let manifold = cache.iter().next().unwrap();
        assert_eq!(manifold.points[0].normal_impulse, 1.25);
    }
}
