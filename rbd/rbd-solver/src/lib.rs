//! Sequential-impulse contact solving for rigid-body simulation.
//!
//! This crate turns the contact manifolds found by collision detection into
//! velocity changes. The method is sequential impulses: visit every contact
//! point in a fixed order for a fixed number of iterations, applying at each
//! visit the impulse that best satisfies that contact's constraint given the
//! current velocities.
//!
//! Key properties:
//!
//! - **One-sided contacts**: the accumulated normal impulse is clamped to be
//!   non-negative, so contacts push but never pull.
//! - **Coulomb friction**: accumulated friction impulses are clamped to the
//!   cone `|lambda_t| <= mu * lambda_n`.
//! - **Warm starting**: the previous step's accumulated impulses are applied
//!   up front, which is what makes stacks settle instead of jittering.
//! - **Determinism**: fixed iteration counts and a stable constraint order
//!   mean identical inputs always produce identical velocities.
//! - **`NaN` containment**: a non-finite computed impulse is clamped to zero
//!   before it can reach body state.
//!
//! # Example
//!
//! ```
//! use rbd_solver::{ContactSolver, SolverBody};
//! use rbd_collide::{compute_contacts, ManifoldCache};
//! use rbd_types::{BodyHandle, MassProperties, Pose, Shape, SolverConfig, Velocity};
//! use nalgebra::{Point3, Vector3};
//!
//! let shape = Shape::sphere(1.0)?;
//! let mut bodies = vec![
//!     SolverBody::new(
//!         Pose::from_position(Point3::new(0.0, 0.0, 0.0)),
//!         Velocity::new(Vector3::new(1.0, 0.0, 0.0), Vector3::zeros()),
//!         &MassProperties::sphere(1.0, 1.0),
//!     ),
//!     SolverBody::new(
//!         Pose::from_position(Point3::new(1.8, 0.0, 0.0)),
//!         Velocity::zero(),
//!         &MassProperties::sphere(1.0, 1.0),
//!     ),
//! ];
//!
//! let mut manifolds = ManifoldCache::new();
//! manifolds.update_pair(
//!     (BodyHandle::new(0, 0), BodyHandle::new(1, 0)),
//!     compute_contacts(&shape, &bodies[0].pose, &shape, &bodies[1].pose),
//! );
//!
//! let solver = ContactSolver::new(SolverConfig::default());
//! let stats = solver.solve(1.0 / 60.0, &mut bodies, &mut manifolds);
//! assert_eq!(stats.contact_count, 1);
//! # Ok::<(), rbd_types::PhysicsError>(())
//! ```

#![doc(html_root_url = "https://docs.rs/rbd-solver/0.1.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(clippy::missing_const_for_fn, clippy::suboptimal_flops)]

mod sequential_impulse;

pub use sequential_impulse::{ContactSolver, ContactSolverStats, SolverBody};

// Re-export what callers need to drive a solve
pub use rbd_types::SolverConfig;
