//! Rigid-body simulation core.
//!
//! This crate owns the simulation loop: a [`World`] of [`Body`]s stepped
//! through a fixed pipeline each timestep:
//!
//! ```text
//! gravity -> broad phase -> narrow phase -> impulse solve -> integrate
//! ```
//!
//! Bodies live in a generational arena; the [`BodyHandle`]s it issues stay
//! valid until the body is removed and reliably fail afterwards, even when
//! the slot is reused.
//!
//! # Example
//!
//! ```
//! use rbd_core::{Body, World};
//! use rbd_types::{Pose, Shape, WorldConfig};
//! use nalgebra::{Point3, Vector3};
//! use std::sync::Arc;
//!
//! let mut world = World::new(WorldConfig::default())?;
//!
//! let ground = Arc::new(Shape::cuboid(Vector3::new(50.0, 0.5, 50.0))?);
//! world.add_body(Body::new_static(Pose::identity(), ground));
//!
//! let cube = Arc::new(Shape::cuboid(Vector3::new(0.5, 0.5, 0.5))?);
//! let handle = world.add_body(Body::new(
//!     Pose::from_position(Point3::new(0.0, 5.0, 0.0)),
//!     cube.mass_properties(1.0),
//!     cube,
//! ));
//!
//! for _ in 0..120 {
//!     world.step(1.0 / 60.0)?;
//! }
//!
//! // The cube has fallen and come to rest on the ground slab.
//! let y = world.body(handle)?.pose.position.y;
//! assert!((y - 1.0).abs() < 0.05);
//! # Ok::<(), rbd_types::PhysicsError>(())
//! ```

#![doc(html_root_url = "https://docs.rs/rbd-core/0.1.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(clippy::missing_const_for_fn, clippy::suboptimal_flops)]

mod arena;
mod body;
mod integrator;
mod world;

pub use arena::Arena;
pub use body::Body;
pub use integrator::{integrate_rotation, Integrator, SemiImplicitEuler};
pub use world::World;

// Re-export the handle type worlds hand out
pub use rbd_types::BodyHandle;
