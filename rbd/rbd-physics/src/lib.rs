//! Rigid-body dynamics facade.
//!
//! This crate re-exports the full stack and adds [`Engine`], the
//! handle-based interface hosts embed. Depend on `rbd-physics` alone and
//! everything is in reach; the sub-crates remain available for callers
//! that want a narrower dependency.
//!
//! # Quick Start
//!
//! ```rust
//! use rbd_physics::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let mut engine = Engine::new();
//!     let world = engine.create_world(Vector3::new(0.0, -10.0, 0.0))?;
//!
//!     let ground_shape = engine.create_box_shape(100.0, 1.0, 100.0)?;
//!     engine.create_body(world, 0.0, Point3::origin(), ground_shape)?;
//!
//!     let cube_shape = engine.create_box_shape(1.0, 1.0, 1.0)?;
//!     let cube = engine.create_body(world, 1.0, Point3::new(0.0, 5.0, 0.0), cube_shape)?;
//!
//!     for _ in 0..120 {
//!         engine.step(world, 1.0 / 60.0)?;
//!     }
//!
//!     let (position, _rotation) = engine.body_transform(world, cube)?;
//!     println!("cube settled at y = {:.3}", position.y);
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//!                      ┌─────────────────┐
//!                      │   rbd-physics   │  handles + facade
//!                      └────────┬────────┘
//!                               │
//!                      ┌────────▼────────┐
//!                      │    rbd-core     │  world, bodies, stepping
//!                      └────┬───────┬────┘
//!                           │       │
//!                ┌──────────▼──┐ ┌──▼──────────┐
//!                │ rbd-collide │ │ rbd-solver  │
//!                │ broad +     │ │ sequential  │
//!                │ narrow phase│ │ impulses    │
//!                └──────┬──────┘ └──────┬──────┘
//!                       │               │
//!                      ┌▼───────────────▼┐
//!                      │    rbd-types    │  math, shapes, errors
//!                      └─────────────────┘
//! ```
//!
//! Pipeline per [`Engine::step`]: apply gravity and accumulated forces,
//! query the broad phase, generate contact manifolds, solve velocity
//! constraints with warm-started sequential impulses, integrate, refresh
//! the broad phase.

#![doc(html_root_url = "https://docs.rs/rbd-physics/0.1.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]

mod engine;

pub use engine::Engine;

// Sub-crates, for callers that want the layers directly.
pub use rbd_collide;
pub use rbd_core;
pub use rbd_solver;
pub use rbd_types;

// Math backbone of the whole stack.
pub use nalgebra;

/// Everything most hosts need, one `use` away.
pub mod prelude {
    // ── Facade ──────────────────────────────────────────────────────
    pub use crate::Engine;

    // ── Core types ──────────────────────────────────────────────────
    pub use rbd_types::{
        BodyHandle, MassProperties, PhysicsError, Pose, Result, Shape, ShapeHandle, SolverConfig,
        Velocity, WorldConfig, WorldHandle,
    };

    // ── World layer ─────────────────────────────────────────────────
    pub use rbd_core::{Body, World};

    // ── Math ────────────────────────────────────────────────────────
    pub use nalgebra::{Point3, UnitQuaternion, Vector3};
}
