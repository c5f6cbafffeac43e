//! Handle-based host interface.
//!
//! [`Engine`] is the surface host code talks to: it owns every world and
//! every shared shape, and hands out generational handles instead of
//! references. A handle used after its object is destroyed fails with
//! [`PhysicsError::InvalidHandle`]; it can never alias a recycled slot.
//!
//! Worlds move through a two-state lifecycle. [`Engine::create_world`]
//! allocates and configures in one call; [`Engine::allocate_world`] and
//! [`Engine::configure_world`] split the phases for hosts that reserve
//! handles before their configuration is known. Stepping an allocated but
//! unconfigured world fails with [`PhysicsError::NotReady`].

use std::sync::Arc;

use nalgebra::{Point3, UnitQuaternion, Vector3};
use rbd_core::{Arena, Body, World};
use rbd_types::{
    BodyHandle, PhysicsError, Pose, Result, Shape, ShapeHandle, WorldConfig, WorldHandle,
};
use tracing::debug;

/// A world slot: allocated handles exist before their configuration does.
#[derive(Debug)]
enum WorldSlot {
    Allocated,
    Ready(World),
}

/// Owner of worlds and shapes, addressed through generational handles.
#[derive(Debug, Default)]
pub struct Engine {
    worlds: Arena<WorldSlot>,
    shapes: Arena<Arc<Shape>>,
}

impl Engine {
    /// Create an empty engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a world with the given gravity, ready to step.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::InvalidArgument`] for non-finite gravity.
    pub fn create_world(&mut self, gravity: Vector3<f64>) -> Result<WorldHandle> {
        let config = WorldConfig::default().with_gravity(gravity);
        config.validate()?;
        let handle = self.allocate_world();
        self.configure_world(handle, config)?;
        Ok(handle)
    }

    /// Reserve a world handle without configuring the world.
    ///
    /// The handle is valid for [`configure_world`](Self::configure_world)
    /// and [`destroy_world`](Self::destroy_world); anything else fails with
    /// [`PhysicsError::NotReady`] until configuration.
    pub fn allocate_world(&mut self) -> WorldHandle {
        let (index, generation) = self.worlds.insert(WorldSlot::Allocated);
        let handle = WorldHandle::new(index, generation);
        debug!(world = %handle, "allocated world");
        handle
    }

    /// Configure an allocated world, making it ready to step.
    ///
    /// Reconfiguring a ready world replaces it wholesale, dropping its
    /// bodies.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::InvalidHandle`] for unknown handles and
    /// [`PhysicsError::InvalidArgument`] for invalid configuration.
    pub fn configure_world(&mut self, handle: WorldHandle, config: WorldConfig) -> Result<()> {
        let world = World::new(config)?;
        let slot = self
            .worlds
            .get_mut(handle.index(), handle.generation())
            .ok_or(PhysicsError::invalid_handle("world"))?;
        *slot = WorldSlot::Ready(world);
        debug!(world = %handle, "configured world");
        Ok(())
    }

    /// Destroy a world. Its handle and all its body handles go stale.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::InvalidHandle`] for unknown or stale handles.
    pub fn destroy_world(&mut self, handle: WorldHandle) -> Result<()> {
        self.worlds
            .remove(handle.index(), handle.generation())
            .ok_or(PhysicsError::invalid_handle("world"))?;
        debug!(world = %handle, "destroyed world");
        Ok(())
    }

    /// Number of live worlds, allocated or ready.
    #[must_use]
    pub fn world_count(&self) -> usize {
        self.worlds.len()
    }

    /// Advance a world by `dt` seconds.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::InvalidHandle`] for stale handles,
    /// [`PhysicsError::NotReady`] for unconfigured worlds, and propagates
    /// step failures ([`PhysicsError::InvalidTimestep`],
    /// [`PhysicsError::Diverged`]).
    pub fn step(&mut self, handle: WorldHandle, dt: f64) -> Result<()> {
        self.world_mut(handle)?.step(dt)
    }

    /// Register a box shape from its full edge lengths.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::InvalidArgument`] for non-finite or
    /// non-positive dimensions.
    pub fn create_box_shape(&mut self, width: f64, height: f64, depth: f64) -> Result<ShapeHandle> {
        let shape = Shape::cuboid_from_dimensions(width, height, depth)?;
        Ok(self.register_shape(shape))
    }

    /// Register a sphere shape.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::InvalidArgument`] for a non-finite or
    /// non-positive radius.
    pub fn create_sphere_shape(&mut self, radius: f64) -> Result<ShapeHandle> {
        let shape = Shape::sphere(radius)?;
        Ok(self.register_shape(shape))
    }

    /// Drop a shape registration. Bodies already built from it keep their
    /// reference; the shape memory lives until the last body releases it.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::InvalidHandle`] for unknown or stale handles.
    pub fn destroy_shape(&mut self, handle: ShapeHandle) -> Result<()> {
        self.shapes
            .remove(handle.index(), handle.generation())
            .ok_or(PhysicsError::invalid_handle("shape"))?;
        Ok(())
    }

    /// Create a body in a world. A mass of zero makes the body static;
    /// positive mass gets inertia computed from the shape.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::InvalidArgument`] for negative or non-finite
    /// mass or a non-finite position, [`PhysicsError::InvalidHandle`] for
    /// stale handles, and [`PhysicsError::NotReady`] for unconfigured
    /// worlds.
    pub fn create_body(
        &mut self,
        world: WorldHandle,
        mass: f64,
        position: Point3<f64>,
        shape: ShapeHandle,
    ) -> Result<BodyHandle> {
        if !mass.is_finite() || mass < 0.0 {
            return Err(PhysicsError::invalid_argument(format!(
                "body mass must be finite and non-negative, got {mass}"
            )));
        }
        if position.coords.iter().any(|c| !c.is_finite()) {
            return Err(PhysicsError::invalid_argument(format!(
                "body position must be finite, got {position:?}"
            )));
        }
        let shape = self
            .shapes
            .get(shape.index(), shape.generation())
            .ok_or(PhysicsError::invalid_handle("shape"))?
            .clone();

        let mass_props = shape.mass_properties(mass);
        let body = Body::new(Pose::from_position(position), mass_props, shape);
        let handle = self.world_mut(world)?.add_body(body);
        debug!(world = %world, body = %handle, mass, "created body");
        Ok(handle)
    }

    /// Remove a body from a world.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::InvalidHandle`] for stale world or body
    /// handles and [`PhysicsError::NotReady`] for unconfigured worlds.
    pub fn remove_body(&mut self, world: WorldHandle, body: BodyHandle) -> Result<()> {
        self.world_mut(world)?.remove_body(body)
    }

    /// A body's world-space position and orientation.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::InvalidHandle`] for stale handles and
    /// [`PhysicsError::NotReady`] for unconfigured worlds.
    pub fn body_transform(
        &self,
        world: WorldHandle,
        body: BodyHandle,
    ) -> Result<(Point3<f64>, UnitQuaternion<f64>)> {
        let body = self.world(world)?.body(body)?;
        Ok((body.pose.position, body.pose.rotation))
    }

    /// A body's linear and angular velocity.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::InvalidHandle`] for stale handles and
    /// [`PhysicsError::NotReady`] for unconfigured worlds.
    pub fn body_velocity(
        &self,
        world: WorldHandle,
        body: BodyHandle,
    ) -> Result<(Vector3<f64>, Vector3<f64>)> {
        let body = self.world(world)?.body(body)?;
        Ok((body.velocity.linear, body.velocity.angular))
    }

    /// Borrow a ready world.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::InvalidHandle`] for stale handles and
    /// [`PhysicsError::NotReady`] for unconfigured worlds.
    pub fn world(&self, handle: WorldHandle) -> Result<&World> {
        match self
            .worlds
            .get(handle.index(), handle.generation())
            .ok_or(PhysicsError::invalid_handle("world"))?
        {
            WorldSlot::Ready(world) => Ok(world),
            WorldSlot::Allocated => Err(PhysicsError::NotReady),
        }
    }

    /// Borrow a ready world mutably.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::InvalidHandle`] for stale handles and
    /// [`PhysicsError::NotReady`] for unconfigured worlds.
    pub fn world_mut(&mut self, handle: WorldHandle) -> Result<&mut World> {
        match self
            .worlds
            .get_mut(handle.index(), handle.generation())
            .ok_or(PhysicsError::invalid_handle("world"))?
        {
            WorldSlot::Ready(world) => Ok(world),
            WorldSlot::Allocated => Err(PhysicsError::NotReady),
        }
    }

    fn register_shape(&mut self, shape: Shape) -> ShapeHandle {
        let (index, generation) = self.shapes.insert(Arc::new(shape));
        ShapeHandle::new(index, generation)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const GRAVITY: Vector3<f64> = Vector3::new(0.0, -10.0, 0.0);

    #[test]
    fn test_world_lifecycle() {
        let mut engine = Engine::new();
        let world = engine.create_world(GRAVITY).unwrap();
        assert_eq!(engine.world_count(), 1);

        engine.step(world, 1.0 / 60.0).unwrap();
        engine.destroy_world(world).unwrap();

        assert!(engine.destroy_world(world).unwrap_err().is_invalid_handle());
        assert!(engine.step(world, 1.0 / 60.0).unwrap_err().is_invalid_handle());
    }

    #[test]
    fn test_unconfigured_world_is_not_ready() {
        let mut engine = Engine::new();
        let world = engine.allocate_world();

        assert_eq!(
            engine.step(world, 1.0 / 60.0).unwrap_err(),
            PhysicsError::NotReady
        );

        engine
            .configure_world(world, WorldConfig::default())
            .unwrap();
        engine.step(world, 1.0 / 60.0).unwrap();
    }

    #[test]
    fn test_recycled_world_slot_rejects_old_handle() {
        let mut engine = Engine::new();
        let old = engine.create_world(GRAVITY).unwrap();
        engine.destroy_world(old).unwrap();

        let new = engine.create_world(GRAVITY).unwrap();
        assert_eq!(new.index(), old.index());
        assert!(engine.step(old, 1.0).unwrap_err().is_invalid_handle());
        assert!(engine.step(new, 1.0 / 60.0).is_ok());
    }

    #[test]
    fn test_invalid_gravity_rejected() {
        let mut engine = Engine::new();
        let err = engine
            .create_world(Vector3::new(0.0, f64::NAN, 0.0))
            .unwrap_err();
        assert!(matches!(err, PhysicsError::InvalidArgument { .. }));
        assert_eq!(engine.world_count(), 0);
    }

    #[test]
    fn test_shape_validation() {
        let mut engine = Engine::new();
        assert!(engine.create_box_shape(1.0, 0.0, 1.0).is_err());
        assert!(engine.create_box_shape(1.0, f64::INFINITY, 1.0).is_err());
        assert!(engine.create_sphere_shape(-1.0).is_err());
        assert!(engine.create_box_shape(1.0, 1.0, 1.0).is_ok());
    }

    #[test]
    fn test_create_body_validation() {
        let mut engine = Engine::new();
        let world = engine.create_world(GRAVITY).unwrap();
        let shape = engine.create_box_shape(1.0, 1.0, 1.0).unwrap();

        let origin = Point3::origin();
        assert!(engine.create_body(world, -1.0, origin, shape).is_err());
        assert!(engine.create_body(world, f64::NAN, origin, shape).is_err());
        assert!(engine
            .create_body(world, 1.0, Point3::new(f64::NAN, 0.0, 0.0), shape)
            .is_err());

        // Stale shape handle.
        engine.destroy_shape(shape).unwrap();
        let err = engine.create_body(world, 1.0, origin, shape).unwrap_err();
        assert!(err.is_invalid_handle());
    }

    #[test]
    fn test_destroyed_shape_keeps_existing_bodies_alive() {
        let mut engine = Engine::new();
        let world = engine.create_world(GRAVITY).unwrap();
        let shape = engine.create_sphere_shape(0.5).unwrap();
        let body = engine
            .create_body(world, 1.0, Point3::new(0.0, 5.0, 0.0), shape)
            .unwrap();

        engine.destroy_shape(shape).unwrap();
        engine.step(world, 1.0 / 60.0).unwrap();
        let (position, _) = engine.body_transform(world, body).unwrap();
        assert!(position.y < 5.0);
    }

    #[test]
    fn test_body_transform_and_velocity() {
        let mut engine = Engine::new();
        let world = engine.create_world(GRAVITY).unwrap();
        let shape = engine.create_box_shape(1.0, 1.0, 1.0).unwrap();
        let body = engine
            .create_body(world, 1.0, Point3::new(0.0, 5.0, 0.0), shape)
            .unwrap();

        let (position, rotation) = engine.body_transform(world, body).unwrap();
        assert_relative_eq!(position.y, 5.0);
        assert_eq!(rotation, UnitQuaternion::identity());

        engine.step(world, 0.5).unwrap();
        let (linear, angular) = engine.body_velocity(world, body).unwrap();
        assert_relative_eq!(linear.y, -5.0, epsilon = 1e-12);
        assert_eq!(angular, Vector3::zeros());
    }

    #[test]
    fn test_remove_body() {
        let mut engine = Engine::new();
        let world = engine.create_world(GRAVITY).unwrap();
        let shape = engine.create_sphere_shape(0.5).unwrap();
        let body = engine
            .create_body(world, 1.0, Point3::origin(), shape)
            .unwrap();

        engine.remove_body(world, body).unwrap();
        assert!(engine.body_transform(world, body).unwrap_err().is_invalid_handle());
        assert!(engine.remove_body(world, body).unwrap_err().is_invalid_handle());
    }

    #[test]
    fn test_worlds_are_isolated() {
        let mut engine = Engine::new();
        let world_a = engine.create_world(GRAVITY).unwrap();
        let world_b = engine.create_world(Vector3::zeros()).unwrap();
        let shape = engine.create_sphere_shape(0.5).unwrap();

        let ball_a = engine
            .create_body(world_a, 1.0, Point3::new(0.0, 5.0, 0.0), shape)
            .unwrap();
        let ball_b = engine
            .create_body(world_b, 1.0, Point3::new(0.0, 5.0, 0.0), shape)
            .unwrap();

        engine.step(world_a, 1.0 / 60.0).unwrap();

        let (pos_a, _) = engine.body_transform(world_a, ball_a).unwrap();
        let (pos_b, _) = engine.body_transform(world_b, ball_b).unwrap();
        assert!(pos_a.y < 5.0, "stepped world moved");
        assert_eq!(pos_b.y, 5.0, "unstepped world untouched");
    }
}
