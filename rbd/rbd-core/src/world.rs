//! The simulation world and its step pipeline.

use nalgebra::Vector3;
use rbd_collide::{compute_contacts, BroadPhase, BroadPhaseConfig, ManifoldCache};
use rbd_solver::{ContactSolver, SolverBody};
use rbd_types::{BodyHandle, PhysicsError, Result, WorldConfig};
use tracing::trace;

use crate::arena::Arena;
use crate::body::Body;
use crate::integrator::{Integrator, SemiImplicitEuler};

/// A rigid-body world.
///
/// The world exclusively owns its bodies, broad-phase index, manifold cache,
/// and solver. All mutation goes through its API; there is no internal
/// threading or locking.
///
/// # Stepping
///
/// [`step`](Self::step) advances the simulation by one timestep through a
/// fixed pipeline: gravity, broad phase, narrow phase, impulse solve,
/// integration, proxy refresh. Two identically constructed worlds stepped
/// with the same timesteps produce identical states.
#[derive(Debug, Clone)]
pub struct World {
    config: WorldConfig,
    bodies: Arena<Body>,
    broad_phase: BroadPhase,
    manifolds: ManifoldCache,
    solver: ContactSolver,
    time: f64,
    step_count: u64,
}

impl World {
    /// Create a world from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::InvalidArgument`] if the configuration fails
    /// validation.
    pub fn new(config: WorldConfig) -> Result<Self> {
        config.validate()?;
        let solver = ContactSolver::new(config.solver);
        Ok(Self {
            config,
            bodies: Arena::new(),
            broad_phase: BroadPhase::new(BroadPhaseConfig::default()),
            manifolds: ManifoldCache::new(),
            solver,
            time: 0.0,
            step_count: 0,
        })
    }

    /// The world configuration.
    #[must_use]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Gravitational acceleration.
    #[must_use]
    pub fn gravity(&self) -> Vector3<f64> {
        self.config.gravity
    }

    /// Simulated time, s.
    #[must_use]
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Number of completed steps.
    #[must_use]
    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Number of bodies.
    #[must_use]
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Add a body, returning its handle.
    pub fn add_body(&mut self, body: Body) -> BodyHandle {
        let aabb = body.aabb();
        let is_static = body.is_static();
        let (index, generation) = self.bodies.insert(body);
        let handle = BodyHandle::new(index, generation);
        self.broad_phase.insert(handle, aabb, is_static);
        handle
    }

    /// Remove a body, dropping its broad-phase proxy and any manifolds it
    /// participates in.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::InvalidHandle`] for unknown or stale handles.
    pub fn remove_body(&mut self, handle: BodyHandle) -> Result<()> {
        self.bodies
            .remove(handle.index(), handle.generation())
            .ok_or(PhysicsError::invalid_handle("body"))?;
        self.broad_phase.remove(handle);
        self.manifolds.remove_body(handle);
        Ok(())
    }

    /// Look up a body.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::InvalidHandle`] for unknown or stale handles.
    pub fn body(&self, handle: BodyHandle) -> Result<&Body> {
        self.bodies
            .get(handle.index(), handle.generation())
            .ok_or(PhysicsError::invalid_handle("body"))
    }

    /// Look up a body mutably. Pose edits take effect at the next step.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::InvalidHandle`] for unknown or stale handles.
    pub fn body_mut(&mut self, handle: BodyHandle) -> Result<&mut Body> {
        self.bodies
            .get_mut(handle.index(), handle.generation())
            .ok_or(PhysicsError::invalid_handle("body"))
    }

    /// Iterate bodies with their handles, in slot order.
    pub fn iter_bodies(&self) -> impl Iterator<Item = (BodyHandle, &Body)> {
        self.bodies
            .iter()
            .map(|(index, generation, body)| (BodyHandle::new(index, generation), body))
    }

    /// Total kinetic energy of all bodies, J.
    #[must_use]
    pub fn total_kinetic_energy(&self) -> f64 {
        self.bodies.iter().map(|(_, _, b)| b.kinetic_energy()).sum()
    }

    /// Advance the simulation by `dt` seconds.
    ///
    /// A zero `dt` is a no-op and changes nothing. The pipeline is:
    ///
    /// 1. apply gravity and accumulated forces to dynamic velocities
    /// 2. broad phase: refresh proxies, collect candidate pairs
    /// 3. narrow phase: refresh the persistent manifolds
    /// 4. sequential-impulse solve
    /// 5. integrate dynamic bodies (semi-implicit Euler)
    /// 6. refresh broad-phase proxies from the new poses, clear forces
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::InvalidTimestep`] for non-finite or negative
    /// `dt` before touching any state, and [`PhysicsError::Diverged`] if a
    /// body ends the step with non-finite pose or velocity.
    pub fn step(&mut self, dt: f64) -> Result<()> {
        if !dt.is_finite() || dt < 0.0 {
            return Err(PhysicsError::InvalidTimestep(dt));
        }
        if dt == 0.0 {
            return Ok(());
        }

        self.apply_forces(dt);

        // Broad phase. Proxies are refreshed first so pose edits made
        // through `body_mut` since the last step cannot cause a miss.
        for (index, generation, body) in self.bodies.iter() {
            self.broad_phase
                .update(BodyHandle::new(index, generation), body.aabb());
        }
        let pairs = self.broad_phase.overlapping_pairs();

        // Narrow phase into the persistent manifolds.
        self.manifolds.begin_refresh();
        for &(handle_a, handle_b) in &pairs {
            let (Ok(body_a), Ok(body_b)) = (self.body(handle_a), self.body(handle_b)) else {
                continue;
            };
            let contacts =
                compute_contacts(&body_a.shape, &body_a.pose, &body_b.shape, &body_b.pose);
            self.manifolds.update_pair((handle_a, handle_b), contacts);
        }
        self.manifolds.retain_touched();

        trace!(
            bodies = self.bodies.len(),
            pairs = pairs.len(),
            manifolds = self.manifolds.len(),
            "collision pass"
        );

        self.solve_contacts(dt);

        // Integrate. Forces already went into velocities, so the integrator
        // sees zero acceleration and moves poses by the solved velocities.
        for (_, _, body) in self.bodies.iter_mut() {
            if body.is_static() {
                continue;
            }
            SemiImplicitEuler::integrate(
                &mut body.pose,
                &mut body.velocity,
                Vector3::zeros(),
                Vector3::zeros(),
                dt,
            );
        }

        for (index, generation, body) in self.bodies.iter() {
            self.broad_phase
                .update(BodyHandle::new(index, generation), body.aabb());
        }
        for (_, _, body) in self.bodies.iter_mut() {
            body.clear_forces();
        }

        self.time += dt;
        self.step_count += 1;
        self.validate()
    }

    /// Gravity plus accumulated external forces into dynamic velocities.
    fn apply_forces(&mut self, dt: f64) {
        let gravity = self.config.gravity;
        for (_, _, body) in self.bodies.iter_mut() {
            if body.is_static() {
                continue;
            }
            let linear_accel = gravity + body.accumulated_force() * body.mass.inverse_mass;
            let angular_accel = body.mass.inverse_inertia * body.accumulated_torque();
            body.velocity.linear += linear_accel * dt;
            body.velocity.angular += angular_accel * dt;
        }
    }

    fn solve_contacts(&mut self, dt: f64) {
        if self.manifolds.is_empty() {
            return;
        }

        // Dense body slice indexed by arena slot; manifold pairs address it
        // through their handle indices.
        let mut solver_bodies = vec![SolverBody::vacant(); self.bodies.slot_count()];
        for (index, _, body) in self.bodies.iter() {
            solver_bodies[index as usize] = SolverBody::new(body.pose, body.velocity, &body.mass);
        }

        self.solver.solve(dt, &mut solver_bodies, &mut self.manifolds);

        for (index, _, body) in self.bodies.iter_mut() {
            if body.is_static() {
                continue;
            }
            body.velocity = solver_bodies[index as usize].velocity;
        }
    }

    /// Check every body for non-finite state.
    fn validate(&self) -> Result<()> {
        for (index, generation, body) in self.bodies.iter() {
            if !body.is_finite() {
                return Err(PhysicsError::diverged(format!(
                    "non-finite state on body {}",
                    BodyHandle::new(index, generation)
                )));
            }
        }
        Ok(())
    }
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
    use nalgebra::Point3;
    use rbd_types::{Pose, Shape, Velocity};
    use std::sync::Arc;

    const DT: f64 = 1.0 / 60.0;

    fn world() -> World {
        World::new(WorldConfig::default()).unwrap()
    }

    fn unit_cube() -> Arc<Shape> {
        Arc::new(Shape::cuboid(Vector3::new(0.5, 0.5, 0.5)).unwrap())
    }

    fn dynamic_cube(world: &mut World, y: f64) -> BodyHandle {
        let shape = unit_cube();
        let mass = shape.mass_properties(1.0);
        world.add_body(Body::new(
            Pose::from_position(Point3::new(0.0, y, 0.0)),
            mass,
            shape,
        ))
    }

    fn ground(world: &mut World) -> BodyHandle {
        let shape = Arc::new(Shape::cuboid(Vector3::new(50.0, 0.5, 50.0)).unwrap());
        world.add_body(Body::new_static(Pose::identity(), shape))
    }

    #[test]
    fn test_add_and_lookup_body() {
        let mut world = world();
        let handle = dynamic_cube(&mut world, 5.0);
        assert_eq!(world.body_count(), 1);
        assert_relative_eq!(world.body(handle).unwrap().pose.position.y, 5.0);
    }

    #[test]
    fn test_stale_handle_after_remove() {
        let mut world = world();
        let handle = dynamic_cube(&mut world, 5.0);
        world.remove_body(handle).unwrap();

        assert!(world.body(handle).unwrap_err().is_invalid_handle());
        assert!(world.remove_body(handle).unwrap_err().is_invalid_handle());

        // The recycled slot issues a fresh generation; the old handle
        // still misses.
        let replacement = dynamic_cube(&mut world, 1.0);
        assert_eq!(replacement.index(), handle.index());
        assert!(world.body(handle).is_err());
        assert!(world.body(replacement).is_ok());
    }

    #[test]
    fn test_invalid_timestep_preserves_state() {
        let mut world = world();
        let handle = dynamic_cube(&mut world, 5.0);

        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, -0.01] {
            let err = world.step(bad).unwrap_err();
            assert!(matches!(err, PhysicsError::InvalidTimestep(_)));
        }

        let body = world.body(handle).unwrap();
        assert_eq!(body.pose.position.y, 5.0);
        assert_eq!(body.velocity.linear, Vector3::zeros());
        assert_eq!(world.step_count(), 0);
    }

    #[test]
    fn test_zero_dt_is_identity() {
        let mut world = world();
        ground(&mut world);
        let handle = dynamic_cube(&mut world, 0.99);

        let before = world.body(handle).unwrap().pose;
        world.step(0.0).unwrap();
        let after = world.body(handle).unwrap().pose;

        assert_eq!(before.position, after.position);
        assert_eq!(before.rotation, after.rotation);
        assert_eq!(world.step_count(), 0);
        assert_eq!(world.time(), 0.0);
    }

    #[test]
    fn test_free_fall_velocity_is_g_t() {
        let mut world = world();
        let handle = dynamic_cube(&mut world, 1000.0);

        for _ in 0..120 {
            world.step(DT).unwrap();
        }

        let body = world.body(handle).unwrap();
        let t = world.time();
        assert_relative_eq!(body.velocity.linear.y, -10.0 * t, epsilon = 1e-9);
    }

    #[test]
    fn test_static_body_never_moves() {
        let mut world = world();
        let handle = ground(&mut world);
        dynamic_cube(&mut world, 5.0); // something to collide with later

        for _ in 0..120 {
            world.step(DT).unwrap();
        }

        let body = world.body(handle).unwrap();
        assert_eq!(body.pose.position, Point3::origin());
        assert_eq!(body.velocity.linear, Vector3::zeros());
    }

    #[test]
    fn test_cube_settles_on_ground() {
        let mut world = world();
        ground(&mut world);
        let handle = dynamic_cube(&mut world, 2.0);

        for _ in 0..180 {
            world.step(DT).unwrap();
        }

        let body = world.body(handle).unwrap();
        // Resting height is half the cube above the slab top, within solver
        // tolerance.
        assert!(
            (body.pose.position.y - 1.0).abs() < 0.05,
            "cube rests at y = {}",
            body.pose.position.y
        );
        assert!(body.velocity.linear.norm() < 0.05);
    }

    #[test]
    fn test_determinism_across_worlds() {
        let build = || {
            let mut w = world();
            ground(&mut w);
            let a = dynamic_cube(&mut w, 3.0);
            let shape = Arc::new(Shape::sphere(0.5).unwrap());
            let mass = shape.mass_properties(2.0);
            let b = w.add_body(
                Body::new(Pose::from_position(Point3::new(0.3, 5.0, 0.1)), mass, shape)
                    .with_velocity(Velocity::new(
                        Vector3::new(0.5, 0.0, -0.2),
                        Vector3::new(1.0, 0.0, 0.0),
                    )),
            );
            (w, a, b)
        };

        let (mut w1, a1, b1) = build();
        let (mut w2, a2, b2) = build();
        for _ in 0..120 {
            w1.step(DT).unwrap();
            w2.step(DT).unwrap();
        }

        for (h1, h2) in [(a1, a2), (b1, b2)] {
            let body1 = w1.body(h1).unwrap();
            let body2 = w2.body(h2).unwrap();
            assert_eq!(body1.pose.position, body2.pose.position);
            assert_eq!(body1.pose.rotation, body2.pose.rotation);
            assert_eq!(body1.velocity.linear, body2.velocity.linear);
            assert_eq!(body1.velocity.angular, body2.velocity.angular);
        }
    }

    #[test]
    fn test_divergence_detected() {
        let mut world = world();
        let handle = dynamic_cube(&mut world, 5.0);
        world.body_mut(handle).unwrap().velocity.linear.x = f64::NAN;

        let err = world.step(DT).unwrap_err();
        assert!(err.is_diverged());
    }

    #[test]
    fn test_external_force_accelerates_body() {
        let mut world = World::new(WorldConfig::default().with_gravity(Vector3::zeros())).unwrap();
        let handle = dynamic_cube(&mut world, 0.0);

        world
            .body_mut(handle)
            .unwrap()
            .apply_force(Vector3::new(6.0, 0.0, 0.0));
        world.step(0.5).unwrap();

        let body = world.body(handle).unwrap();
        // a = F/m = 6, v = a*dt = 3; force is cleared afterwards.
        assert_relative_eq!(body.velocity.linear.x, 3.0, epsilon = 1e-12);
        assert_eq!(body.accumulated_force(), Vector3::zeros());

        world.step(0.5).unwrap();
        assert_relative_eq!(
            world.body(handle).unwrap().velocity.linear.x,
            3.0,
            epsilon = 1e-12
        );
    }
}
