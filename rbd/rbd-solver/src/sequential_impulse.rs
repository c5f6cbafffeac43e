//! Sequential-impulse contact solver.
//!
//! The solver takes the contact manifolds produced by narrow phase and
//! iteratively applies impulses at each contact point until the relative
//! velocities satisfy the contact constraints:
//!
//! - along the normal, bodies must not keep approaching; the accumulated
//!   normal impulse is clamped non-negative so contacts only ever push
//! - tangentially, Coulomb friction bounds the accumulated friction impulse
//!   by `mu * normal_impulse`
//!
//! Restitution enters as a velocity bias when the approach speed exceeds a
//! threshold, and a Baumgarte term `beta / dt * max(penetration - slop, 0)`
//! bleeds positional error off through the velocity solve.
//!
//! Constraints are visited in manifold insertion order with a fixed
//! iteration count, so the solve is deterministic for a given input. The
//! accumulated impulses are written back to the manifold points afterwards
//! and seed the next step's solve (warm starting).

use nalgebra::{Matrix3, Vector3};
use rbd_collide::ManifoldCache;
use rbd_types::{MassProperties, Pose, SolverConfig, Velocity};
use tracing::debug;

/// Velocity-level view of one body for the duration of a solve.
///
/// Indexed by body slot: manifold pair handles index into the slice passed
/// to [`ContactSolver::solve`] via [`BodyHandle::index`](rbd_types::BodyHandle::index).
#[derive(Debug, Clone)]
pub struct SolverBody {
    /// Body pose at the start of the step.
    pub pose: Pose,
    /// Velocity being solved. Read back after the solve.
    pub velocity: Velocity,
    /// Inverse mass, zero for static bodies.
    pub inverse_mass: f64,
    /// Inverse inertia tensor rotated into world space.
    pub inverse_inertia_world: Matrix3<f64>,
}

impl SolverBody {
    /// Build a solver body from simulation state.
    #[must_use]
    pub fn new(pose: Pose, velocity: Velocity, mass: &MassProperties) -> Self {
        let r = pose.rotation.to_rotation_matrix();
        let inverse_inertia_world = r.matrix() * mass.inverse_inertia * r.matrix().transpose();
        Self {
            pose,
            velocity,
            inverse_mass: mass.inverse_mass,
            inverse_inertia_world,
        }
    }

    /// A placeholder for empty body slots: infinite mass, never moves.
    #[must_use]
    pub fn vacant() -> Self {
        Self {
            pose: Pose::identity(),
            velocity: Velocity::zero(),
            inverse_mass: 0.0,
            inverse_inertia_world: Matrix3::zeros(),
        }
    }

    fn is_dynamic(&self) -> bool {
        self.inverse_mass > 0.0
    }
}

/// Statistics from one solve, for diagnostics and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContactSolverStats {
    /// Number of contact points solved.
    pub contact_count: usize,
    /// Velocity iterations executed.
    pub iterations: usize,
}

/// One prepared contact constraint.
struct Constraint {
    /// Index of the owning manifold in the cache.
    manifold: usize,
    /// Index of the point within the manifold.
    point: usize,
    body_a: usize,
    body_b: usize,
    /// Lever arm from body a's origin to the contact, world frame.
    ra: Vector3<f64>,
    /// Lever arm from body b's origin to the contact, world frame.
    rb: Vector3<f64>,
    normal: Vector3<f64>,
    tangents: [Vector3<f64>; 2],
    /// Effective mass along the normal.
    normal_mass: f64,
    /// Effective masses along the tangents.
    tangent_mass: [f64; 2],
    /// Target separation speed from restitution and Baumgarte correction.
    bias: f64,
    /// Accumulated normal impulse.
    lambda_n: f64,
    /// Accumulated tangent impulses.
    lambda_t: [f64; 2],
}

/// The sequential-impulse solver.
#[derive(Debug, Clone, Default)]
pub struct ContactSolver {
    config: SolverConfig,
}

impl ContactSolver {
    /// Create a solver with the given configuration.
    #[must_use]
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Replace the configuration.
    pub fn set_config(&mut self, config: SolverConfig) {
        self.config = config;
    }

    /// Solve all manifolds in the cache against the body slice.
    ///
    /// Body velocities are updated in place; accumulated impulses are
    /// written back into the manifold points for next-step warm starting.
    /// `dt` must be positive (a zero-dt step never reaches the solver).
    pub fn solve(
        &self,
        dt: f64,
        bodies: &mut [SolverBody],
        manifolds: &mut ManifoldCache,
    ) -> ContactSolverStats {
        let mut constraints = self.prepare(dt, bodies, manifolds);
        if constraints.is_empty() {
            return ContactSolverStats::default();
        }

        if self.config.warm_starting {
            for c in &mut constraints {
                Self::warm_start(bodies, c);
            }
        }

        for _ in 0..self.config.velocity_iterations {
            for c in &mut constraints {
                self.iterate(bodies, c);
            }
        }

        // Persist accumulated impulses for warm starting.
        let mut cache: Vec<_> = manifolds.iter_mut().collect();
        for c in &constraints {
            let point = &mut cache[c.manifold].points[c.point];
            point.normal_impulse = c.lambda_n;
            point.tangent_impulse = c.lambda_t;
        }

        let stats = ContactSolverStats {
            contact_count: constraints.len(),
            iterations: self.config.velocity_iterations,
        };
        debug!(
            contacts = stats.contact_count,
            iterations = stats.iterations,
            "contact solve"
        );
        stats
    }

    fn prepare(
        &self,
        dt: f64,
        bodies: &[SolverBody],
        manifolds: &ManifoldCache,
    ) -> Vec<Constraint> {
        let mut constraints = Vec::new();

        for (m_index, manifold) in manifolds.iter().enumerate() {
            let body_a = manifold.pair.0.index() as usize;
            let body_b = manifold.pair.1.index() as usize;
            debug_assert!(body_a < bodies.len() && body_b < bodies.len());

            let a = &bodies[body_a];
            let b = &bodies[body_b];
            if !a.is_dynamic() && !b.is_dynamic() {
                continue;
            }

            for (p_index, point) in manifold.points.iter().enumerate() {
                let world_a = a.pose.transform_point(&point.local_anchor_a);
                let world_b = b.pose.transform_point(&point.local_anchor_b);
                let ra = world_a - a.pose.position;
                let rb = world_b - b.pose.position;
                let normal = point.normal;
                let tangents = tangent_basis(&normal);

                let normal_mass = effective_mass(a, b, &ra, &rb, &normal);
                let tangent_mass = [
                    effective_mass(a, b, &ra, &rb, &tangents[0]),
                    effective_mass(a, b, &ra, &rb, &tangents[1]),
                ];

                // Approach speed at prepare time drives restitution.
                let vn = relative_velocity(a, b, &ra, &rb).dot(&normal);
                let mut bias = 0.0;
                if self.config.restitution > 0.0 && -vn > self.config.restitution_threshold {
                    bias = -self.config.restitution * vn;
                }
                let correction = (point.penetration - self.config.slop).max(0.0);
                if correction > 0.0 {
                    bias += self.config.baumgarte / dt * correction;
                }

                let (lambda_n, lambda_t) = if self.config.warm_starting {
                    (
                        finite_or_zero(point.normal_impulse),
                        [
                            finite_or_zero(point.tangent_impulse[0]),
                            finite_or_zero(point.tangent_impulse[1]),
                        ],
                    )
                } else {
                    (0.0, [0.0, 0.0])
                };

                constraints.push(Constraint {
                    manifold: m_index,
                    point: p_index,
                    body_a,
                    body_b,
                    ra,
                    rb,
                    normal,
                    tangents,
                    normal_mass,
                    tangent_mass,
                    bias,
                    lambda_n,
                    lambda_t,
                });
            }
        }
        constraints
    }

    fn warm_start(bodies: &mut [SolverBody], c: &Constraint) {
        let impulse = c.normal * c.lambda_n
            + c.tangents[0] * c.lambda_t[0]
            + c.tangents[1] * c.lambda_t[1];
        apply_impulse(bodies, c, &impulse);
    }

    fn iterate(&self, bodies: &mut [SolverBody], c: &mut Constraint) {
        // Normal: push accumulated impulse toward the bias speed, never
        // letting the total go negative (contacts cannot pull).
        {
            let vn = {
                let a = &bodies[c.body_a];
                let b = &bodies[c.body_b];
                relative_velocity(a, b, &c.ra, &c.rb).dot(&c.normal)
            };
            let delta = finite_or_zero(-c.normal_mass * (vn - c.bias));
            let new_total = (c.lambda_n + delta).max(0.0);
            let applied = new_total - c.lambda_n;
            c.lambda_n = new_total;
            let impulse = c.normal * applied;
            apply_impulse(bodies, c, &impulse);
        }

        // Friction: clamp each tangent's accumulated impulse to the cone.
        let max_friction = self.config.friction * c.lambda_n;
        for k in 0..2 {
            let vt = {
                let a = &bodies[c.body_a];
                let b = &bodies[c.body_b];
                relative_velocity(a, b, &c.ra, &c.rb).dot(&c.tangents[k])
            };
            let delta = finite_or_zero(-c.tangent_mass[k] * vt);
            let new_total = (c.lambda_t[k] + delta).clamp(-max_friction, max_friction);
            let applied = new_total - c.lambda_t[k];
            c.lambda_t[k] = new_total;
            let impulse = c.tangents[k] * applied;
            apply_impulse(bodies, c, &impulse);
        }
    }
}

/// Relative velocity of the contact point as seen from body b minus body a.
fn relative_velocity(
    a: &SolverBody,
    b: &SolverBody,
    ra: &Vector3<f64>,
    rb: &Vector3<f64>,
) -> Vector3<f64> {
    b.velocity.velocity_at_point(rb) - a.velocity.velocity_at_point(ra)
}

/// Inverse of the contact-space mass along a direction.
fn effective_mass(
    a: &SolverBody,
    b: &SolverBody,
    ra: &Vector3<f64>,
    rb: &Vector3<f64>,
    dir: &Vector3<f64>,
) -> f64 {
    let ra_cross = ra.cross(dir);
    let rb_cross = rb.cross(dir);
    let k = a.inverse_mass
        + b.inverse_mass
        + (a.inverse_inertia_world * ra_cross).cross(ra).dot(dir)
        + (b.inverse_inertia_world * rb_cross).cross(rb).dot(dir);
    if k > 0.0 {
        1.0 / k
    } else {
        0.0
    }
}

fn apply_impulse(bodies: &mut [SolverBody], c: &Constraint, impulse: &Vector3<f64>) {
    {
        let a = &mut bodies[c.body_a];
        a.velocity.linear -= impulse * a.inverse_mass;
        a.velocity.angular -= a.inverse_inertia_world * c.ra.cross(impulse);
    }
    {
        let b = &mut bodies[c.body_b];
        b.velocity.linear += impulse * b.inverse_mass;
        b.velocity.angular += b.inverse_inertia_world * c.rb.cross(impulse);
    }
}

/// An orthonormal tangent basis for a unit normal.
///
/// Deterministic: the same normal always yields the same basis.
fn tangent_basis(normal: &Vector3<f64>) -> [Vector3<f64>; 2] {
    let reference = if normal.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    let t1 = normal.cross(&reference).normalize();
    let t2 = normal.cross(&t1);
    [t1, t2]
}

/// Clamp a non-finite impulse to zero so `NaN` never reaches body state.
fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
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
    use rbd_collide::{compute_contacts, ContactPoint};
    use rbd_types::{BodyHandle, Shape};

    fn sphere_body(x: f64, vx: f64) -> SolverBody {
        SolverBody::new(
            Pose::from_position(Point3::new(x, 0.0, 0.0)),
            Velocity::new(Vector3::new(vx, 0.0, 0.0), Vector3::zeros()),
            &MassProperties::sphere(1.0, 1.0),
        )
    }

    fn manifold_for(
        bodies: &[SolverBody],
        shape: &Shape,
        cache: &mut ManifoldCache,
    ) {
        let contacts = compute_contacts(shape, &bodies[0].pose, shape, &bodies[1].pose);
        cache.update_pair((BodyHandle::new(0, 0), BodyHandle::new(1, 0)), contacts);
    }

    #[test]
    fn test_head_on_collision_stops_approach() {
        let shape = Shape::sphere(1.0).unwrap();
        let mut bodies = vec![sphere_body(0.0, 1.0), sphere_body(1.8, -1.0)];
        let mut cache = ManifoldCache::new();
        manifold_for(&bodies, &shape, &mut cache);

        let solver = ContactSolver::new(SolverConfig {
            baumgarte: 0.0, // isolate the velocity constraint
            ..SolverConfig::default()
        });
        let stats = solver.solve(1.0 / 60.0, &mut bodies, &mut cache);
        assert_eq!(stats.contact_count, 1);

        // Approach speed along the normal is gone.
        let vn = (bodies[1].velocity.linear - bodies[0].velocity.linear).dot(&Vector3::x());
        assert!(vn >= -1e-9, "bodies still approaching: {vn}");
        // Momentum is conserved.
        let px = bodies[0].velocity.linear.x + bodies[1].velocity.linear.x;
        assert_relative_eq!(px, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_restitution_reflects_velocity() {
        let shape = Shape::sphere(1.0).unwrap();
        let mut bodies = vec![sphere_body(0.0, 2.0), sphere_body(1.9, -2.0)];
        let mut cache = ManifoldCache::new();
        manifold_for(&bodies, &shape, &mut cache);

        let solver = ContactSolver::new(SolverConfig {
            restitution: 1.0,
            restitution_threshold: 0.1,
            baumgarte: 0.0,
            ..SolverConfig::default()
        });
        solver.solve(1.0 / 60.0, &mut bodies, &mut cache);

        // Fully elastic head-on collision of equal masses swaps velocities.
        let vn = (bodies[1].velocity.linear - bodies[0].velocity.linear).dot(&Vector3::x());
        assert_relative_eq!(vn, 4.0, epsilon = 1e-6);
    }

    #[test]
    fn test_separating_bodies_receive_no_impulse() {
        let shape = Shape::sphere(1.0).unwrap();
        // Overlapping but flying apart.
        let mut bodies = vec![sphere_body(0.0, -1.0), sphere_body(1.8, 1.0)];
        let mut cache = ManifoldCache::new();
        manifold_for(&bodies, &shape, &mut cache);

        let solver = ContactSolver::new(SolverConfig {
            baumgarte: 0.0,
            ..SolverConfig::default()
        });
        solver.solve(1.0 / 60.0, &mut bodies, &mut cache);

        let manifold = cache.iter().next().unwrap();
        assert_eq!(manifold.points[0].normal_impulse, 0.0);
        assert_relative_eq!(bodies[0].velocity.linear.x, -1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_normal_impulse_never_negative() {
        let shape = Shape::sphere(1.0).unwrap();
        let mut bodies = vec![sphere_body(0.0, 1.0), sphere_body(1.8, -1.0)];
        let mut cache = ManifoldCache::new();
        manifold_for(&bodies, &shape, &mut cache);

        let solver = ContactSolver::new(SolverConfig::default());
        solver.solve(1.0 / 60.0, &mut bodies, &mut cache);

        for manifold in cache.iter() {
            for point in &manifold.points {
                assert!(point.normal_impulse >= 0.0);
            }
        }
    }

    #[test]
    fn test_friction_impulse_stays_in_cone() {
        // Box sliding sideways on a static ground slab.
        let ground_shape = Shape::cuboid(Vector3::new(50.0, 0.5, 50.0)).unwrap();
        let cube_shape = Shape::cuboid(Vector3::new(0.5, 0.5, 0.5)).unwrap();

        let ground = SolverBody::new(
            Pose::identity(),
            Velocity::zero(),
            &MassProperties::static_body(),
        );
        let cube = SolverBody::new(
            Pose::from_position(Point3::new(0.0, 0.99, 0.0)),
            Velocity::new(Vector3::new(3.0, -0.5, 0.0), Vector3::zeros()),
            &MassProperties::cuboid(1.0, Vector3::new(0.5, 0.5, 0.5)),
        );
        let mut bodies = vec![ground, cube];

        let contacts = compute_contacts(
            &ground_shape,
            &bodies[0].pose,
            &cube_shape,
            &bodies[1].pose,
        );
        assert!(!contacts.is_empty());
        let mut cache = ManifoldCache::new();
        cache.update_pair((BodyHandle::new(0, 0), BodyHandle::new(1, 0)), contacts);

        let config = SolverConfig::default();
        let solver = ContactSolver::new(config);
        solver.solve(1.0 / 60.0, &mut bodies, &mut cache);

        for manifold in cache.iter() {
            for point in &manifold.points {
                let tangent_mag = (point.tangent_impulse[0].powi(2)
                    + point.tangent_impulse[1].powi(2))
                .sqrt();
                // Per-axis clamp admits up to sqrt(2) of the cone radius.
                assert!(
                    tangent_mag
                        <= config.friction * point.normal_impulse * std::f64::consts::SQRT_2
                            + 1e-9
                );
            }
        }
        // Friction slows the slide.
        assert!(bodies[1].velocity.linear.x < 3.0);
    }

    #[test]
    fn test_static_body_velocity_unchanged() {
        let shape = Shape::sphere(1.0).unwrap();
        let ground = SolverBody::new(
            Pose::identity(),
            Velocity::zero(),
            &MassProperties::static_body(),
        );
        let ball = SolverBody::new(
            Pose::from_position(Point3::new(0.0, 1.8, 0.0)),
            Velocity::new(Vector3::new(0.0, -1.0, 0.0), Vector3::zeros()),
            &MassProperties::sphere(1.0, 1.0),
        );
        let mut bodies = vec![ground, ball];

        let contacts = compute_contacts(&shape, &bodies[0].pose, &shape, &bodies[1].pose);
        let mut cache = ManifoldCache::new();
        cache.update_pair((BodyHandle::new(0, 0), BodyHandle::new(1, 0)), contacts);

        let solver = ContactSolver::new(SolverConfig::default());
        solver.solve(1.0 / 60.0, &mut bodies, &mut cache);

        assert_eq!(bodies[0].velocity.linear, Vector3::zeros());
        assert_eq!(bodies[0].velocity.angular, Vector3::zeros());
        assert!(bodies[1].velocity.linear.y >= 0.0 - 1e-9);
    }

    #[test]
    fn test_nan_velocity_clamps_impulse_to_zero() {
        let shape = Shape::sphere(1.0).unwrap();
        let mut bodies = vec![sphere_body(0.0, f64::NAN), sphere_body(1.8, 0.0)];
        let mut cache = ManifoldCache::new();
        manifold_for(&bodies, &shape, &mut cache);

        let solver = ContactSolver::new(SolverConfig {
            baumgarte: 0.0,
            ..SolverConfig::default()
        });
        solver.solve(1.0 / 60.0, &mut bodies, &mut cache);

        // The poisoned constraint contributes nothing instead of spreading
        // NaN through the accumulated impulses.
        for manifold in cache.iter() {
            for point in &manifold.points {
                assert!(point.normal_impulse.is_finite());
                assert!(point.tangent_impulse.iter().all(|t| t.is_finite()));
            }
        }
        assert!(bodies[1].velocity.linear.x.is_finite());
    }

    #[test]
    fn test_warm_start_applies_cached_impulse() {
        let shape = Shape::sphere(1.0).unwrap();
        let mut bodies = vec![sphere_body(0.0, 0.0), sphere_body(1.8, 0.0)];
        let mut cache = ManifoldCache::new();

        let mut contacts: Vec<ContactPoint> =
            compute_contacts(&shape, &bodies[0].pose, &shape, &bodies[1].pose);
        contacts[0].normal_impulse = 0.5;
        cache.update_pair((BodyHandle::new(0, 0), BodyHandle::new(1, 0)), contacts);

        let solver = ContactSolver::new(SolverConfig {
            velocity_iterations: 1,
            baumgarte: 0.0,
            ..SolverConfig::default()
        });
        solver.solve(1.0 / 60.0, &mut bodies, &mut cache);

        // Warm starting pushed the resting pair apart along +-x before the
        // iteration could pull back more than it applied.
        assert!(bodies[0].velocity.linear.x <= 0.0);
        assert!(bodies[1].velocity.linear.x >= 0.0);
    }
}
