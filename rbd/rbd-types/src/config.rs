//! World and solver configuration.

use nalgebra::Vector3;

use crate::error::PhysicsError;
use crate::Result;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Top-level world configuration.
///
/// # Example
///
/// ```
/// use rbd_types::WorldConfig;
/// use nalgebra::Vector3;
///
/// let config = WorldConfig::default().with_gravity(Vector3::new(0.0, -10.0, 0.0));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WorldConfig {
    /// Gravitational acceleration applied to every dynamic body, m/s².
    pub gravity: Vector3<f64>,
    /// Contact solver settings.
    pub solver: SolverConfig,
}

impl WorldConfig {
    /// Replace the gravity vector.
    #[must_use]
    pub fn with_gravity(mut self, gravity: Vector3<f64>) -> Self {
        self.gravity = gravity;
        self
    }

    /// Replace the solver settings.
    #[must_use]
    pub fn with_solver(mut self, solver: SolverConfig) -> Self {
        self.solver = solver;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::InvalidArgument`] for non-finite gravity, or
    /// propagates solver validation failures.
    pub fn validate(&self) -> Result<()> {
        if self.gravity.iter().any(|g| !g.is_finite()) {
            return Err(PhysicsError::invalid_argument(format!(
                "gravity must be finite, got {:?}",
                self.gravity
            )));
        }
        self.solver.validate()
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity: Vector3::new(0.0, -10.0, 0.0),
            solver: SolverConfig::default(),
        }
    }
}

/// Sequential-impulse solver settings.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolverConfig {
    /// Velocity iterations per step.
    pub velocity_iterations: usize,
    /// Baumgarte positional correction factor in `[0, 1]`.
    pub baumgarte: f64,
    /// Penetration slop, m. Overlap below this depth draws no correction.
    pub slop: f64,
    /// Approach speed below which restitution is suppressed, m/s.
    pub restitution_threshold: f64,
    /// Coefficient of restitution applied at every contact.
    pub restitution: f64,
    /// Coulomb friction coefficient applied at every contact.
    pub friction: f64,
    /// Seed contacts with the previous step's accumulated impulses.
    pub warm_starting: bool,
}

impl SolverConfig {
    /// Higher iteration count for deep stacks.
    #[must_use]
    pub fn high_accuracy() -> Self {
        Self {
            velocity_iterations: 24,
            ..Self::default()
        }
    }

    /// Reduced iteration count for large scenes where speed wins.
    #[must_use]
    pub fn fast() -> Self {
        Self {
            velocity_iterations: 4,
            ..Self::default()
        }
    }

    /// Validate the solver settings.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::InvalidArgument`] for zero iterations or
    /// out-of-range coefficients.
    pub fn validate(&self) -> Result<()> {
        if self.velocity_iterations == 0 {
            return Err(PhysicsError::invalid_argument(
                "velocity_iterations must be at least 1",
            ));
        }
        if !self.baumgarte.is_finite() || !(0.0..=1.0).contains(&self.baumgarte) {
            return Err(PhysicsError::invalid_argument(format!(
                "baumgarte must be in [0, 1], got {}",
                self.baumgarte
            )));
        }
        if !self.slop.is_finite() || self.slop < 0.0 {
            return Err(PhysicsError::invalid_argument(format!(
                "slop must be finite and non-negative, got {}",
                self.slop
            )));
        }
        if !self.restitution.is_finite() || !(0.0..=1.0).contains(&self.restitution) {
            return Err(PhysicsError::invalid_argument(format!(
                "restitution must be in [0, 1], got {}",
                self.restitution
            )));
        }
        if !self.friction.is_finite() || self.friction < 0.0 {
            return Err(PhysicsError::invalid_argument(format!(
                "friction must be finite and non-negative, got {}",
                self.friction
            )));
        }
        if !self.restitution_threshold.is_finite() || self.restitution_threshold < 0.0 {
            return Err(PhysicsError::invalid_argument(format!(
                "restitution_threshold must be finite and non-negative, got {}",
                self.restitution_threshold
            )));
        }
        Ok(())
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            velocity_iterations: 10,
            baumgarte: 0.2,
            slop: 0.005,
            restitution_threshold: 1.0,
            restitution: 0.0,
            friction: 0.5,
            warm_starting: true,
        }
    }
}
