//! Error types for physics operations.

use thiserror::Error;

/// Errors reported by the physics engine.
///
/// Errors are synchronous and final: a failed call has not mutated any
/// simulation state, and retrying with the same arguments fails the same way.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PhysicsError {
    /// A caller-supplied value was out of range or non-finite.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// Description of the offending argument.
        reason: String,
    },

    /// A handle referenced an object that does not exist or was destroyed.
    #[error("invalid {kind} handle")]
    InvalidHandle {
        /// What kind of handle failed lookup ("world", "shape", "body").
        kind: &'static str,
    },

    /// An operation was attempted on a world that is not yet configured.
    #[error("world not ready: configure it before stepping")]
    NotReady,

    /// The step timestep was not finite and non-negative.
    #[error("invalid timestep: {0} (must be finite and non-negative)")]
    InvalidTimestep(f64),

    /// Non-finite body state was detected (`NaN` or `Inf`).
    #[error("simulation diverged: {reason}")]
    Diverged {
        /// Description of what went non-finite.
        reason: String,
    },
}

impl PhysicsError {
    /// Create an invalid-argument error.
    #[must_use]
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Create an invalid-handle error for the given handle kind.
    #[must_use]
    pub fn invalid_handle(kind: &'static str) -> Self {
        Self::InvalidHandle { kind }
    }

    /// Create a diverged error.
    #[must_use]
    pub fn diverged(reason: impl Into<String>) -> Self {
        Self::Diverged {
            reason: reason.into(),
        }
    }

    /// Check if this is an invalid-handle error.
    #[must_use]
    pub fn is_invalid_handle(&self) -> bool {
        matches!(self, Self::InvalidHandle { .. })
    }

    /// Check if this is a divergence error.
    #[must_use]
    pub fn is_diverged(&self) -> bool {
        matches!(self, Self::Diverged { .. })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PhysicsError::invalid_argument("mass must be non-negative");
        assert!(err.to_string().contains("mass"));

        let err = PhysicsError::invalid_handle("body");
        assert!(err.to_string().contains("body"));

        let err = PhysicsError::InvalidTimestep(f64::NAN);
        assert!(err.to_string().contains("timestep"));

        let err = PhysicsError::diverged("NaN in velocity");
        assert!(err.to_string().contains("NaN"));
    }

    #[test]
    fn test_error_predicates() {
        let err = PhysicsError::invalid_handle("world");
        assert!(err.is_invalid_handle());
        assert!(!err.is_diverged());

        let err = PhysicsError::diverged("test");
        assert!(err.is_diverged());
        assert!(!err.is_invalid_handle());

        assert!(!PhysicsError::NotReady.is_diverged());
    }
}
