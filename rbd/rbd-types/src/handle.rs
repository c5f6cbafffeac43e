//! Generational handles for worlds, shapes, and bodies.
//!
//! A handle is an index plus a generation counter. Slots are recycled after
//! destruction, and the generation is bumped on every recycle, so a handle
//! held past the lifetime of its object fails lookup instead of silently
//! aliasing whatever reused the slot.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Handle to a simulation world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WorldHandle {
    index: u32,
    generation: u32,
}

/// Handle to a shared collision shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ShapeHandle {
    index: u32,
    generation: u32,
}

/// Handle to a rigid body within a world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BodyHandle {
    index: u32,
    generation: u32,
}

macro_rules! handle_impl {
    ($name:ident, $label:literal) => {
        impl $name {
            /// Create a handle from a slot index and generation.
            #[must_use]
            pub fn new(index: u32, generation: u32) -> Self {
                Self { index, generation }
            }

            /// Slot index into the owning arena.
            #[must_use]
            pub fn index(self) -> u32 {
                self.index
            }

            /// Generation the slot had when this handle was issued.
            #[must_use]
            pub fn generation(self) -> u32 {
                self.generation
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "#{}v{}"), self.index, self.generation)
            }
        }
    };
}

handle_impl!(WorldHandle, "world");
handle_impl!(ShapeHandle, "shape");
handle_impl!(BodyHandle, "body");

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_accessors() {
        let h = BodyHandle::new(3, 7);
        assert_eq!(h.index(), 3);
        assert_eq!(h.generation(), 7);
    }

    #[test]
    fn test_handle_equality_requires_generation() {
        let a = BodyHandle::new(0, 1);
        let b = BodyHandle::new(0, 2);
        assert_ne!(a, b);
        assert_eq!(a, BodyHandle::new(0, 1));
    }

    #[test]
    fn test_handle_display() {
        assert_eq!(WorldHandle::new(1, 0).to_string(), "world#1v0");
        assert_eq!(ShapeHandle::new(2, 4).to_string(), "shape#2v4");
        assert_eq!(BodyHandle::new(5, 9).to_string(), "body#5v9");
    }

    #[test]
    fn test_handle_ordering_by_index_first() {
        let mut handles = vec![
            BodyHandle::new(2, 0),
            BodyHandle::new(0, 5),
            BodyHandle::new(1, 1),
        ];
        handles.sort();
        assert_eq!(handles[0].index(), 0);
        assert_eq!(handles[2].index(), 2);
    }
}
