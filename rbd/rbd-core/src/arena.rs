//! Generational slot arena.
//!
//! Objects live in slots addressed by `(index, generation)`. Removing an
//! object bumps the slot's generation, so handles issued before the removal
//! fail lookup instead of reading whatever reused the slot. Slot indices are
//! recycled in LIFO order; iteration visits live slots in index order, which
//! keeps everything built on top of the arena deterministic.

/// A generational arena of `T`.
#[derive(Debug, Clone)]
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
}

#[derive(Debug, Clone)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Arena<T> {
    /// Create an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Number of live objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if the arena holds no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots, live or vacant. Live indices are below this bound.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Insert an object, returning its slot index and generation.
    pub fn insert(&mut self, value: T) -> (u32, u32) {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            (index, slot.generation)
        } else {
            let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
            self.slots.push(Slot {
                generation: 0,
                value: Some(value),
            });
            (index, 0)
        }
    }

    /// Look up an object. Fails for vacant slots and stale generations.
    #[must_use]
    pub fn get(&self, index: u32, generation: u32) -> Option<&T> {
        let slot = self.slots.get(index as usize)?;
        if slot.generation != generation {
            return None;
        }
        slot.value.as_ref()
    }

    /// Mutable lookup. Fails for vacant slots and stale generations.
    #[must_use]
    pub fn get_mut(&mut self, index: u32, generation: u32) -> Option<&mut T> {
        let slot = self.slots.get_mut(index as usize)?;
        if slot.generation != generation {
            return None;
        }
        slot.value.as_mut()
    }

    /// Remove an object, bumping the slot generation so existing handles to
    /// it go stale. Returns the removed value.
    pub fn remove(&mut self, index: u32, generation: u32) -> Option<T> {
        let slot = self.slots.get_mut(index as usize)?;
        if slot.generation != generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index);
        self.len -= 1;
        Some(value)
    }

    /// Iterate live objects in slot-index order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value.as_ref().map(|value| {
                #[allow(clippy::cast_possible_truncation)]
                let index = index as u32;
                (index, slot.generation, value)
            })
        })
    }

    /// Iterate live objects mutably in slot-index order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (u32, u32, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(index, slot)| {
                slot.value.as_mut().map(|value| {
                    #[allow(clippy::cast_possible_truncation)]
                    let index = index as u32;
                    (index, slot.generation, value)
                })
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut arena = Arena::new();
        let (i, g) = arena.insert("a");
        assert_eq!(arena.get(i, g), Some(&"a"));
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn test_stale_handle_fails_after_remove() {
        let mut arena = Arena::new();
        let (i, g) = arena.insert(7);
        assert_eq!(arena.remove(i, g), Some(7));
        assert_eq!(arena.get(i, g), None, "stale generation must miss");
        assert_eq!(arena.remove(i, g), None, "double remove must miss");
        assert!(arena.is_empty());
    }

    #[test]
    fn test_slot_reuse_bumps_generation() {
        let mut arena = Arena::new();
        let (i0, g0) = arena.insert(1);
        arena.remove(i0, g0).unwrap();

        let (i1, g1) = arena.insert(2);
        assert_eq!(i1, i0, "freed slot is reused");
        assert_ne!(g1, g0, "reused slot has a new generation");
        assert_eq!(arena.get(i0, g0), None);
        assert_eq!(arena.get(i1, g1), Some(&2));
    }

    #[test]
    fn test_iteration_in_slot_order() {
        let mut arena = Arena::new();
        let handles: Vec<_> = (0..5).map(|v| arena.insert(v)).collect();
        arena.remove(handles[2].0, handles[2].1).unwrap();

        let values: Vec<_> = arena.iter().map(|(_, _, v)| *v).collect();
        assert_eq!(values, vec![0, 1, 3, 4]);
    }

    #[test]
    fn test_get_mut() {
        let mut arena = Arena::new();
        let (i, g) = arena.insert(10);
        *arena.get_mut(i, g).unwrap() += 5;
        assert_eq!(arena.get(i, g), Some(&15));
        assert_eq!(arena.get_mut(i, g.wrapping_add(1)), None);
    }
}
