//! Contact points and persistent manifolds.
//!
//! The narrow phase produces fresh [`ContactPoint`]s every step. Manifolds
//! make them persistent: points that survive from one step to the next keep
//! their accumulated impulses, which the solver uses for warm starting.

use nalgebra::{Point3, Vector3};
use rbd_types::BodyHandle;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use hashbrown::HashMap;

/// Maximum number of points kept per manifold.
pub const MAX_MANIFOLD_POINTS: usize = 4;

/// Distance within which a new point is considered the same contact as a
/// cached one, compared on body-local anchors.
const MATCH_TOLERANCE: f64 = 0.02;

/// A single contact between two bodies.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ContactPoint {
    /// Contact position in world coordinates.
    pub position: Point3<f64>,
    /// Unit contact normal in world coordinates, pointing from the first
    /// body toward the second.
    pub normal: Vector3<f64>,
    /// Penetration depth, m. Positive when the bodies overlap.
    pub penetration: f64,
    /// Contact position in the first body's local frame.
    pub local_anchor_a: Point3<f64>,
    /// Contact position in the second body's local frame.
    pub local_anchor_b: Point3<f64>,
    /// Accumulated normal impulse from the previous solve.
    pub normal_impulse: f64,
    /// Accumulated impulses along the two tangent directions.
    pub tangent_impulse: [f64; 2],
}

impl ContactPoint {
    /// Create a fresh contact point with zero accumulated impulses.
    #[must_use]
    pub fn new(
        position: Point3<f64>,
        normal: Vector3<f64>,
        penetration: f64,
        local_anchor_a: Point3<f64>,
        local_anchor_b: Point3<f64>,
    ) -> Self {
        Self {
            position,
            normal,
            penetration,
            local_anchor_a,
            local_anchor_b,
            normal_impulse: 0.0,
            tangent_impulse: [0.0, 0.0],
        }
    }

    /// The same contact seen from the other body: normal reversed, anchors
    /// swapped.
    #[must_use]
    pub fn flipped(mut self) -> Self {
        self.normal = -self.normal;
        std::mem::swap(&mut self.local_anchor_a, &mut self.local_anchor_b);
        self
    }
}

/// Persistent set of contact points between one pair of bodies.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ContactManifold {
    /// The two bodies in contact, lower handle first.
    pub pair: (BodyHandle, BodyHandle),
    /// Contact points, at most [`MAX_MANIFOLD_POINTS`].
    pub points: Vec<ContactPoint>,
}

impl ContactManifold {
    /// Create an empty manifold for a body pair.
    #[must_use]
    pub fn new(pair: (BodyHandle, BodyHandle)) -> Self {
        Self {
            pair,
            points: Vec::new(),
        }
    }

    /// Replace this manifold's points with a fresh narrow-phase result,
    /// carrying accumulated impulses over from matching old points.
    ///
    /// Points match when their local anchors on the first body are within a
    /// small tolerance. Incoming points are kept deepest-first and capped at
    /// [`MAX_MANIFOLD_POINTS`].
    pub fn refresh(&mut self, mut fresh: Vec<ContactPoint>) {
        fresh.sort_by(|a, b| {
            b.penetration
                .partial_cmp(&a.penetration)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        fresh.truncate(MAX_MANIFOLD_POINTS);

        for point in &mut fresh {
            if let Some(old) = self.points.iter().find(|old| {
                (old.local_anchor_a - point.local_anchor_a).norm_squared()
                    < MATCH_TOLERANCE * MATCH_TOLERANCE
            }) {
                point.normal_impulse = old.normal_impulse;
                point.tangent_impulse = old.tangent_impulse;
            }
        }
        self.points = fresh;
    }
}

/// Cache of manifolds across steps, keyed by body pair.
///
/// Manifolds are stored in insertion order and iterated in that order by the
/// solver, so solve results do not depend on hash-map iteration order.
#[derive(Debug, Clone, Default)]
pub struct ManifoldCache {
    manifolds: Vec<ContactManifold>,
    index: HashMap<(BodyHandle, BodyHandle), usize>,
    /// Pairs touched since the last sweep, parallel to `manifolds`.
    touched: Vec<bool>,
}

impl ManifoldCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live manifolds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.manifolds.len()
    }

    /// True if the cache holds no manifolds.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.manifolds.is_empty()
    }

    /// Mark the start of a narrow-phase pass. Pairs not updated before the
    /// matching [`retain_touched`](Self::retain_touched) are dropped.
    pub fn begin_refresh(&mut self) {
        for t in &mut self.touched {
            *t = false;
        }
    }

    /// Feed a pair's fresh narrow-phase points into its manifold, creating
    /// the manifold on first contact. An empty point list is a no-op, so the
    /// pair's manifold (if any) falls out at the next retain sweep.
    pub fn update_pair(&mut self, pair: (BodyHandle, BodyHandle), points: Vec<ContactPoint>) {
        if points.is_empty() {
            return;
        }
        if let Some(&pos) = self.index.get(&pair) {
            self.manifolds[pos].refresh(points);
            self.touched[pos] = true;
        } else {
            let mut manifold = ContactManifold::new(pair);
            manifold.refresh(points);
            self.index.insert(pair, self.manifolds.len());
            self.manifolds.push(manifold);
            self.touched.push(true);
        }
    }

    /// Drop every manifold not touched since [`begin_refresh`](Self::begin_refresh),
    /// preserving the insertion order of the survivors.
    pub fn retain_touched(&mut self) {
        if self.touched.iter().all(|&t| t) {
            return;
        }
        let mut kept = Vec::with_capacity(self.manifolds.len());
        self.index.clear();
        for (manifold, touched) in self.manifolds.drain(..).zip(self.touched.drain(..)) {
            if touched {
                self.index.insert(manifold.pair, kept.len());
                kept.push(manifold);
            }
        }
        self.manifolds = kept;
        self.touched = vec![true; self.manifolds.len()];
    }

    /// Remove every manifold involving a body, preserving order of the rest.
    pub fn remove_body(&mut self, handle: BodyHandle) {
        let mut kept = Vec::with_capacity(self.manifolds.len());
        let mut kept_touched = Vec::with_capacity(self.touched.len());
        self.index.clear();
        for (manifold, touched) in self.manifolds.drain(..).zip(self.touched.drain(..)) {
            if manifold.pair.0 != handle && manifold.pair.1 != handle {
                self.index.insert(manifold.pair, kept.len());
                kept.push(manifold);
                kept_touched.push(touched);
            }
        }
        self.manifolds = kept;
        self.touched = kept_touched;
    }

    /// Iterate manifolds in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ContactManifold> {
        self.manifolds.iter()
    }

    /// Iterate manifolds mutably in insertion order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ContactManifold> {
        self.manifolds.iter_mut()
    }

    /// Remove all manifolds.
    pub fn clear(&mut self) {
        self.manifolds.clear();
        self.index.clear();
        self.touched.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;

    fn handle(i: u32) -> BodyHandle {
        BodyHandle::new(i, 0)
    }

    fn point_at(x: f64, penetration: f64) -> ContactPoint {
        let p = Point3::new(x, 0.0, 0.0);
        ContactPoint::new(p, Vector3::y(), penetration, p, p)
    }

    #[test]
    fn test_flipped_reverses_normal_and_anchors() {
        let mut point = point_at(1.0, 0.1);
        point.local_anchor_b = Point3::new(9.0, 0.0, 0.0);
        let flipped = point.flipped();

        assert_eq!(flipped.normal, -Vector3::y());
        assert_eq!(flipped.local_anchor_a.x, 9.0);
        assert_eq!(flipped.local_anchor_b.x, 1.0);
    }

    #[test]
    fn test_refresh_carries_impulses_for_matching_points() {
        let mut manifold = ContactManifold::new((handle(0), handle(1)));
        let mut old = point_at(1.0, 0.1);
        old.normal_impulse = 2.5;
        old.tangent_impulse = [0.3, -0.1];
        manifold.points.push(old);

        // Same anchor within tolerance: impulses survive.
        manifold.refresh(vec![point_at(1.001, 0.12)]);
        assert_eq!(manifold.points[0].normal_impulse, 2.5);
        assert_eq!(manifold.points[0].tangent_impulse, [0.3, -0.1]);

        // Far anchor: fresh point starts cold.
        manifold.refresh(vec![point_at(5.0, 0.1)]);
        assert_eq!(manifold.points[0].normal_impulse, 0.0);
    }

    #[test]
    fn test_refresh_caps_points_deepest_first() {
        let mut manifold = ContactManifold::new((handle(0), handle(1)));
        let fresh: Vec<_> = (0..6)
            .map(|i| point_at(f64::from(i), f64::from(i) * 0.01))
            .collect();
        manifold.refresh(fresh);

        assert_eq!(manifold.points.len(), MAX_MANIFOLD_POINTS);
        assert_eq!(manifold.points[0].penetration, 0.05);
        assert!(manifold
            .points
            .windows(2)
            .all(|w| w[0].penetration >= w[1].penetration));
    }

    #[test]
    fn test_cache_drops_untouched_pairs() {
        let mut cache = ManifoldCache::new();
        cache.update_pair((handle(0), handle(1)), vec![point_at(0.0, 0.1)]);
        cache.update_pair((handle(0), handle(2)), vec![point_at(1.0, 0.1)]);
        assert_eq!(cache.len(), 2);

        cache.begin_refresh();
        cache.update_pair((handle(0), handle(2)), vec![point_at(1.0, 0.1)]);
        cache.retain_touched();

        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache.iter().next().unwrap().pair,
            (handle(0), handle(2))
        );
    }

    #[test]
    fn test_cache_preserves_insertion_order() {
        let mut cache = ManifoldCache::new();
        for i in 0..5 {
            cache.update_pair((handle(i), handle(i + 1)), vec![point_at(0.0, 0.1)]);
        }
        let pairs: Vec<_> = cache.iter().map(|m| m.pair).collect();
        assert_eq!(pairs[0], (handle(0), handle(1)));
        assert_eq!(pairs[4], (handle(4), handle(5)));
    }

    #[test]
    fn test_cache_remove_body() {
        let mut cache = ManifoldCache::new();
        cache.update_pair((handle(0), handle(1)), vec![point_at(0.0, 0.1)]);
        cache.update_pair((handle(1), handle(2)), vec![point_at(0.0, 0.1)]);
        cache.update_pair((handle(2), handle(3)), vec![point_at(0.0, 0.1)]);

        cache.remove_body(handle(1));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.iter().next().unwrap().pair, (handle(2), handle(3)));
    }
}
