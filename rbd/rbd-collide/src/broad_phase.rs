//! Broad-phase collision detection.
//!
//! The broad phase maintains a persistent index of body proxies (handle +
//! world AABB) and answers one query: which pairs of proxies have overlapping
//! bounds? It may report pairs that the narrow phase later rejects (false
//! positives), but it never misses a truly overlapping pair.
//!
//! # Algorithms
//!
//! Two interchangeable algorithms sit behind [`BroadPhase`]:
//!
//! 1. Brute force: test all pairs, O(n²). Wins for small scenes.
//! 2. Sweep-and-prune: sort proxy intervals on the axis with the largest
//!    positional spread and sweep, O(n log n + k).
//!
//! [`BroadPhaseAlgorithm::Auto`] switches between them on proxy count.
//!
//! # Example
//!
//! ```
//! use rbd_collide::{Aabb, BroadPhase};
//! use rbd_types::BodyHandle;
//! use nalgebra::{Point3, Vector3};
//!
//! let mut broad = BroadPhase::default();
//! let a = BodyHandle::new(0, 0);
//! let b = BodyHandle::new(1, 0);
//! broad.insert(a, Aabb::from_center(Point3::origin(), Vector3::new(1.0, 1.0, 1.0)), false);
//! broad.insert(b, Aabb::from_center(Point3::new(1.5, 0.0, 0.0), Vector3::new(1.0, 1.0, 1.0)), false);
//!
//! assert_eq!(broad.overlapping_pairs(), vec![(a, b)]);
//! ```

use hashbrown::HashMap;
use rbd_types::BodyHandle;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::aabb::{Aabb, Axis};

/// Broad-phase algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BroadPhaseAlgorithm {
    /// Automatically choose based on proxy count.
    #[default]
    Auto,
    /// Always use brute force O(n²).
    BruteForce,
    /// Always use sweep-and-prune O(n log n).
    SweepAndPrune,
}

/// Configuration for broad-phase collision detection.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BroadPhaseConfig {
    /// Algorithm to use for pair queries.
    pub algorithm: BroadPhaseAlgorithm,
    /// Margin to add to AABBs for predictive detection.
    pub margin: f64,
    /// Proxy count below which `Auto` uses brute force.
    pub brute_force_threshold: usize,
}

impl Default for BroadPhaseConfig {
    fn default() -> Self {
        Self {
            algorithm: BroadPhaseAlgorithm::Auto,
            margin: 0.0,
            brute_force_threshold: 32,
        }
    }
}

/// A proxy tracked by the broad phase.
#[derive(Debug, Clone, Copy)]
struct Proxy {
    handle: BodyHandle,
    aabb: Aabb,
    is_static: bool,
}

/// An interval on the sweep axis.
#[derive(Debug, Clone, Copy)]
struct Interval {
    /// Index into the proxy array.
    proxy_index: usize,
    /// Minimum endpoint on the sweep axis.
    min: f64,
    /// Maximum endpoint on the sweep axis.
    max: f64,
}

/// Persistent broad-phase index over body AABBs.
///
/// Proxies are inserted once, updated as bodies move, and removed when
/// bodies leave the world. Pair queries are deterministic: the result is
/// sorted, with each pair's lower handle first.
#[derive(Debug, Clone, Default)]
pub struct BroadPhase {
    config: BroadPhaseConfig,
    /// Proxies in insertion order. Removal swaps from the back.
    proxies: Vec<Proxy>,
    /// Handle to position in `proxies`.
    index: HashMap<BodyHandle, usize>,
    /// Scratch space for the sweep, reused across queries.
    intervals: Vec<Interval>,
}

impl BroadPhase {
    /// Create a broad phase with the given configuration.
    #[must_use]
    pub fn new(config: BroadPhaseConfig) -> Self {
        Self {
            config,
            proxies: Vec::new(),
            index: HashMap::new(),
            intervals: Vec::new(),
        }
    }

    /// Number of tracked proxies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    /// True if no proxies are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    /// Insert a proxy, or replace its bounds if the handle is already
    /// tracked.
    pub fn insert(&mut self, handle: BodyHandle, aabb: Aabb, is_static: bool) {
        if let Some(&pos) = self.index.get(&handle) {
            self.proxies[pos] = Proxy {
                handle,
                aabb,
                is_static,
            };
            return;
        }
        self.index.insert(handle, self.proxies.len());
        self.proxies.push(Proxy {
            handle,
            aabb,
            is_static,
        });
    }

    /// Update the bounds of a tracked proxy. Unknown handles are ignored.
    pub fn update(&mut self, handle: BodyHandle, aabb: Aabb) {
        if let Some(&pos) = self.index.get(&handle) {
            self.proxies[pos].aabb = aabb;
        }
    }

    /// Remove a proxy. Returns whether the handle was tracked.
    pub fn remove(&mut self, handle: BodyHandle) -> bool {
        let Some(pos) = self.index.remove(&handle) else {
            return false;
        };
        self.proxies.swap_remove(pos);
        if pos < self.proxies.len() {
            self.index.insert(self.proxies[pos].handle, pos);
        }
        true
    }

    /// Find all pairs of proxies with overlapping bounds.
    ///
    /// Static-static pairs are never reported. The result is canonically
    /// ordered: within each pair the lower handle comes first, and the list
    /// is sorted, so identical scenes always yield identical pair lists.
    pub fn overlapping_pairs(&mut self) -> Vec<(BodyHandle, BodyHandle)> {
        let use_sweep = match self.config.algorithm {
            BroadPhaseAlgorithm::Auto => self.proxies.len() >= self.config.brute_force_threshold,
            BroadPhaseAlgorithm::BruteForce => false,
            BroadPhaseAlgorithm::SweepAndPrune => true,
        };

        let mut pairs = if use_sweep {
            self.sweep_pairs()
        } else {
            self.brute_force_pairs()
        };

        for pair in &mut pairs {
            if pair.1 < pair.0 {
                *pair = (pair.1, pair.0);
            }
        }
        pairs.sort_unstable();
        pairs
    }

    fn expanded(&self, aabb: &Aabb) -> Aabb {
        if self.config.margin > 0.0 {
            aabb.expanded(self.config.margin)
        } else {
            *aabb
        }
    }

    fn brute_force_pairs(&self) -> Vec<(BodyHandle, BodyHandle)> {
        let mut pairs = Vec::new();
        for (i, a) in self.proxies.iter().enumerate() {
            let aabb_a = self.expanded(&a.aabb);
            for b in self.proxies.iter().skip(i + 1) {
                if a.is_static && b.is_static {
                    continue;
                }
                if aabb_a.overlaps(&self.expanded(&b.aabb)) {
                    pairs.push((a.handle, b.handle));
                }
            }
        }
        pairs
    }

    /// Choose the sweep axis by proxy-center spread.
    ///
    /// The axis with the largest spread tends to minimize the number of
    /// overlapping intervals.
    fn choose_sweep_axis(&self) -> Axis {
        let mut min = [f64::INFINITY; 3];
        let mut max = [f64::NEG_INFINITY; 3];
        for proxy in &self.proxies {
            let center = proxy.aabb.center();
            for (k, c) in [center.x, center.y, center.z].into_iter().enumerate() {
                min[k] = min[k].min(c);
                max[k] = max[k].max(c);
            }
        }
        let extent = [max[0] - min[0], max[1] - min[1], max[2] - min[2]];
        if extent[0] >= extent[1] && extent[0] >= extent[2] {
            Axis::X
        } else if extent[1] >= extent[2] {
            Axis::Y
        } else {
            Axis::Z
        }
    }

    fn sweep_pairs(&mut self) -> Vec<(BodyHandle, BodyHandle)> {
        let axis = self.choose_sweep_axis();

        self.intervals.clear();
        for (proxy_index, proxy) in self.proxies.iter().enumerate() {
            let aabb = self.expanded(&proxy.aabb);
            self.intervals.push(Interval {
                proxy_index,
                min: aabb.min_on_axis(axis),
                max: aabb.max_on_axis(axis),
            });
        }

        // Sort by minimum endpoint. Rust's adaptive sort is near O(n) on the
        // nearly-sorted data produced by temporal coherence.
        self.intervals.sort_by(|a, b| {
            a.min
                .partial_cmp(&b.min)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut pairs = Vec::new();
        let n = self.intervals.len();
        for i in 0..n {
            let interval_i = self.intervals[i];
            let proxy_i = self.proxies[interval_i.proxy_index];
            let aabb_i = self.expanded(&proxy_i.aabb);

            for j in (i + 1)..n {
                let interval_j = self.intervals[j];

                // Past the end of i's interval: no more overlaps possible.
                if interval_j.min > interval_i.max {
                    break;
                }

                let proxy_j = self.proxies[interval_j.proxy_index];
                if proxy_i.is_static && proxy_j.is_static {
                    continue;
                }

                // Confirm on all three axes to cut false positives.
                if aabb_i.overlaps(&self.expanded(&proxy_j.aabb)) {
                    pairs.push((proxy_i.handle, proxy_j.handle));
                }
            }
        }
        pairs
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    clippy::similar_names,
    clippy::cast_precision_loss
)]
mod tests {
    use super::*;
    use nalgebra::{Point3, Vector3};

    fn handle(i: u32) -> BodyHandle {
        BodyHandle::new(i, 0)
    }

    fn sphere_aabb(pos: Point3<f64>, radius: f64) -> Aabb {
        Aabb::from_center(pos, Vector3::new(radius, radius, radius))
    }

    #[test]
    fn test_finds_overlapping_spheres() {
        let mut broad = BroadPhase::default();
        broad.insert(handle(1), sphere_aabb(Point3::new(0.0, 0.0, 0.0), 1.0), false);
        broad.insert(handle(2), sphere_aabb(Point3::new(1.5, 0.0, 0.0), 1.0), false);

        let pairs = broad.overlapping_pairs();
        assert_eq!(pairs, vec![(handle(1), handle(2))]);
    }

    #[test]
    fn test_no_overlap() {
        let mut broad = BroadPhase::default();
        broad.insert(handle(1), sphere_aabb(Point3::new(0.0, 0.0, 0.0), 1.0), false);
        broad.insert(handle(2), sphere_aabb(Point3::new(5.0, 0.0, 0.0), 1.0), false);

        assert!(broad.overlapping_pairs().is_empty());
    }

    #[test]
    fn test_skips_static_static() {
        let mut broad = BroadPhase::default();
        broad.insert(handle(1), sphere_aabb(Point3::origin(), 1.0), true);
        broad.insert(handle(2), sphere_aabb(Point3::new(0.5, 0.0, 0.0), 1.0), true);

        assert!(
            broad.overlapping_pairs().is_empty(),
            "static-static pairs should be skipped"
        );
    }

    #[test]
    fn test_includes_static_dynamic() {
        let mut broad = BroadPhase::default();
        broad.insert(handle(1), sphere_aabb(Point3::origin(), 1.0), true);
        broad.insert(handle(2), sphere_aabb(Point3::new(0.5, 0.0, 0.0), 1.0), false);

        assert_eq!(broad.overlapping_pairs().len(), 1);
    }

    #[test]
    fn test_update_moves_proxy() {
        let mut broad = BroadPhase::default();
        broad.insert(handle(1), sphere_aabb(Point3::origin(), 1.0), false);
        broad.insert(handle(2), sphere_aabb(Point3::new(5.0, 0.0, 0.0), 1.0), false);
        assert!(broad.overlapping_pairs().is_empty());

        broad.update(handle(2), sphere_aabb(Point3::new(1.0, 0.0, 0.0), 1.0));
        assert_eq!(broad.overlapping_pairs().len(), 1);
    }

    #[test]
    fn test_remove_drops_pairs() {
        let mut broad = BroadPhase::default();
        broad.insert(handle(1), sphere_aabb(Point3::origin(), 1.0), false);
        broad.insert(handle(2), sphere_aabb(Point3::new(1.0, 0.0, 0.0), 1.0), false);
        broad.insert(handle(3), sphere_aabb(Point3::new(2.0, 0.0, 0.0), 1.0), false);
        assert_eq!(broad.len(), 3);

        assert!(broad.remove(handle(2)));
        assert!(!broad.remove(handle(2)), "double remove reports false");
        assert_eq!(broad.len(), 2);

        // 1 and 3 still touch at x = 1.0 (radius 1 each, centers 2 apart).
        assert_eq!(broad.overlapping_pairs(), vec![(handle(1), handle(3))]);
    }

    #[test]
    fn test_degenerate_aabb_proxy() {
        let mut broad = BroadPhase::default();
        let point = Aabb::new(Point3::new(0.5, 0.0, 0.0), Point3::new(0.5, 0.0, 0.0));
        broad.insert(handle(1), point, false);
        broad.insert(handle(2), sphere_aabb(Point3::origin(), 1.0), false);

        assert_eq!(
            broad.overlapping_pairs().len(),
            1,
            "degenerate proxies must still report overlaps"
        );
    }

    #[test]
    fn test_brute_force_matches_sweep() {
        let positions: Vec<Point3<f64>> = (0..40)
            .map(|i| {
                let f = f64::from(i);
                Point3::new((f * 0.73).sin() * 10.0, (f * 1.31).cos() * 10.0, f * 0.5)
            })
            .collect();

        let mut brute = BroadPhase::new(BroadPhaseConfig {
            algorithm: BroadPhaseAlgorithm::BruteForce,
            ..BroadPhaseConfig::default()
        });
        let mut sweep = BroadPhase::new(BroadPhaseConfig {
            algorithm: BroadPhaseAlgorithm::SweepAndPrune,
            ..BroadPhaseConfig::default()
        });
        for (i, pos) in positions.iter().enumerate() {
            let aabb = sphere_aabb(*pos, 2.0);
            brute.insert(handle(i as u32), aabb, false);
            sweep.insert(handle(i as u32), aabb, false);
        }

        assert_eq!(brute.overlapping_pairs(), sweep.overlapping_pairs());
    }

    #[test]
    fn test_pairs_canonically_ordered() {
        let mut broad = BroadPhase::default();
        // Insert in descending handle order.
        broad.insert(handle(9), sphere_aabb(Point3::origin(), 1.0), false);
        broad.insert(handle(3), sphere_aabb(Point3::new(0.5, 0.0, 0.0), 1.0), false);
        broad.insert(handle(7), sphere_aabb(Point3::new(1.0, 0.0, 0.0), 1.0), false);

        let pairs = broad.overlapping_pairs();
        assert!(pairs.iter().all(|(a, b)| a < b));
        let mut sorted = pairs.clone();
        sorted.sort_unstable();
        assert_eq!(pairs, sorted);
    }

    #[test]
    fn test_margin_expands_detection() {
        let config = BroadPhaseConfig {
            margin: 0.2,
            ..BroadPhaseConfig::default()
        };
        let mut with_margin = BroadPhase::new(config);
        let mut without = BroadPhase::default();

        // Just barely not touching.
        for broad in [&mut with_margin, &mut without] {
            broad.insert(handle(1), sphere_aabb(Point3::origin(), 1.0), false);
            broad.insert(handle(2), sphere_aabb(Point3::new(2.1, 0.0, 0.0), 1.0), false);
        }

        assert!(without.overlapping_pairs().is_empty());
        assert_eq!(with_margin.overlapping_pairs().len(), 1);
    }
}
