//! Broad-phase collision detection.
//!
//! The broad phase reduces the O(n²) set of collider pairs to the pairs whose
//! AABBs overlap. Two strategies are provided:
//!
//! - [`NaiveBroadPhase`]: test every pair. Fine for a few dozen colliders.
//! - [`SweepAndPrune`]: keep, per axis, a sorted list of interval endpoints
//!   between steps. Frame-to-frame motion is small, so re-sorting with
//!   insertion sort is close to linear. A pair is reported only when its
//!   intervals overlap on both axes.
//!
//! Both filter pairs by collision group/mask and report them in ascending
//! collider-id order, so the downstream pipeline is deterministic.
//!
//! # Example
//!
//! ```
//! use sim2d_collision::broad_phase::{BroadPhase, Proxy, SweepAndPrune};
//! use sim2d_collision::Aabb;
//! use sim2d_types::{BodyId, ColliderId};
//! use nalgebra::{Point2, Vector2};
//!
//! let proxies = vec![
//!     Proxy::new(ColliderId::new(0), BodyId::new(0), Aabb::from_center(Point2::new(0.0, 0.0), Vector2::new(1.0, 1.0))),
//!     Proxy::new(ColliderId::new(1), BodyId::new(1), Aabb::from_center(Point2::new(1.5, 0.0), Vector2::new(1.0, 1.0))),
//! ];
//!
//! let mut sap = SweepAndPrune::new();
//! let pairs = sap.find_pairs(&proxies);
//! assert_eq!(pairs, vec![(ColliderId::new(0), ColliderId::new(1))]);
//! ```

use crate::aabb::{Aabb, Axis};
use hashbrown::{HashMap, HashSet};
use sim2d_types::{BodyId, BroadPhaseKind, ColliderId};

/// What the broad phase knows about a collider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Proxy {
    /// The collider.
    pub collider: ColliderId,
    /// Its body; colliders on the same body never pair.
    pub body: BodyId,
    /// World-space bounds.
    pub aabb: Aabb,
    /// Group bits of this collider.
    pub group: u32,
    /// Groups this collider collides with.
    pub mask: u32,
    /// Whether the body moves this step (dynamic and awake).
    ///
    /// Two inactive proxies never pair.
    pub is_active: bool,
}

impl Proxy {
    /// An active proxy colliding with every group.
    #[must_use]
    pub fn new(collider: ColliderId, body: BodyId, aabb: Aabb) -> Self {
        Self {
            collider,
            body,
            aabb,
            group: 1,
            mask: u32::MAX,
            is_active: true,
        }
    }

    /// Set group and mask bits.
    #[must_use]
    pub fn with_filter(mut self, group: u32, mask: u32) -> Self {
        self.group = group;
        self.mask = mask;
        self
    }

    /// Mark the proxy as static or sleeping.
    #[must_use]
    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Whether this proxy may pair with `other` at all.
    #[must_use]
    pub fn can_pair_with(&self, other: &Self) -> bool {
        self.body != other.body
            && (self.is_active || other.is_active)
            && (self.group & other.mask) != 0
            && (other.group & self.mask) != 0
    }
}

/// Trait for broad-phase collision detection algorithms.
pub trait BroadPhase {
    /// Find all potentially colliding collider pairs.
    ///
    /// Pairs are `(lower id, higher id)` in ascending order.
    fn find_pairs(&mut self, proxies: &[Proxy]) -> Vec<(ColliderId, ColliderId)>;

    /// Name of the strategy, for logging.
    fn name(&self) -> &'static str;
}

/// Create the broad phase selected by `kind`.
#[must_use]
pub fn create_broad_phase(kind: BroadPhaseKind) -> Box<dyn BroadPhase> {
    match kind {
        BroadPhaseKind::Naive => Box::new(NaiveBroadPhase),
        BroadPhaseKind::Sweep => Box::new(SweepAndPrune::new()),
    }
}

fn ordered(a: ColliderId, b: ColliderId) -> (ColliderId, ColliderId) {
    if a <= b { (a, b) } else { (b, a) }
}

/// All-pairs broad phase.
#[derive(Debug, Clone, Copy, Default)]
pub struct NaiveBroadPhase;

impl BroadPhase for NaiveBroadPhase {
    fn find_pairs(&mut self, proxies: &[Proxy]) -> Vec<(ColliderId, ColliderId)> {
        let mut pairs = Vec::new();
        for (i, a) in proxies.iter().enumerate() {
            for b in &proxies[i + 1..] {
                if a.can_pair_with(b) && a.aabb.overlaps(&b.aabb) {
                    pairs.push(ordered(a.collider, b.collider));
                }
            }
        }
        pairs.sort_unstable();
        pairs
    }

    fn name(&self) -> &'static str {
        "naive"
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Endpoint {
    value: f64,
    collider: ColliderId,
    is_start: bool,
}

impl Endpoint {
    /// Sort key: position, then starts before ends so touching intervals
    /// count as overlapping.
    fn precedes(&self, other: &Self) -> bool {
        self.value < other.value || (self.value == other.value && self.is_start && !other.is_start)
    }
}

/// Two-axis sweep and prune with persistent endpoint lists.
#[derive(Debug, Clone, Default)]
pub struct SweepAndPrune {
    endpoints: [Vec<Endpoint>; 2],
    /// Swaps performed by the last insertion sort, for diagnostics.
    last_swaps: usize,
}

impl SweepAndPrune {
    /// Create an empty sweep and prune.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of endpoint swaps done by the last update.
    #[must_use]
    pub fn last_swaps(&self) -> usize {
        self.last_swaps
    }

    /// Refresh endpoint values, drop removed colliders and append new ones.
    fn update_endpoints(&mut self, proxies: &[Proxy], index: &HashMap<ColliderId, usize>) {
        for axis in Axis::ALL {
            let list = &mut self.endpoints[axis.index()];
            let mut known = HashSet::with_capacity(proxies.len());
            list.retain_mut(|e| match index.get(&e.collider) {
                Some(&i) => {
                    let aabb = &proxies[i].aabb;
                    e.value = if e.is_start {
                        aabb.min_on_axis(axis)
                    } else {
                        aabb.max_on_axis(axis)
                    };
                    known.insert(e.collider);
                    true
                }
                None => false,
            });
            for proxy in proxies {
                if !known.contains(&proxy.collider) {
                    list.push(Endpoint {
                        value: proxy.aabb.min_on_axis(axis),
                        collider: proxy.collider,
                        is_start: true,
                    });
                    list.push(Endpoint {
                        value: proxy.aabb.max_on_axis(axis),
                        collider: proxy.collider,
                        is_start: false,
                    });
                }
            }
        }
    }

    /// Insertion sort; near-linear when the list is almost sorted.
    fn insertion_sort(list: &mut [Endpoint]) -> usize {
        let mut swaps = 0;
        for i in 1..list.len() {
            let mut j = i;
            while j > 0 && list[j].precedes(&list[j - 1]) {
                list.swap(j, j - 1);
                j -= 1;
                swaps += 1;
            }
        }
        swaps
    }

    /// Pairs whose intervals overlap along one axis.
    fn sweep(
        list: &[Endpoint],
        proxies: &[Proxy],
        index: &HashMap<ColliderId, usize>,
    ) -> HashSet<(ColliderId, ColliderId)> {
        let mut overlapping = HashSet::new();
        let mut active: Vec<ColliderId> = Vec::new();
        for e in list {
            if e.is_start {
                let a = &proxies[index[&e.collider]];
                for other in &active {
                    let b = &proxies[index[other]];
                    if a.can_pair_with(b) {
                        overlapping.insert(ordered(a.collider, b.collider));
                    }
                }
                active.push(e.collider);
            } else if let Some(pos) = active.iter().position(|c| *c == e.collider) {
                active.swap_remove(pos);
            }
        }
        overlapping
    }
}

impl BroadPhase for SweepAndPrune {
    fn find_pairs(&mut self, proxies: &[Proxy]) -> Vec<(ColliderId, ColliderId)> {
        let index: HashMap<ColliderId, usize> = proxies
            .iter()
            .enumerate()
            .map(|(i, p)| (p.collider, i))
            .collect();

        self.update_endpoints(proxies, &index);
        self.last_swaps = self
            .endpoints
            .iter_mut()
            .map(|list| Self::insertion_sort(list))
            .sum();

        let on_x = Self::sweep(&self.endpoints[Axis::X.index()], proxies, &index);
        let on_y = Self::sweep(&self.endpoints[Axis::Y.index()], proxies, &index);

        let mut pairs: Vec<_> = on_x.intersection(&on_y).copied().collect();
        pairs.sort_unstable();
        pairs
    }

    fn name(&self) -> &'static str {
        "sweep"
    }
}
