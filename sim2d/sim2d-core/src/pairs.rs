//! Persistent collider pairs and their contact manifolds.
//!
//! Every collider pair that may touch gets one [`Pair`] for its whole
//! lifetime. Each step the registry re-projects the cached contacts, drops
//! the stale ones and folds fresh narrow-phase results in, so contact ids
//! and warm-start multipliers survive as long as the contact stays put.

use crate::body::Body;
use crate::collider::Collider;
use hashbrown::HashSet;
use nalgebra::{Isometry2, Vector2};
use sim2d_collision::{ContactInfo, NarrowPhase, ShapeInstance, refine};
use sim2d_constraint::{ContactConstraint, ContactParams};
use sim2d_types::{BodyId, ColliderId, ContactId, ContactPoint, PairKey};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use tracing::debug;

/// Most contact points kept per pair.
pub const MAX_MANIFOLD_POINTS: usize = 2;

/// One cached contact.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifoldPoint {
    /// Stable id.
    pub id: ContactId,
    /// Latest geometry.
    pub info: ContactInfo,
    /// Normal in the frame of body A.
    pub local_normal: Vector2<f64>,
    /// Solver rows with their warm-start caches.
    pub constraint: ContactConstraint,
}

/// Up to [`MAX_MANIFOLD_POINTS`] contacts of one pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifold {
    points: SmallVec<[ManifoldPoint; MAX_MANIFOLD_POINTS]>,
}

impl Manifold {
    /// Cached contacts.
    #[must_use]
    pub fn points(&self) -> &[ManifoldPoint] {
        &self.points
    }

    /// Mutable cached contacts.
    pub fn points_mut(&mut self) -> &mut [ManifoldPoint] {
        &mut self.points
    }

    /// Number of contacts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the manifold holds no contact.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Drop every contact.
    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Fold a fresh contact in.
    ///
    /// A cached point whose body-A anchor lies within `threshold` of the new
    /// one is updated in place and keeps its id and multipliers. Otherwise
    /// `make` builds a new point. Past capacity the deepest point and the
    /// point farthest from it survive.
    ///
    /// Returns the id of the merged point, or `None` when the new point was
    /// discarded by the reduction.
    pub fn merge(
        &mut self,
        info: ContactInfo,
        local_normal: Vector2<f64>,
        threshold: f64,
        make: impl FnOnce(&ContactInfo) -> ManifoldPoint,
    ) -> Option<ContactId> {
        let threshold_sq = threshold * threshold;
        if let Some(point) = self
            .points
            .iter_mut()
            .find(|p| (p.info.local_a - info.local_a).norm_squared() < threshold_sq)
        {
            point.constraint.update(info.local_a, info.local_b, info.normal);
            point.info = info;
            point.local_normal = local_normal;
            return Some(point.id);
        }

        let point = make(&info);
        let id = point.id;
        self.points.push(point);
        if self.points.len() > MAX_MANIFOLD_POINTS {
            self.reduce();
        }
        self.points.iter().any(|p| p.id == id).then_some(id)
    }

    /// Keep the deepest point and the one farthest from it.
    fn reduce(&mut self) {
        let Some(deepest) = (0..self.points.len()).max_by(|&i, &j| {
            self.points[i]
                .info
                .depth
                .total_cmp(&self.points[j].info.depth)
                .then(j.cmp(&i))
        }) else {
            return;
        };
        let anchor = self.points[deepest].info.point_a;
        let farthest = (0..self.points.len())
            .filter(|&i| i != deepest)
            .max_by(|&i, &j| {
                let di = (self.points[i].info.point_a - anchor).norm_squared();
                let dj = (self.points[j].info.point_a - anchor).norm_squared();
                di.total_cmp(&dj).then(j.cmp(&i))
            });
        let mut index = 0;
        self.points.retain(|_| {
            let keep = index == deepest || Some(index) == farthest;
            index += 1;
            keep
        });
    }

    /// Re-project cached points through the relative transform of B in A.
    ///
    /// Points that no longer penetrate, or whose anchors slid apart by more
    /// than `threshold` along the surface, are dropped. Survivors get fresh
    /// world points, normal and depth.
    pub fn validate(&mut self, pose_a: &Isometry2<f64>, relative: &Isometry2<f64>, threshold: f64) {
        self.points.retain(|point| {
            let b_in_a = relative.transform_point(&point.info.local_b);
            let offset = b_in_a - point.info.local_a;
            let separation = offset.dot(&point.local_normal);
            let drift = offset - point.local_normal * separation;
            if separation > 0.0 || drift.norm() > threshold {
                return false;
            }
            let normal = pose_a.rotation * point.local_normal;
            point.info.point_a = pose_a.transform_point(&point.info.local_a);
            point.info.point_b = pose_a.transform_point(&b_in_a);
            point.info.normal = normal;
            point.info.depth = -separation;
            point
                .constraint
                .update(point.info.local_a, point.info.local_b, normal);
            true
        });
    }
}

/// Change of a pair's touching state over one collide pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Started touching.
    Start,
    /// Still touching.
    Persist,
    /// Stopped touching.
    End,
}

/// A persistent collider pair.
#[derive(Debug, Clone)]
pub struct Pair {
    key: PairKey,
    collider_a: ColliderId,
    collider_b: ColliderId,
    body_a: BodyId,
    body_b: BodyId,
    sensor: bool,
    friction: f64,
    restitution: f64,
    relative: Isometry2<f64>,
    manifold: Manifold,
    touching: bool,
}

impl Pair {
    fn new(a: &Collider, b: &Collider) -> Self {
        let (a, b) = if a.id() <= b.id() { (a, b) } else { (b, a) };
        Self {
            key: PairKey::new(a.id(), b.id()),
            collider_a: a.id(),
            collider_b: b.id(),
            body_a: a.body(),
            body_b: b.body(),
            sensor: a.is_sensor() || b.is_sensor(),
            friction: a.material().combined_friction(b.material()),
            restitution: a.material().combined_restitution(b.material()),
            relative: Isometry2::identity(),
            manifold: Manifold::default(),
            touching: false,
        }
    }

    /// Pair key.
    #[must_use]
    pub fn key(&self) -> PairKey {
        self.key
    }

    /// Collider with the lower id; normals point away from it.
    #[must_use]
    pub fn collider_a(&self) -> ColliderId {
        self.collider_a
    }

    /// Collider with the higher id.
    #[must_use]
    pub fn collider_b(&self) -> ColliderId {
        self.collider_b
    }

    /// Body of collider A.
    #[must_use]
    pub fn body_a(&self) -> BodyId {
        self.body_a
    }

    /// Body of collider B.
    #[must_use]
    pub fn body_b(&self) -> BodyId {
        self.body_b
    }

    /// Whether either collider is a sensor.
    #[must_use]
    pub fn is_sensor(&self) -> bool {
        self.sensor
    }

    /// Combined friction.
    #[must_use]
    pub fn friction(&self) -> f64 {
        self.friction
    }

    /// Combined restitution.
    #[must_use]
    pub fn restitution(&self) -> f64 {
        self.restitution
    }

    /// Pose of body B in the frame of body A, as of the last collide pass.
    #[must_use]
    pub fn relative(&self) -> &Isometry2<f64> {
        &self.relative
    }

    /// Cached contacts.
    #[must_use]
    pub fn manifold(&self) -> &Manifold {
        &self.manifold
    }

    pub(crate) fn manifold_mut(&mut self) -> &mut Manifold {
        &mut self.manifold
    }

    /// Whether the colliders touched after the last collide pass.
    #[must_use]
    pub fn is_touching(&self) -> bool {
        self.touching
    }

    /// Event snapshot of the manifold.
    #[must_use]
    pub fn contact_points(&self) -> Vec<ContactPoint> {
        self.manifold
            .points()
            .iter()
            .map(|p| ContactPoint {
                id: p.id,
                point: p.info.point_a,
                normal: p.info.normal,
                depth: p.info.depth,
            })
            .collect()
    }

    fn involves(&self, collider: ColliderId) -> bool {
        self.collider_a == collider || self.collider_b == collider
    }
}

/// Owner of every pair, iterated in key order.
#[derive(Debug, Clone)]
pub struct PairRegistry {
    pairs: BTreeMap<PairKey, Pair>,
    next_contact: u64,
    params: ContactParams,
    threshold: f64,
}

impl PairRegistry {
    /// Empty registry. `threshold` is the contact proximity threshold.
    #[must_use]
    pub fn new(params: ContactParams, threshold: f64) -> Self {
        Self {
            pairs: BTreeMap::new(),
            next_contact: 0,
            params,
            threshold,
        }
    }

    /// Number of pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether there is no pair.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Look up a pair.
    #[must_use]
    pub fn get(&self, a: ColliderId, b: ColliderId) -> Option<&Pair> {
        self.pairs.get(&PairKey::new(a, b))
    }

    /// Pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = &Pair> {
        self.pairs.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Pair> {
        self.pairs.values_mut()
    }

    /// Total cached contacts.
    #[must_use]
    pub fn contact_count(&self) -> usize {
        self.pairs.values().map(|p| p.manifold.len()).sum()
    }

    /// Register `collider` against every collider of another body.
    pub fn add_collider<'c>(&mut self, collider: &Collider, others: impl IntoIterator<Item = &'c Collider>) {
        for other in others {
            if other.id() == collider.id() || other.body() == collider.body() {
                continue;
            }
            let pair = Pair::new(collider, other);
            self.pairs.entry(pair.key).or_insert(pair);
        }
    }

    /// Remove every pair involving `collider`, returning them in key order.
    pub fn remove_collider(&mut self, collider: ColliderId) -> Vec<Pair> {
        let keys: Vec<PairKey> = self
            .pairs
            .values()
            .filter(|p| p.involves(collider))
            .map(|p| p.key)
            .collect();
        keys.iter().filter_map(|key| self.pairs.remove(key)).collect()
    }

    /// Refresh every pair against this step's broad-phase output.
    ///
    /// Pairs whose bodies are both inactive keep their manifold untouched.
    /// Pairs missing from `broad` are cleared. The rest are re-projected and
    /// fed with mid-phase candidates through `narrow`. Returns the touching
    /// transitions in key order.
    pub fn validate(
        &mut self,
        broad: &[(ColliderId, ColliderId)],
        colliders: &BTreeMap<ColliderId, Collider>,
        bodies: &BTreeMap<BodyId, Body>,
        narrow: &dyn NarrowPhase,
    ) -> Vec<(PairKey, Transition)> {
        let candidates: HashSet<PairKey> = broad.iter().map(|&(a, b)| PairKey::new(a, b)).collect();
        let Self {
            pairs,
            next_contact,
            params,
            threshold,
        } = self;

        let mut transitions = Vec::new();
        for pair in pairs.values_mut() {
            let (Some(body_a), Some(body_b)) = (bodies.get(&pair.body_a), bodies.get(&pair.body_b))
            else {
                continue;
            };
            if !body_a.is_active() && !body_b.is_active() {
                continue;
            }
            let was_touching = pair.touching;

            if candidates.contains(&pair.key) {
                let (Some(collider_a), Some(collider_b)) =
                    (colliders.get(&pair.collider_a), colliders.get(&pair.collider_b))
                else {
                    continue;
                };
                let pose_a = body_a.pose();
                let pose_b = body_b.pose();
                pair.relative = pose_a.inverse() * pose_b;
                pair.manifold.validate(&pose_a, &pair.relative, *threshold);

                let (shape_a, shape_b) = (collider_a.shape(), collider_b.shape());
                for candidate in refine(shape_a, &pose_a, shape_b, &pose_b) {
                    let a = ShapeInstance::with_part(shape_a, candidate.part_a, pose_a);
                    let b = ShapeInstance::with_part(shape_b, candidate.part_b, pose_b);
                    for info in narrow.collide(&a, &b) {
                        let local_normal = pose_a.rotation.inverse() * info.normal;
                        let (friction, restitution) = (pair.friction, pair.restitution);
                        pair.manifold.merge(info, local_normal, *threshold, |info| {
                            let id = ContactId::new(*next_contact);
                            *next_contact += 1;
                            ManifoldPoint {
                                id,
                                info: *info,
                                local_normal,
                                constraint: ContactConstraint::new(
                                    info.local_a,
                                    info.local_b,
                                    info.normal,
                                    friction,
                                    restitution,
                                    *params,
                                ),
                            }
                        });
                    }
                }
            } else {
                pair.manifold.clear();
            }

            pair.touching = !pair.manifold.is_empty();
            let transition = match (was_touching, pair.touching) {
                (false, true) => Some(Transition::Start),
                (true, true) => Some(Transition::Persist),
                (true, false) => Some(Transition::End),
                (false, false) => None,
            };
            if let Some(transition) = transition {
                transitions.push((pair.key, transition));
            }
        }
        debug!(
            pairs = pairs.len(),
            broad = broad.len(),
            touching = transitions.iter().filter(|(_, t)| *t != Transition::End).count(),
            "pairs validated"
        );
        transitions
    }

    pub(crate) fn get_by_key(&self, key: &PairKey) -> Option<&Pair> {
        self.pairs.get(key)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::body::BodyDef;
    use crate::collider::ColliderDef;
    use approx::assert_relative_eq;
    use nalgebra::Point2;
    use sim2d_collision::{Shape, create_narrow_phase};
    use sim2d_types::Settings;
    use sim2d_types::math::pose;

    fn info(x: f64, depth: f64) -> ContactInfo {
        let identity = Isometry2::identity();
        ContactInfo::new(
            Point2::new(x, 0.0),
            Point2::new(x, -depth),
            Vector2::y(),
            depth,
            &identity,
            &identity,
        )
    }

    fn make(next: &mut u64) -> impl FnMut(&ContactInfo) -> ManifoldPoint + '_ {
        move |info| {
            let id = ContactId::new(*next);
            *next += 1;
            ManifoldPoint {
                id,
                info: *info,
                local_normal: info.normal,
                constraint: ContactConstraint::new(
                    info.local_a,
                    info.local_b,
                    info.normal,
                    0.5,
                    0.0,
                    ContactParams::default(),
                ),
            }
        }
    }

    #[test]
    fn test_merge_keeps_identity_below_threshold() {
        let mut next = 0;
        let mut manifold = Manifold::default();
        let first = manifold.merge(info(0.0, 0.1), Vector2::y(), 0.05, make(&mut next));
        let again = manifold.merge(info(0.01, 0.2), Vector2::y(), 0.05, make(&mut next));
        assert_eq!(first, again);
        assert_eq!(manifold.len(), 1);
        assert_relative_eq!(manifold.points()[0].info.depth, 0.2);

        let other = manifold.merge(info(0.5, 0.1), Vector2::y(), 0.05, make(&mut next));
        assert_ne!(other, first);
        assert_eq!(manifold.len(), 2);
    }

    #[test]
    fn test_merge_reduces_to_deepest_and_farthest() {
        let mut next = 0;
        let mut manifold = Manifold::default();
        manifold.merge(info(0.0, 0.3), Vector2::y(), 0.05, make(&mut next));
        manifold.merge(info(0.2, 0.1), Vector2::y(), 0.05, make(&mut next));
        let far = manifold.merge(info(1.0, 0.05), Vector2::y(), 0.05, make(&mut next));
        assert_eq!(manifold.len(), 2);
        assert!(far.is_some());
        let xs: Vec<f64> = manifold.points().iter().map(|p| p.info.point_a.x).collect();
        assert_eq!(xs, vec![0.0, 1.0]);

        // A point between the survivors is discarded.
        let dropped = manifold.merge(info(0.5, 0.01), Vector2::y(), 0.05, make(&mut next));
        assert!(dropped.is_none());
    }

    #[test]
    fn test_validate_drops_separated_and_drifted() {
        let mut next = 0;
        let mut manifold = Manifold::default();
        manifold.merge(info(0.0, 0.1), Vector2::y(), 0.05, make(&mut next));
        let identity = Isometry2::identity();

        manifold.validate(&identity, &identity, 0.05);
        assert_eq!(manifold.len(), 1);

        // B moved up past the contact: no longer penetrating.
        manifold.validate(&identity, &Isometry2::translation(0.0, 0.2), 0.05);
        assert!(manifold.is_empty());

        manifold.merge(info(0.0, 0.1), Vector2::y(), 0.05, make(&mut next));
        manifold.validate(&identity, &Isometry2::translation(0.1, 0.0), 0.05);
        assert!(manifold.is_empty());
    }

    fn scene(gap: f64) -> (BTreeMap<BodyId, Body>, BTreeMap<ColliderId, Collider>) {
        let mut bodies = BTreeMap::new();
        let mut colliders = BTreeMap::new();
        for (i, x) in [0.0, 2.0 - gap].into_iter().enumerate() {
            let id = BodyId::new(i as u64);
            let def = BodyDef::dynamic(Vector2::new(x, 0.0));
            bodies.insert(id, Body::new(id, &def));
            let cid = ColliderId::new(i as u64);
            colliders.insert(
                cid,
                Collider::new(
                    cid,
                    id,
                    ColliderDef::new(Shape::circle(1.0).unwrap()),
                    &pose(def.position, 0.0),
                ),
            );
        }
        (bodies, colliders)
    }

    #[test]
    fn test_registry_transitions() {
        let (bodies, colliders) = scene(0.5);
        let mut registry = PairRegistry::new(ContactParams::default(), 0.05);
        let c0 = &colliders[&ColliderId::new(0)];
        let c1 = &colliders[&ColliderId::new(1)];
        registry.add_collider(c0, []);
        registry.add_collider(c1, [c0]);
        assert_eq!(registry.len(), 1);

        let narrow = create_narrow_phase(&Settings::default());
        let broad = [(c0.id(), c1.id())];
        let start = registry.validate(&broad, &colliders, &bodies, narrow.as_ref());
        assert_eq!(start, vec![(PairKey::new(c0.id(), c1.id()), Transition::Start)]);
        let pair = registry.get(c1.id(), c0.id()).unwrap();
        assert_eq!(pair.manifold().len(), 1);
        assert_relative_eq!(pair.manifold().points()[0].info.depth, 0.5, epsilon = 1e-6);
        assert_relative_eq!(pair.manifold().points()[0].info.normal, Vector2::x(), epsilon = 1e-6);
        let id = pair.manifold().points()[0].id;

        let persist = registry.validate(&broad, &colliders, &bodies, narrow.as_ref());
        assert_eq!(persist[0].1, Transition::Persist);
        assert_eq!(registry.get(c0.id(), c1.id()).unwrap().manifold().points()[0].id, id);

        let end = registry.validate(&[], &colliders, &bodies, narrow.as_ref());
        assert_eq!(end[0].1, Transition::End);
        assert_eq!(registry.contact_count(), 0);

        assert_eq!(registry.remove_collider(c1.id()).len(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_same_body_colliders_never_pair() {
        let (_, colliders) = scene(0.5);
        let c0 = &colliders[&ColliderId::new(0)];
        let twin = Collider::new(
            ColliderId::new(9),
            c0.body(),
            ColliderDef::new(Shape::circle(0.5).unwrap()),
            &Isometry2::identity(),
        );
        let mut registry = PairRegistry::new(ContactParams::default(), 0.05);
        registry.add_collider(&twin, [c0]);
        assert!(registry.is_empty());
    }
}
