//! Events emitted by the world.
//!
//! Events are fire-and-forget: handlers run synchronously inside the call
//! that produced them and cannot influence the simulation.

use crate::math::{Point2, Vector2};
use crate::{BodyId, ColliderId, ContactId, JointId};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Summary of one contact point carried by collision events.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ContactPoint {
    /// Persistent contact id.
    pub id: ContactId,
    /// World-space point on collider A.
    pub point: Point2<f64>,
    /// Unit normal from collider A to collider B.
    pub normal: Vector2<f64>,
    /// Penetration depth.
    pub depth: f64,
}

/// Something that happened in the world.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum WorldEvent {
    /// A body was created.
    BodyCreated(BodyId),
    /// A body was destroyed.
    BodyDestroyed(BodyId),
    /// A collider was attached to a body.
    ColliderAdded {
        /// The new collider.
        collider: ColliderId,
        /// Its body.
        body: BodyId,
    },
    /// A collider was removed.
    ColliderRemoved {
        /// The removed collider.
        collider: ColliderId,
        /// Its body.
        body: BodyId,
    },
    /// A joint was added.
    JointAdded(JointId),
    /// A joint was removed.
    JointRemoved(JointId),
    /// Two colliders started touching.
    CollisionStart {
        /// First collider (normal points away from it).
        collider_a: ColliderId,
        /// Second collider.
        collider_b: ColliderId,
        /// Current manifold.
        contacts: Vec<ContactPoint>,
    },
    /// Two colliders are still touching.
    Collide {
        /// First collider (normal points away from it).
        collider_a: ColliderId,
        /// Second collider.
        collider_b: ColliderId,
        /// Current manifold.
        contacts: Vec<ContactPoint>,
    },
    /// Two colliders stopped touching.
    CollisionEnd {
        /// First collider.
        collider_a: ColliderId,
        /// Second collider.
        collider_b: ColliderId,
    },
    /// A step is about to start.
    PreStep {
        /// Timestep of the step.
        dt: f64,
    },
    /// A step finished.
    PostStep {
        /// Timestep of the step.
        dt: f64,
    },
    /// An island is about to be solved.
    IslandPreStep {
        /// Index of the island within the current sub-step.
        island: usize,
        /// Bodies in the island.
        bodies: Vec<BodyId>,
    },
    /// An island was solved and integrated.
    IslandPostStep {
        /// Index of the island within the current sub-step.
        island: usize,
        /// Bodies in the island.
        bodies: Vec<BodyId>,
    },
    /// A body fell asleep.
    FallAsleep(BodyId),
    /// A body woke up.
    Awake(BodyId),
}

/// Discriminant of [`WorldEvent`] used to subscribe handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EventKind {
    /// [`WorldEvent::BodyCreated`].
    BodyCreated,
    /// [`WorldEvent::BodyDestroyed`].
    BodyDestroyed,
    /// [`WorldEvent::ColliderAdded`].
    ColliderAdded,
    /// [`WorldEvent::ColliderRemoved`].
    ColliderRemoved,
    /// [`WorldEvent::JointAdded`].
    JointAdded,
    /// [`WorldEvent::JointRemoved`].
    JointRemoved,
    /// [`WorldEvent::CollisionStart`].
    CollisionStart,
    /// [`WorldEvent::Collide`].
    Collide,
    /// [`WorldEvent::CollisionEnd`].
    CollisionEnd,
    /// [`WorldEvent::PreStep`].
    PreStep,
    /// [`WorldEvent::PostStep`].
    PostStep,
    /// [`WorldEvent::IslandPreStep`].
    IslandPreStep,
    /// [`WorldEvent::IslandPostStep`].
    IslandPostStep,
    /// [`WorldEvent::FallAsleep`].
    FallAsleep,
    /// [`WorldEvent::Awake`].
    Awake,
}

impl WorldEvent {
    /// The kind of this event.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::BodyCreated(_) => EventKind::BodyCreated,
            Self::BodyDestroyed(_) => EventKind::BodyDestroyed,
            Self::ColliderAdded { .. } => EventKind::ColliderAdded,
            Self::ColliderRemoved { .. } => EventKind::ColliderRemoved,
            Self::JointAdded(_) => EventKind::JointAdded,
            Self::JointRemoved(_) => EventKind::JointRemoved,
            Self::CollisionStart { .. } => EventKind::CollisionStart,
            Self::Collide { .. } => EventKind::Collide,
            Self::CollisionEnd { .. } => EventKind::CollisionEnd,
            Self::PreStep { .. } => EventKind::PreStep,
            Self::PostStep { .. } => EventKind::PostStep,
            Self::IslandPreStep { .. } => EventKind::IslandPreStep,
            Self::IslandPostStep { .. } => EventKind::IslandPostStep,
            Self::FallAsleep(_) => EventKind::FallAsleep,
            Self::Awake(_) => EventKind::Awake,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind() {
        assert_eq!(
            WorldEvent::BodyCreated(BodyId::new(1)).kind(),
            EventKind::BodyCreated
        );
        let event = WorldEvent::CollisionEnd {
            collider_a: ColliderId::new(0),
            collider_b: ColliderId::new(1),
        };
        assert_eq!(event.kind(), EventKind::CollisionEnd);
        assert_eq!(WorldEvent::PostStep { dt: 0.1 }.kind(), EventKind::PostStep);
    }
}
