//! Identifiers for simulation objects.
//!
//! Ids are allocated monotonically by the world, so ordering by id is
//! ordering by insertion. Every traversal that must be deterministic walks
//! objects in id order.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        pub struct $name(pub u64);

        impl $name {
            /// Create a new ID.
            #[must_use]
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            /// Get the raw ID value.
            #[must_use]
            pub const fn raw(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($label, "({})"), self.0)
            }
        }
    };
}

define_id!(
    /// Unique identifier for a rigid body.
    BodyId,
    "Body"
);

define_id!(
    /// Unique identifier for a collider attached to a body.
    ColliderId,
    "Collider"
);

define_id!(
    /// Unique identifier for a joint.
    JointId,
    "Joint"
);

define_id!(
    /// Unique identifier for a persistent contact point.
    ///
    /// A contact keeps its id for as long as the manifold keeps matching it,
    /// which is what warm starting relies on.
    ContactId,
    "Contact"
);

/// Order-independent key of an unordered collider pair.
///
/// Computed with the Szudzik pairing of `(min, max)`, so `new(a, b)` and
/// `new(b, a)` agree and distinct pairs never collide for ids below 2^32.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PairKey(u64);

impl PairKey {
    /// Key for the unordered pair `{a, b}`.
    #[must_use]
    pub fn new(a: ColliderId, b: ColliderId) -> Self {
        let (lo, hi) = if a.0 <= b.0 { (a.0, b.0) } else { (b.0, a.0) };
        Self(hi.wrapping_mul(hi).wrapping_add(lo))
    }

    /// Get the raw key value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for PairKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Pair({})", self.0)
    }
}
