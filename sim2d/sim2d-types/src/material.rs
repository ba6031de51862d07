//! Surface and damping properties of colliders.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Material of a collider.
///
/// `damping` and `angular_damping` are applied to the owning body during
/// integration; `friction` and `restitution` are combined per contact.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Material {
    /// Coulomb friction coefficient.
    pub friction: f64,
    /// Coefficient of restitution (0 = inelastic, 1 = elastic).
    pub restitution: f64,
    /// Linear velocity damping rate (1/s).
    pub damping: f64,
    /// Angular velocity damping rate (1/s).
    pub angular_damping: f64,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            friction: 0.5,
            restitution: 0.0,
            damping: 0.0,
            angular_damping: 0.0,
        }
    }
}

impl Material {
    /// A frictionless, inelastic material.
    #[must_use]
    pub fn frictionless() -> Self {
        Self {
            friction: 0.0,
            ..Self::default()
        }
    }

    /// A bouncy material.
    #[must_use]
    pub fn bouncy(restitution: f64) -> Self {
        Self {
            restitution,
            ..Self::default()
        }
    }

    /// Set the friction coefficient.
    #[must_use]
    pub fn with_friction(mut self, friction: f64) -> Self {
        self.friction = friction;
        self
    }

    /// Set the damping rates.
    #[must_use]
    pub fn with_damping(mut self, linear: f64, angular: f64) -> Self {
        self.damping = linear;
        self.angular_damping = angular;
        self
    }

    /// Friction of a contact between two materials (average).
    #[must_use]
    pub fn combined_friction(&self, other: &Self) -> f64 {
        0.5 * (self.friction + other.friction)
    }

    /// Restitution of a contact between two materials (minimum).
    #[must_use]
    pub fn combined_restitution(&self, other: &Self) -> f64 {
        self.restitution.min(other.restitution)
    }
}
