//! The constraint row abstraction.
//!
//! A constraint is a single scalar row over two bodies:
//!
//! ```text
//! J · v = rhs,    lower <= λ <= upper
//! ```
//!
//! where `v = [v_a, ω_a, v_b, ω_b]` and `λ` is the row force. The solver runs
//! two independent passes over the same rows:
//!
//! - **position pass** (`strength > 0`): `rhs` drives the position error
//!   back to zero (Baumgarte); the resulting forces only move positions
//! - **velocity pass** (`strength = 0`): `rhs` is the target relative
//!   velocity (0 for rigid rows, a motor speed, a restitution bounce)
//!
//! Each row keeps the last `λ` of each pass for warm starting.

use nalgebra::{Isometry2, Point2, Vector2};
use sim2d_types::math::{cross, cross_sv, pose};
use std::any::Any;
use std::fmt::Debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Kinematic and inertial state of one body, as seen by constraints.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BodyState {
    /// Position of the body origin (center of mass).
    pub position: Vector2<f64>,
    /// Orientation in radians.
    pub angle: f64,
    /// Linear velocity.
    pub velocity: Vector2<f64>,
    /// Angular velocity.
    pub angular_velocity: f64,
    /// Accumulated external force.
    pub force: Vector2<f64>,
    /// Accumulated external torque.
    pub torque: f64,
    /// Inverse mass; 0 for static bodies.
    pub inv_mass: f64,
    /// Inverse moment of inertia; 0 for static bodies.
    pub inv_inertia: f64,
}

impl Default for BodyState {
    fn default() -> Self {
        Self::fixed(Vector2::zeros(), 0.0)
    }
}

impl BodyState {
    /// An immovable body.
    #[must_use]
    pub fn fixed(position: Vector2<f64>, angle: f64) -> Self {
        Self {
            position,
            angle,
            velocity: Vector2::zeros(),
            angular_velocity: 0.0,
            force: Vector2::zeros(),
            torque: 0.0,
            inv_mass: 0.0,
            inv_inertia: 0.0,
        }
    }

    /// A dynamic body at rest.
    #[must_use]
    pub fn dynamic(position: Vector2<f64>, angle: f64, mass: f64, inertia: f64) -> Self {
        Self {
            inv_mass: recip(mass),
            inv_inertia: recip(inertia),
            ..Self::fixed(position, angle)
        }
    }

    /// Set the velocity.
    #[must_use]
    pub fn with_velocity(mut self, velocity: Vector2<f64>, angular_velocity: f64) -> Self {
        self.velocity = velocity;
        self.angular_velocity = angular_velocity;
        self
    }

    /// Whether the body has neither translational nor rotational freedom.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.inv_mass == 0.0 && self.inv_inertia == 0.0
    }

    /// World pose.
    #[must_use]
    pub fn pose(&self) -> Isometry2<f64> {
        pose(self.position, self.angle)
    }

    /// Body-local point in world space.
    #[must_use]
    pub fn world_point(&self, local: &Point2<f64>) -> Point2<f64> {
        self.pose() * local
    }

    /// World point in body space.
    #[must_use]
    pub fn local_point(&self, world: &Point2<f64>) -> Point2<f64> {
        self.pose().inverse_transform_point(world)
    }

    /// Body-local vector rotated into world space.
    #[must_use]
    pub fn world_vector(&self, local: &Vector2<f64>) -> Vector2<f64> {
        self.pose().rotation * local
    }

    /// Velocity of the material point at world position `point`.
    #[must_use]
    pub fn velocity_at(&self, point: &Point2<f64>) -> Vector2<f64> {
        self.velocity + cross_sv(self.angular_velocity, &(point.coords - self.position))
    }

    /// Kinetic energy.
    #[must_use]
    pub fn kinetic_energy(&self) -> f64 {
        let linear = if self.inv_mass > 0.0 {
            0.5 * self.velocity.norm_squared() / self.inv_mass
        } else {
            0.0
        };
        let angular = if self.inv_inertia > 0.0 {
            0.5 * self.angular_velocity * self.angular_velocity / self.inv_inertia
        } else {
            0.0
        };
        linear + angular
    }
}

/// `1/x`, with 0 for infinite or non-positive values (static).
#[must_use]
pub fn recip(x: f64) -> f64 {
    if x.is_finite() && x > 0.0 { 1.0 / x } else { 0.0 }
}

/// One Jacobian row: 3 entries per body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JacobianRow {
    /// Linear part for body A.
    pub linear_a: Vector2<f64>,
    /// Angular part for body A.
    pub angular_a: f64,
    /// Linear part for body B.
    pub linear_b: Vector2<f64>,
    /// Angular part for body B.
    pub angular_b: f64,
}

impl JacobianRow {
    /// Row for a point-to-point direction `n` with lever arms `r_a`, `r_b`:
    /// `(v_b + ω_b × r_b - v_a - ω_a × r_a) · n`.
    #[must_use]
    pub fn relative(n: &Vector2<f64>, r_a: &Vector2<f64>, r_b: &Vector2<f64>) -> Self {
        Self {
            linear_a: -n,
            angular_a: -cross(r_a, n),
            linear_b: *n,
            angular_b: cross(r_b, n),
        }
    }

    /// Row for the relative angle `θ_b - θ_a`.
    #[must_use]
    pub fn angular() -> Self {
        Self {
            linear_a: Vector2::zeros(),
            angular_a: -1.0,
            linear_b: Vector2::zeros(),
            angular_b: 1.0,
        }
    }

    /// `J · v`.
    #[must_use]
    pub fn velocity(&self, a: &BodyState, b: &BodyState) -> f64 {
        self.linear_a.dot(&a.velocity)
            + self.angular_a * a.angular_velocity
            + self.linear_b.dot(&b.velocity)
            + self.angular_b * b.angular_velocity
    }

    /// `J · M⁻¹ · Jᵀ`.
    #[must_use]
    pub fn effective_mass_inv(&self, a: &BodyState, b: &BodyState) -> f64 {
        self.linear_a.norm_squared() * a.inv_mass
            + self.angular_a * self.angular_a * a.inv_inertia
            + self.linear_b.norm_squared() * b.inv_mass
            + self.angular_b * self.angular_b * b.inv_inertia
    }

    /// Entries for body A as `[x, y, θ]`.
    #[must_use]
    pub fn entries_a(&self) -> [f64; 3] {
        [self.linear_a.x, self.linear_a.y, self.angular_a]
    }

    /// Entries for body B as `[x, y, θ]`.
    #[must_use]
    pub fn entries_b(&self) -> [f64; 3] {
        [self.linear_b.x, self.linear_b.y, self.angular_b]
    }
}

/// Bounds on a row's multiplier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Clamping {
    /// Fixed interval.
    Bounded {
        /// Lower bound.
        lower: f64,
        /// Upper bound.
        upper: f64,
    },
    /// `|λ| <= coefficient · λ_normal`, where `λ_normal` is the current
    /// multiplier of row `normal` of the same joint.
    Friction {
        /// Friction coefficient.
        coefficient: f64,
        /// Index of the paired normal row within the owning joint.
        normal: usize,
    },
}

impl Clamping {
    /// No bounds (equality rows).
    pub const UNBOUNDED: Self = Self::Bounded {
        lower: f64::NEG_INFINITY,
        upper: f64::INFINITY,
    };

    /// `λ >= 0` (contacts and limits push only).
    pub const NON_NEGATIVE: Self = Self::Bounded {
        lower: 0.0,
        upper: f64::INFINITY,
    };

    /// `|λ| <= bound`.
    #[must_use]
    pub fn symmetric(bound: f64) -> Self {
        let bound = bound.abs();
        Self::Bounded {
            lower: -bound,
            upper: bound,
        }
    }

    /// Interval between 0 and `limit`, whichever its sign.
    #[must_use]
    pub fn towards(limit: f64) -> Self {
        Self::Bounded {
            lower: limit.min(0.0),
            upper: limit.max(0.0),
        }
    }

    /// Resolve to a fixed interval given the paired normal multiplier.
    #[must_use]
    pub fn interval(&self, normal_lambda: f64) -> (f64, f64) {
        match *self {
            Self::Bounded { lower, upper } => (lower, upper),
            Self::Friction { coefficient, .. } => {
                let bound = coefficient * normal_lambda.max(0.0);
                (-bound, bound)
            }
        }
    }
}

/// Solver pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pass {
    /// Position correction (pseudo-velocities).
    Position,
    /// Velocity constraints.
    Velocity,
}

/// Last multiplier of each pass, for warm starting.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WarmStart {
    /// Position-pass multiplier.
    pub position: f64,
    /// Velocity-pass multiplier.
    pub velocity: f64,
}

impl WarmStart {
    /// Multiplier of `pass`.
    #[must_use]
    pub fn get(&self, pass: Pass) -> f64 {
        match pass {
            Pass::Position => self.position,
            Pass::Velocity => self.velocity,
        }
    }

    /// Store the multiplier of `pass`.
    pub fn set(&mut self, pass: Pass, lambda: f64) {
        match pass {
            Pass::Position => self.position = lambda,
            Pass::Velocity => self.velocity = lambda,
        }
    }

    /// Forget both multipliers.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// A scalar constraint row between bodies A and B.
///
/// Single-body constraints see a fixed [`BodyState`] as B (or A).
pub trait Constraint: Debug + Any {
    /// Jacobian at the current state.
    fn jacobian(&self, a: &BodyState, b: &BodyState) -> JacobianRow;

    /// Right-hand side of the row: target value of `J · v`.
    ///
    /// `strength > 0` selects the position pass, where the result corrects
    /// the position error; `strength == 0` selects the velocity pass.
    fn push_factor(&self, a: &BodyState, b: &BodyState, dt: f64, strength: f64) -> f64;

    /// Multiplier bounds.
    fn clamping(&self, a: &BodyState, b: &BodyState, dt: f64) -> Clamping;

    /// Warm-start cache.
    fn cache(&self) -> &WarmStart;

    /// Warm-start cache, mutably.
    fn cache_mut(&mut self) -> &mut WarmStart;

    /// Whether the row takes part in the position pass.
    ///
    /// Force-limited rows (springs, motors, friction, mouse) only act on
    /// velocities.
    fn corrects_position(&self) -> bool {
        true
    }

    /// Current position error `C` (0 when satisfied).
    fn error(&self, a: &BodyState, b: &BodyState) -> f64;

    /// Downcasting hook for row-specific updates.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
