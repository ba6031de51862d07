//! Rigid bodies.

use hashbrown::HashSet;
use nalgebra::{Isometry2, Point2, Vector2};
use sim2d_collision::Shape;
use sim2d_constraint::{BodyState, recip};
use sim2d_types::math::cross;
use sim2d_types::{BodyId, ColliderId, ContactId, JointId};
use smallvec::SmallVec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Initial state and mass of a body.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BodyDef {
    /// Position of the body origin (center of mass).
    pub position: Vector2<f64>,
    /// Orientation in radians.
    pub angle: f64,
    /// Initial linear velocity.
    pub velocity: Vector2<f64>,
    /// Initial angular velocity.
    pub angular_velocity: f64,
    /// Mass; derived from the first collider when `None`.
    pub mass: Option<f64>,
    /// Moment of inertia; derived from the first collider when `None`.
    pub inertia: Option<f64>,
    /// Static bodies never move.
    pub is_static: bool,
    /// Fast movers get time-of-impact sub-stepping.
    pub continuous: bool,
}

impl Default for BodyDef {
    fn default() -> Self {
        Self {
            position: Vector2::zeros(),
            angle: 0.0,
            velocity: Vector2::zeros(),
            angular_velocity: 0.0,
            mass: None,
            inertia: None,
            is_static: false,
            continuous: false,
        }
    }
}

impl BodyDef {
    /// A dynamic body at `position`.
    #[must_use]
    pub fn dynamic(position: Vector2<f64>) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// A static body at `position`.
    #[must_use]
    pub fn fixed(position: Vector2<f64>) -> Self {
        Self {
            position,
            is_static: true,
            ..Self::default()
        }
    }

    /// Set the orientation.
    #[must_use]
    pub fn with_angle(mut self, angle: f64) -> Self {
        self.angle = angle;
        self
    }

    /// Set the initial velocity.
    #[must_use]
    pub fn with_velocity(mut self, velocity: Vector2<f64>, angular_velocity: f64) -> Self {
        self.velocity = velocity;
        self.angular_velocity = angular_velocity;
        self
    }

    /// Set explicit mass and inertia.
    #[must_use]
    pub fn with_mass(mut self, mass: f64, inertia: f64) -> Self {
        self.mass = Some(mass);
        self.inertia = Some(inertia);
        self
    }

    /// Enable continuous collision detection.
    #[must_use]
    pub fn continuous(mut self) -> Self {
        self.continuous = true;
        self
    }
}

/// A rigid body owned by the world.
#[derive(Debug, Clone)]
pub struct Body {
    id: BodyId,
    pub(crate) state: BodyState,
    mass: f64,
    inertia: f64,
    mass_pending: bool,
    inertia_pending: bool,
    is_static: bool,
    continuous: bool,
    sleeping: bool,
    sleep_timer: f64,
    pub(crate) damping: f64,
    pub(crate) angular_damping: f64,
    pub(crate) colliders: SmallVec<[ColliderId; 2]>,
    pub(crate) joints: HashSet<JointId>,
    pub(crate) contacts: Vec<ContactId>,
    pub(crate) island: Option<usize>,
    pub(crate) dof_index: Option<usize>,
}

impl Body {
    pub(crate) fn new(id: BodyId, def: &BodyDef) -> Self {
        let (mass, inertia) = if def.is_static {
            (f64::INFINITY, f64::INFINITY)
        } else {
            (def.mass.unwrap_or(1.0), def.inertia.unwrap_or(1.0))
        };
        let mut state = BodyState::dynamic(def.position, def.angle, mass, inertia);
        if !def.is_static {
            state = state.with_velocity(def.velocity, def.angular_velocity);
        }
        Self {
            id,
            state,
            mass,
            inertia,
            mass_pending: !def.is_static && def.mass.is_none(),
            inertia_pending: !def.is_static && def.inertia.is_none(),
            is_static: def.is_static,
            continuous: def.continuous,
            sleeping: false,
            sleep_timer: 0.0,
            damping: 0.0,
            angular_damping: 0.0,
            colliders: SmallVec::new(),
            joints: HashSet::new(),
            contacts: Vec::new(),
            island: None,
            dof_index: None,
        }
    }

    /// Body id.
    #[must_use]
    pub fn id(&self) -> BodyId {
        self.id
    }

    /// Kinematic and inertial state.
    #[must_use]
    pub fn state(&self) -> &BodyState {
        &self.state
    }

    /// Position of the body origin.
    #[must_use]
    pub fn position(&self) -> Vector2<f64> {
        self.state.position
    }

    /// Orientation in radians.
    #[must_use]
    pub fn angle(&self) -> f64 {
        self.state.angle
    }

    /// World pose.
    #[must_use]
    pub fn pose(&self) -> Isometry2<f64> {
        self.state.pose()
    }

    /// Linear velocity.
    #[must_use]
    pub fn velocity(&self) -> Vector2<f64> {
        self.state.velocity
    }

    /// Angular velocity.
    #[must_use]
    pub fn angular_velocity(&self) -> f64 {
        self.state.angular_velocity
    }

    /// Mass (infinite for static bodies).
    #[must_use]
    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Moment of inertia (infinite for static bodies).
    #[must_use]
    pub fn inertia(&self) -> f64 {
        self.inertia
    }

    /// Whether the body never moves.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Whether the body is sub-stepped by time of impact.
    #[must_use]
    pub fn is_continuous(&self) -> bool {
        self.continuous
    }

    /// Whether the body is asleep.
    #[must_use]
    pub fn is_sleeping(&self) -> bool {
        self.sleeping
    }

    /// Time spent below the sleep thresholds.
    #[must_use]
    pub fn sleep_timer(&self) -> f64 {
        self.sleep_timer
    }

    /// Whether the body moves this step.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.is_static && !self.sleeping
    }

    /// Attached colliders.
    #[must_use]
    pub fn colliders(&self) -> &[ColliderId] {
        &self.colliders
    }

    /// Incident joints, in id order.
    #[must_use]
    pub fn joints(&self) -> Vec<JointId> {
        let mut joints: Vec<JointId> = self.joints.iter().copied().collect();
        joints.sort_unstable();
        joints
    }

    /// Incident contacts of the last sub-step.
    #[must_use]
    pub fn contacts(&self) -> &[ContactId] {
        &self.contacts
    }

    /// Island of the last sub-step.
    #[must_use]
    pub fn island(&self) -> Option<usize> {
        self.island
    }

    /// First island-local degree of freedom of the last sub-step.
    #[must_use]
    pub fn dof_index(&self) -> Option<usize> {
        self.dof_index
    }

    /// Kinetic energy.
    #[must_use]
    pub fn kinetic_energy(&self) -> f64 {
        self.state.kinetic_energy()
    }

    /// Linear momentum (zero for static bodies).
    #[must_use]
    pub fn linear_momentum(&self) -> Vector2<f64> {
        if self.is_static {
            Vector2::zeros()
        } else {
            self.state.velocity * self.mass
        }
    }

    /// Derive pending mass properties from the first collider.
    pub(crate) fn adopt_shape_mass(&mut self, shape: &Shape, density: f64) {
        if self.is_static || !(self.mass_pending || self.inertia_pending) {
            return;
        }
        let area = shape.area();
        let second_moment = shape.inertia_per_density();
        if self.mass_pending {
            self.mass = density * area;
        }
        if self.inertia_pending {
            // Explicit mass keeps the shape's mass distribution.
            self.inertia = if area > 0.0 {
                self.mass * second_moment / area
            } else {
                density * second_moment
            };
        }
        self.mass_pending = false;
        self.inertia_pending = false;
        self.state.inv_mass = recip(self.mass);
        self.state.inv_inertia = recip(self.inertia);
    }

    /// Accumulate a force through the center of mass.
    pub fn apply_force(&mut self, force: Vector2<f64>) {
        if !self.is_static {
            self.state.force += force;
        }
    }

    /// Accumulate a torque.
    pub fn apply_torque(&mut self, torque: f64) {
        if !self.is_static {
            self.state.torque += torque;
        }
    }

    /// Accumulate a force applied at a world point.
    pub fn apply_force_at_point(&mut self, force: Vector2<f64>, point: Point2<f64>) {
        if !self.is_static {
            self.state.force += force;
            self.state.torque += cross(&(point.coords - self.state.position), &force);
        }
    }

    /// Change the velocity by an impulse applied at a world point.
    pub fn apply_impulse(&mut self, impulse: Vector2<f64>, point: Point2<f64>) {
        if !self.is_static {
            self.state.velocity += impulse * self.state.inv_mass;
            self.state.angular_velocity +=
                cross(&(point.coords - self.state.position), &impulse) * self.state.inv_inertia;
        }
    }

    /// Reset accumulated force and torque.
    pub fn clear_forces(&mut self) {
        self.state.force = Vector2::zeros();
        self.state.torque = 0.0;
    }

    /// Whether velocities are below the sleep thresholds.
    #[must_use]
    pub fn should_sleep(&self, linear_threshold: f64, angular_threshold: f64) -> bool {
        self.state.velocity.norm() < linear_threshold
            && self.state.angular_velocity.abs() < angular_threshold
    }

    /// Advance or reset the sleep timer.
    pub(crate) fn tick_sleep(&mut self, dt: f64, linear_threshold: f64, angular_threshold: f64) {
        if self.should_sleep(linear_threshold, angular_threshold) {
            self.sleep_timer += dt;
        } else {
            self.sleep_timer = 0.0;
        }
    }

    /// Wake the body. Returns whether it was asleep.
    pub(crate) fn wake_up(&mut self) -> bool {
        let was = self.sleeping;
        self.sleeping = false;
        self.sleep_timer = 0.0;
        was
    }

    /// Put the body to sleep, zeroing its velocity. Returns whether it was
    /// awake.
    pub(crate) fn put_to_sleep(&mut self) -> bool {
        if self.is_static || self.sleeping {
            return false;
        }
        self.sleeping = true;
        self.state.velocity = Vector2::zeros();
        self.state.angular_velocity = 0.0;
        true
    }
}
