//! Concrete constraint rows used by joints.
//!
//! Anchors are stored in body-local coordinates and re-projected from the
//! current [`BodyState`] every time a row is evaluated.

use crate::constraint::{BodyState, Clamping, Constraint, JacobianRow, WarmStart};
use nalgebra::{Point2, Vector2};
use sim2d_types::math::{cross, try_normalize};
use std::any::Any;

/// World anchors and lever arms of a two-point row.
#[derive(Debug, Clone, Copy)]
struct Anchors {
    /// `p_b - p_a`.
    delta: Vector2<f64>,
    r_a: Vector2<f64>,
    r_b: Vector2<f64>,
}

impl Anchors {
    fn new(a: &BodyState, b: &BodyState, local_a: &Point2<f64>, local_b: &Point2<f64>) -> Self {
        let p_a = a.world_point(local_a);
        let p_b = b.world_point(local_b);
        Self {
            delta: p_b - p_a,
            r_a: p_a.coords - a.position,
            r_b: p_b.coords - b.position,
        }
    }

    /// Unit direction from A's anchor to B's, `+x` when coincident.
    fn direction(&self) -> Vector2<f64> {
        try_normalize(&self.delta).unwrap_or_else(Vector2::x)
    }

    /// Row of `(p_b - p_a) · n` where `n` is fixed in A's frame.
    fn axis_row(&self, n: &Vector2<f64>) -> JacobianRow {
        JacobianRow {
            linear_a: -n,
            angular_a: -cross(&(self.r_a + self.delta), n),
            linear_b: *n,
            angular_b: cross(&self.r_b, n),
        }
    }
}

/// Baumgarte right-hand side for an equality row.
fn baumgarte(error: f64, dt: f64, strength: f64) -> f64 {
    if strength > 0.0 { -strength * error / dt } else { 0.0 }
}

macro_rules! cache_accessors {
    () => {
        fn cache(&self) -> &WarmStart {
            &self.cache
        }

        fn cache_mut(&mut self) -> &mut WarmStart {
            &mut self.cache
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    };
}

/// Keeps two anchors at a fixed distance.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceRow {
    /// Anchor on A (body space).
    pub local_a: Point2<f64>,
    /// Anchor on B (body space).
    pub local_b: Point2<f64>,
    /// Target distance.
    pub length: f64,
    cache: WarmStart,
}

impl DistanceRow {
    /// Row holding `local_a` and `local_b` at `length`.
    #[must_use]
    pub fn new(local_a: Point2<f64>, local_b: Point2<f64>, length: f64) -> Self {
        Self {
            local_a,
            local_b,
            length,
            cache: WarmStart::default(),
        }
    }
}

impl Constraint for DistanceRow {
    fn jacobian(&self, a: &BodyState, b: &BodyState) -> JacobianRow {
        let anchors = Anchors::new(a, b, &self.local_a, &self.local_b);
        JacobianRow::relative(&anchors.direction(), &anchors.r_a, &anchors.r_b)
    }

    fn push_factor(&self, a: &BodyState, b: &BodyState, dt: f64, strength: f64) -> f64 {
        baumgarte(self.error(a, b), dt, strength)
    }

    fn clamping(&self, _: &BodyState, _: &BodyState, _: f64) -> Clamping {
        Clamping::UNBOUNDED
    }

    fn error(&self, a: &BodyState, b: &BodyState) -> f64 {
        Anchors::new(a, b, &self.local_a, &self.local_b).delta.norm() - self.length
    }

    cache_accessors!();
}

/// Keeps B's anchor on a line through A's anchor: `(p_b - p_a) · n = 0`
/// with `n` fixed in A's frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PointOnAxisRow {
    /// Anchor on A.
    pub local_a: Point2<f64>,
    /// Anchor on B.
    pub local_b: Point2<f64>,
    /// Constrained direction in A's frame (normal to the allowed line).
    pub local_normal: Vector2<f64>,
    cache: WarmStart,
}

impl PointOnAxisRow {
    /// Row along `local_normal` (normalized here).
    #[must_use]
    pub fn new(local_a: Point2<f64>, local_b: Point2<f64>, local_normal: Vector2<f64>) -> Self {
        Self {
            local_a,
            local_b,
            local_normal: try_normalize(&local_normal).unwrap_or_else(Vector2::y),
            cache: WarmStart::default(),
        }
    }
}

impl Constraint for PointOnAxisRow {
    fn jacobian(&self, a: &BodyState, b: &BodyState) -> JacobianRow {
        let anchors = Anchors::new(a, b, &self.local_a, &self.local_b);
        anchors.axis_row(&a.world_vector(&self.local_normal))
    }

    fn push_factor(&self, a: &BodyState, b: &BodyState, dt: f64, strength: f64) -> f64 {
        baumgarte(self.error(a, b), dt, strength)
    }

    fn clamping(&self, _: &BodyState, _: &BodyState, _: f64) -> Clamping {
        Clamping::UNBOUNDED
    }

    fn error(&self, a: &BodyState, b: &BodyState) -> f64 {
        let anchors = Anchors::new(a, b, &self.local_a, &self.local_b);
        anchors.delta.dot(&a.world_vector(&self.local_normal))
    }

    cache_accessors!();
}

/// Keeps the relative angle `θ_b - θ_a` at a reference value.
#[derive(Debug, Clone, PartialEq)]
pub struct AngleRow {
    /// Reference relative angle.
    pub reference: f64,
    cache: WarmStart,
}

impl AngleRow {
    /// Row holding the relative angle at `reference`.
    #[must_use]
    pub fn new(reference: f64) -> Self {
        Self {
            reference,
            cache: WarmStart::default(),
        }
    }
}

impl Constraint for AngleRow {
    fn jacobian(&self, _: &BodyState, _: &BodyState) -> JacobianRow {
        JacobianRow::angular()
    }

    fn push_factor(&self, a: &BodyState, b: &BodyState, dt: f64, strength: f64) -> f64 {
        baumgarte(self.error(a, b), dt, strength)
    }

    fn clamping(&self, _: &BodyState, _: &BodyState, _: f64) -> Clamping {
        Clamping::UNBOUNDED
    }

    fn error(&self, a: &BodyState, b: &BodyState) -> f64 {
        b.angle - a.angle - self.reference
    }

    cache_accessors!();
}

/// Which side of the allowed range a limit guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitSide {
    /// Translation must stay above the limit.
    Lower,
    /// Translation must stay below the limit.
    Upper,
}

impl LimitSide {
    fn sign(self) -> f64 {
        match self {
            Self::Lower => 1.0,
            Self::Upper => -1.0,
        }
    }
}

/// One-sided bound on the translation along an axis fixed in A.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisLimitRow {
    /// Anchor on A.
    pub local_a: Point2<f64>,
    /// Anchor on B.
    pub local_b: Point2<f64>,
    /// Slide axis in A's frame.
    pub local_axis: Vector2<f64>,
    /// Limit value of the translation.
    pub limit: f64,
    /// Guarded side.
    pub side: LimitSide,
    cache: WarmStart,
}

impl AxisLimitRow {
    /// A lower or upper limit on the translation along `local_axis`.
    #[must_use]
    pub fn new(
        local_a: Point2<f64>,
        local_b: Point2<f64>,
        local_axis: Vector2<f64>,
        limit: f64,
        side: LimitSide,
    ) -> Self {
        Self {
            local_a,
            local_b,
            local_axis: try_normalize(&local_axis).unwrap_or_else(Vector2::x),
            limit,
            side,
            cache: WarmStart::default(),
        }
    }

    /// Current translation along the axis.
    #[must_use]
    pub fn translation(&self, a: &BodyState, b: &BodyState) -> f64 {
        let anchors = Anchors::new(a, b, &self.local_a, &self.local_b);
        anchors.delta.dot(&a.world_vector(&self.local_axis))
    }
}

impl Constraint for AxisLimitRow {
    fn jacobian(&self, a: &BodyState, b: &BodyState) -> JacobianRow {
        let anchors = Anchors::new(a, b, &self.local_a, &self.local_b);
        let n = a.world_vector(&self.local_axis) * self.side.sign();
        anchors.axis_row(&n)
    }

    fn push_factor(&self, a: &BodyState, b: &BodyState, dt: f64, strength: f64) -> f64 {
        let gap = self.error(a, b);
        if strength > 0.0 {
            strength * (-gap).max(0.0) / dt
        } else {
            // Allow closing the remaining gap, no further.
            -gap.max(0.0) / dt
        }
    }

    fn clamping(&self, _: &BodyState, _: &BodyState, _: f64) -> Clamping {
        Clamping::NON_NEGATIVE
    }

    /// Signed gap to the limit, negative when violated.
    fn error(&self, a: &BodyState, b: &BodyState) -> f64 {
        self.side.sign() * (self.translation(a, b) - self.limit)
    }

    cache_accessors!();
}

/// Damped spring whose force is bounded by Hooke's law.
///
/// Measured along the anchor line, or along an axis fixed in A when
/// `local_axis` is set (wheel suspension).
#[derive(Debug, Clone, PartialEq)]
pub struct SpringRow {
    /// Anchor on A.
    pub local_a: Point2<f64>,
    /// Anchor on B.
    pub local_b: Point2<f64>,
    /// Optional measuring axis in A's frame.
    pub local_axis: Option<Vector2<f64>>,
    /// Rest length.
    pub rest_length: f64,
    /// Stiffness (N/m).
    pub stiffness: f64,
    /// Damping (N·s/m).
    pub damping: f64,
    cache: WarmStart,
}

impl SpringRow {
    /// Spring along the anchor line.
    #[must_use]
    pub fn new(
        local_a: Point2<f64>,
        local_b: Point2<f64>,
        rest_length: f64,
        stiffness: f64,
        damping: f64,
    ) -> Self {
        Self {
            local_a,
            local_b,
            local_axis: None,
            rest_length,
            stiffness,
            damping,
            cache: WarmStart::default(),
        }
    }

    /// Measure along `axis` (A's frame) instead of the anchor line.
    #[must_use]
    pub fn along_axis(mut self, axis: Vector2<f64>) -> Self {
        self.local_axis = Some(try_normalize(&axis).unwrap_or_else(Vector2::y));
        self
    }

    /// Spring force along the measuring direction, acting on B.
    #[must_use]
    pub fn hooke_force(&self, a: &BodyState, b: &BodyState) -> f64 {
        let stretch = self.error(a, b);
        let rate = self.jacobian(a, b).velocity(a, b);
        -(self.stiffness * stretch + self.damping * rate)
    }
}

impl Constraint for SpringRow {
    fn jacobian(&self, a: &BodyState, b: &BodyState) -> JacobianRow {
        let anchors = Anchors::new(a, b, &self.local_a, &self.local_b);
        match self.local_axis {
            Some(axis) => anchors.axis_row(&a.world_vector(&axis)),
            None => JacobianRow::relative(&anchors.direction(), &anchors.r_a, &anchors.r_b),
        }
    }

    fn push_factor(&self, a: &BodyState, b: &BodyState, dt: f64, _: f64) -> f64 {
        -self.error(a, b) / dt
    }

    fn clamping(&self, a: &BodyState, b: &BodyState, _: f64) -> Clamping {
        Clamping::towards(self.hooke_force(a, b))
    }

    fn corrects_position(&self) -> bool {
        false
    }

    /// Stretch beyond the rest length.
    fn error(&self, a: &BodyState, b: &BodyState) -> f64 {
        let anchors = Anchors::new(a, b, &self.local_a, &self.local_b);
        let length = match self.local_axis {
            Some(axis) => anchors.delta.dot(&a.world_vector(&axis)),
            None => anchors.delta.norm(),
        };
        length - self.rest_length
    }

    cache_accessors!();
}

/// Drives the relative angular velocity to a target, bounded by a torque.
#[derive(Debug, Clone, PartialEq)]
pub struct MotorRow {
    /// Target `ω_b - ω_a`.
    pub speed: f64,
    /// Maximal torque.
    pub max_torque: f64,
    cache: WarmStart,
}

impl MotorRow {
    /// Motor row.
    #[must_use]
    pub fn new(speed: f64, max_torque: f64) -> Self {
        Self {
            speed,
            max_torque,
            cache: WarmStart::default(),
        }
    }
}

impl Constraint for MotorRow {
    fn jacobian(&self, _: &BodyState, _: &BodyState) -> JacobianRow {
        JacobianRow::angular()
    }

    fn push_factor(&self, _: &BodyState, _: &BodyState, _: f64, _: f64) -> f64 {
        self.speed
    }

    fn clamping(&self, _: &BodyState, _: &BodyState, _: f64) -> Clamping {
        Clamping::symmetric(self.max_torque)
    }

    fn corrects_position(&self) -> bool {
        false
    }

    fn error(&self, _: &BodyState, _: &BodyState) -> f64 {
        0.0
    }

    cache_accessors!();
}

/// Pulls an anchor of body A towards a world target along one world axis,
/// bounded by a maximal force. B is ignored (the world).
#[derive(Debug, Clone, PartialEq)]
pub struct MouseRow {
    /// Anchor on A.
    pub local_a: Point2<f64>,
    /// World target.
    pub target: Point2<f64>,
    /// World axis of this row.
    pub axis: Vector2<f64>,
    /// Maximal force.
    pub max_force: f64,
    cache: WarmStart,
}

impl MouseRow {
    /// Mouse row along `axis`.
    #[must_use]
    pub fn new(local_a: Point2<f64>, target: Point2<f64>, axis: Vector2<f64>, max_force: f64) -> Self {
        Self {
            local_a,
            target,
            axis: try_normalize(&axis).unwrap_or_else(Vector2::x),
            max_force,
            cache: WarmStart::default(),
        }
    }
}

impl Constraint for MouseRow {
    fn jacobian(&self, a: &BodyState, _: &BodyState) -> JacobianRow {
        let r_a = a.world_point(&self.local_a).coords - a.position;
        JacobianRow {
            linear_a: self.axis,
            angular_a: cross(&r_a, &self.axis),
            linear_b: Vector2::zeros(),
            angular_b: 0.0,
        }
    }

    fn push_factor(&self, a: &BodyState, b: &BodyState, dt: f64, _: f64) -> f64 {
        -self.error(a, b) / dt
    }

    fn clamping(&self, _: &BodyState, _: &BodyState, _: f64) -> Clamping {
        Clamping::symmetric(self.max_force)
    }

    fn corrects_position(&self) -> bool {
        false
    }

    fn error(&self, a: &BodyState, _: &BodyState) -> f64 {
        (a.world_point(&self.local_a) - self.target).dot(&self.axis)
    }

    cache_accessors!();
}
