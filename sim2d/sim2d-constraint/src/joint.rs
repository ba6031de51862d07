//! Joints: fixed sets of constraint rows over one or two bodies.
//!
//! Joint definitions take world-space anchors and axes; they are converted to
//! body-local coordinates once, at construction, from the bodies' current
//! poses. A missing `body_b` attaches the joint to the world (a fixed body at
//! the origin), so its local anchor is the world anchor.
//!
//! | kind      | rows                                                  |
//! |-----------|-------------------------------------------------------|
//! | distance  | distance                                              |
//! | revolute  | point-on-axis × 2                                     |
//! | weld      | point-on-axis × 2, angle                              |
//! | prismatic | point-on-axis, angle, optional lower and upper limits |
//! | wheel     | point-on-axis, optional suspension spring             |
//! | spring    | spring                                                |
//! | motor     | motor                                                 |
//! | mouse     | mouse × 2                                             |

use crate::constraint::{BodyState, Constraint};
use crate::constraints::{
    AngleRow, AxisLimitRow, DistanceRow, LimitSide, MotorRow, MouseRow, PointOnAxisRow, SpringRow,
};
use nalgebra::{Point2, Vector2};
use sim2d_types::BodyId;
use sim2d_types::math::perp;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Kind of a joint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum JointKind {
    /// Fixed distance between two anchors.
    Distance,
    /// Shared pivot, free rotation.
    Revolute,
    /// Rigid attachment.
    Weld,
    /// Translation along one axis, no rotation.
    Prismatic,
    /// Pivot sliding along a suspension axis.
    Wheel,
    /// Damped spring between two anchors.
    Spring,
    /// Relative angular velocity drive.
    Motor,
    /// Drags an anchor towards a moving target.
    Mouse,
}

/// Distance joint definition.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DistanceJointDef {
    /// First body.
    pub body_a: BodyId,
    /// Second body, or the world.
    pub body_b: Option<BodyId>,
    /// World anchor on A.
    pub anchor_a: Point2<f64>,
    /// World anchor on B.
    pub anchor_b: Point2<f64>,
    /// Target length; the current anchor distance when `None`.
    pub length: Option<f64>,
}

/// Revolute joint definition.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RevoluteJointDef {
    /// First body.
    pub body_a: BodyId,
    /// Second body, or the world.
    pub body_b: Option<BodyId>,
    /// World pivot.
    pub anchor: Point2<f64>,
}

/// Weld joint definition.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WeldJointDef {
    /// First body.
    pub body_a: BodyId,
    /// Second body, or the world.
    pub body_b: Option<BodyId>,
    /// World weld point.
    pub anchor: Point2<f64>,
}

/// Prismatic joint definition.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PrismaticJointDef {
    /// First body; the axis is fixed in its frame.
    pub body_a: BodyId,
    /// Second body, or the world.
    pub body_b: Option<BodyId>,
    /// World anchor shared at creation.
    pub anchor: Point2<f64>,
    /// World slide axis.
    pub axis: Vector2<f64>,
    /// Lower translation limit.
    pub lower: Option<f64>,
    /// Upper translation limit.
    pub upper: Option<f64>,
}

/// Suspension of a wheel joint.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Suspension {
    /// Stiffness (N/m).
    pub stiffness: f64,
    /// Damping (N·s/m).
    pub damping: f64,
}

/// Wheel joint definition.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WheelJointDef {
    /// Chassis; the axis is fixed in its frame.
    pub body_a: BodyId,
    /// Wheel, or the world.
    pub body_b: Option<BodyId>,
    /// World wheel center.
    pub anchor: Point2<f64>,
    /// World suspension axis.
    pub axis: Vector2<f64>,
    /// Suspension spring; the wheel slides freely along the axis without one.
    pub suspension: Option<Suspension>,
}

/// Spring joint definition.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpringJointDef {
    /// First body.
    pub body_a: BodyId,
    /// Second body, or the world.
    pub body_b: Option<BodyId>,
    /// World anchor on A.
    pub anchor_a: Point2<f64>,
    /// World anchor on B.
    pub anchor_b: Point2<f64>,
    /// Rest length; the current anchor distance when `None`.
    pub rest_length: Option<f64>,
    /// Stiffness (N/m).
    pub stiffness: f64,
    /// Damping (N·s/m).
    pub damping: f64,
}

/// Motor definition.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MotorDef {
    /// First body.
    pub body_a: BodyId,
    /// Second body, or the world.
    pub body_b: Option<BodyId>,
    /// Target `ω_b - ω_a` (rad/s).
    pub speed: f64,
    /// Maximal torque.
    pub max_torque: f64,
}

/// Mouse joint definition.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MouseJointDef {
    /// Dragged body.
    pub body: BodyId,
    /// World grab point on the body.
    pub anchor: Point2<f64>,
    /// World target.
    pub target: Point2<f64>,
    /// Maximal force per axis.
    pub max_force: f64,
}

/// An ordered, fixed set of constraint rows over one or two bodies.
#[derive(Debug)]
pub struct Joint {
    kind: JointKind,
    body_a: BodyId,
    body_b: Option<BodyId>,
    constraints: Box<[Box<dyn Constraint>]>,
}

impl Joint {
    fn from_rows(
        kind: JointKind,
        body_a: BodyId,
        body_b: Option<BodyId>,
        rows: Vec<Box<dyn Constraint>>,
    ) -> Self {
        Self {
            kind,
            body_a,
            body_b,
            constraints: rows.into_boxed_slice(),
        }
    }

    /// Distance joint between the current states `a` and `b`.
    #[must_use]
    pub fn distance(def: &DistanceJointDef, a: &BodyState, b: &BodyState) -> Self {
        let length = def
            .length
            .unwrap_or_else(|| (def.anchor_b - def.anchor_a).norm());
        let row = DistanceRow::new(a.local_point(&def.anchor_a), b.local_point(&def.anchor_b), length);
        Self::from_rows(JointKind::Distance, def.body_a, def.body_b, vec![Box::new(row)])
    }

    /// Revolute joint.
    #[must_use]
    pub fn revolute(def: &RevoluteJointDef, a: &BodyState, b: &BodyState) -> Self {
        Self::from_rows(
            JointKind::Revolute,
            def.body_a,
            def.body_b,
            pivot_rows(&def.anchor, a, b),
        )
    }

    /// Weld joint.
    #[must_use]
    pub fn weld(def: &WeldJointDef, a: &BodyState, b: &BodyState) -> Self {
        let mut rows = pivot_rows(&def.anchor, a, b);
        rows.push(Box::new(AngleRow::new(b.angle - a.angle)));
        Self::from_rows(JointKind::Weld, def.body_a, def.body_b, rows)
    }

    /// Prismatic joint; limits are translations of B's anchor along the
    /// axis, relative to the shared anchor.
    #[must_use]
    pub fn prismatic(def: &PrismaticJointDef, a: &BodyState, b: &BodyState) -> Self {
        let local_a = a.local_point(&def.anchor);
        let local_b = b.local_point(&def.anchor);
        let axis = local_axis(&def.axis, a);
        let mut rows: Vec<Box<dyn Constraint>> = vec![
            Box::new(PointOnAxisRow::new(local_a, local_b, perp(&axis))),
            Box::new(AngleRow::new(b.angle - a.angle)),
        ];
        if let Some(lower) = def.lower {
            rows.push(Box::new(AxisLimitRow::new(local_a, local_b, axis, lower, LimitSide::Lower)));
        }
        if let Some(upper) = def.upper {
            rows.push(Box::new(AxisLimitRow::new(local_a, local_b, axis, upper, LimitSide::Upper)));
        }
        Self::from_rows(JointKind::Prismatic, def.body_a, def.body_b, rows)
    }

    /// Wheel joint.
    #[must_use]
    pub fn wheel(def: &WheelJointDef, a: &BodyState, b: &BodyState) -> Self {
        let local_a = a.local_point(&def.anchor);
        let local_b = b.local_point(&def.anchor);
        let axis = local_axis(&def.axis, a);
        let mut rows: Vec<Box<dyn Constraint>> =
            vec![Box::new(PointOnAxisRow::new(local_a, local_b, perp(&axis)))];
        if let Some(suspension) = def.suspension {
            let spring = SpringRow::new(local_a, local_b, 0.0, suspension.stiffness, suspension.damping)
                .along_axis(axis);
            rows.push(Box::new(spring));
        }
        Self::from_rows(JointKind::Wheel, def.body_a, def.body_b, rows)
    }

    /// Spring joint.
    #[must_use]
    pub fn spring(def: &SpringJointDef, a: &BodyState, b: &BodyState) -> Self {
        let rest = def
            .rest_length
            .unwrap_or_else(|| (def.anchor_b - def.anchor_a).norm());
        let row = SpringRow::new(
            a.local_point(&def.anchor_a),
            b.local_point(&def.anchor_b),
            rest,
            def.stiffness,
            def.damping,
        );
        Self::from_rows(JointKind::Spring, def.body_a, def.body_b, vec![Box::new(row)])
    }

    /// Motor.
    #[must_use]
    pub fn motor(def: &MotorDef) -> Self {
        let row = MotorRow::new(def.speed, def.max_torque);
        Self::from_rows(JointKind::Motor, def.body_a, def.body_b, vec![Box::new(row)])
    }

    /// Mouse joint on the body whose current state is `a`.
    #[must_use]
    pub fn mouse(def: &MouseJointDef, a: &BodyState) -> Self {
        let local = a.local_point(&def.anchor);
        let rows: Vec<Box<dyn Constraint>> = vec![
            Box::new(MouseRow::new(local, def.target, Vector2::x(), def.max_force)),
            Box::new(MouseRow::new(local, def.target, Vector2::y(), def.max_force)),
        ];
        Self::from_rows(JointKind::Mouse, def.body, None, rows)
    }

    /// Kind of the joint.
    #[must_use]
    pub fn kind(&self) -> JointKind {
        self.kind
    }

    /// First body.
    #[must_use]
    pub fn body_a(&self) -> BodyId {
        self.body_a
    }

    /// Second body, `None` for the world.
    #[must_use]
    pub fn body_b(&self) -> Option<BodyId> {
        self.body_b
    }

    /// Number of constraint rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.constraints.len()
    }

    /// Rows in order.
    pub fn rows(&self) -> impl Iterator<Item = &dyn Constraint> {
        self.constraints.iter().map(|row| row.as_ref())
    }

    /// Rows in order, mutably.
    pub fn rows_mut(&mut self) -> impl Iterator<Item = &mut dyn Constraint> {
        self.constraints
            .iter_mut()
            .map(|row| row.as_mut() as &mut dyn Constraint)
    }

    /// Largest absolute position error over the rows.
    #[must_use]
    pub fn max_error(&self, a: &BodyState, b: &BodyState) -> f64 {
        self.rows()
            .map(|row| row.error(a, b).abs())
            .fold(0.0, f64::max)
    }

    /// Move the target of a mouse joint. Returns `false` for other kinds.
    pub fn set_mouse_target(&mut self, target: Point2<f64>) -> bool {
        if self.kind != JointKind::Mouse {
            return false;
        }
        for row in self.constraints.iter_mut() {
            if let Some(mouse) = row.as_any_mut().downcast_mut::<MouseRow>() {
                mouse.target = target;
            }
        }
        true
    }

    /// Forget all warm-start multipliers.
    pub fn reset_warm_start(&mut self) {
        for row in self.rows_mut() {
            row.cache_mut().reset();
        }
    }
}

/// Two point-on-axis rows pinning a shared world point.
fn pivot_rows(anchor: &Point2<f64>, a: &BodyState, b: &BodyState) -> Vec<Box<dyn Constraint>> {
    let local_a = a.local_point(anchor);
    let local_b = b.local_point(anchor);
    vec![
        Box::new(PointOnAxisRow::new(local_a, local_b, local_axis(&Vector2::x(), a))),
        Box::new(PointOnAxisRow::new(local_a, local_b, local_axis(&Vector2::y(), a))),
    ]
}

fn local_axis(world: &Vector2<f64>, body: &BodyState) -> Vector2<f64> {
    body.pose().rotation.inverse() * world
}
