//! Time of impact by conservative advancement.
//!
//! Both shapes move with constant linear and angular velocity over the
//! interval. At each iteration GJK gives the current distance `d` and the
//! separating direction `n`. No point of either shape can approach the other
//! faster than
//!
//! ```text
//! speed = (v_a - v_b) · n + |ω_a|·r_a + |ω_b|·r_b
//! ```
//!
//! where `r` is the shape's maximal support radius, so advancing time by
//! `d / speed` can never step past the first contact.

use crate::gjk::{MinkowskiDifference, gjk_distance};
use crate::shape::Convex;
use nalgebra::{Isometry2, Vector2};
use sim2d_types::Settings;
use sim2d_types::math::pose;
use tracing::{debug, warn};

/// Rigid motion with constant velocity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motion {
    /// Position at the start of the interval.
    pub position: Vector2<f64>,
    /// Angle at the start of the interval.
    pub angle: f64,
    /// Linear velocity.
    pub velocity: Vector2<f64>,
    /// Angular velocity.
    pub angular_velocity: f64,
}

impl Motion {
    /// A moving pose.
    #[must_use]
    pub fn new(position: Vector2<f64>, angle: f64, velocity: Vector2<f64>, angular_velocity: f64) -> Self {
        Self {
            position,
            angle,
            velocity,
            angular_velocity,
        }
    }

    /// A body at rest.
    #[must_use]
    pub fn fixed(position: Vector2<f64>, angle: f64) -> Self {
        Self::new(position, angle, Vector2::zeros(), 0.0)
    }

    /// Pose after `time` seconds.
    #[must_use]
    pub fn at(&self, time: f64) -> Isometry2<f64> {
        pose(
            self.position + self.velocity * time,
            self.angle + self.angular_velocity * time,
        )
    }
}

/// Normalized time of first contact within `interval` seconds.
///
/// Returns a value in `[0, 1]`; `1` means no impact within the interval.
/// Shapes that already overlap at the start also return `1`: the contact
/// solver owns them. Once the shapes are closer than `toi_epsilon`, the
/// result is pushed forward by the time needed to sink
/// `toi_penetration_depth` into each other, so the sub-step ending there
/// produces a contact.
#[must_use]
pub fn time_of_impact(
    a: Convex<'_>,
    motion_a: &Motion,
    b: Convex<'_>,
    motion_b: &Motion,
    interval: f64,
    settings: &Settings,
) -> f64 {
    if interval <= 0.0 {
        return 1.0;
    }
    let angular_bound = motion_a.angular_velocity.abs() * a.max_radius()
        + motion_b.angular_velocity.abs() * b.max_radius();
    let relative_velocity = motion_a.velocity - motion_b.velocity;

    let mut t = 0.0;
    for iteration in 0..settings.toi_max_iterations {
        let pose_a = motion_a.at(t * interval);
        let pose_b = motion_b.at(t * interval);
        let md = MinkowskiDifference::new(a, &pose_a, b, &pose_b);
        let gjk = gjk_distance(&md, settings.gjk_rel_error, settings.gjk_max_iterations);
        if gjk.is_overlapping() {
            // Overlap found while advancing means the bound was too coarse
            // only within GJK tolerance; the current time is still safe.
            return if iteration == 0 { 1.0 } else { t };
        }

        let distance = gjk.distance;
        let Some(direction) = (gjk.closest_b - gjk.closest_a).try_normalize(0.0) else {
            return t;
        };
        let normal = pose_a.rotation * direction;
        let speed = relative_velocity.dot(&normal) + angular_bound;
        if speed <= 0.0 {
            return 1.0;
        }

        if distance < settings.toi_epsilon {
            let sink = settings.toi_penetration_depth / (speed * interval);
            return (t + sink).min(1.0);
        }

        let step = distance / (speed * interval);
        if !step.is_finite() {
            debug!(distance, speed, "non-finite TOI step");
            return 1.0;
        }
        t += step;
        if t >= 1.0 {
            return 1.0;
        }
    }

    warn!(
        iterations = settings.toi_max_iterations,
        t, "TOI hit its iteration cap"
    );
    t
}
