//! Contact constraints.
//!
//! A persistent contact is a non-penetration row plus, when the combined
//! friction is positive, a Coulomb friction row bounded by the normal row's
//! multiplier. The geometry is refreshed every sub-step from the narrow phase
//! while the warm-start caches survive.

use crate::constraint::{BodyState, Clamping, Constraint, JacobianRow, WarmStart};
use nalgebra::{Point2, Vector2};
use sim2d_types::Settings;
use sim2d_types::math::perp;
use std::any::Any;

/// Solver knobs shared by every contact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactParams {
    /// Penetration left uncorrected by the position pass.
    pub slop: f64,
    /// Approach speed below which restitution is ignored.
    pub restitution_threshold: f64,
}

impl ContactParams {
    /// Read the contact knobs from `settings`.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            slop: settings.contact_constraint_slop,
            restitution_threshold: settings.restitution_threshold,
        }
    }
}

impl Default for ContactParams {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// Contact geometry in body space.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Geometry {
    local_a: Point2<f64>,
    local_b: Point2<f64>,
    /// World normal from A to B.
    normal: Vector2<f64>,
}

impl Geometry {
    fn lever_arms(&self, a: &BodyState, b: &BodyState) -> (Vector2<f64>, Vector2<f64>) {
        (
            a.world_point(&self.local_a).coords - a.position,
            b.world_point(&self.local_b).coords - b.position,
        )
    }

    fn separation(&self, a: &BodyState, b: &BodyState) -> f64 {
        (b.world_point(&self.local_b) - a.world_point(&self.local_a)).dot(&self.normal)
    }
}

/// Non-penetration row: `λ >= 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactRow {
    geometry: Geometry,
    restitution: f64,
    params: ContactParams,
    cache: WarmStart,
}

impl Constraint for ContactRow {
    fn jacobian(&self, a: &BodyState, b: &BodyState) -> JacobianRow {
        let (r_a, r_b) = self.geometry.lever_arms(a, b);
        JacobianRow::relative(&self.geometry.normal, &r_a, &r_b)
    }

    fn push_factor(&self, a: &BodyState, b: &BodyState, dt: f64, strength: f64) -> f64 {
        if strength > 0.0 {
            let depth = -self.geometry.separation(a, b);
            return strength * (depth - self.params.slop).max(0.0) / dt;
        }
        let approach = self.jacobian(a, b).velocity(a, b);
        if approach < -self.params.restitution_threshold {
            -self.restitution * approach
        } else {
            0.0
        }
    }

    fn clamping(&self, _: &BodyState, _: &BodyState, _: f64) -> Clamping {
        Clamping::NON_NEGATIVE
    }

    fn cache(&self) -> &WarmStart {
        &self.cache
    }

    fn cache_mut(&mut self) -> &mut WarmStart {
        &mut self.cache
    }

    /// Signed separation along the normal, negative when penetrating.
    fn error(&self, a: &BodyState, b: &BodyState) -> f64 {
        self.geometry.separation(a, b)
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Tangential friction row: `|λ| <= μ·λₙ`.
#[derive(Debug, Clone, PartialEq)]
pub struct FrictionRow {
    geometry: Geometry,
    coefficient: f64,
    cache: WarmStart,
}

impl Constraint for FrictionRow {
    fn jacobian(&self, a: &BodyState, b: &BodyState) -> JacobianRow {
        let (r_a, r_b) = self.geometry.lever_arms(a, b);
        JacobianRow::relative(&perp(&self.geometry.normal), &r_a, &r_b)
    }

    fn push_factor(&self, _: &BodyState, _: &BodyState, _: f64, _: f64) -> f64 {
        0.0
    }

    fn clamping(&self, _: &BodyState, _: &BodyState, _: f64) -> Clamping {
        Clamping::Friction {
            coefficient: self.coefficient,
            normal: 0,
        }
    }

    fn cache(&self) -> &WarmStart {
        &self.cache
    }

    fn cache_mut(&mut self) -> &mut WarmStart {
        &mut self.cache
    }

    fn corrects_position(&self) -> bool {
        false
    }

    fn error(&self, _: &BodyState, _: &BodyState) -> f64 {
        0.0
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A persistent contact: normal row, then optional friction row.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactConstraint {
    normal: ContactRow,
    friction: Option<FrictionRow>,
}

impl ContactConstraint {
    /// Contact between body-space points `local_a` and `local_b` with world
    /// normal `normal` (A to B).
    #[must_use]
    pub fn new(
        local_a: Point2<f64>,
        local_b: Point2<f64>,
        normal: Vector2<f64>,
        friction: f64,
        restitution: f64,
        params: ContactParams,
    ) -> Self {
        let geometry = Geometry {
            local_a,
            local_b,
            normal,
        };
        Self {
            normal: ContactRow {
                geometry,
                restitution,
                params,
                cache: WarmStart::default(),
            },
            friction: (friction > 0.0).then(|| FrictionRow {
                geometry,
                coefficient: friction,
                cache: WarmStart::default(),
            }),
        }
    }

    /// Refresh the geometry, keeping the warm-start caches.
    pub fn update(&mut self, local_a: Point2<f64>, local_b: Point2<f64>, normal: Vector2<f64>) {
        let geometry = Geometry {
            local_a,
            local_b,
            normal,
        };
        self.normal.geometry = geometry;
        if let Some(friction) = &mut self.friction {
            friction.geometry = geometry;
        }
    }

    /// Number of solver rows (1 or 2).
    #[must_use]
    pub fn row_count(&self) -> usize {
        1 + usize::from(self.friction.is_some())
    }

    /// Signed separation, negative when penetrating.
    #[must_use]
    pub fn separation(&self, a: &BodyState, b: &BodyState) -> f64 {
        self.normal.geometry.separation(a, b)
    }

    /// World normal from A to B.
    #[must_use]
    pub fn normal(&self) -> Vector2<f64> {
        self.normal.geometry.normal
    }

    /// Last velocity-pass multiplier of the normal row.
    #[must_use]
    pub fn normal_force(&self) -> f64 {
        self.normal.cache.velocity
    }

    /// Last velocity-pass multiplier of the friction row (0 without friction).
    #[must_use]
    pub fn friction_force(&self) -> f64 {
        self.friction.as_ref().map_or(0.0, |row| row.cache.velocity)
    }

    /// Rows in solver order.
    pub fn rows_mut(&mut self) -> impl Iterator<Item = &mut dyn Constraint> {
        std::iter::once(&mut self.normal as &mut dyn Constraint)
            .chain(self.friction.as_mut().map(|row| row as &mut dyn Constraint))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Unit box resting on the ground, sunk by `depth`.
    fn resting(depth: f64) -> (BodyState, BodyState, ContactConstraint) {
        let ground = BodyState::fixed(Vector2::zeros(), 0.0);
        let body = BodyState::dynamic(Vector2::new(0.0, 0.5 - depth), 0.0, 1.0, 1.0);
        let contact = ContactConstraint::new(
            Point2::new(0.0, 0.0),
            Point2::new(0.0, -0.5),
            Vector2::y(),
            0.5,
            0.0,
            ContactParams {
                slop: 0.01,
                restitution_threshold: 1.0,
            },
        );
        (ground, body, contact)
    }

    #[test]
    fn test_separation_and_position_bias() {
        let (ground, body, mut contact) = resting(0.05);
        assert_relative_eq!(contact.separation(&ground, &body), -0.05, epsilon = 1e-12);
        let row = contact.rows_mut().next().unwrap();
        // 0.5 · (0.05 - 0.01) / 0.1
        assert_relative_eq!(row.push_factor(&ground, &body, 0.1, 0.5), 0.2, epsilon = 1e-12);
        assert_eq!(row.clamping(&ground, &body, 0.1), Clamping::NON_NEGATIVE);
    }

    #[test]
    fn test_restitution_above_threshold_only() {
        let ground = BodyState::fixed(Vector2::zeros(), 0.0);
        let mut contact = ContactConstraint::new(
            Point2::origin(),
            Point2::new(0.0, -0.5),
            Vector2::y(),
            0.0,
            0.5,
            ContactParams {
                slop: 0.0,
                restitution_threshold: 1.0,
            },
        );
        let row = contact.rows_mut().next().unwrap();
        let fast = BodyState::dynamic(Vector2::new(0.0, 0.5), 0.0, 1.0, 1.0)
            .with_velocity(Vector2::new(0.0, -4.0), 0.0);
        assert_relative_eq!(row.push_factor(&ground, &fast, 0.1, 0.0), 2.0);
        let slow = fast.with_velocity(Vector2::new(0.0, -0.5), 0.0);
        assert_eq!(row.push_factor(&ground, &slow, 0.1, 0.0), 0.0);
    }

    #[test]
    fn test_friction_row_is_tangential() {
        let (ground, body, mut contact) = resting(0.0);
        assert_eq!(contact.row_count(), 2);
        let rows: Vec<_> = contact.rows_mut().collect();
        let tangent = rows[1].jacobian(&ground, &body);
        assert_relative_eq!(tangent.linear_b, Vector2::new(-1.0, 0.0));
        assert!(!rows[1].corrects_position());
        assert_eq!(
            rows[1].clamping(&ground, &body, 0.1),
            Clamping::Friction {
                coefficient: 0.5,
                normal: 0
            }
        );
    }

    #[test]
    fn test_update_keeps_warm_start() {
        let (_, _, mut contact) = resting(0.0);
        for row in contact.rows_mut() {
            row.cache_mut().velocity = 3.0;
        }
        contact.update(Point2::new(0.1, 0.0), Point2::new(0.1, -0.5), Vector2::y());
        assert_eq!(contact.normal_force(), 3.0);
        assert_eq!(contact.friction_force(), 3.0);
    }

    #[test]
    fn test_frictionless_has_one_row() {
        let contact = ContactConstraint::new(
            Point2::origin(),
            Point2::origin(),
            Vector2::x(),
            0.0,
            0.0,
            ContactParams::default(),
        );
        assert_eq!(contact.row_count(), 1);
        assert_eq!(contact.friction_force(), 0.0);
    }
}
