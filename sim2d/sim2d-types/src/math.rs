//! Planar math helpers on top of nalgebra.
//!
//! The simulation works in `f64` throughout. Orientation is a scalar angle in
//! radians (counter-clockwise); poses are [`Isometry2`].

pub use nalgebra::{Isometry2, Point2, Rotation2, UnitComplex, Vector2, Vector3};

/// Tolerance used for "is this length zero" checks.
pub const EPSILON: f64 = 1e-10;

/// Scalar 2D cross product `a.x * b.y - a.y * b.x`.
#[inline]
#[must_use]
pub fn cross(a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Cross product of a scalar (out-of-plane vector) with a planar vector.
///
/// This is `ω × r`, the tangential velocity of a point at offset `r`.
#[inline]
#[must_use]
pub fn cross_sv(s: f64, v: &Vector2<f64>) -> Vector2<f64> {
    Vector2::new(-s * v.y, s * v.x)
}

/// Cross product of a planar vector with a scalar.
#[inline]
#[must_use]
pub fn cross_vs(v: &Vector2<f64>, s: f64) -> Vector2<f64> {
    Vector2::new(s * v.y, -s * v.x)
}

/// Counter-clockwise perpendicular.
#[inline]
#[must_use]
pub fn perp(v: &Vector2<f64>) -> Vector2<f64> {
    Vector2::new(-v.y, v.x)
}

/// Normalize `v`, or `None` if it is too short to have a direction.
#[inline]
#[must_use]
pub fn try_normalize(v: &Vector2<f64>) -> Option<Vector2<f64>> {
    let len = v.norm();
    (len > EPSILON && len.is_finite()).then(|| v / len)
}

/// Build a pose from a position and an angle.
#[inline]
#[must_use]
pub fn pose(position: Vector2<f64>, angle: f64) -> Isometry2<f64> {
    Isometry2::new(position, angle)
}

/// Closest point to the origin on segment `[a, b]`, with the barycentric
/// weight of `b` (0 at `a`, 1 at `b`).
#[must_use]
pub fn closest_on_segment_to_origin(a: &Vector2<f64>, b: &Vector2<f64>) -> (Vector2<f64>, f64) {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq < EPSILON * EPSILON {
        return (*a, 0.0);
    }
    let t = (-a.dot(&ab) / len_sq).clamp(0.0, 1.0);
    (a + ab * t, t)
}
