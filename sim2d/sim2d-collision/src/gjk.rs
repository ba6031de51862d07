//! GJK (Gilbert-Johnson-Keerthi) distance between convex pieces.
//!
//! # Algorithm Overview
//!
//! GJK works on the Minkowski difference `A - B`: the distance between two
//! convex shapes equals the distance from the origin to their difference. The
//! algorithm keeps a simplex of support points and repeatedly moves it
//! towards the origin with a support query along the current closest
//! direction.
//!
//! In 2D only the segment nearest the origin matters, so the simplex is
//! reduced to at most two points after every step. A third point is kept
//! only when the triangle encloses the origin: the shapes overlap and the
//! triangle seeds EPA.
//!
//! The difference is evaluated in the local frame of shape A through the
//! relative transform `B -> A`, so a pair's transform is computed once per
//! query rather than once per support call.
//!
//! # References
//!
//! - Gilbert, Johnson, Keerthi: "A Fast Procedure for Computing the Distance
//!   Between Complex Objects in Three-Dimensional Space" (1988)
//! - van den Bergen: "Collision Detection in Interactive 3D Environments" (2003)

use crate::shape::Convex;
use nalgebra::{Isometry2, Point2, Vector2};
use sim2d_types::math::{EPSILON, closest_on_segment_to_origin, cross};
use tracing::debug;

/// A point of the Minkowski difference with the supports that produced it.
///
/// All coordinates are in shape A's local frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MinkowskiPoint {
    /// `support_a - support_b`.
    pub point: Vector2<f64>,
    /// Support point on A.
    pub support_a: Point2<f64>,
    /// Support point on B (mapped into A's frame).
    pub support_b: Point2<f64>,
}

/// The Minkowski difference `A - B` of two placed convex pieces.
#[derive(Debug, Clone, Copy)]
pub struct MinkowskiDifference<'a> {
    a: Convex<'a>,
    b: Convex<'a>,
    b_to_a: Isometry2<f64>,
}

impl<'a> MinkowskiDifference<'a> {
    /// Difference of `a` placed at `pose_a` and `b` placed at `pose_b`.
    #[must_use]
    pub fn new(
        a: Convex<'a>,
        pose_a: &Isometry2<f64>,
        b: Convex<'a>,
        pose_b: &Isometry2<f64>,
    ) -> Self {
        Self::with_relative(a, b, pose_a.inv_mul(pose_b))
    }

    /// Difference from a cached relative transform `B -> A`.
    #[must_use]
    pub fn with_relative(a: Convex<'a>, b: Convex<'a>, b_to_a: Isometry2<f64>) -> Self {
        Self { a, b, b_to_a }
    }

    /// The relative transform `B -> A`.
    #[must_use]
    pub fn relative(&self) -> &Isometry2<f64> {
        &self.b_to_a
    }

    /// Shape A.
    #[must_use]
    pub fn shape_a(&self) -> Convex<'a> {
        self.a
    }

    /// Shape B.
    #[must_use]
    pub fn shape_b(&self) -> Convex<'a> {
        self.b
    }

    /// Support point of B along `direction` (A frame), in A's frame.
    #[must_use]
    pub fn support_b(&self, direction: &Vector2<f64>) -> Point2<f64> {
        let local = self.b_to_a.rotation.inverse() * direction;
        self.b_to_a * self.b.support(&local)
    }

    /// Support point of the difference along `direction` (A frame).
    #[must_use]
    pub fn support(&self, direction: &Vector2<f64>) -> MinkowskiPoint {
        let support_a = self.a.support(direction);
        let support_b = self.support_b(&-direction);
        MinkowskiPoint {
            point: support_a - support_b,
            support_a,
            support_b,
        }
    }
}

/// A GJK simplex with barycentric weights of its closest point.
#[derive(Debug, Clone, Copy, Default)]
pub struct Simplex {
    points: [MinkowskiPoint; 3],
    weights: [f64; 3],
    len: usize,
}

impl Simplex {
    fn single(p: MinkowskiPoint) -> Self {
        Self {
            points: [p, p, p],
            weights: [1.0, 0.0, 0.0],
            len: 1,
        }
    }

    fn push(&mut self, p: MinkowskiPoint) {
        if self.len < 3 {
            self.points[self.len] = p;
            self.len += 1;
        }
    }

    /// Number of points (1-3).
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the simplex is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The points.
    #[must_use]
    pub fn points(&self) -> &[MinkowskiPoint] {
        &self.points[..self.len]
    }

    fn contains(&self, p: &MinkowskiPoint) -> bool {
        self.points()
            .iter()
            .any(|q| (q.point - p.point).norm_squared() < EPSILON * EPSILON)
    }

    /// Closest point of the simplex to the origin.
    #[must_use]
    pub fn closest(&self) -> Vector2<f64> {
        self.points()
            .iter()
            .zip(self.weights.iter())
            .fold(Vector2::zeros(), |acc, (p, w)| acc + p.point * *w)
    }

    /// Witness points on A and B (A frame).
    #[must_use]
    pub fn witnesses(&self) -> (Point2<f64>, Point2<f64>) {
        let mut a = Vector2::zeros();
        let mut b = Vector2::zeros();
        for (p, w) in self.points().iter().zip(self.weights.iter()) {
            a += p.support_a.coords * *w;
            b += p.support_b.coords * *w;
        }
        (Point2::from(a), Point2::from(b))
    }

    fn keep_segment(&mut self, i: usize, j: usize, t: f64) {
        let (p, q) = (self.points[i], self.points[j]);
        if t <= 0.0 {
            *self = Self::single(p);
        } else if t >= 1.0 {
            *self = Self::single(q);
        } else {
            self.points = [p, q, q];
            self.weights = [1.0 - t, t, 0.0];
            self.len = 2;
        }
    }

    /// Reduce to the sub-simplex nearest the origin.
    ///
    /// Returns `true` if a triangle encloses the origin.
    fn reduce(&mut self) -> bool {
        match self.len {
            1 => {
                self.weights = [1.0, 0.0, 0.0];
                false
            }
            2 => {
                let (_, t) = closest_on_segment_to_origin(&self.points[0].point, &self.points[1].point);
                self.keep_segment(0, 1, t);
                false
            }
            _ => self.reduce_triangle(),
        }
    }

    fn reduce_triangle(&mut self) -> bool {
        let [a, b, c] = [self.points[0].point, self.points[1].point, self.points[2].point];
        let area = cross(&(b - a), &(c - a));
        if area.abs() > EPSILON {
            let s = area.signum();
            let inside = s * cross(&(b - a), &-a) >= 0.0
                && s * cross(&(c - b), &-b) >= 0.0
                && s * cross(&(a - c), &-c) >= 0.0;
            if inside {
                self.weights = [0.0; 3];
                return true;
            }
        }

        // Origin outside (or degenerate triangle): keep the nearest edge.
        let edges = [(0, 1), (1, 2), (2, 0)];
        let mut best = (0, 1, 0.0, f64::INFINITY);
        for (i, j) in edges {
            let (p, t) = closest_on_segment_to_origin(&self.points[i].point, &self.points[j].point);
            let d = p.norm_squared();
            if d < best.3 {
                best = (i, j, t, d);
            }
        }
        self.keep_segment(best.0, best.1, best.2);
        false
    }
}

/// Result of a GJK distance query.
#[derive(Debug, Clone, Copy)]
pub struct GjkResult {
    /// Distance between the shapes; 0 when they overlap or touch.
    pub distance: f64,
    /// Closest point on A (A frame).
    pub closest_a: Point2<f64>,
    /// Closest point on B (A frame).
    pub closest_b: Point2<f64>,
    /// Terminal simplex, the EPA seed when overlapping.
    pub simplex: Simplex,
    /// Iterations used.
    pub iterations: usize,
    /// Whether the relative-error criterion was met before the cap.
    pub converged: bool,
}

impl GjkResult {
    /// Whether the shapes overlap (or touch within tolerance).
    #[must_use]
    pub fn is_overlapping(&self) -> bool {
        self.distance <= 0.0
    }
}

/// Distance between the two shapes of a Minkowski difference.
///
/// Stops when `|v|² - v·w <= rel_error·|v|²` (the distance is known to
/// within `rel_error`), when the support point adds nothing new, or after
/// `max_iterations`. Returns distance 0 as soon as the origin is enclosed.
#[must_use]
pub fn gjk_distance(md: &MinkowskiDifference<'_>, rel_error: f64, max_iterations: usize) -> GjkResult {
    let initial = md.relative().translation.vector;
    let initial = if initial.norm_squared() > EPSILON * EPSILON {
        initial
    } else {
        Vector2::x()
    };
    let mut simplex = Simplex::single(md.support(&-initial));
    let mut v = simplex.closest();
    let mut converged = false;
    let mut iterations = 0;

    while iterations < max_iterations {
        iterations += 1;
        let v_sq = v.norm_squared();
        if v_sq < EPSILON * EPSILON {
            return overlap(simplex, iterations);
        }

        let w = md.support(&-v);
        if v_sq - v.dot(&w.point) <= rel_error * v_sq || simplex.contains(&w) {
            converged = true;
            break;
        }

        simplex.push(w);
        if simplex.reduce() {
            return overlap(simplex, iterations);
        }

        let next = simplex.closest();
        if next.norm_squared() >= v_sq {
            // No progress: numerical floor reached.
            debug!(iterations, "GJK stalled; accepting current distance");
            converged = true;
            break;
        }
        v = next;
    }

    if !converged {
        debug!(iterations, "GJK hit its iteration cap");
    }

    let distance = v.norm();
    if distance < EPSILON {
        return overlap(simplex, iterations);
    }
    let (closest_a, closest_b) = simplex.witnesses();
    GjkResult {
        distance,
        closest_a,
        closest_b,
        simplex,
        iterations,
        converged,
    }
}

fn overlap(simplex: Simplex, iterations: usize) -> GjkResult {
    let (closest_a, closest_b) = if simplex.len() < 3 {
        simplex.witnesses()
    } else {
        let p = simplex.points[0];
        (p.support_a, p.support_b)
    };
    GjkResult {
        distance: 0.0,
        closest_a,
        closest_b,
        simplex,
        iterations,
        converged: true,
    }
}

/// Distance between two placed convex pieces.
#[must_use]
pub fn distance(
    a: Convex<'_>,
    pose_a: &Isometry2<f64>,
    b: Convex<'_>,
    pose_b: &Isometry2<f64>,
    rel_error: f64,
    max_iterations: usize,
) -> f64 {
    gjk_distance(&MinkowskiDifference::new(a, pose_a, b, pose_b), rel_error, max_iterations).distance
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::shape::Shape;
    use approx::assert_relative_eq;

    const REL: f64 = 1e-6;

    fn at(x: f64, y: f64, angle: f64) -> Isometry2<f64> {
        Isometry2::new(Vector2::new(x, y), angle)
    }

    fn dist(a: &Shape, pa: Isometry2<f64>, b: &Shape, pb: Isometry2<f64>) -> GjkResult {
        let md = MinkowskiDifference::new(
            a.convex(crate::ShapePart::Whole),
            &pa,
            b.convex(crate::ShapePart::Whole),
            &pb,
        );
        gjk_distance(&md, REL, 64)
    }

    #[test]
    fn test_circles_distance() {
        let c = Shape::circle(1.0).unwrap();
        let r = dist(&c, at(0.0, 0.0, 0.0), &c, at(5.0, 0.0, 0.0));
        assert_relative_eq!(r.distance, 3.0, max_relative = REL);
        assert_relative_eq!(r.closest_a, Point2::new(1.0, 0.0), epsilon = 1e-3);
        assert_relative_eq!(r.closest_b, Point2::new(4.0, 0.0), epsilon = 1e-3);
    }

    #[test]
    fn test_boxes_distance() {
        let b = Shape::rectangle(1.0, 1.0).unwrap();
        let r = dist(&b, at(0.0, 0.0, 0.0), &b, at(3.5, 0.7, 0.0));
        assert_relative_eq!(r.distance, 1.5, max_relative = REL);
        assert!(r.converged);
    }

    #[test]
    fn test_rotated_box_corner_distance() {
        let b = Shape::rectangle(1.0, 1.0).unwrap();
        // Diamond corner at x = 4 - sqrt(2) facing the box face at x = 1.
        let r = dist(
            &b,
            at(0.0, 0.0, 0.0),
            &b,
            at(4.0, 0.0, std::f64::consts::FRAC_PI_4),
        );
        assert_relative_eq!(r.distance, 3.0 - 2.0_f64.sqrt(), max_relative = REL);
    }

    #[test]
    fn test_capsule_ellipse_distance() {
        let cap = Shape::capsule(1.0, 0.5).unwrap();
        let ell = Shape::ellipse(0.5, 2.0).unwrap();
        let r = dist(&cap, at(0.0, 0.0, 0.0), &ell, at(4.0, 0.0, 0.0));
        // Capsule reaches x = 1.5, ellipse starts at x = 3.5.
        assert_relative_eq!(r.distance, 2.0, max_relative = 1e-5);
    }

    #[test]
    fn test_overlap_detected() {
        let c = Shape::circle(1.0).unwrap();
        let r = dist(&c, at(0.0, 0.0, 0.0), &c, at(1.5, 0.0, 0.0));
        assert!(r.is_overlapping());
        assert_eq!(r.distance, 0.0);

        let b = Shape::rectangle(1.0, 1.0).unwrap();
        let r = dist(&b, at(0.0, 0.0, 0.0), &b, at(0.5, 0.3, 0.2));
        assert!(r.is_overlapping());
    }

    #[test]
    fn test_concentric_overlap() {
        let c = Shape::circle(1.0).unwrap();
        let r = dist(&c, at(2.0, 2.0, 0.0), &c, at(2.0, 2.0, 0.0));
        assert!(r.is_overlapping());
    }

    #[test]
    fn test_convenience_distance() {
        let b = Shape::rectangle(0.5, 0.5).unwrap();
        let c = Shape::circle(0.5).unwrap();
        let d = distance(
            b.convex(crate::ShapePart::Whole),
            &at(0.0, 0.0, 0.0),
            c.convex(crate::ShapePart::Whole),
            &at(0.0, 3.0, 0.0),
            REL,
            64,
        );
        assert_relative_eq!(d, 2.0, max_relative = REL);
    }
}
