//! EPA (Expanding Polytope Algorithm) for penetration depth.
//!
//! Entered once GJK reports overlap. Starting from GJK's terminal simplex,
//! the polytope inside the Minkowski difference is grown towards its
//! boundary, always expanding the edge nearest the origin:
//!
//! 1. Pop the nearest edge from a priority queue keyed by squared distance
//! 2. Query a support point along the edge's outward normal
//! 3. If the point does not push the boundary out by more than epsilon, the
//!    edge lies on the boundary: its normal and distance are the answer
//! 4. Otherwise split the edge at the new point and enqueue both halves
//!
//! The polytope is convex and encloses the origin, so splitting the nearest
//! edge never invalidates any other queued edge.

use crate::gjk::{MinkowskiDifference, MinkowskiPoint, Simplex};
use crate::shape::convex_hull;
use nalgebra::{Point2, Vector2};
use sim2d_types::math::{EPSILON, cross, perp, try_normalize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use tracing::{debug, warn};

/// Result of EPA, in shape A's frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpaResult {
    /// Unit normal pointing from A towards B.
    pub normal: Vector2<f64>,
    /// Penetration depth (non-negative).
    pub depth: f64,
    /// Deepest point of A inside B.
    pub point_a: Point2<f64>,
    /// Deepest point of B inside A.
    pub point_b: Point2<f64>,
    /// Iterations used.
    pub iterations: usize,
}

impl EpaResult {
    /// Minimum translation vector: moving A by `-mtv` separates the shapes.
    #[must_use]
    pub fn mtv(&self) -> Vector2<f64> {
        self.normal * self.depth
    }
}

/// A polytope edge between vertices `a` and `b` (counter-clockwise).
#[derive(Debug, Clone, Copy)]
struct EpaEdge {
    a: usize,
    b: usize,
    normal: Vector2<f64>,
    distance: f64,
}

impl EpaEdge {
    fn new(vertices: &[MinkowskiPoint], a: usize, b: usize) -> Option<Self> {
        let pa = vertices[a].point;
        let pb = vertices[b].point;
        let e = pb - pa;
        let normal = try_normalize(&Vector2::new(e.y, -e.x))?;
        Some(Self {
            a,
            b,
            normal,
            distance: normal.dot(&pa),
        })
    }
}

impl PartialEq for EpaEdge {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for EpaEdge {}

impl PartialOrd for EpaEdge {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EpaEdge {
    /// Reversed so that `BinaryHeap` pops the nearest edge first.
    fn cmp(&self, other: &Self) -> Ordering {
        let d_self = self.distance * self.distance;
        let d_other = other.distance * other.distance;
        d_other
            .total_cmp(&d_self)
            .then_with(|| other.a.cmp(&self.a))
    }
}

/// Build a counter-clockwise polytope around the origin.
fn seed_polytope(md: &MinkowskiDifference<'_>, simplex: &Simplex) -> Vec<MinkowskiPoint> {
    let pts = simplex.points();
    match pts.len() {
        3 => {
            let mut v = [pts[0], pts[1], pts[2]];
            if cross(&(v[1].point - v[0].point), &(v[2].point - v[0].point)) < 0.0 {
                v.swap(1, 2);
            }
            v.to_vec()
        }
        2 => {
            let (s0, s1) = (pts[0], pts[1]);
            let left = try_normalize(&perp(&(s1.point - s0.point))).unwrap_or_else(Vector2::y);
            let right_pt = md.support(&-left);
            let left_pt = md.support(&left);
            let mut v = vec![s0];
            if (right_pt.point - s0.point).dot(&-left) > EPSILON {
                v.push(right_pt);
            }
            v.push(s1);
            if (left_pt.point - s0.point).dot(&left) > EPSILON {
                v.push(left_pt);
            }
            v
        }
        _ => hull_seed(md),
    }
}

/// Seed from supports along eight directions.
fn hull_seed(md: &MinkowskiDifference<'_>) -> Vec<MinkowskiPoint> {
    let candidates: Vec<MinkowskiPoint> = (0..8)
        .map(|k| {
            let angle = f64::from(k) * std::f64::consts::FRAC_PI_4;
            md.support(&Vector2::new(angle.cos(), angle.sin()))
        })
        .collect();
    let points: Vec<Point2<f64>> = candidates.iter().map(|m| Point2::from(m.point)).collect();
    convex_hull(&points)
        .into_iter()
        .filter_map(|p| {
            candidates
                .iter()
                .find(|m| (m.point - p.coords).norm_squared() < EPSILON * EPSILON)
                .copied()
        })
        .collect()
}

/// Penetration of the two shapes of `md`, seeded from GJK's terminal simplex.
///
/// Returns `None` when the polytope is degenerate (shapes merely touching
/// along a line, or the seed does not enclose the origin); the pair is
/// then treated as not penetrating.
#[must_use]
pub fn epa(
    md: &MinkowskiDifference<'_>,
    simplex: &Simplex,
    epsilon: f64,
    max_iterations: usize,
) -> Option<EpaResult> {
    let mut vertices = seed_polytope(md, simplex);
    if vertices.len() < 3 {
        debug!(seed = vertices.len(), "EPA seed polytope is degenerate");
        return None;
    }

    let mut heap = BinaryHeap::with_capacity(max_iterations + vertices.len());
    let n = vertices.len();
    for i in 0..n {
        if let Some(edge) = EpaEdge::new(&vertices, i, (i + 1) % n) {
            if edge.distance < -epsilon {
                debug!("EPA seed polytope does not enclose the origin");
                return None;
            }
            heap.push(edge);
        }
    }

    let mut best = heap.peek().copied()?;
    let mut iterations = 0;
    while iterations < max_iterations {
        iterations += 1;
        let Some(edge) = heap.pop() else { break };
        best = edge;

        let w = md.support(&edge.normal);
        let reach = w.point.dot(&edge.normal);
        if reach - edge.distance < epsilon {
            return Some(finish(md, &edge, iterations));
        }

        let index = vertices.len();
        vertices.push(w);
        for (a, b) in [(edge.a, index), (index, edge.b)] {
            match EpaEdge::new(&vertices, a, b) {
                Some(split) => heap.push(split),
                None => debug!("EPA skipped a zero-length edge"),
            }
        }
    }

    warn!(iterations, "EPA hit its iteration cap; using nearest edge found");
    Some(finish(md, &best, iterations))
}

fn finish(md: &MinkowskiDifference<'_>, edge: &EpaEdge, iterations: usize) -> EpaResult {
    let normal = edge.normal;
    EpaResult {
        normal,
        depth: edge.distance.max(0.0),
        point_a: md.shape_a().support(&normal),
        point_b: md.support_b(&-normal),
        iterations,
    }
}
