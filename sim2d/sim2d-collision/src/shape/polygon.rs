//! Convex polygons with hill-climbing support queries.

use nalgebra::{Point2, Vector2};
use sim2d_types::math::{EPSILON, cross};
use sim2d_types::{Result, SimError};
use std::cell::Cell;

/// One vertex of a polygon loop.
///
/// `normal` is the outward unit normal of the edge running from this vertex
/// to `next`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolygonVertex {
    /// Position in shape space.
    pub point: Point2<f64>,
    /// Outward normal of the edge `self -> next`.
    pub normal: Vector2<f64>,
    /// Index of the next vertex (counter-clockwise).
    pub next: usize,
    /// Index of the previous vertex.
    pub prev: usize,
}

/// A convex polygon stored as a closed counter-clockwise loop.
///
/// The polygon caches the vertex that won the last support query and starts
/// the next query there, walking to neighbours while the projection keeps
/// increasing. Under small per-step rotation this is amortized O(1).
///
/// The hint lives in a [`Cell`], so a polygon is `!Sync`: support queries on
/// one polygon must not run concurrently. The simulation is single-threaded
/// and queries are sequential.
#[derive(Debug, Clone)]
pub struct Polygon {
    vertices: Vec<PolygonVertex>,
    hint: Cell<usize>,
    area: f64,
    centroid: Point2<f64>,
    radius: f64,
}

impl Polygon {
    /// Build a polygon from the convex hull of `points`.
    ///
    /// Winding and order of the input do not matter. Collinear and duplicate
    /// points are dropped.
    pub fn new(points: &[Point2<f64>]) -> Result<Self> {
        let hull = convex_hull(points);
        if hull.len() < 3 {
            return Err(SimError::invalid_shape(format!(
                "polygon needs at least 3 non-collinear points, got {}",
                points.len()
            )));
        }

        let n = hull.len();
        let mut vertices = Vec::with_capacity(n);
        for i in 0..n {
            let next = (i + 1) % n;
            let edge = hull[next] - hull[i];
            let len = edge.norm();
            if len < EPSILON {
                return Err(SimError::invalid_shape("polygon has a zero-length edge"));
            }
            vertices.push(PolygonVertex {
                point: hull[i],
                normal: Vector2::new(edge.y, -edge.x) / len,
                next,
                prev: (i + n - 1) % n,
            });
        }

        let (area, centroid) = area_and_centroid(&hull);
        if area < EPSILON {
            return Err(SimError::invalid_shape("polygon has zero area"));
        }
        let radius = hull.iter().map(|p| p.coords.norm()).fold(0.0, f64::max);

        Ok(Self {
            vertices,
            hint: Cell::new(0),
            area,
            centroid,
            radius,
        })
    }

    /// Axis-aligned rectangle centered on the origin.
    pub fn rectangle(half_width: f64, half_height: f64) -> Result<Self> {
        Self::new(&[
            Point2::new(-half_width, -half_height),
            Point2::new(half_width, -half_height),
            Point2::new(half_width, half_height),
            Point2::new(-half_width, half_height),
        ])
    }

    /// Regular polygon with `sides` vertices on a circle of `radius`.
    pub fn regular(sides: usize, radius: f64) -> Result<Self> {
        let points: Vec<_> = (0..sides)
            .map(|i| {
                let angle = std::f64::consts::TAU * i as f64 / sides as f64;
                Point2::new(radius * angle.cos(), radius * angle.sin())
            })
            .collect();
        Self::new(&points)
    }

    /// Number of vertices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Always false: a polygon has at least three vertices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// The vertex loop.
    #[must_use]
    pub fn vertices(&self) -> &[PolygonVertex] {
        &self.vertices
    }

    /// Vertex `i`.
    #[must_use]
    pub fn vertex(&self, i: usize) -> &PolygonVertex {
        &self.vertices[i]
    }

    /// Vertex positions in loop order.
    pub fn points(&self) -> impl Iterator<Item = Point2<f64>> + '_ {
        self.vertices.iter().map(|v| v.point)
    }

    /// Area of the polygon.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.area
    }

    /// Centroid in shape space.
    #[must_use]
    pub fn centroid(&self) -> Point2<f64> {
        self.centroid
    }

    /// Distance of the farthest vertex from the shape origin.
    #[must_use]
    pub fn max_radius(&self) -> f64 {
        self.radius
    }

    /// Second moment of area about the shape origin.
    #[must_use]
    pub fn inertia_per_density(&self) -> f64 {
        let mut inertia = 0.0;
        for v in &self.vertices {
            let a = v.point.coords;
            let b = self.vertices[v.next].point.coords;
            let c = cross(&a, &b);
            inertia += c * (a.dot(&a) + a.dot(&b) + b.dot(&b));
        }
        inertia / 12.0
    }

    /// Index of the vertex farthest along `direction`.
    ///
    /// Starts from the cached hint and hill-climbs; updates the hint.
    #[must_use]
    pub fn support_index(&self, direction: &Vector2<f64>) -> usize {
        let n = self.vertices.len();
        let mut best = self.hint.get().min(n - 1);
        let mut best_dot = self.vertices[best].point.coords.dot(direction);

        let forward = self.vertices[best].next;
        let walk_next = self.vertices[forward].point.coords.dot(direction) > best_dot;
        for _ in 0..n {
            let candidate = if walk_next {
                self.vertices[best].next
            } else {
                self.vertices[best].prev
            };
            let d = self.vertices[candidate].point.coords.dot(direction);
            if d > best_dot {
                best = candidate;
                best_dot = d;
            } else {
                break;
            }
        }

        self.hint.set(best);
        best
    }

    /// Farthest point along `direction`.
    #[must_use]
    pub fn support(&self, direction: &Vector2<f64>) -> Point2<f64> {
        self.vertices[self.support_index(direction)].point
    }

    /// Index of the edge whose normal is most anti-parallel to `normal`.
    ///
    /// The candidate edges are the two incident to the support vertex along
    /// `-normal`.
    #[must_use]
    pub fn incident_edge(&self, normal: &Vector2<f64>) -> usize {
        let i = self.support_index(&-normal);
        let prev = self.vertices[i].prev;
        if self.vertices[i].normal.dot(normal) < self.vertices[prev].normal.dot(normal) {
            i
        } else {
            prev
        }
    }

    /// Translate every vertex, keeping the loop.
    #[must_use]
    pub fn translated(&self, offset: &Vector2<f64>) -> Self {
        let mut out = self.clone();
        for v in &mut out.vertices {
            v.point += offset;
        }
        out.centroid += offset;
        out.radius = out
            .vertices
            .iter()
            .map(|v| v.point.coords.norm())
            .fold(0.0, f64::max);
        out
    }
}

/// Counter-clockwise convex hull (Andrew's monotone chain).
#[must_use]
pub fn convex_hull(points: &[Point2<f64>]) -> Vec<Point2<f64>> {
    let mut sorted: Vec<Point2<f64>> = points
        .iter()
        .copied()
        .filter(|p| p.x.is_finite() && p.y.is_finite())
        .collect();
    sorted.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    sorted.dedup_by(|a, b| (*a - *b).norm_squared() < EPSILON * EPSILON);
    if sorted.len() < 3 {
        return sorted;
    }

    let turn = |o: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>| cross(&(a - o), &(b - o));
    let mut hull: Vec<Point2<f64>> = Vec::with_capacity(sorted.len() * 2);
    for p in &sorted {
        while hull.len() >= 2 && turn(&hull[hull.len() - 2], &hull[hull.len() - 1], p) <= EPSILON {
            hull.pop();
        }
        hull.push(*p);
    }
    let lower_len = hull.len() + 1;
    for p in sorted.iter().rev().skip(1) {
        while hull.len() >= lower_len
            && turn(&hull[hull.len() - 2], &hull[hull.len() - 1], p) <= EPSILON
        {
            hull.pop();
        }
        hull.push(*p);
    }
    hull.pop();
    hull
}

fn area_and_centroid(points: &[Point2<f64>]) -> (f64, Point2<f64>) {
    let mut area = 0.0;
    let mut c = Vector2::zeros();
    for (i, p) in points.iter().enumerate() {
        let q = points[(i + 1) % points.len()];
        let w = cross(&p.coords, &q.coords);
        area += w;
        c += (p.coords + q.coords) * w;
    }
    area *= 0.5;
    if area.abs() < EPSILON {
        return (0.0, Point2::origin());
    }
    (area, Point2::from(c / (6.0 * area)))
}
