//! Collision shapes and support functions.
//!
//! Shapes are immutable geometry expressed in the local frame of the owning
//! body. The set is closed: [`Shape`] is an enum and every consumer matches
//! on it.
//!
//! Every convex piece answers a support query (farthest point along a
//! direction). Bounding boxes, GJK, EPA and conservative advancement are all
//! built on that single query.

mod mesh;
mod polygon;

pub use mesh::Mesh;
pub use polygon::{Polygon, PolygonVertex, convex_hull};

use crate::aabb::Aabb;
use nalgebra::{Isometry2, Point2, Vector2};
use sim2d_types::math::{EPSILON, try_normalize};
use sim2d_types::{Result, SimError};
use std::f64::consts::PI;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A circle centered on the shape origin.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Circle {
    /// Radius.
    pub radius: f64,
}

/// A capsule: a segment along the local x axis inflated by a radius.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Capsule {
    /// Half length of the core segment.
    pub half_length: f64,
    /// Radius around the segment.
    pub radius: f64,
}

impl Capsule {
    /// End points of the core segment.
    #[must_use]
    pub fn segment(&self) -> (Point2<f64>, Point2<f64>) {
        (
            Point2::new(-self.half_length, 0.0),
            Point2::new(self.half_length, 0.0),
        )
    }
}

/// An axis-aligned ellipse centered on the shape origin.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Ellipse {
    /// Semi-axis along x.
    pub semi_x: f64,
    /// Semi-axis along y.
    pub semi_y: f64,
}

/// Collision geometry.
#[derive(Debug, Clone)]
pub enum Shape {
    /// A circle.
    Circle(Circle),
    /// A convex polygon.
    Polygon(Polygon),
    /// A capsule.
    Capsule(Capsule),
    /// An ellipse.
    Ellipse(Ellipse),
    /// A triangle mesh.
    Mesh(Box<Mesh>),
}

/// Discriminant of [`Shape`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ShapeKind {
    /// [`Shape::Circle`].
    Circle,
    /// [`Shape::Polygon`].
    Polygon,
    /// [`Shape::Capsule`].
    Capsule,
    /// [`Shape::Ellipse`].
    Ellipse,
    /// [`Shape::Mesh`].
    Mesh,
}

/// Which part of a shape a collision candidate refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShapePart {
    /// The whole shape (its convex hull for meshes).
    Whole,
    /// One triangle of a mesh.
    Triangle(usize),
}

/// The part of a convex piece facing a direction, in world space.
///
/// Round shapes are described by their core (a point or a segment) plus the
/// rounding radius around it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Feature {
    /// A point core.
    Vertex {
        /// Core point.
        point: Point2<f64>,
        /// Rounding radius around the point.
        radius: f64,
    },
    /// A segment core with its outward normal.
    Face {
        /// First end of the segment.
        start: Point2<f64>,
        /// Second end of the segment.
        end: Point2<f64>,
        /// Outward unit normal.
        normal: Vector2<f64>,
        /// Rounding radius around the segment.
        radius: f64,
    },
}

/// A borrowed convex piece of a shape: what narrow phase works on.
#[derive(Debug, Clone, Copy)]
pub enum Convex<'a> {
    /// A circle.
    Circle(&'a Circle),
    /// A polygon, mesh triangle or mesh hull.
    Polygon(&'a Polygon),
    /// A capsule.
    Capsule(&'a Capsule),
    /// An ellipse.
    Ellipse(&'a Ellipse),
}

impl Shape {
    /// A circle of the given radius.
    pub fn circle(radius: f64) -> Result<Self> {
        check_positive("circle radius", radius)?;
        Ok(Self::Circle(Circle { radius }))
    }

    /// An axis-aligned box with the given half extents.
    pub fn rectangle(half_width: f64, half_height: f64) -> Result<Self> {
        Ok(Self::Polygon(Polygon::rectangle(half_width, half_height)?))
    }

    /// A convex polygon (the hull of `points`).
    pub fn polygon(points: &[Point2<f64>]) -> Result<Self> {
        Ok(Self::Polygon(Polygon::new(points)?))
    }

    /// A capsule along the local x axis.
    pub fn capsule(half_length: f64, radius: f64) -> Result<Self> {
        check_positive("capsule radius", radius)?;
        if !half_length.is_finite() || half_length < 0.0 {
            return Err(SimError::invalid_shape("capsule half length cannot be negative"));
        }
        Ok(Self::Capsule(Capsule {
            half_length,
            radius,
        }))
    }

    /// An axis-aligned ellipse.
    pub fn ellipse(semi_x: f64, semi_y: f64) -> Result<Self> {
        check_positive("ellipse semi-axis", semi_x)?;
        check_positive("ellipse semi-axis", semi_y)?;
        Ok(Self::Ellipse(Ellipse { semi_x, semi_y }))
    }

    /// A triangle mesh.
    pub fn mesh(vertices: Vec<Point2<f64>>, indices: Vec<[usize; 3]>) -> Result<Self> {
        Ok(Self::Mesh(Box::new(Mesh::new(vertices, indices)?)))
    }

    /// The kind of this shape.
    #[must_use]
    pub fn kind(&self) -> ShapeKind {
        match self {
            Self::Circle(_) => ShapeKind::Circle,
            Self::Polygon(_) => ShapeKind::Polygon,
            Self::Capsule(_) => ShapeKind::Capsule,
            Self::Ellipse(_) => ShapeKind::Ellipse,
            Self::Mesh(_) => ShapeKind::Mesh,
        }
    }

    /// The convex piece named by `part`.
    ///
    /// For meshes, `Whole` is the convex hull. For non-mesh shapes every part
    /// is the shape itself.
    #[must_use]
    pub fn convex(&self, part: ShapePart) -> Convex<'_> {
        match (self, part) {
            (Self::Circle(c), _) => Convex::Circle(c),
            (Self::Polygon(p), _) => Convex::Polygon(p),
            (Self::Capsule(c), _) => Convex::Capsule(c),
            (Self::Ellipse(e), _) => Convex::Ellipse(e),
            (Self::Mesh(m), ShapePart::Whole) => Convex::Polygon(m.hull()),
            (Self::Mesh(m), ShapePart::Triangle(i)) => Convex::Polygon(m.triangle(i)),
        }
    }

    /// Farthest point along `direction`, in shape space.
    #[must_use]
    pub fn support(&self, direction: &Vector2<f64>) -> Point2<f64> {
        self.convex(ShapePart::Whole).support(direction)
    }

    /// World-space AABB of the shape placed at `iso`.
    ///
    /// Uses four support queries along the world axes, which is exact for
    /// every convex shape.
    #[must_use]
    pub fn aabb(&self, iso: &Isometry2<f64>) -> Aabb {
        self.convex(ShapePart::Whole).aabb(iso)
    }

    /// Area of the shape.
    #[must_use]
    pub fn area(&self) -> f64 {
        match self {
            Self::Circle(c) => PI * c.radius * c.radius,
            Self::Polygon(p) => p.area(),
            Self::Capsule(c) => 4.0 * c.half_length * c.radius + PI * c.radius * c.radius,
            Self::Ellipse(e) => PI * e.semi_x * e.semi_y,
            Self::Mesh(m) => m.area(),
        }
    }

    /// Second moment of area about the shape origin (inertia per unit density).
    #[must_use]
    pub fn inertia_per_density(&self) -> f64 {
        match self {
            Self::Circle(c) => 0.5 * PI * c.radius.powi(4),
            Self::Polygon(p) => p.inertia_per_density(),
            Self::Capsule(c) => {
                let (h, r) = (c.half_length, c.radius);
                let rect_area = 4.0 * h * r;
                let rect = rect_area * (4.0 * h * h + 4.0 * r * r) / 12.0;
                // Two half discs, parallel axis through their centroids.
                let disc_area = PI * r * r;
                let caps = disc_area * (0.5 * r * r + h * h + 8.0 * h * r / (3.0 * PI));
                rect + caps
            }
            Self::Ellipse(e) => {
                0.25 * PI * e.semi_x * e.semi_y * (e.semi_x * e.semi_x + e.semi_y * e.semi_y)
            }
            Self::Mesh(m) => m.inertia_per_density(),
        }
    }

    /// Distance from the shape origin to the farthest point of the shape.
    #[must_use]
    pub fn max_radius(&self) -> f64 {
        self.convex(ShapePart::Whole).max_radius()
    }

    /// Whether the shape is a mesh (refined by the mid phase).
    #[must_use]
    pub fn is_mesh(&self) -> bool {
        matches!(self, Self::Mesh(_))
    }
}

impl Convex<'_> {
    /// Farthest point along `direction`, in shape space.
    #[must_use]
    pub fn support(&self, direction: &Vector2<f64>) -> Point2<f64> {
        match self {
            Self::Circle(c) => {
                let n = try_normalize(direction).unwrap_or_else(Vector2::x);
                Point2::from(n * c.radius)
            }
            Self::Polygon(p) => p.support(direction),
            Self::Capsule(c) => {
                let n = try_normalize(direction).unwrap_or_else(Vector2::x);
                let x = if direction.x >= 0.0 {
                    c.half_length
                } else {
                    -c.half_length
                };
                Point2::new(x, 0.0) + n * c.radius
            }
            Self::Ellipse(e) => {
                let a2 = e.semi_x * e.semi_x;
                let b2 = e.semi_y * e.semi_y;
                let denom = (a2 * direction.x * direction.x + b2 * direction.y * direction.y).sqrt();
                if denom < EPSILON {
                    return Point2::new(e.semi_x, 0.0);
                }
                Point2::new(a2 * direction.x / denom, b2 * direction.y / denom)
            }
        }
    }

    /// Farthest point along a world direction for the piece placed at `iso`.
    #[must_use]
    pub fn support_world(&self, iso: &Isometry2<f64>, direction: &Vector2<f64>) -> Point2<f64> {
        let local = iso.rotation.inverse() * direction;
        iso * self.support(&local)
    }

    /// Feature of the piece placed at `iso` that faces the world
    /// `direction`.
    ///
    /// Polygons report the face whose normal is closest to `direction`.
    /// Capsules report their side when `direction` is within 45 degrees of
    /// its normal and an end cap otherwise. Circles and ellipses have no
    /// flat part and report a single point.
    #[must_use]
    pub fn feature(&self, iso: &Isometry2<f64>, direction: &Vector2<f64>) -> Feature {
        let local = iso.rotation.inverse() * direction;
        match self {
            Self::Circle(c) => Feature::Vertex {
                point: Point2::from(iso.translation.vector),
                radius: c.radius,
            },
            Self::Ellipse(_) => Feature::Vertex {
                point: self.support_world(iso, direction),
                radius: 0.0,
            },
            Self::Polygon(p) => {
                let face = p.vertex(p.incident_edge(&-local));
                Feature::Face {
                    start: iso * face.point,
                    end: iso * p.vertex(face.next).point,
                    normal: iso.rotation * face.normal,
                    radius: 0.0,
                }
            }
            Self::Capsule(c) => {
                let (left, right) = c.segment();
                if local.y.abs() > local.x.abs() {
                    let (start, end, normal) = if local.y > 0.0 {
                        (right, left, Vector2::y())
                    } else {
                        (left, right, -Vector2::y())
                    };
                    Feature::Face {
                        start: iso * start,
                        end: iso * end,
                        normal: iso.rotation * normal,
                        radius: c.radius,
                    }
                } else {
                    let cap = if local.x >= 0.0 { right } else { left };
                    Feature::Vertex {
                        point: iso * cap,
                        radius: c.radius,
                    }
                }
            }
        }
    }

    /// World-space AABB of the piece placed at `iso`.
    #[must_use]
    pub fn aabb(&self, iso: &Isometry2<f64>) -> Aabb {
        let max_x = self.support_world(iso, &Vector2::x()).x;
        let min_x = self.support_world(iso, &-Vector2::x()).x;
        let max_y = self.support_world(iso, &Vector2::y()).y;
        let min_y = self.support_world(iso, &-Vector2::y()).y;
        Aabb::new(Point2::new(min_x, min_y), Point2::new(max_x, max_y))
    }

    /// Distance from the shape origin to the farthest point.
    #[must_use]
    pub fn max_radius(&self) -> f64 {
        match self {
            Self::Circle(c) => c.radius,
            Self::Polygon(p) => p.max_radius(),
            Self::Capsule(c) => c.half_length + c.radius,
            Self::Ellipse(e) => e.semi_x.max(e.semi_y),
        }
    }

    /// Rounding radius: the part of the support that is a circle sweep.
    #[must_use]
    pub fn rounding(&self) -> f64 {
        match self {
            Self::Circle(c) => c.radius,
            Self::Capsule(c) => c.radius,
            Self::Polygon(_) | Self::Ellipse(_) => 0.0,
        }
    }
}

fn check_positive(what: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(SimError::invalid_shape(format!(
            "{what} must be positive and finite, got {value}"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn test_shapes() -> Vec<Shape> {
        vec![
            Shape::circle(0.7).unwrap(),
            Shape::rectangle(1.0, 0.4).unwrap(),
            Shape::polygon(&[
                Point2::new(0.0, 0.0),
                Point2::new(1.0, -0.3),
                Point2::new(1.4, 0.8),
                Point2::new(-0.2, 1.1),
            ])
            .unwrap(),
            Shape::capsule(0.8, 0.3).unwrap(),
            Shape::ellipse(1.2, 0.5).unwrap(),
            Shape::mesh(
                vec![
                    Point2::new(0.0, 0.0),
                    Point2::new(2.0, 0.0),
                    Point2::new(2.0, 1.0),
                    Point2::new(0.0, 1.0),
                ],
                vec![[0, 1, 2], [0, 2, 3]],
            )
            .unwrap(),
        ]
    }

    /// Sample points on the boundary of a shape, in shape space.
    fn boundary_samples(shape: &Shape) -> Vec<Point2<f64>> {
        (0..96)
            .map(|k| {
                let a = k as f64 * std::f64::consts::TAU / 96.0;
                shape.support(&Vector2::new(a.cos(), a.sin()))
            })
            .collect()
    }

    #[test]
    fn test_circle_support() {
        let s = Shape::circle(2.0).unwrap();
        assert_relative_eq!(s.support(&Vector2::new(0.0, 5.0)), Point2::new(0.0, 2.0));
        // Zero direction falls back to +x.
        assert_relative_eq!(s.support(&Vector2::zeros()), Point2::new(2.0, 0.0));
    }

    #[test]
    fn test_capsule_support() {
        let s = Shape::capsule(1.0, 0.5).unwrap();
        assert_relative_eq!(s.support(&Vector2::x()), Point2::new(1.5, 0.0));
        assert_relative_eq!(s.support(&Vector2::y()), Point2::new(1.0, 0.5));
        assert_relative_eq!(s.support(&-Vector2::x()), Point2::new(-1.5, 0.0));
    }

    #[test]
    fn test_ellipse_support() {
        let s = Shape::ellipse(2.0, 1.0).unwrap();
        assert_relative_eq!(s.support(&Vector2::x()), Point2::new(2.0, 0.0));
        assert_relative_eq!(s.support(&Vector2::y()), Point2::new(0.0, 1.0));
        // Support along a diagonal lies on the ellipse.
        let p = s.support(&Vector2::new(1.0, 1.0));
        assert_relative_eq!(p.x * p.x / 4.0 + p.y * p.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rotated_box_aabb() {
        let s = Shape::rectangle(1.0, 1.0).unwrap();
        let iso = Isometry2::new(Vector2::new(3.0, -1.0), std::f64::consts::FRAC_PI_4);
        let aabb = s.aabb(&iso);
        let r = 2.0_f64.sqrt();
        assert_relative_eq!(aabb.min, Point2::new(3.0 - r, -1.0 - r), epsilon = 1e-12);
        assert_relative_eq!(aabb.max, Point2::new(3.0 + r, -1.0 + r), epsilon = 1e-12);
    }

    #[test]
    fn test_areas_and_inertia() {
        let circle = Shape::circle(1.0).unwrap();
        assert_relative_eq!(circle.area(), PI);
        assert_relative_eq!(circle.inertia_per_density(), PI / 2.0);

        // A zero-length capsule is a circle.
        let capsule = Shape::capsule(0.0, 1.0).unwrap();
        assert_relative_eq!(capsule.area(), PI);
        assert_relative_eq!(capsule.inertia_per_density(), PI / 2.0);

        // A round ellipse is a circle.
        let ellipse = Shape::ellipse(1.0, 1.0).unwrap();
        assert_relative_eq!(ellipse.inertia_per_density(), PI / 2.0);
    }

    #[test]
    fn test_invalid_shapes() {
        assert!(Shape::circle(0.0).is_err());
        assert!(Shape::circle(f64::NAN).is_err());
        assert!(Shape::capsule(-1.0, 0.5).is_err());
        assert!(Shape::ellipse(1.0, -2.0).is_err());
    }

    #[test]
    fn test_mesh_parts() {
        let shapes = test_shapes();
        let mesh = &shapes[5];
        assert!(mesh.is_mesh());
        assert!(matches!(mesh.convex(ShapePart::Triangle(1)), Convex::Polygon(_)));
        assert_relative_eq!(mesh.support(&Vector2::new(1.0, 1.0)), Point2::new(2.0, 1.0));
    }

    #[test]
    fn test_features() {
        let iso = Isometry2::new(Vector2::new(1.0, 2.0), 0.0);

        let square = Shape::rectangle(1.0, 0.5).unwrap();
        let Feature::Face { start, end, normal, radius } =
            square.convex(ShapePart::Whole).feature(&iso, &Vector2::new(0.1, -1.0))
        else {
            panic!("polygons always report a face");
        };
        assert_relative_eq!(normal, -Vector2::y(), epsilon = 1e-12);
        assert_relative_eq!(start.y, 1.5, epsilon = 1e-12);
        assert_relative_eq!(end.y, 1.5, epsilon = 1e-12);
        assert_relative_eq!((start - end).norm(), 2.0, epsilon = 1e-12);
        assert_eq!(radius, 0.0);

        // Capsule rotated a quarter turn: its side faces world -x.
        let capsule = Shape::capsule(1.0, 0.25).unwrap();
        let turned = Isometry2::new(Vector2::zeros(), std::f64::consts::FRAC_PI_2);
        let side = capsule.convex(ShapePart::Whole).feature(&turned, &-Vector2::x());
        let Feature::Face { normal, radius, .. } = side else {
            panic!("expected the capsule side, got {side:?}");
        };
        assert_relative_eq!(normal, -Vector2::x(), epsilon = 1e-12);
        assert_eq!(radius, 0.25);

        let cap = capsule.convex(ShapePart::Whole).feature(&turned, &Vector2::y());
        assert_eq!(
            cap,
            Feature::Vertex {
                point: turned * Point2::new(1.0, 0.0),
                radius: 0.25
            }
        );

        let ball = Shape::circle(0.5).unwrap();
        assert_eq!(
            ball.convex(ShapePart::Whole).feature(&iso, &Vector2::x()),
            Feature::Vertex {
                point: Point2::new(1.0, 2.0),
                radius: 0.5
            }
        );
    }

    proptest! {
        #[test]
        fn prop_aabb_contains_shape(
            x in -50.0..50.0f64,
            y in -50.0..50.0f64,
            angle in -7.0..7.0f64,
        ) {
            let iso = Isometry2::new(Vector2::new(x, y), angle);
            for shape in test_shapes() {
                let aabb = shape.aabb(&iso);
                for p in boundary_samples(&shape) {
                    prop_assert!(aabb.contains_point(&(iso * p), 1e-9));
                }
                if let Shape::Mesh(mesh) = &shape {
                    for v in mesh.vertices() {
                        prop_assert!(aabb.contains_point(&(iso * v), 1e-9));
                    }
                }
            }
        }
    }
}
