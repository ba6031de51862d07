//! Mid phase: splits broad-phase pairs involving meshes into convex pieces.
//!
//! A convex shape is treated as a tree with a single leaf (its bounding
//! box). Both trees are descended together; a node pair whose boxes are
//! separated on one of the four box axes is rejected with its whole
//! subtree. When the boxes overlap, the node with the larger area is split
//! first so both sides shrink at a similar rate.
//!
//! Pairs without a mesh pass through unchanged: the broad phase has already
//! compared their bounding boxes.

use crate::obb::{Obb, ObbNode};
use crate::shape::{Shape, ShapePart};
use nalgebra::{Isometry2, Point2, Vector2};

/// A pair of convex pieces handed to the narrow phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Candidate {
    /// Piece of shape A.
    pub part_a: ShapePart,
    /// Piece of shape B.
    pub part_b: ShapePart,
}

impl Candidate {
    /// The whole-shape candidate.
    pub const WHOLE: Self = Self {
        part_a: ShapePart::Whole,
        part_b: ShapePart::Whole,
    };
}

/// A node of either a mesh tree or the single leaf of a convex shape.
#[derive(Debug, Clone, Copy)]
enum Cursor {
    Node(usize),
    Whole,
}

/// Local-frame bounding box of a non-mesh shape.
fn convex_obb(shape: &Shape) -> Obb {
    let half_extents = match shape {
        Shape::Circle(c) => Vector2::new(c.radius, c.radius),
        Shape::Capsule(c) => Vector2::new(c.half_length + c.radius, c.radius),
        Shape::Ellipse(e) => Vector2::new(e.semi_x, e.semi_y),
        Shape::Polygon(p) => {
            let points: Vec<Point2<f64>> = p.points().collect();
            if let Some(obb) = Obb::fit(&points) {
                return obb;
            }
            Vector2::repeat(p.max_radius())
        }
        Shape::Mesh(m) => {
            if let Some(root) = m.tree().root() {
                return *root;
            }
            Vector2::repeat(shape.max_radius())
        }
    };
    Obb {
        center: Point2::origin(),
        axes: [Vector2::x(), Vector2::y()],
        half_extents,
    }
}

/// One side of a refinement query.
struct Side<'a> {
    shape: &'a Shape,
    pose: &'a Isometry2<f64>,
    whole: Obb,
}

impl<'a> Side<'a> {
    fn new(shape: &'a Shape, pose: &'a Isometry2<f64>) -> Self {
        Self {
            shape,
            pose,
            whole: convex_obb(shape).transformed(pose),
        }
    }

    fn root(&self) -> Cursor {
        match self.shape {
            Shape::Mesh(m) if !m.tree().is_empty() => Cursor::Node(0),
            _ => Cursor::Whole,
        }
    }

    fn obb(&self, cursor: Cursor) -> Obb {
        match (self.shape, cursor) {
            (Shape::Mesh(m), Cursor::Node(i)) => m.tree().node(i).obb().transformed(self.pose),
            _ => self.whole,
        }
    }

    fn children(&self, cursor: Cursor) -> Option<[Cursor; 2]> {
        match (self.shape, cursor) {
            (Shape::Mesh(m), Cursor::Node(i)) => match m.tree().node(i) {
                ObbNode::Internal { left, right, .. } => {
                    Some([Cursor::Node(*left), Cursor::Node(*right)])
                }
                ObbNode::Leaf { .. } => None,
            },
            _ => None,
        }
    }

    fn part(&self, cursor: Cursor) -> ShapePart {
        match (self.shape, cursor) {
            (Shape::Mesh(m), Cursor::Node(i)) => match m.tree().node(i) {
                ObbNode::Leaf { triangle, .. } => ShapePart::Triangle(*triangle),
                ObbNode::Internal { .. } => ShapePart::Whole,
            },
            _ => ShapePart::Whole,
        }
    }
}

/// Split the pair `(a, b)` into overlapping convex pieces.
///
/// Output is sorted, so downstream processing order does not depend on the
/// traversal.
#[must_use]
pub fn refine(a: &Shape, pose_a: &Isometry2<f64>, b: &Shape, pose_b: &Isometry2<f64>) -> Vec<Candidate> {
    if !a.is_mesh() && !b.is_mesh() {
        return vec![Candidate::WHOLE];
    }

    let side_a = Side::new(a, pose_a);
    let side_b = Side::new(b, pose_b);
    let mut out = Vec::new();
    let mut stack = vec![(side_a.root(), side_b.root())];

    while let Some((ca, cb)) = stack.pop() {
        let (obb_a, obb_b) = (side_a.obb(ca), side_b.obb(cb));
        if !obb_a.overlaps(&obb_b) {
            continue;
        }
        match (side_a.children(ca), side_b.children(cb)) {
            (None, None) => out.push(Candidate {
                part_a: side_a.part(ca),
                part_b: side_b.part(cb),
            }),
            (Some(kids), None) => stack.extend(kids.iter().rev().map(|&k| (k, cb))),
            (None, Some(kids)) => stack.extend(kids.iter().rev().map(|&k| (ca, k))),
            (Some(kids_a), Some(kids_b)) => {
                if obb_a.area() >= obb_b.area() {
                    stack.extend(kids_a.iter().rev().map(|&k| (k, cb)));
                } else {
                    stack.extend(kids_b.iter().rev().map(|&k| (ca, k)));
                }
            }
        }
    }

    out.sort_unstable();
    out
}
