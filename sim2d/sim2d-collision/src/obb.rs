//! Oriented bounding boxes and OBB trees over triangle meshes.
//!
//! # Construction
//!
//! The tree is built top-down:
//! 1. Fit an OBB to all vertices of the node's triangles (principal axes)
//! 2. Project triangle centroids on the box's major axis
//! 3. Split at the median and recurse
//!
//! Each leaf holds exactly one triangle, so mid-phase queries end at
//! triangle granularity.

use nalgebra::{Isometry2, Point2, Vector2};
use sim2d_types::math::EPSILON;

/// An oriented bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obb {
    /// Center of the box.
    pub center: Point2<f64>,
    /// Orthonormal box axes.
    pub axes: [Vector2<f64>; 2],
    /// Half extents along each axis.
    pub half_extents: Vector2<f64>,
}

impl Obb {
    /// Fit a box to a point set using its principal axes.
    ///
    /// Returns `None` for an empty set.
    #[must_use]
    pub fn fit(points: &[Point2<f64>]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let n = points.len() as f64;
        let mean = points.iter().fold(Vector2::zeros(), |acc, p| acc + p.coords) / n;

        let (mut cxx, mut cxy, mut cyy) = (0.0, 0.0, 0.0);
        for p in points {
            let d = p.coords - mean;
            cxx += d.x * d.x;
            cxy += d.x * d.y;
            cyy += d.y * d.y;
        }
        // Angle of the major eigenvector of the 2x2 covariance.
        let angle = 0.5 * (2.0 * cxy).atan2(cxx - cyy);
        let u = Vector2::new(angle.cos(), angle.sin());
        let v = Vector2::new(-u.y, u.x);

        let (mut min_u, mut max_u) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut min_v, mut max_v) = (f64::INFINITY, f64::NEG_INFINITY);
        for p in points {
            let pu = p.coords.dot(&u);
            let pv = p.coords.dot(&v);
            min_u = min_u.min(pu);
            max_u = max_u.max(pu);
            min_v = min_v.min(pv);
            max_v = max_v.max(pv);
        }
        let center = u * (0.5 * (min_u + max_u)) + v * (0.5 * (min_v + max_v));
        Some(Self {
            center: Point2::from(center),
            axes: [u, v],
            half_extents: Vector2::new(0.5 * (max_u - min_u), 0.5 * (max_v - min_v)),
        })
    }

    /// The box moved by `iso`.
    #[must_use]
    pub fn transformed(&self, iso: &Isometry2<f64>) -> Self {
        Self {
            center: iso * self.center,
            axes: [iso.rotation * self.axes[0], iso.rotation * self.axes[1]],
            half_extents: self.half_extents,
        }
    }

    /// Area of the box.
    #[must_use]
    pub fn area(&self) -> f64 {
        4.0 * self.half_extents.x * self.half_extents.y
    }

    /// Index of the longer axis.
    #[must_use]
    pub fn major_axis(&self) -> usize {
        usize::from(self.half_extents.y > self.half_extents.x)
    }

    /// Half-width of the box's projection on `axis`.
    #[must_use]
    pub fn projected_radius(&self, axis: &Vector2<f64>) -> f64 {
        self.half_extents.x * self.axes[0].dot(axis).abs()
            + self.half_extents.y * self.axes[1].dot(axis).abs()
    }

    /// Separating axis test on the four box axes.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        let d = other.center - self.center;
        self.axes.iter().chain(other.axes.iter()).all(|axis| {
            d.dot(axis).abs() <= self.projected_radius(axis) + other.projected_radius(axis) + EPSILON
        })
    }

    /// The four corners, counter-clockwise.
    #[must_use]
    pub fn corners(&self) -> [Point2<f64>; 4] {
        let u = self.axes[0] * self.half_extents.x;
        let v = self.axes[1] * self.half_extents.y;
        [
            self.center - u - v,
            self.center + u - v,
            self.center + u + v,
            self.center - u + v,
        ]
    }
}

/// A node of an [`ObbTree`].
#[derive(Debug, Clone)]
pub enum ObbNode {
    /// Internal node with two children.
    Internal {
        /// Box containing all descendants.
        obb: Obb,
        /// Index of the left child.
        left: usize,
        /// Index of the right child.
        right: usize,
    },
    /// Leaf holding a single triangle.
    Leaf {
        /// Box of the triangle.
        obb: Obb,
        /// Triangle index in the owning mesh.
        triangle: usize,
    },
}

impl ObbNode {
    /// Box of this node.
    #[must_use]
    pub fn obb(&self) -> &Obb {
        match self {
            Self::Internal { obb, .. } | Self::Leaf { obb, .. } => obb,
        }
    }
}

/// Binary OBB hierarchy over the triangles of a mesh.
#[derive(Debug, Clone, Default)]
pub struct ObbTree {
    /// Nodes; index 0 is the root.
    nodes: Vec<ObbNode>,
}

impl ObbTree {
    /// Build a tree over `triangles` (vertex index triples into `vertices`).
    #[must_use]
    pub fn build(vertices: &[Point2<f64>], triangles: &[[usize; 3]]) -> Self {
        let mut tree = Self {
            nodes: Vec::with_capacity(triangles.len() * 2),
        };
        if triangles.is_empty() {
            return tree;
        }
        let mut order: Vec<usize> = (0..triangles.len()).collect();
        tree.build_recursive(vertices, triangles, &mut order);
        tree
    }

    fn build_recursive(
        &mut self,
        vertices: &[Point2<f64>],
        triangles: &[[usize; 3]],
        order: &mut [usize],
    ) -> usize {
        let points: Vec<Point2<f64>> = order
            .iter()
            .flat_map(|&t| triangles[t].iter().map(|&i| vertices[i]))
            .collect();
        let obb = Obb::fit(&points).unwrap_or(Obb {
            center: Point2::origin(),
            axes: [Vector2::x(), Vector2::y()],
            half_extents: Vector2::zeros(),
        });

        if let [triangle] = order {
            let node_idx = self.nodes.len();
            self.nodes.push(ObbNode::Leaf {
                obb,
                triangle: *triangle,
            });
            return node_idx;
        }

        let axis = obb.axes[obb.major_axis()];
        let centroid = |t: usize| {
            let [a, b, c] = triangles[t];
            (vertices[a].coords + vertices[b].coords + vertices[c].coords).dot(&axis) / 3.0
        };
        order.sort_by(|&a, &b| centroid(a).total_cmp(&centroid(b)));

        let mid = order.len() / 2;
        let node_idx = self.nodes.len();
        self.nodes.push(ObbNode::Internal {
            obb,
            left: 0,
            right: 0,
        });

        let (lower, upper) = order.split_at_mut(mid);
        let left_idx = self.build_recursive(vertices, triangles, lower);
        let right_idx = self.build_recursive(vertices, triangles, upper);

        if let ObbNode::Internal { left, right, .. } = &mut self.nodes[node_idx] {
            *left = left_idx;
            *right = right_idx;
        }
        node_idx
    }

    /// All nodes; index 0 is the root.
    #[must_use]
    pub fn nodes(&self) -> &[ObbNode] {
        &self.nodes
    }

    /// Node `i`.
    #[must_use]
    pub fn node(&self, i: usize) -> &ObbNode {
        &self.nodes[i]
    }

    /// Box of the root, if the tree is non-empty.
    #[must_use]
    pub fn root(&self) -> Option<&Obb> {
        self.nodes.first().map(ObbNode::obb)
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
