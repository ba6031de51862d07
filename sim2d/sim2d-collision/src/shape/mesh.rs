//! Triangle meshes: concave geometry made of convex pieces.

use super::polygon::{Polygon, convex_hull};
use crate::obb::ObbTree;
use nalgebra::Point2;
use sim2d_types::{Result, SimError};

/// A polygonal mesh of triangles.
///
/// Narrow phase never sees the mesh itself: the mid phase descends
/// [`Mesh::tree`] and hands individual triangles on. Whole-shape queries
/// (support, AABB, time of impact) go through the convex hull.
#[derive(Debug, Clone)]
pub struct Mesh {
    vertices: Vec<Point2<f64>>,
    indices: Vec<[usize; 3]>,
    triangles: Vec<Polygon>,
    tree: ObbTree,
    hull: Polygon,
    area: f64,
    inertia: f64,
}

impl Mesh {
    /// Build a mesh from vertices and triangle index triples.
    pub fn new(vertices: Vec<Point2<f64>>, indices: Vec<[usize; 3]>) -> Result<Self> {
        if indices.is_empty() {
            return Err(SimError::invalid_shape("mesh has no triangles"));
        }
        let mut triangles = Vec::with_capacity(indices.len());
        for (t, tri) in indices.iter().enumerate() {
            let corners = tri
                .iter()
                .map(|&i| {
                    vertices.get(i).copied().ok_or_else(|| {
                        SimError::invalid_shape(format!(
                            "triangle {t} references vertex {i} of {}",
                            vertices.len()
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            triangles.push(Polygon::new(&corners)?);
        }

        let hull = Polygon::new(&convex_hull(&vertices))?;
        let tree = ObbTree::build(&vertices, &indices);
        let area = triangles.iter().map(Polygon::area).sum();
        let inertia = triangles.iter().map(Polygon::inertia_per_density).sum();

        Ok(Self {
            vertices,
            indices,
            triangles,
            tree,
            hull,
            area,
            inertia,
        })
    }

    /// Mesh vertices.
    #[must_use]
    pub fn vertices(&self) -> &[Point2<f64>] {
        &self.vertices
    }

    /// Triangle vertex indices.
    #[must_use]
    pub fn indices(&self) -> &[[usize; 3]] {
        &self.indices
    }

    /// Triangle `i` as a polygon.
    #[must_use]
    pub fn triangle(&self, i: usize) -> &Polygon {
        &self.triangles[i]
    }

    /// Number of triangles.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// OBB hierarchy over the triangles.
    #[must_use]
    pub fn tree(&self) -> &ObbTree {
        &self.tree
    }

    /// Convex hull of all vertices.
    #[must_use]
    pub fn hull(&self) -> &Polygon {
        &self.hull
    }

    /// Total triangle area.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.area
    }

    /// Second moment of area about the shape origin.
    #[must_use]
    pub fn inertia_per_density(&self) -> f64 {
        self.inertia
    }
}
