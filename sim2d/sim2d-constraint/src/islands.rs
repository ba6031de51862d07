//! Island partitioning.
//!
//! Bodies connected through joints or (non-sensor) contacts form an island:
//! a self-contained constraint system that can be solved, integrated and put
//! to sleep on its own.
//!
//! # Algorithm
//!
//! [`LocalIslandGenerator`] runs a depth-first search from every unvisited
//! dynamic body, in body insertion order:
//!
//! 1. Static bodies are dead ends: they terminate the search and appear
//!    only as constraint endpoints, never as island members
//! 2. Sensor edges are skipped
//! 3. Dynamic bodies without any edge share one "free" island that is just
//!    integrated
//!
//! Island membership order is the discovery order, so the local degree of
//! freedom indices (3 per body) are contiguous and reproducible.

use hashbrown::HashMap;
use sim2d_types::{BodyId, ContactId, IslandGeneratorKind, JointId};
use tracing::debug;

/// A constraint seen by the island generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConstraintRef {
    /// A joint.
    Joint(JointId),
    /// A contact point.
    Contact(ContactId),
}

/// Node of the body graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphBody {
    /// The body.
    pub id: BodyId,
    /// Static bodies never join an island.
    pub is_static: bool,
    /// Whether the body is asleep.
    pub sleeping: bool,
}

/// Edge of the body graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphEdge {
    /// The constraint.
    pub constraint: ConstraintRef,
    /// First body.
    pub body_a: BodyId,
    /// Second body, `None` for the world.
    pub body_b: Option<BodyId>,
    /// Sensor contacts do not couple bodies.
    pub sensor: bool,
}

/// Bodies and their constraint adjacency, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct BodyGraph {
    bodies: Vec<GraphBody>,
    edges: Vec<GraphEdge>,
    index: HashMap<BodyId, usize>,
    adjacency: Vec<Vec<usize>>,
}

impl BodyGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a body. Re-adding an id replaces its flags.
    pub fn add_body(&mut self, body: GraphBody) {
        if let Some(&i) = self.index.get(&body.id) {
            self.bodies[i] = body;
            return;
        }
        self.index.insert(body.id, self.bodies.len());
        self.bodies.push(body);
        self.adjacency.push(Vec::new());
    }

    /// Add an edge. Returns `false` (and ignores the edge) when an endpoint
    /// is unknown.
    pub fn add_edge(&mut self, edge: GraphEdge) -> bool {
        let Some(&a) = self.index.get(&edge.body_a) else {
            return false;
        };
        let b = match edge.body_b {
            Some(id) => match self.index.get(&id) {
                Some(&b) => Some(b),
                None => return false,
            },
            None => None,
        };
        let e = self.edges.len();
        self.edges.push(edge);
        self.adjacency[a].push(e);
        if let Some(b) = b.filter(|&b| b != a) {
            self.adjacency[b].push(e);
        }
        true
    }

    /// Bodies in insertion order.
    #[must_use]
    pub fn bodies(&self) -> &[GraphBody] {
        &self.bodies
    }

    /// Edges in insertion order.
    #[must_use]
    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    /// Look up a body.
    #[must_use]
    pub fn body(&self, id: BodyId) -> Option<&GraphBody> {
        self.index.get(&id).map(|&i| &self.bodies[i])
    }

    fn is_dynamic(&self, id: BodyId) -> Option<usize> {
        self.index
            .get(&id)
            .copied()
            .filter(|&i| !self.bodies[i].is_static)
    }

    /// Whether the edge couples at least one dynamic body.
    fn is_active(&self, edge: &GraphEdge) -> bool {
        !edge.sensor
            && (self.is_dynamic(edge.body_a).is_some()
                || edge.body_b.and_then(|b| self.is_dynamic(b)).is_some())
    }
}

/// Bodies and constraints solved together.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorldIsland {
    /// Index of the island within the current partition.
    pub id: usize,
    /// Member bodies in degree-of-freedom order.
    pub bodies: Vec<BodyId>,
    /// Constraints in discovery order.
    pub constraints: Vec<ConstraintRef>,
    /// Every member is asleep.
    pub sleeping: bool,
    /// Members have no constraints; they sleep individually.
    pub free: bool,
}

impl WorldIsland {
    /// Island-local index of `body`.
    #[must_use]
    pub fn local_index(&self, body: BodyId) -> Option<usize> {
        self.bodies.iter().position(|&b| b == body)
    }

    /// First degree of freedom of `body` (3 per body).
    #[must_use]
    pub fn dof_index(&self, body: BodyId) -> Option<usize> {
        self.local_index(body).map(|i| 3 * i)
    }

    /// Number of degrees of freedom.
    #[must_use]
    pub fn num_dofs(&self) -> usize {
        3 * self.bodies.len()
    }
}

/// Partitions the body graph into islands.
pub trait IslandGenerator: std::fmt::Debug {
    /// Build this step's islands.
    fn generate(&mut self, graph: &BodyGraph) -> Vec<WorldIsland>;

    /// Strategy name.
    fn name(&self) -> &'static str;
}

/// Create the generator selected by `kind`.
#[must_use]
pub fn create_island_generator(kind: IslandGeneratorKind) -> Box<dyn IslandGenerator> {
    match kind {
        IslandGeneratorKind::Local => Box::new(LocalIslandGenerator::default()),
        IslandGeneratorKind::Sole => Box::new(SoleIslandGenerator),
    }
}

/// Depth-first partition into independent islands.
#[derive(Debug, Clone, Default)]
pub struct LocalIslandGenerator {
    visited: Vec<bool>,
    edge_visited: Vec<bool>,
    stack: Vec<usize>,
}

impl IslandGenerator for LocalIslandGenerator {
    fn generate(&mut self, graph: &BodyGraph) -> Vec<WorldIsland> {
        self.visited.clear();
        self.visited.resize(graph.bodies.len(), false);
        self.edge_visited.clear();
        self.edge_visited.resize(graph.edges.len(), false);

        let mut islands = Vec::new();
        let mut free = WorldIsland {
            free: true,
            ..WorldIsland::default()
        };

        for start in 0..graph.bodies.len() {
            if self.visited[start] || graph.bodies[start].is_static {
                continue;
            }
            let coupled = graph.adjacency[start]
                .iter()
                .any(|&e| graph.is_active(&graph.edges[e]));
            if !coupled {
                self.visited[start] = true;
                free.bodies.push(graph.bodies[start].id);
                continue;
            }

            let mut island = WorldIsland {
                id: islands.len(),
                ..WorldIsland::default()
            };
            self.visited[start] = true;
            self.stack.push(start);
            while let Some(node) = self.stack.pop() {
                island.bodies.push(graph.bodies[node].id);
                for &e in &graph.adjacency[node] {
                    let edge = &graph.edges[e];
                    if self.edge_visited[e] || edge.sensor {
                        continue;
                    }
                    self.edge_visited[e] = true;
                    island.constraints.push(edge.constraint);
                    for other in std::iter::once(edge.body_a).chain(edge.body_b) {
                        if let Some(j) = graph.is_dynamic(other) {
                            if !self.visited[j] {
                                self.visited[j] = true;
                                self.stack.push(j);
                            }
                        }
                    }
                }
            }
            island.sleeping = all_asleep(graph, &island.bodies);
            islands.push(island);
        }

        if !free.bodies.is_empty() {
            free.id = islands.len();
            free.sleeping = all_asleep(graph, &free.bodies);
            islands.push(free);
        }
        debug!(
            islands = islands.len(),
            bodies = graph.bodies.len(),
            edges = graph.edges.len(),
            "islands generated"
        );
        islands
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

/// A single island holding every dynamic body and every constraint.
#[derive(Debug, Clone, Copy, Default)]
pub struct SoleIslandGenerator;

impl IslandGenerator for SoleIslandGenerator {
    fn generate(&mut self, graph: &BodyGraph) -> Vec<WorldIsland> {
        let bodies: Vec<BodyId> = graph
            .bodies
            .iter()
            .filter(|b| !b.is_static)
            .map(|b| b.id)
            .collect();
        if bodies.is_empty() {
            return Vec::new();
        }
        let constraints = graph
            .edges
            .iter()
            .filter(|edge| graph.is_active(edge))
            .map(|edge| edge.constraint)
            .collect();
        let sleeping = all_asleep(graph, &bodies);
        vec![WorldIsland {
            id: 0,
            bodies,
            constraints,
            sleeping,
            free: false,
        }]
    }

    fn name(&self) -> &'static str {
        "sole"
    }
}

fn all_asleep(graph: &BodyGraph, bodies: &[BodyId]) -> bool {
    !bodies.is_empty()
        && bodies
            .iter()
            .all(|&id| graph.body(id).is_some_and(|b| b.sleeping))
}
