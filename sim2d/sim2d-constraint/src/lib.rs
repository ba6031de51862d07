//! Constraint solving for 2D rigid bodies.
//!
//! Everything a world needs between "these contacts and joints exist" and
//! "bodies have new velocities and positions":
//!
//! - [`constraint`] - the scalar row abstraction and [`BodyState`]
//! - [`constraints`] - concrete joint rows (distance, point-on-axis, angle,
//!   limits, spring, motor, mouse)
//! - [`contact`] - non-penetration and friction rows of a persistent contact
//! - [`joint`] - joint definitions and their row sets
//! - [`islands`] - partitioning of the body graph
//! - [`sparse`] - CSR Jacobian and effective mass
//! - [`pgs`] - two-pass projected Gauss-Seidel and integration
//! - [`arena`] - scratch memory for the solver's matrices and vectors
//!
//! # Solver passes
//!
//! Every row is solved twice per step. The position pass corrects drift
//! with Baumgarte forces that only move positions; the velocity pass
//! enforces the velocity-level constraint. Each pass keeps its own
//! warm-start multiplier.
//!
//! # Example
//!
//! ```
//! use nalgebra::{Point2, Vector2};
//! use sim2d_constraint::{
//!     Arena, BodyState, ContactConstraint, ContactParams, Endpoint, PgsSolver, SolverRow,
//!     integrate,
//! };
//!
//! // A 1 kg box resting on the ground under gravity.
//! let mut body = BodyState::dynamic(Vector2::new(0.0, 0.5), 0.0, 1.0, 1.0);
//! body.force = Vector2::new(0.0, -9.81);
//! let mut contact = ContactConstraint::new(
//!     Point2::origin(),
//!     Point2::new(0.0, -0.5),
//!     Vector2::y(),
//!     0.0,
//!     0.0,
//!     ContactParams::default(),
//! );
//! let mut rows: Vec<SolverRow<'_>> = contact
//!     .rows_mut()
//!     .map(|constraint| SolverRow { constraint, a: Endpoint::world(), b: Endpoint::Dynamic(0), group: 0 })
//!     .collect();
//!
//! let mut arena = Arena::with_capacity(4096);
//! let dt = 1.0 / 60.0;
//! let solution = PgsSolver::default().solve_island(&mut arena, &[body], &mut rows, dt).unwrap();
//! integrate(&mut body, &solution.velocity_forces[0], &solution.position_forces[0], dt, 0.0, 0.0);
//! assert!(body.velocity.y.abs() < 1e-9);
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,
    clippy::suboptimal_flops,
    clippy::missing_errors_doc,
    clippy::many_single_char_names,
    clippy::similar_names
)]

pub mod arena;
pub mod constraint;
pub mod constraints;
pub mod contact;
pub mod islands;
pub mod joint;
pub mod pgs;
pub mod sparse;

pub use arena::{Arena, Block, ScratchStack};
pub use constraint::{BodyState, Clamping, Constraint, JacobianRow, Pass, WarmStart, recip};
pub use constraints::{
    AngleRow, AxisLimitRow, DistanceRow, LimitSide, MotorRow, MouseRow, PointOnAxisRow, SpringRow,
};
pub use contact::{ContactConstraint, ContactParams, ContactRow, FrictionRow};
pub use islands::{
    BodyGraph, ConstraintRef, GraphBody, GraphEdge, IslandGenerator, LocalIslandGenerator,
    SoleIslandGenerator, WorldIsland, create_island_generator,
};
pub use joint::{
    DistanceJointDef, Joint, JointKind, MotorDef, MouseJointDef, PrismaticJointDef,
    RevoluteJointDef, SpringJointDef, Suspension, WeldJointDef, WheelJointDef,
};
pub use pgs::{Endpoint, IslandSolution, PgsSolver, SolverRow, SolverStats, integrate};
pub use sparse::{
    BodyRows, EffectiveMass, RowAdjacency, RowBodies, SparseJacobian, SparseRow, SystemSize,
};
