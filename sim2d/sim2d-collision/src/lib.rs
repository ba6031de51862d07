//! Collision detection for 2D rigid bodies.
//!
//! The pipeline narrows candidate pairs in stages:
//!
//! ```text
//! ┌──────────────┐   AABB overlap   ┌─────────────┐   OBB tree   ┌──────────────┐
//! │ broad phase  │ ───────────────▶ │  mid phase  │ ───────────▶ │ narrow phase │
//! │ naive / SAP  │  collider pairs  │ mesh pieces │  candidates  │ SAT, GJK+EPA │
//! └──────────────┘                  └─────────────┘              └──────────────┘
//! ```
//!
//! - [`shape`] - closed set of shapes with support queries
//! - [`broad_phase`] - [`NaiveBroadPhase`] and [`SweepAndPrune`]
//! - [`mid_phase`] - descends OBB trees of meshes
//! - [`narrow_phase`] - [`SatNarrowPhase`] and [`GjkEpaNarrowPhase`]
//! - [`toi`] - conservative advancement for fast movers
//!
//! # Conventions
//!
//! Contact normals point from shape A to shape B. Depth is positive when the
//! shapes overlap.
//!
//! # Example
//!
//! ```
//! use nalgebra::{Isometry2, Vector2};
//! use sim2d_collision::{NarrowPhase, SatNarrowPhase, Shape, ShapeInstance};
//!
//! let ball = Shape::circle(1.0).unwrap();
//! let ground = Shape::rectangle(10.0, 0.5).unwrap();
//! let contacts = SatNarrowPhase::default().collide(
//!     &ShapeInstance::new(&ground, Isometry2::identity()),
//!     &ShapeInstance::new(&ball, Isometry2::translation(0.0, 1.4)),
//! );
//! assert_eq!(contacts.len(), 1);
//! assert!((contacts[0].normal - Vector2::y()).norm() < 1e-12);
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,
    clippy::suboptimal_flops,
    clippy::missing_errors_doc,
    clippy::many_single_char_names,
    clippy::cast_precision_loss
)]

pub mod aabb;
pub mod broad_phase;
pub mod epa;
pub mod gjk;
pub mod mid_phase;
pub mod narrow_phase;
pub mod obb;
pub mod sat;
pub mod shape;
pub mod toi;

pub use aabb::{Aabb, Axis};
pub use broad_phase::{BroadPhase, NaiveBroadPhase, Proxy, SweepAndPrune, create_broad_phase};
pub use epa::{EpaResult, epa};
pub use gjk::{GjkResult, MinkowskiDifference, Simplex, gjk_distance};
pub use mid_phase::{Candidate, refine};
pub use narrow_phase::{
    ContactInfo, ContactSet, GjkEpaNarrowPhase, NarrowPhase, SatNarrowPhase, ShapeInstance,
    create_narrow_phase,
};
pub use obb::{Obb, ObbNode, ObbTree};
pub use shape::{
    Capsule, Circle, Convex, Ellipse, Feature, Mesh, Polygon, Shape, ShapeKind, ShapePart,
};
pub use toi::{Motion, time_of_impact};
