//! 2D rigid-body world.
//!
//! This crate ties the lower layers together:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         World                                │
//! │  bodies, colliders, joints, pairs, events, step loop         │
//! └───────────────┬─────────────────────────────┬───────────────┘
//!                 │                             │
//!                 ▼                             ▼
//! ┌───────────────────────────────┐ ┌───────────────────────────┐
//! │       sim2d-collision          │ │     sim2d-constraint       │
//! │  broad / mid / narrow, TOI     │ │  islands, rows, PGS, arena │
//! └───────────────┬───────────────┘ └─────────────┬─────────────┘
//!                 └──────────────┬────────────────┘
//!                                ▼
//!                ┌───────────────────────────────┐
//!                │          sim2d-types           │
//!                │  ids, settings, errors, events │
//!                └───────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use nalgebra::Vector2;
//! use sim2d_collision::Shape;
//! use sim2d_core::{BodyDef, ColliderDef, World};
//! use sim2d_types::Settings;
//!
//! let mut world = World::new(Settings::default()).unwrap();
//!
//! let ground = world.create_body(&BodyDef::fixed(Vector2::new(0.0, -0.5))).unwrap();
//! world
//!     .add_collider(ground, ColliderDef::new(Shape::rectangle(10.0, 0.5).unwrap()))
//!     .unwrap();
//!
//! let ball = world.create_body(&BodyDef::dynamic(Vector2::new(0.0, 2.0))).unwrap();
//! world
//!     .add_collider(ball, ColliderDef::new(Shape::circle(0.5).unwrap()))
//!     .unwrap();
//!
//! for _ in 0..240 {
//!     world.step(1.0 / 60.0).unwrap();
//! }
//! let ball = world.body(ball).unwrap();
//! assert!((ball.position().y - 0.5).abs() < 0.05);
//! ```
//!
//! # Determinism
//!
//! Given the same calls in the same order, a world produces bit-identical
//! results: bodies, colliders, joints and pairs are iterated in id order
//! and hash maps are only used for lookups.

#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,
    clippy::suboptimal_flops,
    clippy::missing_errors_doc,
    clippy::similar_names,
    clippy::module_name_repetitions
)]

pub mod body;
pub mod collider;
pub mod events;
pub mod pairs;
mod step;
pub mod world;

pub use body::{Body, BodyDef};
pub use collider::{Collider, ColliderDef};
pub use events::{EventDispatcher, Handler, HandlerId};
pub use pairs::{MAX_MANIFOLD_POINTS, Manifold, ManifoldPoint, Pair, PairRegistry, Transition};
pub use world::{StepStats, World};

pub use sim2d_constraint::{
    DistanceJointDef, Joint, JointKind, MotorDef, MouseJointDef, PrismaticJointDef,
    RevoluteJointDef, SpringJointDef, Suspension, WeldJointDef, WheelJointDef,
};
pub use sim2d_types::{
    BodyId, ColliderId, ContactId, ContactPoint, EventKind, JointId, Material, Result, Settings,
    SimError, WorldEvent,
};
