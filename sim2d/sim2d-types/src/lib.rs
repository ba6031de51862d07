//! Core types for 2D rigid-body simulation.
//!
//! This crate provides the vocabulary shared by the collision, constraint and
//! world crates:
//!
//! - [`BodyId`], [`ColliderId`], [`JointId`], [`ContactId`], [`PairKey`] - handles
//! - [`Material`] - friction, restitution and damping of a collider
//! - [`Settings`] - composition-time configuration and strategy selection
//! - [`SimError`] - the error type of every fallible operation
//! - [`WorldEvent`] / [`EventKind`] - notifications emitted by the world
//! - [`math`] - planar helpers on top of nalgebra
//!
//! # Layer 0
//!
//! These types are pure data with no physics behaviour, so they can be used
//! by tooling (replay, inspection, configuration) without pulling in the
//! solver.
//!
//! # Coordinate System
//!
//! - X: right
//! - Y: up
//! - Angles counter-clockwise, in radians
//!
//! # Example
//!
//! ```
//! use sim2d_types::{BroadPhaseKind, Settings};
//!
//! let settings = Settings::default().with_broad_phase("naive".parse().unwrap());
//! assert_eq!(settings.broad_phase, BroadPhaseKind::Naive);
//! assert!(settings.validate().is_ok());
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,
    clippy::suboptimal_flops,
    clippy::missing_errors_doc
)]

mod config;
mod error;
mod event;
mod ids;
mod material;
pub mod math;

pub use config::{BroadPhaseKind, IslandGeneratorKind, NarrowPhaseKind, Settings};
pub use error::SimError;
pub use event::{ContactPoint, EventKind, WorldEvent};
pub use ids::{BodyId, ColliderId, ContactId, JointId, PairKey};
pub use material::Material;

/// Result type for simulation operations.
pub type Result<T> = std::result::Result<T, SimError>;
