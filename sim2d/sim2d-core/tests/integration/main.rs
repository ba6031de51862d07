//! End-to-end tests of the world pipeline.
//!
//! - free-body integration and determinism
//! - contact generation, identity and resting contact with sleeping
//! - time-of-impact sub-stepping
//! - island partitioning
//! - joints through the world API

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]

mod contacts;
mod determinism;
mod free_body;
mod islands;
mod joints;
mod scene;
mod toi;
