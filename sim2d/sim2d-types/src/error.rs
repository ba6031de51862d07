//! Error types for simulation operations.

use crate::{BodyId, ColliderId, JointId};
use thiserror::Error;

/// Errors that can occur while building or stepping a simulation.
///
/// Numerical degeneracy (a degenerate simplex, a zero-length edge, a
/// non-finite time-of-impact step) has no variant: the pipeline skips the
/// offending computation and keeps stepping.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    /// Invalid configuration or unknown strategy key.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the configuration error.
        reason: String,
    },

    /// A body or constraint count would exceed its configured maximum.
    #[error("capacity exceeded: {resource} limit is {limit}")]
    CapacityExceeded {
        /// The exhausted resource ("bodies", "constraints").
        resource: &'static str,
        /// The configured limit.
        limit: usize,
    },

    /// The scratch arena cannot satisfy a reservation.
    #[error("out of scratch memory: requested {requested} words, largest free block is {available}")]
    OutOfScratchMemory {
        /// Requested size in words.
        requested: usize,
        /// Largest free block in words.
        available: usize,
    },

    /// A block handed back to the arena does not belong to it.
    #[error("invalid arena block at offset {offset} (len {len})")]
    InvalidArenaBlock {
        /// Offset of the rejected block.
        offset: usize,
        /// Length of the rejected block.
        len: usize,
    },

    /// Invalid body ID referenced.
    #[error("invalid body ID: {0}")]
    InvalidBodyId(BodyId),

    /// Invalid collider ID referenced.
    #[error("invalid collider ID: {0}")]
    InvalidColliderId(ColliderId),

    /// Invalid joint ID referenced.
    #[error("invalid joint ID: {0}")]
    InvalidJointId(JointId),

    /// Degenerate geometry handed to a shape constructor.
    #[error("invalid shape: {reason}")]
    InvalidShape {
        /// Description of what's wrong.
        reason: String,
    },

    /// Invalid timestep.
    #[error("invalid timestep: {0} (must be positive and finite)")]
    InvalidTimestep(f64),
}

impl SimError {
    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create an invalid shape error.
    #[must_use]
    pub fn invalid_shape(reason: impl Into<String>) -> Self {
        Self::InvalidShape {
            reason: reason.into(),
        }
    }

    /// Create a capacity error.
    #[must_use]
    pub const fn capacity(resource: &'static str, limit: usize) -> Self {
        Self::CapacityExceeded { resource, limit }
    }

    /// Check if this is a configuration error.
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::InvalidConfig { .. })
    }

    /// Check if this is a capacity error.
    #[must_use]
    pub fn is_capacity_exceeded(&self) -> bool {
        matches!(self, Self::CapacityExceeded { .. })
    }

    /// Check if this is a scratch allocation failure.
    #[must_use]
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, Self::OutOfScratchMemory { .. })
    }
}
