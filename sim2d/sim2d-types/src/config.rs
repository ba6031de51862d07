//! Configuration types for simulation.
//!
//! [`Settings`] is consumed once by the world at construction: it selects the
//! broad phase, narrow phase and island generator implementations and fixes
//! every capacity limit. Nothing here can be changed mid-run.

use crate::math::Vector2;
use crate::{Result, SimError};
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Broad phase strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum BroadPhaseKind {
    /// All-pairs AABB test.
    Naive,
    /// Two-axis sweep and prune with persistent endpoint lists.
    #[default]
    Sweep,
}

/// Narrow phase strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum NarrowPhaseKind {
    /// Separating axis test with face clipping.
    #[default]
    Sat,
    /// GJK distance with EPA penetration.
    GjkEpa,
}

/// Island generation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum IslandGeneratorKind {
    /// Depth-first partition into independent islands.
    #[default]
    Local,
    /// A single island holding every dynamic body.
    Sole,
}

macro_rules! strategy_keys {
    ($ty:ident, $what:literal, $($variant:ident => $key:literal),+) => {
        impl $ty {
            /// The configuration key of this strategy.
            #[must_use]
            pub const fn key(self) -> &'static str {
                match self {
                    $(Self::$variant => $key,)+
                }
            }
        }

        impl FromStr for $ty {
            type Err = SimError;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $($key => Ok(Self::$variant),)+
                    other => Err(SimError::invalid_config(format!(
                        concat!("unknown ", $what, " strategy '{}'"),
                        other
                    ))),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.key())
            }
        }
    };
}

strategy_keys!(BroadPhaseKind, "broad phase", Naive => "naive", Sweep => "sweep");
strategy_keys!(NarrowPhaseKind, "narrow phase", Sat => "sat", GjkEpa => "gjk-epa");
strategy_keys!(IslandGeneratorKind, "island generator", Local => "local", Sole => "sole");

/// Composition-time configuration of a world.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Settings {
    /// Gravitational acceleration (m/s²).
    pub gravity: Vector2<f64>,
    /// Projected Gauss-Seidel iterations per pass.
    pub solver_iterations: usize,
    /// Baumgarte strength of the position pass, in `[0, 1]`.
    pub position_correction: f64,
    /// Scale applied to cached impulses when warm starting, in `[0, 1]`.
    pub warm_start_factor: f64,
    /// Approach speed below which restitution is ignored (m/s).
    pub restitution_threshold: f64,

    /// Broad phase strategy.
    pub broad_phase: BroadPhaseKind,
    /// Narrow phase strategy.
    pub narrow_phase: NarrowPhaseKind,
    /// Island generation strategy.
    pub island_generator: IslandGeneratorKind,

    /// Maximum sub-steps per frame for continuous bodies.
    pub toi_substeps: usize,
    /// Distance below which conservative advancement reports an impact.
    pub toi_epsilon: f64,
    /// Iteration cap of conservative advancement.
    pub toi_max_iterations: usize,
    /// Penetration allowed past the time of impact so the narrow phase
    /// produces a contact.
    pub toi_penetration_depth: f64,

    /// Relative error at which GJK considers its distance converged.
    pub gjk_rel_error: f64,
    /// Iteration cap of GJK.
    pub gjk_max_iterations: usize,
    /// Improvement below which EPA stops expanding.
    pub epa_epsilon: f64,
    /// Iteration cap of EPA.
    pub epa_max_iterations: usize,

    /// Whether bodies may fall asleep.
    pub allow_sleeping: bool,
    /// Linear speed below which a body counts as resting (m/s).
    pub sleeping_velocity_threshold: f64,
    /// Angular speed below which a body counts as resting (rad/s).
    pub sleeping_angular_velocity_threshold: f64,
    /// Time a whole island must rest before sleeping (s).
    pub fall_asleep_timer: f64,

    /// Distance within which a new contact point reuses an existing one.
    pub contact_proximity_threshold: f64,
    /// Penetration tolerated without position correction.
    pub contact_constraint_slop: f64,

    /// Maximum number of bodies.
    pub max_bodies_number: usize,
    /// Maximum number of scalar constraint rows (joints plus contacts).
    pub max_constraints_number: usize,
    /// Size of the solver scratch arena in bytes.
    pub total_reserved_memory: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gravity: Vector2::new(0.0, -9.81),
            solver_iterations: 10,
            position_correction: 0.2,
            warm_start_factor: 0.8,
            restitution_threshold: 1.0,
            broad_phase: BroadPhaseKind::default(),
            narrow_phase: NarrowPhaseKind::default(),
            island_generator: IslandGeneratorKind::default(),
            toi_substeps: 4,
            toi_epsilon: 1e-4,
            toi_max_iterations: 32,
            toi_penetration_depth: 0.01,
            gjk_rel_error: 1e-6,
            gjk_max_iterations: 32,
            epa_epsilon: 1e-6,
            epa_max_iterations: 48,
            allow_sleeping: true,
            sleeping_velocity_threshold: 0.05,
            sleeping_angular_velocity_threshold: 0.05,
            fall_asleep_timer: 0.5,
            contact_proximity_threshold: 0.05,
            contact_constraint_slop: 0.005,
            max_bodies_number: 4096,
            max_constraints_number: 16384,
            total_reserved_memory: 16 * 1024 * 1024,
        }
    }
}

impl Settings {
    /// Settings tuned for 60 Hz interactive use.
    #[must_use]
    pub fn realtime() -> Self {
        Self {
            solver_iterations: 8,
            toi_substeps: 2,
            ..Default::default()
        }
    }

    /// Settings favouring accuracy over speed.
    #[must_use]
    pub fn high_accuracy() -> Self {
        Self {
            solver_iterations: 40,
            toi_substeps: 8,
            toi_max_iterations: 64,
            gjk_rel_error: 1e-9,
            gjk_max_iterations: 64,
            epa_epsilon: 1e-9,
            epa_max_iterations: 128,
            contact_constraint_slop: 0.001,
            ..Default::default()
        }
    }

    /// Set gravity.
    #[must_use]
    pub fn with_gravity(mut self, gravity: Vector2<f64>) -> Self {
        self.gravity = gravity;
        self
    }

    /// Disable gravity.
    #[must_use]
    pub fn zero_gravity(mut self) -> Self {
        self.gravity = Vector2::zeros();
        self
    }

    /// Set the solver iteration count.
    #[must_use]
    pub fn with_solver_iterations(mut self, iterations: usize) -> Self {
        self.solver_iterations = iterations;
        self
    }

    /// Select the broad phase.
    #[must_use]
    pub fn with_broad_phase(mut self, kind: BroadPhaseKind) -> Self {
        self.broad_phase = kind;
        self
    }

    /// Select the narrow phase.
    #[must_use]
    pub fn with_narrow_phase(mut self, kind: NarrowPhaseKind) -> Self {
        self.narrow_phase = kind;
        self
    }

    /// Select the island generator.
    #[must_use]
    pub fn with_island_generator(mut self, kind: IslandGeneratorKind) -> Self {
        self.island_generator = kind;
        self
    }

    /// Set capacity limits.
    #[must_use]
    pub fn with_capacity(mut self, bodies: usize, constraints: usize) -> Self {
        self.max_bodies_number = bodies;
        self.max_constraints_number = constraints;
        self
    }

    /// Set the scratch arena size in bytes.
    #[must_use]
    pub fn with_reserved_memory(mut self, bytes: usize) -> Self {
        self.total_reserved_memory = bytes;
        self
    }

    /// Disable sleeping.
    #[must_use]
    pub fn no_sleeping(mut self) -> Self {
        self.allow_sleeping = false;
        self
    }

    /// Validate the settings.
    pub fn validate(&self) -> Result<()> {
        if !(self.gravity.x.is_finite() && self.gravity.y.is_finite()) {
            return Err(SimError::invalid_config("gravity must be finite"));
        }
        if self.solver_iterations == 0 {
            return Err(SimError::invalid_config(
                "solver_iterations must be at least 1",
            ));
        }
        if !(0.0..=1.0).contains(&self.position_correction) {
            return Err(SimError::invalid_config(
                "position_correction must be between 0 and 1",
            ));
        }
        if !(0.0..=1.0).contains(&self.warm_start_factor) {
            return Err(SimError::invalid_config(
                "warm_start_factor must be between 0 and 1",
            ));
        }
        if self.toi_substeps == 0 {
            return Err(SimError::invalid_config("toi_substeps must be at least 1"));
        }
        if self.toi_max_iterations == 0
            || self.gjk_max_iterations == 0
            || self.epa_max_iterations == 0
        {
            return Err(SimError::invalid_config(
                "iteration caps must be at least 1",
            ));
        }
        for (name, value) in [
            ("toi_epsilon", self.toi_epsilon),
            ("gjk_rel_error", self.gjk_rel_error),
            ("epa_epsilon", self.epa_epsilon),
            ("contact_proximity_threshold", self.contact_proximity_threshold),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(SimError::invalid_config(format!(
                    "{name} must be positive and finite"
                )));
            }
        }
        for (name, value) in [
            ("toi_penetration_depth", self.toi_penetration_depth),
            ("restitution_threshold", self.restitution_threshold),
            ("contact_constraint_slop", self.contact_constraint_slop),
            ("sleeping_velocity_threshold", self.sleeping_velocity_threshold),
            (
                "sleeping_angular_velocity_threshold",
                self.sleeping_angular_velocity_threshold,
            ),
            ("fall_asleep_timer", self.fall_asleep_timer),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(SimError::invalid_config(format!(
                    "{name} cannot be negative"
                )));
            }
        }
        if self.max_bodies_number == 0 {
            return Err(SimError::invalid_config(
                "max_bodies_number must be at least 1",
            ));
        }
        if self.total_reserved_memory < std::mem::size_of::<f64>() {
            return Err(SimError::invalid_config(
                "total_reserved_memory must hold at least one word",
            ));
        }
        Ok(())
    }
}
