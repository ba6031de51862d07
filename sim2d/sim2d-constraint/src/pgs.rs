//! Projected Gauss-Seidel (PGS) solver for one island.
//!
//! # Algorithm
//!
//! The island's rows are assembled into a sparse Jacobian `J` and effective
//! mass `A = J · M⁻¹ · Jᵀ`. Two independent passes then solve `A · λ = b`
//! for row forces `λ`:
//!
//! | pass     | strength              | `b`                                      |
//! |----------|-----------------------|------------------------------------------|
//! | position | `position_correction` | `rhs / dt` (Baumgarte bias)              |
//! | velocity | 0                     | `(rhs - J · (v + M⁻¹ · F_ext · dt)) / dt`|
//!
//! Each sweep updates every row in order:
//!
//! ```text
//! λ_i ← clamp(λ_i + (b_i - Σ_j A_ij λ_j) / A_ii, lower_i, upper_i)
//! ```
//!
//! Friction bounds follow the current multiplier of the paired normal row.
//! Each pass starts from its own cached `λ` scaled by `warm_start_factor`
//! and writes the result back for the next step.
//!
//! The pass forces `F = Jᵀ · λ` are then integrated by [`integrate`]:
//! velocity forces change velocities, position forces only move positions,
//! so Baumgarte correction injects no kinetic energy.

use crate::arena::{Arena, ScratchStack};
use crate::constraint::{BodyState, Clamping, Constraint, Pass};
use crate::sparse::{BodyRows, EffectiveMass, RowAdjacency, RowBodies, SparseJacobian, SystemSize};
use nalgebra::{Vector2, Vector3};
use sim2d_types::math::EPSILON;
use sim2d_types::{Result, Settings};
use tracing::trace;

/// One end of a solver row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Endpoint {
    /// A dynamic body of the island, by island-local index.
    Dynamic(usize),
    /// A body that does not move during the solve (static body or world).
    Fixed(BodyState),
}

impl Endpoint {
    /// The world as a fixed endpoint.
    #[must_use]
    pub fn world() -> Self {
        Self::Fixed(BodyState::default())
    }

    /// Island-local index of a dynamic endpoint.
    #[must_use]
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::Dynamic(index) => Some(*index),
            Self::Fixed(_) => None,
        }
    }

    fn state<'s>(&'s self, bodies: &'s [BodyState]) -> &'s BodyState {
        match self {
            Self::Dynamic(index) => &bodies[*index],
            Self::Fixed(state) => state,
        }
    }
}

/// A constraint row scheduled for one island solve.
#[derive(Debug)]
pub struct SolverRow<'a> {
    /// The row.
    pub constraint: &'a mut dyn Constraint,
    /// Body A.
    pub a: Endpoint,
    /// Body B.
    pub b: Endpoint,
    /// Index of the first row of the owning joint or contact; friction rows
    /// find their normal row relative to it.
    pub group: usize,
}

/// Statistics of one island solve.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SolverStats {
    /// Number of rows.
    pub rows: usize,
    /// Sweeps per pass.
    pub iterations: usize,
    /// Largest multiplier change during the final sweep of either pass.
    pub max_lambda_delta: f64,
}

impl SolverStats {
    /// Fold another island's statistics into these.
    pub fn merge(&mut self, other: &Self) {
        self.rows += other.rows;
        self.iterations = self.iterations.max(other.iterations);
        self.max_lambda_delta = self.max_lambda_delta.max(other.max_lambda_delta);
    }
}

/// Forces produced by one island solve, per island body as `(fx, fy, τ)`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IslandSolution {
    /// Forces of the velocity pass.
    pub velocity_forces: Vec<Vector3<f64>>,
    /// Forces of the position pass.
    pub position_forces: Vec<Vector3<f64>>,
    /// Solve statistics.
    pub stats: SolverStats,
}

/// Projected Gauss-Seidel solver.
#[derive(Debug, Clone, PartialEq)]
pub struct PgsSolver {
    /// Sweeps per pass.
    pub iterations: usize,
    /// Baumgarte strength of the position pass.
    pub position_correction: f64,
    /// Scale of cached multipliers when warm starting.
    pub warm_start_factor: f64,
}

impl Default for PgsSolver {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl PgsSolver {
    /// Solver configured from `settings`.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            iterations: settings.solver_iterations,
            position_correction: settings.position_correction,
            warm_start_factor: settings.warm_start_factor,
        }
    }

    /// Solve the rows of one island.
    ///
    /// `bodies` are the island's dynamic bodies, indexed by
    /// [`Endpoint::Dynamic`]. The Jacobian, the coupling lists, the
    /// effective mass and the dense vectors are all carved from `arena` and
    /// released before returning; a system larger than the free arena fails
    /// with `OutOfScratchMemory`.
    pub fn solve_island(
        &self,
        arena: &mut Arena,
        bodies: &[BodyState],
        rows: &mut [SolverRow<'_>],
        dt: f64,
    ) -> Result<IslandSolution> {
        let n = rows.len();
        let dofs = 3 * bodies.len();
        let mut solution = IslandSolution {
            velocity_forces: vec![Vector3::zeros(); bodies.len()],
            position_forces: vec![Vector3::zeros(); bodies.len()],
            stats: SolverStats {
                rows: n,
                iterations: self.iterations,
                max_lambda_delta: 0.0,
            },
        };
        if n == 0 || dt <= 0.0 {
            return Ok(solution);
        }

        let num_bodies = bodies.len();
        let ends = |i: usize| RowBodies {
            a: rows[i].a.index(),
            b: rows[i].b.index(),
        };
        let size = SystemSize::new(num_bodies, (0..n).map(&ends));

        let mut scratch = ScratchStack::new(arena);
        let body_offsets = scratch.push(num_bodies + 1)?;
        let body_rows = scratch.push(size.incidence)?;
        let coupled = {
            let [offsets, list] = scratch.arena_mut().split_mut([body_offsets, body_rows])?;
            let incidence = BodyRows::build(n, &ends, offsets, list);
            RowAdjacency::count(n, &ends, &incidence)
        };
        let blocks = [
            body_offsets,
            body_rows,
            scratch.push(dofs)?,
            scratch.push(dofs)?,
            scratch.push(dofs)?,
            scratch.push(n)?,
            scratch.push(n)?,
            scratch.push(n + 1)?,
            scratch.push(size.jacobian_nnz)?,
            scratch.push(size.jacobian_nnz)?,
            scratch.push(n + 1)?,
            scratch.push(coupled)?,
            scratch.push(coupled)?,
            scratch.push(n)?,
        ];
        let [
            body_offsets,
            body_rows,
            inv_mass,
            predicted,
            forces,
            lambda,
            rhs,
            j_offsets,
            j_cols,
            j_values,
            adj_offsets,
            adj_rows,
            a_values,
            diagonal,
        ] = scratch.arena_mut().split_mut(blocks)?;

        for (k, body) in bodies.iter().enumerate() {
            inv_mass[3 * k] = body.inv_mass;
            inv_mass[3 * k + 1] = body.inv_mass;
            inv_mass[3 * k + 2] = body.inv_inertia;
            let v = body.velocity + body.force * body.inv_mass * dt;
            predicted[3 * k] = v.x;
            predicted[3 * k + 1] = v.y;
            predicted[3 * k + 2] = body.angular_velocity + body.torque * body.inv_inertia * dt;
        }
        let entries = rows.iter().enumerate().map(|(i, row)| {
            let jacobian = row.constraint.jacobian(row.a.state(bodies), row.b.state(bodies));
            (ends(i), jacobian)
        });
        let jacobian = SparseJacobian::build(num_bodies, entries, j_offsets, j_cols, j_values);
        let incidence = BodyRows::from_words(body_offsets, body_rows);
        let adjacency = RowAdjacency::build(n, &ends, &incidence, adj_offsets, adj_rows);
        let mass = EffectiveMass::build(&jacobian, adjacency, inv_mass, a_values, diagonal);

        for pass in [Pass::Position, Pass::Velocity] {
            match pass {
                Pass::Position => {
                    for (i, row) in rows.iter().enumerate() {
                        rhs[i] = if row.constraint.corrects_position() {
                            let (a, b) = (row.a.state(bodies), row.b.state(bodies));
                            row.constraint.push_factor(a, b, dt, self.position_correction) / dt
                        } else {
                            0.0
                        };
                    }
                }
                Pass::Velocity => {
                    jacobian.mul_vec(predicted, rhs);
                    for (i, row) in rows.iter().enumerate() {
                        let (a, b) = (row.a.state(bodies), row.b.state(bodies));
                        rhs[i] = (row.constraint.push_factor(a, b, dt, 0.0) - rhs[i]) / dt;
                    }
                }
            }

            let delta = self.sweep(pass, &mass, rows, bodies, dt, lambda, rhs);
            solution.stats.max_lambda_delta = solution.stats.max_lambda_delta.max(delta);

            for (row, &value) in rows.iter_mut().zip(lambda.iter()) {
                row.constraint.cache_mut().set(pass, value);
            }
            jacobian.mul_transpose_vec(lambda, forces);
            let out = match pass {
                Pass::Position => &mut solution.position_forces,
                Pass::Velocity => &mut solution.velocity_forces,
            };
            for (k, force) in out.iter_mut().enumerate() {
                *force = Vector3::new(forces[3 * k], forces[3 * k + 1], forces[3 * k + 2]);
            }
        }

        scratch.release_to(0)?;
        trace!(
            rows = n,
            bodies = bodies.len(),
            iterations = self.iterations,
            max_lambda_delta = solution.stats.max_lambda_delta,
            "island solved"
        );
        Ok(solution)
    }

    /// Warm start and run the sweeps of one pass. Returns the largest
    /// multiplier change of the final sweep.
    #[allow(clippy::too_many_arguments)]
    fn sweep(
        &self,
        pass: Pass,
        mass: &EffectiveMass<'_>,
        rows: &[SolverRow<'_>],
        bodies: &[BodyState],
        dt: f64,
        lambda: &mut [f64],
        rhs: &[f64],
    ) -> f64 {
        let active = |row: &SolverRow<'_>| pass == Pass::Velocity || row.constraint.corrects_position();
        let clamping =
            |row: &SolverRow<'_>| row.constraint.clamping(row.a.state(bodies), row.b.state(bodies), dt);
        for (i, row) in rows.iter().enumerate() {
            lambda[i] = if active(row) {
                self.warm_start_factor * row.constraint.cache().get(pass)
            } else {
                0.0
            };
        }
        for (i, row) in rows.iter().enumerate() {
            if active(row) {
                lambda[i] = clamp(&clamping(row), row.group, lambda[i], lambda);
            }
        }

        let mut max_delta = 0.0;
        for _ in 0..self.iterations {
            max_delta = 0.0_f64;
            for (i, row) in rows.iter().enumerate() {
                let diagonal = mass.diagonal(i);
                if !active(row) || diagonal <= EPSILON {
                    continue;
                }
                let residual = rhs[i] - mass.row_dot(i, lambda);
                let updated = clamp(&clamping(row), row.group, lambda[i] + residual / diagonal, lambda);
                max_delta = max_delta.max((updated - lambda[i]).abs());
                lambda[i] = updated;
            }
        }
        max_delta
    }
}

fn clamp(clamping: &Clamping, group: usize, value: f64, lambda: &[f64]) -> f64 {
    let normal = match clamping {
        Clamping::Friction { normal, .. } => lambda[group + normal],
        Clamping::Bounded { .. } => 0.0,
    };
    let (lower, upper) = clamping.interval(normal);
    value.clamp(lower, upper)
}

/// Advance one body by `dt` under its external force and the solver forces:
///
/// ```text
/// v' = v + (F_ext + F_vel) · M⁻¹ · dt
/// x' = x + v' · dt + (F_pos · M⁻¹ · dt) · dt
/// v' ← v' / (1 + dt · c)
/// ```
pub fn integrate(
    body: &mut BodyState,
    velocity_force: &Vector3<f64>,
    position_force: &Vector3<f64>,
    dt: f64,
    damping: f64,
    angular_damping: f64,
) {
    let linear = Vector2::new(velocity_force.x, velocity_force.y);
    body.velocity += (body.force + linear) * body.inv_mass * dt;
    body.angular_velocity += (body.torque + velocity_force.z) * body.inv_inertia * dt;

    let push = Vector2::new(position_force.x, position_force.y) * body.inv_mass * dt;
    let spin = position_force.z * body.inv_inertia * dt;
    body.position += (body.velocity + push) * dt;
    body.angle += (body.angular_velocity + spin) * dt;

    body.velocity *= 1.0 / (1.0 + dt * damping);
    body.angular_velocity *= 1.0 / (1.0 + dt * angular_damping);
}
