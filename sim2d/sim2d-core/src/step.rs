//! The step loop.
//!
//! ```text
//! PreStep → gravity → sub-steps → clear forces → PostStep
//!
//! sub-step: TOI bound → collide → islands → solve/integrate → sleep
//! ```

use crate::body::Body;
use crate::pairs::Transition;
use crate::world::{StepStats, World};
use hashbrown::HashMap;
use nalgebra::Vector3;
use sim2d_collision::{Motion, Proxy, Shape, ShapePart, time_of_impact};
use sim2d_constraint::{
    BodyGraph, BodyState, ConstraintRef, Endpoint, GraphBody, GraphEdge, IslandSolution,
    SolverRow, WorldIsland, integrate,
};
use sim2d_types::{BodyId, EventKind, Result, SimError, WorldEvent};
use tracing::{debug, warn};

/// Shortest sub-step, as a fraction of the step.
const MIN_SUBSTEP_FRACTION: f64 = 1e-3;

impl World {
    /// Advance the simulation by `dt` seconds.
    ///
    /// Continuous bodies split the step at their first time of impact, up
    /// to `toi_substeps` sub-steps; the last sub-step always consumes the
    /// remaining time.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidTimestep`] for a non-positive or
    /// non-finite `dt`, and [`SimError::OutOfScratchMemory`] when an island
    /// does not fit in the scratch arena. The world is left mid-step in the
    /// latter case.
    pub fn step(&mut self, dt: f64) -> Result<()> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(SimError::InvalidTimestep(dt));
        }
        self.emit(WorldEvent::PreStep { dt });

        let gravity = self.settings.gravity;
        for body in self.bodies.values_mut() {
            let mass = body.mass();
            body.apply_force(gravity * mass);
        }

        let mut stats = StepStats::default();
        let max_substeps = self.settings.toi_substeps.max(1);
        let mut remaining = dt;
        for substep in 1..=max_substeps {
            let h = if substep == max_substeps {
                remaining
            } else {
                (remaining * self.toi_fraction(remaining))
                    .max(dt * MIN_SUBSTEP_FRACTION)
                    .min(remaining)
            };
            stats.substeps = substep;
            self.collide(&mut stats);
            self.solve(h, &mut stats)?;
            remaining -= h;
            if remaining <= dt * f64::EPSILON {
                break;
            }
        }

        for body in self.bodies.values_mut() {
            body.clear_forces();
        }
        self.time += dt;
        self.step_count += 1;
        self.last_stats = stats;
        debug!(
            step = self.step_count,
            substeps = stats.substeps,
            pairs = stats.pairs,
            contacts = stats.contacts,
            islands = stats.islands,
            "step finished"
        );
        self.emit(WorldEvent::PostStep { dt });
        Ok(())
    }

    /// Linear motion of a body over the next `interval`, including the
    /// velocity change from its accumulated force.
    fn motion(state: &BodyState, active: bool, interval: f64) -> Motion {
        if active {
            Motion::new(
                state.position,
                state.angle,
                state.velocity + state.force * state.inv_mass * interval,
                state.angular_velocity + state.torque * state.inv_inertia * interval,
            )
        } else {
            Motion::fixed(state.position, state.angle)
        }
    }

    /// Earliest normalized time of impact over pairs with an awake
    /// continuous body.
    fn toi_fraction(&self, interval: f64) -> f64 {
        let mut fraction = 1.0_f64;
        for pair in self.pairs.iter() {
            if pair.is_sensor() || pair.is_touching() {
                continue;
            }
            let (Some(body_a), Some(body_b)) = (self.bodies.get(&pair.body_a()), self.bodies.get(&pair.body_b()))
            else {
                continue;
            };
            let continuous = |b: &Body| b.is_continuous() && b.is_active();
            if !continuous(body_a) && !continuous(body_b) {
                continue;
            }
            let (Some(collider_a), Some(collider_b)) = (
                self.colliders.get(&pair.collider_a()),
                self.colliders.get(&pair.collider_b()),
            ) else {
                continue;
            };

            let motion_a = Self::motion(body_a.state(), body_a.is_active(), interval);
            let motion_b = Self::motion(body_b.state(), body_b.is_active(), interval);
            let sweep = |shape: &Shape, motion: &Motion| {
                let spin = motion.angular_velocity.abs() * shape.max_radius() * interval;
                shape
                    .aabb(&motion.at(0.0))
                    .swept(&(motion.velocity * interval))
                    .expanded(spin)
            };
            if !sweep(collider_a.shape(), &motion_a).overlaps(&sweep(collider_b.shape(), &motion_b)) {
                continue;
            }

            let toi = time_of_impact(
                collider_a.shape().convex(ShapePart::Whole),
                &motion_a,
                collider_b.shape().convex(ShapePart::Whole),
                &motion_b,
                interval,
                &self.settings,
            );
            fraction = fraction.min(toi);
        }
        fraction
    }

    /// Refresh bounds, run the broad phase and update every pair.
    fn collide(&mut self, stats: &mut StepStats) {
        for collider in self.colliders.values_mut() {
            if let Some(body) = self.bodies.get(&collider.body()) {
                collider.refresh_aabb(&body.pose());
            }
        }
        let proxies: Vec<Proxy> = self
            .colliders
            .values()
            .filter_map(|c| {
                let body = self.bodies.get(&c.body())?;
                Some(c.proxy(body.is_active()))
            })
            .collect();
        let broad = self.broad_phase.find_pairs(&proxies);
        let transitions = self.pairs.validate(
            &broad,
            &self.colliders,
            &self.bodies,
            self.narrow_phase.as_ref(),
        );

        for (key, transition) in transitions {
            let kind = match transition {
                Transition::Start => EventKind::CollisionStart,
                Transition::Persist => EventKind::Collide,
                Transition::End => EventKind::CollisionEnd,
            };
            if !self.events.wants(kind) {
                continue;
            }
            let Some(pair) = self.pairs.get_by_key(&key) else {
                continue;
            };
            let (collider_a, collider_b) = (pair.collider_a(), pair.collider_b());
            let event = match transition {
                Transition::Start => WorldEvent::CollisionStart {
                    collider_a,
                    collider_b,
                    contacts: pair.contact_points(),
                },
                Transition::Persist => WorldEvent::Collide {
                    collider_a,
                    collider_b,
                    contacts: pair.contact_points(),
                },
                Transition::End => WorldEvent::CollisionEnd {
                    collider_a,
                    collider_b,
                },
            };
            self.events.emit(&event);
        }

        for body in self.bodies.values_mut() {
            body.contacts.clear();
        }
        for pair in self.pairs.iter() {
            for point in pair.manifold().points() {
                for id in [pair.body_a(), pair.body_b()] {
                    if let Some(body) = self.bodies.get_mut(&id) {
                        body.contacts.push(point.id);
                    }
                }
            }
        }
        stats.pairs = broad.len();
        stats.contacts = self.pairs.contact_count();
    }

    /// Build this sub-step's body graph. Contacts beyond the constraint
    /// budget are left out.
    fn build_graph(&self, stats: &mut StepStats) -> BodyGraph {
        let mut graph = BodyGraph::new();
        for body in self.bodies.values() {
            graph.add_body(GraphBody {
                id: body.id(),
                is_static: body.is_static(),
                sleeping: body.is_sleeping(),
            });
        }

        let limit = self.settings.max_constraints_number;
        let mut rows = 0;
        for (&id, joint) in &self.joints {
            rows += joint.row_count();
            graph.add_edge(GraphEdge {
                constraint: ConstraintRef::Joint(id),
                body_a: joint.body_a(),
                body_b: joint.body_b(),
                sensor: false,
            });
        }

        let mut skipped = 0;
        for pair in self.pairs.iter() {
            for point in pair.manifold().points() {
                if !pair.is_sensor() {
                    let needed = point.constraint.row_count();
                    if rows + needed > limit {
                        skipped += 1;
                        continue;
                    }
                    rows += needed;
                }
                graph.add_edge(GraphEdge {
                    constraint: ConstraintRef::Contact(point.id),
                    body_a: pair.body_a(),
                    body_b: Some(pair.body_b()),
                    sensor: pair.is_sensor(),
                });
            }
        }
        if skipped > 0 {
            warn!(skipped, limit, "constraint budget exhausted, contacts skipped");
        }
        stats.skipped_contacts = skipped;
        graph
    }

    /// Partition, solve and integrate, then update sleep state.
    fn solve(&mut self, dt: f64, stats: &mut StepStats) -> Result<()> {
        let graph = self.build_graph(stats);
        let islands = self.island_generator.generate(&graph);
        stats.islands = islands.len();

        // An awake member wakes the whole island.
        for island in islands.iter().filter(|i| !i.sleeping && !i.free) {
            for id in &island.bodies {
                if let Some(body) = self.bodies.get_mut(id) {
                    if body.wake_up() {
                        self.events.emit(&WorldEvent::Awake(*id));
                    }
                }
            }
        }

        let mut owner: HashMap<ConstraintRef, usize> = HashMap::new();
        let mut slot: HashMap<BodyId, usize> = HashMap::new();
        for (index, island) in islands.iter().enumerate() {
            if island.sleeping || island.free {
                continue;
            }
            owner.extend(island.constraints.iter().map(|&c| (c, index)));
            slot.extend(island.bodies.iter().enumerate().map(|(local, &id)| (id, local)));
        }

        let endpoint = |id: Option<BodyId>| -> Endpoint {
            match id {
                None => Endpoint::world(),
                Some(id) => match slot.get(&id) {
                    Some(&local) => Endpoint::Dynamic(local),
                    None => self
                        .bodies
                        .get(&id)
                        .map_or_else(Endpoint::world, |b| Endpoint::Fixed(b.state)),
                },
            }
        };

        let mut island_rows: Vec<Vec<SolverRow<'_>>> = islands.iter().map(|_| Vec::new()).collect();
        for (&id, joint) in self.joints.iter_mut() {
            let Some(&index) = owner.get(&ConstraintRef::Joint(id)) else {
                continue;
            };
            let (a, b) = (endpoint(Some(joint.body_a())), endpoint(joint.body_b()));
            let rows = &mut island_rows[index];
            let group = rows.len();
            rows.extend(joint.rows_mut().map(|constraint| SolverRow {
                constraint,
                a,
                b,
                group,
            }));
        }
        for pair in self.pairs.iter_mut() {
            let (a, b) = (endpoint(Some(pair.body_a())), endpoint(Some(pair.body_b())));
            for point in pair.manifold_mut().points_mut() {
                let Some(&index) = owner.get(&ConstraintRef::Contact(point.id)) else {
                    continue;
                };
                let rows = &mut island_rows[index];
                let group = rows.len();
                rows.extend(point.constraint.rows_mut().map(|constraint| SolverRow {
                    constraint,
                    a,
                    b,
                    group,
                }));
            }
        }

        for (index, (island, rows)) in islands.iter().zip(island_rows.iter_mut()).enumerate() {
            if island.sleeping {
                stats.sleeping_islands += 1;
                continue;
            }
            if self.events.wants(EventKind::IslandPreStep) {
                self.events.emit(&WorldEvent::IslandPreStep {
                    island: index,
                    bodies: island.bodies.clone(),
                });
            }

            let states = island
                .bodies
                .iter()
                .map(|id| {
                    self.bodies
                        .get(id)
                        .map(|b| b.state)
                        .ok_or(SimError::InvalidBodyId(*id))
                })
                .collect::<Result<Vec<BodyState>>>()?;
            let solution = if island.free {
                IslandSolution {
                    velocity_forces: vec![Vector3::zeros(); states.len()],
                    position_forces: vec![Vector3::zeros(); states.len()],
                    ..IslandSolution::default()
                }
            } else {
                self.solver.solve_island(&mut self.arena, &states, rows, dt)?
            };
            stats.solver.merge(&solution.stats);

            for (local, id) in island.bodies.iter().enumerate() {
                let Some(body) = self.bodies.get_mut(id) else {
                    continue;
                };
                body.island = Some(index);
                body.dof_index = Some(3 * local);
                if body.is_sleeping() {
                    continue;
                }
                let (damping, angular_damping) = (body.damping, body.angular_damping);
                integrate(
                    &mut body.state,
                    &solution.velocity_forces[local],
                    &solution.position_forces[local],
                    dt,
                    damping,
                    angular_damping,
                );
            }

            if self.events.wants(EventKind::IslandPostStep) {
                self.events.emit(&WorldEvent::IslandPostStep {
                    island: index,
                    bodies: island.bodies.clone(),
                });
            }
        }
        drop(island_rows);

        if self.settings.allow_sleeping {
            self.update_sleep(&islands, dt);
        }
        Ok(())
    }

    /// Advance sleep timers; constrained islands fall asleep as a whole,
    /// free bodies one by one.
    fn update_sleep(&mut self, islands: &[WorldIsland], dt: f64) {
        let linear = self.settings.sleeping_velocity_threshold;
        let angular = self.settings.sleeping_angular_velocity_threshold;
        let timer = self.settings.fall_asleep_timer;

        for island in islands.iter().filter(|i| !i.sleeping) {
            let mut ready = true;
            for id in &island.bodies {
                if let Some(body) = self.bodies.get_mut(id) {
                    if body.is_sleeping() {
                        continue;
                    }
                    body.tick_sleep(dt, linear, angular);
                    ready &= body.sleep_timer() >= timer;
                }
            }
            for id in &island.bodies {
                let Some(body) = self.bodies.get_mut(id) else {
                    continue;
                };
                let tired = if island.free {
                    body.sleep_timer() >= timer
                } else {
                    ready
                };
                if tired && body.put_to_sleep() {
                    self.events.emit(&WorldEvent::FallAsleep(*id));
                }
            }
        }
    }
}
