//! The simulation world.

use crate::body::{Body, BodyDef};
use crate::collider::{Collider, ColliderDef};
use crate::events::{EventDispatcher, Handler, HandlerId};
use crate::pairs::{ManifoldPoint, Pair, PairRegistry};
use nalgebra::{Point2, Vector2};
use sim2d_collision::{BroadPhase, NarrowPhase, create_broad_phase, create_narrow_phase};
use sim2d_constraint::{
    Arena, BodyState, ContactParams, DistanceJointDef, IslandGenerator, Joint, MotorDef,
    MouseJointDef, PgsSolver, PrismaticJointDef, RevoluteJointDef, SolverStats, SpringJointDef,
    WeldJointDef, WheelJointDef, create_island_generator,
};
use sim2d_types::{
    BodyId, ColliderId, EventKind, JointId, Result, Settings, SimError, WorldEvent,
};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Pipeline counters of the last [`World::step`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StepStats {
    /// Sub-steps taken.
    pub substeps: usize,
    /// Broad-phase pairs of the last sub-step.
    pub pairs: usize,
    /// Cached contacts after the last sub-step.
    pub contacts: usize,
    /// Islands of the last sub-step, including the free island.
    pub islands: usize,
    /// Islands skipped because they sleep.
    pub sleeping_islands: usize,
    /// Contacts left out because the constraint budget ran out.
    pub skipped_contacts: usize,
    /// Solver statistics merged over islands and sub-steps.
    pub solver: SolverStats,
}

/// Owner of bodies, colliders and joints, and driver of the step loop.
///
/// Bodies, colliders and joints live in id-ordered maps so every traversal
/// of a step runs in the same order on every run.
pub struct World {
    pub(crate) settings: Settings,
    pub(crate) bodies: BTreeMap<BodyId, Body>,
    pub(crate) colliders: BTreeMap<ColliderId, Collider>,
    pub(crate) joints: BTreeMap<JointId, Joint>,
    pub(crate) pairs: PairRegistry,
    pub(crate) broad_phase: Box<dyn BroadPhase>,
    pub(crate) narrow_phase: Box<dyn NarrowPhase>,
    pub(crate) island_generator: Box<dyn IslandGenerator>,
    pub(crate) solver: PgsSolver,
    pub(crate) arena: Arena,
    pub(crate) events: EventDispatcher,
    next_body_id: u64,
    next_collider_id: u64,
    next_joint_id: u64,
    pub(crate) time: f64,
    pub(crate) step_count: u64,
    pub(crate) last_stats: StepStats,
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("bodies", &self.bodies.len())
            .field("colliders", &self.colliders.len())
            .field("joints", &self.joints.len())
            .field("pairs", &self.pairs.len())
            .field("broad_phase", &self.broad_phase.name())
            .field("narrow_phase", &self.narrow_phase.name())
            .field("island_generator", &self.island_generator.name())
            .field("time", &self.time)
            .field("step_count", &self.step_count)
            .finish_non_exhaustive()
    }
}

impl World {
    /// Create an empty world.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] when `settings` fail validation.
    pub fn new(settings: Settings) -> Result<Self> {
        settings.validate()?;
        let broad_phase = create_broad_phase(settings.broad_phase);
        let narrow_phase = create_narrow_phase(&settings);
        let island_generator = create_island_generator(settings.island_generator);
        debug!(
            broad_phase = broad_phase.name(),
            narrow_phase = narrow_phase.name(),
            island_generator = island_generator.name(),
            reserved = settings.total_reserved_memory,
            "world created"
        );
        Ok(Self {
            pairs: PairRegistry::new(
                ContactParams::from_settings(&settings),
                settings.contact_proximity_threshold,
            ),
            solver: PgsSolver::from_settings(&settings),
            arena: Arena::with_capacity(settings.total_reserved_memory),
            broad_phase,
            narrow_phase,
            island_generator,
            bodies: BTreeMap::new(),
            colliders: BTreeMap::new(),
            joints: BTreeMap::new(),
            events: EventDispatcher::new(),
            next_body_id: 0,
            next_collider_id: 0,
            next_joint_id: 0,
            time: 0.0,
            step_count: 0,
            last_stats: StepStats::default(),
            settings,
        })
    }

    /// Settings the world was built with.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Simulated time.
    #[must_use]
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Number of completed steps.
    #[must_use]
    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Counters of the last step.
    #[must_use]
    pub fn last_step_stats(&self) -> &StepStats {
        &self.last_stats
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Subscribe to events of `kind`.
    pub fn on(&mut self, kind: EventKind, handler: impl FnMut(&WorldEvent) + 'static) -> HandlerId {
        let handler: Handler = Box::new(handler);
        self.events.on(kind, handler)
    }

    /// Unsubscribe. Returns whether the handler was registered.
    pub fn off(&mut self, id: HandlerId) -> bool {
        self.events.off(id)
    }

    pub(crate) fn emit(&mut self, event: WorldEvent) {
        self.events.emit(&event);
    }

    // =========================================================================
    // Bodies
    // =========================================================================

    /// Create a body.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::CapacityExceeded`] when `max_bodies_number` bodies
    /// already exist.
    pub fn create_body(&mut self, def: &BodyDef) -> Result<BodyId> {
        if self.bodies.len() >= self.settings.max_bodies_number {
            return Err(SimError::capacity("bodies", self.settings.max_bodies_number));
        }
        let id = BodyId::new(self.next_body_id);
        self.next_body_id += 1;
        self.bodies.insert(id, Body::new(id, def));
        self.emit(WorldEvent::BodyCreated(id));
        Ok(id)
    }

    /// Destroy a body with its colliders and joints.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidBodyId`] for an unknown body.
    pub fn destroy_body(&mut self, id: BodyId) -> Result<()> {
        let body = self.bodies.get(&id).ok_or(SimError::InvalidBodyId(id))?;
        let joints = body.joints();
        let colliders: Vec<ColliderId> = body.colliders().to_vec();
        for joint in joints {
            self.remove_joint(joint)?;
        }
        for collider in colliders {
            self.remove_collider(collider)?;
        }
        self.bodies.remove(&id);
        self.emit(WorldEvent::BodyDestroyed(id));
        Ok(())
    }

    /// Look up a body.
    #[must_use]
    pub fn body(&self, id: BodyId) -> Option<&Body> {
        self.bodies.get(&id)
    }

    /// Bodies in id order.
    pub fn bodies(&self) -> impl Iterator<Item = &Body> {
        self.bodies.values()
    }

    /// Number of bodies.
    #[must_use]
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    fn body_entry(&mut self, id: BodyId) -> Result<&mut Body> {
        self.bodies.get_mut(&id).ok_or(SimError::InvalidBodyId(id))
    }

    /// Wake a body up.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidBodyId`] for an unknown body.
    pub fn wake_body(&mut self, id: BodyId) -> Result<()> {
        if self.body_entry(id)?.wake_up() {
            self.emit(WorldEvent::Awake(id));
        }
        Ok(())
    }

    /// Add a force through the center of mass until the end of the next step.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidBodyId`] for an unknown body.
    pub fn apply_force(&mut self, id: BodyId, force: Vector2<f64>) -> Result<()> {
        self.body_entry(id)?.apply_force(force);
        self.wake_body(id)
    }

    /// Add a force at a world point until the end of the next step.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidBodyId`] for an unknown body.
    pub fn apply_force_at_point(&mut self, id: BodyId, force: Vector2<f64>, point: Point2<f64>) -> Result<()> {
        self.body_entry(id)?.apply_force_at_point(force, point);
        self.wake_body(id)
    }

    /// Add a torque until the end of the next step.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidBodyId`] for an unknown body.
    pub fn apply_torque(&mut self, id: BodyId, torque: f64) -> Result<()> {
        self.body_entry(id)?.apply_torque(torque);
        self.wake_body(id)
    }

    /// Apply an impulse at a world point.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidBodyId`] for an unknown body.
    pub fn apply_impulse(&mut self, id: BodyId, impulse: Vector2<f64>, point: Point2<f64>) -> Result<()> {
        self.wake_body(id)?;
        self.body_entry(id)?.apply_impulse(impulse, point);
        Ok(())
    }

    /// Overwrite the velocity of a dynamic body.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidBodyId`] for an unknown body.
    pub fn set_velocity(&mut self, id: BodyId, velocity: Vector2<f64>, angular_velocity: f64) -> Result<()> {
        self.wake_body(id)?;
        let body = self.body_entry(id)?;
        if !body.is_static() {
            body.state.velocity = velocity;
            body.state.angular_velocity = angular_velocity;
        }
        Ok(())
    }

    /// Total kinetic energy of dynamic bodies.
    #[must_use]
    pub fn total_kinetic_energy(&self) -> f64 {
        self.bodies.values().map(Body::kinetic_energy).sum()
    }

    /// Total linear momentum of dynamic bodies.
    #[must_use]
    pub fn total_linear_momentum(&self) -> Vector2<f64> {
        self.bodies.values().map(Body::linear_momentum).sum()
    }

    // =========================================================================
    // Colliders
    // =========================================================================

    /// Attach a collider to a body.
    ///
    /// The first collider of a body without explicit mass gives it its mass
    /// and inertia.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidBodyId`] for an unknown body and
    /// [`SimError::InvalidConfig`] for a non-positive density.
    pub fn add_collider(&mut self, body_id: BodyId, def: ColliderDef) -> Result<ColliderId> {
        if !(def.density.is_finite() && def.density > 0.0) {
            return Err(SimError::invalid_config(format!(
                "collider density must be positive, got {}",
                def.density
            )));
        }
        let id = ColliderId::new(self.next_collider_id);
        let body = self
            .bodies
            .get_mut(&body_id)
            .ok_or(SimError::InvalidBodyId(body_id))?;
        self.next_collider_id += 1;
        body.adopt_shape_mass(&def.shape, def.density);
        body.damping = body.damping.max(def.material.damping);
        body.angular_damping = body.angular_damping.max(def.material.angular_damping);
        body.colliders.push(id);
        let collider = Collider::new(id, body_id, def, &body.pose());

        self.pairs.add_collider(&collider, self.colliders.values());
        self.colliders.insert(id, collider);
        self.emit(WorldEvent::ColliderAdded { collider: id, body: body_id });
        self.wake_body(body_id)?;
        Ok(id)
    }

    /// Detach and drop a collider with its pairs.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidColliderId`] for an unknown collider.
    pub fn remove_collider(&mut self, id: ColliderId) -> Result<()> {
        let collider = self.colliders.remove(&id).ok_or(SimError::InvalidColliderId(id))?;
        let body_id = collider.body();
        if let Some(body) = self.bodies.get_mut(&body_id) {
            body.colliders.retain(|c| *c != id);
        }
        for pair in self.pairs.remove_collider(id) {
            if pair.is_touching() {
                for other in [pair.body_a(), pair.body_b()] {
                    if other != body_id && self.bodies.contains_key(&other) {
                        self.wake_body(other)?;
                    }
                }
                self.emit(WorldEvent::CollisionEnd {
                    collider_a: pair.collider_a(),
                    collider_b: pair.collider_b(),
                });
            }
        }
        self.emit(WorldEvent::ColliderRemoved { collider: id, body: body_id });
        Ok(())
    }

    /// Look up a collider.
    #[must_use]
    pub fn collider(&self, id: ColliderId) -> Option<&Collider> {
        self.colliders.get(&id)
    }

    /// Colliders in id order.
    pub fn colliders(&self) -> impl Iterator<Item = &Collider> {
        self.colliders.values()
    }

    /// Collider pairs in key order.
    #[must_use]
    pub fn pairs(&self) -> &PairRegistry {
        &self.pairs
    }

    /// Every cached contact with its pair.
    pub fn contacts(&self) -> impl Iterator<Item = (&Pair, &ManifoldPoint)> {
        self.pairs
            .iter()
            .flat_map(|pair| pair.manifold().points().iter().map(move |point| (pair, point)))
    }

    // =========================================================================
    // Joints
    // =========================================================================

    fn joint_rows(&self) -> usize {
        self.joints.values().map(Joint::row_count).sum()
    }

    fn insert_joint(
        &mut self,
        body_a: BodyId,
        body_b: Option<BodyId>,
        build: impl FnOnce(&BodyState, &BodyState) -> Joint,
    ) -> Result<JointId> {
        if body_b == Some(body_a) {
            return Err(SimError::invalid_config(format!(
                "joint connects body {body_a} to itself"
            )));
        }
        let a = self.bodies.get(&body_a).ok_or(SimError::InvalidBodyId(body_a))?.state;
        let b = match body_b {
            Some(id) => self.bodies.get(&id).ok_or(SimError::InvalidBodyId(id))?.state,
            None => BodyState::default(),
        };
        let joint = build(&a, &b);
        let limit = self.settings.max_constraints_number;
        if self.joint_rows() + joint.row_count() > limit {
            return Err(SimError::capacity("constraints", limit));
        }

        let id = JointId::new(self.next_joint_id);
        self.next_joint_id += 1;
        self.joints.insert(id, joint);
        for body in std::iter::once(body_a).chain(body_b) {
            self.body_entry(body)?.joints.insert(id);
            self.wake_body(body)?;
        }
        self.emit(WorldEvent::JointAdded(id));
        Ok(id)
    }

    /// Keep two anchors at a fixed distance.
    ///
    /// # Errors
    ///
    /// Fails on unknown bodies, self-joints and an exhausted constraint
    /// budget.
    pub fn add_distance_joint(&mut self, def: &DistanceJointDef) -> Result<JointId> {
        self.insert_joint(def.body_a, def.body_b, |a, b| Joint::distance(def, a, b))
    }

    /// Pin two bodies at a shared pivot.
    ///
    /// # Errors
    ///
    /// Fails on unknown bodies, self-joints and an exhausted constraint
    /// budget.
    pub fn add_revolute_joint(&mut self, def: &RevoluteJointDef) -> Result<JointId> {
        self.insert_joint(def.body_a, def.body_b, |a, b| Joint::revolute(def, a, b))
    }

    /// Glue two bodies together.
    ///
    /// # Errors
    ///
    /// Fails on unknown bodies, self-joints and an exhausted constraint
    /// budget.
    pub fn add_weld_joint(&mut self, def: &WeldJointDef) -> Result<JointId> {
        self.insert_joint(def.body_a, def.body_b, |a, b| Joint::weld(def, a, b))
    }

    /// Let body B slide along an axis fixed in body A.
    ///
    /// # Errors
    ///
    /// Fails on unknown bodies, self-joints and an exhausted constraint
    /// budget.
    pub fn add_prismatic_joint(&mut self, def: &PrismaticJointDef) -> Result<JointId> {
        self.insert_joint(def.body_a, def.body_b, |a, b| Joint::prismatic(def, a, b))
    }

    /// Attach a wheel on a suspension axis.
    ///
    /// # Errors
    ///
    /// Fails on unknown bodies, self-joints and an exhausted constraint
    /// budget.
    pub fn add_wheel_joint(&mut self, def: &WheelJointDef) -> Result<JointId> {
        self.insert_joint(def.body_a, def.body_b, |a, b| Joint::wheel(def, a, b))
    }

    /// Connect two anchors by a damped spring.
    ///
    /// # Errors
    ///
    /// Fails on unknown bodies, self-joints and an exhausted constraint
    /// budget.
    pub fn add_spring_joint(&mut self, def: &SpringJointDef) -> Result<JointId> {
        self.insert_joint(def.body_a, def.body_b, |a, b| Joint::spring(def, a, b))
    }

    /// Drag a body point towards a target.
    ///
    /// # Errors
    ///
    /// Fails on an unknown body and an exhausted constraint budget.
    pub fn add_mouse_joint(&mut self, def: &MouseJointDef) -> Result<JointId> {
        self.insert_joint(def.body, None, |a, _| Joint::mouse(def, a))
    }

    /// Drive the relative angular velocity of two bodies.
    ///
    /// # Errors
    ///
    /// Fails on unknown bodies, self-joints and an exhausted constraint
    /// budget.
    pub fn add_motor(&mut self, def: &MotorDef) -> Result<JointId> {
        self.insert_joint(def.body_a, def.body_b, |_, _| Joint::motor(def))
    }

    /// Remove a joint.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidJointId`] for an unknown joint.
    pub fn remove_joint(&mut self, id: JointId) -> Result<()> {
        let joint = self.joints.remove(&id).ok_or(SimError::InvalidJointId(id))?;
        for body_id in std::iter::once(joint.body_a()).chain(joint.body_b()) {
            if let Some(body) = self.bodies.get_mut(&body_id) {
                body.joints.remove(&id);
                self.wake_body(body_id)?;
            }
        }
        self.emit(WorldEvent::JointRemoved(id));
        Ok(())
    }

    /// Look up a joint.
    #[must_use]
    pub fn joint(&self, id: JointId) -> Option<&Joint> {
        self.joints.get(&id)
    }

    /// Joints in id order.
    pub fn joints(&self) -> impl Iterator<Item = (JointId, &Joint)> {
        self.joints.iter().map(|(&id, joint)| (id, joint))
    }

    /// Move the target of a mouse joint.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidJointId`] for an unknown joint and
    /// [`SimError::InvalidConfig`] when the joint is not a mouse joint.
    pub fn set_mouse_target(&mut self, id: JointId, target: Point2<f64>) -> Result<()> {
        let joint = self.joints.get_mut(&id).ok_or(SimError::InvalidJointId(id))?;
        if !joint.set_mouse_target(target) {
            return Err(SimError::invalid_config(format!("joint {id} is not a mouse joint")));
        }
        let body = joint.body_a();
        self.wake_body(body)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use sim2d_collision::Shape;
    use sim2d_constraint::JointKind;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn world() -> World {
        World::new(Settings::default()).unwrap()
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let settings = Settings {
            solver_iterations: 0,
            ..Settings::default()
        };
        assert!(matches!(World::new(settings), Err(SimError::InvalidConfig { .. })));
    }

    #[test]
    fn test_body_capacity() {
        let mut world = World::new(Settings::default().with_capacity(2, 16)).unwrap();
        world.create_body(&BodyDef::default()).unwrap();
        world.create_body(&BodyDef::default()).unwrap();
        let err = world.create_body(&BodyDef::default()).unwrap_err();
        assert!(err.is_capacity_exceeded());
    }

    #[test]
    fn test_collider_gives_mass() {
        let mut world = world();
        let id = world.create_body(&BodyDef::default()).unwrap();
        world
            .add_collider(id, ColliderDef::new(Shape::rectangle(1.0, 0.5).unwrap()).with_density(3.0))
            .unwrap();
        assert!((world.body(id).unwrap().mass() - 6.0).abs() < 1e-12);
        assert!(world.add_collider(BodyId::new(42), ColliderDef::new(Shape::circle(1.0).unwrap())).is_err());
        let bad = ColliderDef::new(Shape::circle(1.0).unwrap()).with_density(0.0);
        assert!(matches!(world.add_collider(id, bad), Err(SimError::InvalidConfig { .. })));
    }

    #[test]
    fn test_pairs_follow_colliders() {
        let mut world = world();
        let a = world.create_body(&BodyDef::default()).unwrap();
        let b = world.create_body(&BodyDef::default()).unwrap();
        let circle = || ColliderDef::new(Shape::circle(1.0).unwrap());
        let ca = world.add_collider(a, circle()).unwrap();
        world.add_collider(a, circle()).unwrap();
        let cb = world.add_collider(b, circle()).unwrap();
        assert_eq!(world.pairs().len(), 2);
        assert!(world.pairs().get(cb, ca).is_some());

        world.remove_collider(ca).unwrap();
        assert_eq!(world.pairs().len(), 1);
        assert!(world.remove_collider(ca).is_err());

        world.destroy_body(b).unwrap();
        assert!(world.pairs().is_empty());
        assert!(world.collider(cb).is_none());
    }

    #[test]
    fn test_joint_validation() {
        let mut world = World::new(Settings::default().with_capacity(8, 3)).unwrap();
        let a = world.create_body(&BodyDef::default()).unwrap();
        let b = world.create_body(&BodyDef::default()).unwrap();

        let revolute = RevoluteJointDef {
            body_a: a,
            body_b: Some(a),
            anchor: Point2::origin(),
        };
        assert!(matches!(world.add_revolute_joint(&revolute), Err(SimError::InvalidConfig { .. })));

        let unknown = RevoluteJointDef {
            body_b: Some(BodyId::new(99)),
            ..revolute.clone()
        };
        assert_eq!(world.add_revolute_joint(&unknown), Err(SimError::InvalidBodyId(BodyId::new(99))));

        let ok = RevoluteJointDef {
            body_b: Some(b),
            ..revolute
        };
        let joint = world.add_revolute_joint(&ok).unwrap();
        assert_eq!(world.joint(joint).unwrap().kind(), JointKind::Revolute);
        assert_eq!(world.body(b).unwrap().joints(), vec![joint]);

        // Two more rows would exceed the budget of three.
        assert!(world.add_revolute_joint(&ok).unwrap_err().is_capacity_exceeded());

        world.remove_joint(joint).unwrap();
        assert!(world.body(a).unwrap().joints().is_empty());
        assert_eq!(world.remove_joint(joint), Err(SimError::InvalidJointId(joint)));
    }

    #[test]
    fn test_mouse_target() {
        let mut world = world();
        let a = world.create_body(&BodyDef::default()).unwrap();
        let mouse = world
            .add_mouse_joint(&MouseJointDef {
                body: a,
                anchor: Point2::origin(),
                target: Point2::new(1.0, 0.0),
                max_force: 100.0,
            })
            .unwrap();
        world.set_mouse_target(mouse, Point2::new(2.0, 0.0)).unwrap();

        let motor = world
            .add_motor(&MotorDef {
                body_a: a,
                body_b: None,
                speed: 1.0,
                max_torque: 1.0,
            })
            .unwrap();
        assert!(world.set_mouse_target(motor, Point2::origin()).is_err());
        assert!(world.set_mouse_target(JointId::new(77), Point2::origin()).is_err());
    }

    #[test]
    fn test_lifecycle_events() {
        let mut world = world();
        let log = Rc::new(RefCell::new(Vec::new()));
        for kind in [
            EventKind::BodyCreated,
            EventKind::BodyDestroyed,
            EventKind::ColliderAdded,
            EventKind::ColliderRemoved,
            EventKind::JointAdded,
            EventKind::JointRemoved,
        ] {
            let log = Rc::clone(&log);
            world.on(kind, move |event| log.borrow_mut().push(event.kind()));
        }

        let a = world.create_body(&BodyDef::default()).unwrap();
        world.add_collider(a, ColliderDef::new(Shape::circle(1.0).unwrap())).unwrap();
        world
            .add_motor(&MotorDef {
                body_a: a,
                body_b: None,
                speed: 0.0,
                max_torque: 1.0,
            })
            .unwrap();
        world.destroy_body(a).unwrap();

        assert_eq!(
            *log.borrow(),
            vec![
                EventKind::BodyCreated,
                EventKind::ColliderAdded,
                EventKind::JointAdded,
                EventKind::JointRemoved,
                EventKind::ColliderRemoved,
                EventKind::BodyDestroyed,
            ]
        );
        assert_eq!(world.body_count(), 0);
        assert!(world.destroy_body(a).is_err());
    }

    #[test]
    fn test_forces_wake_and_momentum() {
        let mut world = world();
        let a = world
            .create_body(&BodyDef::dynamic(Vector2::zeros()).with_mass(2.0, 1.0))
            .unwrap();
        world.set_velocity(a, Vector2::new(1.0, 0.0), 0.0).unwrap();
        assert_eq!(world.total_linear_momentum(), Vector2::new(2.0, 0.0));
        assert!((world.total_kinetic_energy() - 1.0).abs() < 1e-12);
        world.apply_force(a, Vector2::new(0.0, 1.0)).unwrap();
        assert_eq!(world.body(a).unwrap().state().force, Vector2::new(0.0, 1.0));
        assert!(world.apply_torque(BodyId::new(5), 1.0).is_err());
    }
}
