//! Contact generation, persistence and resting contact.

use crate::scene::{DT, ball, crate_box, ground};
use approx::assert_relative_eq;
use nalgebra::Vector2;
use sim2d_core::{
    BodyDef, ColliderDef, ContactId, EventKind, Material, Settings, World, WorldEvent,
};
use sim2d_collision::Shape;
use sim2d_types::NarrowPhaseKind;
use std::cell::RefCell;
use std::rc::Rc;

fn record(world: &mut World, kinds: &[EventKind]) -> Rc<RefCell<Vec<WorldEvent>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    for &kind in kinds {
        let log = Rc::clone(&log);
        world.on(kind, move |event| log.borrow_mut().push(event.clone()));
    }
    log
}

// ============================================================================
// Two circles
// ============================================================================

#[test]
fn test_two_circles_overlap() {
    let mut world = World::new(Settings::default().zero_gravity().no_sleeping()).unwrap();
    let (a, ca) = ball(&mut world, Vector2::zeros(), 1.0, Material::frictionless());
    let (b, cb) = ball(&mut world, Vector2::new(1.5, 0.0), 1.0, Material::frictionless());
    world.set_velocity(b, Vector2::new(-1.0, 0.0), 0.0).unwrap();
    let log = record(&mut world, &[EventKind::CollisionStart]);

    world.step(DT).unwrap();

    let events = log.borrow();
    assert_eq!(events.len(), 1);
    let WorldEvent::CollisionStart {
        collider_a,
        collider_b,
        contacts,
    } = &events[0]
    else {
        panic!("unexpected event {:?}", events[0]);
    };
    assert_eq!((*collider_a, *collider_b), (ca, cb));
    assert_eq!(contacts.len(), 1);
    assert_relative_eq!(contacts[0].depth, 0.5, epsilon = 1e-6);
    assert_relative_eq!(contacts[0].normal, Vector2::new(1.0, 0.0), epsilon = 1e-6);

    let relative = world.body(b).unwrap().velocity() - world.body(a).unwrap().velocity();
    assert!(relative.dot(&contacts[0].normal) >= -1e-9);
    assert_relative_eq!(
        world.total_linear_momentum(),
        Vector2::new(-1.0 * world.body(b).unwrap().mass(), 0.0),
        epsilon = 1e-9
    );
}

#[test]
fn test_overlap_reported_only_below_contact_distance() {
    let mut world = World::new(Settings::default().zero_gravity().no_sleeping()).unwrap();
    let (a, _) = ball(&mut world, Vector2::zeros(), 1.0, Material::frictionless());
    let (b, _) = ball(&mut world, Vector2::new(2.13, 0.0), 1.0, Material::frictionless());
    world.set_velocity(b, Vector2::new(-1.2, 0.0), 0.0).unwrap();
    let log = record(&mut world, &[EventKind::CollisionStart]);

    let mut distance_at_start = None;
    for _ in 0..30 {
        let distance = (world.body(b).unwrap().position() - world.body(a).unwrap().position()).norm();
        world.step(DT).unwrap();
        if distance_at_start.is_none() && !log.borrow().is_empty() {
            distance_at_start = Some(distance);
        }
    }
    let distance = distance_at_start.unwrap();
    assert!(distance < 2.0);
    assert!(distance > 2.0 - 1.2 * DT - 1e-9);
}

// ============================================================================
// Contact identity
// ============================================================================

fn contact_ids(world: &World) -> Vec<ContactId> {
    world.contacts().map(|(_, point)| point.id).collect()
}

#[test]
fn test_contact_identity_follows_proximity_threshold() {
    let mut world = World::new(Settings::default().no_sleeping()).unwrap();
    ground(&mut world, Material::frictionless());
    let (sphere, _) = ball(&mut world, Vector2::new(0.0, 0.49), 0.5, Material::frictionless());
    world.step(DT).unwrap();
    world.step(DT).unwrap();
    let resting = contact_ids(&world);
    assert_eq!(resting.len(), 1);

    // Sliding less than the threshold per step keeps the contact.
    world.set_velocity(sphere, Vector2::new(0.5, 0.0), 0.0).unwrap();
    for _ in 0..10 {
        world.step(DT).unwrap();
        assert_eq!(contact_ids(&world), resting);
    }

    // Jumping past it replaces the contact.
    world.set_velocity(sphere, Vector2::new(6.0, 0.0), 0.0).unwrap();
    world.step(DT).unwrap();
    world.step(DT).unwrap();
    let moved = contact_ids(&world);
    assert_eq!(moved.len(), 1);
    assert_ne!(moved, resting);
}

#[test]
fn test_sensor_reports_without_pushing() {
    let mut world = World::new(Settings::default().zero_gravity().no_sleeping()).unwrap();
    let zone = world.create_body(&BodyDef::fixed(Vector2::zeros())).unwrap();
    world
        .add_collider(zone, ColliderDef::new(Shape::rectangle(1.0, 1.0).unwrap()).sensor())
        .unwrap();
    let (runner, _) = ball(&mut world, Vector2::new(-1.6, 0.0), 0.5, Material::default());
    world.set_velocity(runner, Vector2::new(3.0, 0.0), 0.0).unwrap();
    let log = record(
        &mut world,
        &[EventKind::CollisionStart, EventKind::CollisionEnd],
    );

    for _ in 0..90 {
        world.step(DT).unwrap();
    }
    let kinds: Vec<EventKind> = log.borrow().iter().map(WorldEvent::kind).collect();
    assert_eq!(kinds, vec![EventKind::CollisionStart, EventKind::CollisionEnd]);
    assert_relative_eq!(world.body(runner).unwrap().velocity().x, 3.0, epsilon = 1e-12);
}

#[test]
fn test_collision_filter_skips_pairs() {
    let mut world = World::new(Settings::default().zero_gravity().no_sleeping()).unwrap();
    let a = world.create_body(&BodyDef::dynamic(Vector2::zeros())).unwrap();
    world
        .add_collider(a, ColliderDef::new(Shape::circle(1.0).unwrap()).with_filter(0b01, 0b01))
        .unwrap();
    let b = world.create_body(&BodyDef::dynamic(Vector2::new(1.0, 0.0))).unwrap();
    world
        .add_collider(b, ColliderDef::new(Shape::circle(1.0).unwrap()).with_filter(0b10, 0b10))
        .unwrap();
    world.step(DT).unwrap();
    assert_eq!(world.contacts().count(), 0);
    assert_eq!(world.body(b).unwrap().velocity(), Vector2::zeros());
}

// ============================================================================
// Resting box
// ============================================================================

#[test]
fn test_resting_box_settles_and_sleeps() {
    resting_box_settles_and_sleeps(NarrowPhaseKind::Sat);
}

#[test]
fn test_resting_box_settles_and_sleeps_gjk_epa() {
    resting_box_settles_and_sleeps(NarrowPhaseKind::GjkEpa);
}

fn resting_box_settles_and_sleeps(narrow_phase: NarrowPhaseKind) {
    let mut world = World::new(Settings::default().with_narrow_phase(narrow_phase)).unwrap();
    ground(&mut world, Material::default());
    let (body, _) = crate_box(&mut world, Vector2::new(0.0, 0.5), 0.5);
    let log = record(&mut world, &[EventKind::FallAsleep, EventKind::Awake]);

    for _ in 0..30 {
        world.step(DT).unwrap();
    }
    let state = world.body(body).unwrap();
    assert!(state.velocity().norm() < 0.05);
    assert!(state.position().y > 0.5 - 0.02);
    assert!(state.position().y < 0.5 + 1e-3);
    assert_eq!(state.contacts().len(), 2);
    for (pair, point) in world.contacts() {
        let a = world.body(pair.body_a()).unwrap().state();
        let b = world.body(pair.body_b()).unwrap().state();
        assert!(point.constraint.separation(a, b) > -0.02);
        assert!(point.constraint.normal_force() >= 0.0);
    }

    for _ in 0..90 {
        world.step(DT).unwrap();
    }
    let state = world.body(body).unwrap();
    assert!(state.is_sleeping());
    assert_eq!(state.velocity(), Vector2::zeros());
    assert_eq!(*log.borrow(), vec![WorldEvent::FallAsleep(body)]);
    assert!(world.last_step_stats().sleeping_islands >= 1);

    // Asleep bodies hold still.
    let parked = state.position();
    world.step(DT).unwrap();
    assert_eq!(world.body(body).unwrap().position(), parked);

    world.apply_force(body, Vector2::new(0.0, 50.0)).unwrap();
    assert!(!world.body(body).unwrap().is_sleeping());
    assert_eq!(log.borrow().last(), Some(&WorldEvent::Awake(body)));
}

/// A capsule lying on its side: capsule/box has no analytic path and goes
/// through GJK+EPA under both backends.
fn lying_capsule_settles(narrow_phase: NarrowPhaseKind) {
    let mut world = World::new(Settings::default().with_narrow_phase(narrow_phase)).unwrap();
    ground(&mut world, Material::default());
    let body = world.create_body(&BodyDef::dynamic(Vector2::new(0.0, 0.26))).unwrap();
    world
        .add_collider(body, ColliderDef::new(Shape::capsule(1.0, 0.25).unwrap()))
        .unwrap();

    for _ in 0..30 {
        world.step(DT).unwrap();
    }
    let state = world.body(body).unwrap();
    assert_eq!(state.contacts().len(), 2);
    assert!(state.velocity().norm() < 0.05, "v = {}", state.velocity());
    assert!(state.angular_velocity().abs() < 0.05);
    assert!(state.position().y > 0.25 - 0.02, "y = {}", state.position().y);

    for _ in 0..210 {
        world.step(DT).unwrap();
    }
    let state = world.body(body).unwrap();
    assert!(state.is_sleeping());
    assert!(state.position().x.abs() < 1e-3);
    assert!(state.angle().abs() < 1e-3);
}

#[test]
fn test_lying_capsule_settles() {
    lying_capsule_settles(NarrowPhaseKind::Sat);
}

#[test]
fn test_lying_capsule_settles_gjk_epa() {
    lying_capsule_settles(NarrowPhaseKind::GjkEpa);
}

#[test]
fn test_sleeping_body_woken_by_impact() {
    let mut world = World::new(Settings::default()).unwrap();
    ground(&mut world, Material::default());
    let (resting, _) = crate_box(&mut world, Vector2::new(0.0, 0.5), 0.5);
    for _ in 0..120 {
        world.step(DT).unwrap();
    }
    assert!(world.body(resting).unwrap().is_sleeping());
    let log = record(&mut world, &[EventKind::Awake]);

    let (falling, _) = ball(&mut world, Vector2::new(0.0, 3.0), 0.25, Material::default());
    for _ in 0..60 {
        world.step(DT).unwrap();
    }
    let landed = world.body(falling).unwrap();
    assert!(landed.position().y > 1.0 + 0.25 - 0.05);
    assert!(log.borrow().contains(&WorldEvent::Awake(resting)));
}
