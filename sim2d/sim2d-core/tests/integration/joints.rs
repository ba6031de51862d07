//! Joints driven through the world API.

use crate::scene::DT;
use approx::assert_relative_eq;
use nalgebra::{Point2, Vector2};
use sim2d_core::{
    BodyDef, BodyId, MotorDef, MouseJointDef, PrismaticJointDef, RevoluteJointDef,
    SpringJointDef, Suspension, WeldJointDef, WheelJointDef, Settings, World,
};

fn anchored(settings: Settings) -> (World, BodyId, BodyId) {
    let mut world = World::new(settings.no_sleeping()).unwrap();
    let ground = world.create_body(&BodyDef::fixed(Vector2::zeros())).unwrap();
    let body = world
        .create_body(&BodyDef::dynamic(Vector2::new(1.0, 0.0)).with_mass(1.0, 0.1))
        .unwrap();
    (world, ground, body)
}

fn run(world: &mut World, steps: usize) {
    for _ in 0..steps {
        world.step(DT).unwrap();
    }
}

#[test]
fn test_weld_holds_against_gravity() {
    let (mut world, ground, body) = anchored(Settings::default());
    world
        .add_weld_joint(&WeldJointDef {
            body_a: ground,
            body_b: Some(body),
            anchor: Point2::new(0.5, 0.0),
        })
        .unwrap();
    run(&mut world, 60);
    let state = world.body(body).unwrap();
    assert_relative_eq!(state.position(), Vector2::new(1.0, 0.0), epsilon = 0.02);
    assert!(state.angle().abs() < 0.02);
}

#[test]
fn test_revolute_pendulum_keeps_pivot() {
    let (mut world, ground, body) = anchored(Settings::default());
    let joint = world
        .add_revolute_joint(&RevoluteJointDef {
            body_a: ground,
            body_b: Some(body),
            anchor: Point2::origin(),
        })
        .unwrap();
    run(&mut world, 40);
    let state = *world.body(body).unwrap().state();
    assert!(state.position.y < -0.1);
    let ground_state = *world.body(ground).unwrap().state();
    assert!(world.joint(joint).unwrap().max_error(&ground_state, &state) < 0.02);
}

#[test]
fn test_prismatic_limit_stops_slide() {
    let settings = Settings::default().with_gravity(Vector2::new(-9.81, -2.0));
    let (mut world, ground, body) = anchored(settings);
    world
        .add_prismatic_joint(&PrismaticJointDef {
            body_a: ground,
            body_b: Some(body),
            anchor: Point2::new(1.0, 0.0),
            axis: Vector2::x(),
            lower: Some(-0.5),
            upper: Some(0.5),
        })
        .unwrap();
    run(&mut world, 120);
    let state = world.body(body).unwrap();
    assert!(state.position().x > 0.5 - 0.02, "x = {}", state.position().x);
    assert!(state.position().x < 0.6);
    assert!(state.position().y.abs() < 0.02);
    assert!(state.velocity().norm() < 0.1);
}

#[test]
fn test_wheel_suspension_settles_below_anchor() {
    let (mut world, ground, body) = anchored(Settings::default());
    world
        .add_wheel_joint(&WheelJointDef {
            body_a: ground,
            body_b: Some(body),
            anchor: Point2::new(1.0, 0.0),
            axis: Vector2::y(),
            suspension: Some(Suspension {
                stiffness: 100.0,
                damping: 20.0,
            }),
        })
        .unwrap();
    run(&mut world, 300);
    let state = world.body(body).unwrap();
    // Static deflection m·g / k.
    assert_relative_eq!(state.position().y, -9.81 / 100.0, epsilon = 0.01);
    assert_relative_eq!(state.position().x, 1.0, epsilon = 0.01);
}

#[test]
fn test_spring_returns_to_rest_length() {
    let (mut world, ground, body) = anchored(Settings::default().zero_gravity());
    world
        .add_spring_joint(&SpringJointDef {
            body_a: ground,
            body_b: Some(body),
            anchor_a: Point2::origin(),
            anchor_b: Point2::new(1.0, 0.0),
            rest_length: None,
            stiffness: 50.0,
            damping: 5.0,
        })
        .unwrap();
    world.set_velocity(body, Vector2::new(2.0, 0.0), 0.0).unwrap();
    run(&mut world, 10);
    assert!(world.body(body).unwrap().position().x > 1.1);
    run(&mut world, 400);
    assert_relative_eq!(world.body(body).unwrap().position().x, 1.0, epsilon = 0.01);
}

#[test]
fn test_motor_reaches_speed() {
    let (mut world, ground, body) = anchored(Settings::default().zero_gravity());
    world
        .add_motor(&MotorDef {
            body_a: ground,
            body_b: Some(body),
            speed: 2.0,
            max_torque: 100.0,
        })
        .unwrap();
    run(&mut world, 10);
    assert_relative_eq!(world.body(body).unwrap().angular_velocity(), 2.0, epsilon = 1e-6);
}

#[test]
fn test_mouse_drags_body_to_target() {
    let (mut world, _, body) = anchored(Settings::default().zero_gravity());
    let mouse = world
        .add_mouse_joint(&MouseJointDef {
            body,
            anchor: Point2::new(1.0, 0.0),
            target: Point2::new(2.0, 1.0),
            max_force: 1e5,
        })
        .unwrap();
    run(&mut world, 10);
    assert_relative_eq!(world.body(body).unwrap().position(), Vector2::new(2.0, 1.0), epsilon = 1e-3);

    world.set_mouse_target(mouse, Point2::new(2.0, 3.0)).unwrap();
    run(&mut world, 10);
    assert_relative_eq!(world.body(body).unwrap().position(), Vector2::new(2.0, 3.0), epsilon = 1e-3);
}
