//! Unconstrained bodies follow `x(t + dt) = x(t) + v·dt` exactly.

use crate::scene::DT;
use approx::assert_relative_eq;
use nalgebra::Vector2;
use sim2d_core::{BodyDef, Settings, World};

#[test]
fn test_free_body_moves_linearly() {
    let mut world = World::new(Settings::default().zero_gravity().no_sleeping()).unwrap();
    let velocity = Vector2::new(1.5, -2.0);
    let id = world
        .create_body(&BodyDef::dynamic(Vector2::new(0.25, 4.0)).with_velocity(velocity, 0.3))
        .unwrap();

    for step in 1..=30 {
        let before = world.body(id).unwrap().position();
        let angle = world.body(id).unwrap().angle();
        world.step(DT).unwrap();
        let body = world.body(id).unwrap();
        assert_relative_eq!(body.position(), before + velocity * DT, epsilon = 1e-12);
        assert_relative_eq!(body.angle(), angle + 0.3 * DT, epsilon = 1e-12);
        assert_eq!(body.velocity(), velocity);
        assert_eq!(world.step_count(), step);
    }
    assert_eq!(world.last_step_stats().substeps, 1);
    assert_eq!(world.last_step_stats().solver.rows, 0);
}

#[test]
fn test_gravity_scales_with_step() {
    let mut world = World::new(Settings::default().no_sleeping()).unwrap();
    let id = world
        .create_body(&BodyDef::dynamic(Vector2::zeros()).with_mass(3.0, 1.0))
        .unwrap();
    for _ in 0..10 {
        world.step(DT).unwrap();
    }
    assert_relative_eq!(world.body(id).unwrap().velocity().y, -9.81 * 10.0 * DT, epsilon = 1e-10);
}

#[test]
fn test_damping_slows_free_bodies() {
    use sim2d_collision::Shape;
    use sim2d_core::{ColliderDef, Material};

    let mut world = World::new(Settings::default().zero_gravity().no_sleeping()).unwrap();
    let id = world
        .create_body(&BodyDef::dynamic(Vector2::zeros()).with_velocity(Vector2::new(1.0, 0.0), 1.0))
        .unwrap();
    world
        .add_collider(
            id,
            ColliderDef::new(Shape::circle(0.5).unwrap())
                .with_material(Material::default().with_damping(0.5, 2.0)),
        )
        .unwrap();
    world.step(0.1).unwrap();
    let body = world.body(id).unwrap();
    assert_relative_eq!(body.velocity().x, 1.0 / 1.05, epsilon = 1e-12);
    assert_relative_eq!(body.angular_velocity(), 1.0 / 1.2, epsilon = 1e-12);
}
