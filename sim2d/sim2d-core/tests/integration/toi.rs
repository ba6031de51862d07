//! Continuous bodies stop at thin walls instead of tunnelling.

use crate::scene::DT;
use nalgebra::Vector2;
use sim2d_collision::Shape;
use sim2d_core::{BodyDef, BodyId, ColliderDef, Settings, World};

fn shooting_range(continuous: bool) -> (World, BodyId) {
    let mut world = World::new(Settings::default().zero_gravity().no_sleeping()).unwrap();
    let wall = world.create_body(&BodyDef::fixed(Vector2::new(5.0, 0.0))).unwrap();
    world
        .add_collider(wall, ColliderDef::new(Shape::rectangle(0.05, 2.0).unwrap()))
        .unwrap();

    let mut def = BodyDef::dynamic(Vector2::zeros()).with_velocity(Vector2::new(600.0, 0.0), 0.0);
    if continuous {
        def = def.continuous();
    }
    let bullet = world.create_body(&def).unwrap();
    world
        .add_collider(bullet, ColliderDef::new(Shape::circle(0.1).unwrap()))
        .unwrap();
    (world, bullet)
}

#[test]
fn test_discrete_bullet_tunnels() {
    let (mut world, bullet) = shooting_range(false);
    world.step(DT).unwrap();
    assert!(world.body(bullet).unwrap().position().x > 9.0);
    assert_eq!(world.last_step_stats().substeps, 1);
}

#[test]
fn test_continuous_bullet_stops_at_wall() {
    let (mut world, bullet) = shooting_range(true);
    world.step(DT).unwrap();
    let body = world.body(bullet).unwrap();
    assert!(body.position().x < 5.0, "bullet at {}", body.position().x);
    assert!(body.position().x > 4.5);
    assert!(body.velocity().x.abs() < 1.0);
    assert!(world.last_step_stats().substeps > 1);
    assert!(world.last_step_stats().substeps <= world.settings().toi_substeps);
}

#[test]
fn test_receding_bullet_takes_one_substep() {
    let (mut world, bullet) = shooting_range(true);
    world.set_velocity(bullet, Vector2::new(-600.0, 0.0), 0.0).unwrap();
    world.step(DT).unwrap();
    assert_eq!(world.last_step_stats().substeps, 1);
    assert!(world.body(bullet).unwrap().position().x < -9.0);
}
