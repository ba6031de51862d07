//! Scene builders shared by the integration tests.

use nalgebra::Vector2;
use sim2d_collision::Shape;
use sim2d_core::{BodyDef, BodyId, ColliderDef, ColliderId, Material, Settings, World};

pub const DT: f64 = 1.0 / 60.0;

/// A static ground box whose top face is `y = 0`.
pub fn ground(world: &mut World, material: Material) -> (BodyId, ColliderId) {
    let body = world.create_body(&BodyDef::fixed(Vector2::new(0.0, -0.5))).unwrap();
    let collider = world
        .add_collider(
            body,
            ColliderDef::new(Shape::rectangle(20.0, 0.5).unwrap()).with_material(material),
        )
        .unwrap();
    (body, collider)
}

/// A dynamic circle.
pub fn ball(world: &mut World, position: Vector2<f64>, radius: f64, material: Material) -> (BodyId, ColliderId) {
    let body = world.create_body(&BodyDef::dynamic(position)).unwrap();
    let collider = world
        .add_collider(
            body,
            ColliderDef::new(Shape::circle(radius).unwrap()).with_material(material),
        )
        .unwrap();
    (body, collider)
}

/// A dynamic box.
pub fn crate_box(world: &mut World, position: Vector2<f64>, half: f64) -> (BodyId, ColliderId) {
    let body = world.create_body(&BodyDef::dynamic(position)).unwrap();
    let collider = world
        .add_collider(body, ColliderDef::new(Shape::rectangle(half, half).unwrap()))
        .unwrap();
    (body, collider)
}

/// Ground plus a few columns of boxes and balls.
pub fn pile(settings: Settings) -> World {
    let mut world = World::new(settings).unwrap();
    ground(&mut world, Material::default());
    for column in 0..4 {
        let x = f64::from(column) * 1.5 - 2.25;
        for level in 0..3 {
            let y = 0.55 + f64::from(level) * 1.1;
            if (column + level) % 2 == 0 {
                crate_box(&mut world, Vector2::new(x, y), 0.5);
            } else {
                ball(&mut world, Vector2::new(x + 0.05, y), 0.5, Material::default());
            }
        }
    }
    world
}
