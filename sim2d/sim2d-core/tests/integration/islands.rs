//! Island partitioning through the world.

use crate::scene::DT;
use nalgebra::{Point2, Vector2};
use sim2d_collision::Shape;
use sim2d_core::{BodyDef, BodyId, ColliderDef, DistanceJointDef, Settings, World};
use sim2d_types::IslandGeneratorKind;

/// Two jointed pairs `a-b` and `c-d`; `c` starts at `c_x`.
fn clusters(settings: Settings, c_x: f64) -> (World, [BodyId; 4]) {
    let mut world = World::new(settings.zero_gravity().no_sleeping()).unwrap();
    let mut ids = [BodyId::new(0); 4];
    for (slot, x) in ids.iter_mut().zip([0.0, 2.0, c_x, c_x + 2.0]) {
        *slot = world.create_body(&BodyDef::dynamic(Vector2::new(x, 0.0))).unwrap();
        world
            .add_collider(*slot, ColliderDef::new(Shape::circle(0.5).unwrap()))
            .unwrap();
    }
    for (a, b, x) in [(ids[0], ids[1], 0.0), (ids[2], ids[3], c_x)] {
        world
            .add_distance_joint(&DistanceJointDef {
                body_a: a,
                body_b: Some(b),
                anchor_a: Point2::new(x, 0.0),
                anchor_b: Point2::new(x + 2.0, 0.0),
                length: None,
            })
            .unwrap();
    }
    (world, ids)
}

fn island(world: &World, id: BodyId) -> usize {
    world.body(id).unwrap().island().unwrap()
}

#[test]
fn test_disjoint_clusters_get_separate_islands() {
    let (mut world, [a, b, c, d]) = clusters(Settings::default(), 10.0);
    world.step(DT).unwrap();
    assert_eq!(island(&world, a), island(&world, b));
    assert_eq!(island(&world, c), island(&world, d));
    assert_ne!(island(&world, a), island(&world, c));
    assert_eq!(world.last_step_stats().islands, 2);
    assert_eq!(world.body(b).unwrap().dof_index(), Some(3));
}

#[test]
fn test_cross_contact_merges_clusters() {
    // c overlaps b.
    let (mut world, [a, b, c, d]) = clusters(Settings::default(), 2.8);
    world.step(DT).unwrap();
    assert!(!world.body(b).unwrap().contacts().is_empty());
    assert_eq!(island(&world, a), island(&world, d));
    assert_eq!(island(&world, b), island(&world, c));
    assert_eq!(world.last_step_stats().islands, 1);
}

#[test]
fn test_sole_generator_uses_one_island() {
    let settings = Settings::default().with_island_generator(IslandGeneratorKind::Sole);
    let (mut world, ids) = clusters(settings, 10.0);
    world.step(DT).unwrap();
    for id in ids {
        assert_eq!(island(&world, id), 0);
    }
    assert_eq!(world.last_step_stats().islands, 1);
}

#[test]
fn test_unconstrained_bodies_share_the_free_island() {
    let mut world = World::new(Settings::default().zero_gravity()).unwrap();
    let ids: Vec<BodyId> = (0..3)
        .map(|i| {
            world
                .create_body(&BodyDef::dynamic(Vector2::new(f64::from(i) * 5.0, 0.0)))
                .unwrap()
        })
        .collect();
    world.step(DT).unwrap();
    assert_eq!(world.last_step_stats().islands, 1);
    assert_eq!(world.last_step_stats().solver.rows, 0);
    let first = island(&world, ids[0]);
    assert!(ids.iter().all(|&id| island(&world, id) == first));
}
