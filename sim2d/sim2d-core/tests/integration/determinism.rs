//! Identical call sequences give bit-identical worlds.

use crate::scene::{DT, pile};
use sim2d_core::{BodyId, Settings, World};
use sim2d_types::{BroadPhaseKind, IslandGeneratorKind, NarrowPhaseKind};

fn snapshot(world: &World) -> Vec<(BodyId, [u64; 5])> {
    world
        .bodies()
        .map(|b| {
            (
                b.id(),
                [
                    b.position().x.to_bits(),
                    b.position().y.to_bits(),
                    b.angle().to_bits(),
                    b.velocity().x.to_bits(),
                    b.velocity().y.to_bits(),
                ],
            )
        })
        .collect()
}

fn run(settings: &Settings, steps: usize) -> (Vec<(BodyId, [u64; 5])>, Vec<u64>) {
    let mut world = pile(settings.clone());
    for _ in 0..steps {
        world.step(DT).unwrap();
    }
    let contacts = world.contacts().map(|(_, point)| point.id.raw()).collect();
    (snapshot(&world), contacts)
}

#[test]
fn test_repeated_runs_are_identical() {
    let settings = Settings::default();
    let first = run(&settings, 90);
    let second = run(&settings, 90);
    assert_eq!(first, second);
    assert!(!first.1.is_empty());
}

#[test]
fn test_every_strategy_combination_is_deterministic() {
    for broad in [BroadPhaseKind::Naive, BroadPhaseKind::Sweep] {
        for narrow in [NarrowPhaseKind::Sat, NarrowPhaseKind::GjkEpa] {
            for islands in [IslandGeneratorKind::Local, IslandGeneratorKind::Sole] {
                let settings = Settings::default()
                    .with_broad_phase(broad)
                    .with_narrow_phase(narrow)
                    .with_island_generator(islands);
                assert_eq!(run(&settings, 20), run(&settings, 20));
            }
        }
    }
}

#[test]
fn test_broad_phases_agree() {
    let naive = Settings::default().with_broad_phase(BroadPhaseKind::Naive);
    let sweep = Settings::default().with_broad_phase(BroadPhaseKind::Sweep);
    assert_eq!(run(&naive, 30), run(&sweep, 30));
}
