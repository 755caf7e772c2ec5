//! Integration tests for queries
//!
//! Tests callback iteration, lazy views, pending-destroy filtering, and the
//! iteration guard.

use tickwork_world::{Component, ErrorKind, World};

#[derive(Debug, Clone, Default, PartialEq)]
struct Position(f32);
impl Component for Position {}

#[derive(Debug, Clone, Default, PartialEq)]
struct Velocity(f32);
impl Component for Velocity {}

/// Entities 1..=6: even ones get a velocity, every one gets a position.
fn populated() -> World {
    let mut world: World = World::new();
    for i in 1..=6_u8 {
        let entity = world.create();
        world.assign(entity, Position(f32::from(i))).unwrap();
        if i % 2 == 0 {
            world.assign(entity, Velocity(1.0)).unwrap();
        }
    }
    world
}

fn raw_ids(entities: impl IntoIterator<Item = tickwork_world::Entity>) -> Vec<u64> {
    entities.into_iter().map(|entity| entity.id().raw()).collect()
}

// =============================================================================
// Callback Iteration
// =============================================================================

#[test]
fn each_visits_exact_matches_in_order() {
    let mut world = populated();
    let mut visited = Vec::new();
    world.each::<(Position, Velocity)>(|_, entity, _| visited.push(entity));
    assert_eq!(raw_ids(visited), vec![2, 4, 6]);
}

#[test]
fn each_skips_pending_destroy_by_default() {
    let mut world = populated();
    let second = world.get_by_index(1).unwrap();
    world.destroy(second);

    let mut visited = Vec::new();
    world.each::<Velocity>(|_, entity, _| visited.push(entity));
    assert_eq!(raw_ids(visited), vec![4, 6]);

    let mut visited = Vec::new();
    world.each_with_pending::<Velocity>(|_, entity, _| visited.push(entity));
    assert_eq!(raw_ids(visited), vec![2, 4, 6]);
}

#[test]
fn each_applies_updates_through_handles() {
    let mut world = populated();
    world.each::<(Position, Velocity)>(|_, _, (position, velocity)| {
        let dv = velocity.read(|v| v.0).unwrap();
        position.write(|p| p.0 += dv);
    });

    let positions: Vec<_> = world
        .view::<Position>()
        .iter()
        .map(|entity| world.get::<Position>(entity).read(|p| p.0).unwrap())
        .collect();
    assert_eq!(positions, vec![1.0, 3.0, 3.0, 5.0, 5.0, 7.0]);
}

#[test]
fn all_visits_every_live_entity() {
    let mut world = populated();
    let first = world.get_by_index(0).unwrap();
    world.destroy(first);

    let mut count = 0;
    world.all(|_, _| count += 1);
    assert_eq!(count, 5);

    let mut count = 0;
    world.all_with_pending(|_, _| count += 1);
    assert_eq!(count, 6);
}

#[test]
fn callbacks_can_remove_components_of_later_entities() {
    let mut world = populated();
    let mut visited = Vec::new();
    world.each::<Velocity>(|world, entity, _| {
        visited.push(entity);
        if let Some(next) = world.get_by_id(tickwork_world::EntityId::new(entity.id().raw() + 2)) {
            world.remove::<Velocity>(next);
        }
    });
    assert_eq!(raw_ids(visited), vec![2, 6]);
}

#[test]
fn entities_created_during_each_are_visited() {
    let mut world = populated();
    let mut visited = 0;
    world.each::<Velocity>(|world, entity, _| {
        visited += 1;
        if entity.id().raw() == 6 {
            let spawned = world.create();
            world.assign(spawned, Velocity(0.0)).unwrap();
        }
    });
    assert_eq!(visited, 4);
    assert_eq!(world.count(), 7);
}

#[test]
fn destructive_operations_are_rejected_while_iterating() {
    let mut world = populated();
    let mut kinds = Vec::new();
    world.each::<Velocity>(|world, entity, _| {
        if let Err(err) = world.destroy_immediate(entity) {
            kinds.push(err.kind);
        }
    });
    assert_eq!(kinds.len(), 3);
    assert!(
        kinds
            .iter()
            .all(|kind| matches!(kind, ErrorKind::IterationInProgress { .. }))
    );
    assert_eq!(world.count(), 6);
}

// =============================================================================
// Lazy Views
// =============================================================================

#[test]
fn view_matches_each() {
    let mut world = populated();
    let from_view = raw_ids(world.view::<(Velocity, Position)>());

    let mut from_each = Vec::new();
    world.each::<(Velocity, Position)>(|_, entity, _| from_each.push(entity));
    assert_eq!(from_view, raw_ids(from_each));
}

#[test]
fn view_reflects_current_state_on_restart() {
    let mut world = populated();
    assert_eq!(world.view::<Velocity>().iter().count(), 3);

    let first = world.get_by_index(0).unwrap();
    world.assign(first, Velocity(2.0)).unwrap();
    assert_eq!(world.view::<Velocity>().iter().count(), 4);
}

#[test]
fn view_can_include_pending_destroy() {
    let mut world = populated();
    let last = world.get_by_index(5).unwrap();
    world.destroy(last);

    assert_eq!(raw_ids(world.view::<Velocity>()), vec![2, 4]);
    assert_eq!(
        raw_ids(world.view::<Velocity>().include_pending_destroy()),
        vec![2, 4, 6]
    );
}

#[test]
fn entities_view_counts_live_entities() {
    let world = populated();
    assert_eq!(world.entities().iter().count(), world.count());
}

#[test]
fn view_iterator_exposes_position() {
    let world = populated();
    let view = world.view::<Velocity>();
    let mut iter = view.iter();
    let start = iter.clone();

    assert_eq!(iter.next().map(|entity| entity.id().raw()), Some(2));
    assert_eq!(iter.index(), 2);
    assert!(iter != start);

    let mut restarted = view.iter();
    restarted.next();
    assert!(iter == restarted);
}

// =============================================================================
// Properties
// =============================================================================

mod properties {
    use proptest::prelude::*;
    use tickwork_world::{Entity, World};

    use super::{Position, Velocity};

    proptest! {
        #[test]
        fn each_agrees_with_view_after_destruction(
            layout in prop::collection::vec((any::<bool>(), any::<bool>()), 0..40),
        ) {
            let mut world: World = World::new();
            let mut expected = Vec::new();
            for &(moving, doomed) in &layout {
                let entity = world.create();
                world.assign(entity, Position(0.0)).unwrap();
                if moving {
                    world.assign(entity, Velocity(1.0)).unwrap();
                }
                if doomed {
                    world.destroy(entity);
                } else if moving {
                    expected.push(entity);
                }
            }

            let mut visited: Vec<Entity> = Vec::new();
            world.each::<(Position, Velocity)>(|_, entity, _| visited.push(entity));
            let viewed: Vec<Entity> = world.view::<(Position, Velocity)>().iter().collect();

            prop_assert_eq!(&visited, &expected);
            prop_assert_eq!(&viewed, &expected);
            prop_assert_eq!(world.count(), layout.len());

            world.cleanup().unwrap();
            let survivors = layout.iter().filter(|(_, doomed)| !doomed).count();
            prop_assert_eq!(world.count(), survivors);
        }
    }
}
