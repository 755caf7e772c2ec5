//! Integration tests for the entity lifecycle
//!
//! Tests creation, soft and immediate destruction, cleanup, reset, and lookup.

use tickwork_world::{Component, Entity, EntityId, ErrorKind, World, WorldConfig};

#[derive(Debug, Clone, PartialEq)]
struct Marker(u32);
impl Component for Marker {}

// =============================================================================
// Creation
// =============================================================================

#[test]
fn created_ids_are_unique_and_increasing() {
    let mut world: World = World::new();
    let ids: Vec<_> = (0..20).map(|_| world.create().id()).collect();
    assert!(ids.iter().all(|id| id.is_valid()));
    assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
}

#[test]
fn ids_are_not_reused_after_destruction() {
    let mut world: World = World::new();
    let a = world.create();
    world.destroy_immediate(a).unwrap();
    let b = world.create();
    assert!(b.id() > a.id());
}

#[test]
fn entity_capacity_is_a_hint_only() {
    let mut world: World = World::with_config(WorldConfig::default().with_entity_capacity(2));
    for _ in 0..10 {
        world.create();
    }
    assert_eq!(world.count(), 10);
}

// =============================================================================
// Destruction
// =============================================================================

#[test]
fn pending_entities_keep_their_components() {
    let mut world: World = World::new();
    let entity = world.create();
    world.assign(entity, Marker(3)).unwrap();
    world.destroy(entity);

    assert!(world.is_pending_destroy(entity));
    assert!(entity.is_pending_destroy(&world));
    assert_eq!(world.get::<Marker>(entity).cloned(), Some(Marker(3)));
}

#[test]
fn cleanup_reports_whether_work_was_done() {
    let mut world: World = World::new();
    let a = world.create();
    let b = world.create();
    world.destroy(a);

    assert!(world.cleanup().unwrap());
    assert!(!world.cleanup().unwrap());
    assert_eq!(world.count(), 1);
    assert_eq!(world.get_by_index(0), Some(b));
}

#[test]
fn cleanup_invalidates_component_handles() {
    let mut world: World = World::new();
    let entity = world.create();
    let handle = world.assign(entity, Marker(1)).unwrap();
    world.destroy(entity);
    assert!(handle.is_valid());

    world.cleanup().unwrap();
    assert!(!handle.is_valid());
    assert!(!world.get::<Marker>(entity).is_valid());
}

#[test]
fn tick_runs_cleanup_first() {
    let mut world: World = World::new();
    let entity = world.create();
    world.destroy(entity);
    world.tick(0.0).unwrap();
    assert_eq!(world.count(), 0);
}

#[test]
fn manual_cleanup_world_keeps_pending_entities_across_ticks() {
    let mut world: World = World::with_config(WorldConfig::manual_cleanup());
    let entity = world.create();
    world.destroy(entity);
    world.tick(0.0).unwrap();
    world.tick(0.0).unwrap();
    assert_eq!(world.count(), 1);
    assert!(world.cleanup().unwrap());
    assert_eq!(world.count(), 0);
}

#[test]
fn mutating_a_dead_entity_is_an_error() {
    let mut world: World = World::new();
    let entity = world.create();
    world.destroy_immediate(entity).unwrap();

    let err = entity.assign(&mut world, Marker(0)).unwrap_err();
    assert_eq!(err.kind, ErrorKind::StaleEntity(entity.id()));
    assert!(!entity.remove::<Marker, _>(&mut world));
    assert_eq!(entity.remove_all(&mut world), 0);
}

// =============================================================================
// Reset
// =============================================================================

#[test]
fn reset_clears_everything_and_restarts_ids() {
    let mut world: World = World::new();
    let before: Vec<_> = (0..5).map(|_| world.create()).collect();
    world.reset().unwrap();

    assert_eq!(world.count(), 0);
    let after = world.create();
    assert_eq!(after.id(), EntityId::new(1));
    assert!(before.iter().all(|&old| !world.contains(old)));
}

#[test]
fn stale_handles_do_not_alias_new_entities() {
    let mut world: World = World::new();
    let old = world.create();
    world.assign(old, Marker(1)).unwrap();
    world.reset().unwrap();

    let new = world.create();
    world.assign(new, Marker(2)).unwrap();
    assert_eq!(old.id(), new.id());
    assert!(!old.has::<Marker, _>(&world));
    assert_eq!(new.get::<Marker, _>(&world).cloned(), Some(Marker(2)));
}

// =============================================================================
// Lookup
// =============================================================================

#[test]
fn index_positions_shift_after_destruction() {
    let mut world: World = World::new();
    let a = world.create();
    let b = world.create();
    let c = world.create();
    assert_eq!(world.get_by_index(2), Some(c));

    world.destroy(a);
    world.cleanup().unwrap();
    assert_eq!(world.get_by_index(0), Some(b));
    assert_eq!(world.get_by_index(1), Some(c));
    assert_eq!(world.get_by_index(2), None);
}

#[test]
fn lookup_by_id() {
    let mut world: World = World::new();
    let a = world.create();
    let b = world.create();

    assert_eq!(world.get_by_id(a.id()), Some(a));
    assert_eq!(world.get_by_id(b.id()), Some(b));
    assert_eq!(world.get_by_id(EntityId::INVALID), None);
    assert_eq!(world.get_by_id(EntityId::new(3)), None);

    world.destroy_immediate(a).unwrap();
    assert_eq!(world.get_by_id(a.id()), None);
    assert_eq!(world.get_by_id(b.id()), Some(b));
}

#[test]
fn null_entity_is_never_alive() {
    let mut world: World = World::new();
    world.create();
    assert!(!world.contains(Entity::INVALID));
    assert!(!world.has::<()>(Entity::INVALID));
    assert!(!world.get::<Marker>(Entity::INVALID).is_valid());
}
