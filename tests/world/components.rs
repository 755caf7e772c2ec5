//! Integration tests for components
//!
//! Tests assignment, in-place replacement, removal, and handle validity.

use tickwork_world::{Component, ComponentHandle, ErrorKind, World};

#[derive(Debug, Clone, Default, PartialEq)]
struct Position {
    x: f32,
    y: f32,
}
impl Component for Position {}

#[derive(Debug, Clone, Default, PartialEq)]
struct Health(i32);
impl Component for Health {}

#[derive(Debug, Clone, Default, PartialEq)]
struct Tag;
impl Component for Tag {}

// =============================================================================
// Assignment
// =============================================================================

#[test]
fn assign_then_get_returns_value() {
    let mut world: World = World::new();
    let entity = world.create();
    let assigned = world.assign(entity, Position { x: 3.0, y: 4.0 }).unwrap();

    let fetched = world.get::<Position>(entity);
    assert!(fetched.ptr_eq(&assigned));
    assert_eq!(fetched.cloned(), Some(Position { x: 3.0, y: 4.0 }));
}

#[test]
fn reassignment_is_visible_through_old_handles() {
    let mut world: World = World::new();
    let entity = world.create();
    let old = world.assign(entity, Health(10)).unwrap();
    world.assign(entity, Health(25)).unwrap();

    assert!(old.is_valid());
    assert_eq!(old.cloned(), Some(Health(25)));
}

#[test]
fn at_most_one_component_per_type() {
    let mut world: World = World::new();
    let entity = world.create();
    for i in 0..5 {
        world.assign(entity, Health(i)).unwrap();
    }
    world.assign(entity, Tag).unwrap();
    assert_eq!(world.components(entity).unwrap().len(), 2);
}

#[test]
fn assign_default_component() {
    let mut world: World = World::new();
    let entity = world.create();
    let handle = world.assign_default::<Position>(entity).unwrap();
    assert_eq!(handle.cloned(), Some(Position::default()));
}

#[test]
fn assign_while_reading_is_rejected() {
    let mut world: World = World::new();
    let entity = world.create();
    let handle = world.assign(entity, Health(1)).unwrap();

    let result = handle.read(|_| world.assign(entity, Health(2)).map(|_| ()));
    let err = result.unwrap().unwrap_err();
    assert!(matches!(err.kind, ErrorKind::ComponentBorrowed { .. }));
    assert_eq!(err.context.unwrap().entity, Some(entity.id()));
}

// =============================================================================
// Handles
// =============================================================================

#[test]
fn has_agrees_with_handle_validity() {
    let mut world: World = World::new();
    let with = world.create();
    let without = world.create();
    world.assign(with, Tag).unwrap();

    for entity in [with, without] {
        assert_eq!(world.has::<Tag>(entity), world.get::<Tag>(entity).is_valid());
    }
}

#[test]
fn handles_allow_mutation_without_the_world() {
    let mut world: World = World::new();
    let entity = world.create();
    let handle = world.assign(entity, Position::default()).unwrap();

    handle.write(|p| p.x = 9.0);
    assert_eq!(world.get::<Position>(entity).read(|p| p.x), Some(9.0));

    let previous = handle.replace(Position { x: 1.0, y: 1.0 });
    assert_eq!(previous, Some(Position { x: 9.0, y: 0.0 }));
}

#[test]
fn default_handle_is_null() {
    let handle = ComponentHandle::<Health>::default();
    assert!(!handle.is_valid());
    assert_eq!(handle.read(|h| h.0), None);
}

// =============================================================================
// Removal
// =============================================================================

#[test]
fn remove_missing_component_returns_false() {
    let mut world: World = World::new();
    let entity = world.create();
    assert!(!world.remove::<Health>(entity));
}

#[test]
fn assign_remove_has_round_trip() {
    let mut world: World = World::new();
    let entity = world.create();

    world.assign(entity, Health(1)).unwrap();
    assert!(world.remove::<Health>(entity));
    assert!(!world.has::<Health>(entity));

    world.assign(entity, Health(2)).unwrap();
    assert!(world.has::<Health>(entity));
    assert_eq!(world.get::<Health>(entity).cloned(), Some(Health(2)));
}

#[test]
fn remove_all_clears_every_component() {
    let mut world: World = World::new();
    let entity = world.create();
    world.assign(entity, Health(1)).unwrap();
    world.assign(entity, Tag).unwrap();
    world.assign(entity, Position::default()).unwrap();

    assert_eq!(world.remove_all(entity), 3);
    assert!(world.components(entity).unwrap().is_empty());
    assert!(world.contains(entity));
}

// =============================================================================
// Multi-component checks
// =============================================================================

#[test]
fn has_is_conjunctive() {
    let mut world: World = World::new();
    let entity = world.create();
    world.assign(entity, Health(1)).unwrap();
    world.assign(entity, Tag).unwrap();

    assert!(world.has::<(Health, Tag)>(entity));
    assert!(world.has::<(Tag, Health)>(entity));
    assert!(!world.has::<(Health, Tag, Position)>(entity));
    assert!(world.has::<()>(entity));
}

#[test]
fn with_passes_handles_in_order() {
    let mut world: World = World::new();
    let entity = world.create();
    world.assign(entity, Health(7)).unwrap();
    world.assign(entity, Position { x: 1.0, y: 0.0 }).unwrap();

    let mut seen = None;
    let ran = entity.with::<(Health, Position), _>(&world, |(health, position)| {
        seen = Some((health.cloned(), position.read(|p| p.x)));
    });
    assert!(ran);
    assert_eq!(seen, Some((Some(Health(7)), Some(1.0))));
}
