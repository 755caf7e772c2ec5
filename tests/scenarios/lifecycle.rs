//! Scenarios around deferred destruction, reset, and world teardown.

use std::cell::RefCell;
use std::rc::Rc;

use tickwork::foundation::EntityId;
use tickwork::{EventSubscriber, OnComponentRemoved, OnEntityDestroyed, World};

use crate::common::{DestroyLog, Position, init_tracing};

// =============================================================================
// Deferred Destruction
// =============================================================================

#[test]
fn soft_destroyed_entity_leaves_queries_but_not_the_count() {
    init_tracing();
    let mut world: World = World::new();
    let doomed = world.create();
    let survivor = world.create();
    world.assign(doomed, Position::default()).unwrap();
    world.assign(survivor, Position::default()).unwrap();

    world.destroy(doomed);

    let mut visited = Vec::new();
    world.each::<Position>(|_, entity, _| visited.push(entity));
    assert_eq!(visited, vec![survivor]);
    assert_eq!(world.count(), 2);

    world.cleanup().unwrap();
    assert_eq!(world.count(), 1);
}

#[test]
fn soft_then_immediate_destroy_notifies_once() {
    init_tracing();
    let mut world: World = World::new();
    let log = DestroyLog::shared();
    world.subscribe::<OnEntityDestroyed>(&log);

    let entity = world.create();
    world.destroy(entity);
    world.destroy_immediate(entity).unwrap();

    assert_eq!(log.borrow().entities, vec![entity]);
    assert_eq!(world.count(), 0);
}

#[test]
fn reset_after_five_entities_restarts_at_one() {
    init_tracing();
    let mut world: World = World::new();
    let log = DestroyLog::shared();
    world.subscribe::<OnEntityDestroyed>(&log);
    for _ in 0..5 {
        world.create();
    }

    world.reset().unwrap();
    assert_eq!(world.count(), 0);
    assert_eq!(log.borrow().entities.len(), 5);
    assert_eq!(world.create().id().raw(), 1);
}

#[test]
fn assign_remove_assign_round_trip() {
    init_tracing();
    let mut world: World = World::new();
    let entity = world.create();

    world.assign(entity, Position { x: 1.0, y: 1.0 }).unwrap();
    assert!(world.remove::<Position>(entity));
    assert!(!world.has::<Position>(entity));

    world.assign(entity, Position { x: 4.0, y: 5.0 }).unwrap();
    assert!(world.has::<Position>(entity));
    assert_eq!(
        world.get::<Position>(entity).cloned(),
        Some(Position { x: 4.0, y: 5.0 })
    );
}

// =============================================================================
// Teardown
// =============================================================================

#[derive(Default)]
struct RemovalCounter {
    removed: usize,
}

impl EventSubscriber<OnComponentRemoved<Position>> for RemovalCounter {
    fn receive(&mut self, _world: &mut World, event: &OnComponentRemoved<Position>) {
        assert!(event.component.is_valid());
        self.removed += 1;
    }
}

#[test]
fn dropping_the_world_tears_down_entities() {
    init_tracing();
    let log = DestroyLog::shared();
    let removals = Rc::new(RefCell::new(RemovalCounter::default()));
    {
        let mut world: World = World::new();
        world.subscribe::<OnEntityDestroyed>(&log);
        world.subscribe::<OnComponentRemoved<Position>>(&removals);

        let pending = world.create();
        world.assign(pending, Position::default()).unwrap();
        world.destroy(pending);
        let active = world.create();
        world.assign(active, Position::default()).unwrap();
    }
    assert_eq!(log.borrow().entities.len(), 2);
    assert_eq!(removals.borrow().removed, 2);
}

#[test]
fn chained_destruction_reaches_every_entity() {
    /// Destroys the entity with the next id whenever one is destroyed.
    #[derive(Default)]
    struct Chain {
        heard: Vec<u64>,
    }
    impl EventSubscriber<OnEntityDestroyed> for Chain {
        fn receive(&mut self, world: &mut World, event: &OnEntityDestroyed) {
            self.heard.push(event.entity.id().raw());
            let next = EntityId::new(event.entity.id().raw() + 1);
            if let Some(next) = world.get_by_id(next) {
                world.destroy(next);
            }
        }
    }

    init_tracing();
    let mut world: World = World::new();
    let chain = Rc::new(RefCell::new(Chain::default()));
    let log = DestroyLog::shared();
    world.subscribe::<OnEntityDestroyed>(&chain);
    world.subscribe::<OnEntityDestroyed>(&log);
    let entities: Vec<_> = (0..4).map(|_| world.create()).collect();

    // Each link is delivered to the chain once its previous link returns.
    world.destroy(entities[0]);
    assert_eq!(chain.borrow().heard, vec![1, 2, 3, 4]);
    assert_eq!(
        log.borrow().entities,
        vec![entities[1], entities[2], entities[3], entities[0]]
    );
    assert!(entities.iter().all(|&entity| world.is_pending_destroy(entity)));

    world.reset().unwrap();
    assert_eq!(log.borrow().entities.len(), 4);
    assert_eq!(world.count(), 0);
}
