//! Tickwork - In-process entity-component-event runtime
//!
//! This crate re-exports all layers of the Tickwork system for convenient access.
//! For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 1: tickwork_world       Entities, components, events, systems, queries, World
//! Layer 0: tickwork_foundation  Core types (TypeKey, EntityId, Error)
//! ```
//!
//! The most common types are re-exported at the top level:
//!
//! ```
//! use tickwork::{Component, World};
//!
//! struct Position {
//!     x: f32,
//!     y: f32,
//! }
//! impl Component for Position {}
//!
//! let mut world: World = World::new();
//! let entity = world.create();
//! world.assign(entity, Position { x: 1.0, y: 2.0 }).unwrap();
//! assert!(world.has::<Position>(entity));
//! ```

pub use tickwork_foundation as foundation;
pub use tickwork_world as world;

pub use tickwork_world::{
    Component, ComponentHandle, ComponentSet, Entity, EntitySystem, EventSubscriber,
    OnComponentAssigned, OnComponentRemoved, OnEntityCreated, OnEntityDestroyed, SystemHandle,
    World, WorldConfig,
};
