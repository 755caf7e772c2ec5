//! Entities, components, typed events, systems, and the World for Tickwork.
//!
//! This crate provides:
//! - [`World`] - Owns entities and systems; creation, deferred destruction, ticking
//! - [`Entity`] - Generation-tagged, non-owning entity handle
//! - [`Component`] / [`ComponentHandle`] - Per-entity typed data and nullable views onto it
//! - [`ComponentSet`] / [`View`] - Component-signature filters and lazy iteration
//! - [`EventSubscriber`] and the built-in events in [`event`]
//! - [`EntitySystem`] / [`SystemHandle`] - Per-tick behaviour registered with a world
//! - [`WorldConfig`] - Per-world settings

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod component;
pub mod config;
pub mod entity;
pub mod event;
pub mod query;
pub mod system;
pub mod world;

pub use component::{Component, ComponentHandle, ComponentMap};
pub use config::WorldConfig;
pub use entity::Entity;
pub use event::{
    EventSubscriber, OnComponentAssigned, OnComponentRemoved, OnEntityCreated, OnEntityDestroyed,
    SubscriberId, SubscriberRef,
};
pub use query::{ComponentSet, View, ViewIter};
pub use system::{EntitySystem, SystemHandle, SystemId};
pub use world::{DefaultTickData, World};

pub use tickwork_foundation::{EntityId, Error, ErrorKind, Result, TypeKey};
