//! The `World`: entities, their components, registered systems, and the
//! event channel that connects them.
//!
//! # Entity lifecycle
//!
//! An entity is *active* from [`World::create`] until it is destroyed.
//! [`World::destroy`] moves it to *pending destroy*: it stays in the entity
//! list with all of its components, but queries skip it by default.
//! [`World::cleanup`] (run at the start of every [`World::tick`] unless
//! disabled in [`WorldConfig`]) deallocates pending entities, emitting
//! [`OnComponentRemoved`](crate::OnComponentRemoved) for each remaining component.
//!
//! # Re-entrancy
//!
//! Systems, subscribers, and query callbacks all receive `&mut World` and may
//! call back into it. Operations that would remove entries from the entity
//! list ([`destroy_immediate`](World::destroy_immediate),
//! [`cleanup`](World::cleanup), [`reset`](World::reset), [`tick`](World::tick))
//! are refused with [`ErrorKind::IterationInProgress`](tickwork_foundation::ErrorKind)
//! while a callback iteration is running.
//!
//! An event emitted to a subscriber whose own callback is still on the stack
//! (a system creating entities it listens for, or a subscriber reacting to
//! its own emissions) is queued and delivered as soon as that callback
//! returns.

use std::any::{Any, type_name};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::rc::Rc;

use tickwork_foundation::{EntityId, Error, ErrorContext, Result, TypeKey, type_key_of};
use tracing::{debug, trace, warn};

use crate::component::{Component, ComponentHandle, ComponentMap};
use crate::config::WorldConfig;
use crate::entity::Entity;
use crate::event::{
    Delivery, EventChannel, OnComponentAssigned, OnEntityCreated, OnEntityDestroyed,
    SharedSubscriber, SubscriberId, SubscriberRef,
};
use crate::query::{ComponentSet, View};
use crate::system::{EntitySystem, SystemEntry, SystemHandle, SystemId, SystemSet};

/// Tick payload used when none is named: elapsed time in seconds.
pub type DefaultTickData = f32;

/// One slot of the entity list.
struct EntityRecord {
    entity: Entity,
    components: ComponentMap,
    pending_destroy: bool,
}

impl EntityRecord {
    fn new(entity: Entity) -> Self {
        Self {
            entity,
            components: ComponentMap::new(),
            pending_destroy: false,
        }
    }
}

/// An event held back for a subscriber whose own callback was running when
/// the event was emitted.
struct DeferredDelivery<D: 'static> {
    key: TypeKey,
    name: &'static str,
    subscriber_id: SubscriberId,
    subscriber: SharedSubscriber<D>,
    event: Rc<dyn Any>,
    /// Keeps a removed component readable until the event is delivered.
    _retain: Option<Rc<dyn Any>>,
}

/// Marks an entity-list iteration for as long as it lives.
///
/// The depth is restored on drop, so a panicking callback that is caught
/// further up does not leave the world locked.
struct IterationGuard(Rc<Cell<usize>>);

impl IterationGuard {
    fn enter(depth: &Rc<Cell<usize>>) -> Self {
        depth.set(depth.get() + 1);
        Self(Rc::clone(depth))
    }
}

impl Drop for IterationGuard {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}

/// Container for entities and systems.
///
/// `D` is the payload handed to every system on [`tick`](Self::tick); use
/// `World<()>` for none.
pub struct World<D: 'static = DefaultTickData> {
    config: WorldConfig,
    /// Insertion order; destruction removes from the middle.
    entities: Vec<EntityRecord>,
    index_of: HashMap<EntityId, usize>,
    last_entity_id: EntityId,
    /// Bumped by every reset.
    generation: u32,
    systems: SystemSet<D>,
    next_system_id: u64,
    channel: EventChannel<D>,
    deferred: VecDeque<DeferredDelivery<D>>,
    iteration_depth: Rc<Cell<usize>>,
}

impl<D: 'static> Default for World<D> {
    fn default() -> Self {
        Self::with_config(WorldConfig::default())
    }
}

impl<D: 'static> World<D> {
    /// Creates an empty world with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty world.
    #[must_use]
    pub fn with_config(config: WorldConfig) -> Self {
        Self {
            entities: Vec::with_capacity(config.entity_capacity),
            index_of: HashMap::with_capacity(config.entity_capacity),
            config,
            last_entity_id: EntityId::INVALID,
            generation: 0,
            systems: SystemSet::default(),
            next_system_id: 0,
            channel: EventChannel::default(),
            deferred: VecDeque::new(),
            iteration_depth: Rc::new(Cell::new(0)),
        }
    }

    /// Returns this world's configuration.
    #[must_use]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Returns the reset epoch carried by entities this world issues.
    #[must_use]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Returns true while a callback iteration ([`each`](Self::each),
    /// [`all`](Self::all), or component teardown) is running.
    #[must_use]
    pub fn is_iterating(&self) -> bool {
        self.iteration_depth.get() > 0
    }

    // =========================================================================
    // Entity lifecycle
    // =========================================================================

    /// Creates an entity and emits [`OnEntityCreated`].
    ///
    /// # Panics
    ///
    /// Panics if the entity id space is exhausted.
    pub fn create(&mut self) -> Entity {
        let id = self.last_entity_id.next();
        self.last_entity_id = id;

        let entity = Entity::new(id, self.generation);
        self.index_of.insert(id, self.entities.len());
        self.entities.push(EntityRecord::new(entity));
        debug!(entity = %id, "created entity");

        self.emit(OnEntityCreated { entity });
        entity
    }

    /// Marks an entity for destruction and emits [`OnEntityDestroyed`].
    ///
    /// The entity is deallocated by the next [`cleanup`](Self::cleanup).
    /// Null, dead, and already-pending entities are ignored.
    pub fn destroy(&mut self, entity: Entity) {
        let Some(index) = self.index(entity) else {
            return;
        };
        let record = &mut self.entities[index];
        if record.pending_destroy {
            return;
        }
        record.pending_destroy = true;
        debug!(entity = %entity.id(), "entity pending destroy");

        self.emit(OnEntityDestroyed { entity });
    }

    /// Destroys an entity and deallocates it before returning.
    ///
    /// If the entity was already pending destroy, [`OnEntityDestroyed`] is not
    /// emitted again.
    ///
    /// # Errors
    ///
    /// Returns [`IterationInProgress`](tickwork_foundation::ErrorKind::IterationInProgress)
    /// if called from inside an entity iteration.
    pub fn destroy_immediate(&mut self, entity: Entity) -> Result<()> {
        if self.is_iterating() {
            return Err(Error::iteration_in_progress("destroy an entity immediately")
                .with_context(ErrorContext::new().with_entity(entity.id())));
        }
        self.destroy(entity);
        self.deallocate(entity);
        Ok(())
    }

    /// Deallocates every entity pending destroy.
    ///
    /// Returns whether any entity was reclaimed.
    ///
    /// # Errors
    ///
    /// Returns [`IterationInProgress`](tickwork_foundation::ErrorKind::IterationInProgress)
    /// if called from inside an entity iteration.
    pub fn cleanup(&mut self) -> Result<bool> {
        self.ensure_not_iterating("clean up destroyed entities")?;

        let pending: HashSet<EntityId> = self
            .entities
            .iter()
            .filter(|record| record.pending_destroy)
            .map(|record| record.entity.id())
            .collect();
        if pending.is_empty() {
            return Ok(false);
        }

        {
            let _iterating = self.iterating();
            for index in 0..self.entities.len() {
                let entity = self.entities[index].entity;
                if pending.contains(&entity.id()) {
                    self.remove_all(entity);
                }
            }
        }

        self.entities
            .retain(|record| !pending.contains(&record.entity.id()));
        self.reindex();
        debug!(
            reclaimed = pending.len(),
            remaining = self.entities.len(),
            "cleanup reclaimed entities"
        );
        Ok(true)
    }

    /// Destroys and deallocates every entity and restarts entity ids at 1.
    ///
    /// Entities issued before the reset are stale afterwards, even if a new
    /// entity reuses their id.
    ///
    /// # Errors
    ///
    /// Returns [`IterationInProgress`](tickwork_foundation::ErrorKind::IterationInProgress)
    /// if called from inside an entity iteration.
    pub fn reset(&mut self) -> Result<()> {
        self.ensure_not_iterating("reset the world")?;

        self.teardown_entities();
        self.last_entity_id = EntityId::INVALID;
        self.generation = self.generation.wrapping_add(1);
        debug!(generation = self.generation, "world reset");
        Ok(())
    }

    /// Returns true if `entity` is alive in this world, pending destroy or not.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.index(entity).is_some()
    }

    /// Returns true if `entity` is alive and pending destroy.
    #[must_use]
    pub fn is_pending_destroy(&self, entity: Entity) -> bool {
        self.record(entity)
            .is_some_and(|record| record.pending_destroy)
    }

    /// Returns the number of entities, including those pending destroy.
    #[must_use]
    pub fn count(&self) -> usize {
        self.entities.len()
    }

    /// Returns the entity at a position in the entity list.
    ///
    /// Positions shift as entities are deallocated.
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<Entity> {
        self.entities.get(index).map(|record| record.entity)
    }

    /// Looks up an entity by id.
    #[must_use]
    pub fn get_by_id(&self, id: EntityId) -> Option<Entity> {
        if !id.is_valid() || id > self.last_entity_id {
            return None;
        }
        let index = *self.index_of.get(&id)?;
        self.entities.get(index).map(|record| record.entity)
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Assigns a component, replacing the value in place if the entity
    /// already has one.
    ///
    /// Handles obtained before an in-place replacement stay valid and observe
    /// the new value. Emits [`OnComponentAssigned`] afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if `entity` is null or not alive in this world, or if
    /// the existing component is currently borrowed through a handle.
    pub fn assign<T: Component>(
        &mut self,
        entity: Entity,
        value: T,
    ) -> Result<ComponentHandle<T>> {
        let index = self.live_index(entity)?;
        let components = &mut self.entities[index].components;

        let handle = if let Some(cell) = components.cell::<T>() {
            let Ok(mut current) = cell.try_borrow_mut() else {
                return Err(Error::component_borrowed(type_name::<T>())
                    .with_context(ErrorContext::new().with_entity(entity.id())));
            };
            *current = value;
            drop(current);
            ComponentHandle::from_cell(&cell)
        } else {
            let cell = Rc::new(RefCell::new(value));
            components.insert(&cell);
            ComponentHandle::from_cell(&cell)
        };
        trace!(entity = %entity.id(), component = type_name::<T>(), "assigned component");

        self.emit(OnComponentAssigned {
            entity,
            component: handle.clone(),
        });
        Ok(handle)
    }

    /// Assigns `T::default()`.
    ///
    /// # Errors
    ///
    /// See [`assign`](Self::assign).
    pub fn assign_default<T: Component + Default>(
        &mut self,
        entity: Entity,
    ) -> Result<ComponentHandle<T>> {
        self.assign(entity, T::default())
    }

    /// Removes a component, emitting [`OnComponentRemoved`] first.
    ///
    /// Returns false if the entity had no `T`.
    ///
    /// [`OnComponentRemoved`]: crate::OnComponentRemoved
    pub fn remove<T: Component>(&mut self, entity: Entity) -> bool {
        self.remove_key(entity, type_key_of::<T>())
    }

    /// Removes every component, in unspecified order.
    ///
    /// Returns how many were removed.
    pub fn remove_all(&mut self, entity: Entity) -> usize {
        let mut removed = 0;
        while let Some(key) = self
            .record(entity)
            .and_then(|record| record.components.first_key())
        {
            if self.remove_key(entity, key) {
                removed += 1;
            }
        }
        removed
    }

    /// Returns a handle to the entity's `T`, or a null handle.
    #[must_use]
    pub fn get<T: Component>(&self, entity: Entity) -> ComponentHandle<T> {
        self.record(entity)
            .map(|record| record.components.handle::<T>())
            .unwrap_or_default()
    }

    /// Returns true if the entity is alive and has every component in `Q`.
    #[must_use]
    pub fn has<Q: ComponentSet>(&self, entity: Entity) -> bool {
        self.record(entity)
            .is_some_and(|record| Q::all_present(&record.components))
    }

    /// Runs `f` with handles to the components in `Q` if the entity has all
    /// of them. Returns whether `f` ran.
    pub fn with<Q: ComponentSet>(&self, entity: Entity, f: impl FnOnce(Q::Handles)) -> bool {
        let Some(record) = self.record(entity) else {
            return false;
        };
        if !Q::all_present(&record.components) {
            return false;
        }
        f(Q::fetch(&record.components));
        true
    }

    /// Returns the entity's component map.
    #[must_use]
    pub fn components(&self, entity: Entity) -> Option<&ComponentMap> {
        self.record(entity).map(|record| &record.components)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Calls `f` for every entity that has all components in `Q` and is not
    /// pending destroy, in entity-list order.
    ///
    /// Handles are fetched immediately before each call, so changes made by
    /// earlier calls are visible.
    pub fn each<Q: ComponentSet>(&mut self, f: impl FnMut(&mut Self, Entity, Q::Handles)) {
        self.visit::<Q>(false, f);
    }

    /// Like [`each`](Self::each), but also visits entities pending destroy.
    pub fn each_with_pending<Q: ComponentSet>(
        &mut self,
        f: impl FnMut(&mut Self, Entity, Q::Handles),
    ) {
        self.visit::<Q>(true, f);
    }

    /// Calls `f` for every entity not pending destroy.
    pub fn all(&mut self, mut f: impl FnMut(&mut Self, Entity)) {
        self.visit::<()>(false, |world, entity, ()| f(world, entity));
    }

    /// Calls `f` for every entity, including those pending destroy.
    pub fn all_with_pending(&mut self, mut f: impl FnMut(&mut Self, Entity)) {
        self.visit::<()>(true, |world, entity, ()| f(world, entity));
    }

    /// Returns a lazy view of the entities matching `Q`.
    #[must_use]
    pub fn view<Q: ComponentSet>(&self) -> View<'_, Q, D> {
        View::new(self)
    }

    /// Returns a lazy view of all entities.
    #[must_use]
    pub fn entities(&self) -> View<'_, (), D> {
        View::new(self)
    }

    fn visit<Q: ComponentSet>(
        &mut self,
        include_pending_destroy: bool,
        mut f: impl FnMut(&mut Self, Entity, Q::Handles),
    ) {
        let _iterating = self.iterating();
        let mut from = 0;
        while let Some((index, entity)) = self.next_match::<Q>(from, include_pending_destroy) {
            let handles = Q::fetch(&self.entities[index].components);
            f(self, entity, handles);
            from = index + 1;
        }
    }

    /// Finds the first matching entity at or after position `from`.
    pub(crate) fn next_match<Q: ComponentSet>(
        &self,
        from: usize,
        include_pending_destroy: bool,
    ) -> Option<(usize, Entity)> {
        self.entities
            .iter()
            .enumerate()
            .skip(from)
            .find(|(_, record)| {
                (include_pending_destroy || !record.pending_destroy)
                    && Q::all_present(&record.components)
            })
            .map(|(index, record)| (index, record.entity))
    }

    // =========================================================================
    // Systems
    // =========================================================================

    /// Takes ownership of a system, appends it to the tick order, and calls
    /// its [`configure`](EntitySystem::configure) hook.
    pub fn register_system<S: EntitySystem<D>>(&mut self, system: S) -> SystemHandle<S> {
        self.next_system_id += 1;
        let id = SystemId::new(self.next_system_id);

        let cell = Rc::new(RefCell::new(system));
        let handle = SystemHandle::new(id, &cell);
        let mut system = cell.borrow_mut();
        let name: Rc<str> = Rc::from(system.name());
        debug!(system = %id, name = &*name, "registered system");
        self.systems.push(SystemEntry {
            id,
            name,
            system: cell.clone(),
        });

        system.configure(self, &handle);
        drop(system);
        self.flush_deferred();
        handle
    }

    /// Removes a system, calls its [`unconfigure`](EntitySystem::unconfigure)
    /// hook, drops its event subscriptions, and drops it.
    ///
    /// Returns false if no such system is registered.
    ///
    /// # Errors
    ///
    /// Returns [`SystemBusy`](tickwork_foundation::ErrorKind::SystemBusy) if
    /// called from one of the system's own hooks.
    pub fn unregister_system(&mut self, id: SystemId) -> Result<bool> {
        let Some(entry) = self.systems.get(id).cloned() else {
            return Ok(false);
        };
        let Ok(mut system) = entry.system.try_borrow_mut() else {
            return Err(Error::system_busy(id.raw())
                .with_context(ErrorContext::new().with_system(&*entry.name)));
        };
        self.systems.remove(id);
        debug!(system = %id, name = &*entry.name, "unregistering system");
        system.unconfigure(self);
        drop(system);

        let subscriber = entry.subscriber_id();
        self.channel.unsubscribe_all(subscriber);
        self.deferred
            .retain(|pending| pending.subscriber_id != subscriber);
        self.flush_deferred();
        Ok(true)
    }

    /// Moves a disabled system to the end of the tick order.
    ///
    /// Returns false if the system is not disabled.
    pub fn enable_system(&mut self, id: SystemId) -> bool {
        let enabled = self.systems.enable(id);
        if enabled {
            debug!(system = %id, "enabled system");
        }
        enabled
    }

    /// Stops ticking a system without unregistering it.
    ///
    /// The system keeps its event subscriptions. Returns false if the system
    /// is not active.
    pub fn disable_system(&mut self, id: SystemId) -> bool {
        let disabled = self.systems.disable(id);
        if disabled {
            debug!(system = %id, "disabled system");
        }
        disabled
    }

    /// Returns true if the system is registered and not disabled.
    #[must_use]
    pub fn is_system_enabled(&self, id: SystemId) -> bool {
        self.systems.is_active(id)
    }

    /// Returns the number of registered systems, enabled or not.
    #[must_use]
    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    /// Returns the number of disabled systems.
    #[must_use]
    pub fn disabled_system_count(&self) -> usize {
        self.systems.disabled_len()
    }

    /// Runs cleanup (unless disabled in the config), then ticks every
    /// enabled system in order.
    ///
    /// A system disabled or unregistered by an earlier system in the same
    /// tick is skipped.
    ///
    /// # Errors
    ///
    /// Returns [`IterationInProgress`](tickwork_foundation::ErrorKind::IterationInProgress)
    /// if called from inside an entity iteration.
    pub fn tick(&mut self, data: D) -> Result<()>
    where
        D: Clone,
    {
        self.ensure_not_iterating("tick")?;
        if self.config.auto_cleanup {
            self.cleanup()?;
        }

        for entry in self.systems.active() {
            if !self.systems.is_active(entry.id) {
                continue;
            }
            let Ok(mut system) = entry.system.try_borrow_mut() else {
                warn!(system = %entry.id, name = &*entry.name, "system is already running; skipping tick");
                continue;
            };
            system.tick(self, data.clone());
            drop(system);
            self.flush_deferred();
        }
        Ok(())
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Subscribes to events of type `E`.
    ///
    /// Returns false if the subscriber is already subscribed to `E` or has
    /// been dropped.
    pub fn subscribe<E: 'static>(&mut self, subscriber: &impl SubscriberRef<E, D>) -> bool {
        let weak = subscriber.downgrade();
        if weak.strong_count() == 0 {
            return false;
        }
        let erased: SharedSubscriber<D> = Rc::new(weak);
        let subscribed = self
            .channel
            .subscribe(type_key_of::<E>(), subscriber.subscriber_id(), erased);
        if subscribed {
            trace!(event = type_name::<E>(), "subscribed");
        }
        subscribed
    }

    /// Unsubscribes from events of type `E`. Returns false if not subscribed.
    pub fn unsubscribe<E: 'static>(&mut self, subscriber: &impl SubscriberRef<E, D>) -> bool {
        self.channel
            .unsubscribe(type_key_of::<E>(), subscriber.subscriber_id())
    }

    /// Unsubscribes a subscriber from every event type. Returns how many
    /// subscriptions were removed.
    pub fn unsubscribe_all(&mut self, subscriber: SubscriberId) -> usize {
        self.channel.unsubscribe_all(subscriber)
    }

    /// Returns the number of subscribers to `E`, including dropped ones not
    /// yet pruned.
    #[must_use]
    pub fn subscriber_count<E: 'static>(&self) -> usize {
        self.channel.len(type_key_of::<E>())
    }

    /// Returns the number of event types with at least one subscriber.
    #[must_use]
    pub fn subscribed_event_types(&self) -> usize {
        self.channel.event_type_count()
    }

    /// Delivers an event to every subscriber of `E`, in subscription order.
    ///
    /// Subscribers added during delivery are not visited by it; subscribers
    /// removed during delivery are skipped. A subscriber whose own callback
    /// is already running further up the stack receives the event as soon as
    /// that callback returns.
    pub fn emit<E: 'static>(&mut self, event: E) {
        let key = type_key_of::<E>();
        if self.channel.len(key) == 0 {
            return;
        }
        let event: Rc<dyn Any> = Rc::new(event);
        self.dispatch(key, type_name::<E>(), &event, None);
    }

    /// Returns the number of events queued for subscribers whose callbacks
    /// are still running.
    #[must_use]
    pub fn deferred_count(&self) -> usize {
        self.deferred.len()
    }

    fn dispatch(
        &mut self,
        key: TypeKey,
        name: &'static str,
        event: &Rc<dyn Any>,
        retain: Option<&Rc<dyn Any>>,
    ) {
        self.flush_deferred();
        let subscribers = self.channel.snapshot(key);
        if subscribers.is_empty() {
            return;
        }
        trace!(event = name, subscribers = subscribers.len(), "dispatching event");

        let mut dropped = false;
        for (id, subscriber) in subscribers {
            if !self.channel.holds(key, &subscriber) {
                continue;
            }
            // Events already queued for this subscriber go first.
            let delivery = if self.has_deferred(id) {
                Delivery::Busy
            } else {
                subscriber.deliver(self, &**event)
            };
            match delivery {
                Delivery::Delivered => self.flush_deferred(),
                Delivery::Dropped => dropped = true,
                Delivery::Busy => {
                    trace!(event = name, subscriber = ?id, "subscriber busy; delivery deferred");
                    self.deferred.push_back(DeferredDelivery {
                        key,
                        name,
                        subscriber_id: id,
                        subscriber,
                        event: Rc::clone(event),
                        _retain: retain.cloned(),
                    });
                }
                Delivery::Mismatched => {
                    warn!(event = name, subscriber = ?id, "event type does not match subscription");
                }
            }
        }
        if dropped {
            self.channel.prune(key);
        }
        self.flush_deferred();
    }

    fn has_deferred(&self, subscriber: SubscriberId) -> bool {
        self.deferred
            .iter()
            .any(|pending| pending.subscriber_id == subscriber)
    }

    /// Delivers queued events to every subscriber that is no longer busy,
    /// keeping each subscriber's events in emission order.
    fn flush_deferred(&mut self) {
        if self.deferred.is_empty() {
            return;
        }
        let mut waiting: VecDeque<DeferredDelivery<D>> = VecDeque::new();
        while let Some(pending) = self.deferred.pop_front() {
            let id = pending.subscriber_id;
            if waiting.iter().any(|earlier| earlier.subscriber_id == id) {
                waiting.push_back(pending);
                continue;
            }
            if !self.channel.holds(pending.key, &pending.subscriber) {
                continue;
            }
            let delivery = pending.subscriber.deliver(self, &*pending.event);
            match delivery {
                Delivery::Delivered => {}
                Delivery::Busy => waiting.push_back(pending),
                Delivery::Dropped => self.channel.prune(pending.key),
                Delivery::Mismatched => {
                    warn!(event = pending.name, subscriber = ?id, "event type does not match subscription");
                }
            }
        }
        self.deferred = waiting;
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn index(&self, entity: Entity) -> Option<usize> {
        if entity.is_null() || entity.generation() != self.generation {
            return None;
        }
        self.index_of.get(&entity.id()).copied()
    }

    fn record(&self, entity: Entity) -> Option<&EntityRecord> {
        self.index(entity).map(|index| &self.entities[index])
    }

    fn live_index(&self, entity: Entity) -> Result<usize> {
        if entity.is_null() {
            return Err(Error::invalid_entity());
        }
        self.index(entity)
            .ok_or_else(|| Error::stale_entity(entity.id()))
    }

    fn iterating(&self) -> IterationGuard {
        IterationGuard::enter(&self.iteration_depth)
    }

    fn ensure_not_iterating(&self, operation: &'static str) -> Result<()> {
        if self.is_iterating() {
            return Err(Error::iteration_in_progress(operation));
        }
        Ok(())
    }

    /// Detaches the slot, then announces the removal while the notice keeps
    /// the value alive.
    fn remove_key(&mut self, entity: Entity, key: TypeKey) -> bool {
        let Some(index) = self.index(entity) else {
            return false;
        };
        let Some(notice) = self.entities[index].components.take(key) else {
            return false;
        };
        trace!(entity = %entity.id(), event = notice.event_name, "removed component");

        if self.channel.len(notice.event_key) > 0 {
            let event = (notice.build)(entity, &notice.cell);
            self.dispatch(notice.event_key, notice.event_name, &event, Some(&notice.cell));
        }
        true
    }

    /// Removes every component of an entity, then the entity itself.
    fn deallocate(&mut self, entity: Entity) {
        self.remove_all(entity);
        let Some(index) = self.index(entity) else {
            return;
        };
        self.entities.remove(index);
        self.index_of.remove(&entity.id());
        for (position, record) in self.entities.iter().enumerate().skip(index) {
            self.index_of.insert(record.entity.id(), position);
        }
        debug!(entity = %entity.id(), "deallocated entity");
    }

    /// Destroys and deallocates every entity, including any created by
    /// subscribers along the way.
    fn teardown_entities(&mut self) {
        let _iterating = self.iterating();
        loop {
            let batch: Vec<Entity> = self.entities.iter().map(|record| record.entity).collect();
            if batch.is_empty() {
                break;
            }
            for &entity in &batch {
                self.destroy(entity);
                self.remove_all(entity);
            }
            let ids: HashSet<EntityId> = batch.iter().map(|entity| entity.id()).collect();
            self.entities
                .retain(|record| !ids.contains(&record.entity.id()));
            self.reindex();
        }
    }

    fn reindex(&mut self) {
        self.index_of.clear();
        for (position, record) in self.entities.iter().enumerate() {
            self.index_of.insert(record.entity.id(), position);
        }
    }
}

impl<D: 'static> Drop for World<D> {
    fn drop(&mut self) {
        let systems = self.systems.drain();
        for entry in &systems {
            if let Ok(mut system) = entry.system.try_borrow_mut() {
                system.unconfigure(self);
            }
            self.flush_deferred();
        }
        self.teardown_entities();
        drop(systems);
    }
}

impl<D: 'static> fmt::Debug for World<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("entities", &self.entities.len())
            .field("last_entity_id", &self.last_entity_id)
            .field("generation", &self.generation)
            .field("systems", &self.systems.len())
            .field("event_types", &self.channel.event_type_count())
            .field("deferred", &self.deferred.len())
            .finish_non_exhaustive()
    }
}
