//! Typed, synchronous publish/subscribe.
//!
//! Any `'static` type can be an event. Subscribers implement
//! [`EventSubscriber<E>`] for each event type they care about and are
//! registered with [`World::subscribe`]. The world holds subscribers weakly:
//! dropping a subscriber is enough to stop deliveries, and dead entries are
//! pruned the next time their event type is emitted.
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use tickwork_world::{EventSubscriber, OnEntityCreated, World};
//!
//! #[derive(Default)]
//! struct Counter(usize);
//!
//! impl EventSubscriber<OnEntityCreated> for Counter {
//!     fn receive(&mut self, _world: &mut World, _event: &OnEntityCreated) {
//!         self.0 += 1;
//!     }
//! }
//!
//! let mut world: World = World::new();
//! let counter = Rc::new(RefCell::new(Counter::default()));
//! world.subscribe::<OnEntityCreated>(&counter);
//!
//! world.create();
//! world.create();
//! assert_eq!(counter.borrow().0, 2);
//! ```

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use tickwork_foundation::TypeKey;

use crate::component::ComponentHandle;
use crate::entity::Entity;
use crate::world::{DefaultTickData, World};

// =============================================================================
// Built-in events
// =============================================================================

/// Emitted by [`World::create`] once the new entity is in the entity list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OnEntityCreated {
    /// The new entity.
    pub entity: Entity,
}

/// Emitted when an entity is marked for destruction.
///
/// The entity and all of its components are still present while this event
/// is being delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OnEntityDestroyed {
    /// The entity being destroyed.
    pub entity: Entity,
}

/// Emitted after a component has been assigned, whether newly added or
/// overwritten in place.
pub struct OnComponentAssigned<T> {
    /// The entity the component belongs to.
    pub entity: Entity,
    /// The assigned component.
    pub component: ComponentHandle<T>,
}

/// Emitted as a component is removed.
///
/// The component is already detached from the entity, but its value stays
/// readable through the handle until delivery finishes.
pub struct OnComponentRemoved<T> {
    /// The entity the component belonged to.
    pub entity: Entity,
    /// The component being removed.
    pub component: ComponentHandle<T>,
}

impl<T> Clone for OnComponentAssigned<T> {
    fn clone(&self) -> Self {
        Self {
            entity: self.entity,
            component: self.component.clone(),
        }
    }
}

impl<T> fmt::Debug for OnComponentAssigned<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnComponentAssigned")
            .field("entity", &self.entity)
            .field("component", &self.component)
            .finish()
    }
}

impl<T> Clone for OnComponentRemoved<T> {
    fn clone(&self) -> Self {
        Self {
            entity: self.entity,
            component: self.component.clone(),
        }
    }
}

impl<T> fmt::Debug for OnComponentRemoved<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnComponentRemoved")
            .field("entity", &self.entity)
            .field("component", &self.component)
            .finish()
    }
}

// =============================================================================
// Subscribers
// =============================================================================

/// Receives events of type `E` from a [`World<D>`].
///
/// `receive` runs synchronously inside the emitting call and may call back
/// into the world: emit further events, assign or remove components, create
/// or soft-destroy entities, and query.
///
/// An event that reaches a subscriber while its own `receive` (or, for a
/// system, its own hook) is still running is queued for it and delivered as
/// soon as that callback returns, in emission order.
pub trait EventSubscriber<E, D: 'static = DefaultTickData>: 'static {
    /// Handles one event.
    fn receive(&mut self, world: &mut World<D>, event: &E);
}

/// Identity of a subscriber, used to unsubscribe it.
///
/// Two references to the same subscriber value have the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(usize);

impl SubscriberId {
    /// Returns the id of a shared subscriber.
    #[must_use]
    pub fn of<S: ?Sized>(subscriber: &Rc<RefCell<S>>) -> Self {
        Self::from_ptr(Rc::as_ptr(subscriber))
    }

    pub(crate) fn from_ptr<T: ?Sized>(ptr: *const T) -> Self {
        Self(ptr.cast::<()>().addr())
    }
}

/// Something that can be registered as a subscriber for events of type `E`.
///
/// Implemented for `Rc<RefCell<S>>`, `Weak<RefCell<S>>`, and
/// [`SystemHandle<S>`](crate::SystemHandle) whenever `S: EventSubscriber<E, D>`.
pub trait SubscriberRef<E: 'static, D: 'static = DefaultTickData> {
    /// Returns the identity of the referenced subscriber.
    fn subscriber_id(&self) -> SubscriberId;

    /// Returns a weak, type-erased reference to the subscriber.
    fn downgrade(&self) -> Weak<RefCell<dyn EventSubscriber<E, D>>>;
}

impl<E: 'static, D: 'static, S: EventSubscriber<E, D>> SubscriberRef<E, D> for Rc<RefCell<S>> {
    fn subscriber_id(&self) -> SubscriberId {
        SubscriberId::of(self)
    }

    fn downgrade(&self) -> Weak<RefCell<dyn EventSubscriber<E, D>>> {
        let weak: Weak<RefCell<S>> = Rc::downgrade(self);
        weak
    }
}

impl<E: 'static, D: 'static, S: EventSubscriber<E, D>> SubscriberRef<E, D> for Weak<RefCell<S>> {
    fn subscriber_id(&self) -> SubscriberId {
        SubscriberId::from_ptr(Weak::as_ptr(self))
    }

    fn downgrade(&self) -> Weak<RefCell<dyn EventSubscriber<E, D>>> {
        let weak: Weak<RefCell<S>> = self.clone();
        weak
    }
}

// =============================================================================
// Channel
// =============================================================================

/// Outcome of handing one event to one subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delivery {
    Delivered,
    /// The subscriber is already borrowed further up the stack; the event
    /// must be queued.
    Busy,
    /// The subscriber has been dropped.
    Dropped,
    /// The event's runtime type does not match the list it was filed under.
    Mismatched,
}

/// A subscriber with its event type erased.
pub(crate) trait ErasedSubscriber<D: 'static> {
    fn is_alive(&self) -> bool;

    fn deliver(&self, world: &mut World<D>, event: &dyn Any) -> Delivery;
}

impl<E: 'static, D: 'static> ErasedSubscriber<D> for Weak<RefCell<dyn EventSubscriber<E, D>>> {
    fn is_alive(&self) -> bool {
        self.strong_count() > 0
    }

    fn deliver(&self, world: &mut World<D>, event: &dyn Any) -> Delivery {
        let Some(event) = event.downcast_ref::<E>() else {
            return Delivery::Mismatched;
        };
        let Some(subscriber) = self.upgrade() else {
            return Delivery::Dropped;
        };
        let Ok(mut receiver) = subscriber.try_borrow_mut() else {
            return Delivery::Busy;
        };
        receiver.receive(world, event);
        Delivery::Delivered
    }
}

pub(crate) type SharedSubscriber<D> = Rc<dyn ErasedSubscriber<D>>;

struct SubscriberEntry<D: 'static> {
    id: SubscriberId,
    subscriber: SharedSubscriber<D>,
}

/// Subscriber lists keyed by event type, in subscription order.
pub(crate) struct EventChannel<D: 'static> {
    lists: HashMap<TypeKey, Vec<SubscriberEntry<D>>>,
}

impl<D: 'static> Default for EventChannel<D> {
    fn default() -> Self {
        Self {
            lists: HashMap::new(),
        }
    }
}

impl<D: 'static> EventChannel<D> {
    /// Appends a subscriber unless it is already subscribed to `key`.
    pub(crate) fn subscribe(
        &mut self,
        key: TypeKey,
        id: SubscriberId,
        subscriber: SharedSubscriber<D>,
    ) -> bool {
        let list = self.lists.entry(key).or_default();
        // A dead entry may share its id with a new allocation.
        list.retain(|entry| entry.subscriber.is_alive());
        if list.iter().any(|entry| entry.id == id) {
            return false;
        }
        list.push(SubscriberEntry { id, subscriber });
        true
    }

    pub(crate) fn unsubscribe(&mut self, key: TypeKey, id: SubscriberId) -> bool {
        let Some(list) = self.lists.get_mut(&key) else {
            return false;
        };
        let Some(position) = list.iter().position(|entry| entry.id == id) else {
            return false;
        };
        list.remove(position);
        if list.is_empty() {
            self.lists.remove(&key);
        }
        true
    }

    pub(crate) fn unsubscribe_all(&mut self, id: SubscriberId) -> usize {
        let mut removed = 0;
        for list in self.lists.values_mut() {
            let before = list.len();
            list.retain(|entry| entry.id != id);
            removed += before - list.len();
        }
        self.lists.retain(|_, list| !list.is_empty());
        removed
    }

    /// Copies the current list for `key` so delivery can borrow the world.
    pub(crate) fn snapshot(&self, key: TypeKey) -> Vec<(SubscriberId, SharedSubscriber<D>)> {
        self.lists.get(&key).map_or_else(Vec::new, |list| {
            list.iter()
                .map(|entry| (entry.id, Rc::clone(&entry.subscriber)))
                .collect()
        })
    }

    /// Returns true if this exact entry is still subscribed to `key`.
    pub(crate) fn holds(&self, key: TypeKey, subscriber: &SharedSubscriber<D>) -> bool {
        self.lists.get(&key).is_some_and(|list| {
            list.iter()
                .any(|entry| Rc::ptr_eq(&entry.subscriber, subscriber))
        })
    }

    /// Drops dead subscribers from `key`'s list.
    pub(crate) fn prune(&mut self, key: TypeKey) {
        if let Some(list) = self.lists.get_mut(&key) {
            list.retain(|entry| entry.subscriber.is_alive());
            if list.is_empty() {
                self.lists.remove(&key);
            }
        }
    }

    pub(crate) fn len(&self, key: TypeKey) -> usize {
        self.lists.get(&key).map_or(0, Vec::len)
    }

    /// Number of event types with at least one subscriber.
    pub(crate) fn event_type_count(&self) -> usize {
        self.lists.len()
    }
}
