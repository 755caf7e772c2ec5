//! Systems: per-tick behaviour owned by a [`World`].

use std::any::type_name;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::event::{EventSubscriber, SubscriberId, SubscriberRef};
use crate::world::{DefaultTickData, World};

/// A unit of behaviour ticked once per [`World::tick`].
///
/// Systems are registered with [`World::register_system`], which takes
/// ownership and calls [`configure`](Self::configure). A system that also
/// implements [`EventSubscriber`] typically subscribes itself there:
///
/// ```
/// use tickwork_world::{
///     EntitySystem, EventSubscriber, OnEntityCreated, SystemHandle, World,
/// };
///
/// #[derive(Default)]
/// struct Census {
///     created: usize,
/// }
///
/// impl EntitySystem for Census {
///     fn configure(&mut self, world: &mut World, this: &SystemHandle<Self>) {
///         world.subscribe::<OnEntityCreated>(this);
///     }
///
///     fn tick(&mut self, _world: &mut World, _delta: f32) {}
/// }
///
/// impl EventSubscriber<OnEntityCreated> for Census {
///     fn receive(&mut self, _world: &mut World, _event: &OnEntityCreated) {
///         self.created += 1;
///     }
/// }
///
/// let mut world: World = World::new();
/// let census = world.register_system(Census::default());
/// world.create();
/// assert_eq!(census.with(|c| c.created), Some(1));
/// ```
pub trait EntitySystem<D: 'static = DefaultTickData>: 'static {
    /// Called once when the system is registered.
    ///
    /// `this` is a non-owning handle to the system itself, for subscribing to
    /// events.
    fn configure(&mut self, world: &mut World<D>, this: &SystemHandle<Self>)
    where
        Self: Sized,
    {
        let _ = (world, this);
    }

    /// Called once when the system is unregistered or the world is dropped.
    fn unconfigure(&mut self, world: &mut World<D>) {
        let _ = world;
    }

    /// Called once per world tick while the system is enabled.
    fn tick(&mut self, world: &mut World<D>, data: D);

    /// Name used in log output.
    fn name(&self) -> &str {
        type_name::<Self>()
    }
}

/// Identifier of a registered system, unique within its world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SystemId(u64);

impl SystemId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value of this id.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "System({})", self.0)
    }
}

/// A non-owning handle to a registered system.
///
/// The world owns the system; the handle stops resolving once the system is
/// unregistered or the world is dropped.
pub struct SystemHandle<S> {
    id: SystemId,
    cell: Weak<RefCell<S>>,
}

impl<S> SystemHandle<S> {
    pub(crate) fn new(id: SystemId, cell: &Rc<RefCell<S>>) -> Self {
        Self {
            id,
            cell: Rc::downgrade(cell),
        }
    }

    /// Returns the system's id.
    #[must_use]
    pub fn id(&self) -> SystemId {
        self.id
    }

    /// Returns true while the world still owns the system.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.cell.strong_count() > 0
    }

    /// Returns the system's identity as an event subscriber.
    #[must_use]
    pub fn subscriber_id(&self) -> SubscriberId {
        SubscriberId::from_ptr(self.cell.as_ptr())
    }

    /// Runs `f` with shared access to the system.
    ///
    /// Returns `None` if the system is gone or currently running.
    pub fn with<R>(&self, f: impl FnOnce(&S) -> R) -> Option<R> {
        let cell = self.cell.upgrade()?;
        let system = cell.try_borrow().ok()?;
        Some(f(&system))
    }

    /// Runs `f` with exclusive access to the system.
    ///
    /// Returns `None` if the system is gone or currently running.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut S) -> R) -> Option<R> {
        let cell = self.cell.upgrade()?;
        let mut system = cell.try_borrow_mut().ok()?;
        Some(f(&mut system))
    }
}

impl<S> Clone for SystemHandle<S> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            cell: self.cell.clone(),
        }
    }
}

impl<S> fmt::Debug for SystemHandle<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemHandle")
            .field("id", &self.id)
            .field("system", &type_name::<S>())
            .field("alive", &self.is_alive())
            .finish()
    }
}

impl<E: 'static, D: 'static, S: EventSubscriber<E, D>> SubscriberRef<E, D> for SystemHandle<S> {
    fn subscriber_id(&self) -> SubscriberId {
        SystemHandle::subscriber_id(self)
    }

    fn downgrade(&self) -> Weak<RefCell<dyn EventSubscriber<E, D>>> {
        let weak: Weak<RefCell<S>> = self.cell.clone();
        weak
    }
}

pub(crate) type SharedSystem<D> = Rc<RefCell<dyn EntitySystem<D>>>;

pub(crate) struct SystemEntry<D: 'static> {
    pub(crate) id: SystemId,
    /// [`EntitySystem::name`] at registration, readable while the system runs.
    pub(crate) name: Rc<str>,
    pub(crate) system: SharedSystem<D>,
}

impl<D: 'static> Clone for SystemEntry<D> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            name: Rc::clone(&self.name),
            system: Rc::clone(&self.system),
        }
    }
}

impl<D: 'static> SystemEntry<D> {
    pub(crate) fn subscriber_id(&self) -> SubscriberId {
        SubscriberId::from_ptr(Rc::as_ptr(&self.system))
    }
}

/// Registered systems: the active ones in tick order, and the disabled ones.
pub(crate) struct SystemSet<D: 'static> {
    active: Vec<SystemEntry<D>>,
    disabled: Vec<SystemEntry<D>>,
}

impl<D: 'static> Default for SystemSet<D> {
    fn default() -> Self {
        Self {
            active: Vec::new(),
            disabled: Vec::new(),
        }
    }
}

impl<D: 'static> SystemSet<D> {
    pub(crate) fn push(&mut self, entry: SystemEntry<D>) {
        self.active.push(entry);
    }

    pub(crate) fn get(&self, id: SystemId) -> Option<&SystemEntry<D>> {
        self.active
            .iter()
            .chain(&self.disabled)
            .find(|entry| entry.id == id)
    }

    pub(crate) fn remove(&mut self, id: SystemId) -> Option<SystemEntry<D>> {
        if let Some(position) = self.active.iter().position(|entry| entry.id == id) {
            return Some(self.active.remove(position));
        }
        let position = self.disabled.iter().position(|entry| entry.id == id)?;
        Some(self.disabled.remove(position))
    }

    /// Moves a disabled system to the end of the tick order.
    pub(crate) fn enable(&mut self, id: SystemId) -> bool {
        let Some(position) = self.disabled.iter().position(|entry| entry.id == id) else {
            return false;
        };
        let entry = self.disabled.remove(position);
        self.active.push(entry);
        true
    }

    pub(crate) fn disable(&mut self, id: SystemId) -> bool {
        let Some(position) = self.active.iter().position(|entry| entry.id == id) else {
            return false;
        };
        let entry = self.active.remove(position);
        self.disabled.push(entry);
        true
    }

    pub(crate) fn is_active(&self, id: SystemId) -> bool {
        self.active.iter().any(|entry| entry.id == id)
    }

    pub(crate) fn active(&self) -> Vec<SystemEntry<D>> {
        self.active.clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.active.len() + self.disabled.len()
    }

    pub(crate) fn disabled_len(&self) -> usize {
        self.disabled.len()
    }

    /// Removes every system, active ones first.
    pub(crate) fn drain(&mut self) -> Vec<SystemEntry<D>> {
        let mut all = std::mem::take(&mut self.active);
        all.append(&mut self.disabled);
        all
    }
}
