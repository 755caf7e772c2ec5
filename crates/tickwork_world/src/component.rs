//! Component data, handles, and per-entity component storage.
//!
//! Each entity owns at most one slot per component type. A slot keeps its
//! value in shared, interior-mutable storage so that [`ComponentHandle`]s can
//! observe it without owning it: re-assigning a component writes into the
//! same storage, and removing it invalidates every outstanding handle.

use std::any::{Any, type_name};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use tickwork_foundation::{TypeKey, type_key_of};

use crate::entity::Entity;
use crate::event::OnComponentRemoved;

/// Marker for types that can be attached to entities.
///
/// Any `'static` type qualifies; implementing the trait is the registration
/// step.
///
/// ```
/// use tickwork_world::Component;
///
/// struct Health {
///     current: f32,
///     max: f32,
/// }
///
/// impl Component for Health {}
/// ```
pub trait Component: 'static {}

/// A non-owning, nullable view onto one component instance.
///
/// A handle is null when the component was absent at lookup time, and
/// becomes invalid once the component is removed or its entity is
/// deallocated. Accessors return `None` instead of touching freed storage.
///
/// Access borrows the underlying storage for the duration of the closure;
/// nesting a [`write`](Self::write) inside a [`read`](Self::read) of the same
/// component panics.
pub struct ComponentHandle<T> {
    cell: Option<Weak<RefCell<T>>>,
}

impl<T> ComponentHandle<T> {
    /// Returns a null handle.
    #[must_use]
    pub fn null() -> Self {
        Self { cell: None }
    }

    pub(crate) fn from_cell(cell: &Rc<RefCell<T>>) -> Self {
        Self {
            cell: Some(Rc::downgrade(cell)),
        }
    }

    /// Returns true while the component this handle points at still exists.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.cell.as_ref().is_some_and(|cell| cell.strong_count() > 0)
    }

    /// Runs `f` with shared access to the component.
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        let cell = self.upgrade()?;
        let result = f(&cell.borrow());
        Some(result)
    }

    /// Runs `f` with exclusive access to the component.
    pub fn write<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let cell = self.upgrade()?;
        let result = f(&mut cell.borrow_mut());
        Some(result)
    }

    /// Returns a copy of the component's current value.
    #[must_use]
    pub fn cloned(&self) -> Option<T>
    where
        T: Clone,
    {
        self.read(T::clone)
    }

    /// Overwrites the component's value in place, returning the previous one.
    ///
    /// Unlike re-assigning through the world, this emits no event.
    pub fn replace(&self, value: T) -> Option<T> {
        let cell = self.upgrade()?;
        Some(cell.replace(value))
    }

    /// Returns true if both handles view the same storage.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.cell, &other.cell) {
            (Some(a), Some(b)) => a.ptr_eq(b),
            (None, None) => true,
            _ => false,
        }
    }

    fn upgrade(&self) -> Option<Rc<RefCell<T>>> {
        self.cell.as_ref().and_then(Weak::upgrade)
    }
}

impl<T> Clone for ComponentHandle<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

impl<T> Default for ComponentHandle<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T> fmt::Debug for ComponentHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_valid() { "valid" } else { "null" };
        write!(f, "ComponentHandle<{}>({state})", type_name::<T>())
    }
}

/// Builds the type-erased `OnComponentRemoved<T>` for a slot.
type RemovedEventFn = fn(Entity, &Rc<dyn Any>) -> Rc<dyn Any>;

fn removed_event<T: Component>(entity: Entity, cell: &Rc<dyn Any>) -> Rc<dyn Any> {
    let component = Rc::clone(cell)
        .downcast::<RefCell<T>>()
        .map(|cell| ComponentHandle::from_cell(&cell))
        .unwrap_or_default();
    Rc::new(OnComponentRemoved { entity, component })
}

/// A slot taken out of its map, with everything the world needs to announce
/// the removal without knowing its type.
///
/// `cell` is the last strong reference to the component; handles stay valid
/// until the notice is dropped.
pub(crate) struct RemovalNotice {
    pub(crate) event_key: TypeKey,
    pub(crate) event_name: &'static str,
    pub(crate) build: RemovedEventFn,
    pub(crate) cell: Rc<dyn Any>,
}

/// A single type-erased component slot.
struct ComponentSlot {
    key: TypeKey,
    name: &'static str,
    /// Holds an `Rc<RefCell<T>>` where `type_key_of::<T>() == key`.
    cell: Rc<dyn Any>,
    removed_key: TypeKey,
    removed_name: &'static str,
    removed_event: RemovedEventFn,
}

impl ComponentSlot {
    fn new<T: Component>(cell: &Rc<RefCell<T>>) -> Self {
        let erased: Rc<dyn Any> = cell.clone();
        Self {
            key: type_key_of::<T>(),
            name: type_name::<T>(),
            cell: erased,
            removed_key: type_key_of::<OnComponentRemoved<T>>(),
            removed_name: type_name::<OnComponentRemoved<T>>(),
            removed_event: removed_event::<T>,
        }
    }

    fn typed<T: Component>(&self) -> Option<Rc<RefCell<T>>> {
        debug_assert_eq!(self.key, type_key_of::<T>(), "slot for {}", self.name);
        Rc::clone(&self.cell).downcast::<RefCell<T>>().ok()
    }

    fn into_removal_notice(self) -> RemovalNotice {
        RemovalNotice {
            event_key: self.removed_key,
            event_name: self.removed_name,
            build: self.removed_event,
            cell: self.cell,
        }
    }
}

/// The components owned by one entity, keyed by component type.
#[derive(Default)]
pub struct ComponentMap {
    slots: HashMap<TypeKey, ComponentSlot>,
}

impl ComponentMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if a component of type `T` is present.
    #[must_use]
    pub fn contains<T: Component>(&self) -> bool {
        self.slots.contains_key(&type_key_of::<T>())
    }

    /// Returns true if a component with the given key is present.
    #[must_use]
    pub fn contains_key(&self, key: TypeKey) -> bool {
        self.slots.contains_key(&key)
    }

    /// Returns a handle to the `T` component, or a null handle.
    #[must_use]
    pub fn handle<T: Component>(&self) -> ComponentHandle<T> {
        self.cell::<T>()
            .map(|cell| ComponentHandle::from_cell(&cell))
            .unwrap_or_default()
    }

    /// Returns the number of components present.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if no components are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Iterates over the type names of the components present.
    pub fn type_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.slots.values().map(|slot| slot.name)
    }

    pub(crate) fn cell<T: Component>(&self) -> Option<Rc<RefCell<T>>> {
        self.slots.get(&type_key_of::<T>()).and_then(ComponentSlot::typed)
    }

    pub(crate) fn insert<T: Component>(&mut self, cell: &Rc<RefCell<T>>) {
        self.slots.insert(type_key_of::<T>(), ComponentSlot::new(cell));
    }

    /// Detaches a slot, returning its removal notice.
    pub(crate) fn take(&mut self, key: TypeKey) -> Option<RemovalNotice> {
        self.slots.remove(&key).map(ComponentSlot::into_removal_notice)
    }

    pub(crate) fn first_key(&self) -> Option<TypeKey> {
        self.slots.keys().next().copied()
    }
}

impl fmt::Debug for ComponentMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.type_names()).finish()
    }
}
