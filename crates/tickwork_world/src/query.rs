//! Component-signature filters and lazy entity views.
//!
//! A [`ComponentSet`] names the components an entity must have to match: a
//! single component type, a tuple of them, or `()` for "any entity".
//! [`World::each`](crate::World::each) visits matches through a callback;
//! [`World::view`](crate::World::view) yields them lazily.

use std::iter::FusedIterator;
use std::marker::PhantomData;

use crate::component::{Component, ComponentHandle, ComponentMap};
use crate::entity::Entity;
use crate::world::World;

/// A conjunction of component types that an entity can be tested against.
pub trait ComponentSet: 'static {
    /// The handles fetched for a matching entity.
    type Handles;

    /// Returns true if every component in the set is present.
    fn all_present(components: &ComponentMap) -> bool;

    /// Fetches a handle per component in the set.
    ///
    /// Handles for absent components are null.
    fn fetch(components: &ComponentMap) -> Self::Handles;
}

impl ComponentSet for () {
    type Handles = ();

    fn all_present(_components: &ComponentMap) -> bool {
        true
    }

    fn fetch(_components: &ComponentMap) -> Self::Handles {}
}

impl<T: Component> ComponentSet for T {
    type Handles = ComponentHandle<T>;

    fn all_present(components: &ComponentMap) -> bool {
        components.contains::<T>()
    }

    fn fetch(components: &ComponentMap) -> Self::Handles {
        components.handle::<T>()
    }
}

macro_rules! impl_component_set {
    ($($name:ident),+) => {
        impl<$($name: ComponentSet),+> ComponentSet for ($($name,)+) {
            type Handles = ($($name::Handles,)+);

            fn all_present(components: &ComponentMap) -> bool {
                $($name::all_present(components))&&+
            }

            fn fetch(components: &ComponentMap) -> Self::Handles {
                ($($name::fetch(components),)+)
            }
        }
    };
}

impl_component_set!(A);
impl_component_set!(A, B);
impl_component_set!(A, B, C);
impl_component_set!(A, B, C, D);
impl_component_set!(A, B, C, D, E);
impl_component_set!(A, B, C, D, E, F);
impl_component_set!(A, B, C, D, E, F, G);
impl_component_set!(A, B, C, D, E, F, G, H);

/// A lazy, restartable view over the entities matching `Q`.
///
/// Matching is evaluated on demand against the world's current entity list,
/// in list order. The view borrows the world, so the list cannot change
/// while it is being traversed.
pub struct View<'w, Q, D: 'static> {
    world: &'w World<D>,
    include_pending_destroy: bool,
    marker: PhantomData<fn() -> Q>,
}

impl<'w, Q: ComponentSet, D: 'static> View<'w, Q, D> {
    pub(crate) fn new(world: &'w World<D>) -> Self {
        Self {
            world,
            include_pending_destroy: false,
            marker: PhantomData,
        }
    }

    /// Also yields entities that are pending destruction.
    #[must_use]
    pub fn include_pending_destroy(mut self) -> Self {
        self.include_pending_destroy = true;
        self
    }

    /// Starts a traversal from the beginning of the entity list.
    #[must_use]
    pub fn iter(&self) -> ViewIter<'w, Q, D> {
        ViewIter {
            world: self.world,
            index: 0,
            include_pending_destroy: self.include_pending_destroy,
            marker: PhantomData,
        }
    }
}

impl<Q, D: 'static> Clone for View<'_, Q, D> {
    fn clone(&self) -> Self {
        Self {
            world: self.world,
            include_pending_destroy: self.include_pending_destroy,
            marker: PhantomData,
        }
    }
}

impl<'w, Q: ComponentSet, D: 'static> IntoIterator for View<'w, Q, D> {
    type Item = Entity;
    type IntoIter = ViewIter<'w, Q, D>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'w, Q: ComponentSet, D: 'static> IntoIterator for &View<'w, Q, D> {
    type Item = Entity;
    type IntoIter = ViewIter<'w, Q, D>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a [`View`].
///
/// Two iterators over the same world compare equal when they will next scan
/// the same position.
pub struct ViewIter<'w, Q, D: 'static> {
    world: &'w World<D>,
    index: usize,
    include_pending_destroy: bool,
    marker: PhantomData<fn() -> Q>,
}

impl<Q, D: 'static> ViewIter<'_, Q, D> {
    /// Returns the entity-list position the next scan starts from.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }
}

impl<Q: ComponentSet, D: 'static> Iterator for ViewIter<'_, Q, D> {
    type Item = Entity;

    fn next(&mut self) -> Option<Entity> {
        let (index, entity) = self
            .world
            .next_match::<Q>(self.index, self.include_pending_destroy)?;
        self.index = index + 1;
        Some(entity)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.world.count().saturating_sub(self.index)))
    }
}

impl<Q: ComponentSet, D: 'static> FusedIterator for ViewIter<'_, Q, D> {}

impl<Q, D: 'static> Clone for ViewIter<'_, Q, D> {
    fn clone(&self) -> Self {
        Self {
            world: self.world,
            index: self.index,
            include_pending_destroy: self.include_pending_destroy,
            marker: PhantomData,
        }
    }
}

impl<Q, D: 'static> PartialEq for ViewIter<'_, Q, D> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.world, other.world)
            && self.index == other.index
            && self.include_pending_destroy == other.include_pending_destroy
    }
}
