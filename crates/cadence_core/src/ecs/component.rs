// component.rs - Component type tags and the borrowed view handed to systems
//
// Components are identified by numeric ids rather than Rust TypeIds so
// that scripted components can share the same tag space.

use crate::ecs::Entity;
use std::any::Any;
use std::fmt;

/// Numeric component type tag.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(u32);

impl ComponentId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Trait for Rust-defined components.
///
/// Components are shared between the world and every system that
/// accepts them, including systems running on worker threads, hence
/// `Send + Sync`. A component that must be mutated during a parallel
/// phase carries its own synchronization.
pub trait Component: 'static + Send + Sync {
    /// Globally unique component id.
    const ID: ComponentId;

    /// Human-readable name for logs and diagnostics.
    const NAME: &'static str;
}

/// Helper macro to implement [`Component`].
///
/// # Example
/// ```ignore
/// struct Sprite { frame: u32 }
///
/// define_component!(Sprite, 1, "Sprite");
/// ```
#[macro_export]
macro_rules! define_component {
    ($ty:ty, $id:expr, $name:expr) => {
        impl $crate::ecs::Component for $ty {
            const ID: $crate::ecs::ComponentId = $crate::ecs::ComponentId::new($id);
            const NAME: &'static str = $name;
        }
    };
}

/// Borrowed view of one component attached to one entity.
///
/// Only valid for the duration of the callback it is passed to.
#[derive(Clone, Copy)]
pub struct ComponentRef<'a> {
    entity: Entity,
    id: ComponentId,
    name: &'static str,
    value: &'a (dyn Any + Send + Sync),
}

impl<'a> ComponentRef<'a> {
    /// View a typed component. Used by component layers outside the
    /// built-in [`World`](crate::ecs::World).
    pub fn new<T: Component>(entity: Entity, value: &'a T) -> Self {
        Self {
            entity,
            id: T::ID,
            name: T::NAME,
            value,
        }
    }

    pub(crate) fn from_parts(
        entity: Entity,
        id: ComponentId,
        name: &'static str,
        value: &'a (dyn Any + Send + Sync),
    ) -> Self {
        Self {
            entity,
            id,
            name,
            value,
        }
    }

    /// Owning entity.
    pub fn entity(&self) -> Entity {
        self.entity
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is<T: Component>(&self) -> bool {
        self.id == T::ID && self.value.is::<T>()
    }

    pub fn downcast<T: Component>(&self) -> Option<&'a T> {
        if self.id != T::ID {
            return None;
        }
        self.value.downcast_ref::<T>()
    }
}

impl fmt::Debug for ComponentRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRef")
            .field("entity", &self.entity)
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}
