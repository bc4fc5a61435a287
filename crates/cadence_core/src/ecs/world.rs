// world.rs - Minimal entity/component store
//
// Just enough storage for the scheduler's needs: entities own a small
// list of type-tagged components, systems read them through the engine
// context, and the engine drives attach/detach notifications around
// every mutation. Insertion order per entity is preserved.

use crate::ecs::{Component, ComponentId, ComponentRef, Entity};
use std::any::Any;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorldError {
    #[error("entity {0} is not alive")]
    DeadEntity(Entity),
}

struct StoredComponent {
    id: ComponentId,
    name: &'static str,
    value: Box<dyn Any + Send + Sync>,
}

struct EntitySlot {
    generation: u32,
    alive: bool,
    components: Vec<StoredComponent>,
}

/// Entities and their components.
#[derive(Default)]
pub struct World {
    slots: Vec<EntitySlot>,
    free: Vec<u32>,
    live: usize,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new entity, reusing despawned slots.
    pub fn spawn(&mut self) -> Entity {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.alive = true;
            return Entity::new(index, slot.generation);
        }

        let index = self.slots.len() as u32;
        self.slots.push(EntitySlot {
            generation: 0,
            alive: true,
            components: Vec::new(),
        });
        Entity::new(index, 0)
    }

    /// Drop every remaining component and invalidate the handle.
    ///
    /// The world does not notify anyone; [`Engine::despawn`](crate::Engine::despawn)
    /// detaches components one by one before calling this.
    pub fn despawn(&mut self, entity: Entity) -> Result<(), WorldError> {
        let slot = self.slot_mut(entity)?;
        slot.components.clear();
        slot.alive = false;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(entity.index());
        self.live -= 1;
        Ok(())
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.slot(entity).is_some()
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Attach `value`, replacing any component of the same type.
    pub fn insert<T: Component>(&mut self, entity: Entity, value: T) -> Result<(), WorldError> {
        let slot = self.slot_mut(entity)?;
        let stored = StoredComponent {
            id: T::ID,
            name: T::NAME,
            value: Box::new(value),
        };
        match slot.components.iter_mut().find(|c| c.id == T::ID) {
            Some(existing) => *existing = stored,
            None => slot.components.push(stored),
        }
        Ok(())
    }

    /// Detach and drop a component. Returns whether one was present.
    pub fn remove(&mut self, entity: Entity, id: ComponentId) -> Result<bool, WorldError> {
        let slot = self.slot_mut(entity)?;
        match slot.components.iter().position(|c| c.id == id) {
            Some(pos) => {
                slot.components.remove(pos);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn get<T: Component>(&self, entity: Entity) -> Option<&T> {
        self.component(entity, T::ID)?.downcast::<T>()
    }

    pub fn has(&self, entity: Entity, id: ComponentId) -> bool {
        self.slot(entity)
            .is_some_and(|slot| slot.components.iter().any(|c| c.id == id))
    }

    pub fn component(&self, entity: Entity, id: ComponentId) -> Option<ComponentRef<'_>> {
        let stored = self.slot(entity)?.components.iter().find(|c| c.id == id)?;
        Some(ComponentRef::from_parts(
            entity,
            stored.id,
            stored.name,
            stored.value.as_ref(),
        ))
    }

    /// Components of `entity` in attachment order.
    pub fn components_of(&self, entity: Entity) -> impl Iterator<Item = ComponentRef<'_>> {
        self.slot(entity)
            .into_iter()
            .flat_map(move |slot| {
                slot.components.iter().map(move |c| {
                    ComponentRef::from_parts(entity, c.id, c.name, c.value.as_ref())
                })
            })
    }

    pub fn component_ids(&self, entity: Entity) -> Result<Vec<ComponentId>, WorldError> {
        let slot = self.slot(entity).ok_or(WorldError::DeadEntity(entity))?;
        Ok(slot.components.iter().map(|c| c.id).collect())
    }

    /// Live entities carrying component `id`, in index order.
    pub fn entities_with(&self, id: ComponentId) -> impl Iterator<Item = Entity> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(move |(_, slot)| slot.alive && slot.components.iter().any(|c| c.id == id))
            .map(|(index, slot)| Entity::new(index as u32, slot.generation))
    }

    fn slot(&self, entity: Entity) -> Option<&EntitySlot> {
        self.slots
            .get(entity.index() as usize)
            .filter(|slot| slot.alive && slot.generation == entity.generation())
    }

    fn slot_mut(&mut self, entity: Entity) -> Result<&mut EntitySlot, WorldError> {
        self.slots
            .get_mut(entity.index() as usize)
            .filter(|slot| slot.alive && slot.generation == entity.generation())
            .ok_or(WorldError::DeadEntity(entity))
    }
}
