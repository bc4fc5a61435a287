//! Engine context shared with every system callback.
//!
//! Systems see the engine only through `&EngineContext`. During a
//! parallel phase the same context is read from several workers at
//! once, so everything reachable from here is `Sync`, and nothing here
//! can be mutated from a callback.

use crate::config::EngineConfig;
use crate::ecs::{Phase, World};
use crate::time::SimulationTime;
use std::any::{Any, TypeId};
use std::collections::HashMap;

pub struct EngineContext {
    config: EngineConfig,
    time: SimulationTime,
    world: World,
    resources: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    phase: Option<Phase>,
}

impl EngineContext {
    pub(crate) fn new(config: EngineConfig) -> Self {
        Self {
            config,
            time: SimulationTime::new(),
            world: World::new(),
            resources: HashMap::new(),
            phase: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn time(&self) -> &SimulationTime {
        &self.time
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Phase currently being run, `None` outside `run_phase`.
    pub fn current_phase(&self) -> Option<Phase> {
        self.phase
    }

    /// Shared, read-only engine resource of type `T`.
    pub fn resource<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.resources
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref::<T>())
    }

    pub(crate) fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub(crate) fn time_mut(&mut self) -> &mut SimulationTime {
        &mut self.time
    }

    pub(crate) fn set_phase(&mut self, phase: Option<Phase>) {
        self.phase = phase;
    }

    pub(crate) fn insert_resource<T: Any + Send + Sync>(&mut self, value: T) -> Option<T> {
        self.resources
            .insert(TypeId::of::<T>(), Box::new(value))
            .and_then(|old| old.downcast::<T>().ok())
            .map(|old| *old)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Gravity(f32);

    #[test]
    fn resources_are_keyed_by_type() {
        let mut ctx = EngineContext::new(EngineConfig::default());
        assert!(ctx.resource::<Gravity>().is_none());

        assert_eq!(ctx.insert_resource(Gravity(9.8)), None);
        assert_eq!(ctx.insert_resource(Gravity(1.6)), Some(Gravity(9.8)));
        assert_eq!(ctx.resource::<Gravity>(), Some(&Gravity(1.6)));
        assert!(ctx.resource::<u32>().is_none());
    }
}
