//! Capability tables: systems built from optional plain functions.
//!
//! This is the table-of-function-pointers flavor of [`System`]. Each
//! slot is an `Option`; an empty slot behaves exactly like the trait's
//! default method. Useful for systems assembled at runtime, e.g. from a
//! script binding, where writing a new type per system is impractical.

use crate::context::EngineContext;
use crate::ecs::{ComponentRef, Phase, System, SystemDescriptor, SystemInstance, SystemResult};

pub type InitFn<S> = fn(&mut S, &EngineContext);
pub type UpdateFn<S> = fn(&mut S, &EngineContext, f32) -> SystemResult;
pub type AcceptsFn<S> = fn(&S, &ComponentRef<'_>) -> bool;
pub type ComponentFn<S> = fn(&mut S, &EngineContext, &ComponentRef<'_>);
pub type ShutdownFn<S> = fn(&mut S, &EngineContext);

/// Optional callbacks over user state `S`.
pub struct Capabilities<S> {
    pub init: Option<InitFn<S>>,
    pub update: Option<UpdateFn<S>>,
    pub accepts: Option<AcceptsFn<S>>,
    pub on_component_added: Option<ComponentFn<S>>,
    pub on_component_removed: Option<ComponentFn<S>>,
    pub shutdown: Option<ShutdownFn<S>>,
}

impl<S> Capabilities<S> {
    /// A table with every slot empty.
    pub const fn new() -> Self {
        Self {
            init: None,
            update: None,
            accepts: None,
            on_component_added: None,
            on_component_removed: None,
            shutdown: None,
        }
    }

    pub fn with_init(mut self, f: InitFn<S>) -> Self {
        self.init = Some(f);
        self
    }

    pub fn with_update(mut self, f: UpdateFn<S>) -> Self {
        self.update = Some(f);
        self
    }

    pub fn with_accepts(mut self, f: AcceptsFn<S>) -> Self {
        self.accepts = Some(f);
        self
    }

    pub fn with_on_component_added(mut self, f: ComponentFn<S>) -> Self {
        self.on_component_added = Some(f);
        self
    }

    pub fn with_on_component_removed(mut self, f: ComponentFn<S>) -> Self {
        self.on_component_removed = Some(f);
        self
    }

    pub fn with_shutdown(mut self, f: ShutdownFn<S>) -> Self {
        self.shutdown = Some(f);
        self
    }

    /// Number of filled slots.
    pub fn len(&self) -> usize {
        [
            self.init.is_some(),
            self.update.is_some(),
            self.accepts.is_some(),
            self.on_component_added.is_some(),
            self.on_component_removed.is_some(),
            self.shutdown.is_some(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<S> Default for Capabilities<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Clone for Capabilities<S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for Capabilities<S> {}

/// A [`System`] driven by a [`Capabilities`] table.
pub struct CallbackSystem<S> {
    capabilities: Capabilities<S>,
    state: S,
}

impl<S> CallbackSystem<S> {
    pub fn new(capabilities: Capabilities<S>, state: S) -> Self {
        Self {
            capabilities,
            state,
        }
    }

    pub fn capabilities(&self) -> &Capabilities<S> {
        &self.capabilities
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    pub fn into_state(self) -> S {
        self.state
    }
}

impl<S: Send> System for CallbackSystem<S> {
    fn init(&mut self, ctx: &EngineContext) {
        if let Some(init) = self.capabilities.init {
            init(&mut self.state, ctx);
        }
    }

    fn update(&mut self, ctx: &EngineContext, dt: f32) -> SystemResult {
        match self.capabilities.update {
            Some(update) => update(&mut self.state, ctx, dt),
            None => Ok(()),
        }
    }

    fn accepts(&self, component: &ComponentRef<'_>) -> bool {
        self.capabilities
            .accepts
            .map_or(true, |accepts| accepts(&self.state, component))
    }

    fn on_component_added(&mut self, ctx: &EngineContext, component: &ComponentRef<'_>) {
        if let Some(added) = self.capabilities.on_component_added {
            added(&mut self.state, ctx, component);
        }
    }

    fn on_component_removed(&mut self, ctx: &EngineContext, component: &ComponentRef<'_>) {
        if let Some(removed) = self.capabilities.on_component_removed {
            removed(&mut self.state, ctx, component);
        }
    }

    fn shutdown(&mut self, ctx: &EngineContext) {
        if let Some(shutdown) = self.capabilities.shutdown {
            shutdown(&mut self.state, ctx);
        }
    }
}

/// Build a registrable system from a capability table, a phase and
/// its user state.
pub fn system_create<S: Send + 'static>(
    name: impl Into<String>,
    capabilities: Capabilities<S>,
    phase: Phase,
    state: S,
) -> SystemInstance {
    SystemInstance::new(
        SystemDescriptor::new(name, phase),
        CallbackSystem::new(capabilities, state),
    )
}
