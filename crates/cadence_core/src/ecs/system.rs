//! The System contract.
//!
//! Every callback is optional: the default bodies are no-ops, and the
//! default `accepts` takes every component. A system with nothing
//! overridden is legal and does nothing.

use crate::context::EngineContext;
use crate::ecs::{ComponentRef, SystemDescriptor};

/// Result of one `update` call.
pub type SystemResult = anyhow::Result<()>;

/// A unit of per-frame behavior.
///
/// The system's own fields are its user state. Only the engine calls
/// into a system, and never from two threads at once, so state needs no
/// locking. `Send` is required because `Early`/`Late` updates may run on
/// a worker thread.
pub trait System: Send {
    /// Called exactly once, right after registration.
    fn init(&mut self, _ctx: &EngineContext) {}

    /// Per-frame work for the system's phase.
    ///
    /// An `Err` (or a panic) is reported in the phase report and logged;
    /// it does not stop other systems.
    fn update(&mut self, _ctx: &EngineContext, _dt: f32) -> SystemResult {
        Ok(())
    }

    /// Filter for component notifications.
    fn accepts(&self, _component: &ComponentRef<'_>) -> bool {
        true
    }

    /// The component is linked to its entity and visible in the world.
    fn on_component_added(&mut self, _ctx: &EngineContext, _component: &ComponentRef<'_>) {}

    /// The component is still linked; it is dropped once this returns.
    fn on_component_removed(&mut self, _ctx: &EngineContext, _component: &ComponentRef<'_>) {}

    /// Called exactly once at teardown, before the system is dropped.
    fn shutdown(&mut self, _ctx: &EngineContext) {}
}

/// A system that has been created but not yet handed to an engine.
pub struct SystemInstance {
    descriptor: SystemDescriptor,
    system: Box<dyn System>,
}

impl SystemInstance {
    pub fn new<S: System + 'static>(descriptor: SystemDescriptor, system: S) -> Self {
        Self {
            descriptor,
            system: Box::new(system),
        }
    }

    pub fn descriptor(&self) -> &SystemDescriptor {
        &self.descriptor
    }

    pub(crate) fn into_parts(self) -> (SystemDescriptor, Box<dyn System>) {
        (self.descriptor, self.system)
    }
}

impl std::fmt::Debug for SystemInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemInstance")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}
