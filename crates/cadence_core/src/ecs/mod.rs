//! Systems, phases and the minimal entity/component layer they run over.
//!
//! Scheduling lives here: the [`System`] contract and its capability
//! table flavor, the [`SystemRegistry`], the [`PhaseRunner`] and the
//! component event bus. The [`World`] is deliberately small; it only
//! stores what the scheduler needs to query (type tag, owning entity).

mod capabilities;
pub mod component_events;
mod component;
mod entity;
mod phase;
mod phase_runner;
mod system;
pub(crate) mod system_descriptor;
mod system_handle;
mod system_registration_error;
pub(crate) mod system_registry;
mod world;

pub use capabilities::{
    system_create, AcceptsFn, CallbackSystem, Capabilities, ComponentFn, InitFn, ShutdownFn,
    UpdateFn,
};
pub use component::{Component, ComponentId, ComponentRef};
pub use component_events::ComponentEvent;
pub use entity::Entity;
pub use phase::{Phase, UnknownPhase};
pub use phase_runner::{PhaseReport, PhaseRunner, RunnerState, SystemFailure, SystemTiming};
pub use system::{System, SystemInstance, SystemResult};
pub use system_descriptor::{AccessConflict, SystemDescriptor};
pub use system_handle::SystemHandle;
pub use system_registration_error::SystemRegistrationError;
pub use system_registry::SystemRegistry;
pub use world::{World, WorldError};
