//! Cadence Engine Core
//!
//! The per-frame execution scheduler:
//! - Systems with optional lifecycle, update and notification callbacks
//! - An ordered system registry owned by the engine
//! - Three-phase frame execution (`Early`, `Lua`, `Late`) with fork-join
//!   fan-out across a fixed worker pool
//! - Component attach/detach notifications
//! - A minimal entity/component layer to drive them

pub mod config;
pub mod context;
pub mod ecs;
pub mod engine;
pub mod jobs;
pub mod time;

pub use config::{ConfigError, EngineConfig};
pub use context::EngineContext;
pub use ecs::{
    system_create, CallbackSystem, Capabilities, Component, ComponentId, ComponentRef, Entity,
    Phase, PhaseReport, RunnerState, System, SystemDescriptor, SystemFailure, SystemHandle,
    SystemInstance, SystemRegistrationError, SystemResult, UnknownPhase, World, WorldError,
};
pub use engine::{Engine, EngineError, FrameReport};
pub use jobs::{BatchHandle, BatchOutcome, Job, JobFailure, JobQueue, JobQueueError, JobReport};
pub use time::{SimulationTime, TICK_DURATION, TICK_RATE_HZ};

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
