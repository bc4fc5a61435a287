use crate::ecs::{ComponentId, Phase, SystemHandle};
use thiserror::Error;

/// Errors that can occur while registering a system with the engine.
#[derive(Debug, Error)]
pub enum SystemRegistrationError {
    #[error("system '{name}' is already registered")]
    DuplicateName { name: String },

    #[error(
        "component {component} already has a writer in phase {phase}: system '{existing}' (rejected '{requested}')"
    )]
    ComponentWriteConflict {
        component: ComponentId,
        phase: Phase,
        existing: String,
        requested: String,
        existing_handle: SystemHandle,
    },

    #[error(
        "component {component} is written by '{writer}' and read by '{reader}' in parallel phase {phase}"
    )]
    ComponentReadConflict {
        component: ComponentId,
        phase: Phase,
        writer: String,
        reader: String,
        existing_handle: SystemHandle,
    },
}
