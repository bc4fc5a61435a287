//! Component event bus
//!
//! Fans attach/detach notifications out to every active system whose
//! `accepts` takes the component, in registration order, on the calling
//! thread. Must not overlap a phase run; the engine's `&mut self`
//! receivers guarantee that.

use crate::context::EngineContext;
use crate::ecs::{ComponentRef, SystemRegistry};
use tracing::trace;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ComponentEvent {
    /// Sent after the component is linked to its entity.
    Added,
    /// Sent while the component is still linked, right before it is dropped.
    Removed,
}

impl ComponentEvent {
    pub(crate) fn counter_name(self) -> &'static str {
        match self {
            ComponentEvent::Added => "components.added",
            ComponentEvent::Removed => "components.removed",
        }
    }
}

/// Deliver `event` for `component`. Returns how many systems were notified.
pub fn dispatch(
    event: ComponentEvent,
    registry: &mut SystemRegistry,
    ctx: &EngineContext,
    component: &ComponentRef<'_>,
) -> usize {
    let mut notified = 0;
    registry.for_each_accepting(component, |_, system| {
        match event {
            ComponentEvent::Added => system.on_component_added(ctx, component),
            ComponentEvent::Removed => system.on_component_removed(ctx, component),
        }
        notified += 1;
    });
    trace!(
        ?event,
        component = component.name(),
        entity = %component.entity(),
        notified,
        "component event dispatched"
    );
    notified
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::ecs::{Entity, Phase, System, SystemDescriptor, SystemInstance};
    use std::sync::{Arc, Mutex};

    struct Sprite;
    crate::define_component!(Sprite, 1, "Sprite");

    struct Watcher {
        tag: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl System for Watcher {
        fn on_component_added(&mut self, _ctx: &EngineContext, component: &ComponentRef<'_>) {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}+{}", self.tag, component.name()));
        }

        fn on_component_removed(&mut self, _ctx: &EngineContext, component: &ComponentRef<'_>) {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}-{}", self.tag, component.name()));
        }
    }

    #[test]
    fn events_reach_systems_in_registration_order() {
        let ctx = EngineContext::new(EngineConfig::default());
        let mut registry = SystemRegistry::new(false);
        let log = Arc::new(Mutex::new(Vec::new()));
        for (tag, phase) in [("late", Phase::Late), ("early", Phase::Early)] {
            registry
                .register(
                    &ctx,
                    SystemInstance::new(
                        SystemDescriptor::new(tag, phase),
                        Watcher {
                            tag,
                            log: Arc::clone(&log),
                        },
                    ),
                )
                .unwrap();
        }

        let sprite = Sprite;
        let component = ComponentRef::new(Entity::new(0, 0), &sprite);
        assert_eq!(dispatch(ComponentEvent::Added, &mut registry, &ctx, &component), 2);
        assert_eq!(dispatch(ComponentEvent::Removed, &mut registry, &ctx, &component), 2);

        assert_eq!(
            *log.lock().unwrap(),
            vec!["late+Sprite", "early+Sprite", "late-Sprite", "early-Sprite"]
        );
    }
}
