use crate::context::EngineContext;
use crate::ecs::system_descriptor::AccessConflict;
use crate::ecs::{
    ComponentRef, Phase, System, SystemDescriptor, SystemHandle, SystemInstance,
    SystemRegistrationError,
};
use std::collections::HashMap;
use tracing::{debug, info, trace};

/// Ordered, owning collection of every registered system.
///
/// Registration order is execution order for serial phase runs and
/// notification order for component events. Systems are only removed
/// by [`teardown`](Self::teardown).
pub struct SystemRegistry {
    systems: Vec<RegisteredSystem>,
    name_lookup: HashMap<String, SystemHandle>,
    strict_access: bool,
    torn_down: bool,
}

struct RegisteredSystem {
    handle: SystemHandle,
    descriptor: SystemDescriptor,
    active: bool,
    system: Box<dyn System>,
}

/// One eligible system lent out for a phase run.
pub(crate) struct PhaseMember<'r> {
    pub handle: SystemHandle,
    pub name: &'r str,
    pub system: &'r mut dyn System,
}

impl SystemRegistry {
    pub fn new(strict_access: bool) -> Self {
        Self {
            systems: Vec::new(),
            name_lookup: HashMap::new(),
            strict_access,
            torn_down: false,
        }
    }

    /// Run a system's `init`, then append it.
    ///
    /// # Panics
    ///
    /// If called after [`teardown`](Self::teardown) has begun.
    pub fn register(
        &mut self,
        ctx: &EngineContext,
        instance: SystemInstance,
    ) -> Result<SystemHandle, SystemRegistrationError> {
        let (descriptor, mut system) = instance.into_parts();
        assert!(
            !self.torn_down,
            "system '{}' registered after engine teardown",
            descriptor.name()
        );

        let name_key = descriptor.name().to_string();
        if self.name_lookup.contains_key(&name_key) {
            return Err(SystemRegistrationError::DuplicateName { name: name_key });
        }

        if self.strict_access && !descriptor.phase().is_serial() {
            self.check_access(&descriptor)?;
        }

        // A system is only committed once its init has returned.
        system.init(ctx);

        let handle = SystemHandle::new(self.systems.len() as u32);
        info!(
            system = descriptor.name(),
            phase = %descriptor.phase(),
            %handle,
            "registered system"
        );
        self.name_lookup.insert(name_key, handle);
        self.systems.push(RegisteredSystem {
            handle,
            descriptor,
            active: true,
            system,
        });

        Ok(handle)
    }

    fn check_access(&self, descriptor: &SystemDescriptor) -> Result<(), SystemRegistrationError> {
        let phase = descriptor.phase();
        for existing in self.systems.iter().filter(|s| s.descriptor.phase() == phase) {
            let Some(conflict) = descriptor.conflict_with(&existing.descriptor) else {
                continue;
            };
            let existing_name = existing.descriptor.name().to_string();
            let requested = descriptor.name().to_string();
            return Err(match conflict {
                AccessConflict::BothWrite(component) => {
                    SystemRegistrationError::ComponentWriteConflict {
                        component,
                        phase,
                        existing: existing_name,
                        requested,
                        existing_handle: existing.handle,
                    }
                }
                AccessConflict::WritesRead(component) => {
                    SystemRegistrationError::ComponentReadConflict {
                        component,
                        phase,
                        writer: requested,
                        reader: existing_name,
                        existing_handle: existing.handle,
                    }
                }
                AccessConflict::ReadsWritten(component) => {
                    SystemRegistrationError::ComponentReadConflict {
                        component,
                        phase,
                        writer: existing_name,
                        reader: requested,
                        existing_handle: existing.handle,
                    }
                }
            });
        }
        Ok(())
    }

    /// Call `shutdown` on every system in registration order, then drop
    /// them all. Later calls do nothing.
    pub fn teardown(&mut self, ctx: &EngineContext) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        let count = self.systems.len();
        for mut entry in self.systems.drain(..) {
            entry.system.shutdown(ctx);
            debug!(system = entry.descriptor.name(), "system shut down");
        }
        self.name_lookup.clear();
        info!(systems = count, "system registry torn down");
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Returns `false` if the handle is unknown.
    pub fn set_active(&mut self, handle: SystemHandle, active: bool) -> bool {
        match self.systems.get_mut(handle.index() as usize) {
            Some(entry) => {
                if entry.active != active {
                    debug!(system = entry.descriptor.name(), active, "system activity changed");
                }
                entry.active = active;
                true
            }
            None => false,
        }
    }

    /// Active systems of `phase` in registration order.
    pub fn for_each_in_phase<F>(&mut self, phase: Phase, mut f: F)
    where
        F: FnMut(SystemHandle, &mut dyn System),
    {
        for member in self.phase_members_mut(phase) {
            f(member.handle, member.system);
        }
    }

    pub(crate) fn phase_members_mut(&mut self, phase: Phase) -> Vec<PhaseMember<'_>> {
        self.systems
            .iter_mut()
            .filter(|entry| entry.active && entry.descriptor.phase() == phase)
            .map(|entry| PhaseMember {
                handle: entry.handle,
                name: entry.descriptor.name(),
                system: entry.system.as_mut(),
            })
            .collect()
    }

    /// Active systems whose `accepts` takes `component`, in registration order.
    pub fn for_each_accepting<F>(&mut self, component: &ComponentRef<'_>, mut f: F)
    where
        F: FnMut(SystemHandle, &mut dyn System),
    {
        for entry in self.systems.iter_mut() {
            if !entry.active {
                trace!(system = entry.descriptor.name(), "skipping inactive system");
                continue;
            }
            if !entry.system.accepts(component) {
                continue;
            }
            f(entry.handle, entry.system.as_mut());
        }
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    pub fn handle_of(&self, name: &str) -> Option<SystemHandle> {
        self.name_lookup.get(name).copied()
    }

    pub fn descriptor(&self, handle: SystemHandle) -> Option<&SystemDescriptor> {
        self.systems
            .get(handle.index() as usize)
            .map(|entry| &entry.descriptor)
    }

    pub fn name_of(&self, handle: SystemHandle) -> Option<&str> {
        self.descriptor(handle).map(|descriptor| descriptor.name())
    }

    pub fn phase_of(&self, handle: SystemHandle) -> Option<Phase> {
        self.descriptor(handle).map(|descriptor| descriptor.phase())
    }

    pub fn is_active(&self, handle: SystemHandle) -> Option<bool> {
        self.systems
            .get(handle.index() as usize)
            .map(|entry| entry.active)
    }

    /// Number of active systems in `phase`.
    pub fn active_in_phase(&self, phase: Phase) -> usize {
        self.systems
            .iter()
            .filter(|entry| entry.active && entry.descriptor.phase() == phase)
            .count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SystemHandle, &SystemDescriptor, bool)> {
        self.systems
            .iter()
            .map(|entry| (entry.handle, &entry.descriptor, entry.active))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::ecs::{Component, ComponentId, Entity};
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<String>>>;

    struct Recorder {
        name: &'static str,
        log: Log,
    }

    impl System for Recorder {
        fn init(&mut self, _ctx: &EngineContext) {
            self.log.lock().unwrap().push(format!("init:{}", self.name));
        }

        fn shutdown(&mut self, _ctx: &EngineContext) {
            self.log.lock().unwrap().push(format!("shutdown:{}", self.name));
        }
    }

    fn recorder(name: &'static str, phase: Phase, log: &Log) -> SystemInstance {
        SystemInstance::new(
            SystemDescriptor::new(name, phase),
            Recorder {
                name,
                log: Arc::clone(log),
            },
        )
    }

    fn setup() -> (EngineContext, SystemRegistry, Log) {
        (
            EngineContext::new(EngineConfig::default()),
            SystemRegistry::new(false),
            Arc::default(),
        )
    }

    #[test]
    fn register_runs_init_once_and_assigns_handles_in_order() {
        let (ctx, mut registry, log) = setup();
        let a = registry.register(&ctx, recorder("a", Phase::Early, &log)).unwrap();
        let b = registry.register(&ctx, recorder("b", Phase::Late, &log)).unwrap();

        assert_eq!((a.index(), b.index()), (0, 1));
        assert_eq!(registry.handle_of("b"), Some(b));
        assert_eq!(registry.phase_of(a), Some(Phase::Early));
        assert_eq!(*log.lock().unwrap(), vec!["init:a", "init:b"]);
    }

    #[test]
    fn duplicate_names_are_rejected_without_init() {
        let (ctx, mut registry, log) = setup();
        registry.register(&ctx, recorder("a", Phase::Early, &log)).unwrap();
        let err = registry
            .register(&ctx, recorder("a", Phase::Late, &log))
            .unwrap_err();

        assert!(matches!(err, SystemRegistrationError::DuplicateName { ref name } if name == "a"));
        assert_eq!(registry.len(), 1);
        assert_eq!(*log.lock().unwrap(), vec!["init:a"]);
    }

    #[test]
    fn system_whose_init_panics_is_not_committed() {
        struct BadInit;
        impl System for BadInit {
            fn init(&mut self, _ctx: &EngineContext) {
                panic!("missing tileset");
            }
        }

        let (ctx, mut registry, log) = setup();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            registry.register(
                &ctx,
                SystemInstance::new(SystemDescriptor::new("bad", Phase::Early), BadInit),
            )
        }));
        assert!(result.is_err());
        assert!(registry.is_empty());
        assert_eq!(registry.handle_of("bad"), None);

        let handle = registry.register(&ctx, recorder("bad", Phase::Early, &log)).unwrap();
        assert_eq!(handle.index(), 0);
        registry.teardown(&ctx);
        assert_eq!(*log.lock().unwrap(), vec!["init:bad", "shutdown:bad"]);
    }

    #[test]
    fn phase_iteration_skips_other_phases_and_inactive_systems() {
        let (ctx, mut registry, log) = setup();
        let a = registry.register(&ctx, recorder("a", Phase::Early, &log)).unwrap();
        let _b = registry.register(&ctx, recorder("b", Phase::Late, &log)).unwrap();
        let c = registry.register(&ctx, recorder("c", Phase::Early, &log)).unwrap();
        let d = registry.register(&ctx, recorder("d", Phase::Early, &log)).unwrap();
        assert!(registry.set_active(c, false));

        let mut seen = Vec::new();
        registry.for_each_in_phase(Phase::Early, |handle, _| seen.push(handle));
        assert_eq!(seen, vec![a, d]);
        assert_eq!(registry.active_in_phase(Phase::Early), 2);
        assert_eq!(registry.is_active(c), Some(false));
    }

    #[test]
    fn accepting_iteration_honors_filter_and_activity() {
        struct OnlyId(ComponentId);
        impl System for OnlyId {
            fn accepts(&self, component: &ComponentRef<'_>) -> bool {
                component.id() == self.0
            }
        }
        struct Sprite;
        crate::define_component!(Sprite, 1, "Sprite");

        let (ctx, mut registry, log) = setup();
        let everything = registry.register(&ctx, recorder("all", Phase::Lua, &log)).unwrap();
        let sprites = registry
            .register(
                &ctx,
                SystemInstance::new(SystemDescriptor::new("sprites", Phase::Early), OnlyId(Sprite::ID)),
            )
            .unwrap();
        let _colliders = registry
            .register(
                &ctx,
                SystemInstance::new(
                    SystemDescriptor::new("colliders", Phase::Early),
                    OnlyId(ComponentId::new(99)),
                ),
            )
            .unwrap();

        let sprite = Sprite;
        let component = ComponentRef::new(Entity::new(0, 0), &sprite);
        let mut seen = Vec::new();
        registry.for_each_accepting(&component, |handle, _| seen.push(handle));
        assert_eq!(seen, vec![everything, sprites]);

        registry.set_active(everything, false);
        seen.clear();
        registry.for_each_accepting(&component, |handle, _| seen.push(handle));
        assert_eq!(seen, vec![sprites]);
    }

    #[test]
    fn teardown_shuts_down_every_system_once_in_order() {
        let (ctx, mut registry, log) = setup();
        let a = registry.register(&ctx, recorder("a", Phase::Early, &log)).unwrap();
        registry.register(&ctx, recorder("b", Phase::Late, &log)).unwrap();
        registry.set_active(a, false);

        registry.teardown(&ctx);
        registry.teardown(&ctx);

        assert!(registry.is_torn_down());
        assert!(registry.is_empty());
        assert_eq!(
            *log.lock().unwrap(),
            vec!["init:a", "init:b", "shutdown:a", "shutdown:b"]
        );
    }

    #[test]
    #[should_panic(expected = "registered after engine teardown")]
    fn registering_after_teardown_is_fatal() {
        let (ctx, mut registry, log) = setup();
        registry.teardown(&ctx);
        let _ = registry.register(&ctx, recorder("late", Phase::Early, &log));
    }

    #[test]
    fn strict_mode_rejects_overlapping_access_in_parallel_phases() {
        let ctx = EngineContext::new(EngineConfig::default());
        let mut registry = SystemRegistry::new(true);
        let transform = ComponentId::new(3);
        let instance = |name: &str, phase: Phase, desc: fn(SystemDescriptor) -> SystemDescriptor| {
            SystemInstance::new(desc(SystemDescriptor::new(name, phase)), OnlyIdle)
        };
        struct OnlyIdle;
        impl System for OnlyIdle {}

        let mover = registry
            .register(&ctx, instance("mover", Phase::Early, |d| d.writes([ComponentId::new(3)])))
            .unwrap();

        let err = registry
            .register(&ctx, instance("mover2", Phase::Early, |d| d.writes([ComponentId::new(3)])))
            .unwrap_err();
        match err {
            SystemRegistrationError::ComponentWriteConflict {
                component,
                existing_handle,
                ..
            } => {
                assert_eq!(component, transform);
                assert_eq!(existing_handle, mover);
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = registry
            .register(&ctx, instance("reader", Phase::Early, |d| d.reads([ComponentId::new(3)])))
            .unwrap_err();
        assert!(matches!(
            err,
            SystemRegistrationError::ComponentReadConflict { ref writer, ref reader, .. }
                if writer == "mover" && reader == "reader"
        ));

        // Other phases and the serial phase are unaffected.
        registry
            .register(&ctx, instance("late_mover", Phase::Late, |d| d.writes([ComponentId::new(3)])))
            .unwrap();
        registry
            .register(&ctx, instance("script_a", Phase::Lua, |d| d.writes([ComponentId::new(3)])))
            .unwrap();
        registry
            .register(&ctx, instance("script_b", Phase::Lua, |d| d.writes([ComponentId::new(3)])))
            .unwrap();
        assert_eq!(registry.len(), 4);
    }
}
