//! The engine: owner of the registry, the phase runner and the job queue.
//!
//! Everything that mutates scheduler state takes `&mut self`, so
//! registration, teardown, component events and phase runs can never
//! overlap. Systems only ever see the shared [`EngineContext`].

use crate::config::EngineConfig;
use crate::context::EngineContext;
use crate::ecs::component_events::{self, ComponentEvent};
use crate::ecs::{
    Component, ComponentId, ComponentRef, Entity, Phase, PhaseReport, PhaseRunner, RunnerState,
    System, SystemDescriptor, SystemFailure, SystemHandle, SystemInstance, SystemRegistrationError,
    SystemRegistry, World, WorldError,
};
use crate::jobs::{JobQueue, JobQueueError};
use cadence_metrics::{Counter, FrameTimer, SystemProfiler};
use std::any::Any;
use thiserror::Error;
use tracing::{debug, info};

/// Frames kept for rolling frame and system timings.
const METRICS_WINDOW: usize = 120;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    JobQueue(#[from] JobQueueError),
}

/// Reports of the three phases of one frame.
#[derive(Debug, Clone)]
pub struct FrameReport {
    tick: u64,
    phases: Vec<PhaseReport>,
}

impl FrameReport {
    /// Simulation tick this frame ran as.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn phases(&self) -> &[PhaseReport] {
        &self.phases
    }

    pub fn phase(&self, phase: Phase) -> Option<&PhaseReport> {
        self.phases.iter().find(|report| report.phase() == phase)
    }

    pub fn failures(&self) -> impl Iterator<Item = &SystemFailure> {
        self.phases.iter().flat_map(|report| report.failures())
    }

    pub fn is_clean(&self) -> bool {
        self.phases.iter().all(PhaseReport::is_clean)
    }
}

pub struct Engine {
    context: EngineContext,
    registry: SystemRegistry,
    runner: PhaseRunner,
    jobs: JobQueue,
    frame_timer: FrameTimer,
    profiler: SystemProfiler,
    counters: Counter,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let jobs = JobQueue::new(config.worker_threads)?;
        info!(
            workers = jobs.worker_count(),
            strict_access = config.strict_access,
            "engine created"
        );
        Ok(Self {
            registry: SystemRegistry::new(config.strict_access),
            context: EngineContext::new(config),
            runner: PhaseRunner::new(),
            jobs,
            frame_timer: FrameTimer::new(METRICS_WINDOW),
            profiler: SystemProfiler::new(METRICS_WINDOW),
            counters: Counter::new(),
        })
    }

    pub fn context(&self) -> &EngineContext {
        &self.context
    }

    pub fn config(&self) -> &EngineConfig {
        self.context.config()
    }

    pub fn world(&self) -> &World {
        self.context.world()
    }

    pub fn registry(&self) -> &SystemRegistry {
        &self.registry
    }

    pub fn job_queue(&self) -> &JobQueue {
        &self.jobs
    }

    pub fn runner_state(&self) -> RunnerState {
        self.runner.state()
    }

    pub fn frame_timer(&self) -> &FrameTimer {
        &self.frame_timer
    }

    pub fn profiler(&self) -> &SystemProfiler {
        &self.profiler
    }

    pub fn counters(&self) -> &Counter {
        &self.counters
    }

    /// Make `value` readable by every system through the context.
    /// Returns the previous value of the same type.
    pub fn insert_resource<T: Any + Send + Sync>(&mut self, value: T) -> Option<T> {
        self.context.insert_resource(value)
    }

    pub fn resource<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.context.resource::<T>()
    }

    // ------------------------------------------------------------------
    // Systems
    // ------------------------------------------------------------------

    /// Take ownership of a system and run its `init`.
    ///
    /// # Panics
    ///
    /// After [`teardown`](Self::teardown).
    pub fn register(
        &mut self,
        instance: SystemInstance,
    ) -> Result<SystemHandle, SystemRegistrationError> {
        self.registry.register(&self.context, instance)
    }

    /// Shorthand for `register(SystemInstance::new(descriptor, system))`.
    pub fn add_system<S: System + 'static>(
        &mut self,
        descriptor: SystemDescriptor,
        system: S,
    ) -> Result<SystemHandle, SystemRegistrationError> {
        self.register(SystemInstance::new(descriptor, system))
    }

    /// Shut down and drop a system that was never registered.
    pub fn destroy_system(&self, instance: SystemInstance) {
        let (descriptor, mut system) = instance.into_parts();
        system.shutdown(&self.context);
        debug!(system = descriptor.name(), "destroyed unregistered system");
    }

    /// Returns `false` if the handle is unknown.
    pub fn set_active(&mut self, handle: SystemHandle, active: bool) -> bool {
        self.registry.set_active(handle, active)
    }

    pub fn is_active(&self, handle: SystemHandle) -> Option<bool> {
        self.registry.is_active(handle)
    }

    /// Run every active system of `phase` and wait for all of them.
    pub fn run_phase(&mut self, phase: Phase, dt: f32, parallel: bool) -> PhaseReport {
        self.context.set_phase(Some(phase));
        let report = self.runner.run(
            phase,
            dt,
            parallel,
            &mut self.registry,
            &self.context,
            &self.jobs,
        );
        self.context.set_phase(None);

        for timing in report.timings() {
            self.profiler.record(&timing.system, timing.elapsed);
        }
        if report.parallel() {
            self.counters.increment("jobs.dispatched", report.invoked() as u64);
        }
        self.counters.increment("systems.updated", report.invoked() as u64);
        self.counters.increment("systems.failed", report.failures().len() as u64);
        report
    }

    /// Advance simulation time and run `Early`, `Lua`, `Late` in order.
    pub fn run_frame(&mut self, dt: f32) -> FrameReport {
        self.frame_timer.begin();
        self.context.time_mut().advance(dt);
        let tick = self.context.time().tick_count();

        let phases = Phase::ALL
            .into_iter()
            .map(|phase| {
                let parallel = self.context.config().parallel_for(phase);
                self.run_phase(phase, dt, parallel)
            })
            .collect();

        self.frame_timer.end();
        FrameReport { tick, phases }
    }

    /// Shut down and drop every registered system. Also runs on drop.
    pub fn teardown(&mut self) {
        self.registry.teardown(&self.context);
    }

    // ------------------------------------------------------------------
    // Entities and components
    // ------------------------------------------------------------------

    pub fn spawn(&mut self) -> Entity {
        self.context.world_mut().spawn()
    }

    /// Detach every component (notifying, newest first), then despawn.
    pub fn despawn(&mut self, entity: Entity) -> Result<(), WorldError> {
        let ids = self.context.world().component_ids(entity)?;
        for id in ids.into_iter().rev() {
            self.detach_component_id(entity, id)?;
        }
        self.context.world_mut().despawn(entity)
    }

    /// Attach a component and notify accepting systems.
    ///
    /// Replacing a component of the same type sends `Removed` for the
    /// old value before `Added` for the new one.
    pub fn attach_component<T: Component>(
        &mut self,
        entity: Entity,
        value: T,
    ) -> Result<(), WorldError> {
        if !self.context.world().is_alive(entity) {
            return Err(WorldError::DeadEntity(entity));
        }
        if self.context.world().has(entity, T::ID) {
            self.dispatch_stored(ComponentEvent::Removed, entity, T::ID);
        }
        self.context.world_mut().insert(entity, value)?;
        self.dispatch_stored(ComponentEvent::Added, entity, T::ID);
        Ok(())
    }

    pub fn detach_component<T: Component>(&mut self, entity: Entity) -> Result<bool, WorldError> {
        self.detach_component_id(entity, T::ID)
    }

    /// Notify accepting systems, then drop the component. Returns whether
    /// the entity had one.
    pub fn detach_component_id(
        &mut self,
        entity: Entity,
        id: ComponentId,
    ) -> Result<bool, WorldError> {
        if !self.context.world().is_alive(entity) {
            return Err(WorldError::DeadEntity(entity));
        }
        if !self.context.world().has(entity, id) {
            return Ok(false);
        }
        self.dispatch_stored(ComponentEvent::Removed, entity, id);
        self.context.world_mut().remove(entity, id)
    }

    /// Event bus entry point for component layers outside the built-in
    /// world. Call after the component is fully constructed and linked.
    pub fn notify_component_added(&mut self, component: &ComponentRef<'_>) -> usize {
        self.dispatch(ComponentEvent::Added, component)
    }

    /// Call before the component's memory is released.
    pub fn notify_component_removed(&mut self, component: &ComponentRef<'_>) -> usize {
        self.dispatch(ComponentEvent::Removed, component)
    }

    fn dispatch(&mut self, event: ComponentEvent, component: &ComponentRef<'_>) -> usize {
        self.counters.increment(event.counter_name(), 1);
        component_events::dispatch(event, &mut self.registry, &self.context, component)
    }

    fn dispatch_stored(&mut self, event: ComponentEvent, entity: Entity, id: ComponentId) -> usize {
        self.counters.increment(event.counter_name(), 1);
        match self.context.world().component(entity, id) {
            Some(component) => {
                component_events::dispatch(event, &mut self.registry, &self.context, &component)
            }
            None => 0,
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::define_component;
    use crate::ecs::SystemResult;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, PartialEq)]
    struct Sprite {
        frame: u32,
    }
    define_component!(Sprite, 1, "Sprite");

    struct PhaseSpy {
        seen: Arc<Mutex<Vec<Option<Phase>>>>,
    }

    impl System for PhaseSpy {
        fn update(&mut self, ctx: &EngineContext, _dt: f32) -> SystemResult {
            self.seen.lock().unwrap().push(ctx.current_phase());
            Ok(())
        }
    }

    fn engine() -> Engine {
        Engine::new(EngineConfig {
            worker_threads: 2,
            ..EngineConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn context_reports_running_phase() {
        let mut engine = engine();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for (name, phase) in [("e", Phase::Early), ("l", Phase::Lua), ("t", Phase::Late)] {
            engine
                .add_system(
                    SystemDescriptor::new(name, phase),
                    PhaseSpy {
                        seen: Arc::clone(&seen),
                    },
                )
                .unwrap();
        }

        let report = engine.run_frame(0.016);

        assert_eq!(report.tick(), 1);
        assert!(report.is_clean());
        assert_eq!(
            *seen.lock().unwrap(),
            vec![Some(Phase::Early), Some(Phase::Lua), Some(Phase::Late)]
        );
        assert_eq!(engine.context().current_phase(), None);
        assert_eq!(engine.runner_state(), RunnerState::Idle);
        assert_eq!(engine.context().time().tick_count(), 1);
    }

    #[test]
    fn attach_replace_and_detach_notify_in_order() {
        struct Log(Arc<Mutex<Vec<String>>>);
        impl System for Log {
            fn on_component_added(&mut self, _ctx: &EngineContext, c: &ComponentRef<'_>) {
                let frame = c.downcast::<Sprite>().map_or(0, |s| s.frame);
                self.0.lock().unwrap().push(format!("+{frame}"));
            }
            fn on_component_removed(&mut self, ctx: &EngineContext, c: &ComponentRef<'_>) {
                // Still linked while the notification runs.
                let linked = ctx.world().get::<Sprite>(c.entity()).map_or(0, |s| s.frame);
                self.0.lock().unwrap().push(format!("-{linked}"));
            }
        }

        let mut engine = engine();
        let log = Arc::new(Mutex::new(Vec::new()));
        engine
            .add_system(SystemDescriptor::new("log", Phase::Late), Log(Arc::clone(&log)))
            .unwrap();

        let e = engine.spawn();
        engine.attach_component(e, Sprite { frame: 1 }).unwrap();
        engine.attach_component(e, Sprite { frame: 2 }).unwrap();
        assert_eq!(engine.detach_component::<Sprite>(e), Ok(true));
        assert_eq!(engine.detach_component::<Sprite>(e), Ok(false));

        assert_eq!(*log.lock().unwrap(), vec!["+1", "-1", "+2", "-2"]);
        assert!(engine.world().get::<Sprite>(e).is_none());
    }

    #[test]
    fn despawn_detaches_every_component() {
        struct Marker;
        define_component!(Marker, 2, "Marker");

        struct Removed(Arc<Mutex<Vec<&'static str>>>);
        impl System for Removed {
            fn on_component_removed(&mut self, _ctx: &EngineContext, c: &ComponentRef<'_>) {
                self.0.lock().unwrap().push(c.name());
            }
        }

        let mut engine = engine();
        let removed = Arc::new(Mutex::new(Vec::new()));
        engine
            .add_system(
                SystemDescriptor::new("removed", Phase::Early),
                Removed(Arc::clone(&removed)),
            )
            .unwrap();

        let e = engine.spawn();
        engine.attach_component(e, Sprite { frame: 0 }).unwrap();
        engine.attach_component(e, Marker).unwrap();
        engine.despawn(e).unwrap();

        assert_eq!(*removed.lock().unwrap(), vec!["Marker", "Sprite"]);
        assert!(!engine.world().is_alive(e));
        assert_eq!(engine.despawn(e), Err(WorldError::DeadEntity(e)));
        assert_eq!(
            engine.attach_component(e, Marker),
            Err(WorldError::DeadEntity(e))
        );
    }

    #[test]
    fn resources_are_visible_to_systems() {
        struct Gravity(f32);
        struct Reader(Arc<Mutex<f32>>);
        impl System for Reader {
            fn update(&mut self, ctx: &EngineContext, _dt: f32) -> SystemResult {
                let gravity = ctx
                    .resource::<Gravity>()
                    .ok_or_else(|| anyhow::anyhow!("gravity missing"))?;
                *self.0.lock().unwrap() = gravity.0;
                Ok(())
            }
        }

        let mut engine = engine();
        let out = Arc::new(Mutex::new(0.0));
        engine
            .add_system(SystemDescriptor::new("reader", Phase::Early), Reader(Arc::clone(&out)))
            .unwrap();

        let report = engine.run_phase(Phase::Early, 0.016, false);
        assert_eq!(report.failures().len(), 1);

        engine.insert_resource(Gravity(9.8));
        assert!(engine.run_phase(Phase::Early, 0.016, false).is_clean());
        assert_eq!(*out.lock().unwrap(), 9.8);
    }

    #[test]
    fn destroy_system_runs_shutdown() {
        let engine = engine();
        let shut = Arc::new(Mutex::new(false));
        struct Flag(Arc<Mutex<bool>>);
        impl System for Flag {
            fn shutdown(&mut self, _ctx: &EngineContext) {
                *self.0.lock().unwrap() = true;
            }
        }

        engine.destroy_system(SystemInstance::new(
            SystemDescriptor::new("flag", Phase::Early),
            Flag(Arc::clone(&shut)),
        ));
        assert!(*shut.lock().unwrap());
        assert!(engine.registry().is_empty());
    }

    #[cfg(feature = "metrics")]
    #[test]
    fn metrics_track_updates_and_events() {
        struct Idle;
        impl System for Idle {}

        let mut engine = engine();
        engine
            .add_system(SystemDescriptor::new("a", Phase::Early), Idle)
            .unwrap();
        engine
            .add_system(SystemDescriptor::new("b", Phase::Early), Idle)
            .unwrap();
        let e = engine.spawn();
        engine.attach_component(e, Sprite { frame: 0 }).unwrap();

        engine.run_frame(0.016);
        engine.run_frame(0.016);

        assert_eq!(engine.counters().get("systems.updated"), 4);
        assert_eq!(engine.counters().get("jobs.dispatched"), 4);
        assert_eq!(engine.counters().get("components.added"), 1);
        assert_eq!(engine.profiler().calls("a"), 2);
        assert_eq!(engine.frame_timer().frames(), 2);
    }
}
