//! Phase runner
//!
//! Runs one phase of one frame: picks the active systems of that phase,
//! then either calls their `update`s in registration order on the
//! calling thread, or hands one job per system to the job queue and
//! waits for the whole batch. Either way `run` returns only after every
//! selected `update` has finished.
//!
//! Systems in a parallel phase are expected to touch disjoint
//! components. Outside strict access mode nothing checks this.

use crate::context::EngineContext;
use crate::ecs::system_registry::PhaseMember;
use crate::ecs::{Phase, SystemHandle, SystemRegistry};
use crate::jobs::{Job, JobFailure, JobQueue};
use std::time::{Duration, Instant};
use tracing::{debug, debug_span, error};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RunnerState {
    Idle,
    Running(Phase),
}

/// A system whose `update` returned an error or panicked.
#[derive(Debug, Clone)]
pub struct SystemFailure {
    pub handle: SystemHandle,
    pub system: String,
    pub phase: Phase,
    pub failure: JobFailure,
}

/// Per-system wall time of one update call.
#[derive(Debug, Clone)]
pub struct SystemTiming {
    pub handle: SystemHandle,
    pub system: String,
    pub elapsed: Duration,
}

/// What happened during one `run_phase` call.
#[derive(Debug, Clone)]
pub struct PhaseReport {
    phase: Phase,
    parallel: bool,
    elapsed: Duration,
    timings: Vec<SystemTiming>,
    failures: Vec<SystemFailure>,
}

impl PhaseReport {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Number of `update` calls made.
    pub fn invoked(&self) -> usize {
        self.timings.len()
    }

    /// Whether the run actually fanned out across workers.
    pub fn parallel(&self) -> bool {
        self.parallel
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Timings in registration order.
    pub fn timings(&self) -> &[SystemTiming] {
        &self.timings
    }

    pub fn failures(&self) -> &[SystemFailure] {
        &self.failures
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Drives `Idle -> Running(phase) -> Idle`, once per `run` call.
#[derive(Debug)]
pub struct PhaseRunner {
    state: RunnerState,
    runs: u64,
}

impl PhaseRunner {
    pub fn new() -> Self {
        Self {
            state: RunnerState::Idle,
            runs: 0,
        }
    }

    pub fn state(&self) -> RunnerState {
        self.state
    }

    /// Completed phase runs since creation.
    pub fn runs(&self) -> u64 {
        self.runs
    }

    /// Run every active system of `phase`.
    ///
    /// Fans out only when `parallel` is requested, the phase is not
    /// serial, more than one system is eligible, and the queue has more
    /// than one worker.
    ///
    /// # Panics
    ///
    /// If the runner is not idle.
    pub fn run(
        &mut self,
        phase: Phase,
        dt: f32,
        parallel: bool,
        registry: &mut SystemRegistry,
        ctx: &EngineContext,
        jobs: &JobQueue,
    ) -> PhaseReport {
        assert_eq!(
            self.state,
            RunnerState::Idle,
            "run_phase({phase}) entered while the phase runner is busy"
        );
        self.state = RunnerState::Running(phase);

        let span = debug_span!("run_phase", %phase, dt);
        let _enter = span.enter();
        let start = Instant::now();

        let members = registry.phase_members_mut(phase);
        let fan_out = parallel && !phase.is_serial() && members.len() > 1 && jobs.worker_count() > 1;

        let mut handles = Vec::with_capacity(members.len());
        let batch: Vec<Job<'_>> = members
            .into_iter()
            .map(|PhaseMember { handle, name, system }| {
                handles.push(handle);
                Job::new(name, move || system.update(ctx, dt))
            })
            .collect();

        let outcome = if fan_out {
            debug!(systems = batch.len(), "dispatching phase batch");
            jobs.run_scoped(batch)
        } else {
            JobQueue::run_inline(batch)
        };

        let mut timings = Vec::with_capacity(outcome.completed());
        let mut failures = Vec::new();
        for report in outcome.into_reports() {
            let handle = handles[report.index];
            if let Some(failure) = report.failure {
                error!(system = %report.label, %phase, %failure, "system update failed");
                failures.push(SystemFailure {
                    handle,
                    system: report.label.clone(),
                    phase,
                    failure,
                });
            }
            timings.push(SystemTiming {
                handle,
                system: report.label,
                elapsed: report.elapsed,
            });
        }

        self.runs += 1;
        self.state = RunnerState::Idle;
        PhaseReport {
            phase,
            parallel: fan_out,
            elapsed: start.elapsed(),
            timings,
            failures,
        }
    }
}

impl Default for PhaseRunner {
    fn default() -> Self {
        Self::new()
    }
}
