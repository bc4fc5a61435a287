//! Job queue
//!
//! A fixed pool of worker threads that runs batches of independent jobs
//! and joins them. Two entry points share the same failure handling:
//!
//! - [`JobQueue::submit_batch`] + [`JobQueue::join`] for owned
//!   (`'static`) jobs; submission never blocks.
//! - [`JobQueue::run_scoped`] for jobs that borrow from the caller's
//!   stack. It forks and joins in one call, which is what the phase
//!   runner uses to lend `&mut` systems to workers.
//!
//! Every job runs under `catch_unwind`. A job that returns `Err` or
//! panics is recorded in the batch outcome and never stops its siblings.
//! There is no priority, cancellation or timeout: a job that never
//! returns blocks its join forever.

use rayon::{ThreadPool, ThreadPoolBuilder};
use std::any::Any;
use std::fmt;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

type Work<'s> = Box<dyn FnOnce() -> anyhow::Result<()> + Send + 's>;

/// A labelled unit of work.
pub struct Job<'s> {
    label: String,
    work: Work<'s>,
}

impl<'s> Job<'s> {
    pub fn new<F>(label: impl Into<String>, work: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 's,
    {
        Self {
            label: label.into(),
            work: Box::new(work),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    fn run(self, index: usize) -> JobReport {
        let Job { label, work } = self;
        let start = Instant::now();
        let failure = match panic::catch_unwind(AssertUnwindSafe(work)) {
            Ok(Ok(())) => None,
            Ok(Err(err)) => Some(JobFailure::Error(format!("{err:#}"))),
            Err(payload) => Some(JobFailure::Panic(panic_message(payload.as_ref()))),
        };
        JobReport {
            index,
            label,
            elapsed: start.elapsed(),
            failure,
        }
    }
}

impl fmt::Debug for Job<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job").field("label", &self.label).finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Why a job did not complete successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobFailure {
    Error(String),
    Panic(String),
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobFailure::Error(msg) => write!(f, "returned error: {msg}"),
            JobFailure::Panic(msg) => write!(f, "panicked: {msg}"),
        }
    }
}

/// Completion record for one job of a batch.
#[derive(Debug, Clone)]
pub struct JobReport {
    /// Position of the job in the submitted batch.
    pub index: usize,
    pub label: String,
    pub elapsed: Duration,
    pub failure: Option<JobFailure>,
}

/// Result of joining a batch. Reports are ordered by submission index.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    reports: Vec<JobReport>,
}

impl BatchOutcome {
    fn from_reports(mut reports: Vec<JobReport>) -> Self {
        reports.sort_by_key(|report| report.index);
        Self { reports }
    }

    /// Number of jobs that ran to completion, successfully or not.
    pub fn completed(&self) -> usize {
        self.reports.len()
    }

    pub fn is_success(&self) -> bool {
        self.reports.iter().all(|report| report.failure.is_none())
    }

    pub fn failures(&self) -> impl Iterator<Item = &JobReport> {
        self.reports.iter().filter(|report| report.failure.is_some())
    }

    pub fn reports(&self) -> &[JobReport] {
        &self.reports
    }

    pub fn into_reports(self) -> Vec<JobReport> {
        self.reports
    }
}

/// Ticket for a batch submitted with [`JobQueue::submit_batch`].
#[must_use = "a submitted batch must be joined"]
pub struct BatchHandle {
    id: u64,
    state: Arc<BatchState>,
}

impl BatchHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn len(&self) -> usize {
        self.state.len
    }

    pub fn is_empty(&self) -> bool {
        self.state.len == 0
    }
}

impl fmt::Debug for BatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchHandle")
            .field("id", &self.id)
            .field("len", &self.state.len)
            .finish()
    }
}

struct BatchState {
    len: usize,
    pending: Mutex<usize>,
    done: Condvar,
    reports: Mutex<Vec<JobReport>>,
}

impl BatchState {
    fn new(len: usize) -> Self {
        Self {
            len,
            pending: Mutex::new(len),
            done: Condvar::new(),
            reports: Mutex::new(Vec::with_capacity(len)),
        }
    }

    fn complete(&self, report: JobReport) {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(report);
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        *pending -= 1;
        if *pending == 0 {
            self.done.notify_all();
        }
    }

    fn wait(&self) -> Vec<JobReport> {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        while *pending > 0 {
            pending = self
                .done
                .wait(pending)
                .unwrap_or_else(PoisonError::into_inner);
        }
        drop(pending);
        std::mem::take(&mut *self.reports.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

#[derive(Debug, Error)]
pub enum JobQueueError {
    #[error("failed to start {workers} worker threads")]
    PoolBuild {
        workers: usize,
        #[source]
        source: rayon::ThreadPoolBuildError,
    },
}

/// Fixed-size worker pool with batch fork-join.
///
/// Joining from inside one of the queue's own jobs can deadlock when all
/// workers are busy; joins belong on the frame loop thread.
pub struct JobQueue {
    pool: ThreadPool,
    workers: usize,
    next_batch: AtomicU64,
}

impl JobQueue {
    /// Start `workers` threads. `0` picks one per available core.
    pub fn new(workers: usize) -> Result<Self, JobQueueError> {
        let workers = if workers == 0 {
            std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1)
        } else {
            workers
        };

        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("cadence-worker-{i}"))
            .build()
            .map_err(|source| JobQueueError::PoolBuild { workers, source })?;

        debug!(workers, "job queue started");
        Ok(Self {
            pool,
            workers,
            next_batch: AtomicU64::new(0),
        })
    }

    pub fn worker_count(&self) -> usize {
        self.workers
    }

    /// Enqueue every job of the batch and return immediately.
    pub fn submit_batch(&self, jobs: Vec<Job<'static>>) -> BatchHandle {
        let id = self.next_batch.fetch_add(1, Ordering::Relaxed);
        let state = Arc::new(BatchState::new(jobs.len()));
        debug!(batch = id, jobs = jobs.len(), "submitting batch");

        for (index, job) in jobs.into_iter().enumerate() {
            let state = Arc::clone(&state);
            self.pool.spawn(move || {
                let report = job.run(index);
                state.complete(report);
            });
        }

        BatchHandle { id, state }
    }

    /// Block until every job of `handle`'s batch has finished.
    pub fn join(&self, handle: BatchHandle) -> BatchOutcome {
        let reports = handle.state.wait();
        debug!(batch = handle.id, jobs = reports.len(), "batch joined");
        BatchOutcome::from_reports(reports)
    }

    /// Run borrowed jobs on the pool and return once all have finished.
    pub fn run_scoped<'s>(&self, jobs: Vec<Job<'s>>) -> BatchOutcome {
        let reports = Mutex::new(Vec::with_capacity(jobs.len()));
        self.pool.scope(|scope| {
            for (index, job) in jobs.into_iter().enumerate() {
                let reports = &reports;
                scope.spawn(move |_| {
                    let report = job.run(index);
                    reports
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push(report);
                });
            }
        });
        BatchOutcome::from_reports(reports.into_inner().unwrap_or_else(PoisonError::into_inner))
    }

    /// Run jobs one after another on the calling thread, in order.
    pub fn run_inline<'s>(jobs: Vec<Job<'s>>) -> BatchOutcome {
        let reports = jobs
            .into_iter()
            .enumerate()
            .map(|(index, job)| job.run(index))
            .collect();
        BatchOutcome::from_reports(reports)
    }
}

impl fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobQueue")
            .field("workers", &self.workers)
            .finish()
    }
}
