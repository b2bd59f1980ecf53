use super::executor::{TaskExecutor, TaskOutcome, DEFAULT_ALERT_THRESHOLD};
use super::registry::Registry;
use crate::stock_api::StockApi;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Shortest accepted interval between two cycles.
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Lifecycle of a [`Worker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Constructed, accepting identifiers, loop not started.
    Idle,
    /// An ingestion pass is inserting identifiers.
    Loading,
    /// Timer armed, cycles running.
    Running,
    /// Shutdown requested, the in-flight cycle is finishing.
    Draining,
    /// Loop exited. Terminal.
    Stopped,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerState::Idle => write!(f, "idle"),
            WorkerState::Loading => write!(f, "loading"),
            WorkerState::Running => write!(f, "running"),
            WorkerState::Draining => write!(f, "draining"),
            WorkerState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Errors returned by the worker's lifecycle operations.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("worker already running")]
    AlreadyRunning,

    #[error("worker stopped")]
    Stopped,

    #[error("read error: {0}")]
    Io(#[from] std::io::Error),
}

/// Immutable worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Delay between the starts of two cycles.
    pub interval: Duration,
    /// Maximum number of checks in flight.
    pub concurrency: usize,
    /// Quantities strictly below this trigger an alert.
    pub alert_threshold: i64,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            concurrency: 1,
            alert_threshold: DEFAULT_ALERT_THRESHOLD,
        }
    }
}

/// Summary of one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub generation: u64,
    /// Registry size when the cycle's snapshot was taken.
    pub snapshot_size: usize,
    pub dispatched: usize,
    pub healthy: usize,
    pub alerted: usize,
    pub removed: usize,
    pub mismatched: usize,
    pub failed: usize,
    pub panicked: usize,
    /// Dispatching stopped early because of a shutdown request.
    pub aborted: bool,
    pub elapsed: Duration,
}

impl CycleReport {
    fn new(generation: u64, snapshot_size: usize) -> Self {
        Self {
            generation,
            snapshot_size,
            ..Default::default()
        }
    }

    fn record(&mut self, outcome: &TaskOutcome) {
        match outcome {
            TaskOutcome::Healthy => self.healthy += 1,
            TaskOutcome::Alerted => self.alerted += 1,
            TaskOutcome::Removed => self.removed += 1,
            TaskOutcome::Mismatch { .. } => self.mismatched += 1,
            TaskOutcome::Failed(_) => self.failed += 1,
        }
    }

    /// Tasks that ran to completion (with or without a panic).
    pub fn completed(&self) -> usize {
        self.healthy + self.alerted + self.removed + self.mismatched + self.failed + self.panicked
    }
}

/// Periodically re-checks every registered identifier against the stock service.
///
/// Identifiers are loaded with [`Worker::load_ids`] while idle, then
/// [`Worker::run`] drives the cycles until [`Worker::shutdown`] is called.
/// Cycles never overlap: every task of a cycle has finished before the next
/// tick is awaited.
pub struct Worker {
    pub(super) registry: Arc<Registry>,
    executor: TaskExecutor,
    interval: Duration,
    pub(super) state: Mutex<WorkerState>,
    shutdown_token: CancellationToken,
    stopped_token: CancellationToken,
    cycles_completed: AtomicU64,
    last_cycle: Mutex<Option<CycleReport>>,
}

impl Worker {
    pub fn new(api: Arc<dyn StockApi>, settings: WorkerSettings) -> Self {
        let interval = if settings.interval < MIN_INTERVAL {
            warn!(
                "Interval {:?} is below the minimum, using {:?}",
                settings.interval, MIN_INTERVAL
            );
            MIN_INTERVAL
        } else {
            settings.interval
        };
        if settings.concurrency == 0 {
            warn!("Concurrency of 0 requested, using 1");
        }

        let registry = Arc::new(Registry::new());
        let executor = TaskExecutor::new(
            api,
            Arc::clone(&registry),
            settings.concurrency,
            settings.alert_threshold,
        );

        Self {
            registry,
            executor,
            interval,
            state: Mutex::new(WorkerState::Idle),
            shutdown_token: CancellationToken::new(),
            stopped_token: CancellationToken::new(),
            cycles_completed: AtomicU64::new(0),
            last_cycle: Mutex::new(None),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn state(&self) -> WorkerState {
        *self.state.lock().unwrap()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn concurrency(&self) -> usize {
        self.executor.concurrency()
    }

    pub fn cycles_completed(&self) -> u64 {
        self.cycles_completed.load(Ordering::SeqCst)
    }

    /// Report of the most recent finished cycle.
    pub fn last_cycle(&self) -> Option<CycleReport> {
        self.last_cycle.lock().unwrap().clone()
    }

    /// Main worker loop. Returns once shutdown has drained the in-flight cycle.
    pub async fn run(&self) -> Result<(), WorkerError> {
        {
            let mut state = self.state.lock().unwrap();
            match *state {
                WorkerState::Idle => *state = WorkerState::Running,
                WorkerState::Loading | WorkerState::Running | WorkerState::Draining => {
                    return Err(WorkerError::AlreadyRunning)
                }
                WorkerState::Stopped => return Err(WorkerError::Stopped),
            }
        }
        let _stopped = StopGuard(self);

        info!(
            "Worker started: {} identifier(s), interval {:?}, {} slot(s)",
            self.registry.len(),
            self.interval,
            self.executor.concurrency()
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Skip the first immediate tick, wait for the first interval
        ticker.tick().await;

        let mut generation = 0u64;
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown_token.cancelled() => {
                    info!("Worker received shutdown signal");
                    break;
                }
                _ = ticker.tick() => {
                    generation += 1;
                    let report = self.run_cycle(generation).await;
                    self.cycles_completed.fetch_add(1, Ordering::SeqCst);
                    info!(
                        "Cycle {} done in {:?}: {} checked, {} alerted, {} removed, {} mismatched, {} failed, {} remaining",
                        report.generation,
                        report.elapsed,
                        report.completed(),
                        report.alerted,
                        report.removed,
                        report.mismatched,
                        report.failed + report.panicked,
                        self.registry.len()
                    );
                    *self.last_cycle.lock().unwrap() = Some(report);
                }
            }
        }

        Ok(())
    }

    /// Check every identifier of a registry snapshot once.
    ///
    /// Stops dispatching when shutdown is requested, but always waits for the
    /// tasks already dispatched.
    async fn run_cycle(&self, generation: u64) -> CycleReport {
        let start = Instant::now();
        let snapshot = self.registry.snapshot();
        let mut report = CycleReport::new(generation, snapshot.len());
        debug!("Cycle {} starting with {} identifier(s)", generation, snapshot.len());

        let mut tasks = JoinSet::new();
        for id in snapshot {
            let slot = tokio::select! {
                biased;
                _ = self.shutdown_token.cancelled() => {
                    info!(
                        "Shutdown requested, stopping cycle {} after {} of {} dispatches",
                        generation, report.dispatched, report.snapshot_size
                    );
                    report.aborted = true;
                    break;
                }
                slot = self.executor.acquire_slot() => slot,
            };
            match slot {
                Ok(slot) => {
                    self.executor.dispatch(id, slot, &mut tasks);
                    report.dispatched += 1;
                }
                Err(e) => {
                    error!("Execution slots unavailable: {}", e);
                    report.aborted = true;
                    break;
                }
            }
        }

        while let Some(result) = tasks.join_next().await {
            match result {
                Ok(outcome) => report.record(&outcome),
                Err(e) => {
                    error!("Stock check task failed: {}", e);
                    report.panicked += 1;
                }
            }
        }

        report.elapsed = start.elapsed();
        report
    }

    /// Request a stop and wait until the worker reached [`WorkerState::Stopped`].
    ///
    /// An idle or loading worker stops immediately. Calling it again, or from several
    /// tasks at once, is fine.
    pub async fn shutdown(&self) {
        let wait = {
            let mut state = self.state.lock().unwrap();
            match *state {
                WorkerState::Idle | WorkerState::Loading => {
                    *state = WorkerState::Stopped;
                    self.stopped_token.cancel();
                    false
                }
                WorkerState::Running => {
                    *state = WorkerState::Draining;
                    true
                }
                WorkerState::Draining => true,
                WorkerState::Stopped => false,
            }
        };

        self.shutdown_token.cancel();
        if wait {
            info!("Waiting for the current cycle to finish...");
            self.stopped_token.cancelled().await;
        }
    }
}

/// Marks the worker stopped on every exit path of the loop.
struct StopGuard<'a>(&'a Worker);

impl Drop for StopGuard<'_> {
    fn drop(&mut self) {
        *self.0.state.lock().unwrap() = WorkerState::Stopped;
        self.0.stopped_token.cancel();
        info!("Worker stopped");
    }
}
