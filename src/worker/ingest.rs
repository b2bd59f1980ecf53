//! Loading identifiers into an idle worker.

use super::compact_id::CompactId;
use super::scheduler::{Worker, WorkerError, WorkerState};
use lazy_static::lazy_static;
use regex::Regex;
use std::io::BufRead;
use std::time::{Duration, Instant};
use tracing::{info, warn};

lazy_static! {
    static ref CANONICAL_ID: Regex =
        Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$").unwrap();
}

/// Result of one ingestion pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    /// Identifiers added to the registry by this pass.
    pub loaded: usize,
    /// Invalid or duplicate lines.
    pub skipped: usize,
    pub elapsed: Duration,
}

/// True if `text` has the canonical 8-4-4-4-12 hex layout, any case.
pub fn is_canonical_id(text: &str) -> bool {
    CANONICAL_ID.is_match(text)
}

impl Worker {
    /// Read one identifier per line into the registry.
    ///
    /// Invalid and duplicate lines are logged and skipped. Only allowed before
    /// the worker is started; read errors are returned as they happen.
    ///
    /// The worker stays in [`WorkerState::Loading`] for the whole pass, so
    /// [`Worker::run`] cannot start in the middle of it. A shutdown during the
    /// pass stops it at the next line with [`WorkerError::Stopped`].
    pub fn load_ids<R: BufRead>(&self, reader: R) -> Result<LoadReport, WorkerError> {
        {
            let mut state = self.state.lock().unwrap();
            match *state {
                WorkerState::Idle => *state = WorkerState::Loading,
                WorkerState::Loading | WorkerState::Running | WorkerState::Draining => {
                    return Err(WorkerError::AlreadyRunning)
                }
                WorkerState::Stopped => return Err(WorkerError::Stopped),
            }
        }
        let _loading = LoadGuard(self);

        let start = Instant::now();
        let mut loaded = 0;
        let mut skipped = 0;

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let line_number = index + 1;
            let text = line.trim();

            let id = match CompactId::parse(text) {
                Ok(id) if is_canonical_id(text) => id,
                _ => {
                    warn!("Invalid UUID in line {}: {:?}", line_number, text);
                    skipped += 1;
                    continue;
                }
            };

            if self.insert_loaded(id)? {
                loaded += 1;
            } else {
                warn!("Duplicate UUID in line {}: {:?}", line_number, text);
                skipped += 1;
            }
        }

        let elapsed = start.elapsed();
        info!(
            "{} records loaded, {} skipped in {:?} ({} registered)",
            loaded,
            skipped,
            elapsed,
            self.registry.len()
        );

        Ok(LoadReport {
            loaded,
            skipped,
            elapsed,
        })
    }

    /// Insert under the state lock so nothing lands once the pass was stopped.
    fn insert_loaded(&self, id: CompactId) -> Result<bool, WorkerError> {
        match *self.state.lock().unwrap() {
            WorkerState::Loading => Ok(self.registry.insert(id)),
            WorkerState::Stopped => Err(WorkerError::Stopped),
            _ => Err(WorkerError::AlreadyRunning),
        }
    }
}

/// Returns a loading worker to idle on every exit path of the pass.
struct LoadGuard<'a>(&'a Worker);

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.0.state.lock().unwrap();
        if *state == WorkerState::Loading {
            *state = WorkerState::Idle;
        }
    }
}
