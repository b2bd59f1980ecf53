//! Periodic stock checking engine.
//!
//! The [`Worker`] owns the identifier [`Registry`], wakes up every interval,
//! checks each registered identifier through a bounded [`TaskExecutor`] and
//! drops identifiers the stock service does not know.

mod compact_id;
mod executor;
mod ingest;
mod registry;
mod scheduler;
#[cfg(test)]
mod test_support;

pub use compact_id::{CompactId, InvalidIdentifier, CANONICAL_LEN};
pub use executor::{TaskExecutor, TaskOutcome, DEFAULT_ALERT_THRESHOLD};
pub use ingest::{is_canonical_id, LoadReport};
pub use registry::Registry;
pub use scheduler::{CycleReport, Worker, WorkerError, WorkerSettings, WorkerState, MIN_INTERVAL};
