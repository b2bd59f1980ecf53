//! Bounded execution of stock checks.
//!
//! Each check holds one execution slot (a semaphore permit) for its whole
//! lifetime. The permit is moved into the spawned task and dropped when the
//! task ends, whichever way it ends, so the slot can never leak.

use super::compact_id::CompactId;
use super::registry::Registry;
use crate::stock_api::StockApi;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Quantity below which a low-stock alert is posted.
pub const DEFAULT_ALERT_THRESHOLD: i64 = 5;

/// What a single check decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Stock at or above the threshold.
    Healthy,
    /// Stock low and the alert was accepted.
    Alerted,
    /// The service does not know the identifier; it was dropped from the registry.
    Removed,
    /// The service answered for a different identifier. Nothing changes.
    Mismatch { returned: String },
    /// Transient failure (fetch or alert). The identifier stays for the next cycle.
    Failed(String),
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskOutcome::Healthy => write!(f, "healthy"),
            TaskOutcome::Alerted => write!(f, "alerted"),
            TaskOutcome::Removed => write!(f, "removed"),
            TaskOutcome::Mismatch { returned } => write!(f, "mismatch ({})", returned),
            TaskOutcome::Failed(msg) => write!(f, "failed ({})", msg),
        }
    }
}

/// Runs one check-and-alert unit per identifier under a concurrency bound.
#[derive(Clone)]
pub struct TaskExecutor {
    api: Arc<dyn StockApi>,
    registry: Arc<Registry>,
    slots: Arc<Semaphore>,
    concurrency: usize,
    alert_threshold: i64,
}

impl TaskExecutor {
    /// `concurrency` is the number of execution slots and must be at least 1.
    pub fn new(
        api: Arc<dyn StockApi>,
        registry: Arc<Registry>,
        concurrency: usize,
        alert_threshold: i64,
    ) -> Self {
        let concurrency = concurrency.max(1);
        Self {
            api,
            registry,
            slots: Arc::new(Semaphore::new(concurrency)),
            concurrency,
            alert_threshold,
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn alert_threshold(&self) -> i64 {
        self.alert_threshold
    }

    /// Slots not held by a running check.
    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }

    /// Wait for a free execution slot.
    ///
    /// Only fails if the semaphore was closed, which this type never does.
    pub async fn acquire_slot(&self) -> Result<OwnedSemaphorePermit, AcquireError> {
        Arc::clone(&self.slots).acquire_owned().await
    }

    /// Spawn the check for `id` into `tasks`, holding `slot` until it finishes.
    pub fn dispatch(
        &self,
        id: CompactId,
        slot: OwnedSemaphorePermit,
        tasks: &mut JoinSet<TaskOutcome>,
    ) {
        let executor = self.clone();
        tasks.spawn(async move {
            let _slot = slot;
            executor.check(id).await
        });
    }

    /// Fetch the item, alert if it runs low and drop unknown identifiers.
    ///
    /// Makes at most one fetch and one alert call; never retries.
    pub async fn check(&self, id: CompactId) -> TaskOutcome {
        let uuid = id.to_string();

        let item = match self.api.fetch_item(&uuid).await {
            Ok(item) => item,
            Err(e) if e.is_not_found() => return self.remove(&id),
            Err(e) => {
                warn!("API error fetching {}: {}", uuid, e);
                return TaskOutcome::Failed(e.to_string());
            }
        };

        if CompactId::parse(&item.uuid).ok() != Some(id) {
            warn!(
                "API returned wrong item, expected {:?}, got {:?}",
                uuid, item.uuid
            );
            return TaskOutcome::Mismatch {
                returned: item.uuid,
            };
        }

        if item.quantity >= self.alert_threshold {
            debug!("Item {} has {} in stock", uuid, item.quantity);
            return TaskOutcome::Healthy;
        }

        match self.api.post_alert(&uuid).await {
            Ok(()) => {
                info!(
                    "Low stock alert sent for {} ({}: {} left)",
                    uuid, item.name, item.quantity
                );
                TaskOutcome::Alerted
            }
            Err(e) if e.is_not_found() => self.remove(&id),
            Err(e) => {
                warn!("API error posting alert for {}: {}", uuid, e);
                TaskOutcome::Failed(e.to_string())
            }
        }
    }

    fn remove(&self, id: &CompactId) -> TaskOutcome {
        info!("API indicated UUID {:?} not found, removing", id.to_string());
        self.registry.remove(id);
        TaskOutcome::Removed
    }
}
