//! Worker pool draining a work queue.
//!
//! Every unit is an independent task. The only coordination between units is
//! the queue's atomic pop; each unit ends when the queue reports empty.
//! Per-item failures are logged and counted by the unit that hit them; the
//! item is not re-queued.

use std::future::Future;
use std::sync::Arc;

use fileflows_core::{QueueKey, RemoteError, WorkQueue};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Result of processing one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    /// The remote operation was performed.
    Done,
    /// Nothing needed doing for this item.
    Skipped,
}

/// Counters for one worker unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitReport {
    pub processed: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Set when the unit stopped because the queue backend failed.
    pub queue_error: Option<String>,
}

/// Aggregated counters for a pool run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolReport {
    pub units: usize,
    pub processed: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Units that stopped on a queue backend error
    pub queue_errors: usize,
    /// Units that panicked
    pub panicked: usize,
}

impl PoolReport {
    fn absorb(&mut self, unit: UnitReport) {
        self.processed += unit.processed;
        self.succeeded += unit.succeeded;
        self.skipped += unit.skipped;
        self.failed += unit.failed;
        if unit.queue_error.is_some() {
            self.queue_errors += 1;
        }
    }

    /// Whether every unit ran to an empty queue.
    pub fn completed(&self) -> bool {
        self.queue_errors == 0 && self.panicked == 0
    }
}

/// Spawn `workers` units (at least one) and wait for all of them.
///
/// `unit` receives the unit index and returns the unit's future.
pub async fn run_pool<F, Fut>(workers: usize, unit: F) -> PoolReport
where
    F: Fn(usize) -> Fut,
    Fut: Future<Output = UnitReport> + Send + 'static,
{
    let workers = workers.max(1);
    let mut set = JoinSet::new();
    for index in 0..workers {
        set.spawn(unit(index));
    }

    let mut report = PoolReport {
        units: workers,
        ..Default::default()
    };
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(unit_report) => report.absorb(unit_report),
            Err(e) => {
                error!("Worker unit panicked: {}", e);
                report.panicked += 1;
            }
        }
    }

    info!(
        units = report.units,
        processed = report.processed,
        succeeded = report.succeeded,
        skipped = report.skipped,
        failed = report.failed,
        "Worker pool finished"
    );
    report
}

/// Unit loop: pop an item, run `work` on it, repeat until the queue is empty.
pub async fn drain_queue<W, Fut>(
    unit: usize,
    queue: Arc<dyn WorkQueue>,
    key: QueueKey,
    work: W,
) -> UnitReport
where
    W: Fn(String) -> Fut,
    Fut: Future<Output = Result<ItemOutcome, RemoteError>>,
{
    let mut report = UnitReport::default();
    loop {
        let item = match queue.pop_one(&key).await {
            Ok(Some(item)) => item,
            Ok(None) => {
                debug!(unit, processed = report.processed, "Queue empty, unit done");
                break;
            }
            Err(e) => {
                error!(unit, "Work queue failed, stopping unit: {}", e);
                report.queue_error = Some(e.to_string());
                break;
            }
        };

        report.processed += 1;
        match work(item.clone()).await {
            Ok(ItemOutcome::Done) => report.succeeded += 1,
            Ok(ItemOutcome::Skipped) => report.skipped += 1,
            Err(e) => {
                warn!(unit, item = %item, error = ?e, "Item failed and was dropped from the queue");
                report.failed += 1;
            }
        }
    }
    report
}
