use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::{debug, info, warn};
use ulid::Ulid;

use crate::engine::{today, Engine, EngineError};
use crate::model::SweepReport;

/// What a sweep walks: the due reservations and a per-item completion step.
#[async_trait]
pub trait CompletionSource: Send + Sync {
    /// `(reservation, room)` pairs due for completion on `today`.
    async fn due_completions(&self, today: NaiveDate) -> Vec<(Ulid, Ulid)>;

    /// `Ok(false)` means the reservation is no longer due.
    async fn try_complete(&self, id: Ulid, today: NaiveDate) -> Result<bool, EngineError>;
}

#[async_trait]
impl CompletionSource for Engine {
    async fn due_completions(&self, today: NaiveDate) -> Vec<(Ulid, Ulid)> {
        self.collect_due_completions(today).await
    }

    async fn try_complete(&self, id: Ulid, today: NaiveDate) -> Result<bool, EngineError> {
        self.complete_if_due(id, today).await
    }
}

/// Complete every approved reservation whose stay ended before `today`.
///
/// A reservation that a concurrent actor moved out of `approved` first is
/// skipped silently. Any other per-item failure is logged and reported; the
/// rest of the batch still runs.
pub async fn sweep<S: CompletionSource + ?Sized>(source: &S, today: NaiveDate) -> SweepReport {
    let mut report = SweepReport::default();
    for (id, room_id) in source.due_completions(today).await {
        match source.try_complete(id, today).await {
            Ok(true) => report.completed += 1,
            Ok(false) => debug!("sweep skip {id}: no longer due"),
            Err(e) => {
                warn!("sweep failed for reservation {id} on room {room_id}: {e}");
                metrics::counter!(crate::observability::SWEEP_FAILURES_TOTAL).increment(1);
                report.failed.push((id, e.to_string()));
            }
        }
    }
    if report.completed > 0 || !report.failed.is_empty() {
        info!(
            "sweep for {today}: {} completed, {} failed",
            report.completed,
            report.failed.len()
        );
    }
    report
}

/// Background task that runs `sweep` on a fixed interval.
pub async fn run_sweeper(engine: Arc<Engine>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        sweep(engine.as_ref(), today()).await;
    }
}

/// Background task that compacts the WAL once enough appends pile up.
pub async fn run_compactor(engine: Arc<Engine>, threshold: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(60));
    loop {
        interval.tick().await;
        let appends = engine.wal_appends_since_compact().await;
        if appends < threshold {
            continue;
        }
        match engine.compact_wal().await {
            Ok(()) => info!("compacted WAL after {appends} appends"),
            Err(e) => warn!("WAL compaction failed: {e}"),
        }
    }
}
