//! Periodic compaction of stale action log history.
//!
//! Every tick lists the owners that still have active records older than the
//! compaction age and compacts each in turn. A failing owner is logged and
//! skipped; the sweep carries on with the next one.

use std::time::Duration;

use doit_core::action_log::{ActionLogService, CompactionReport};
use tokio_util::sync::CancellationToken;

/// Run the compaction loop until `cancel` is triggered.
pub async fn run(service: ActionLogService, interval: Duration, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = interval.as_secs(),
        compaction_age_days = service.config().compaction_age.num_days(),
        "Action log compaction job started"
    );

    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Action log compaction job stopping");
                break;
            }
            _ = ticker.tick() => {
                sweep(&service).await;
            }
        }
    }
}

/// One pass over every owner with stale records. Returns the summed report.
pub async fn sweep(service: &ActionLogService) -> CompactionReport {
    let owners = match service.owners_due_for_compaction().await {
        Ok(owners) => owners,
        Err(e) => {
            tracing::error!(error = %e, "Action log compaction: listing owners failed");
            return CompactionReport::default();
        }
    };

    if owners.is_empty() {
        tracing::debug!("Action log compaction: nothing to compact");
        return CompactionReport::default();
    }

    let mut total = CompactionReport::default();
    for user_id in owners {
        match service.compact_old_actions(user_id).await {
            Ok(report) => {
                total.stacks += report.stacks;
                total.failed_stacks += report.failed_stacks;
                total.merged_days += report.merged_days;
                total.merged_records += report.merged_records;
                total.flagged_records += report.flagged_records;
            }
            Err(e) => {
                tracing::error!(user_id, error = %e, "Action log compaction failed for owner");
            }
        }
    }

    tracing::info!(
        stacks = total.stacks,
        failed_stacks = total.failed_stacks,
        merged_days = total.merged_days,
        flagged_records = total.flagged_records,
        "Action log compaction sweep finished"
    );
    total
}
