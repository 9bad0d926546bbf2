use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use tracing::{error, info};

use crate::store::EventStore;

const SWEEP_INTERVAL: StdDuration = StdDuration::from_secs(24 * 60 * 60);

/// Periodic retention sweep: deletes events older than `retention_days`.
/// Runs once at startup and then daily. A failing sweep is logged and
/// retried at the next tick; it never takes the server down.
pub async fn run_retention_sweep(store: Arc<dyn EventStore>, retention_days: i64) {
    let mut interval = tokio::time::interval(SWEEP_INTERVAL);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        let cutoff = Utc::now() - Duration::days(retention_days);
        match store.delete_older_than(cutoff).await {
            Ok(0) => {}
            Ok(deleted) => info!(deleted, retention_days, "pruned old events"),
            Err(err) => error!(error = %err, "retention sweep failed"),
        }
    }
}
