//! Background worker that fires due recurring expenses.
//!
//! Every tick the worker asks the store which users own due templates and
//! runs the same apply routine as `POST /api/recurring/apply` for each of
//! them. Firing is a compare-and-swap in the store, so the worker, the HTTP
//! trigger and other replicas never fire the same occurrence twice.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use tokio::{sync::watch, task::JoinHandle, time::MissedTickBehavior};

use crate::{error::AppError, services::recurring_service, store::LedgerStore};

/// Fire all due templates of all users once. Returns how many fired.
///
/// A failure for one user is logged and does not stop the others.
pub async fn scan_once(store: &dyn LedgerStore, now: DateTime<Utc>) -> Result<usize, AppError> {
    let users = store.users_with_due_recurring(now).await?;
    let mut fired = 0;

    for user_id in users {
        match recurring_service::apply_due(store, &user_id, now).await {
            Ok(applied) => fired += applied.len(),
            Err(e) => tracing::error!(%user_id, error = %e, "recurring scan failed for user"),
        }
    }

    Ok(fired)
}

/// Spawn the worker. It runs until `shutdown` changes or its sender is
/// dropped.
pub fn spawn_recurring_worker(
    store: Arc<dyn LedgerStore>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(interval_secs = period.as_secs(), "recurring worker started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match scan_once(store.as_ref(), Utc::now()).await {
                        Ok(0) => tracing::debug!("no recurring expenses due"),
                        Ok(fired) => tracing::info!(fired, "recurring expenses applied"),
                        Err(e) => tracing::error!(error = %e, "recurring scan failed"),
                    }
                }
                _ = shutdown.changed() => break,
            }
        }

        tracing::info!("recurring worker stopped");
    })
}
