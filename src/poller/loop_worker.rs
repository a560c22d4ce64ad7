use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{db::Database, source::ListingSource};

use super::detector::{observe, Notification, Observation};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

#[derive(Debug, Clone, Copy)]
pub struct PollerConfig {
    pub interval: Duration,
    /// Delay between two count queries of the same cycle.
    pub pacing: Duration,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub checked: usize,
    pub skipped: usize,
    pub first_observations: usize,
    pub notified: usize,
    pub written: usize,
}

pub async fn polling_loop(
    db: Database,
    source: Arc<dyn ListingSource>,
    notifications: mpsc::UnboundedSender<Notification>,
    config: PollerConfig,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                // A started cycle always runs to completion.
                match run_cycle(&db, source.as_ref(), &notifications, config.pacing).await {
                    Ok(_) => {}
                    Err(err) => log_error!("poll cycle aborted: {err:#}"),
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("polling loop shutting down");
                break;
            }
        }
    }
}

/// Queries every stored entry once. Only a failure to read the entries
/// aborts the cycle; per-entry failures are logged and skipped.
pub async fn run_cycle(
    db: &Database,
    source: &dyn ListingSource,
    notifications: &mpsc::UnboundedSender<Notification>,
    pacing: Duration,
) -> Result<CycleReport> {
    let cycle_start = Instant::now();
    let watches = db
        .list_watches()
        .await
        .context("failed to load watch entries")?;

    let mut report = CycleReport::default();

    for (index, entry) in watches.into_iter().enumerate() {
        if index > 0 && !pacing.is_zero() {
            tokio::time::sleep(pacing).await;
        }
        report.checked += 1;

        let observed = match source.count(&entry.location, &entry.filters).await {
            Ok(count) => count,
            Err(err) => {
                log_warn!("count for watch {} ({}) failed: {err}", entry.id, entry.location.name);
                report.skipped += 1;
                continue;
            }
        };

        let new_count = match observe(entry.last_count, observed) {
            Observation::Unchanged => continue,
            Observation::First(count) => {
                log_debug!("first observation for watch {}: {count}", entry.id);
                report.first_observations += 1;
                count
            }
            Observation::Changed {
                old,
                new,
                direction,
            } => {
                log_info!("watch {} {direction} from {old} to {new}", entry.id);
                let notification = Notification {
                    owner_id: entry.owner_id,
                    entry: entry.clone(),
                    direction,
                    old_count: old,
                    new_count: new,
                    observed_at: Utc::now(),
                };
                if notifications.send(notification).is_err() {
                    log_warn!("notification receiver dropped, alert for watch {} lost", entry.id);
                }
                report.notified += 1;
                new
            }
        };

        match db.update_count(entry.id, new_count).await {
            Ok(true) => report.written += 1,
            Ok(false) => log_debug!("watch {} vanished during the cycle", entry.id),
            Err(err) => log_error!("failed to store count for watch {}: {err:#}", entry.id),
        }
    }

    log_debug!(
        "poll cycle finished in {}ms: {:?}",
        cycle_start.elapsed().as_millis(),
        report
    );

    Ok(report)
}
