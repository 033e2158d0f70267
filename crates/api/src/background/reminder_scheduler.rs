//! In-process trigger for the reminder scanner.
//!
//! Deployments without an external cron set `REMINDER_SCAN_INTERVAL_SECS`
//! and let this loop call [`ReminderScanner::run_pass`] on a fixed interval.

use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::nudge::ReminderScanner;

/// Run the reminder scan loop until `cancel` is triggered.
pub async fn run(scanner: ReminderScanner, every: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = every.as_secs(), "Reminder scheduler started");

    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Reminder scheduler stopping");
                break;
            }
            _ = interval.tick() => {
                let now = Utc::now();
                match scanner.run_pass(now.date_naive(), now).await {
                    Ok(report) if report.candidates == 0 => {
                        tracing::debug!("Reminder scheduler: nothing due");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::error!(error = %e, "Reminder scheduler: scan failed");
                    }
                }
            }
        }
    }
}
