//! Fixed daily triggers for collection runs
//!
//! Fires at the configured local hours (08:00, 16:00 and 23:00 by default).
//! Run errors and overlaps are logged; the loop itself only stops on the
//! shutdown signal.

use std::sync::Arc;

use chrono::{DateTime, Days, Local, NaiveDate, NaiveDateTime, NaiveTime};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::collector::Collector;
use crate::error::CollectorError;
use crate::session::SessionBroker;

/// Earliest configured hour strictly after `now`, today or tomorrow
///
/// Returns `None` when `hours` has no valid hour.
#[must_use]
pub fn next_trigger_naive(now: NaiveDateTime, hours: &[u32]) -> Option<NaiveDateTime> {
    let mut sorted: Vec<u32> = hours.iter().copied().filter(|h| *h < 24).collect();
    sorted.sort_unstable();
    sorted.dedup();

    let at = |day: NaiveDate, hour: u32| NaiveTime::from_hms_opt(hour, 0, 0).map(|t| day.and_time(t));

    let today = now.date();
    if let Some(next) = sorted.iter().filter_map(|h| at(today, *h)).find(|t| *t > now) {
        return Some(next);
    }
    let tomorrow = today.checked_add_days(Days::new(1))?;
    sorted.first().and_then(|h| at(tomorrow, *h))
}

/// [`next_trigger_naive`] in local time
///
/// A trigger that falls into a DST gap is moved to the next candidate.
#[must_use]
pub fn next_trigger(now: DateTime<Local>, hours: &[u32]) -> Option<DateTime<Local>> {
    let mut cursor = now.naive_local();
    // At most one gap per day can swallow a trigger; a few steps suffice
    for _ in 0..8 {
        let candidate = next_trigger_naive(cursor, hours)?;
        if let Some(local) = candidate.and_local_timezone(Local).earliest() {
            return Some(local);
        }
        cursor = candidate;
    }
    None
}

/// Start the trigger loop on its own task
///
/// With `run_on_startup` one run happens immediately. Setting the watch
/// value to `true` (or dropping the sender) stops the loop; a run already
/// in progress is allowed to finish.
pub fn spawn<B>(
    collector: Arc<Collector<B>>,
    hours: Vec<u32>,
    run_on_startup: bool,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()>
where
    B: SessionBroker + 'static,
{
    tokio::spawn(async move {
        if run_on_startup {
            info!("Running initial collection");
            trigger(&collector).await;
        }

        loop {
            let now = Local::now();
            let Some(next) = next_trigger(now, &hours) else {
                warn!("No valid schedule hours configured, scheduler idle");
                let _ = shutdown.changed().await;
                break;
            };
            let wait = (next - now).to_std().unwrap_or_default();
            info!("Next scheduled collection at {}", next.format("%Y-%m-%d %H:%M"));

            tokio::select! {
                () = tokio::time::sleep(wait) => trigger(&collector).await,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("Scheduler stopped");
    })
}

async fn trigger<B: SessionBroker>(collector: &Collector<B>) {
    match collector.run().await {
        Ok(report) if report.is_success() => info!("Scheduled run finished: {}", report.summary()),
        Ok(report) => warn!("Scheduled run finished: {}", report.summary()),
        Err(CollectorError::RunInProgress) => warn!("Scheduled run skipped: a run is already in progress"),
        Err(e) => error!("Scheduled run failed: {e}"),
    }
}
