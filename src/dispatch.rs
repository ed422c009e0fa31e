use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Days, FixedOffset, Local, NaiveDateTime, NaiveTime, TimeDelta, TimeZone};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::state::State;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BroadcastReport {
    pub(crate) sent: usize,
    pub(crate) failed: usize,
}

/// Wall-clock source for the daily loop.
///
/// Checkpoints are local wall times, but sleeping must use real elapsed time:
/// across a DST change the two differ by the offset shift.
pub(crate) trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;

    /// The instant a local wall time refers to. An ambiguous time (clocks set
    /// back) resolves to the earlier instant; a time skipped by clocks moving
    /// forward resolves to the first instant after the gap.
    fn resolve(&self, local: NaiveDateTime) -> Option<DateTime<FixedOffset>>;
}

pub(crate) struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }

    fn resolve(&self, local: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        Local
            .from_local_datetime(&local)
            .earliest()
            .or_else(|| Local.from_local_datetime(&(local + TimeDelta::hours(1))).earliest())
            .map(|t| t.fixed_offset())
    }
}

/// Send `text` to every registered recipient. A failed send is logged and
/// does not stop delivery to the rest.
pub(crate) async fn broadcast(state: &State, text: &str) -> BroadcastReport {
    let mut report = BroadcastReport::default();
    for recipient in state.recipients.snapshot() {
        match state.send_message(&recipient, text).await {
            Ok(()) => report.sent += 1,
            Err(e) => {
                warn!(recipient = %recipient, "Broadcast delivery failed: {e}");
                report.failed += 1;
            }
        }
    }
    report
}

/// None when the weather lookup failed and the cycle was skipped.
pub(crate) async fn deliver_weather_broadcast(state: &State) -> Option<BroadcastReport> {
    let weather = match state.weather.fetch(&state.config.city).await {
        Ok(w) => w,
        Err(e) => {
            warn!(city = %state.config.city, "Skipping weather broadcast: {e}");
            return None;
        }
    };
    Some(broadcast(state, &weather.format_message()).await)
}

/// None when there was nothing to send (empty store or store error).
pub(crate) async fn deliver_content_broadcast(state: &State) -> Option<BroadcastReport> {
    let item = match state.content.random_item() {
        Ok(Some(item)) => item,
        Ok(None) => {
            debug!("Content store empty, skipping broadcast");
            return None;
        }
        Err(e) => {
            warn!("Skipping content broadcast: {e}");
            return None;
        }
    };
    Some(broadcast(state, &item.text).await)
}

/// The first checkpoint strictly after `now`: later today, or the earliest one tomorrow.
pub(crate) fn next_checkpoint(now: NaiveDateTime, checkpoints: &[NaiveTime]) -> Option<NaiveDateTime> {
    let today = now.date();
    if let Some(t) = checkpoints.iter().filter(|t| **t > now.time()).min() {
        return Some(today.and_time(*t));
    }
    let first = checkpoints.iter().min()?;
    today
        .checked_add_days(Days::new(1))
        .map(|tomorrow| tomorrow.and_time(*first))
}

pub(crate) async fn run_daily_loop(
    state: Arc<State>,
    clock: Arc<dyn Clock>,
    cancel: CancellationToken,
) {
    let mut last_fired: Option<NaiveDateTime> = None;
    loop {
        let now = clock.now();
        let local_now = now.naive_local();
        // never re-fire a checkpoint on an early wake-up or when clocks go back
        let from = match last_fired {
            Some(fired) if fired >= local_now => fired,
            _ => local_now,
        };
        let Some(target) = next_checkpoint(from, &state.config.checkpoints) else {
            error!("No checkpoints configured, daily broadcast disabled");
            return;
        };
        let Some(target_at) = clock.resolve(target) else {
            warn!(checkpoint = %target, "Checkpoint does not exist in local time, skipping");
            last_fired = Some(target);
            continue;
        };
        let wait = (target_at - now).to_std().unwrap_or(Duration::ZERO);
        debug!(next = %target_at, "Waiting for next weather checkpoint");

        tokio::select! {
            () = cancel.cancelled() => {
                info!("Daily broadcast loop stopped");
                return;
            }
            () = tokio::time::sleep(wait) => {}
        }

        if clock.now() < target_at {
            continue;
        }
        last_fired = Some(target);
        if let Some(report) = deliver_weather_broadcast(&state).await {
            info!(
                checkpoint = %target.time(),
                sent = report.sent,
                failed = report.failed,
                "Weather broadcast delivered"
            );
        }
    }
}

pub(crate) async fn run_interval_loop(state: Arc<State>, period: Duration, cancel: CancellationToken) {
    let Some(first) = Instant::now().checked_add(period) else {
        error!(?period, "Broadcast interval too large, content broadcasts disabled");
        return;
    };
    let mut ticker = tokio::time::interval_at(first, period);
    // a stall longer than one period yields a single fire, not a burst
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                info!("Interval broadcast loop stopped");
                return;
            }
            _ = ticker.tick() => {
                if let Some(report) = deliver_content_broadcast(&state).await {
                    info!(sent = report.sent, failed = report.failed, "Content broadcast delivered");
                }
            }
        }
    }
}
