// Wall-clock job scheduling.
//
// Two cadences: once a day at a fixed local time (the sync sweep) and a
// fixed period aligned to the clock (the counting sweep, every 10 minutes
// on :00, :10, ...). Each firing launches the job as a supervised task and
// goes straight back to sleeping, so a long job never delays the next tick.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Days, Local, NaiveTime, TimeZone};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::supervise::spawn_supervised;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Every day at this local time.
    DailyAt(NaiveTime),
    /// Every period, on multiples of the period since the Unix epoch.
    Every(Duration),
}

impl Schedule {
    /// First firing strictly after `now`.
    pub fn next_after<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> DateTime<Tz> {
        match *self {
            Schedule::DailyAt(time) => {
                let tz = now.timezone();
                let mut date = now.date_naive();
                loop {
                    // A DST gap can swallow the time on some days; try the next one.
                    if let Some(candidate) =
                        tz.from_local_datetime(&date.and_time(time)).earliest()
                    {
                        if candidate > *now {
                            return candidate;
                        }
                    }
                    date = date.checked_add_days(Days::new(1)).unwrap_or(date);
                }
            }
            Schedule::Every(period) => {
                let period_ms = period.as_millis().max(1) as i64;
                let now_ms = now.timestamp_millis();
                let next_ms = (now_ms.div_euclid(period_ms) + 1) * period_ms;
                let offset = chrono::Duration::milliseconds(next_ms - now_ms);
                now.clone() + offset
            }
        }
    }
}

/// Fire `job` on `schedule` until `shutdown` flips to true.
pub async fn run_schedule<J, Fut>(
    name: &'static str,
    schedule: Schedule,
    shutdown: watch::Receiver<bool>,
    job: J,
) where
    J: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    run_schedule_with_clock(name, schedule, shutdown, Local::now, job).await;
}

/// [`run_schedule`] reading wall-clock time from `clock`.
pub async fn run_schedule_with_clock<N, J, Fut>(
    name: &'static str,
    schedule: Schedule,
    mut shutdown: watch::Receiver<bool>,
    clock: N,
    job: J,
) where
    N: Fn() -> DateTime<Local> + Send + 'static,
    J: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    info!(job = name, ?schedule, "schedule started");
    let mut last_fire: Option<DateTime<Local>> = None;
    loop {
        let now = clock();
        // Never fire the same slot twice if the timer wakes a little early.
        let after = last_fire.filter(|last| *last > now).unwrap_or(now);
        let next = schedule.next_after(&after);
        let delay = (next - now).to_std().unwrap_or(Duration::ZERO);
        debug!(job = name, delay_secs = delay.as_secs(), "waiting for next run");
        tokio::select! {
            _ = tokio::time::sleep(delay) => {
                debug!(job = name, "schedule fired");
                last_fire = Some(next);
                spawn_supervised(name, job());
            }
            _ = shutdown.changed() => {
                info!(job = name, "schedule stopped");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn daily_fires_later_today() {
        let schedule = Schedule::DailyAt(NaiveTime::from_hms_opt(20, 0, 0).unwrap());
        assert_eq!(
            schedule.next_after(&at("2026-10-17T08:15:00Z")),
            at("2026-10-17T20:00:00Z")
        );
    }

    #[test]
    fn daily_rolls_to_tomorrow_at_or_after_the_time() {
        let schedule = Schedule::DailyAt(NaiveTime::from_hms_opt(20, 0, 0).unwrap());
        assert_eq!(
            schedule.next_after(&at("2026-10-17T20:00:00Z")),
            at("2026-10-18T20:00:00Z")
        );
        assert_eq!(
            schedule.next_after(&at("2026-12-31T23:59:59Z")),
            at("2027-01-01T20:00:00Z")
        );
    }

    #[test]
    fn every_aligns_to_period_boundaries() {
        let schedule = Schedule::Every(Duration::from_secs(600));
        assert_eq!(
            schedule.next_after(&at("2026-10-17T08:15:00Z")),
            at("2026-10-17T08:20:00Z")
        );
        assert_eq!(
            schedule.next_after(&at("2026-10-17T08:20:00Z")),
            at("2026-10-17T08:30:00Z")
        );
        assert_eq!(
            schedule.next_after(&at("2026-10-17T08:59:30Z")),
            at("2026-10-17T09:00:00Z")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn runs_job_each_period_until_shutdown() {
        let runs = Arc::new(AtomicUsize::new(0));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let counter = runs.clone();
        let anchor = Local::now();
        let started = tokio::time::Instant::now();
        let clock = move || anchor + chrono::Duration::from_std(started.elapsed()).unwrap();
        let task = tokio::spawn(run_schedule_with_clock(
            "test",
            Schedule::Every(Duration::from_secs(60)),
            shutdown_rx,
            clock,
            move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            },
        ));

        tokio::time::sleep(Duration::from_secs(60 * 3 + 1)).await;
        shutdown_tx.send(true).unwrap();
        task.await.unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;

        let fired = runs.load(Ordering::SeqCst);
        assert!((3..=4).contains(&fired), "fired {fired} times");
    }
}
