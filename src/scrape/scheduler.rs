// src/scrape/scheduler.rs
//! Repeating-run scheduler: at most one armed timer per process, explicit
//! start/stop/status/run-now lifecycle, state owned by the scheduler object
//! so tests can run isolated instances.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeDelta, Utc};

use crate::scrape::types::RunSummary;
use crate::scrape::{self, ScrapeContext};

/// Supported repeat intervals. Unrecognized input falls back to hourly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    #[default]
    Hourly,
    Daily,
    Weekly,
}

impl Interval {
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "daily" => Interval::Daily,
            "weekly" => Interval::Weekly,
            _ => Interval::Hourly,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Interval::Hourly => "hourly",
            Interval::Daily => "daily",
            Interval::Weekly => "weekly",
        }
    }

    pub fn secs(self) -> u64 {
        match self {
            Interval::Hourly => 60 * 60,
            Interval::Daily => 24 * 60 * 60,
            Interval::Weekly => 7 * 24 * 60 * 60,
        }
    }

    fn sleep_duration(self) -> std::time::Duration {
        std::time::Duration::from_secs(self.secs())
    }

    fn delta(self) -> TimeDelta {
        TimeDelta::seconds(self.secs() as i64)
    }
}

#[derive(Debug)]
struct SchedulerInner {
    running: bool,
    interval: Interval,
    last_run: Option<DateTime<Utc>>,
    /// Bumped on every start/stop. A sleeping timer task compares its own
    /// epoch after waking; a stale task exits without firing, so stop() never
    /// has to abort anything and an in-flight run always completes.
    epoch: u64,
}

/// Snapshot reported by status queries. `next_run` is `now + interval` while
/// running, not the armed timer's exact deadline.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStatus {
    pub status: &'static str,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
}

pub struct ScrapeScheduler {
    ctx: Arc<ScrapeContext>,
    default_interval: Interval,
    inner: Arc<Mutex<SchedulerInner>>,
}

impl ScrapeScheduler {
    pub fn new(ctx: Arc<ScrapeContext>, default_interval: Interval) -> Self {
        Self {
            ctx,
            default_interval,
            inner: Arc::new(Mutex::new(SchedulerInner {
                running: false,
                interval: default_interval,
                last_run: None,
                epoch: 0,
            })),
        }
    }

    pub fn default_interval(&self) -> Interval {
        self.default_interval
    }

    /// Arm the repeating timer. Idempotent: a second start while running
    /// changes nothing and reports the current state (`started == false`).
    pub fn start(&self, interval: Interval) -> (bool, SchedulerStatus) {
        let epoch = {
            let mut inner = self.inner.lock().expect("scheduler mutex poisoned");
            if inner.running {
                return (false, Self::status_locked(&inner));
            }
            inner.running = true;
            inner.interval = interval;
            inner.epoch += 1;
            inner.epoch
        };

        let ctx = Arc::clone(&self.ctx);
        let state = Arc::clone(&self.inner);
        tokio::spawn(timer_loop(ctx, state, epoch));

        tracing::info!(interval = interval.as_str(), "scrape scheduler started");
        (true, self.status())
    }

    /// Disarm the timer. The pending tick becomes a no-op; a run already in
    /// flight is left to finish. Idempotent while stopped.
    pub fn stop(&self) {
        let mut inner = self.inner.lock().expect("scheduler mutex poisoned");
        if inner.running {
            tracing::info!("scrape scheduler stopped");
        }
        inner.running = false;
        inner.epoch += 1;
    }

    pub fn status(&self) -> SchedulerStatus {
        let inner = self.inner.lock().expect("scheduler mutex poisoned");
        Self::status_locked(&inner)
    }

    pub fn interval(&self) -> Interval {
        self.inner
            .lock()
            .expect("scheduler mutex poisoned")
            .interval
    }

    /// Execute one orchestrated run immediately, regardless of scheduler
    /// state. Does not touch the armed timer's countdown.
    pub async fn run_now(&self) -> anyhow::Result<RunSummary> {
        {
            let mut inner = self.inner.lock().expect("scheduler mutex poisoned");
            inner.last_run = Some(Utc::now());
        }
        scrape::run_and_record(&self.ctx).await
    }

    fn status_locked(inner: &SchedulerInner) -> SchedulerStatus {
        let next_run = inner.running.then(|| Utc::now() + inner.interval.delta());
        SchedulerStatus {
            status: if inner.running { "running" } else { "stopped" },
            last_run: inner.last_run,
            next_run,
        }
    }
}

async fn timer_loop(ctx: Arc<ScrapeContext>, state: Arc<Mutex<SchedulerInner>>, epoch: u64) {
    loop {
        let interval = {
            let inner = state.lock().expect("scheduler mutex poisoned");
            if !inner.running || inner.epoch != epoch {
                return;
            }
            inner.interval
        };

        tokio::time::sleep(interval.sleep_duration()).await;

        {
            let mut inner = state.lock().expect("scheduler mutex poisoned");
            if !inner.running || inner.epoch != epoch {
                return;
            }
            inner.last_run = Some(Utc::now());
        }

        tracing::info!(interval = interval.as_str(), "running scheduled scrape");
        if let Err(e) = scrape::run_and_record(&ctx).await {
            tracing::error!(error = ?e, "scheduled scrape run failed");
        }
        // Loop re-arms for the same interval iff still running.
    }
}
