use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Local};
use log::{debug, error, info};
use tokio::time::{interval_at, sleep, Instant, Interval, MissedTickBehavior};

use crate::modimpl::config::Schedule;
use crate::modimpl::healthstatus::HealthTracker;
use crate::modimpl::runreport::RunReport;
use crate::modimpl::transferpipeline::TransferPipeline;

/// Waits for the next moment a run is due.
pub enum Ticker {
    Interval(Interval),
    Cron(cron::Schedule),
}

impl Ticker {
    /// Interval ticks start one period from now; ticks missed while a run is
    /// still going are dropped instead of fired back to back.
    pub fn new(schedule: &Schedule) -> Self {
        match schedule {
            Schedule::Interval(period) => {
                let mut interval = interval_at(Instant::now() + *period, *period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                Ticker::Interval(interval)
            }
            Schedule::Cron(schedule) => Ticker::Cron(schedule.as_ref().clone()),
        }
    }

    pub async fn tick(&mut self) -> Result<()> {
        match self {
            Ticker::Interval(interval) => {
                interval.tick().await;
                Ok(())
            }
            Ticker::Cron(schedule) => {
                let delay = next_delay(schedule, Local::now())
                    .ok_or_else(|| anyhow!("cron schedule '{}' has no upcoming run", schedule))?;
                sleep(delay).await;
                Ok(())
            }
        }
    }
}

/// Time from `now` until the next cron occurrence.
pub fn next_delay(schedule: &cron::Schedule, now: DateTime<Local>) -> Option<Duration> {
    let next = schedule.after(&now).next()?;
    Some((next - now).to_std().unwrap_or(Duration::ZERO))
}

/// Runs the pipeline once and feeds the outcome into the health window.
pub async fn run_and_record(pipeline: &TransferPipeline, health: &HealthTracker) -> RunReport {
    let report = pipeline.run().await;
    health.record(report.succeeded()).await;

    if report.succeeded() {
        info!("💓 Run finished: {}", report.summary());
        if !report.failures.is_empty() {
            let left: Vec<&str> = report.failures.iter().filter_map(|f| f.file()).collect();
            debug!("Files left for the next run: {:?}", left);
        }
    } else {
        error!("💓 Run failed: {}", report.summary());
    }
    report
}

/// The steady-state loop. Only returns when a cron schedule runs out of
/// upcoming dates.
pub async fn run_forever(
    schedule: &Schedule,
    pipeline: &TransferPipeline,
    health: &HealthTracker,
) -> Result<()> {
    let mut ticker = Ticker::new(schedule);
    info!("⏱  Scheduling transfers {}", schedule);

    loop {
        ticker.tick().await?;
        run_and_record(pipeline, health).await;
    }
}
