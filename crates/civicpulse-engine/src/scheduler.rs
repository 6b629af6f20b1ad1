//! The two periodic jobs: synthetic ingestion and index computation.
//!
//! Each job runs in its own task on a `tokio` interval. A firing awaits
//! its job to completion before the next tick is taken, and ticks missed
//! while a job overran are skipped rather than bunched up. Job errors are
//! logged; the loop carries on and the next firing covers the gap.

use std::time::Duration;

use civicpulse_core::config::SchedulerConfig;
use civicpulse_core::generator::EventGenerator;
use civicpulse_core::indices::IndexCalculator;
use civicpulse_core::store::{CityStore, StoreError};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Current wall-clock time in epoch seconds.
pub fn now_ts() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Generate one batch at `now` and append it. Returns the event count.
pub async fn ingest_once<S: CityStore>(
    store: &S,
    generator: &mut EventGenerator,
    now: i64,
) -> Result<usize, StoreError> {
    let events = generator.generate(now);
    store.append_events(&events).await?;
    Ok(events.len())
}

/// Handles to the two running job loops.
#[derive(Debug)]
pub struct Jobs {
    ingest: JoinHandle<()>,
    process: JoinHandle<()>,
}

impl Jobs {
    /// Spawn both loops onto the current runtime.
    pub fn spawn<S>(store: S, generator: EventGenerator, config: &SchedulerConfig) -> Self
    where
        S: CityStore + Clone + 'static,
    {
        let calculator =
            IndexCalculator::new(store.clone()).with_window_minutes(config.index_window_minutes);
        let ingest = tokio::spawn(ingest_loop(
            store,
            generator,
            period(config.ingest_interval_secs),
        ));
        let process = tokio::spawn(process_loop(calculator, period(config.process_interval_secs)));
        tracing::info!(
            ingest_interval_secs = config.ingest_interval_secs,
            process_interval_secs = config.process_interval_secs,
            "Scheduler started"
        );
        Self { ingest, process }
    }

    /// Stop both loops and wait for them to wind down.
    pub async fn shutdown(self) {
        self.ingest.abort();
        self.process.abort();
        for (job, handle) in [("ingest", self.ingest), ("process", self.process)] {
            match handle.await {
                Err(e) if !e.is_cancelled() => {
                    tracing::error!(job, error = %e, "Scheduler task failed");
                }
                _ => {}
            }
        }
        tracing::info!("Scheduler stopped");
    }
}

/// Interval period; zero is bumped to one second since `tokio` rejects it.
fn period(secs: u64) -> Duration {
    Duration::from_secs(secs.max(1))
}

fn ticker(every: Duration) -> tokio::time::Interval {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

async fn ingest_loop<S: CityStore>(store: S, mut generator: EventGenerator, every: Duration) {
    let mut interval = ticker(every);
    loop {
        interval.tick().await;
        match ingest_once(&store, &mut generator, now_ts()).await {
            Ok(count) => tracing::debug!(count, "Ingested synthetic events"),
            Err(e) => tracing::error!(error = %e, "Ingestion failed"),
        }
    }
}

async fn process_loop<S: CityStore>(calculator: IndexCalculator<S>, every: Duration) {
    let mut interval = ticker(every);
    loop {
        interval.tick().await;
        if let Err(e) = calculator.compute(now_ts()).await {
            tracing::error!(error = %e, "Index computation failed");
        }
    }
}
