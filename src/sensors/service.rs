use std::time::Duration;

use anyhow::{Context, Result};
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{error, info, warn};

use super::source::ReadingSource;
use crate::{
    activity::ActivityRecorder,
    alerts,
    broadcast::{Event, Hub},
    store::{
        models::{NewReading, Reading},
        Store,
    },
};

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(30);

/// Store → evaluate → record → broadcast, shared by the tick loop and the
/// ingestion route.
#[derive(Clone)]
pub struct SensorPipeline {
    store: Store,
    hub: Hub,
    activity: ActivityRecorder,
}

impl SensorPipeline {
    pub fn new(store: Store, hub: Hub) -> Self {
        let activity = ActivityRecorder::new(store.clone());
        Self {
            store,
            hub,
            activity,
        }
    }

    /// Persists `new`, raises any threshold alerts (each stored, logged to
    /// the activity trail and broadcast), then broadcasts the reading itself.
    ///
    /// Invalid input is rejected before anything is stored or published.
    pub async fn ingest(&self, new: NewReading) -> Result<Reading> {
        new.validate()?;

        let reading = self.store.append_reading(new).await;
        let config = self.store.configuration().await;

        for draft in alerts::evaluate(&reading, &config) {
            let alert = self.store.append_alert(draft).await;
            self.activity.alert_raised(&alert, &reading).await;
            warn!(
                alert_id = %alert.id,
                kind = %alert.kind,
                severity = %alert.severity,
                "{}", alert.message
            );
            self.hub
                .publish(&Event::Alert(alert))
                .await
                .context("Failed to publish alert")?;
        }

        self.hub
            .publish(&Event::SensorReading(reading.clone()))
            .await
            .context("Failed to publish sensor reading")?;

        Ok(reading)
    }
}

/// Periodic tick loop driving a [`ReadingSource`] through the pipeline.
pub struct SensorService {
    source: ReadingSource,
    pipeline: SensorPipeline,
    interval: Duration,
}

impl SensorService {
    pub fn new(source: ReadingSource, pipeline: SensorPipeline, interval: Duration) -> Self {
        Self {
            source,
            pipeline,
            interval,
        }
    }

    /// Runs the tick loop for the lifetime of the process.
    /// Spawn this via `tokio::spawn`.
    pub async fn run(mut self) {
        info!(
            interval_secs = self.interval.as_secs(),
            source = self.source.describe(),
            "Sensor tick loop started"
        );
        let interval = self.interval;
        let mut ticker = ticker(interval);

        loop {
            ticker.tick().await;
            // A tick never outlives its period; a stuck source is abandoned
            // and the next tick starts fresh.
            match time::timeout(interval, self.run_once()).await {
                Ok(Ok(reading)) => info!(
                    reading_id = %reading.id,
                    temperature = %reading.temperature,
                    humidity = %reading.humidity,
                    "Tick complete"
                ),
                Ok(Err(e)) => error!(error = ?e, "Sensor tick failed"),
                Err(_) => error!(
                    timeout_ms = interval.as_millis() as u64,
                    "Sensor tick timed out"
                ),
            }
        }
    }

    async fn run_once(&mut self) -> Result<Reading> {
        let new = self
            .source
            .produce()
            .await
            .context("Reading source failed")?;
        self.pipeline.ingest(new).await
    }
}

/// First tick one period from now. A slow tick pushes the schedule back
/// instead of firing the missed ticks back to back.
fn ticker(period: Duration) -> Interval {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}
