pub mod bounded;
pub mod models;
pub mod patch;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use self::{
    bounded::BoundedLog,
    models::{
        Activity, ActivityType, Alert, AlertDraft, Configuration, ControlSettings, NewActivity,
        NewReading, PlantAnalysis, PlantVerdict, Reading,
    },
    patch::{ConfigurationPatch, ControlSettingsPatch},
};
use crate::error::ServiceError;

pub const DEFAULT_READING_CAP: usize = 1000;
pub const DEFAULT_ACTIVITY_CAP: usize = 100;

/// Retention caps for the bounded collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retention {
    pub reading_cap: usize,
    pub activity_cap: usize,
}

impl Default for Retention {
    fn default() -> Self {
        Self {
            reading_cap: DEFAULT_READING_CAP,
            activity_cap: DEFAULT_ACTIVITY_CAP,
        }
    }
}

/// In-memory home of every entity the service tracks.
///
/// Wrapped in `Arc` so it can be cheaply cloned and shared across tasks.
/// Each collection sits behind its own `tokio::sync::RwLock`: readers never
/// block each other, and a mutation (id assignment, insertion, eviction) is
/// applied under a single write guard so nobody observes half of it.
/// Callers only ever receive clones.
#[derive(Clone)]
pub struct Store {
    inner: Arc<Inner>,
}

struct Inner {
    readings: RwLock<BoundedLog<Reading>>,
    alerts: RwLock<Vec<Alert>>,
    activities: RwLock<BoundedLog<Activity>>,
    analyses: RwLock<Vec<PlantAnalysis>>,
    configuration: RwLock<Configuration>,
    controls: RwLock<ControlSettings>,
}

impl Store {
    /// Empty collections, factory configuration and control settings.
    pub fn new(retention: Retention) -> Self {
        let now = Utc::now();
        Self {
            inner: Arc::new(Inner {
                readings: RwLock::new(BoundedLog::new(retention.reading_cap)),
                alerts: RwLock::new(Vec::new()),
                activities: RwLock::new(BoundedLog::new(retention.activity_cap)),
                analyses: RwLock::new(Vec::new()),
                configuration: RwLock::new(Configuration::initial(now)),
                controls: RwLock::new(ControlSettings::initial(now)),
            }),
        }
    }

    /// Give a fresh dashboard something to show before the first tick.
    pub async fn seed_defaults(&self) -> Reading {
        let reading = self
            .append_reading(NewReading {
                temperature: rust_decimal::Decimal::new(245, 1),
                humidity: rust_decimal::Decimal::new(680, 1),
                soil_moisture: rust_decimal::Decimal::new(450, 1),
                light_level: 2850,
            })
            .await;
        self.append_activity(NewActivity {
            message: "System initialized successfully".to_owned(),
            kind: ActivityType::Success,
        })
        .await;
        reading
    }

    // -----------------------------------------------------------------------
    // Readings
    // -----------------------------------------------------------------------

    pub async fn append_reading(&self, new: NewReading) -> Reading {
        let mut readings = self.inner.readings.write().await;
        let reading = new.into_reading(Utc::now());
        let evicted = readings.push(reading.clone());
        if evicted > 0 {
            tracing::trace!(evicted, cap = readings.cap(), "Evicted oldest readings");
        }
        reading
    }

    pub async fn latest_reading(&self) -> Option<Reading> {
        self.inner.readings.read().await.latest().cloned()
    }

    /// Up to `limit` readings, newest first.
    pub async fn recent_readings(&self, limit: usize) -> Vec<Reading> {
        self.inner
            .readings
            .read()
            .await
            .newest_first()
            .take(limit)
            .cloned()
            .collect()
    }

    /// Readings with `start <= timestamp <= end`, newest first.
    pub async fn readings_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<Reading> {
        self.inner
            .readings
            .read()
            .await
            .newest_first()
            .filter(|r| r.timestamp >= start && r.timestamp <= end)
            .cloned()
            .collect()
    }

    // -----------------------------------------------------------------------
    // Alerts
    // -----------------------------------------------------------------------

    pub async fn append_alert(&self, draft: AlertDraft) -> Alert {
        let alert = Alert {
            id: Uuid::new_v4(),
            title: draft.title,
            message: draft.message,
            kind: draft.kind,
            severity: draft.severity,
            acknowledged: false,
            timestamp: Utc::now(),
        };
        self.inner.alerts.write().await.push(alert.clone());
        alert
    }

    /// All alerts newest first, optionally filtered on `acknowledged`.
    pub async fn alerts(&self, acknowledged: Option<bool>) -> Vec<Alert> {
        self.inner
            .alerts
            .read()
            .await
            .iter()
            .rev()
            .filter(|a| acknowledged.map_or(true, |want| a.acknowledged == want))
            .cloned()
            .collect()
    }

    /// Flip `acknowledged` to `true`. The returned flag is `true` only when
    /// this call performed the transition.
    pub async fn acknowledge_alert(&self, id: Uuid) -> Result<(Alert, bool), ServiceError> {
        let mut alerts = self.inner.alerts.write().await;
        let alert = alerts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(ServiceError::NotFound { entity: "alert", id })?;
        let transitioned = !alert.acknowledged;
        alert.acknowledged = true;
        Ok((alert.clone(), transitioned))
    }

    // -----------------------------------------------------------------------
    // Activity log
    // -----------------------------------------------------------------------

    pub async fn append_activity(&self, new: NewActivity) -> Activity {
        let activity = Activity {
            id: Uuid::new_v4(),
            message: new.message,
            kind: new.kind,
            timestamp: Utc::now(),
        };
        self.inner.activities.write().await.push(activity.clone());
        activity
    }

    pub async fn recent_activities(&self, limit: usize) -> Vec<Activity> {
        self.inner
            .activities
            .read()
            .await
            .newest_first()
            .take(limit)
            .cloned()
            .collect()
    }

    // -----------------------------------------------------------------------
    // Plant analyses
    // -----------------------------------------------------------------------

    pub async fn create_plant_analysis(&self, verdict: PlantVerdict) -> PlantAnalysis {
        let analysis = PlantAnalysis {
            id: Uuid::new_v4(),
            plant_name: verdict.plant_name,
            image_path: verdict.image_path,
            health_status: verdict.health_status,
            analysis: verdict.analysis,
            confidence: verdict.confidence,
            timestamp: Utc::now(),
        };
        self.inner.analyses.write().await.push(analysis.clone());
        analysis
    }

    pub async fn plant_analyses(&self, limit: usize) -> Vec<PlantAnalysis> {
        self.inner
            .analyses
            .read()
            .await
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    // -----------------------------------------------------------------------
    // Singletons
    // -----------------------------------------------------------------------

    pub async fn configuration(&self) -> Configuration {
        self.inner.configuration.read().await.clone()
    }

    /// Merge `patch` into the configuration. On a validation failure the
    /// stored record is untouched.
    pub async fn update_configuration(
        &self,
        patch: &ConfigurationPatch,
    ) -> Result<Configuration, ServiceError> {
        let mut current = self.inner.configuration.write().await;
        let merged = patch.apply(&current, Utc::now())?;
        *current = merged.clone();
        Ok(merged)
    }

    pub async fn control_settings(&self) -> ControlSettings {
        self.inner.controls.read().await.clone()
    }

    pub async fn update_control_settings(
        &self,
        patch: &ControlSettingsPatch,
    ) -> Result<ControlSettings, ServiceError> {
        let mut current = self.inner.controls.write().await;
        let merged = patch.apply(&current, Utc::now())?;
        *current = merged.clone();
        Ok(merged)
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new(Retention::default())
    }
}
