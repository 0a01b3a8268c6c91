use anyhow::{Context, Result};
use tracing::info;
use uuid::Uuid;

use crate::{
    activity::ActivityRecorder,
    broadcast::{AlertAcknowledged, Event, Hub},
    store::{
        models::{Alert, Configuration, ControlSettings, PlantAnalysis, PlantVerdict},
        patch::{ConfigurationPatch, ControlSettingsPatch},
        Store,
    },
};

/// Mutations that arrive from the route layer rather than the tick loop.
///
/// Each one commits to the store first, then appends an activity line and
/// publishes an event. A rejected mutation does neither.
#[derive(Clone)]
pub struct ControlService {
    store: Store,
    hub: Hub,
    activity: ActivityRecorder,
}

impl ControlService {
    pub fn new(store: Store, hub: Hub) -> Self {
        let activity = ActivityRecorder::new(store.clone());
        Self {
            store,
            hub,
            activity,
        }
    }

    pub async fn update_control_settings(
        &self,
        patch: ControlSettingsPatch,
    ) -> Result<ControlSettings> {
        let settings = self.store.update_control_settings(&patch).await?;
        self.activity.controls_updated(&patch).await;
        info!(changes = ?patch.changed_fields(), "Control settings updated");

        self.hub
            .publish(&Event::ControlSettings(settings.clone()))
            .await
            .context("Failed to publish control settings")?;
        Ok(settings)
    }

    pub async fn update_configuration(&self, patch: ConfigurationPatch) -> Result<Configuration> {
        let config = self.store.update_configuration(&patch).await?;
        self.activity.configuration_updated().await;
        info!(
            plant_type = %config.plant_type,
            temp_max = %config.temp_max,
            humidity_max = %config.humidity_max,
            "Configuration updated"
        );

        self.hub
            .publish(&Event::Configuration(config.clone()))
            .await
            .context("Failed to publish configuration")?;
        Ok(config)
    }

    /// Acknowledging twice is fine; only the first call is recorded and
    /// broadcast.
    pub async fn acknowledge_alert(&self, id: Uuid) -> Result<Alert> {
        let (alert, transitioned) = self.store.acknowledge_alert(id).await?;
        if !transitioned {
            return Ok(alert);
        }

        self.activity.alert_acknowledged().await;
        info!(alert_id = %id, "Alert acknowledged");

        self.hub
            .publish(&Event::AlertAcknowledged(AlertAcknowledged { id }))
            .await
            .context("Failed to publish alert acknowledgement")?;
        Ok(alert)
    }

    /// Persist a verdict produced by the plant classifier.
    pub async fn record_plant_analysis(&self, verdict: PlantVerdict) -> Result<PlantAnalysis> {
        verdict.validate()?;
        let analysis = self.store.create_plant_analysis(verdict).await;
        self.activity.plant_analysed(&analysis).await;
        info!(
            analysis_id = %analysis.id,
            plant = %analysis.plant_name,
            health = %analysis.health_status,
            "Plant analysis recorded"
        );

        self.hub
            .publish(&Event::PlantAnalysis(analysis.clone()))
            .await
            .context("Failed to publish plant analysis")?;
        Ok(analysis)
    }
}
