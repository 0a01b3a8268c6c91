//! Human-readable audit lines for notable state transitions.

use crate::store::{
    models::{Activity, ActivityType, Alert, AlertType, NewActivity, PlantAnalysis, Reading},
    patch::ControlSettingsPatch,
    Store,
};

/// Appends audit lines to the store's bounded activity log.
#[derive(Clone)]
pub struct ActivityRecorder {
    store: Store,
}

impl ActivityRecorder {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn alert_raised(&self, alert: &Alert, reading: &Reading) -> Activity {
        self.store.append_activity(alert_raised(alert, reading)).await
    }

    pub async fn controls_updated(&self, patch: &ControlSettingsPatch) -> Activity {
        let changes = patch.changed_fields().join(", ");
        self.store
            .append_activity(info(format!("Control settings updated: {changes}")))
            .await
    }

    pub async fn configuration_updated(&self) -> Activity {
        self.store
            .append_activity(info("System configuration updated"))
            .await
    }

    pub async fn alert_acknowledged(&self) -> Activity {
        self.store.append_activity(info("Alert acknowledged")).await
    }

    pub async fn plant_analysed(&self, analysis: &PlantAnalysis) -> Activity {
        self.store
            .append_activity(info(format!(
                "Plant health analysis completed for {}",
                analysis.plant_name
            )))
            .await
    }
}

fn alert_raised(alert: &Alert, reading: &Reading) -> NewActivity {
    let message = match alert.kind {
        AlertType::Temperature => {
            format!("High temperature alert triggered: {}°C", reading.temperature)
        }
        AlertType::Humidity => format!("High humidity alert triggered: {}%", reading.humidity),
        other => format!("{other} alert triggered: {}", alert.title),
    };
    NewActivity {
        message,
        kind: ActivityType::Warning,
    }
}

fn info(message: impl Into<String>) -> NewActivity {
    NewActivity {
        message: message.into(),
        kind: ActivityType::Info,
    }
}
