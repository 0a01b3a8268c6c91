use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::models::{Alert, Configuration, ControlSettings, PlantAnalysis, Reading};

/// Envelope pushed to every live subscriber: `{"type": ..., "data": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum Event {
    SensorReading(Reading),
    ControlSettings(ControlSettings),
    PlantAnalysis(PlantAnalysis),
    Configuration(Configuration),
    Alert(Alert),
    AlertAcknowledged(AlertAcknowledged),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertAcknowledged {
    pub id: Uuid,
}

impl Event {
    /// Wire name of the envelope's `type` field.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::SensorReading(_) => "sensorReading",
            Event::ControlSettings(_) => "controlSettings",
            Event::PlantAnalysis(_) => "plantAnalysis",
            Event::Configuration(_) => "configuration",
            Event::Alert(_) => "alert",
            Event::AlertAcknowledged(_) => "alertAcknowledged",
        }
    }
}
