//! Threshold evaluation for incoming readings.
//!
//! Only the two upper bounds are checked: temperature above `tempMax`, then
//! humidity above `humidityMax`. Lower bounds are not checked, nor are soil
//! moisture and light level. Every over-threshold reading
//! produces a fresh alert; there is no suppression window.

use crate::store::models::{AlertDraft, AlertType, Configuration, Reading, Severity};

/// Decide which alerts `reading` raises under `config`, temperature first.
pub fn evaluate(reading: &Reading, config: &Configuration) -> Vec<AlertDraft> {
    let mut drafts = Vec::new();

    if reading.temperature > config.temp_max {
        drafts.push(AlertDraft {
            title: "High Temperature Alert".to_owned(),
            message: format!(
                "Temperature is {}°C, above maximum of {}°C",
                reading.temperature, config.temp_max
            ),
            kind: AlertType::Temperature,
            severity: Severity::High,
        });
    }

    if reading.humidity > config.humidity_max {
        drafts.push(AlertDraft {
            title: "High Humidity Alert".to_owned(),
            message: format!(
                "Humidity is {}%, above maximum of {}%",
                reading.humidity, config.humidity_max
            ),
            kind: AlertType::Humidity,
            severity: Severity::Medium,
        });
    }

    drafts
}
