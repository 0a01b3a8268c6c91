//! Partial-merge updates for the two singleton records.
//!
//! A patch is merged onto a copy of the current record, the candidate is
//! validated, and only then does the store swap it in. Fields left out of a
//! patch keep their previous value.

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::models::{Configuration, ControlSettings, VentilationSpeed};
use crate::error::ServiceError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigurationPatch {
    pub plant_type: Option<String>,
    #[schema(value_type = Option<String>)]
    pub temp_min: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub temp_max: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub humidity_min: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub humidity_max: Option<Decimal>,
    pub email_alerts: Option<bool>,
    pub push_alerts: Option<bool>,
    pub sms_alerts: Option<bool>,
}

impl ConfigurationPatch {
    /// Merge onto `current`, returning the validated candidate record.
    pub fn apply(
        &self,
        current: &Configuration,
        now: DateTime<Utc>,
    ) -> Result<Configuration, ServiceError> {
        let candidate = Configuration {
            id: current.id,
            plant_type: self
                .plant_type
                .clone()
                .unwrap_or_else(|| current.plant_type.clone()),
            temp_min: self.temp_min.unwrap_or(current.temp_min),
            temp_max: self.temp_max.unwrap_or(current.temp_max),
            humidity_min: self.humidity_min.unwrap_or(current.humidity_min),
            humidity_max: self.humidity_max.unwrap_or(current.humidity_max),
            email_alerts: self.email_alerts.unwrap_or(current.email_alerts),
            push_alerts: self.push_alerts.unwrap_or(current.push_alerts),
            sms_alerts: self.sms_alerts.unwrap_or(current.sms_alerts),
            updated_at: next_update(current.updated_at, now),
        };
        validate_configuration(&candidate)?;
        Ok(candidate)
    }
}

fn validate_configuration(c: &Configuration) -> Result<(), ServiceError> {
    if c.plant_type.trim().is_empty() {
        return Err(ServiceError::validation("plantType must not be empty"));
    }
    if c.temp_min > c.temp_max {
        return Err(ServiceError::validation(format!(
            "tempMin ({}) must not exceed tempMax ({})",
            c.temp_min, c.temp_max
        )));
    }
    if c.humidity_min > c.humidity_max {
        return Err(ServiceError::validation(format!(
            "humidityMin ({}) must not exceed humidityMax ({})",
            c.humidity_min, c.humidity_max
        )));
    }
    for (name, value) in [("humidityMin", c.humidity_min), ("humidityMax", c.humidity_max)] {
        if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
            return Err(ServiceError::validation(format!(
                "{name} must be between 0 and 100, got {value}"
            )));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ControlSettingsPatch {
    pub irrigation: Option<bool>,
    pub lighting: Option<bool>,
    pub ventilation: Option<bool>,
    pub lighting_intensity: Option<i32>,
    pub ventilation_speed: Option<VentilationSpeed>,
}

impl ControlSettingsPatch {
    pub fn apply(
        &self,
        current: &ControlSettings,
        now: DateTime<Utc>,
    ) -> Result<ControlSettings, ServiceError> {
        if let Some(i) = self.lighting_intensity {
            if !(0..=100).contains(&i) {
                return Err(ServiceError::validation(format!(
                    "lightingIntensity must be between 0 and 100, got {i}"
                )));
            }
        }
        Ok(ControlSettings {
            id: current.id,
            irrigation: self.irrigation.unwrap_or(current.irrigation),
            lighting: self.lighting.unwrap_or(current.lighting),
            ventilation: self.ventilation.unwrap_or(current.ventilation),
            lighting_intensity: self.lighting_intensity.unwrap_or(current.lighting_intensity),
            ventilation_speed: self.ventilation_speed.unwrap_or(current.ventilation_speed),
            updated_at: next_update(current.updated_at, now),
        })
    }

    /// Wire names of the fields this patch sets, in declaration order.
    pub fn changed_fields(&self) -> Vec<&'static str> {
        [
            ("irrigation", self.irrigation.is_some()),
            ("lighting", self.lighting.is_some()),
            ("ventilation", self.ventilation.is_some()),
            ("lightingIntensity", self.lighting_intensity.is_some()),
            ("ventilationSpeed", self.ventilation_speed.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
        .collect()
    }
}

/// `updatedAt` must strictly increase even when two merges land within the
/// clock's resolution.
fn next_update(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    if now > previous {
        now
    } else {
        previous + TimeDelta::microseconds(1)
    }
}
