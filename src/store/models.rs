use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ServiceError;

// ---------------------------------------------------------------------------
// Readings
// ---------------------------------------------------------------------------

/// One timestamped sample of the four monitored quantities.
///
/// Decimal fields serialize as fixed-point strings (`"24.5"`) so threshold
/// comparisons never see floating-point drift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub id: Uuid,
    /// Degrees Celsius
    #[schema(value_type = String, example = "24.5")]
    pub temperature: Decimal,
    /// Relative humidity percentage
    #[schema(value_type = String, example = "68.0")]
    pub humidity: Decimal,
    /// Volumetric soil moisture percentage
    #[schema(value_type = String, example = "45.0")]
    pub soil_moisture: Decimal,
    /// Lux
    pub light_level: i32,
    pub timestamp: DateTime<Utc>,
}

/// Reading values before the store assigns `id` and `timestamp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewReading {
    #[schema(value_type = String, example = "24.5")]
    pub temperature: Decimal,
    #[schema(value_type = String, example = "68.0")]
    pub humidity: Decimal,
    #[schema(value_type = String, example = "45.0")]
    pub soil_moisture: Decimal,
    pub light_level: i32,
}

impl NewReading {
    /// Values must fit the `numeric(5,2)` shape the dashboard expects and
    /// percentages must be percentages.
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.temperature.abs() >= Decimal::ONE_THOUSAND {
            return Err(ServiceError::validation(format!(
                "temperature out of range: {}",
                self.temperature
            )));
        }
        for (name, value) in [("humidity", self.humidity), ("soilMoisture", self.soil_moisture)] {
            if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
                return Err(ServiceError::validation(format!(
                    "{name} must be between 0 and 100, got {value}"
                )));
            }
        }
        if self.light_level < 0 {
            return Err(ServiceError::validation(format!(
                "lightLevel must not be negative, got {}",
                self.light_level
            )));
        }
        Ok(())
    }

    pub(crate) fn into_reading(self, timestamp: DateTime<Utc>) -> Reading {
        Reading {
            id: Uuid::new_v4(),
            temperature: self.temperature,
            humidity: self.humidity,
            soil_moisture: self.soil_moisture,
            light_level: self.light_level,
            timestamp,
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration (alert thresholds + notification preferences)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    pub id: Uuid,
    pub plant_type: String,
    #[schema(value_type = String, example = "20.0")]
    pub temp_min: Decimal,
    #[schema(value_type = String, example = "25.0")]
    pub temp_max: Decimal,
    #[schema(value_type = String, example = "60.0")]
    pub humidity_min: Decimal,
    #[schema(value_type = String, example = "70.0")]
    pub humidity_max: Decimal,
    pub email_alerts: bool,
    pub push_alerts: bool,
    pub sms_alerts: bool,
    pub updated_at: DateTime<Utc>,
}

impl Configuration {
    /// Factory thresholds for a tomato greenhouse.
    pub fn initial(now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            plant_type: "tomatoes".to_owned(),
            temp_min: Decimal::new(200, 1),
            temp_max: Decimal::new(250, 1),
            humidity_min: Decimal::new(600, 1),
            humidity_max: Decimal::new(700, 1),
            email_alerts: true,
            push_alerts: true,
            sms_alerts: false,
            updated_at: now,
        }
    }
}

// ---------------------------------------------------------------------------
// Control settings (actuator state)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum VentilationSpeed {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ControlSettings {
    pub id: Uuid,
    pub irrigation: bool,
    pub lighting: bool,
    pub ventilation: bool,
    /// Percent, 0–100
    pub lighting_intensity: i32,
    pub ventilation_speed: VentilationSpeed,
    pub updated_at: DateTime<Utc>,
}

impl ControlSettings {
    pub fn initial(now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            irrigation: true,
            lighting: true,
            ventilation: false,
            lighting_intensity: 85,
            ventilation_speed: VentilationSpeed::Medium,
            updated_at: now,
        }
    }
}

// ---------------------------------------------------------------------------
// Alerts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Temperature,
    Humidity,
    Soil,
    Light,
    System,
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AlertType::Temperature => "temperature",
            AlertType::Humidity => "humidity",
            AlertType::Soil => "soil",
            AlertType::Light => "light",
            AlertType::System => "system",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// A threshold violation. Only `acknowledged` ever changes after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: AlertType,
    pub severity: Severity,
    pub acknowledged: bool,
    pub timestamp: DateTime<Utc>,
}

/// What the evaluator decides; the store turns it into an [`Alert`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertDraft {
    pub title: String,
    pub message: String,
    pub kind: AlertType,
    pub severity: Severity,
}

// ---------------------------------------------------------------------------
// Activity log
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Info,
    Warning,
    Error,
    Success,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: Uuid,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: ActivityType,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewActivity {
    pub message: String,
    pub kind: ActivityType,
}

// ---------------------------------------------------------------------------
// Plant health analyses
// ---------------------------------------------------------------------------

/// A persisted classifier verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlantAnalysis {
    pub id: Uuid,
    pub plant_name: String,
    pub image_path: Option<String>,
    pub health_status: String,
    pub analysis: Option<String>,
    /// Percent
    #[schema(value_type = Option<String>, example = "95.5")]
    pub confidence: Option<Decimal>,
    pub timestamp: DateTime<Utc>,
}

/// Verdict handed over by the plant classifier collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlantVerdict {
    pub plant_name: String,
    #[serde(default)]
    pub image_path: Option<String>,
    pub health_status: String,
    #[serde(default)]
    pub analysis: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "95.5")]
    pub confidence: Option<Decimal>,
}

impl PlantVerdict {
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.plant_name.trim().is_empty() {
            return Err(ServiceError::validation("plantName is required"));
        }
        if self.health_status.trim().is_empty() {
            return Err(ServiceError::validation("healthStatus is required"));
        }
        if let Some(c) = self.confidence {
            if c < Decimal::ZERO || c > Decimal::ONE_HUNDRED {
                return Err(ServiceError::validation(format!(
                    "confidence must be between 0 and 100, got {c}"
                )));
            }
        }
        Ok(())
    }
}
