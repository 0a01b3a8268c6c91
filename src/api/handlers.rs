use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, TimeDelta, Utc};
use utoipa::OpenApi;
use uuid::Uuid;

use super::{
    dto::{
        AlertFilter, HistoryParams, LimitParams, DEFAULT_ACTIVITY_LIMIT, DEFAULT_ANALYSIS_LIMIT,
        DEFAULT_HISTORY_HOURS, DEFAULT_HISTORY_LIMIT,
    },
    errors::AppError,
    extract::ApiJson,
    AppState,
};
use crate::store::{
    models::{
        Activity, ActivityType, Alert, AlertType, Configuration, ControlSettings, NewReading,
        PlantAnalysis, PlantVerdict, Reading, Severity, VentilationSpeed,
    },
    patch::{ConfigurationPatch, ControlSettingsPatch},
};

// ---------------------------------------------------------------------------
// Sensors
// ---------------------------------------------------------------------------

/// Fetch the most recent reading, or `null` before the first one arrives.
#[utoipa::path(
    get,
    path = "/api/sensors/latest",
    responses(
        (status = 200, description = "Latest sensor reading", body = Option<Reading>),
    ),
    tag = "sensors"
)]
pub async fn get_latest_reading(State(state): State<AppState>) -> Json<Option<Reading>> {
    Json(state.store.latest_reading().await)
}

/// Readings from the last `hours` hours, newest first, at most `limit`.
#[utoipa::path(
    get,
    path = "/api/sensors/history",
    params(
        ("hours" = Option<u32>,   Query, description = "Look-back window in hours (default 24)"),
        ("limit" = Option<usize>, Query, description = "Maximum readings returned (default 100)"),
    ),
    responses(
        (status = 200, description = "Sensor history, newest first", body = Vec<Reading>),
    ),
    tag = "sensors"
)]
pub async fn get_reading_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Json<Vec<Reading>> {
    let hours = params.hours.unwrap_or(DEFAULT_HISTORY_HOURS);
    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    let end = Utc::now();
    let start = end
        .checked_sub_signed(TimeDelta::hours(i64::from(hours)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);

    let mut readings = state.store.readings_in_range(start, end).await;
    readings.truncate(limit);
    Json(readings)
}

/// Ingest a reading from an external sensor. It goes through the same
/// evaluate-and-broadcast pipeline as a scheduled tick.
#[utoipa::path(
    post,
    path = "/api/sensors",
    request_body = NewReading,
    responses(
        (status = 200, description = "Stored reading", body = Reading),
        (status = 400, description = "Invalid sensor data"),
    ),
    tag = "sensors"
)]
pub async fn ingest_reading(
    State(state): State<AppState>,
    ApiJson(new): ApiJson<NewReading>,
) -> Result<Json<Reading>, AppError> {
    Ok(Json(state.pipeline.ingest(new).await?))
}

// ---------------------------------------------------------------------------
// Controls & configuration
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/controls",
    responses((status = 200, description = "Current actuator settings", body = ControlSettings)),
    tag = "controls"
)]
pub async fn get_control_settings(State(state): State<AppState>) -> Json<ControlSettings> {
    Json(state.store.control_settings().await)
}

/// Merge the given fields into the actuator settings.
#[utoipa::path(
    patch,
    path = "/api/controls",
    request_body = ControlSettingsPatch,
    responses(
        (status = 200, description = "Updated actuator settings", body = ControlSettings),
        (status = 400, description = "Invalid control data"),
    ),
    tag = "controls"
)]
pub async fn update_control_settings(
    State(state): State<AppState>,
    ApiJson(patch): ApiJson<ControlSettingsPatch>,
) -> Result<Json<ControlSettings>, AppError> {
    Ok(Json(state.control.update_control_settings(patch).await?))
}

#[utoipa::path(
    get,
    path = "/api/configuration",
    responses((status = 200, description = "Alert thresholds and preferences", body = Configuration)),
    tag = "configuration"
)]
pub async fn get_configuration(State(state): State<AppState>) -> Json<Configuration> {
    Json(state.store.configuration().await)
}

/// Merge the given fields into the configuration. Inverted ranges are rejected.
#[utoipa::path(
    patch,
    path = "/api/configuration",
    request_body = ConfigurationPatch,
    responses(
        (status = 200, description = "Updated configuration", body = Configuration),
        (status = 400, description = "Invalid configuration data"),
    ),
    tag = "configuration"
)]
pub async fn update_configuration(
    State(state): State<AppState>,
    ApiJson(patch): ApiJson<ConfigurationPatch>,
) -> Result<Json<Configuration>, AppError> {
    Ok(Json(state.control.update_configuration(patch).await?))
}

// ---------------------------------------------------------------------------
// Alerts & activity
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/alerts",
    params(
        ("acknowledged" = Option<bool>, Query, description = "Only alerts in this state"),
    ),
    responses((status = 200, description = "Alerts, newest first", body = Vec<Alert>)),
    tag = "alerts"
)]
pub async fn list_alerts(
    State(state): State<AppState>,
    Query(filter): Query<AlertFilter>,
) -> Json<Vec<Alert>> {
    Json(state.store.alerts(filter.acknowledged).await)
}

#[utoipa::path(
    patch,
    path = "/api/alerts/{id}/acknowledge",
    params(("id" = Uuid, Path, description = "Alert ID")),
    responses(
        (status = 200, description = "Acknowledged alert", body = Alert),
        (status = 404, description = "No alert with this ID"),
    ),
    tag = "alerts"
)]
pub async fn acknowledge_alert(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Alert>, AppError> {
    Ok(Json(state.control.acknowledge_alert(id).await?))
}

#[utoipa::path(
    get,
    path = "/api/activities",
    params(("limit" = Option<usize>, Query, description = "Maximum entries returned (default 20)")),
    responses((status = 200, description = "Activity log, newest first", body = Vec<Activity>)),
    tag = "activity"
)]
pub async fn list_activities(
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> Json<Vec<Activity>> {
    let limit = params.limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT);
    Json(state.store.recent_activities(limit).await)
}

// ---------------------------------------------------------------------------
// Plant health
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/plants/analyses",
    params(("limit" = Option<usize>, Query, description = "Maximum entries returned (default 10)")),
    responses((status = 200, description = "Plant analyses, newest first", body = Vec<PlantAnalysis>)),
    tag = "plants"
)]
pub async fn list_plant_analyses(
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> Json<Vec<PlantAnalysis>> {
    let limit = params.limit.unwrap_or(DEFAULT_ANALYSIS_LIMIT);
    Json(state.store.plant_analyses(limit).await)
}

/// Record a verdict from the plant classifier.
#[utoipa::path(
    post,
    path = "/api/plants/analyses",
    request_body = PlantVerdict,
    responses(
        (status = 200, description = "Stored analysis", body = PlantAnalysis),
        (status = 400, description = "Plant name or health status missing"),
    ),
    tag = "plants"
)]
pub async fn record_plant_analysis(
    State(state): State<AppState>,
    ApiJson(verdict): ApiJson<PlantVerdict>,
) -> Result<Json<PlantAnalysis>, AppError> {
    Ok(Json(state.control.record_plant_analysis(verdict).await?))
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Returns `200 OK` with `{"status":"ok"}` when the server is running.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
    ),
    tag = "system"
)]
pub async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// OpenAPI spec
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    paths(
        get_latest_reading, get_reading_history, ingest_reading,
        get_control_settings, update_control_settings,
        get_configuration, update_configuration,
        list_alerts, acknowledge_alert, list_activities,
        list_plant_analyses, record_plant_analysis,
        health,
    ),
    components(schemas(
        Reading, NewReading,
        ControlSettings, ControlSettingsPatch, VentilationSpeed,
        Configuration, ConfigurationPatch,
        Alert, AlertType, Severity,
        Activity, ActivityType,
        PlantAnalysis, PlantVerdict,
    )),
    tags(
        (name = "sensors",       description = "Sensor readings"),
        (name = "controls",      description = "Actuator settings"),
        (name = "configuration", description = "Alert thresholds and notification preferences"),
        (name = "alerts",        description = "Threshold alerts"),
        (name = "activity",      description = "Audit trail"),
        (name = "plants",        description = "Plant health analyses"),
        (name = "system",        description = "System endpoints"),
    ),
    info(
        title = "Greenhouse Monitor API",
        version = "0.1.0",
        description = "Telemetry, alerting and live updates for a monitored greenhouse. \
                       Subscribe to `GET /ws` for pushed events."
    )
)]
pub struct ApiDoc;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use axum_test::TestServer;
    use serde_json::{json, Value};

    use crate::{
        api::{router, AppState},
        broadcast::Hub,
        store::Store,
    };

    fn test_server() -> (TestServer, AppState) {
        let state = AppState::new(Store::default(), Hub::default());
        (TestServer::new(router(state.clone())).unwrap(), state)
    }

    fn reading_body(temperature: &str, humidity: &str) -> Value {
        json!({
            "temperature": temperature,
            "humidity": humidity,
            "soilMoisture": "45.0",
            "lightLevel": 2850
        })
    }

    // -----------------------------------------------------------------------
    // Sensors
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn latest_is_null_before_any_reading() {
        let (server, _) = test_server();
        let resp = server.get("/api/sensors/latest").await;
        resp.assert_status_ok();
        let body: Value = resp.json();
        assert!(body.is_null());
    }

    #[tokio::test]
    async fn posted_reading_becomes_latest() {
        let (server, _) = test_server();
        let resp = server
            .post("/api/sensors")
            .json(&reading_body("23.4", "66.0"))
            .await;
        resp.assert_status_ok();
        let created: Value = resp.json();
        assert_eq!(created["temperature"], "23.4");

        let latest: Value = server.get("/api/sensors/latest").await.json();
        assert_eq!(latest["id"], created["id"]);
        assert_eq!(latest["soilMoisture"], "45.0");
    }

    #[tokio::test]
    async fn posted_reading_over_threshold_raises_alert() {
        let (server, state) = test_server();
        let mut sub = state.hub.subscribe().await;

        server
            .post("/api/sensors")
            .json(&reading_body("26.3", "65.0"))
            .await
            .assert_status_ok();

        let alerts: Vec<Value> = server.get("/api/alerts").await.json();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0]["type"], "temperature");
        assert_eq!(alerts[0]["severity"], "high");

        let first: Value = serde_json::from_str(&sub.try_recv().unwrap()).unwrap();
        let second: Value = serde_json::from_str(&sub.try_recv().unwrap()).unwrap();
        assert_eq!(first["type"], "alert");
        assert_eq!(second["type"], "sensorReading");
    }

    #[tokio::test]
    async fn invalid_reading_is_rejected() {
        let (server, state) = test_server();
        let resp = server
            .post("/api/sensors")
            .json(&reading_body("23.4", "101.0"))
            .await;
        resp.assert_status_bad_request();
        let body: Value = resp.json();
        assert!(body["error"].as_str().unwrap().contains("humidity"));
        assert!(state.store.latest_reading().await.is_none());
    }

    #[tokio::test]
    async fn history_is_newest_first_and_limited() {
        let (server, _) = test_server();
        for t in ["21.0", "22.0", "23.0"] {
            server
                .post("/api/sensors")
                .json(&reading_body(t, "60.0"))
                .await
                .assert_status_ok();
        }

        let all: Vec<Value> = server.get("/api/sensors/history").await.json();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0]["temperature"], "23.0");
        assert_eq!(all[2]["temperature"], "21.0");

        let limited: Vec<Value> = server
            .get("/api/sensors/history")
            .add_query_param("limit", 2)
            .await
            .json();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0]["temperature"], "23.0");
    }

    #[tokio::test]
    async fn malformed_reading_body_is_a_validation_error() {
        let (server, state) = test_server();
        let resp = server
            .post("/api/sensors")
            .json(&json!({
                "temperature": "abc",
                "humidity": "60.0",
                "soilMoisture": "45.0",
                "lightLevel": 2850
            }))
            .await;
        resp.assert_status_bad_request();
        let body: Value = resp.json();
        assert!(body["error"].is_string());

        let missing = server
            .post("/api/sensors")
            .json(&json!({ "temperature": "22.0" }))
            .await;
        missing.assert_status_bad_request();
        assert!(missing.json::<Value>()["error"].is_string());

        assert!(state.store.latest_reading().await.is_none());
    }

    // -----------------------------------------------------------------------
    // Controls & configuration
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn unknown_ventilation_speed_is_a_validation_error() {
        let (server, _) = test_server();
        let resp = server
            .patch("/api/controls")
            .json(&json!({ "ventilationSpeed": "turbo" }))
            .await;
        resp.assert_status_bad_request();
        let body: Value = resp.json();
        assert!(body["error"].as_str().unwrap().contains("turbo"));

        let controls: Value = server.get("/api/controls").await.json();
        assert_eq!(controls["ventilationSpeed"], "medium");
    }

    #[tokio::test]
    async fn controls_default_then_patch() {
        let (server, _) = test_server();
        let before: Value = server.get("/api/controls").await.json();
        assert_eq!(before["lightingIntensity"], 85);
        assert_eq!(before["ventilationSpeed"], "medium");

        let resp = server
            .patch("/api/controls")
            .json(&json!({ "lightingIntensity": 40 }))
            .await;
        resp.assert_status_ok();
        let after: Value = resp.json();
        assert_eq!(after["lightingIntensity"], 40);
        assert_eq!(after["irrigation"], before["irrigation"]);
        assert_eq!(after["id"], before["id"]);

        let activities: Vec<Value> = server.get("/api/activities").await.json();
        assert_eq!(activities[0]["message"], "Control settings updated: lightingIntensity");
        assert_eq!(activities[0]["type"], "info");
    }

    #[tokio::test]
    async fn controls_patch_out_of_range_is_rejected() {
        let (server, _) = test_server();
        server
            .patch("/api/controls")
            .json(&json!({ "lightingIntensity": 150 }))
            .await
            .assert_status_bad_request();
    }

    #[tokio::test]
    async fn configuration_patch_merges_fields() {
        let (server, _) = test_server();
        let resp = server
            .patch("/api/configuration")
            .json(&json!({ "tempMax": "28.0", "smsAlerts": true }))
            .await;
        resp.assert_status_ok();

        let config: Value = server.get("/api/configuration").await.json();
        assert_eq!(config["tempMax"], "28.0");
        assert_eq!(config["tempMin"], "20.0");
        assert_eq!(config["smsAlerts"], true);
        assert_eq!(config["plantType"], "tomatoes");
    }

    #[tokio::test]
    async fn inverted_configuration_range_is_rejected() {
        let (server, _) = test_server();
        server
            .patch("/api/configuration")
            .json(&json!({ "tempMin": "30.0", "tempMax": "20.0" }))
            .await
            .assert_status_bad_request();

        let config: Value = server.get("/api/configuration").await.json();
        assert_eq!(config["tempMin"], "20.0");
    }

    // -----------------------------------------------------------------------
    // Alerts
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn acknowledge_flips_alert_and_filters_apply() {
        let (server, _) = test_server();
        server
            .post("/api/sensors")
            .json(&reading_body("27.5", "75.0"))
            .await
            .assert_status_ok();

        let open: Vec<Value> = server
            .get("/api/alerts")
            .add_query_param("acknowledged", false)
            .await
            .json();
        assert_eq!(open.len(), 2);
        let id = open[0]["id"].as_str().unwrap().to_owned();

        let resp = server.patch(&format!("/api/alerts/{id}/acknowledge")).await;
        resp.assert_status_ok();
        let acked: Value = resp.json();
        assert_eq!(acked["acknowledged"], true);

        // Second acknowledgement is harmless.
        server
            .patch(&format!("/api/alerts/{id}/acknowledge"))
            .await
            .assert_status_ok();

        let acked_list: Vec<Value> = server
            .get("/api/alerts")
            .add_query_param("acknowledged", true)
            .await
            .json();
        assert_eq!(acked_list.len(), 1);
        assert_eq!(acked_list[0]["id"], id.as_str());
    }

    #[tokio::test]
    async fn acknowledge_unknown_alert_is_404() {
        let (server, _) = test_server();
        let resp = server
            .patch(&format!("/api/alerts/{}/acknowledge", uuid::Uuid::new_v4()))
            .await;
        resp.assert_status_not_found();
    }

    // -----------------------------------------------------------------------
    // Plant analyses
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn plant_analysis_round_trip() {
        let (server, _) = test_server();
        let resp = server
            .post("/api/plants/analyses")
            .json(&json!({
                "plantName": "Basil",
                "healthStatus": "Attention",
                "analysis": "Possible nutrient deficiency detected",
                "confidence": "87.2"
            }))
            .await;
        resp.assert_status_ok();

        let list: Vec<Value> = server.get("/api/plants/analyses").await.json();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0]["plantName"], "Basil");
        assert!(list[0]["imagePath"].is_null());
    }

    #[tokio::test]
    async fn plant_analysis_without_name_is_rejected() {
        let (server, _) = test_server();
        server
            .post("/api/plants/analyses")
            .json(&json!({ "plantName": "", "healthStatus": "Healthy" }))
            .await
            .assert_status_bad_request();
    }

    // -----------------------------------------------------------------------
    // System
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn health_returns_ok() {
        let (server, _) = test_server();
        let resp = server.get("/health").await;
        resp.assert_status_ok();
        let body: Value = resp.json();
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn openapi_spec_is_served() {
        let (server, _) = test_server();
        let resp = server.get("/api-docs/openapi.json").await;
        resp.assert_status_ok();
        let body: Value = resp.json();
        assert_eq!(body["info"]["title"], "Greenhouse Monitor API");
        assert!(body["paths"]["/api/alerts/{id}/acknowledge"].is_object());
    }
}
