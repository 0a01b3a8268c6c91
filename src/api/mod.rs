pub mod dto;
pub mod errors;
pub mod extract;
pub mod handlers;
pub mod ws;

use axum::{
    routing::{get, patch, post},
    Router,
};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;

use handlers::ApiDoc;

use crate::{broadcast::Hub, control::ControlService, sensors::SensorPipeline, store::Store};

/// Everything a handler may touch. Cheap to clone: each field is an
/// `Arc`-backed handle onto shared state.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub hub: Hub,
    pub pipeline: SensorPipeline,
    pub control: ControlService,
}

impl AppState {
    pub fn new(store: Store, hub: Hub) -> Self {
        Self {
            pipeline: SensorPipeline::new(store.clone(), hub.clone()),
            control: ControlService::new(store.clone(), hub.clone()),
            store,
            hub,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .route("/api/sensors/latest", get(handlers::get_latest_reading))
        .route("/api/sensors/history", get(handlers::get_reading_history))
        .route("/api/sensors", post(handlers::ingest_reading))
        .route(
            "/api/controls",
            get(handlers::get_control_settings).patch(handlers::update_control_settings),
        )
        .route(
            "/api/configuration",
            get(handlers::get_configuration).patch(handlers::update_configuration),
        )
        .route("/api/alerts", get(handlers::list_alerts))
        .route(
            "/api/alerts/{id}/acknowledge",
            patch(handlers::acknowledge_alert),
        )
        .route("/api/activities", get(handlers::list_activities))
        .route(
            "/api/plants/analyses",
            get(handlers::list_plant_analyses).post(handlers::record_plant_analysis),
        )
        .route("/ws", get(ws::subscribe))
        .with_state(state)
        .split_for_parts();

    router
        .route("/health", get(handlers::health))
        .route(
            "/api-docs/openapi.json",
            get(move || async move { axum::Json(api) }),
        )
}
