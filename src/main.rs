use anyhow::Result;
use tokio::{net::TcpListener, signal};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use greenhouse_monitor::{
    api::{self, AppState},
    broadcast::Hub,
    config::{Config, SourceKind},
    sensors::{gateway::GatewaySource, ReadingSource, SensorPipeline, SensorService, SimulatedSource},
    store::Store,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env (ignore error if file absent; env vars may be set externally)
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;

    let store = Store::new(config.retention());
    let seed = store.seed_defaults().await;
    info!(
        reading_id = %seed.id,
        reading_cap = config.reading_cap,
        activity_cap = config.activity_cap,
        "Store seeded"
    );

    let hub = Hub::new(config.subscriber_buffer);

    let source = match (config.sensor_source, &config.sensor_gateway_url) {
        (SourceKind::Hardware, Some(url)) => {
            ReadingSource::Hardware(GatewaySource::new(url, config.gateway_timeout())?)
        }
        _ => match config.sensor_seed {
            Some(seed) => ReadingSource::Simulated(SimulatedSource::seeded(seed)),
            None => ReadingSource::Simulated(SimulatedSource::from_entropy()),
        },
    };

    // Spawn the sensor tick loop; it shares the store and hub with the HTTP side
    {
        let pipeline = SensorPipeline::new(store.clone(), hub.clone());
        let service = SensorService::new(source, pipeline, config.tick_interval());
        tokio::spawn(service.run());
    }

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = TcpListener::bind(&addr).await?;
    info!(addr = %addr, "HTTP server listening");

    axum::serve(listener, api::router(AppState::new(store, hub)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
