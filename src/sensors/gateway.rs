use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use tracing::debug;

use crate::store::models::NewReading;

/// Polls a sensor gateway over HTTP for the current reading.
///
/// The gateway answers `GET <url>` with
/// `{"temperature": .., "humidity": .., "soilMoisture": .., "lightLevel": ..}`;
/// decimals may be JSON strings or numbers.
#[derive(Debug, Clone)]
pub struct GatewaySource {
    http: Client,
    url: String,
}

impl GatewaySource {
    /// `timeout` bounds each poll end to end (connect, headers and body).
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build sensor gateway HTTP client")?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }

    pub async fn poll(&self) -> Result<NewReading> {
        debug!(url = %self.url, "Polling sensor gateway");

        let bytes = self
            .http
            .get(&self.url)
            .send()
            .await
            .context("Sensor gateway request failed")?
            .error_for_status()
            .context("Sensor gateway returned error status")?
            .bytes()
            .await
            .context("Failed to read sensor gateway response body")?;

        let reading = serde_json::from_slice::<NewReading>(&bytes)
            .context("Failed to deserialize sensor gateway response")?;
        reading.validate()?;
        Ok(reading)
    }
}
