use std::{str::FromStr, time::Duration};

use anyhow::{bail, Context, Result};

use crate::{
    broadcast::DEFAULT_SUBSCRIBER_BUFFER,
    sensors::DEFAULT_TICK_INTERVAL,
    store::{Retention, DEFAULT_ACTIVITY_CAP, DEFAULT_READING_CAP},
};

/// Upper bound on `TICK_INTERVAL_SECS` (one day).
pub const MAX_TICK_INTERVAL_SECS: u64 = 86_400;

pub const DEFAULT_GATEWAY_TIMEOUT_SECS: u64 = 10;

// ---------------------------------------------------------------------------
// SourceKind
// ---------------------------------------------------------------------------

/// Which `ReadingSource` the tick loop drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Simulated,
    Hardware,
}

impl FromStr for SourceKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "simulated" => Ok(Self::Simulated),
            "hardware" => Ok(Self::Hardware),
            other => Err(anyhow::anyhow!("unknown sensor source: {other:?}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    /// Orchestrator tick period in seconds.
    pub tick_interval_secs: u64,
    pub reading_cap: usize,
    pub activity_cap: usize,
    /// Per-subscriber queue depth before events are dropped for that client.
    pub subscriber_buffer: usize,
    pub sensor_source: SourceKind,
    /// Fixed RNG seed for the simulated source; random when absent.
    pub sensor_seed: Option<u64>,
    /// Polled by the hardware source. Required when `sensor_source` is `hardware`.
    pub sensor_gateway_url: Option<String>,
    /// Per-request timeout for gateway polls; never longer than one tick.
    pub sensor_gateway_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let optional =
            |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_owned());

        let sensor_source = optional("SENSOR_SOURCE", "simulated")
            .trim()
            .parse::<SourceKind>()
            .context("SENSOR_SOURCE must be 'simulated' or 'hardware'")?;

        let sensor_gateway_url = lookup("SENSOR_GATEWAY_URL").filter(|s| !s.trim().is_empty());
        if sensor_source == SourceKind::Hardware && sensor_gateway_url.is_none() {
            bail!("missing required env var: SENSOR_GATEWAY_URL (SENSOR_SOURCE=hardware)");
        }

        let config = Self {
            server_host: optional("SERVER_HOST", "0.0.0.0"),
            server_port: optional("SERVER_PORT", "8080")
                .parse()
                .context("SERVER_PORT must be a valid port number")?,
            tick_interval_secs: optional(
                "TICK_INTERVAL_SECS",
                &DEFAULT_TICK_INTERVAL.as_secs().to_string(),
            )
                .parse()
                .context("TICK_INTERVAL_SECS must be a positive integer")?,
            reading_cap: optional("READING_CAP", &DEFAULT_READING_CAP.to_string())
                .parse()
                .context("READING_CAP must be a positive integer")?,
            activity_cap: optional("ACTIVITY_CAP", &DEFAULT_ACTIVITY_CAP.to_string())
                .parse()
                .context("ACTIVITY_CAP must be a positive integer")?,
            subscriber_buffer: optional("SUBSCRIBER_BUFFER", &DEFAULT_SUBSCRIBER_BUFFER.to_string())
                .parse()
                .context("SUBSCRIBER_BUFFER must be a positive integer")?,
            sensor_source,
            sensor_seed: lookup("SENSOR_SEED")
                .map(|s| s.parse())
                .transpose()
                .context("SENSOR_SEED must be an unsigned integer")?,
            sensor_gateway_url,
            sensor_gateway_timeout_secs: optional(
                "SENSOR_GATEWAY_TIMEOUT_SECS",
                &DEFAULT_GATEWAY_TIMEOUT_SECS.to_string(),
            )
            .parse()
            .context("SENSOR_GATEWAY_TIMEOUT_SECS must be a positive integer")?,
        };

        for (name, value) in [
            ("TICK_INTERVAL_SECS", config.tick_interval_secs),
            ("SENSOR_GATEWAY_TIMEOUT_SECS", config.sensor_gateway_timeout_secs),
        ] {
            if value == 0 {
                bail!("{name} must be a positive integer");
            }
        }
        if config.tick_interval_secs > MAX_TICK_INTERVAL_SECS {
            bail!(
                "TICK_INTERVAL_SECS must not exceed {MAX_TICK_INTERVAL_SECS}, got {}",
                config.tick_interval_secs
            );
        }
        for (name, value) in [
            ("READING_CAP", config.reading_cap),
            ("ACTIVITY_CAP", config.activity_cap),
            ("SUBSCRIBER_BUFFER", config.subscriber_buffer),
        ] {
            if value == 0 {
                bail!("{name} must be a positive integer");
            }
        }

        Ok(config)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    /// Gateway request timeout, clamped to the tick period.
    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_secs(self.sensor_gateway_timeout_secs.min(self.tick_interval_secs))
    }

    pub fn retention(&self) -> Retention {
        Retention {
            reading_cap: self.reading_cap,
            activity_cap: self.activity_cap,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let c = load(&[]).unwrap();
        assert_eq!(c.server_port, 8080);
        assert_eq!(c.tick_interval(), Duration::from_secs(30));
        assert_eq!(c.retention(), Retention::default());
        assert_eq!(c.sensor_source, SourceKind::Simulated);
        assert!(c.sensor_seed.is_none());
    }

    #[test]
    fn overrides_are_parsed() {
        let c = load(&[
            ("TICK_INTERVAL_SECS", "5"),
            ("READING_CAP", "50"),
            ("SENSOR_SEED", "42"),
        ])
        .unwrap();
        assert_eq!(c.tick_interval_secs, 5);
        assert_eq!(c.reading_cap, 50);
        assert_eq!(c.sensor_seed, Some(42));
    }

    #[test]
    fn hardware_source_requires_gateway_url() {
        let err = load(&[("SENSOR_SOURCE", "hardware")]).unwrap_err();
        assert!(err.to_string().contains("SENSOR_GATEWAY_URL"));

        let c = load(&[
            ("SENSOR_SOURCE", "hardware"),
            ("SENSOR_GATEWAY_URL", "http://gateway.local/readings"),
        ])
        .unwrap();
        assert_eq!(c.sensor_source, SourceKind::Hardware);
    }

    #[test]
    fn unknown_source_errors() {
        let err = load(&[("SENSOR_SOURCE", "lidar")]).unwrap_err();
        assert!(format!("{err:#}").contains("unknown sensor source"));
    }

    #[test]
    fn zero_caps_are_rejected() {
        assert!(load(&[("READING_CAP", "0")]).is_err());
        assert!(load(&[("TICK_INTERVAL_SECS", "0")]).is_err());
    }

    #[test]
    fn oversized_tick_interval_is_rejected() {
        let err = load(&[("TICK_INTERVAL_SECS", "18446744073709551615")]).unwrap_err();
        assert!(err.to_string().contains("must not exceed"));
        assert!(load(&[("TICK_INTERVAL_SECS", "86400")]).is_ok());
        assert!(load(&[("TICK_INTERVAL_SECS", "86401")]).is_err());
    }

    #[test]
    fn gateway_timeout_never_exceeds_tick_interval() {
        let c = load(&[]).unwrap();
        assert_eq!(c.gateway_timeout(), Duration::from_secs(10));

        let c = load(&[("TICK_INTERVAL_SECS", "5"), ("SENSOR_GATEWAY_TIMEOUT_SECS", "20")]).unwrap();
        assert_eq!(c.gateway_timeout(), Duration::from_secs(5));

        assert!(load(&[("SENSOR_GATEWAY_TIMEOUT_SECS", "0")]).is_err());
    }

    #[test]
    fn source_kind_from_str() {
        assert_eq!("simulated".parse::<SourceKind>().unwrap(), SourceKind::Simulated);
        assert_eq!("hardware".parse::<SourceKind>().unwrap(), SourceKind::Hardware);
    }
}
