use anyhow::Result;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rust_decimal::Decimal;

use super::gateway::GatewaySource;
use crate::store::models::NewReading;

/// Where the tick loop gets its readings from. The orchestrator does not
/// care which variant it is driving.
pub enum ReadingSource {
    Simulated(SimulatedSource),
    Hardware(GatewaySource),
}

impl ReadingSource {
    pub async fn produce(&mut self) -> Result<NewReading> {
        match self {
            ReadingSource::Simulated(sim) => Ok(sim.produce()),
            ReadingSource::Hardware(gateway) => gateway.poll().await,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            ReadingSource::Simulated(_) => "simulated",
            ReadingSource::Hardware(_) => "hardware",
        }
    }
}

/// Centre value and peak-to-peak spread of a simulated quantity.
#[derive(Debug, Clone, Copy)]
pub struct Jitter {
    pub base: f64,
    pub amplitude: f64,
}

impl Jitter {
    fn sample(self, rng: &mut StdRng) -> f64 {
        self.base + (rng.random::<f64>() - 0.5) * self.amplitude
    }
}

pub const TEMPERATURE: Jitter = Jitter { base: 24.5, amplitude: 4.0 };
pub const HUMIDITY: Jitter = Jitter { base: 68.0, amplitude: 10.0 };
pub const SOIL_MOISTURE: Jitter = Jitter { base: 45.0, amplitude: 8.0 };
pub const LIGHT_LEVEL: Jitter = Jitter { base: 2850.0, amplitude: 500.0 };

/// Bases and amplitudes for the four simulated quantities.
#[derive(Debug, Clone, Copy)]
pub struct Profile {
    pub temperature: Jitter,
    pub humidity: Jitter,
    pub soil_moisture: Jitter,
    pub light_level: Jitter,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            temperature: TEMPERATURE,
            humidity: HUMIDITY,
            soil_moisture: SOIL_MOISTURE,
            light_level: LIGHT_LEVEL,
        }
    }
}

/// Synthetic greenhouse: every field wanders independently around its base.
pub struct SimulatedSource {
    rng: StdRng,
    profile: Profile,
}

impl SimulatedSource {
    /// Same seed, same sequence of readings.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            profile: Profile::default(),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
            profile: Profile::default(),
        }
    }

    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = profile;
        self
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn produce(&mut self) -> NewReading {
        let p = self.profile;
        NewReading {
            temperature: one_decimal(p.temperature.sample(&mut self.rng)),
            humidity: one_decimal(p.humidity.sample(&mut self.rng)),
            soil_moisture: one_decimal(p.soil_moisture.sample(&mut self.rng)),
            light_level: p.light_level.sample(&mut self.rng).floor() as i32,
        }
    }
}

/// Fixed-point with exactly one fractional digit (`24.5`, `68.0`).
fn one_decimal(v: f64) -> Decimal {
    Decimal::new((v * 10.0).round() as i64, 1)
}
