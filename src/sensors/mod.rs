pub mod gateway;
pub mod service;
pub mod source;

pub use service::{SensorPipeline, SensorService, DEFAULT_TICK_INTERVAL};
pub use source::{Profile, ReadingSource, SimulatedSource};
