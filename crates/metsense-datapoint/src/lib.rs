//! Met Office DataPoint sensors for MetSense
//!
//! Fetches the current 3-hourly forecast step for the nearest DataPoint site,
//! at most once per refresh window, and projects individual fields out of it
//! as unit-tagged sensor readings.

pub mod client;
pub mod fetcher;
pub mod geo;
pub mod platform;
pub mod provider;
pub mod sensor;
pub mod types;
mod wire;

pub use client::DatapointClient;
pub use fetcher::{ThrottledFetcher, MIN_TIME_BETWEEN_UPDATES};
pub use platform::{setup_platform, Platform, SetupError};
pub use provider::ForecastSource;
pub use sensor::{extract, ExtractError, Reading, Sensor, SensorKind, UnknownSensorKind};
pub use types::*;
