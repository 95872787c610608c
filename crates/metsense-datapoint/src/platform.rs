//! Platform setup: turn configuration into a set of live sensors.

use std::sync::Arc;
use std::time::Duration;

use metsense_core::{AppError, Config, ConfigError};
use thiserror::Error;

use crate::fetcher::ThrottledFetcher;
use crate::provider::ForecastSource;
use crate::sensor::{Sensor, SensorKind};
use crate::types::{DatapointError, Location};

/// Reasons the platform could not be set up. No sensors exist afterwards.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Latitude or longitude not set")]
    MissingLocation,

    #[error("Connection error, check your settings for Met Office DataPoint: {0}")]
    Connection(#[from] DatapointError),
}

impl From<SetupError> for AppError {
    fn from(err: SetupError) -> Self {
        match err {
            SetupError::MissingLocation => AppError::Config(ConfigError::MissingSetting(
                "location.latitude/location.longitude".to_string(),
            )),
            SetupError::Connection(e) => e.into(),
        }
    }
}

/// Sensors created by [`setup_platform`].
pub struct Platform<S> {
    pub fetcher: Arc<ThrottledFetcher<S>>,
    pub sensors: Vec<Sensor<S>>,
    /// Configured identifiers that matched no sensor type
    pub rejected: Vec<String>,
}

/// Connect to DataPoint and create one sensor per monitored condition.
///
/// Unknown condition identifiers are logged and skipped; the remaining
/// sensors are still created.
///
/// # Errors
/// Fails when the location is missing or the first forecast fetch fails.
pub async fn setup_platform<S: ForecastSource>(
    config: &Config,
    source: S,
) -> Result<Platform<S>, SetupError> {
    let Some((latitude, longitude)) = config.location.coordinates() else {
        tracing::error!("Latitude or longitude not set in configuration");
        return Err(SetupError::MissingLocation);
    };

    let fetcher = ThrottledFetcher::connect_with_interval(
        source,
        Location::new(latitude, longitude),
        Duration::from_secs(config.polling.min_refresh_secs),
    )
    .await
    .map_err(|e| {
        tracing::error!("Connection error. Please check your settings for Met Office DataPoint: {}", e);
        SetupError::Connection(e)
    })?;
    let fetcher = Arc::new(fetcher);

    let mut sensors = Vec::new();
    let mut rejected = Vec::new();
    for variable in &config.datapoint.monitored_conditions {
        match variable.parse::<SensorKind>() {
            Ok(kind) => {
                tracing::debug!(
                    sensor = %kind,
                    nominal_unit = kind.nominal_unit(config.datapoint.unit_system).unwrap_or("-"),
                    "Creating sensor"
                );
                sensors.push(Sensor::new(fetcher.clone(), kind).await);
            }
            Err(e) => {
                tracing::error!("{}", e);
                rejected.push(variable.clone());
            }
        }
    }

    tracing::info!("Set up {} DataPoint sensors", sensors.len());
    Ok(Platform {
        fetcher,
        sensors,
        rejected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::tests::{snapshot_with_temperature, FakeSource};

    fn config(conditions: &[&str]) -> Config {
        let mut config = Config::default();
        config.datapoint.api_key = "key".to_string();
        config.location.latitude = Some(51.5);
        config.location.longitude = Some(-0.45);
        config.datapoint.monitored_conditions = conditions.iter().map(|c| c.to_string()).collect();
        config
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_conditions_are_skipped() {
        let source = FakeSource::new();
        source.push(Ok(snapshot_with_temperature(10.0)));

        let platform = setup_platform(&config(&["temperature", "pressure", "humidity"]), source)
            .await
            .unwrap();

        let kinds: Vec<_> = platform.sensors.iter().map(|s| s.kind()).collect();
        assert_eq!(kinds, vec![SensorKind::Temperature, SensorKind::Humidity]);
        assert_eq!(platform.rejected, vec!["pressure".to_string()]);
        assert_eq!(platform.fetcher.source().remote_fetches(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_location_aborts() {
        let mut cfg = config(&["temperature"]);
        cfg.location.longitude = None;

        let source = FakeSource::new();
        source.push(Ok(snapshot_with_temperature(10.0)));
        let result = setup_platform(&cfg, source).await;

        assert!(matches!(result, Err(SetupError::MissingLocation)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_connection_failure_aborts() {
        let source = FakeSource::new();
        source.push(Err(DatapointError::InvalidApiKey));

        let result = setup_platform(&config(&["temperature"]), source).await;

        assert!(matches!(
            result,
            Err(SetupError::Connection(DatapointError::InvalidApiKey))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_min_refresh_from_config() {
        let mut cfg = config(&["temperature"]);
        cfg.polling.min_refresh_secs = 300;
        let source = FakeSource::new();
        source.push(Ok(snapshot_with_temperature(10.0)));

        let platform = setup_platform(&cfg, source).await.unwrap();
        assert_eq!(platform.fetcher.min_interval(), Duration::from_secs(300));
    }

    #[test]
    fn test_setup_error_maps_to_app_error() {
        let app: AppError = SetupError::MissingLocation.into();
        assert!(matches!(app, AppError::Config(ConfigError::MissingSetting(_))));
    }
}
