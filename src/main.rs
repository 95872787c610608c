use std::time::Duration;

use anyhow::Result;
use metsense_core::{AppError, Config};
use metsense_datapoint::{setup_platform, DatapointClient, SensorKind};

#[tokio::main]
async fn main() -> Result<()> {
    metsense_core::init()?;

    let known = SensorKind::ALL.map(SensorKind::id);
    let (config, _validation) = Config::load_validated(&known).inspect_err(|e| {
        eprintln!("{}", e.user_message());
    })?;

    let client = DatapointClient::from_config(&config.datapoint, &config.polling)
        .map_err(AppError::from)?;

    let mut platform = match setup_platform(&config, client).await {
        Ok(platform) => platform,
        Err(e) => {
            let err = AppError::from(e);
            eprintln!("{}", err.user_message());
            return Err(err.into());
        }
    };

    if !platform.rejected.is_empty() {
        tracing::warn!("Ignored unknown conditions: {}", platform.rejected.join(", "));
    }

    let location = platform.fetcher.location();
    tracing::info!(
        "MetSense started for {:.4}, {:.4} with {} sensors",
        location.latitude,
        location.longitude,
        platform.sensors.len()
    );

    let mut ticker = tokio::time::interval(Duration::from_secs(config.polling.scan_interval_secs));

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                for sensor in &mut platform.sensors {
                    sensor.update().await;
                    match sensor.state() {
                        Some(state) => tracing::info!(
                            "{} = {} {}",
                            sensor.name(),
                            state,
                            sensor.unit_of_measurement().unwrap_or_default()
                        ),
                        None => tracing::info!("{} has no value yet", sensor.name()),
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    Ok(())
}
