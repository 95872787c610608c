//! End-to-end tests for platform setup against a mock DataPoint server.

use std::time::Duration;

use metsense_core::Config;
use metsense_datapoint::{setup_platform, DatapointClient, MeasurementValue, SensorKind};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn site_list() -> serde_json::Value {
    serde_json::json!({
        "Locations": {"Location": [
            {"id": "3772", "name": "Heathrow", "latitude": "51.479", "longitude": "-0.449"},
            {"id": "3162", "name": "Eskdalemuir", "latitude": "55.311", "longitude": "-3.206"}
        ]}
    })
}

fn forecast() -> serde_json::Value {
    serde_json::json!({
        "SiteRep": {
            "Wx": {"Param": [
                {"name": "F", "units": "C", "$": "Feels Like Temperature"},
                {"name": "G", "units": "mph", "$": "Wind Gust"},
                {"name": "H", "units": "%", "$": "Screen Relative Humidity"},
                {"name": "T", "units": "C", "$": "Temperature"},
                {"name": "V", "units": "", "$": "Visibility"},
                {"name": "D", "units": "compass", "$": "Wind Direction"},
                {"name": "S", "units": "mph", "$": "Wind Speed"},
                {"name": "W", "units": "", "$": "Weather Type"},
                {"name": "Pp", "units": "%", "$": "Precipitation Probability"}
            ]},
            "DV": {
                "dataDate": "2024-03-01T09:00:00Z",
                "type": "Forecast",
                "Location": {
                    "i": "3772",
                    "name": "HEATHROW",
                    "Period": [{
                        "type": "Day",
                        "value": "2024-03-01Z",
                        "Rep": [
                            {"D": "SSW", "F": "9.96", "G": "16", "H": "0.84", "Pp": "0.456",
                             "S": "7", "T": "12.34", "V": "GO", "W": "7", "$": "540"}
                        ]
                    }]
                }
            }
        }
    })
}

async fn mount_datapoint(server: &MockServer, expected_fetches: u64) {
    Mock::given(method("GET"))
        .and(path("/val/wxfcs/all/json/sitelist"))
        .and(query_param("key", "test_key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(site_list()))
        .expect(expected_fetches)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/val/wxfcs/all/json/3772"))
        .and(query_param("res", "3hourly"))
        .and(query_param("key", "test_key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast()))
        .expect(expected_fetches)
        .mount(server)
        .await;
}

fn config(conditions: &[&str]) -> Config {
    let mut config = Config::default();
    config.datapoint.api_key = "test_key".to_string();
    config.datapoint.monitored_conditions = conditions.iter().map(|c| c.to_string()).collect();
    config.location.latitude = Some(51.5074);
    config.location.longitude = Some(-0.1278);
    config
}

fn client(server: &MockServer) -> DatapointClient {
    DatapointClient::with_base_url("test_key", &server.uri(), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_all_sensors_from_one_fetch() {
    let server = MockServer::start().await;
    mount_datapoint(&server, 1).await;

    let ids: Vec<&str> = SensorKind::ALL.iter().map(|k| k.id()).collect();
    let mut platform = setup_platform(&config(&ids), client(&server)).await.unwrap();

    // within the refresh window: no further requests
    for sensor in &mut platform.sensors {
        sensor.update().await;
    }

    let state = |kind: SensorKind| {
        platform
            .sensors
            .iter()
            .find(|s| s.kind() == kind)
            .and_then(|s| s.state().cloned())
    };

    assert_eq!(state(SensorKind::Summary), Some(MeasurementValue::Text("Cloudy".into())));
    assert_eq!(state(SensorKind::Icon), Some(MeasurementValue::Text("7".into())));
    assert_eq!(state(SensorKind::PrecipProbability), Some(MeasurementValue::Number(45.6)));
    assert_eq!(state(SensorKind::Temperature), Some(MeasurementValue::Number(12.3)));
    assert_eq!(state(SensorKind::FeelsLikeTemperature), Some(MeasurementValue::Number(10.0)));
    assert_eq!(state(SensorKind::WindSpeed), Some(MeasurementValue::Number(7.0)));
    assert_eq!(state(SensorKind::WindGust), Some(MeasurementValue::Number(16.0)));
    assert_eq!(state(SensorKind::WindDirection), Some(MeasurementValue::Text("SSW".into())));
    assert_eq!(state(SensorKind::Humidity), Some(MeasurementValue::Number(84.0)));
    assert_eq!(state(SensorKind::Visibility), Some(MeasurementValue::Text("GO".into())));

    let temperature = platform
        .sensors
        .iter()
        .find(|s| s.kind() == SensorKind::Temperature)
        .unwrap();
    assert_eq!(temperature.name(), "Weather Temperature");
    assert_eq!(temperature.unit_of_measurement(), Some("C"));
}

#[tokio::test]
async fn test_unknown_condition_is_rejected() {
    let server = MockServer::start().await;
    mount_datapoint(&server, 1).await;

    let platform = setup_platform(&config(&["temperature", "uv_index"]), client(&server))
        .await
        .unwrap();

    assert_eq!(platform.sensors.len(), 1);
    assert_eq!(platform.rejected, vec!["uv_index".to_string()]);
}

#[tokio::test]
async fn test_zero_refresh_window_fetches_every_update() {
    let server = MockServer::start().await;
    mount_datapoint(&server, 3).await;

    let mut cfg = config(&["temperature"]);
    cfg.polling.min_refresh_secs = 0;
    // setup fetch + creation update + explicit update
    let mut platform = setup_platform(&cfg, client(&server)).await.unwrap();
    platform.sensors[0].update().await;

    assert_eq!(
        platform.sensors[0].state(),
        Some(&MeasurementValue::Number(12.3))
    );
}

#[tokio::test]
async fn test_invalid_key_fails_setup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/val/wxfcs/all/json/sitelist"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let result = setup_platform(&config(&["temperature"]), client(&server)).await;

    assert!(matches!(
        result,
        Err(metsense_datapoint::SetupError::Connection(
            metsense_datapoint::DatapointError::InvalidApiKey
        ))
    ));
}
