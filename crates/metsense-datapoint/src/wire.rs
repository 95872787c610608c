//! DataPoint JSON payloads and their conversion into domain types.
//!
//! DataPoint encodes every number as a string and collapses single-element
//! arrays (`Period`, `Rep`, `Location`) into bare objects.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use serde::Deserialize;

use crate::types::{
    visibility_text, weather_text, DatapointError, Forecast, ForecastDay, Measurement,
    MeasurementValue, Param, Site, Snapshot,
};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Self::Many(items) => items,
            Self::One(item) => vec![item],
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SiteListResponse {
    #[serde(rename = "Locations")]
    locations: SiteListLocations,
}

#[derive(Debug, Deserialize)]
struct SiteListLocations {
    #[serde(rename = "Location", default)]
    location: Option<OneOrMany<ApiSite>>,
}

#[derive(Debug, Deserialize)]
struct ApiSite {
    id: String,
    name: String,
    latitude: String,
    longitude: String,
    elevation: Option<String>,
    region: Option<String>,
    #[serde(rename = "unitaryAuthArea")]
    unitary_auth_area: Option<String>,
}

impl TryFrom<ApiSite> for Site {
    type Error = DatapointError;

    fn try_from(api: ApiSite) -> Result<Self, Self::Error> {
        let latitude = parse_coordinate(&api.latitude, &api.id)?;
        let longitude = parse_coordinate(&api.longitude, &api.id)?;
        Ok(Site {
            id: api.id,
            name: api.name,
            latitude,
            longitude,
            elevation: api.elevation.and_then(|e| e.parse().ok()),
            region: api.region,
            unitary_auth_area: api.unitary_auth_area,
        })
    }
}

fn parse_coordinate(raw: &str, site_id: &str) -> Result<f64, DatapointError> {
    raw.trim().parse().map_err(|_| {
        DatapointError::Parse(format!("site {}: invalid coordinate {:?}", site_id, raw))
    })
}

impl SiteListResponse {
    /// Sites with unusable coordinates are skipped.
    pub(crate) fn into_sites(self) -> Vec<Site> {
        self.locations
            .location
            .map(OneOrMany::into_vec)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|api| match Site::try_from(api) {
                Ok(site) => Some(site),
                Err(e) => {
                    tracing::warn!("Skipping site: {}", e);
                    None
                }
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ForecastResponse {
    #[serde(rename = "SiteRep")]
    site_rep: SiteRep,
}

#[derive(Debug, Deserialize)]
struct SiteRep {
    #[serde(rename = "Wx")]
    wx: Wx,
    #[serde(rename = "DV")]
    dv: DataValues,
}

#[derive(Debug, Deserialize)]
struct Wx {
    #[serde(rename = "Param", default)]
    param: Vec<ParamDef>,
}

#[derive(Debug, Deserialize)]
struct ParamDef {
    name: String,
    #[serde(default)]
    units: String,
}

#[derive(Debug, Deserialize)]
struct DataValues {
    #[serde(rename = "dataDate")]
    data_date: Option<String>,
    #[serde(rename = "Location")]
    location: ForecastLocation,
}

#[derive(Debug, Deserialize)]
struct ForecastLocation {
    i: String,
    name: Option<String>,
    #[serde(rename = "Period", default)]
    period: Option<OneOrMany<Period>>,
}

#[derive(Debug, Deserialize)]
struct Period {
    value: String,
    #[serde(rename = "Rep", default)]
    rep: Option<OneOrMany<HashMap<String, serde_json::Value>>>,
}

impl ForecastResponse {
    pub(crate) fn into_forecast(self) -> Result<Forecast, DatapointError> {
        let units: HashMap<String, String> = self
            .site_rep
            .wx
            .param
            .into_iter()
            .map(|p| (p.name, p.units))
            .collect();

        let dv = self.site_rep.dv;
        let data_date = dv
            .data_date
            .as_deref()
            .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
            .map(|d| d.with_timezone(&Utc));

        let days = dv
            .location
            .period
            .map(OneOrMany::into_vec)
            .unwrap_or_default()
            .into_iter()
            .map(|period| parse_period(period, &units))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Forecast {
            site_id: dv.location.i,
            site_name: dv.location.name,
            data_date,
            days,
        })
    }
}

fn parse_period(
    period: Period,
    units: &HashMap<String, String>,
) -> Result<ForecastDay, DatapointError> {
    let date = NaiveDate::parse_from_str(period.value.trim_end_matches('Z'), "%Y-%m-%d")
        .map_err(|e| DatapointError::Parse(format!("period {:?}: {}", period.value, e)))?;

    let mut timesteps = period
        .rep
        .map(OneOrMany::into_vec)
        .unwrap_or_default()
        .into_iter()
        .map(|rep| parse_rep(date, &rep, units))
        .collect::<Result<Vec<_>, _>>()?;
    timesteps.sort_by_key(|s| s.date);

    Ok(ForecastDay { date, timesteps })
}

fn parse_rep(
    date: NaiveDate,
    rep: &HashMap<String, serde_json::Value>,
    units: &HashMap<String, String>,
) -> Result<Snapshot, DatapointError> {
    // `$` is the step start in minutes after midnight
    let minutes: i64 = rep
        .get("$")
        .map(raw_string)
        .and_then(|m| m.parse().ok())
        .ok_or_else(|| DatapointError::Parse(format!("time step on {} has no offset", date)))?;
    let start = TimeDelta::try_minutes(minutes)
        .and_then(|offset| date.and_time(NaiveTime::MIN).and_utc().checked_add_signed(offset))
        .ok_or_else(|| {
            DatapointError::Parse(format!("time step offset {} on {} out of range", minutes, date))
        })?;

    let mut snapshot = Snapshot::new(start);
    for param in Param::ALL {
        let Some(raw) = rep.get(param.code()).map(raw_string) else {
            continue;
        };
        let unit = units.get(param.code()).cloned().unwrap_or_default();
        snapshot.set(param, measurement(param, raw, unit));
    }
    Ok(snapshot)
}

fn measurement(param: Param, raw: String, units: String) -> Measurement {
    let text = match param {
        Param::Weather => weather_text(&raw),
        Param::Visibility => visibility_text(&raw),
        _ => None,
    };

    let value = match raw.parse::<f64>() {
        Ok(n) if !param.is_coded() => MeasurementValue::Number(n),
        _ => MeasurementValue::Text(raw),
    };

    Measurement {
        value,
        units,
        text: text.map(str::to_string),
    }
}

fn raw_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_site_list_single_location_object() {
        let json = serde_json::json!({
            "Locations": {
                "Location": {
                    "id": "3772",
                    "name": "Heathrow",
                    "latitude": "51.479",
                    "longitude": "-0.449",
                    "elevation": "25.0"
                }
            }
        });
        let resp: SiteListResponse = serde_json::from_value(json).unwrap();
        let sites = resp.into_sites();
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].id, "3772");
        assert_eq!(sites[0].elevation, Some(25.0));
        assert!(sites[0].region.is_none());
    }

    #[test]
    fn test_site_list_skips_bad_coordinates() {
        let json = serde_json::json!({
            "Locations": {
                "Location": [
                    {"id": "1", "name": "Good", "latitude": "50.0", "longitude": "-3.0"},
                    {"id": "2", "name": "Bad", "latitude": "north", "longitude": "-3.0"}
                ]
            }
        });
        let resp: SiteListResponse = serde_json::from_value(json).unwrap();
        let sites = resp.into_sites();
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].name, "Good");
    }

    #[test]
    fn test_forecast_parses_rep_fields() {
        let json = serde_json::json!({
            "SiteRep": {
                "Wx": {"Param": [
                    {"name": "T", "units": "C", "$": "Temperature"},
                    {"name": "W", "units": "", "$": "Weather Type"},
                    {"name": "V", "units": "", "$": "Visibility"},
                    {"name": "D", "units": "compass", "$": "Wind Direction"}
                ]},
                "DV": {
                    "dataDate": "2024-03-01T09:00:00Z",
                    "type": "Forecast",
                    "Location": {
                        "i": "3772",
                        "name": "HEATHROW",
                        "Period": {
                            "type": "Day",
                            "value": "2024-03-01Z",
                            "Rep": [
                                {"T": "9", "W": "7", "V": "GO", "D": "SSW", "$": "720"},
                                {"T": "7", "W": "12", "V": "MO", "D": "S", "$": "540"}
                            ]
                        }
                    }
                }
            }
        });
        let resp: ForecastResponse = serde_json::from_value(json).unwrap();
        let forecast = resp.into_forecast().unwrap();

        assert_eq!(forecast.site_id, "3772");
        assert_eq!(
            forecast.data_date,
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap())
        );
        let steps = &forecast.days[0].timesteps;
        assert_eq!(steps.len(), 2);
        // sorted by start time
        assert_eq!(steps[0].date, Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap());

        let noon = &steps[1];
        let temp = noon.temperature.as_ref().unwrap();
        assert_eq!(temp.value, MeasurementValue::Number(9.0));
        assert_eq!(temp.units, "C");

        let weather = noon.weather.as_ref().unwrap();
        assert_eq!(weather.value, MeasurementValue::Text("7".into()));
        assert_eq!(weather.text.as_deref(), Some("Cloudy"));

        let vis = noon.visibility.as_ref().unwrap();
        assert_eq!(vis.text.as_deref(), Some("Good - Between 10-20 km"));

        let dir = noon.wind_direction.as_ref().unwrap();
        assert_eq!(dir.value, MeasurementValue::Text("SSW".into()));
        assert_eq!(dir.units, "compass");

        assert!(noon.humidity.is_none());
    }

    #[test]
    fn test_rep_without_offset_is_parse_error() {
        let json = serde_json::json!({
            "SiteRep": {
                "Wx": {"Param": []},
                "DV": {"Location": {"i": "1", "Period": [
                    {"value": "2024-03-01Z", "Rep": {"T": "9"}}
                ]}}
            }
        });
        let resp: ForecastResponse = serde_json::from_value(json).unwrap();
        assert!(matches!(resp.into_forecast(), Err(DatapointError::Parse(_))));
    }

    #[test]
    fn test_rep_with_out_of_range_offset_is_parse_error() {
        for offset in ["999999999999999999", "-999999999999999999"] {
            let json = serde_json::json!({
                "SiteRep": {
                    "Wx": {"Param": []},
                    "DV": {"Location": {"i": "1", "Period": [
                        {"value": "2024-03-01Z", "Rep": {"T": "9", "$": offset}}
                    ]}}
                }
            });
            let resp: ForecastResponse = serde_json::from_value(json).unwrap();
            let err = resp.into_forecast().unwrap_err();
            assert!(
                matches!(&err, DatapointError::Parse(msg) if msg.contains("out of range")),
                "unexpected error for {offset}: {err}"
            );
        }
    }
}
