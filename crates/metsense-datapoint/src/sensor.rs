//! Per-field sensors projected out of the shared forecast snapshot.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use metsense_core::UnitSystem;

use crate::fetcher::ThrottledFetcher;
use crate::provider::ForecastSource;
use crate::types::{Measurement, MeasurementValue, Param, Snapshot};

/// Prefix of every sensor name.
pub const CLIENT_NAME: &str = "Weather";

/// Sensor types supported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
    Summary,
    Icon,
    PrecipProbability,
    Temperature,
    FeelsLikeTemperature,
    WindSpeed,
    WindGust,
    WindDirection,
    Humidity,
    Visibility,
}

type Transform = fn(&Measurement) -> Result<MeasurementValue, ExtractError>;

/// Static description of a sensor type.
pub struct FieldSpec {
    pub id: &'static str,
    pub name: &'static str,
    /// Nominal units as si, us, ca, uk, uk2.
    pub units: [Option<&'static str>; 5],
    pub param: Param,
    transform: Transform,
}

const PERCENT: [Option<&str>; 5] = [Some("%"); 5];
const DEGREES_C: [Option<&str>; 5] = [Some("°C"), Some("°F"), Some("°C"), Some("°C"), Some("°C")];
const SPEED: [Option<&str>; 5] = [Some("m/s"), Some("mph"), Some("km/h"), Some("mph"), Some("mph")];

// Indexed by `SensorKind as usize`
static FIELDS: [FieldSpec; 10] = [
    FieldSpec {
        id: "summary",
        name: "Summary",
        units: [None; 5],
        param: Param::Weather,
        transform: summary_text,
    },
    FieldSpec {
        id: "icon",
        name: "Icon",
        units: [None; 5],
        param: Param::Weather,
        transform: passthrough,
    },
    FieldSpec {
        id: "precip_probability",
        name: "Precip Probability",
        units: PERCENT,
        param: Param::PrecipitationProbability,
        transform: percentage,
    },
    FieldSpec {
        id: "temperature",
        name: "Temperature",
        units: DEGREES_C,
        param: Param::Temperature,
        transform: rounded,
    },
    FieldSpec {
        id: "feels_like_temperature",
        name: "Feels Like Temperature",
        units: DEGREES_C,
        param: Param::FeelsLikeTemperature,
        transform: rounded,
    },
    FieldSpec {
        id: "wind_speed",
        name: "Wind Speed",
        units: SPEED,
        param: Param::WindSpeed,
        transform: passthrough,
    },
    FieldSpec {
        id: "wind_gust",
        name: "Wind Gust",
        units: SPEED,
        param: Param::WindGust,
        transform: passthrough,
    },
    FieldSpec {
        id: "wind_direction",
        name: "Wind Direction",
        units: [Some("°"); 5],
        param: Param::WindDirection,
        transform: passthrough,
    },
    FieldSpec {
        id: "humidity",
        name: "Humidity",
        units: PERCENT,
        param: Param::Humidity,
        transform: percentage,
    },
    FieldSpec {
        id: "visibility",
        name: "Visibility",
        units: [Some("km"), Some("m"), Some("km"), Some("km"), Some("m")],
        param: Param::Visibility,
        transform: passthrough,
    },
];

impl SensorKind {
    pub const ALL: [SensorKind; 10] = [
        SensorKind::Summary,
        SensorKind::Icon,
        SensorKind::PrecipProbability,
        SensorKind::Temperature,
        SensorKind::FeelsLikeTemperature,
        SensorKind::WindSpeed,
        SensorKind::WindGust,
        SensorKind::WindDirection,
        SensorKind::Humidity,
        SensorKind::Visibility,
    ];

    pub fn spec(self) -> &'static FieldSpec {
        &FIELDS[self as usize]
    }

    /// Identifier used in `monitored_conditions`
    pub fn id(self) -> &'static str {
        self.spec().id
    }

    pub fn display_name(self) -> &'static str {
        self.spec().name
    }

    /// Unit a sensor nominally reports in for a regional convention. The
    /// live unit always comes from the forecast itself.
    pub fn nominal_unit(self, system: UnitSystem) -> Option<&'static str> {
        let idx = match system {
            UnitSystem::Si => 0,
            UnitSystem::Us => 1,
            UnitSystem::Ca => 2,
            UnitSystem::Uk => 3,
            UnitSystem::Uk2 => 4,
        };
        self.spec().units[idx]
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Sensor type: \"{0}\" does not exist")]
pub struct UnknownSensorKind(pub String);

impl FromStr for SensorKind {
    type Err = UnknownSensorKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SensorKind::ALL
            .into_iter()
            .find(|kind| kind.id() == s)
            .ok_or_else(|| UnknownSensorKind(s.to_string()))
    }
}

/// Why a reading could not be produced from the current snapshot
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExtractError {
    #[error("No forecast snapshot available")]
    NoSnapshot,
    #[error("Snapshot has no {0} field")]
    MissingField(&'static str),
    #[error("Snapshot field {0} has no text")]
    MissingText(&'static str),
    #[error("Snapshot field {field} is not numeric: {value}")]
    NotNumeric { field: &'static str, value: String },
}

fn passthrough(m: &Measurement) -> Result<MeasurementValue, ExtractError> {
    Ok(m.value.clone())
}

fn summary_text(m: &Measurement) -> Result<MeasurementValue, ExtractError> {
    m.text
        .clone()
        .map(MeasurementValue::Text)
        .ok_or(ExtractError::MissingText(Param::Weather.code()))
}

fn numeric(m: &Measurement) -> Result<f64, ExtractError> {
    m.value.as_f64().ok_or_else(|| ExtractError::NotNumeric {
        field: "value",
        value: m.value.to_string(),
    })
}

// Correctly rounded to one decimal, ties to even
fn round1(value: f64) -> f64 {
    format!("{:.1}", value).parse().unwrap_or(value)
}

fn percentage(m: &Measurement) -> Result<MeasurementValue, ExtractError> {
    Ok(MeasurementValue::Number(round1(numeric(m)? * 100.0)))
}

fn rounded(m: &Measurement) -> Result<MeasurementValue, ExtractError> {
    Ok(MeasurementValue::Number(round1(numeric(m)?)))
}

/// Latest value and unit held by a sensor
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub value: MeasurementValue,
    pub unit: Option<String>,
}

/// Project one sensor's reading out of a snapshot.
///
/// # Errors
/// Fails when there is no snapshot, the field is absent, or the value has
/// the wrong shape for the sensor's transform.
pub fn extract(kind: SensorKind, snapshot: Option<&Snapshot>) -> Result<Reading, ExtractError> {
    let spec = kind.spec();
    let snapshot = snapshot.ok_or(ExtractError::NoSnapshot)?;
    let measurement = snapshot
        .get(spec.param)
        .ok_or(ExtractError::MissingField(spec.param.code()))?;

    let value = (spec.transform)(measurement).map_err(|e| match e {
        ExtractError::NotNumeric { value, .. } => ExtractError::NotNumeric {
            field: spec.param.code(),
            value,
        },
        other => other,
    })?;

    let unit = Some(measurement.units.clone()).filter(|u| !u.is_empty());
    Ok(Reading { value, unit })
}

/// A single weather sensor bound to a shared fetcher.
pub struct Sensor<S> {
    fetcher: Arc<ThrottledFetcher<S>>,
    kind: SensorKind,
    reading: Option<Reading>,
}

impl<S: ForecastSource> Sensor<S> {
    /// Create the sensor and take its first reading.
    pub async fn new(fetcher: Arc<ThrottledFetcher<S>>, kind: SensorKind) -> Self {
        let mut sensor = Self {
            fetcher,
            kind,
            reading: None,
        };
        sensor.update().await;
        sensor
    }

    /// Refresh the forecast if due and re-read this sensor's field.
    ///
    /// Any failure leaves the previous reading in place.
    pub async fn update(&mut self) {
        if let Err(e) = self.fetcher.update().await {
            tracing::debug!(sensor = %self.kind, "Forecast refresh failed: {}", e);
        }

        let snapshot = self.fetcher.snapshot().await;
        match extract(self.kind, snapshot.as_deref()) {
            Ok(reading) => self.reading = Some(reading),
            Err(e) => {
                tracing::debug!(sensor = %self.kind, "Keeping previous reading: {}", e);
            }
        }
    }

    pub fn name(&self) -> String {
        format!("{} {}", CLIENT_NAME, self.kind.display_name())
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    pub fn reading(&self) -> Option<&Reading> {
        self.reading.as_ref()
    }

    pub fn state(&self) -> Option<&MeasurementValue> {
        self.reading.as_ref().map(|r| &r.value)
    }

    pub fn unit_of_measurement(&self) -> Option<&str> {
        self.reading.as_ref().and_then(|r| r.unit.as_deref())
    }
}
