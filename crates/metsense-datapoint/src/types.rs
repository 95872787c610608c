use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use metsense_core::{AppError, NetworkError, ReqwestErrorExt, WeatherError};

/// Geographic location used to pick the nearest forecast site
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A DataPoint forecast site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: Option<f64>,
    pub region: Option<String>,
    pub unitary_auth_area: Option<String>,
}

/// Forecast parameters carried in a time step, keyed by their DataPoint code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Param {
    Weather,
    PrecipitationProbability,
    Temperature,
    FeelsLikeTemperature,
    WindSpeed,
    WindGust,
    WindDirection,
    Humidity,
    Visibility,
}

impl Param {
    pub const ALL: [Param; 9] = [
        Param::Weather,
        Param::PrecipitationProbability,
        Param::Temperature,
        Param::FeelsLikeTemperature,
        Param::WindSpeed,
        Param::WindGust,
        Param::WindDirection,
        Param::Humidity,
        Param::Visibility,
    ];

    /// Code used for this parameter in `Rep` entries and `Wx` definitions
    pub fn code(&self) -> &'static str {
        match self {
            Self::Weather => "W",
            Self::PrecipitationProbability => "Pp",
            Self::Temperature => "T",
            Self::FeelsLikeTemperature => "F",
            Self::WindSpeed => "S",
            Self::WindGust => "G",
            Self::WindDirection => "D",
            Self::Humidity => "H",
            Self::Visibility => "V",
        }
    }

    /// Whether values for this parameter are codes rather than quantities
    pub fn is_coded(&self) -> bool {
        matches!(self, Self::Weather | Self::WindDirection | Self::Visibility)
    }
}

/// Raw value of a single measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MeasurementValue {
    Number(f64),
    Text(String),
}

impl MeasurementValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }
}

impl std::fmt::Display for MeasurementValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// One measured field of a time step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub value: MeasurementValue,
    pub units: String,
    /// Human-readable text for coded values (weather type, visibility)
    pub text: Option<String>,
}

impl Measurement {
    pub fn number(value: f64, units: impl Into<String>) -> Self {
        Self {
            value: MeasurementValue::Number(value),
            units: units.into(),
            text: None,
        }
    }

    pub fn text(value: impl Into<String>, units: impl Into<String>) -> Self {
        Self {
            value: MeasurementValue::Text(value.into()),
            units: units.into(),
            text: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

/// Forecast conditions for one site at one time step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub date: DateTime<Utc>,
    pub weather: Option<Measurement>,
    pub precipitation: Option<Measurement>,
    pub temperature: Option<Measurement>,
    pub feels_like_temperature: Option<Measurement>,
    pub wind_speed: Option<Measurement>,
    pub wind_gust: Option<Measurement>,
    pub wind_direction: Option<Measurement>,
    pub humidity: Option<Measurement>,
    pub visibility: Option<Measurement>,
}

impl Snapshot {
    pub fn new(date: DateTime<Utc>) -> Self {
        Self {
            date,
            weather: None,
            precipitation: None,
            temperature: None,
            feels_like_temperature: None,
            wind_speed: None,
            wind_gust: None,
            wind_direction: None,
            humidity: None,
            visibility: None,
        }
    }

    fn slot(&mut self, param: Param) -> &mut Option<Measurement> {
        match param {
            Param::Weather => &mut self.weather,
            Param::PrecipitationProbability => &mut self.precipitation,
            Param::Temperature => &mut self.temperature,
            Param::FeelsLikeTemperature => &mut self.feels_like_temperature,
            Param::WindSpeed => &mut self.wind_speed,
            Param::WindGust => &mut self.wind_gust,
            Param::WindDirection => &mut self.wind_direction,
            Param::Humidity => &mut self.humidity,
            Param::Visibility => &mut self.visibility,
        }
    }

    pub fn get(&self, param: Param) -> Option<&Measurement> {
        match param {
            Param::Weather => self.weather.as_ref(),
            Param::PrecipitationProbability => self.precipitation.as_ref(),
            Param::Temperature => self.temperature.as_ref(),
            Param::FeelsLikeTemperature => self.feels_like_temperature.as_ref(),
            Param::WindSpeed => self.wind_speed.as_ref(),
            Param::WindGust => self.wind_gust.as_ref(),
            Param::WindDirection => self.wind_direction.as_ref(),
            Param::Humidity => self.humidity.as_ref(),
            Param::Visibility => self.visibility.as_ref(),
        }
    }

    pub fn set(&mut self, param: Param, measurement: Measurement) {
        *self.slot(param) = Some(measurement);
    }

    pub fn with(mut self, param: Param, measurement: Measurement) -> Self {
        self.set(param, measurement);
        self
    }
}

/// One forecast day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub date: NaiveDate,
    pub timesteps: Vec<Snapshot>,
}

/// Site forecast as returned by DataPoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub site_id: String,
    pub site_name: Option<String>,
    pub data_date: Option<DateTime<Utc>>,
    pub days: Vec<ForecastDay>,
}

impl Forecast {
    /// Time step covering the current time
    pub fn now(&self) -> Result<&Snapshot, DatapointError> {
        self.at(Utc::now())
    }

    /// Latest time step starting at or before `when`. Falls back to the
    /// earliest time step when the whole forecast lies in the future.
    pub fn at(&self, when: DateTime<Utc>) -> Result<&Snapshot, DatapointError> {
        let mut timesteps = self.days.iter().flat_map(|d| d.timesteps.iter());
        let first = timesteps.next().ok_or(DatapointError::EmptyForecast)?;

        let current = std::iter::once(first)
            .chain(timesteps)
            .filter(|t| t.date <= when)
            .max_by_key(|t| t.date);

        Ok(current.unwrap_or(first))
    }
}

/// Text for a DataPoint significant weather code
pub fn weather_text(code: &str) -> Option<&'static str> {
    let text = match code {
        "NA" => "Not available",
        "0" => "Clear night",
        "1" => "Sunny day",
        "2" => "Partly cloudy (night)",
        "3" => "Partly cloudy (day)",
        "4" => "Not used",
        "5" => "Mist",
        "6" => "Fog",
        "7" => "Cloudy",
        "8" => "Overcast",
        "9" => "Light rain shower (night)",
        "10" => "Light rain shower (day)",
        "11" => "Drizzle",
        "12" => "Light rain",
        "13" => "Heavy rain shower (night)",
        "14" => "Heavy rain shower (day)",
        "15" => "Heavy rain",
        "16" => "Sleet shower (night)",
        "17" => "Sleet shower (day)",
        "18" => "Sleet",
        "19" => "Hail shower (night)",
        "20" => "Hail shower (day)",
        "21" => "Hail",
        "22" => "Light snow shower (night)",
        "23" => "Light snow shower (day)",
        "24" => "Light snow",
        "25" => "Heavy snow shower (night)",
        "26" => "Heavy snow shower (day)",
        "27" => "Heavy snow",
        "28" => "Thunder shower (night)",
        "29" => "Thunder shower (day)",
        "30" => "Thunder",
        _ => return None,
    };
    Some(text)
}

/// Text for a DataPoint visibility code
pub fn visibility_text(code: &str) -> Option<&'static str> {
    let text = match code {
        "UN" => "Unknown",
        "VP" => "Very poor - Less than 1 km",
        "PO" => "Poor - Between 1-4 km",
        "MO" => "Moderate - Between 4-10 km",
        "GO" => "Good - Between 10-20 km",
        "VG" => "Very good - Between 20-40 km",
        "EX" => "Excellent - More than 40 km",
        _ => return None,
    };
    Some(text)
}

/// DataPoint client errors
#[derive(Debug, thiserror::Error)]
pub enum DatapointError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Invalid API key")]
    InvalidApiKey,
    #[error("Site not found: {0}")]
    SiteNotFound(String),
    #[error("No forecast sites available")]
    NoSites,
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Forecast contains no time steps")]
    EmptyForecast,
}

impl From<DatapointError> for AppError {
    fn from(err: DatapointError) -> Self {
        match err {
            DatapointError::Network(e) => AppError::Network(e.into_network_error()),
            DatapointError::InvalidApiKey => AppError::Weather(WeatherError::InvalidApiKey),
            DatapointError::SiteNotFound(id) => AppError::Weather(WeatherError::SiteNotFound(id)),
            DatapointError::NoSites => {
                AppError::Weather(WeatherError::SiteNotFound("no sites listed".to_string()))
            }
            DatapointError::Api { status, message } if status >= 500 => {
                AppError::Network(NetworkError::ServerError { status, message })
            }
            DatapointError::Api { status, message } => {
                AppError::Weather(WeatherError::ApiError(format!("{}: {}", status, message)))
            }
            DatapointError::Parse(msg) => AppError::Network(NetworkError::InvalidResponse(msg)),
            DatapointError::EmptyForecast => AppError::Weather(WeatherError::ServiceUnavailable),
        }
    }
}
