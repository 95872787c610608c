use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::{AppError, ConfigError};

/// Default DataPoint endpoint.
pub const DEFAULT_DATAPOINT_URL: &str = "http://datapoint.metoffice.gov.uk/public/data/";

/// Prefix for environment overrides, e.g. `METSENSE__DATAPOINT__API_KEY`.
const ENV_PREFIX: &str = "METSENSE";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a single-line message summarizing all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// DataPoint service settings
    #[serde(default)]
    pub datapoint: DatapointConfig,

    /// Where to look for the nearest forecast site
    #[serde(default)]
    pub location: LocationConfig,

    /// Update schedule
    #[serde(default)]
    pub polling: PollingConfig,
}

/// Regional unit conventions for the nominal sensor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    Si,
    Us,
    Ca,
    #[default]
    Uk,
    Uk2,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatapointConfig {
    /// DataPoint API key
    /// Register at: https://www.metoffice.gov.uk/services/data/datapoint
    pub api_key: String,

    /// Sensor identifiers to create, e.g. `temperature`, `humidity`
    #[serde(default = "default_monitored_conditions")]
    pub monitored_conditions: Vec<String>,

    /// Unit convention used when describing sensors
    #[serde(default)]
    pub unit_system: UnitSystem,

    /// API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_monitored_conditions() -> Vec<String> {
    ["summary", "temperature", "humidity"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_base_url() -> String {
    DEFAULT_DATAPOINT_URL.to_string()
}

impl DatapointConfig {
    /// Check if the API key is set (not a placeholder)
    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty() && !self.api_key.starts_with("YOUR_")
    }
}

impl Default for DatapointConfig {
    fn default() -> Self {
        Self {
            api_key: "YOUR_DATAPOINT_API_KEY".to_string(),
            monitored_conditions: default_monitored_conditions(),
            unit_system: UnitSystem::default(),
            base_url: default_base_url(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl LocationConfig {
    /// Both coordinates, if set.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// How often the host updates every sensor (default: 60)
    #[serde(default = "default_scan_interval")]
    pub scan_interval_secs: u64,
    /// Minimum time between two forecast downloads (default: 120)
    #[serde(default = "default_min_refresh")]
    pub min_refresh_secs: u64,
    /// HTTP request timeout (default: 10)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_scan_interval() -> u64 {
    60
}

fn default_min_refresh() -> u64 {
    120
}

fn default_request_timeout() -> u64 {
    10
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            scan_interval_secs: default_scan_interval(),
            min_refresh_secs: default_min_refresh(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Config {
    /// Load configuration from the default path, creating it if it doesn't exist
    pub fn load() -> Result<Self, AppError> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from `path`, layered with `METSENSE__*` environment
    /// variables. A default file is written first if none exists.
    pub fn load_from(path: &Path) -> Result<Self, AppError> {
        if !path.exists() {
            Self::default().save_to(path)?;
            tracing::info!("Wrote default configuration to {}", path.display());
        }

        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))?;

        let config = settings
            .try_deserialize()
            .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))?;
        Ok(config)
    }

    /// Load configuration and validate it against the supported condition ids
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated(
        known_conditions: &[&str],
    ) -> Result<(Self, ValidationResult), AppError> {
        let config = Self::load()?;
        let validation = config.validate(known_conditions);

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration. `known_conditions` lists the sensor
    /// identifiers the caller can create.
    pub fn validate(&self, known_conditions: &[&str]) -> ValidationResult {
        let mut result = ValidationResult::default();

        if !self.datapoint.is_configured() {
            result.add_error("datapoint.api_key", "DataPoint API key is not set");
        }

        self.validate_url(&self.datapoint.base_url, "datapoint.base_url", &mut result);

        if self.datapoint.monitored_conditions.is_empty() {
            result.add_warning(
                "datapoint.monitored_conditions",
                "No conditions monitored - no sensors will be created",
            );
        }

        for condition in &self.datapoint.monitored_conditions {
            if !known_conditions.contains(&condition.as_str()) {
                result.add_warning(
                    "datapoint.monitored_conditions",
                    format!("Unknown condition \"{}\" will be ignored", condition),
                );
            }
        }

        match self.location.latitude {
            None => result.add_error("location.latitude", "Latitude is not set"),
            Some(lat) if !(-90.0..=90.0).contains(&lat) => result.add_error(
                "location.latitude",
                format!("Latitude must be between -90 and 90, got {}", lat),
            ),
            Some(_) => {}
        }

        match self.location.longitude {
            None => result.add_error("location.longitude", "Longitude is not set"),
            Some(lon) if !(-180.0..=180.0).contains(&lon) => result.add_error(
                "location.longitude",
                format!("Longitude must be between -180 and 180, got {}", lon),
            ),
            Some(_) => {}
        }

        if self.polling.scan_interval_secs == 0 {
            result.add_error(
                "polling.scan_interval_secs",
                "Scan interval must be greater than 0",
            );
        }

        if self.polling.min_refresh_secs < 60 {
            result.add_warning(
                "polling.min_refresh_secs",
                "Refreshing more than once a minute may exhaust the DataPoint quota",
            );
        }

        if self.polling.request_timeout_secs == 0 {
            result.add_error(
                "polling.request_timeout_secs",
                "Request timeout must be greater than 0",
            );
        }

        result
    }

    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<(), AppError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Invalid(format!("cannot serialize: {}", e)))?;

        std::fs::write(path, contents)?;

        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ConfigError::NotFound("platform config directory unknown".into()))?
            .join("metsense");

        Ok(config_dir.join("config.toml"))
    }
}
