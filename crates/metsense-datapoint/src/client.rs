//! Met Office DataPoint API client.

use std::time::Duration;

use metsense_core::{DatapointConfig, PollingConfig};
use reqwest::Client;
use tracing::instrument;

use crate::geo;
use crate::provider::ForecastSource;
use crate::types::{DatapointError, Forecast, Site};
use crate::wire::{ForecastResponse, SiteListResponse};

const DATAPOINT_API_BASE: &str = metsense_core::config::DEFAULT_DATAPOINT_URL;
const REQUEST_TIMEOUT_SECS: u64 = 10;
const USER_AGENT: &str = concat!("metsense/", env!("CARGO_PKG_VERSION"));
// Forecast steps are parsed as minute offsets, which only the 3-hourly feed uses
const FORECAST_RESOLUTION: &str = "3hourly";

#[derive(Debug, Clone)]
pub struct DatapointClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl DatapointClient {
    pub fn new(api_key: &str) -> Result<Self, DatapointError> {
        Self::with_base_url(
            api_key,
            DATAPOINT_API_BASE,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        )
    }

    /// Client against a custom endpoint, e.g. a mock server.
    pub fn with_base_url(
        api_key: &str,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, DatapointError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(
        datapoint: &DatapointConfig,
        polling: &PollingConfig,
    ) -> Result<Self, DatapointError> {
        Self::with_base_url(
            &datapoint.api_key,
            &datapoint.base_url,
            Duration::from_secs(polling.request_timeout_secs),
        )
    }

    /// List every forecast site.
    #[instrument(skip(self), level = "debug")]
    pub async fn site_list(&self) -> Result<Vec<Site>, DatapointError> {
        let url = format!("{}/val/wxfcs/all/json/sitelist", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?;

        let resp: SiteListResponse = self.handle_response(response, "sitelist").await?;
        Ok(resp.into_sites())
    }

    /// Helper to handle API responses and errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
        resource: &str,
    ) -> Result<T, DatapointError> {
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| DatapointError::Parse(format!("{}: {}", resource, e)))
        } else if status.as_u16() == 401 || status.as_u16() == 403 {
            Err(DatapointError::InvalidApiKey)
        } else if status.as_u16() == 404 {
            Err(DatapointError::SiteNotFound(resource.to_string()))
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(DatapointError::Api {
                status: status.as_u16(),
                message: text,
            })
        }
    }
}

impl ForecastSource for DatapointClient {
    #[instrument(skip(self), level = "debug")]
    async fn nearest_site(&self, longitude: f64, latitude: f64) -> Result<Site, DatapointError> {
        let sites = self.site_list().await?;
        let site = geo::nearest_site(&sites, longitude, latitude)
            .cloned()
            .ok_or(DatapointError::NoSites)?;

        tracing::debug!("Nearest site is {} ({})", site.name, site.id);
        Ok(site)
    }

    #[instrument(skip(self), level = "debug")]
    async fn forecast_for_site(&self, site_id: &str) -> Result<Forecast, DatapointError> {
        let url = format!("{}/val/wxfcs/all/json/{}", self.base_url, site_id);

        let response = self
            .client
            .get(&url)
            .query(&[("res", FORECAST_RESOLUTION), ("key", self.api_key.as_str())])
            .send()
            .await?;

        let resp: ForecastResponse = self.handle_response(response, site_id).await?;
        resp.into_forecast()
    }
}
