//! Forecast source abstraction.
//!
//! `ThrottledFetcher` only needs two remote calls; keeping them behind a
//! trait lets tests count calls and inject failures without HTTP.

use std::future::Future;

use crate::types::{DatapointError, Forecast, Site};

pub trait ForecastSource: Send + Sync {
    /// Forecast site closest to the given coordinates.
    fn nearest_site(
        &self,
        longitude: f64,
        latitude: f64,
    ) -> impl Future<Output = Result<Site, DatapointError>> + Send;

    /// Full 3-hourly forecast for a site.
    fn forecast_for_site(
        &self,
        site_id: &str,
    ) -> impl Future<Output = Result<Forecast, DatapointError>> + Send;
}
