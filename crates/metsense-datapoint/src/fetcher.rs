//! Shared, rate-limited access to the current forecast time step.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::provider::ForecastSource;
use crate::types::{DatapointError, Location, Snapshot};

/// Return cached results if the last refresh was less than this long ago.
pub const MIN_TIME_BETWEEN_UPDATES: Duration = Duration::from_secs(120);

#[derive(Debug, Default)]
struct FetchState {
    snapshot: Option<Arc<Snapshot>>,
    last_refresh: Option<Instant>,
}

/// Owns the connection parameters and the cached snapshot shared by every
/// sensor of one platform.
///
/// At most one remote fetch sequence (site lookup plus forecast) runs per
/// `min_interval` window. Only successful refreshes restart the window.
pub struct ThrottledFetcher<S> {
    source: S,
    location: Location,
    min_interval: Duration,
    state: Mutex<FetchState>,
}

impl<S: ForecastSource> ThrottledFetcher<S> {
    /// Connect and fetch the first snapshot unconditionally.
    ///
    /// # Errors
    /// Returns the source error if the first fetch fails.
    pub async fn connect(source: S, location: Location) -> Result<Self, DatapointError> {
        Self::connect_with_interval(source, location, MIN_TIME_BETWEEN_UPDATES).await
    }

    /// Like [`connect`](Self::connect) with a custom throttle window.
    ///
    /// # Errors
    /// Returns the source error if the first fetch fails.
    pub async fn connect_with_interval(
        source: S,
        location: Location,
        min_interval: Duration,
    ) -> Result<Self, DatapointError> {
        let fetcher = Self {
            source,
            location,
            min_interval,
            state: Mutex::new(FetchState::default()),
        };

        {
            let mut state = fetcher.state.lock().await;
            fetcher.refresh(&mut state).await?;
        }

        Ok(fetcher)
    }

    /// Refresh the snapshot unless the throttle window is still open.
    ///
    /// Returns `Ok(false)` when throttled. On error the previous snapshot is
    /// kept and the window is not restarted.
    ///
    /// # Errors
    /// Returns the source error if the site lookup or forecast fails.
    pub async fn update(&self) -> Result<bool, DatapointError> {
        let mut state = self.state.lock().await;

        if let Some(last) = state.last_refresh {
            if last.elapsed() < self.min_interval {
                tracing::trace!("Forecast refreshed {:?} ago, using cache", last.elapsed());
                return Ok(false);
            }
        }

        self.refresh(&mut state).await?;
        Ok(true)
    }

    async fn refresh(&self, state: &mut FetchState) -> Result<(), DatapointError> {
        let site = self
            .source
            .nearest_site(self.location.longitude, self.location.latitude)
            .await?;
        let forecast = self.source.forecast_for_site(&site.id).await?;
        let snapshot = forecast.now()?.clone();

        tracing::debug!(
            site = %site.id,
            step = %snapshot.date,
            "Refreshed DataPoint forecast"
        );

        state.snapshot = Some(Arc::new(snapshot));
        state.last_refresh = Some(Instant::now());
        Ok(())
    }

    /// Most recent snapshot, if any fetch has succeeded.
    pub async fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.state.lock().await.snapshot.clone()
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    #[cfg(test)]
    pub(crate) fn source(&self) -> &S {
        &self.source
    }
}
