//! Forecast API client.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use crate::error::WeatherError;
use crate::model::{into_record, CurrentWeather, Forecast, RawRecord};
use crate::types::Coordinate;

/// Anything that can answer a forecast query with a raw record.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// Fetch the raw forecast payload for a `"lat,lon[,time]"` query.
    async fn get_weather(&self, coordinate_query: &str) -> Result<RawRecord, WeatherError>;

    /// Fetch and parse the forecast at `coordinate`.
    async fn forecast(&self, coordinate: &Coordinate) -> Result<Forecast, WeatherError> {
        let raw = self.get_weather(&coordinate.query()).await?;
        Ok(Forecast::parse(&raw)?)
    }

    /// Conditions at `coordinate` for the instant `at`.
    async fn weather_at(
        &self,
        coordinate: &Coordinate,
        at: DateTime<Utc>,
    ) -> Result<Option<CurrentWeather>, WeatherError> {
        let raw = self.get_weather(&coordinate.query_at(at)).await?;
        Ok(Forecast::parse(&raw)?.current)
    }
}

#[derive(Debug, Clone)]
pub struct WeatherProvider {
    client: Arc<Client>,
    base_url: String,
    api_key: String,
    units: Option<String>,
}

impl WeatherProvider {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, WeatherError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client: Arc::new(client),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            units: None,
        })
    }

    /// Request a unit system other than the API default.
    pub fn with_units(mut self, units: &str) -> Self {
        self.units = Some(units.to_string());
        self
    }

    fn forecast_url(&self, coordinate_query: &str) -> Result<String, WeatherError> {
        let query = coordinate_query.trim();
        if query.is_empty() || query.contains(['/', '?', '#']) {
            return Err(WeatherError::InvalidQuery(coordinate_query.to_string()));
        }

        let mut url = format!("{}/{}/{}", self.base_url, self.api_key, query);
        if let Some(units) = &self.units {
            url.push_str(&format!("?units={}", urlencoding::encode(units)));
        }
        Ok(url)
    }
}

#[async_trait]
impl WeatherSource for WeatherProvider {
    #[instrument(skip(self), level = "info")]
    async fn get_weather(&self, coordinate_query: &str) -> Result<RawRecord, WeatherError> {
        let url = self.forecast_url(coordinate_query)?;

        let response = self.client.get(&url).send().await.map_err(|e| {
            tracing::warn!("Forecast request failed: {}", e);
            WeatherError::Network(e)
        })?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("Forecast returned status {}", status);
            return Err(WeatherError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        let value: serde_json::Value = serde_json::from_slice(&bytes).map_err(|e| {
            tracing::warn!("Forecast JSON error: {}", e);
            WeatherError::Json(e)
        })?;

        let record = into_record(value)?;
        tracing::debug!("Received forecast with {} top-level fields", record.len());
        Ok(record)
    }
}
