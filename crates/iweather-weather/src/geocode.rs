//! Forward and reverse geocoding against a Nominatim (OpenStreetMap) server.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::instrument;

use crate::error::GeocodeError;
use crate::types::Coordinate;

const DEFAULT_LIMIT: u8 = 5;

/// An address resolved to a coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placemark {
    pub name: String,
    pub coordinate: Coordinate,
}

/// Resolves free-text addresses to placemarks.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Candidates in the service's ranking order; may be empty.
    async fn geocode_address(&self, address: &str) -> Result<Vec<Placemark>, GeocodeError>;

    /// Best match only; an empty result is [`GeocodeError::NoResults`].
    async fn geocode_first(&self, address: &str) -> Result<Placemark, GeocodeError> {
        self.geocode_address(address)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| GeocodeError::NoResults(address.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    lat: String,
    lon: String,
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    address: Option<ReverseAddress>,
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReverseAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    municipality: Option<String>,
    county: Option<String>,
    state: Option<String>,
    country: Option<String>,
}

impl ReverseAddress {
    /// "City, State" style label, preferring the most specific place.
    fn label(self) -> Option<String> {
        let state = self.state.clone();
        let country = self.country.clone();

        let place = self
            .city
            .or(self.town)
            .or(self.village)
            .or(self.municipality)
            .or(self.county)
            .or(self.state)
            .or(self.country)?;

        let suffix = state
            .filter(|s| !s.is_empty() && *s != place)
            .or_else(|| country.filter(|c| !c.is_empty() && *c != place));

        Some(match suffix {
            Some(s) => format!("{}, {}", place, s),
            None => place,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    client: Client,
    base_url: String,
    limit: u8,
}

impl NominatimGeocoder {
    pub fn new(base_url: &str, user_agent: &str, timeout: Duration) -> Result<Self, GeocodeError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            limit: DEFAULT_LIMIT,
        })
    }

    /// Convert coordinates to a human-readable place name (e.g. "Seattle, Washington").
    #[instrument(skip(self), level = "info")]
    pub async fn reverse_geocode(
        &self,
        coordinate: &Coordinate,
    ) -> Result<Option<String>, GeocodeError> {
        let url = format!(
            "{}/reverse?lat={}&lon={}&format=json&addressdetails=1&zoom=10",
            self.base_url, coordinate.latitude, coordinate.longitude
        );

        let response = self.client.get(&url).send().await?;
        let body: ReverseResponse = read_json(response).await?;

        let name = body.address.and_then(ReverseAddress::label).or(body.display_name);
        if let Some(n) = &name {
            tracing::debug!("Reverse geocoded to: {}", n);
        }
        Ok(name)
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    #[instrument(skip(self), level = "info")]
    async fn geocode_address(&self, address: &str) -> Result<Vec<Placemark>, GeocodeError> {
        let url = format!(
            "{}/search?q={}&format=json&limit={}",
            self.base_url,
            urlencoding::encode(address),
            self.limit
        );

        let response = self.client.get(&url).send().await.map_err(|e| {
            tracing::warn!("Geocode request failed: {}", e);
            GeocodeError::Network(e)
        })?;

        let results: Vec<SearchResult> = read_json(response).await?;

        let placemarks: Vec<Placemark> = results
            .into_iter()
            .filter_map(|r| {
                let coordinate = Coordinate::new(r.lat.parse().ok()?, r.lon.parse().ok()?);
                if !coordinate.is_valid() {
                    tracing::debug!("Ignoring out-of-range geocode result {:?}", coordinate);
                    return None;
                }
                Some(Placemark {
                    name: r.display_name.unwrap_or_else(|| address.to_string()),
                    coordinate,
                })
            })
            .collect();

        tracing::debug!("Geocoded {:?} to {} placemark(s)", address, placemarks.len());
        Ok(placemarks)
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, GeocodeError> {
    let status = response.status();
    if status != StatusCode::OK {
        let body = response.text().await.unwrap_or_default();
        tracing::warn!("Geocoder returned status {}", status);
        return Err(GeocodeError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| {
        tracing::warn!("Geocoder JSON error: {}", e);
        GeocodeError::Json(e)
    })
}
