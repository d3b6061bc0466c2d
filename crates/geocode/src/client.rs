use std::time::Duration;

use async_trait::async_trait;
use common::config::GeocoderConfig;
use common::geo::Coordinates;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::error::{GeocodeError, Result};

/// Resolves a free-text address to coordinates. One outbound call per
/// invocation; retries are the caller's decision.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, address: &str) -> Result<Coordinates>;
}

/// Nominatim search API client. The request timeout is baked into the
/// underlying HTTP client, so a stalled upstream surfaces as
/// `GeocodeError::Http` rather than blocking the caller indefinitely.
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
}

impl NominatimGeocoder {
    pub fn new(config: &GeocoderConfig) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("http client");
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    #[instrument(skip(self))]
    async fn geocode(&self, address: &str) -> Result<Coordinates> {
        let query = address.trim();
        if query.is_empty() {
            return Err(GeocodeError::EmptyQuery);
        }

        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[("q", query), ("format", "json"), ("limit", "1")])
            .send()
            .await?
            .error_for_status()?;

        let places: Vec<NominatimPlace> = response.json().await?;
        let place = places
            .into_iter()
            .next()
            .ok_or_else(|| GeocodeError::NoResults(query.to_string()))?;

        let coords = parse_place(&place)?;
        debug!(lat = coords.latitude, lng = coords.longitude, "address resolved");
        Ok(coords)
    }
}

fn parse_place(place: &NominatimPlace) -> Result<Coordinates> {
    let raw = || format!("({}, {})", place.lat, place.lon);
    let lat: f64 = place
        .lat
        .parse()
        .map_err(|_| GeocodeError::InvalidCoordinates(raw()))?;
    let lon: f64 = place
        .lon
        .parse()
        .map_err(|_| GeocodeError::InvalidCoordinates(raw()))?;
    Coordinates::new(lat, lon).map_err(|_| GeocodeError::InvalidCoordinates(raw()))
}
