use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::AppError;
use crate::models::location::GeoPoint;

#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub distance_text: String,
    pub distance_meters: Option<u64>,
    pub duration_text: String,
    pub duration_secs: Option<u64>,
}

/// Read-only geocoding and directions lookups.
#[async_trait]
pub trait MapsProvider: Send + Sync {
    async fn reverse_geocode(&self, point: GeoPoint) -> Result<String, AppError>;
    async fn route(&self, origin: GeoPoint, destination: GeoPoint) -> Result<Route, AppError>;
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    formatted_address: String,
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    status: String,
    #[serde(default)]
    routes: Vec<DirectionsRoute>,
}

#[derive(Debug, Deserialize)]
struct DirectionsRoute {
    #[serde(default)]
    legs: Vec<DirectionsLeg>,
}

#[derive(Debug, Deserialize)]
struct DirectionsLeg {
    distance: TextValue,
    duration: TextValue,
}

#[derive(Debug, Deserialize)]
struct TextValue {
    text: String,
    #[serde(default)]
    value: Option<u64>,
}

/// Google Maps geocoding and directions JSON APIs.
pub struct GoogleMaps {
    client: reqwest::Client,
    geocode_url: String,
    directions_url: String,
    api_key: String,
}

impl GoogleMaps {
    pub fn new(
        geocode_url: impl Into<String>,
        directions_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AppError::Internal(format!("failed to build http client: {err}")))?;

        Ok(Self {
            client,
            geocode_url: geocode_url.into(),
            directions_url: directions_url.into(),
            api_key: api_key.into(),
        })
    }
}

fn latlng(point: GeoPoint) -> String {
    format!("{},{}", point.lat, point.lng)
}

#[async_trait]
impl MapsProvider for GoogleMaps {
    async fn reverse_geocode(&self, point: GeoPoint) -> Result<String, AppError> {
        let response: GeocodeResponse = self
            .client
            .get(&self.geocode_url)
            .query(&[("latlng", latlng(point)), ("key", self.api_key.clone())])
            .send()
            .await?
            .json()
            .await?;

        if response.status != "OK" {
            return Err(AppError::NotFound(format!("geocoding status {}", response.status)));
        }

        response
            .results
            .into_iter()
            .next()
            .map(|result| result.formatted_address)
            .ok_or_else(|| AppError::NotFound("address not found".to_string()))
    }

    async fn route(&self, origin: GeoPoint, destination: GeoPoint) -> Result<Route, AppError> {
        let response: DirectionsResponse = self
            .client
            .get(&self.directions_url)
            .query(&[
                ("origin", latlng(origin)),
                ("destination", latlng(destination)),
                ("key", self.api_key.clone()),
            ])
            .send()
            .await?
            .json()
            .await?;

        if response.status != "OK" {
            return Err(AppError::NotFound(format!("directions status {}", response.status)));
        }

        let leg = response
            .routes
            .into_iter()
            .next()
            .and_then(|route| route.legs.into_iter().next())
            .ok_or_else(|| AppError::NotFound("no route between points".to_string()))?;

        Ok(Route {
            distance_text: leg.distance.text,
            distance_meters: leg.distance.value,
            duration_text: leg.duration.text,
            duration_secs: leg.duration.value,
        })
    }
}
