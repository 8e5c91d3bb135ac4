use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::error::AppError;
use crate::models::profile::GeoPoint;

/// Resolves free-text addresses to coordinates. "No result" and transport
/// failures both come back as `None`; callers decide what that means.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, address: &str) -> Option<GeoPoint>;
}

/// Resolves coordinates to a display address, best-effort.
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    async fn reverse_geocode(&self, point: GeoPoint) -> Option<String>;
}

/// Thin HTTP client for the Nominatim search/reverse endpoints.
#[derive(Debug, Clone)]
pub struct NominatimClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
}

#[derive(Debug, Deserialize)]
struct ReverseResult {
    display_name: Option<String>,
}

impl NominatimClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("ride-dispatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| AppError::Internal(format!("failed to build geocoder client: {err}")))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Geocoder for NominatimClient {
    async fn geocode(&self, address: &str) -> Option<GeoPoint> {
        let url = format!("{}/search", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("q", address), ("format", "json"), ("limit", "1")])
            .send()
            .await;

        let response = match response {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                debug!(status = %response.status(), "geocode request rejected");
                return None;
            }
            Err(err) => {
                debug!(error = %err, "geocode request failed");
                return None;
            }
        };

        let hits: Vec<SearchHit> = match response.json().await {
            Ok(hits) => hits,
            Err(err) => {
                debug!(error = %err, "geocode response was not valid json");
                return None;
            }
        };

        let hit = hits.into_iter().next()?;
        // Nominatim serializes coordinates as strings.
        let lat = hit.lat.parse::<f64>().ok()?;
        let lng = hit.lon.parse::<f64>().ok()?;

        Some(GeoPoint { lat, lng })
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimClient {
    async fn reverse_geocode(&self, point: GeoPoint) -> Option<String> {
        let url = format!("{}/reverse", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("lat", point.lat.to_string()),
                ("lon", point.lng.to_string()),
                ("format", "json".to_string()),
            ])
            .send()
            .await;

        let response = match response {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                debug!(status = %response.status(), "reverse geocode request rejected");
                return None;
            }
            Err(err) => {
                debug!(error = %err, "reverse geocode request failed");
                return None;
            }
        };

        match response.json::<ReverseResult>().await {
            Ok(result) => result.display_name,
            Err(err) => {
                debug!(error = %err, "reverse geocode response was not valid json");
                None
            }
        }
    }
}
