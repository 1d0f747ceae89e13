use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, header};
use serde::{Deserialize, Serialize};
use shared::Coordinate;

use crate::config::Config;
use crate::error::RoutingError;

/// Source of road-following paths between waypoints.
///
/// Implementations must:
/// - return the input unchanged, without any I/O, for fewer than 2 waypoints
/// - send at most one request per call (no retries)
/// - fold every failure into [`RoutingError::RoutingFailed`]
#[async_trait]
pub trait RouteProvider: Send + Sync {
    async fn fetch_path(&self, waypoints: &[Coordinate]) -> Result<Vec<Coordinate>, RoutingError>;
}

/// OpenRouteService directions client (GeoJSON output).
pub struct OpenRouteService {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl OpenRouteService {
    pub fn new(
        base_url: &str,
        profile: &str,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RoutingError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!(
                "{}/v2/directions/{}/geojson",
                base_url.trim_end_matches('/'),
                profile
            ),
            api_key: api_key.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, RoutingError> {
        Self::new(
            &config.ors_base_url,
            &config.profile,
            config.ors_api_key.clone(),
            config.request_timeout,
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RouteProvider for OpenRouteService {
    #[tracing::instrument(skip_all, fields(waypoints = waypoints.len()))]
    async fn fetch_path(&self, waypoints: &[Coordinate]) -> Result<Vec<Coordinate>, RoutingError> {
        if waypoints.len() < 2 {
            return Ok(waypoints.to_vec());
        }

        let body = DirectionsRequest {
            coordinates: waypoints.iter().map(|c| c.to_lon_lat()).collect(),
        };

        let res = self
            .client
            .post(&self.endpoint)
            .header(header::AUTHORIZATION, &self.api_key)
            .header(header::ACCEPT, "application/geo+json, application/json")
            .json(&body)
            .send()
            .await?;

        let status = res.status();
        let bytes = res.bytes().await?;
        tracing::debug!("directions responded {status} with {} bytes", bytes.len());

        // Error payloads come with both 2xx and error statuses.
        let parsed = serde_json::from_slice::<DirectionsResponse>(&bytes);
        if let Ok(DirectionsResponse {
            error: Some(err), ..
        }) = &parsed
        {
            return Err(RoutingError::RoutingFailed(err.message()));
        }
        if !status.is_success() {
            return Err(RoutingError::RoutingFailed(format!(
                "routing provider returned HTTP {}",
                status.as_u16()
            )));
        }

        let data = parsed.map_err(|err| {
            RoutingError::RoutingFailed(format!("unreadable routing response: {err}"))
        })?;
        let feature = data.features.into_iter().next().ok_or_else(|| {
            RoutingError::RoutingFailed("routing provider returned no route".into())
        })?;

        let path: Vec<Coordinate> = feature
            .geometry
            .coordinates
            .into_iter()
            .map(|position| position.into_coordinate())
            .collect::<Option<_>>()
            .ok_or_else(|| {
                RoutingError::RoutingFailed("routing response contains a malformed position".into())
            })?;

        tracing::debug!("received path with {} points", path.len());
        Ok(path)
    }
}

#[derive(Debug, Serialize)]
struct DirectionsRequest {
    coordinates: Vec<[f64; 2]>,
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    #[serde(default)]
    features: Vec<Feature>,
    #[serde(default)]
    error: Option<ProviderError>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    coordinates: Vec<Position>,
}

/// GeoJSON position: `[lng, lat]` with an optional elevation.
#[derive(Debug, Deserialize)]
#[serde(transparent)]
struct Position(Vec<f64>);

impl Position {
    fn into_coordinate(self) -> Option<Coordinate> {
        match self.0.as_slice() {
            [lon, lat, ..] => Some(Coordinate::from_lon_lat([*lon, *lat])),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProviderError {
    Detailed {
        #[serde(default)]
        code: Option<i64>,
        message: String,
    },
    Plain(String),
}

impl ProviderError {
    fn message(&self) -> String {
        match self {
            ProviderError::Detailed {
                code: Some(code),
                message,
            } => format!("{message} (code {code})"),
            ProviderError::Detailed { message, .. } => message.clone(),
            ProviderError::Plain(message) => message.clone(),
        }
    }
}
