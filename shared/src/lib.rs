pub mod geo;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Axis order expected by GeoJSON and most directions APIs.
    pub fn to_lon_lat(self) -> [f64; 2] {
        [self.lon, self.lat]
    }

    pub fn from_lon_lat([lon, lat]: [f64; 2]) -> Self {
        Self { lat, lon }
    }
}

/// Stored and exchanged with map widgets as `[lat, lng]`.
impl From<[f64; 2]> for Coordinate {
    fn from([lat, lon]: [f64; 2]) -> Self {
        Self { lat, lon }
    }
}

impl From<Coordinate> for [f64; 2] {
    fn from(coord: Coordinate) -> Self {
        [coord.lat, coord.lon]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteStatus {
    Empty,
    Single,
    Routing,
    Routed,
    Failed,
}

/// Everything a map widget needs to draw markers, the polyline and the
/// distance panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteView {
    pub status: RouteStatus,
    pub waypoints: Vec<Coordinate>,
    pub curved_path: Vec<Coordinate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_location: Option<Coordinate>,
    pub distance_km: f64,
    pub distance_miles: f64,
    pub estimated_duration: String,
    pub loading: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RouteView {
    /// The polyline is only worth drawing once there is a segment.
    pub fn has_polyline(&self) -> bool {
        self.curved_path.len() > 1
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpxExport {
    pub gpx_base64: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub message: String,
}
