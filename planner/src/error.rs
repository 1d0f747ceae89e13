use thiserror::Error;

/// The only failure the route state machine ever sees from a provider.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RoutingError {
    #[error("routing failed: {0}")]
    RoutingFailed(String),
}

impl RoutingError {
    /// Human-readable message shown to the user.
    pub fn message(&self) -> &str {
        match self {
            RoutingError::RoutingFailed(message) => message,
        }
    }
}

impl From<reqwest::Error> for RoutingError {
    fn from(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "routing provider timed out".to_string()
        } else if err.is_decode() {
            format!("unreadable routing response: {err}")
        } else {
            format!("routing provider unreachable: {err}")
        };
        RoutingError::RoutingFailed(message)
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access waypoint store: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid stored waypoints: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to build GPX document: {0}")]
    Gpx(#[from] gpx::errors::GpxError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}
